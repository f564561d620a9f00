use std::path::PathBuf;

use clap::Parser;
use pcrdelta::{run, InputSpec, Options};

/// Compare PCRs between two TS input sources
#[derive(Parser)]
#[command(name = "pcrdelta", version)]
struct Opt {
    /// Input sources: a file path or udp://ADDR:PORT (exactly two)
    #[arg(num_args = 2, required = true)]
    inputs: Vec<String>,

    /// Output file name for CSV reporting (standard error by default)
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    /// Latency threshold between the two inputs in milliseconds
    #[arg(long, default_value_t = 0)]
    latency: u64,

    /// Ring buffer capacity per input, in TS packets
    #[arg(short = 'b', long, default_value_t = 512)]
    buffer_packets: usize,

    /// Maximum number of TS packets per receive call
    #[arg(long, default_value_t = 128)]
    max_input_packets: usize,

    /// Input-timestamp alignment threshold in milliseconds; front samples
    /// further apart reset both queues
    #[arg(long, default_value_t = 5.0)]
    align_threshold: f64,

    /// One-sided PCR queue depth beyond which both queues are reset
    #[arg(long, default_value_t = 10)]
    queue_watermark: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    let level = match opt.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut inputs = Vec::with_capacity(opt.inputs.len());
    for spec in &opt.inputs {
        inputs.push(InputSpec::parse(spec)?);
    }

    run(Options {
        inputs,
        output_file: opt.output_file,
        latency_threshold_ms: opt.latency,
        buffer_packets: opt.buffer_packets,
        max_input_packets: opt.max_input_packets,
        align_threshold_ms: opt.align_threshold,
        queue_watermark: opt.queue_watermark,
    })?;

    Ok(())
}
