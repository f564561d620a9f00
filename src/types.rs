//! Core data types and configuration for the comparison engine

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use crate::constants::*;
use crate::error::{Error, Result};

/// One PCR observation: the clock reference carried by a packet and the
/// input timestamp at which the host observed that packet. Both are in
/// 27 MHz ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcrSample {
    pub pcr: u64,
    pub timestamp: u64,
}

/// Where one input reads its packets from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSpec {
    File(PathBuf),
    Udp(SocketAddr),
}

impl InputSpec {
    /// Parse a command-line input specification: `udp://ADDR:PORT` or a
    /// plain file path.
    pub fn parse(spec: &str) -> Result<Self> {
        if let Some(addr) = spec.strip_prefix("udp://") {
            let addr: SocketAddr = addr.parse().map_err(|e| Error::InvalidInput {
                spec: spec.to_string(),
                reason: format!("bad socket address: {e}"),
            })?;
            Ok(InputSpec::Udp(addr))
        } else if spec.is_empty() {
            Err(Error::InvalidInput {
                spec: spec.to_string(),
                reason: "empty input specification".to_string(),
            })
        } else {
            Ok(InputSpec::File(PathBuf::from(spec)))
        }
    }

    /// Short transport name, used as the log prefix of the input executor.
    pub fn kind(&self) -> &'static str {
        match self {
            InputSpec::File(_) => "file",
            InputSpec::Udp(_) => "udp",
        }
    }
}

impl fmt::Display for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSpec::File(path) => write!(f, "{}", path.display()),
            InputSpec::Udp(addr) => write!(f, "udp://{addr}"),
        }
    }
}

/// Configuration for a complete comparison session.
#[derive(Clone, Debug)]
pub struct Options {
    /// Exactly two input sources.
    pub inputs: Vec<InputSpec>,
    /// CSV destination; standard error when unset.
    pub output_file: Option<PathBuf>,
    /// Ceiling on the PCR delta, in milliseconds, below which the two
    /// inputs are reported as in sync.
    pub latency_threshold_ms: u64,
    /// Ring buffer capacity per input, in packets.
    pub buffer_packets: usize,
    /// Maximum packets per receive call.
    pub max_input_packets: usize,
    /// Ceiling on the input-timestamp difference between paired samples.
    pub align_threshold_ms: f64,
    /// One-sided queue depth that triggers a reset.
    pub queue_watermark: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output_file: None,
            latency_threshold_ms: DEFAULT_LATENCY_THRESHOLD_MS,
            buffer_packets: DEFAULT_BUFFERED_PACKETS,
            max_input_packets: DEFAULT_MAX_INPUT_PACKETS,
            align_threshold_ms: DEFAULT_ALIGN_THRESHOLD_MS,
            queue_watermark: DEFAULT_QUEUE_WATERMARK,
        }
    }
}

impl Options {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.len() != INPUT_COUNT {
            return Err(Error::InputCount {
                expected: INPUT_COUNT,
                actual: self.inputs.len(),
            });
        }
        if self.buffer_packets < MIN_BUFFERED_PACKETS {
            return Err(Error::BufferTooSmall {
                min: MIN_BUFFERED_PACKETS,
                got: self.buffer_packets,
            });
        }
        if self.max_input_packets == 0 {
            return Err(Error::MaxInputPacketsZero);
        }
        Ok(())
    }

    /// Normalise option values that silently depend on each other:
    /// a receive batch never covers more than half the ring.
    pub fn enforce_defaults(&mut self) {
        self.max_input_packets = self.max_input_packets.min(self.buffer_packets / 2);
    }
}

/// Convert 27 MHz ticks to milliseconds.
pub fn ticks_to_ms(ticks: u64) -> f64 {
    ticks as f64 / (90_000.0 * 300.0) * 1000.0
}

/// Elapsed time since `since` in 27 MHz ticks.
pub fn monotonic_ticks(since: Instant) -> u64 {
    (since.elapsed().as_nanos() * SYSTEM_CLOCK_FREQ as u128 / 1_000_000_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_udp_spec() {
        let spec = InputSpec::parse("udp://239.1.1.2:1234").unwrap();
        assert_eq!(spec, InputSpec::Udp("239.1.1.2:1234".parse().unwrap()));
        assert_eq!(spec.kind(), "udp");
    }

    #[test]
    fn parse_file_spec() {
        let spec = InputSpec::parse("/tmp/capture.ts").unwrap();
        assert_eq!(spec, InputSpec::File(PathBuf::from("/tmp/capture.ts")));
        assert_eq!(spec.kind(), "file");
    }

    #[test]
    fn parse_bad_udp_address() {
        assert!(InputSpec::parse("udp://not-an-address").is_err());
        assert!(InputSpec::parse("").is_err());
    }

    #[test]
    fn validate_requires_two_inputs() {
        let mut opts = Options {
            inputs: vec![InputSpec::File(PathBuf::from("a.ts"))],
            ..Options::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(Error::InputCount {
                expected: 2,
                actual: 1
            })
        ));
        opts.inputs.push(InputSpec::File(PathBuf::from("b.ts")));
        assert!(opts.validate().is_ok());
        opts.inputs.push(InputSpec::File(PathBuf::from("c.ts")));
        assert!(opts.validate().is_err());
    }

    #[test]
    fn validate_numeric_bounds() {
        let mut opts = Options {
            inputs: vec![
                InputSpec::File(PathBuf::from("a.ts")),
                InputSpec::File(PathBuf::from("b.ts")),
            ],
            ..Options::default()
        };
        opts.buffer_packets = 15;
        assert!(matches!(opts.validate(), Err(Error::BufferTooSmall { .. })));
        opts.buffer_packets = 16;
        assert!(opts.validate().is_ok());
        opts.max_input_packets = 0;
        assert!(matches!(opts.validate(), Err(Error::MaxInputPacketsZero)));
    }

    #[test]
    fn max_input_packets_capped_at_half_buffer() {
        let mut opts = Options {
            buffer_packets: 64,
            max_input_packets: 128,
            ..Options::default()
        };
        opts.enforce_defaults();
        assert_eq!(opts.max_input_packets, 32);

        let mut opts = Options {
            buffer_packets: 512,
            max_input_packets: 100,
            ..Options::default()
        };
        opts.enforce_defaults();
        assert_eq!(opts.max_input_packets, 100);
    }

    #[test]
    fn ticks_to_ms_conversion() {
        assert_eq!(ticks_to_ms(0), 0.0);
        assert_eq!(ticks_to_ms(27_000), 1.0);
        assert_eq!(ticks_to_ms(27_000_000), 1000.0);
        let delta_ms = ticks_to_ms(900);
        assert!((delta_ms - 0.0333333).abs() < 1e-6);
    }
}
