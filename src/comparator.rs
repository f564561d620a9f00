//! The comparison core: per-input PCR queues and the paired-front policy
//!
//! Input executors push PCR samples through `ingest_batch`; every push is
//! serialised by one mutex and immediately followed by a comparison step.
//! The oldest unmatched sample of each queue is paired with its
//! counterpart, provided both were captured in the same real-time interval.
//! PCR wraparound (modulo 2^33 on the base) is not handled: deltas taken
//! across a wrap are reported as-is.

use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::debug;

use crate::constants::INPUT_COUNT;
use crate::error::Result;
use crate::packet::{PacketMetadata, TsPacket};
use crate::report::{ComparisonRecord, CsvReporter};
use crate::types::{ticks_to_ms, Options, PcrSample};

/// Counters kept by the core, snapshot into the session summary.
#[derive(Clone, Copy, Debug, Default)]
pub struct CoreCounters {
    pub packets: [u64; INPUT_COUNT],
    pub pcrs: [u64; INPUT_COUNT],
    pub records: u64,
    pub alignment_resets: u64,
    pub watermark_resets: u64,
}

struct CoreState {
    pcrs: [VecDeque<PcrSample>; INPUT_COUNT],
    reporter: Option<CsvReporter>,
    counters: CoreCounters,
}

pub struct Comparator {
    latency_threshold_ms: f64,
    align_threshold_ms: f64,
    queue_watermark: usize,
    output_file: Option<PathBuf>,
    state: Mutex<CoreState>,
}

impl Comparator {
    pub fn new(opts: &Options) -> Self {
        Self {
            latency_threshold_ms: opts.latency_threshold_ms as f64,
            align_threshold_ms: opts.align_threshold_ms,
            queue_watermark: opts.queue_watermark,
            output_file: opts.output_file.clone(),
            state: Mutex::new(CoreState {
                pcrs: Default::default(),
                reporter: None,
                counters: CoreCounters::default(),
            }),
        }
    }

    /// Open the configured output (or standard error) and emit the CSV
    /// header. Must succeed before any executor runs.
    pub fn start(&self) -> Result<()> {
        let reporter = CsvReporter::open(self.output_file.as_deref())?;
        self.install_reporter(reporter)
    }

    /// Route records to an arbitrary sink instead of a file (embedding,
    /// tests).
    pub fn start_with_sink(&self, sink: Box<dyn Write + Send>) -> Result<()> {
        self.install_reporter(CsvReporter::from_sink(sink))
    }

    fn install_reporter(&self, mut reporter: CsvReporter) -> Result<()> {
        let mut state = self.state.lock();
        if state.reporter.is_some() {
            return Err(crate::error::Error::AlreadyStarted);
        }
        reporter.header()?;
        state.reporter = Some(reporter);
        Ok(())
    }

    /// Pass incoming TS packets for analysis. Called from input executor
    /// threads; reentrant across input indices. The mutex is taken per
    /// packet, not per batch, to keep critical sections short.
    pub fn ingest_batch(
        &self,
        packets: &[TsPacket],
        metadata: &[PacketMetadata],
        input_index: usize,
    ) -> Result<()> {
        assert!(input_index < INPUT_COUNT);
        assert_eq!(packets.len(), metadata.len());
        for (pkt, meta) in packets.iter().zip(metadata) {
            let mut state = self.state.lock();
            state.counters.packets[input_index] += 1;
            if let Some(pcr) = pkt.pcr() {
                let timestamp = meta.input_timestamp();
                state.pcrs[input_index].push_back(PcrSample { pcr, timestamp });
                state.counters.pcrs[input_index] += 1;
                self.compare(&mut state)?;
            }
        }
        Ok(())
    }

    /// One comparison step, invoked under the mutex after each push.
    fn compare(&self, state: &mut CoreState) -> Result<()> {
        let CoreState {
            pcrs,
            reporter,
            counters,
        } = state;
        let [queue1, queue2] = pcrs;

        if let (Some(&s1), Some(&s2)) = (queue1.front(), queue2.front()) {
            // Make sure the two front samples are from the same time interval.
            if self.out_of_interval(&s1, &s2) {
                debug!(
                    ts1 = s1.timestamp,
                    ts2 = s2.timestamp,
                    "front samples out of interval, resetting queues"
                );
                counters.alignment_resets += 1;
                queue1.clear();
                queue2.clear();
                return Ok(());
            }

            let delta = s1.pcr.abs_diff(s2.pcr);
            let delta_ms = ticks_to_ms(delta);
            let sync = delta_ms <= self.latency_threshold_ms;
            let record = ComparisonRecord {
                pcr1: s1.pcr,
                pcr2: s2.pcr,
                delta,
                delta_ms,
                sync,
            };
            if let Some(reporter) = reporter.as_mut() {
                reporter.record(&record)?;
            }
            counters.records += 1;
            queue1.pop_front();
            queue2.pop_front();
        } else if queue1.len() > self.queue_watermark || queue2.len() > self.queue_watermark {
            // Avoid one queue growing without bound while its input is lost.
            debug!(
                len1 = queue1.len(),
                len2 = queue2.len(),
                "one-sided queue growth, resetting queues"
            );
            counters.watermark_resets += 1;
            queue1.clear();
            queue2.clear();
        }
        Ok(())
    }

    /// True when the two samples were not captured in the same real-time
    /// interval.
    fn out_of_interval(&self, s1: &PcrSample, s2: &PcrSample) -> bool {
        let diff_ms = ticks_to_ms(s1.timestamp.abs_diff(s2.timestamp));
        diff_ms > self.align_threshold_ms
    }

    pub fn counters(&self) -> CoreCounters {
        self.state.lock().counters
    }

    pub fn queue_depths(&self) -> [usize; INPUT_COUNT] {
        let state = self.state.lock();
        [state.pcrs[0].len(), state.pcrs[1].len()]
    }
}
