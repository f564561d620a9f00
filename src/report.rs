//! CSV reporting sink and end-of-session summary

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

/// Field separator of the CSV records.
pub const CSV_SEPARATOR: &str = ",";

/// One comparison result, written as one CSV line. PCR fields are in
/// 27 MHz ticks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ComparisonRecord {
    pub pcr1: u64,
    pub pcr2: u64,
    pub delta: u64,
    pub delta_ms: f64,
    pub sync: bool,
}

/// Writes the header line and comparison records to the configured sink.
pub struct CsvReporter {
    sink: Box<dyn Write + Send>,
}

impl CsvReporter {
    /// Open the output file, or fall back to standard error.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let sink: Box<dyn Write + Send> = match path {
            None => Box::new(io::stderr()),
            Some(path) => Box::new(File::create(path).map_err(|e| Error::OutputOpen {
                path: path.to_path_buf(),
                source: e,
            })?),
        };
        Ok(Self { sink })
    }

    /// Route records to an arbitrary sink (embedding, tests).
    pub fn from_sink(sink: Box<dyn Write + Send>) -> Self {
        Self { sink }
    }

    pub fn header(&mut self) -> Result<()> {
        writeln!(
            self.sink,
            "PCR1{s}PCR2{s}PCR Delta{s}PCR Delta (ms){s}Sync",
            s = CSV_SEPARATOR
        )?;
        self.sink.flush()?;
        Ok(())
    }

    pub fn record(&mut self, record: &ComparisonRecord) -> Result<()> {
        writeln!(
            self.sink,
            "{pcr1}{s}{pcr2}{s}{delta}{s}{delta_ms}{s}{sync}",
            pcr1 = record.pcr1,
            pcr2 = record.pcr2,
            delta = record.delta,
            delta_ms = record.delta_ms,
            sync = record.sync,
            s = CSV_SEPARATOR
        )?;
        self.sink.flush()?;
        Ok(())
    }
}

/// Per-input counters reported at the end of a session.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct InputSummary {
    pub packets: u64,
    pub pcrs: u64,
}

/// End-of-session counters, logged as JSON when the session terminates.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub started_at: String,
    pub records: u64,
    pub alignment_resets: u64,
    pub watermark_resets: u64,
    pub inputs: Vec<InputSummary>,
}

impl SessionSummary {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| "{\"error\": \"JSON serialization failed\"}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn header_and_record_layout() {
        let buf = SharedBuf::default();
        let mut reporter = CsvReporter::from_sink(Box::new(buf.clone()));
        reporter.header().unwrap();
        reporter
            .record(&ComparisonRecord {
                pcr1: 1000,
                pcr2: 1900,
                delta: 900,
                delta_ms: 900.0 / (90_000.0 * 300.0) * 1000.0,
                sync: true,
            })
            .unwrap();

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            "PCR1,PCR2,PCR Delta,PCR Delta (ms),Sync"
        );
        let fields: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(fields[0], "1000");
        assert_eq!(fields[1], "1900");
        assert_eq!(fields[2], "900");
        let ms: f64 = fields[3].parse().unwrap();
        assert!((ms - 0.0333333).abs() < 1e-6);
        assert_eq!(fields[4], "true");
        assert!(lines.next().is_none());
    }

    #[test]
    fn sync_false_is_lowercase() {
        let buf = SharedBuf::default();
        let mut reporter = CsvReporter::from_sink(Box::new(buf.clone()));
        reporter
            .record(&ComparisonRecord {
                pcr1: 5,
                pcr2: 7,
                delta: 2,
                delta_ms: 0.1,
                sync: false,
            })
            .unwrap();
        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(out.ends_with(",false\n"));
    }

    #[test]
    fn summary_serializes() {
        let summary = SessionSummary {
            started_at: "2022-01-01T00:00:00+00:00".to_string(),
            records: 3,
            alignment_resets: 1,
            watermark_resets: 0,
            inputs: vec![InputSummary::default(); 2],
        };
        let json = summary.to_json();
        assert!(json.contains("\"records\":3"));
        assert!(json.contains("\"alignment_resets\":1"));
    }
}
