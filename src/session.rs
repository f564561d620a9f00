//! Session controller: owns the comparator core and both input executors

use std::sync::Arc;

use tracing::{debug, info};

use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::executor::InputExecutor;
use crate::report::{InputSummary, SessionSummary};
use crate::source::make_source;
use crate::types::Options;

pub struct Session {
    comparator: Arc<Comparator>,
    inputs: Vec<InputExecutor>,
    started_at: String,
}

impl Session {
    /// Validate the configuration and build the core plus one executor per
    /// input. Nothing runs yet.
    pub fn new(mut opts: Options) -> Result<Self> {
        opts.validate()?;
        opts.enforce_defaults();

        let inputs_desc: Vec<String> = opts.inputs.iter().map(|i| i.to_string()).collect();
        debug!(inputs = ?inputs_desc, "starting session");

        let comparator = Arc::new(Comparator::new(&opts));
        let inputs = opts
            .inputs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                InputExecutor::new(index, make_source(spec), Arc::clone(&comparator), &opts)
            })
            .collect();

        Ok(Self {
            comparator,
            inputs,
            started_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Open the report sink and launch the input threads. A start failure
    /// aborts every thread already launched.
    pub fn start(&self) -> Result<()> {
        self.comparator.start()?;
        for input in &self.inputs {
            if !input.start() {
                self.stop();
                return Err(Error::ExecutorStart {
                    index: input.plugin_index(),
                });
            }
        }
        Ok(())
    }

    /// Tell every input to terminate at its next session boundary.
    pub fn stop(&self) {
        for input in &self.inputs {
            input.terminate();
        }
    }

    /// Join both executors in turn, then log and return the summary.
    pub fn wait_for_termination(&self) -> SessionSummary {
        for input in &self.inputs {
            input.wait_for_termination();
        }
        let summary = self.summary();
        info!(summary = %summary.to_json(), "session terminated");
        summary
    }

    pub fn summary(&self) -> SessionSummary {
        let counters = self.comparator.counters();
        SessionSummary {
            started_at: self.started_at.clone(),
            records: counters.records,
            alignment_resets: counters.alignment_resets,
            watermark_resets: counters.watermark_resets,
            inputs: counters
                .packets
                .iter()
                .zip(counters.pcrs.iter())
                .map(|(&packets, &pcrs)| InputSummary { packets, pcrs })
                .collect(),
        }
    }
}

/// Run a complete comparison session: validate, start, wait, summarise.
pub fn run(opts: Options) -> Result<SessionSummary> {
    let session = Session::new(opts)?;
    session.start()?;
    Ok(session.wait_for_termination())
}
