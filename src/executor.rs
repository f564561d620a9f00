//! Input executor: one thread driving one packet source
//!
//! The executor owns its source and its ring buffer outright; the core is
//! reached through a non-owning shared handle. Termination is soft: the
//! flag is observed after the source session starts, never mid-receive,
//! and end-of-input is the normal way a session finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::comparator::Comparator;
use crate::error::Result;
use crate::ring::PacketRing;
use crate::source::PacketSource;
use crate::types::{monotonic_ticks, Options};

pub struct InputExecutor {
    index: usize,
    name: String,
    terminate: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    worker: Mutex<Option<Worker>>,
}

impl InputExecutor {
    pub fn new(
        index: usize,
        source: Box<dyn PacketSource>,
        comparator: Arc<Comparator>,
        opts: &Options,
    ) -> Self {
        let name = format!("{}[{}]", source.name(), index);
        let terminate = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            index,
            name: name.clone(),
            source,
            ring: PacketRing::new(opts.buffer_packets, opts.max_input_packets),
            comparator,
            terminate: Arc::clone(&terminate),
        };
        Self {
            index,
            name,
            terminate,
            handle: Mutex::new(None),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Launch the input thread. Returns false when the thread cannot be
    /// spawned; a source that refuses to open is reported from inside the
    /// thread, which then exits. No-op when already started.
    pub fn start(&self) -> bool {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return true;
        }
        let Some(worker) = self.worker.lock().take() else {
            return true; // already ran
        };
        match std::thread::Builder::new()
            .name(format!("input-{}", self.index))
            .spawn(move || worker.run())
        {
            Ok(h) => {
                *handle = Some(h);
                true
            }
            Err(e) => {
                error!(input = %self.name, error = %e, "cannot spawn input thread");
                false
            }
        }
    }

    /// Block until the input thread has exited.
    pub fn wait_for_termination(&self) {
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!(input = %self.name, "input thread panicked");
            }
        }
    }

    /// Request termination; observed between source sessions only.
    pub fn terminate(&self) {
        debug!(input = %self.name, "received terminate request");
        self.terminate.store(true, Ordering::SeqCst);
    }

    pub fn plugin_index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

struct Worker {
    index: usize,
    name: String,
    source: Box<dyn PacketSource>,
    ring: PacketRing,
    comparator: Arc<Comparator>,
    terminate: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self) {
        debug!(input = %self.name, "input thread started");

        // One input session per source; a cyclic source variant would loop
        // back here after end of input.
        debug!(input = %self.name, "starting input source");
        if let Err(e) = self.source.open() {
            error!(input = %self.name, error = %e, "cannot start input source");
            return;
        }
        if self.terminate.load(Ordering::SeqCst) {
            debug!(input = %self.name, "terminated before first receive");
            return;
        }

        let baseline = Instant::now();
        match self.receive_loop(baseline) {
            Ok(()) => debug!(input = %self.name, "received end of input"),
            Err(e) => error!(input = %self.name, error = %e, "input session failed"),
        }
        debug!(input = %self.name, "input thread terminated");
    }

    fn receive_loop(&mut self, baseline: Instant) -> Result<()> {
        loop {
            let dropped = self.ring.make_room();
            if dropped > 0 {
                warn!(
                    input = %self.name,
                    dropped,
                    "input buffer full, dropping oldest packets"
                );
            }

            let (in_first, in_count) = self.ring.receive_range();
            let received = {
                let (packets, metadata) = self.ring.window_mut(in_first, in_count);
                let received = self.source.receive(packets, metadata)?;
                if received == 0 {
                    return Ok(()); // end of input
                }
                // Sources that cannot timestamp leave the batch unstamped;
                // fall back to our own monotonic clock.
                if !metadata[0].has_input_timestamp() {
                    let ticks = monotonic_ticks(baseline);
                    for meta in metadata[..received].iter_mut() {
                        meta.set_input_timestamp(ticks);
                    }
                }
                received
            };
            self.ring.commit(received);

            // Hand everything pending to the core, one contiguous run at a
            // time.
            while !self.ring.is_empty() {
                let consumed = {
                    let (packets, metadata) = self.ring.pending();
                    self.comparator
                        .ingest_batch(packets, metadata, self.index)?;
                    packets.len()
                };
                self.ring.consume(consumed);
            }
        }
    }
}
