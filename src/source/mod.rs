//! Packet source adapters
//!
//! A source delivers raw 188-byte TS packets, optionally stamping each one
//! with the 27 MHz input timestamp at which the transport observed it.
//! Sources that cannot timestamp (plain files) leave the metadata untouched
//! and the input executor stamps the batch from its own monotonic clock.

mod file;
mod udp;

pub use file::FileSource;
pub use udp::UdpSource;

use crate::error::Result;
use crate::packet::{PacketMetadata, TsPacket};
use crate::types::InputSpec;

/// Contract between an input executor and its packet transport.
pub trait PacketSource: Send {
    /// Open the underlying device or resource. Called once per session,
    /// before the first `receive`.
    fn open(&mut self) -> Result<()>;

    /// Fill `packets` with up to `packets.len()` packets, setting the
    /// matching `metadata` timestamps when the transport knows them.
    /// Returns the number of packets delivered; 0 means end of input.
    fn receive(
        &mut self,
        packets: &mut [TsPacket],
        metadata: &mut [PacketMetadata],
    ) -> Result<usize>;

    /// Human-readable description for logs.
    fn name(&self) -> String;
}

/// Build the source adapter for an input specification.
pub fn make_source(spec: &InputSpec) -> Box<dyn PacketSource> {
    match spec {
        InputSpec::File(path) => Box::new(FileSource::new(path.clone())),
        InputSpec::Udp(addr) => Box::new(UdpSource::new(*addr)),
    }
}
