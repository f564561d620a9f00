//! Constants for MPEG-TS packet handling and the comparison engine

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;

/// PID carried by null (stuffing) packets
pub const NULL_PID: u16 = 0x1FFF;

/// PCR constants
pub const SYSTEM_CLOCK_FREQ: u64 = 27_000_000; // 27 MHz (90 kHz x 300)
pub const PCR_EXTENSION_MODULO: u64 = 300; // PCR = base x 300 + extension

/// Number of input streams the comparator operates on
pub const INPUT_COUNT: usize = 2;

/// Engine defaults
pub const DEFAULT_BUFFERED_PACKETS: usize = 512;
pub const MIN_BUFFERED_PACKETS: usize = 16;
pub const DEFAULT_MAX_INPUT_PACKETS: usize = 128;
pub const DEFAULT_LATENCY_THRESHOLD_MS: u64 = 0;

/// Two front samples further apart than this are considered captured in
/// different real-time intervals and force a queue reset.
pub const DEFAULT_ALIGN_THRESHOLD_MS: f64 = 5.0;

/// One-sided queue depth beyond which both queues are reset (input lost).
pub const DEFAULT_QUEUE_WATERMARK: usize = 10;

/// Receive buffer for one UDP datagram (a multicast TS datagram is
/// typically 7 packets, 1316 bytes)
pub const UDP_RECV_BUFFER_SIZE: usize = 2048;
