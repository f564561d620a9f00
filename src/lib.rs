//! Compare PCRs carried in two MPEG-TS inputs received in parallel.
//!
//! Two input executor threads pull packets from their sources into private
//! ring buffers and feed PCR samples to a shared comparison core, which
//! pairs the oldest unmatched sample of each input and reports the delta,
//! its millisecond value and a threshold flag as CSV records.

pub mod comparator;
pub mod constants;
pub mod error;
pub mod executor;
pub mod packet;
pub mod report;
pub mod ring;
pub mod session;
pub mod source;
pub mod types;

pub use error::{Error, Result};
pub use report::SessionSummary;
pub use session::{run, Session};
pub use types::{InputSpec, Options};
