//! Merging archives and the live feed into one ordered stream.

pub mod engine;
pub mod gap;
pub mod sink;

pub use engine::{MergeConfig, MergeEngine, MergeSummary};
pub use gap::{Boundary, GapNotice};
pub use sink::RecordSink;
