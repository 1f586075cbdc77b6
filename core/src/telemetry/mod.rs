pub mod log;
pub mod metrics;

pub use self::log::{LogManager, MemorySink};
pub use metrics::{MetricsRecorder, MetricsSnapshot, Outcome};
