use std::sync::{Mutex, PoisonError};

/// How a single radar measurement ended. Exactly one outcome is recorded per
/// measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Processed and handed to the callback (or no callback was registered).
    Delivered,
    /// The signal source returned an error; nothing was delivered.
    SourceFailed,
    /// A panic in acquisition, processing or the callback was contained.
    Aborted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub delivered: usize,
    pub source_failed: usize,
    pub aborted: usize,
    pub last: Option<Outcome>,
}

impl MetricsSnapshot {
    pub fn completed(&self) -> usize {
        self.delivered
    }

    pub fn failed(&self) -> usize {
        self.source_failed + self.aborted
    }

    pub fn total(&self) -> usize {
        self.completed() + self.failed()
    }
}

/// Tallies measurement outcomes for the coordinator.
#[derive(Default)]
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: Outcome) {
        let mut metrics = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Outcome::Delivered => metrics.delivered += 1,
            Outcome::SourceFailed => metrics.source_failed += 1,
            Outcome::Aborted => metrics.aborted += 1,
        }
        metrics.last = Some(outcome);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
