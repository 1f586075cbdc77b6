use std::sync::{Arc, Condvar, Mutex};

/// Tracks measurements in flight and lets teardown wait for idle.
#[derive(Default)]
pub struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one measurement as started. The returned guard ends it on drop,
    /// including during unwinding.
    pub fn enter(self: &Arc<Self>) -> InFlightGuard {
        if let Ok(mut count) = self.count.lock() {
            *count += 1;
        }
        InFlightGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.count.lock().map(|count| *count > 0).unwrap_or(false)
    }

    pub fn wait_idle(&self) {
        let Ok(mut count) = self.count.lock() else {
            return;
        };
        while *count > 0 {
            count = match self.idle.wait(count) {
                Ok(count) => count,
                Err(_) => return,
            };
        }
    }

    fn exit(&self) {
        if let Ok(mut count) = self.count.lock() {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.idle.notify_all();
            }
        }
    }
}

pub struct InFlightGuard {
    tracker: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.exit();
    }
}
