use log::{Level, LevelFilter};
use std::sync::{Arc, Mutex, RwLock};

/// In-memory line sink used to inspect diagnostic output.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    pub fn contents(&self) -> String {
        self.lines().join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

struct LogInner {
    threshold: RwLock<LevelFilter>,
    sink: Option<MemorySink>,
}

/// Leveled logging handle shared by the radar and trigger components.
///
/// Every message goes to the `log` facade. When a sink is attached, messages
/// at or above the handle's threshold are also appended as `[LEVEL] message`.
#[derive(Clone)]
pub struct LogManager {
    inner: Arc<LogInner>,
}

impl LogManager {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_sink(sink: MemorySink) -> Self {
        Self::build(Some(sink))
    }

    fn build(sink: Option<MemorySink>) -> Self {
        Self {
            inner: Arc::new(LogInner {
                threshold: RwLock::new(LevelFilter::Trace),
                sink,
            }),
        }
    }

    pub fn set_level(&self, level: LevelFilter) {
        if let Ok(mut threshold) = self.inner.threshold.write() {
            *threshold = level;
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.inner
            .threshold
            .read()
            .map(|threshold| *threshold)
            .unwrap_or(LevelFilter::Trace)
    }

    pub fn record(&self, level: Level, message: &str) {
        if level > self.level() {
            return;
        }
        log::log!(level, "{}", message);
        if let Some(sink) = self.inner.sink.as_ref() {
            sink.push(format!("[{}] {}", level, message));
        }
    }

    pub fn debug(&self, message: &str) {
        self.record(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.record(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
