//! Log capture sink for operation-line assertions.
//!
//! The sink is an explicit object handed to each [`crate::GitClient`] at
//! construction time. Its lifetime is tied to the owning test or caller, so
//! there is no process-global logging state and no cross-instance bleed.
//! Structured diagnostics still go through `tracing`; the sink only records
//! the operation lines that callers assert on afterwards.

use std::sync::{Arc, Mutex};

/// Sentinel recorded as the first line of every sink.
///
/// Asserting on this line proves the capture pipeline itself was live before
/// any other expectation is evaluated.
pub const LOGGING_STARTED: &str = "*** Logging started ***";

/// Append-only capture of operation log lines.
///
/// Cloning the sink yields another handle on the same buffer, so a client and
/// the test driving it can share one capture.
#[derive(Clone, Debug)]
pub struct LogSink {
    inner: Arc<Mutex<SinkState>>,
}

#[derive(Debug)]
struct SinkState {
    lines: Vec<String>,
    open: bool,
}

impl LogSink {
    /// Create a new sink and record the start sentinel.
    pub fn attach() -> Self {
        let sink = Self {
            inner: Arc::new(Mutex::new(SinkState {
                lines: Vec::new(),
                open: true,
            })),
        };
        sink.record(LOGGING_STARTED);
        sink
    }

    /// Append a line. Lines recorded after [`LogSink::close`] are dropped.
    pub fn record(&self, line: impl Into<String>) {
        let mut state = self.inner.lock().expect("log sink poisoned");
        if state.open {
            state.lines.push(line.into());
        }
    }

    /// Linear scan for a substring over every recorded line.
    pub fn contains_substring(&self, needle: &str) -> bool {
        let state = self.inner.lock().expect("log sink poisoned");
        state.lines.iter().any(|line| line.contains(needle))
    }

    /// Snapshot of all recorded lines.
    pub fn messages(&self) -> Vec<String> {
        let state = self.inner.lock().expect("log sink poisoned");
        state.lines.clone()
    }

    /// All recorded lines joined with `;`, for assertion diagnostics.
    pub fn joined(&self) -> String {
        self.messages().join(";")
    }

    /// Detach the sink. The recorded lines stay readable, further records
    /// are silently dropped.
    pub fn close(&self) {
        let mut state = self.inner.lock().expect("log sink poisoned");
        state.open = false;
    }

    /// Whether the sink still accepts new lines.
    pub fn is_open(&self) -> bool {
        self.inner.lock().expect("log sink poisoned").open
    }
}
