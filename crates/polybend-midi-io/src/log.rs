//! Injectable diagnostic sink.
//!
//! Every note-on, note-off and voice-reuse message is emitted through
//! `tracing` and, when one is installed, handed to the caller's sink.

use std::fmt;
use std::sync::Arc;

type SinkFn = dyn Fn(&str) + Send + Sync;

/// Receives human-readable diagnostic lines. The default discards them.
#[derive(Clone, Default)]
pub struct LogSink {
    sink: Option<Arc<SinkFn>>,
}

impl LogSink {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    pub fn none() -> Self {
        Self { sink: None }
    }

    #[inline]
    pub fn is_installed(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn emit(&self, args: fmt::Arguments<'_>) {
        if let Some(sink) = &self.sink {
            let line = args.to_string();
            tracing::debug!(target: "polybend", "{}", line);
            sink(&line);
        } else {
            tracing::debug!(target: "polybend", "{}", args);
        }
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("installed", &self.is_installed())
            .finish()
    }
}

/// Collects lines in memory. Handy for asserting on diagnostics.
#[derive(Clone, Debug, Default)]
pub struct LogBuffer {
    lines: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> LogSink {
        let lines = Arc::clone(&self.lines);
        LogSink::new(move |line| lines.lock().push(line.to_string()))
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }
}
