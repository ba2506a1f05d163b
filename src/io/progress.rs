//! Progress reporting for bulk operations.
//!
//! Progress is delivered synchronously between store calls, so a slow sink
//! stalls the pipeline. Keep implementations cheap.

/// Receives `(current, total)` progress updates.
pub trait ProgressSink: Send + Sync {
    /// Called after each unit of work.
    fn on_progress(&self, current: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_progress(&self, current: usize, total: usize) {
        self(current, total);
    }
}

/// Sink that records every update; handy in tests and tool handlers.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: std::sync::Mutex<Vec<(usize, usize)>>,
}

impl RecordingProgress {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates received so far.
    #[must_use]
    pub fn events(&self) -> Vec<(usize, usize)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// The most recent update.
    #[must_use]
    pub fn last(&self) -> Option<(usize, usize)> {
        self.events().last().copied()
    }
}

impl ProgressSink for RecordingProgress {
    fn on_progress(&self, current: usize, total: usize) {
        if let Ok(mut events) = self.events.lock() {
            events.push((current, total));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_sink() {
        let calls = AtomicUsize::new(0);
        let sink = |current: usize, _total: usize| {
            calls.fetch_add(current, Ordering::SeqCst);
        };
        sink.on_progress(2, 5);
        sink.on_progress(3, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingProgress::new();
        assert!(sink.last().is_none());
        sink.on_progress(1, 2);
        sink.on_progress(2, 2);
        assert_eq!(sink.events(), vec![(1, 2), (2, 2)]);
        assert_eq!(sink.last(), Some((2, 2)));
    }
}
