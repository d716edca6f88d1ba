use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Recent operation outcomes, consulted for the consecutive-error trigger
pub trait ErrorHistory: Send + Sync {
    /// Errors in the unbroken run at the end of the history, counting only
    /// those recorded at or after `since`
    fn consecutive_errors(&self, since: DateTime<Utc>) -> u32;
}

const DEFAULT_CAPACITY: usize = 256;

/// In-memory outcome log bounded to a fixed number of entries
#[derive(Debug)]
pub struct ErrorTracker {
    outcomes: Mutex<VecDeque<(DateTime<Utc>, bool)>>,
    capacity: usize,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            outcomes: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn record_error(&self, at: DateTime<Utc>) {
        self.record(at, false);
    }

    pub fn record_success(&self, at: DateTime<Utc>) {
        self.record(at, true);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn record(&self, at: DateTime<Utc>, success: bool) {
        let mut outcomes = self.lock();
        if outcomes.len() == self.capacity {
            outcomes.pop_front();
        }
        outcomes.push_back((at, success));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<(DateTime<Utc>, bool)>> {
        self.outcomes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ErrorTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHistory for ErrorTracker {
    fn consecutive_errors(&self, since: DateTime<Utc>) -> u32 {
        self.lock()
            .iter()
            .rev()
            .take_while(|(at, success)| *at >= since && !success)
            .count() as u32
    }
}
