//! Rolling operator event log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Fixed-capacity log; the oldest entry is dropped when full.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<EventEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(EventEntry {
            timestamp: Utc::now(),
            message: message.into(),
        });
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<EventEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_oldest_when_full() {
        let mut log = EventLog::new(10);
        for i in 0..15 {
            log.push(format!("event {i}"));
        }
        assert_eq!(log.len(), 10);
        let entries = log.entries();
        assert_eq!(entries[0].message, "event 5");
        assert_eq!(entries[9].message, "event 14");
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut log = EventLog::new(0);
        log.push("a");
        log.push("b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].message, "b");
    }
}
