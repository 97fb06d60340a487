//! Bounded, append-only log buffer with level-aware filtering.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::entry::{LevelFilter, LogEntry};

/// Default number of retained entries.
pub const DEFAULT_CAPACITY: usize = 500;

/// Outcome of a single `append` call.
///
/// Reported separately from the buffer contents so consumers that only
/// need "how many new lines" never diff the whole buffer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppendDelta {
    /// Number of entries in the appended batch.
    pub added: usize,

    /// Number of entries evicted to stay within capacity.
    pub evicted: usize,
}

impl AppendDelta {
    pub fn is_empty(&self) -> bool {
        self.added == 0
    }
}

/// Fixed-capacity FIFO store of received log lines.
///
/// Appending past capacity evicts the oldest entries first; the retained
/// suffix keeps its arrival order.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a batch in arrival order.
    ///
    /// Each entry is stamped with the next arrival sequence number. Any
    /// `id` carried in by the caller is overwritten.
    pub fn append<I>(&mut self, batch: I) -> AppendDelta
    where
        I: IntoIterator<Item = LogEntry>,
    {
        let mut delta = AppendDelta::default();

        for mut entry in batch {
            entry.id = self.next_id;
            self.next_id += 1;

            if self.entries.len() == self.capacity {
                self.entries.pop_front();
                delta.evicted += 1;
            }
            self.entries.push_back(entry);
            delta.added += 1;
        }

        delta
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &LogEntry> + DoubleEndedIterator + '_ {
        self.entries.iter()
    }

    /// Most recently appended entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Entries whose resolved level passes `level` and whose content
    /// contains `query` (case-insensitive). An empty query matches all.
    pub fn filter(&self, level: LevelFilter, query: &str) -> Vec<&LogEntry> {
        let needle = query.to_lowercase();

        self.entries
            .iter()
            .filter(|entry| level.accepts(entry.resolved_level()))
            .filter(|entry| needle.is_empty() || entry.content.to_lowercase().contains(&needle))
            .collect()
    }

    /// Drop every entry. Sequence numbers keep increasing afterwards.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
