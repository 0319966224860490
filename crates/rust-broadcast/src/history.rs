//! Bounded history of finished broadcasts.
//!
//! The history is a ring of [`BroadcastResult`]s. When full, the oldest
//! entry is discarded to make room for the newest.

use std::collections::VecDeque;

use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::result::BroadcastResult;
use crate::types::BroadcastId;

/// A ring buffer of broadcast results.
#[derive(Debug, Clone)]
pub struct BroadcastHistory {
    /// Entries, oldest first.
    entries: VecDeque<BroadcastResult>,
    /// Maximum number of entries.
    capacity: usize,
    /// Entries pushed since creation.
    total_pushed: usize,
    /// Entries discarded due to overflow.
    evicted: usize,
}

impl BroadcastHistory {
    /// Create a history holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
            total_pushed: 0,
            evicted: 0,
        }
    }

    /// Rebuild a history from stored entries, oldest first.
    ///
    /// Keeps only the newest `capacity` entries.
    #[must_use]
    pub fn restore(entries: Vec<BroadcastResult>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    /// Append an entry, evicting the oldest if full.
    pub fn push(&mut self, result: BroadcastResult) {
        self.total_pushed += 1;
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(result);
    }

    /// Up to `limit` entries, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<BroadcastResult> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// The newest entry with the given broadcast ID.
    #[must_use]
    pub fn get(&self, id: &BroadcastId) -> Option<&BroadcastResult> {
        self.entries.iter().rev().find(|r| &r.broadcast_id == id)
    }

    /// Iterate over entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &BroadcastResult> {
        self.entries.iter()
    }

    /// Fraction of successful sessions over all retained entries.
    ///
    /// `None` when no session results are retained.
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        let (ok, total) = self.entries.iter().fold((0usize, 0usize), |(ok, total), r| {
            (
                ok + r.summary.successful_sessions,
                total + r.summary.total_sessions,
            )
        });
        if total == 0 {
            None
        } else {
            Some(ok as f64 / total as f64)
        }
    }

    /// Remove every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries pushed since creation.
    #[must_use]
    pub const fn total_pushed(&self) -> usize {
        self.total_pushed
    }

    /// Entries discarded due to overflow.
    #[must_use]
    pub const fn evicted(&self) -> usize {
        self.evicted
    }
}

impl Default for BroadcastHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
