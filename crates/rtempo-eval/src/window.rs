//! Time-ordered window shared by the frequency and correlation matchers.

use std::collections::VecDeque;

/// Entries ordered by timestamp.
///
/// Timestamps are milliseconds since epoch. Entries stay sorted whatever
/// order they are pushed in, with ties kept in arrival order, so pruning
/// from the front evicts every expired entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow<T> {
    entries: VecDeque<(i64, T)>,
}

impl<T> Default for TimeWindow<T> {
    fn default() -> Self {
        TimeWindow {
            entries: VecDeque::new(),
        }
    }
}

impl<T> TimeWindow<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ts: i64, item: T) {
        if self.entries.back().is_none_or(|(t, _)| *t <= ts) {
            self.entries.push_back((ts, item));
        } else {
            let idx = self.entries.partition_point(|(t, _)| *t <= ts);
            self.entries.insert(idx, (ts, item));
        }
    }

    /// Remove every leading entry with a timestamp strictly older than `cutoff`.
    ///
    /// Returns how many entries were evicted.
    pub fn evict_before(&mut self, cutoff: i64) -> usize {
        let before = self.entries.len();
        while self.entries.front().is_some_and(|(t, _)| *t < cutoff) {
            self.entries.pop_front();
        }
        before - self.entries.len()
    }

    /// Prune relative to `now`: keep entries with `ts >= now - window_ms`.
    pub fn prune(&mut self, now: i64, window_ms: i64) -> usize {
        self.evict_before(now.saturating_sub(window_ms))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Timestamp of the oldest entry.
    pub fn oldest(&self) -> Option<i64> {
        self.entries.front().map(|(t, _)| *t)
    }

    /// Timestamp of the newest entry.
    pub fn newest(&self) -> Option<i64> {
        self.entries.back().map(|(t, _)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(i64, T)> {
        self.entries.iter()
    }
}
