//! Bounded FIFO log of past broadcast messages.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of messages kept for replay.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One relayed message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Receipt time, ms since epoch.
    pub time: i64,
    /// Display name of the sender.
    pub author: String,
    /// Raw inbound payload.
    pub text: String,
}

/// Fixed-capacity message log. Oldest entries are evicted first.
#[derive(Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create a buffer holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append the newest entry, evicting the oldest when full.
    pub fn append(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Point-in-time copy of all entries, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: i64) -> HistoryEntry {
        HistoryEntry {
            time: i,
            author: "Alice".into(),
            text: format!("msg {i}"),
        }
    }

    #[test]
    fn starts_empty() {
        let buf = HistoryBuffer::default();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 100);
        assert!(buf.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_oldest_first() {
        let mut buf = HistoryBuffer::new(10);
        buf.append(entry(1));
        buf.append(entry(2));
        buf.append(entry(3));
        let times: Vec<i64> = buf.snapshot().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![1, 2, 3]);
    }

    #[test]
    fn keeps_last_hundred_of_one_hundred_one() {
        let mut buf = HistoryBuffer::default();
        for i in 0..101 {
            buf.append(entry(i));
        }
        assert_eq!(buf.len(), 100);
        let snap = buf.snapshot();
        assert_eq!(snap.first().unwrap().time, 1);
        assert_eq!(snap.last().unwrap().time, 100);
    }

    #[test]
    fn snapshot_is_detached_copy() {
        let mut buf = HistoryBuffer::new(2);
        buf.append(entry(1));
        let snap = buf.snapshot();
        buf.append(entry(2));
        buf.append(entry(3));
        assert_eq!(snap, vec![entry(1)]);
    }

    #[test]
    fn zero_capacity_clamped_to_one() {
        let mut buf = HistoryBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.append(entry(1));
        buf.append(entry(2));
        assert_eq!(buf.snapshot(), vec![entry(2)]);
    }

    #[test]
    fn entry_serializes_wire_fields() {
        let json = serde_json::to_value(entry(7)).unwrap();
        assert_eq!(json["time"], 7);
        assert_eq!(json["author"], "Alice");
        assert_eq!(json["text"], "msg 7");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_exceeds_capacity(cap in 1usize..20, n in 0usize..80) {
                let mut buf = HistoryBuffer::new(cap);
                for i in 0..n {
                    buf.append(entry(i as i64));
                }
                prop_assert!(buf.len() <= cap);
                prop_assert_eq!(buf.len(), n.min(cap));
            }

            #[test]
            fn retains_most_recent_in_order(cap in 1usize..20, n in 0usize..80) {
                let mut buf = HistoryBuffer::new(cap);
                for i in 0..n {
                    buf.append(entry(i as i64));
                }
                let times: Vec<i64> = buf.snapshot().iter().map(|e| e.time).collect();
                let expected: Vec<i64> = (n.saturating_sub(cap)..n).map(|i| i as i64).collect();
                prop_assert_eq!(times, expected);
            }
        }
    }
}
