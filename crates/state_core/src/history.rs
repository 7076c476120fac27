use std::{collections::VecDeque, sync::Arc};

use shared::{events::EventKind, state::ApplicationState};

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub seq: u64,
    pub kind: EventKind,
    pub state: Arc<ApplicationState>,
}

/// Bounded record of the application states produced by recent events,
/// oldest first.
#[derive(Debug, Clone)]
pub struct StateHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl StateHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
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

    fn entry(seq: u64) -> HistoryEntry {
        HistoryEntry {
            seq,
            kind: EventKind::NavigateTo,
            state: Arc::new(ApplicationState::default()),
        }
    }

    #[test]
    fn drops_oldest_entries_past_capacity() {
        let mut history = StateHistory::new(2);
        history.push(entry(1));
        history.push(entry(2));
        history.push(entry(3));
        let seqs: Vec<_> = history.iter().map(|entry| entry.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
        assert_eq!(history.latest().map(|entry| entry.seq), Some(3));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = StateHistory::new(0);
        history.push(entry(1));
        assert!(history.is_empty());
    }
}
