use std::collections::VecDeque;

use contracts::Event;

/// Newest-first event log that drops its oldest entries past `capacity`.
#[derive(Debug, Clone)]
pub struct Timeline {
    entries: VecDeque<Event>,
    capacity: usize,
}

impl Timeline {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild from a newest-first list, keeping only what fits.
    pub fn from_newest_first(events: Vec<Event>, capacity: usize) -> Self {
        let mut timeline = Self::with_capacity(capacity);
        timeline
            .entries
            .extend(events.into_iter().take(timeline.capacity));
        timeline
    }

    pub fn push(&mut self, event: Event) {
        self.entries.push_front(event);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.entries.front()
    }

    pub fn to_vec(&self) -> Vec<Event> {
        self.entries.iter().cloned().collect()
    }
}
