//! Bounded least-recently-used cache of full queue items.
//!
//! Pure data structure without I/O. The queue mirror owns one and decides when
//! to fetch; the cache only stores and evicts.

use std::collections::{HashMap, VecDeque};

use crate::media::{QueueItem, QueueItemId};

/// LRU cache of queue items keyed by receiver item id.
///
/// `recency` holds every cached id exactly once, least recently used at the
/// front. Capacities are small (tens of items), so the linear scans on touch
/// are cheaper than a linked structure.
pub(crate) struct ItemCache {
    capacity: usize,
    entries: HashMap<QueueItemId, QueueItem>,
    recency: VecDeque<QueueItemId>,
}

impl ItemCache {
    /// Creates an empty cache. `capacity` must be at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: QueueItemId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns the item without updating recency.
    pub fn peek(&self, id: QueueItemId) -> Option<&QueueItem> {
        self.entries.get(&id)
    }

    /// Marks the item as most recently used and returns it.
    pub fn get(&mut self, id: QueueItemId) -> Option<&QueueItem> {
        if !self.entries.contains_key(&id) {
            return None;
        }
        self.promote(id);
        self.entries.get(&id)
    }

    /// Inserts or replaces an item, evicting the least recently used entry
    /// when full. Returns the evicted id, if any.
    pub fn insert(&mut self, id: QueueItemId, item: QueueItem) -> Option<QueueItemId> {
        if self.entries.insert(id, item).is_some() {
            self.promote(id);
            return None;
        }
        self.recency.push_back(id);

        if self.entries.len() > self.capacity {
            if let Some(evicted) = self.recency.pop_front() {
                self.entries.remove(&evicted);
                return Some(evicted);
            }
        }
        None
    }

    pub fn remove(&mut self, id: QueueItemId) -> Option<QueueItem> {
        let removed = self.entries.remove(&id)?;
        self.recency.retain(|cached| *cached != id);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    fn promote(&mut self, id: QueueItemId) {
        if let Some(index) = self.recency.iter().position(|cached| *cached == id) {
            self.recency.remove(index);
        }
        self.recency.push_back(id);
    }
}
