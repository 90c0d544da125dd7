//! Recency tracking for LRU eviction
//!
//! [`LruList`] is a doubly-linked recency list stored in an arena: nodes live
//! in a slot table and link to each other by slot index, and an index maps each
//! topic to its slot. Every mutation is O(1) amortized. [`LruTracker`] wraps the
//! list in a mutex so a layer can share it between tasks.

use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Node {
    topic: String,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency order over a set of topics, most-recently-used at the head.
#[derive(Debug, Default)]
pub struct LruList {
    slots: Vec<Node>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl LruList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Mark `topic` as most-recently-used, tracking it if it is new.
    pub fn touch(&mut self, topic: &str) {
        if let Some(&slot) = self.index.get(topic) {
            if self.head != Some(slot) {
                self.unlink(slot);
                self.push_front(slot);
            }
            return;
        }

        let slot = self.alloc(topic);
        self.index.insert(topic.to_string(), slot);
        self.push_front(slot);
    }

    /// Remove and return the least-recently-used topic.
    pub fn pop(&mut self) -> Option<String> {
        let slot = self.tail?;
        self.unlink(slot);
        Some(self.release(slot))
    }

    /// Stop tracking `topic`. Returns whether it was tracked.
    pub fn remove(&mut self, topic: &str) -> bool {
        match self.index.get(topic).copied() {
            Some(slot) => {
                self.unlink(slot);
                self.release(slot);
                true
            }
            None => false,
        }
    }

    /// The topic that the next `pop` would return
    pub fn peek_lru(&self) -> Option<&str> {
        self.tail.map(|slot| self.slots[slot].topic.as_str())
    }

    pub fn peek_mru(&self) -> Option<&str> {
        self.head.map(|slot| self.slots[slot].topic.as_str())
    }

    /// Topics from most- to least-recently-used
    pub fn iter_mru(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::successors(self.head, move |&slot| self.slots[slot].next)
            .take(self.index.len())
            .map(move |slot| self.slots[slot].topic.as_str())
    }

    fn alloc(&mut self, topic: &str) -> usize {
        let node = Node {
            topic: topic.to_string(),
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = node;
                slot
            }
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            }
        }
    }

    /// Return a detached slot to the free list and drop its index entry.
    fn release(&mut self, slot: usize) -> String {
        let topic = std::mem::take(&mut self.slots[slot].topic);
        self.index.remove(&topic);
        self.free.push(slot);
        topic
    }

    /// Detach a slot, patching its neighbours and the head/tail ends.
    fn unlink(&mut self, slot: usize) {
        let prev = self.slots[slot].prev.take();
        let next = self.slots[slot].next.take();

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, slot: usize) {
        self.slots[slot].prev = None;
        self.slots[slot].next = self.head;
        match self.head {
            Some(old) => self.slots[old].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    /// Panics unless the links, ends and index agree with each other.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.head.is_none(), self.tail.is_none());
        assert_eq!(self.head.is_none(), self.index.is_empty());

        let mut walked = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            walked += 1;
            assert!(walked <= self.index.len(), "recency list has a cycle");
            let node = &self.slots[slot];
            assert_eq!(node.prev, prev, "broken back link at {}", node.topic);
            assert_eq!(self.index.get(&node.topic), Some(&slot));
            prev = Some(slot);
            cursor = node.next;
        }
        assert_eq!(prev, self.tail);
        assert_eq!(walked, self.index.len());
        assert_eq!(self.slots.len(), self.index.len() + self.free.len());
    }
}

/// An [`LruList`] behind a mutex; each call holds the lock for its whole
/// relink.
#[derive(Debug, Default)]
pub struct LruTracker {
    list: Mutex<LruList>,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn touch(&self, topic: &str) {
        self.list.lock().await.touch(topic);
    }

    pub async fn pop(&self) -> Option<String> {
        self.list.lock().await.pop()
    }

    pub async fn remove(&self, topic: &str) -> bool {
        self.list.lock().await.remove(topic)
    }

    pub async fn len(&self) -> usize {
        self.list.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.list.lock().await.is_empty()
    }

    pub async fn peek_lru(&self) -> Option<String> {
        self.list.lock().await.peek_lru().map(str::to_string)
    }

    /// Tracked topics from most- to least-recently-used
    pub async fn snapshot(&self) -> Vec<String> {
        self.list
            .lock()
            .await
            .iter_mru()
            .map(str::to_string)
            .collect()
    }

    #[cfg(test)]
    pub(crate) async fn assert_invariants(&self) {
        self.list.lock().await.assert_invariants();
    }
}
