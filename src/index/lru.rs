//! # Least Recently Used (LRU) Key Index
//!
//! Single-threaded core of the [`BoundedIndexCache`](super::BoundedIndexCache):
//! maps a requested [`Timestamp`] to the [`EntryRef`] effective at that key
//! and evicts the least recently used mapping once capacity is reached.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                           LruIndex<V>                                │
//!   │                                                                      │
//!   │   FxHashMap<Timestamp, NonNull<Node<V>>>                             │
//!   │                                                                      │
//!   │   head ──► ┌──────┐ ◄──► ┌──────┐ ◄──► ┌──────┐ ◄── tail            │
//!   │    (MRU)   │ t=30 │      │ t=25 │      │ t=10 │    (LRU)            │
//!   │            │ e@30 │      │ e@20 │      │ e@10 │                     │
//!   │            └──────┘      └──────┘      └──────┘                     │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Several keys may map to the same entry: a lookup at `t=25` that resolved
//! to the value stored at `t=20` is remembered under `25`, while gap filling
//! records the value under its own key `20`.
//!
//! ## Operations
//!
//! | Method            | Complexity | Description                               |
//! |-------------------|------------|-------------------------------------------|
//! | `insert(k, e)`    | O(1)*      | Insert or replace, may evict LRU          |
//! | `get(&k)`         | O(1)       | Lookup, moves to MRU position             |
//! | `peek(&k)`        | O(1)       | Lookup without affecting order            |
//! | `remove(&k)`      | O(1)       | Remove mapping                            |
//! | `pop_lru()`       | O(1)       | Remove least recently used mapping        |
//! | `set_capacity(n)` | O(evicted) | Resize, evicting LRU mappings on shrink   |
//! | `clear()`         | O(n)       | Remove all mappings                       |
//!
//! ## Thread Safety
//!
//! `LruIndex` is **not** thread-safe; the outer `BoundedIndexCache` wraps it
//! in a `parking_lot::Mutex`.

use std::fmt;
use std::ptr::NonNull;

use rustc_hash::FxHashMap;

use crate::entry::EntryRef;
use crate::error::InvariantError;
use crate::time::Timestamp;

#[repr(C)]
struct Node<V> {
    prev: Option<NonNull<Node<V>>>,
    next: Option<NonNull<Node<V>>>,
    key: Timestamp,
    entry: EntryRef<V>,
}

/// LRU map from requested key to resolved entry.
pub struct LruIndex<V> {
    map: FxHashMap<Timestamp, NonNull<Node<V>>>,
    head: Option<NonNull<Node<V>>>,
    tail: Option<NonNull<Node<V>>>,
    capacity: usize,
}

// SAFETY: nodes are heap memory owned exclusively by the index; moving the
// index moves ownership of every node with it.
unsafe impl<V: Send + Sync> Send for LruIndex<V> {}

// SAFETY: shared access only reads through `peek`/`contains`; all mutation
// needs `&mut self`.
unsafe impl<V: Send + Sync> Sync for LruIndex<V> {}

impl<V> LruIndex<V> {
    /// Creates an index holding at most `capacity` mappings. A capacity of 0
    /// accepts no mappings.
    pub fn new(capacity: usize) -> Self {
        LruIndex {
            map: FxHashMap::with_capacity_and_hasher(capacity.min(4096), Default::default()),
            head: None,
            tail: None,
            capacity,
        }
    }

    #[inline(always)]
    fn detach(&mut self, node_ptr: NonNull<Node<V>>) {
        // SAFETY: `node_ptr` comes from `map`, so it points to a live node
        // whose neighbours are live nodes of this list.
        unsafe {
            let node = node_ptr.as_ref();
            let prev = node.prev;
            let next = node.next;

            match prev {
                Some(mut p) => p.as_mut().next = next,
                None => self.head = next,
            }

            match next {
                Some(mut n) => n.as_mut().prev = prev,
                None => self.tail = prev,
            }
        }
    }

    #[inline(always)]
    fn attach_front(&mut self, mut node_ptr: NonNull<Node<V>>) {
        // SAFETY: `node_ptr` is live and currently detached.
        unsafe {
            let node = node_ptr.as_mut();
            node.prev = None;
            node.next = self.head;

            match self.head {
                Some(mut h) => h.as_mut().prev = Some(node_ptr),
                None => self.tail = Some(node_ptr),
            }

            self.head = Some(node_ptr);
        }
    }

    #[inline(always)]
    fn pop_tail(&mut self) -> Option<Box<Node<V>>> {
        self.tail.map(|tail_ptr| {
            // SAFETY: the tail was allocated by `Box::leak` in `insert` and
            // is unlinked here before ownership returns to the box.
            let node = unsafe { Box::from_raw(tail_ptr.as_ptr()) };

            self.tail = node.prev;
            match self.tail {
                // SAFETY: the new tail is a live node of this list.
                Some(mut t) => unsafe { t.as_mut().next = None },
                None => self.head = None,
            }

            node
        })
    }

    /// Inserts or replaces the mapping for `key`, returning the old entry.
    pub fn insert(&mut self, key: Timestamp, entry: EntryRef<V>) -> Option<EntryRef<V>> {
        if let Some(&node_ptr) = self.map.get(&key) {
            // SAFETY: pointer from `map` is live; we hold `&mut self`.
            let previous = unsafe { std::mem::replace(&mut (*node_ptr.as_ptr()).entry, entry) };
            self.detach(node_ptr);
            self.attach_front(node_ptr);
            return Some(previous);
        }

        if self.capacity == 0 {
            return None;
        }

        while self.map.len() >= self.capacity {
            match self.pop_tail() {
                Some(evicted) => {
                    self.map.remove(&evicted.key);
                },
                None => break,
            }
        }

        let node = Box::new(Node {
            prev: None,
            next: None,
            key,
            entry,
        });
        let node_ptr = NonNull::from(Box::leak(node));

        self.map.insert(key, node_ptr);
        self.attach_front(node_ptr);
        None
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get(&mut self, key: &Timestamp) -> Option<&EntryRef<V>> {
        let node_ptr = *self.map.get(key)?;
        self.detach(node_ptr);
        self.attach_front(node_ptr);
        // SAFETY: node stays live for as long as `self` is borrowed.
        unsafe { Some(&(*node_ptr.as_ptr()).entry) }
    }

    /// Looks up `key` without touching recency order.
    pub fn peek(&self, key: &Timestamp) -> Option<&EntryRef<V>> {
        let node_ptr = self.map.get(key)?;
        // SAFETY: node stays live for as long as `self` is borrowed.
        unsafe { Some(&(*node_ptr.as_ptr()).entry) }
    }

    pub fn contains(&self, key: &Timestamp) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &Timestamp) -> Option<EntryRef<V>> {
        let node_ptr = self.map.remove(key)?;
        self.detach(node_ptr);
        // SAFETY: node was detached and removed from `map`; nothing else
        // refers to it.
        let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };
        Some(node.entry)
    }

    /// Removes and returns the least recently used mapping.
    pub fn pop_lru(&mut self) -> Option<(Timestamp, EntryRef<V>)> {
        let node = self.pop_tail()?;
        self.map.remove(&node.key);
        Some((node.key, node.entry))
    }

    /// Least recently used mapping, without removing it.
    pub fn peek_lru(&self) -> Option<(Timestamp, &EntryRef<V>)> {
        // SAFETY: the tail is a live node.
        self.tail
            .map(|ptr| unsafe { ((*ptr.as_ptr()).key, &(*ptr.as_ptr()).entry) })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes capacity, evicting LRU mappings until `len <= capacity`.
    /// Returns the number of evicted mappings.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity;
        let mut evicted = 0;
        while self.map.len() > capacity {
            if self.pop_lru().is_none() {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    pub fn clear(&mut self) {
        while self.pop_tail().is_some() {}
        self.map.clear();
    }

    /// Walks the list and checks it against the map.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.map.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "index holds {} mappings, capacity {}",
                self.map.len(),
                self.capacity
            )));
        }
        let mut count = 0usize;
        let mut current = self.head;
        let mut prev: Option<NonNull<Node<V>>> = None;
        while let Some(ptr) = current {
            count += 1;
            if count > self.map.len() {
                return Err(InvariantError::new("cycle in recency list"));
            }
            // SAFETY: every pointer reachable from `head` is a live node.
            let node = unsafe { ptr.as_ref() };
            if node.prev != prev {
                return Err(InvariantError::new("broken back link in recency list"));
            }
            if self.map.get(&node.key) != Some(&ptr) {
                return Err(InvariantError::new(format!(
                    "list node {} missing from map",
                    node.key
                )));
            }
            prev = current;
            current = node.next;
        }
        if count != self.map.len() || self.tail != prev {
            return Err(InvariantError::new(format!(
                "list length {count} does not match map length {}",
                self.map.len()
            )));
        }
        Ok(())
    }
}

impl<V> Drop for LruIndex<V> {
    fn drop(&mut self) {
        while self.pop_tail().is_some() {}
    }
}

impl<V> fmt::Debug for LruIndex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruIndex")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
