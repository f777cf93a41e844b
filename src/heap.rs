//! Indexed binary min-heap with decrease-key.
//!
//! `std::collections::BinaryHeap` cannot lower the key of an element that is
//! already queued, so Dijkstra on top of it has to push duplicates and skip
//! stale entries. This heap tracks where every item sits, so a relaxation
//! moves the existing entry instead.
//!
//! Items are dense `usize` ids (vertex handles). Ordering is by key, then by
//! item id, which makes ties deterministic.

use std::cmp::Ordering;

const ABSENT: usize = usize::MAX;

#[derive(Debug, Clone)]
pub struct IndexedMinHeap {
    /// Heap-ordered item ids
    heap: Vec<usize>,
    /// item -> position in `heap` (ABSENT if not queued)
    pos: Vec<usize>,
    /// item -> current key
    keys: Vec<f64>,
}

impl IndexedMinHeap {
    /// Heap for items `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity.min(1024)),
            pos: vec![ABSENT; capacity],
            keys: vec![f64::INFINITY; capacity],
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, item: usize) -> bool {
        self.pos.get(item).is_some_and(|&p| p != ABSENT)
    }

    /// Insert `item`, or lower its key if it is already queued.
    ///
    /// Returns false (and does nothing) if the item is queued with a key that
    /// is already <= `key`, or if `item` is outside the capacity.
    pub fn push_or_decrease(&mut self, item: usize, key: f64) -> bool {
        if item >= self.pos.len() {
            return false;
        }
        match self.pos[item] {
            ABSENT => {
                self.keys[item] = key;
                self.pos[item] = self.heap.len();
                self.heap.push(item);
                self.sift_up(self.heap.len() - 1);
                true
            }
            at => {
                if key.total_cmp(&self.keys[item]) != Ordering::Less {
                    return false;
                }
                self.keys[item] = key;
                self.sift_up(at);
                true
            }
        }
    }

    /// Remove and return the item with the smallest key.
    pub fn pop(&mut self) -> Option<(usize, f64)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let item = self.heap.pop()?;
        self.pos[item] = ABSENT;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((item, self.keys[item]))
    }

    fn less(&self, a: usize, b: usize) -> bool {
        match self.keys[a].total_cmp(&self.keys[b]) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => a < b,
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.pos[self.heap[i]] = i;
        self.pos[self.heap[j]] = j;
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.less(self.heap[i], self.heap[parent]) {
                self.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut smallest = i;
            if left < len && self.less(self.heap[left], self.heap[smallest]) {
                smallest = left;
            }
            if right < len && self.less(self.heap[right], self.heap[smallest]) {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap(i, smallest);
            i = smallest;
        }
    }
}
