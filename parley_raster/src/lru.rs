// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A size-bounded least-recently-used cache shared by several segments.

use core::fmt::{Debug, Formatter};
use core::hash::Hash;

use hashbrown::{Equivalent, HashMap};

/// Identifies a segment of an [`LruCache`].
///
/// Identifiers are only valid until the next [`LruCache::clear`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SegmentId(usize);

/// Computes the size charged for an entry.
pub type SizeFn<K, V> = fn(&K, &V) -> usize;

/// A least-recently-used cache with a byte budget.
///
/// Entries live in segments, each with its own key space and size function,
/// but recency and the budget are global: when the total size of all entries
/// exceeds the capacity, the least recently used entries are evicted regardless
/// of the segment they belong to. An entry whose size is zero still occupies a
/// slot but never causes an eviction.
///
/// Nodes are kept in an arena and linked by index, most recently used first.
/// The cache is not synchronized.
pub struct LruCache<K, V> {
    segments: Vec<Segment<K, V>>,
    links: Vec<Link>,
    entries: Vec<Option<Entry<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    size: usize,
    capacity: usize,
}

struct Segment<K, V> {
    map: HashMap<K, usize>,
    size_of: SizeFn<K, V>,
}

struct Entry<K, V> {
    segment: usize,
    key: K,
    value: V,
    size: usize,
}

#[derive(Copy, Clone, Default)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates an empty cache that holds at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            segments: Vec::new(),
            links: Vec::new(),
            entries: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            size: 0,
            capacity,
        }
    }

    /// Registers a new, empty segment whose entries are charged `size_of`.
    pub fn add_segment(&mut self, size_of: SizeFn<K, V>) -> SegmentId {
        self.segments.push(Segment {
            map: HashMap::new(),
            size_of,
        });
        SegmentId(self.segments.len() - 1)
    }

    /// Returns the value for `key` in `segment` and marks it as most recently used.
    pub fn get<Q>(&mut self, segment: SegmentId, key: &Q) -> Option<&V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let index = *self.segment(segment).map.get(key)?;
        if self.head != Some(index) {
            self.unlink(index);
            self.push_front(index);
        }
        self.entries[index].as_ref().map(|entry| &entry.value)
    }

    /// Returns the value for `key` in `segment` without changing its recency.
    pub fn peek<Q>(&self, segment: SegmentId, key: &Q) -> Option<&V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let index = *self.segment(segment).map.get(key)?;
        self.entries[index].as_ref().map(|entry| &entry.value)
    }

    /// Inserts `value` as the most recently used entry, then evicts the least
    /// recently used entries until the total size fits the capacity.
    ///
    /// The new entry itself is evicted if it alone exceeds the capacity.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already present in `segment`.
    pub fn set(&mut self, segment: SegmentId, key: K, value: V) {
        let entries = self.segment(segment);
        assert!(
            !entries.map.contains_key(&key),
            "key is already present in the segment"
        );
        let size = (entries.size_of)(&key, &value);
        let index = self.alloc(Entry {
            segment: segment.0,
            key: key.clone(),
            value,
            size,
        });
        self.segments[segment.0].map.insert(key, index);
        self.push_front(index);
        self.size += size;
        self.evict();
    }

    /// Removes `key` from `segment` and returns its value.
    pub fn remove<Q>(&mut self, segment: SegmentId, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let index = self.segment_mut(segment).map.remove(key)?;
        self.release(index).map(|entry| entry.value)
    }

    /// Removes every entry and every segment. The capacity is unchanged.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.links.clear();
        self.entries.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.size = 0;
    }

    /// Returns the total size of all entries.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the maximum total size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of entries across all segments.
    pub fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of entries in `segment`.
    pub fn segment_len(&self, segment: SegmentId) -> usize {
        self.segment(segment).map.len()
    }

    fn check(&self, segment: SegmentId) -> usize {
        assert!(
            segment.0 < self.segments.len(),
            "segment {} does not belong to this cache",
            segment.0
        );
        segment.0
    }

    fn segment(&self, segment: SegmentId) -> &Segment<K, V> {
        &self.segments[self.check(segment)]
    }

    fn segment_mut(&mut self, segment: SegmentId) -> &mut Segment<K, V> {
        let index = self.check(segment);
        &mut self.segments[index]
    }

    fn evict(&mut self) {
        while self.size > self.capacity {
            let Some(index) = self.tail else {
                break;
            };
            let Some(entry) = self.release(index) else {
                break;
            };
            self.segments[entry.segment].map.remove(&entry.key);
            log::trace!(
                "evicted entry of {} bytes from segment {}",
                entry.size,
                entry.segment
            );
        }
    }

    fn alloc(&mut self, entry: Entry<K, V>) -> usize {
        if let Some(index) = self.free.pop() {
            self.entries[index] = Some(entry);
            index
        } else {
            self.entries.push(Some(entry));
            self.links.push(Link::default());
            self.entries.len() - 1
        }
    }

    /// Unlinks the node at `index` and frees its slot. The caller removes the
    /// key from its segment map.
    fn release(&mut self, index: usize) -> Option<Entry<K, V>> {
        let entry = self.entries[index].take()?;
        self.unlink(index);
        self.free.push(index);
        self.size -= entry.size;
        Some(entry)
    }

    fn unlink(&mut self, index: usize) {
        let Link { prev, next } = self.links[index];
        match prev {
            Some(prev) => self.links[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.links[next].prev = prev,
            None => self.tail = prev,
        }
        self.links[index] = Link::default();
    }

    fn push_front(&mut self, index: usize) {
        self.links[index] = Link {
            prev: None,
            next: self.head,
        };
        match self.head {
            Some(head) => self.links[head].prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
    }
}

impl<K, V> Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LruCache")
            .field("segments", &self.segments.len())
            .field("entries", &(self.entries.len() - self.free.len()))
            .field("size", &self.size)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
