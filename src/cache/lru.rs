//! Recency List Module
//!
//! Owns every cache item: a key lookup map plus an intrusive doubly linked
//! list stored in an arena, so touch, insert and remove are all O(1).

use std::collections::HashMap;
use std::hash::Hash;

use generational_arena::{Arena, Index};

use crate::cache::CacheItem;

#[derive(Debug)]
struct Node<K, V> {
    item: CacheItem<K, V>,
    prev: Option<Index>,
    next: Option<Index>,
}

// == Recency List ==
/// Items ordered by last touch.
///
/// - Head = Most recently used
/// - Tail = Least recently used
#[derive(Debug)]
pub struct RecencyList<K, V> {
    nodes: Arena<Node<K, V>>,
    lookup: HashMap<K, Index>,
    head: Option<Index>,
    tail: Option<Index>,
}

impl<K: Eq + Hash + Clone, V> RecencyList<K, V> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            lookup: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    // Detaches a node from its neighbours without freeing it.
    fn unlink(&mut self, index: Index) {
        let (prev, next) = {
            let node = &self.nodes[index];
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }
    }

    fn link_front(&mut self, index: Index) {
        let old_head = self.head;
        {
            let node = &mut self.nodes[index];
            node.prev = None;
            node.next = old_head;
        }
        if let Some(old_head) = old_head {
            self.nodes[old_head].prev = Some(index);
        }
        self.head = Some(index);
        if self.tail.is_none() {
            self.tail = Some(index);
        }
    }

    // == Push Front ==
    /// Inserts a new item as the most recently used.
    ///
    /// Replaces (and returns) any item already stored under the same key.
    pub fn push_front(&mut self, item: CacheItem<K, V>) -> Option<CacheItem<K, V>> {
        let previous = self.remove(&item.key);
        let key = item.key.clone();
        let index = self.nodes.insert(Node {
            item,
            prev: None,
            next: None,
        });
        self.lookup.insert(key, index);
        self.link_front(index);
        previous
    }

    // == Touch ==
    /// Moves a key to the front and returns its item for in-place updates.
    pub fn touch(&mut self, key: &K) -> Option<&mut CacheItem<K, V>> {
        let index = *self.lookup.get(key)?;
        if self.head != Some(index) {
            self.unlink(index);
            self.link_front(index);
        }
        Some(&mut self.nodes[index].item)
    }

    // == Get ==
    /// Returns an item without changing its position.
    #[cfg(test)]
    pub(crate) fn get(&self, key: &K) -> Option<&CacheItem<K, V>> {
        let index = *self.lookup.get(key)?;
        Some(&self.nodes[index].item)
    }

    // == Get Mut ==
    /// Returns a mutable item without changing its position.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut CacheItem<K, V>> {
        let index = *self.lookup.get(key)?;
        Some(&mut self.nodes[index].item)
    }

    // == Remove ==
    /// Removes a key and returns its item.
    pub fn remove(&mut self, key: &K) -> Option<CacheItem<K, V>> {
        let index = self.lookup.remove(key)?;
        self.unlink(index);
        self.nodes.remove(index).map(|node| node.item)
    }

    // == Peek Back ==
    /// Returns the least recently used item without removing it.
    pub fn peek_back(&self) -> Option<&CacheItem<K, V>> {
        self.tail.map(|index| &self.nodes[index].item)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used item.
    #[cfg(test)]
    pub(crate) fn pop_back(&mut self) -> Option<CacheItem<K, V>> {
        let key = self.peek_back()?.key.clone();
        self.remove(&key)
    }

    // == Contains ==
    pub fn contains(&self, key: &K) -> bool {
        self.lookup.contains_key(key)
    }

    // == Keys ==
    /// Snapshot of all keys in map order (not recency order).
    pub fn keys(&self) -> Vec<K> {
        self.lookup.keys().cloned().collect()
    }

    /// Mutable access to every item, in no particular order.
    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut CacheItem<K, V>> {
        self.nodes.iter_mut().map(|(_, node)| &mut node.item)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lookup.clear();
        self.head = None;
        self.tail = None;
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    // Keys from head to tail.
    #[cfg(test)]
    pub(crate) fn keys_in_order(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut current = self.head;
        while let Some(index) = current {
            keys.push(self.nodes[index].item.key.clone());
            current = self.nodes[index].next;
        }
        keys
    }
}

impl<K: Eq + Hash + Clone, V> Default for RecencyList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    fn item(key: &'static str) -> CacheItem<&'static str, u32> {
        CacheItem::new(key, 0, Duration::ZERO, false, Instant::now())
    }

    fn list_of(keys: &[&'static str]) -> RecencyList<&'static str, u32> {
        let mut list = RecencyList::new();
        for key in keys {
            list.push_front(item(key));
        }
        list
    }

    #[test]
    fn test_list_new() {
        let list: RecencyList<&str, u32> = RecencyList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.peek_back().is_none());
    }

    #[test]
    fn test_push_front_orders_newest_first() {
        let list = list_of(&["key1", "key2", "key3"]);

        assert_eq!(list.len(), 3);
        assert_eq!(list.keys_in_order(), vec!["key3", "key2", "key1"]);
        assert_eq!(list.peek_back().map(|i| i.key), Some("key1"));
    }

    #[test]
    fn test_push_front_existing_key_replaces() {
        let mut list = list_of(&["a", "b"]);

        let item = CacheItem::new("a", 9, Duration::ZERO, true, Instant::now());
        let previous = list.push_front(item);
        assert_eq!(previous.map(|i| i.value), Some(0));
        assert_eq!(list.len(), 2);
        assert_eq!(list.keys_in_order(), vec!["a", "b"]);
        assert_eq!(list.get_mut(&"a").map(|i| i.value), Some(9));
    }

    #[test]
    fn test_touch_moves_to_front() {
        let mut list = list_of(&["a", "b", "c"]);

        list.touch(&"a");
        assert_eq!(list.keys_in_order(), vec!["a", "c", "b"]);

        // Touching the head is a no-op on order
        list.touch(&"a");
        assert_eq!(list.keys_in_order(), vec!["a", "c", "b"]);

        // Touching the middle
        list.touch(&"c");
        assert_eq!(list.keys_in_order(), vec!["c", "a", "b"]);
        assert_eq!(list.peek_back().map(|i| i.key), Some("b"));
    }

    #[test]
    fn test_touch_missing_key() {
        let mut list = list_of(&["a"]);
        assert!(list.touch(&"zzz").is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_pop_back_in_lru_order() {
        let mut list = list_of(&["a", "b", "c"]);
        list.touch(&"a");

        assert_eq!(list.pop_back().map(|i| i.key), Some("b"));
        assert_eq!(list.pop_back().map(|i| i.key), Some("c"));
        assert_eq!(list.pop_back().map(|i| i.key), Some("a"));
        assert!(list.pop_back().is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_middle_head_and_tail() {
        let mut list = list_of(&["a", "b", "c", "d"]);

        assert!(list.remove(&"b").is_some());
        assert_eq!(list.keys_in_order(), vec!["d", "c", "a"]);

        assert!(list.remove(&"d").is_some());
        assert_eq!(list.keys_in_order(), vec!["c", "a"]);

        assert!(list.remove(&"a").is_some());
        assert_eq!(list.keys_in_order(), vec!["c"]);
        assert_eq!(list.peek_back().map(|i| i.key), Some("c"));

        assert!(list.remove(&"nonexistent").is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_keys_and_clear() {
        let mut list = list_of(&["a", "b", "c"]);

        let mut keys = list.keys();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);

        list.clear();
        assert!(list.is_empty());
        assert!(list.keys_in_order().is_empty());

        // Usable after clear
        list.push_front(item("x"));
        assert_eq!(list.keys_in_order(), vec!["x"]);
    }
}
