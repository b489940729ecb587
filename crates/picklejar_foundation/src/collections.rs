//! Persistent collections with structural sharing.
//!
//! Sequences wrap the `im` crate's persistent vector; maps and sets wrap
//! `indexmap` behind an `Arc` so they keep insertion order and still clone in
//! O(1). A subgraph that the pickle memo shares between several parents is
//! therefore stored once in the object graph.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

/// Persistent vector with structural sharing.
///
/// Cloning is O(1). Modifications return a new vector sharing structure
/// with the original.
#[derive(Clone, Default)]
pub struct PjVec<T>(im::Vector<T>)
where
    T: Clone;

impl<T: Clone> PjVec<T> {
    /// Creates an empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self(im::Vector::new())
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets an element by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get(index)
    }

    /// Returns a new vector with the element appended.
    #[must_use]
    pub fn push_back(&self, value: T) -> Self {
        let mut new = self.0.clone();
        new.push_back(value);
        Self(new)
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.0.iter()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for PjVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Clone + PartialEq> PartialEq for PjVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: Clone + Eq> Eq for PjVec<T> {}

impl<T: Clone + Hash> Hash for PjVec<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for item in self.iter() {
            item.hash(state);
        }
    }
}

impl<T: Clone> FromIterator<T> for PjVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(im::Vector::from_iter(iter))
    }
}

impl<'a, T: Clone> IntoIterator for &'a PjVec<T> {
    type Item = &'a T;
    type IntoIter = im::vector::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Insertion-ordered, key-unique map.
///
/// Inserting an existing key replaces its value and keeps the key's original
/// position. Equality and hashing are order-sensitive.
#[derive(Clone)]
pub struct PjMap<K, V>(Arc<IndexMap<K, V>>);

impl<K: Eq + Hash, V> Default for PjMap<K, V> {
    fn default() -> Self {
        Self(Arc::new(IndexMap::new()))
    }
}

impl<K: Clone + Eq + Hash, V: Clone> PjMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets a value by key.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.0.get(key)
    }

    /// Returns true if the map contains the key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.0.contains_key(key)
    }

    /// Returns a new map with the key-value pair inserted (last write wins).
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let mut new = self.clone();
        Arc::make_mut(&mut new.0).insert(key, value);
        new
    }

    /// Returns an iterator over entries in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> + ExactSizeIterator {
        self.0.iter()
    }

    /// Returns an iterator over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.0.keys()
    }

    /// Returns an iterator over values in insertion order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator {
        self.0.values()
    }
}

impl<K: Eq + Hash, V> From<IndexMap<K, V>> for PjMap<K, V> {
    fn from(map: IndexMap<K, V>) -> Self {
        Self(Arc::new(map))
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PjMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for PjMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter()))
    }
}

impl<K: Eq, V: Eq> Eq for PjMap<K, V> {}

impl<K: Hash, V: Hash> Hash for PjMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for (k, v) in self.0.iter() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for PjMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(Arc::new(IndexMap::from_iter(iter)))
    }
}

/// Insertion-ordered set.
///
/// Duplicate members are dropped on insert; the first occurrence keeps its
/// position. Equality and hashing are order-sensitive.
#[derive(Clone)]
pub struct PjSet<T>(Arc<IndexSet<T>>);

impl<T: Eq + Hash> Default for PjSet<T> {
    fn default() -> Self {
        Self(Arc::new(IndexSet::new()))
    }
}

impl<T: Clone + Eq + Hash> PjSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the set contains the value.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.0.contains(value)
    }

    /// Returns a new set with the value inserted.
    #[must_use]
    pub fn insert(&self, value: T) -> Self {
        let mut new = self.clone();
        Arc::make_mut(&mut new.0).insert(value);
        new
    }

    /// Returns an iterator over members in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.0.iter()
    }
}

impl<T: Eq + Hash> From<IndexSet<T>> for PjSet<T> {
    fn from(set: IndexSet<T>) -> Self {
        Self(Arc::new(set))
    }
}

impl<T: fmt::Debug> fmt::Debug for PjSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for PjSet<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter()))
    }
}

impl<T: Eq> Eq for PjSet<T> {}

impl<T: Hash> Hash for PjSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for item in self.0.iter() {
            item.hash(state);
        }
    }
}

impl<T: Eq + Hash> FromIterator<T> for PjSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(Arc::new(IndexSet::from_iter(iter)))
    }
}
