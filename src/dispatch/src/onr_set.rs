//! Deduplicated sets of object-and-relation identities
//!
//! `OnrSet` is the plain value returned to callers. `ResultCollector` wraps
//! one behind a mutex so that many dispatch tasks can insert concurrently;
//! it only ever grows.

use parking_lot::Mutex;
use relgraph_core::ObjectAndRelation;
use std::collections::hash_set;
use std::collections::HashSet;

/// A set of object-and-relation identities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnrSet {
    onrs: HashSet<ObjectAndRelation>,
}

impl OnrSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identity, returning `true` if it was not already present
    pub fn add(&mut self, onr: ObjectAndRelation) -> bool {
        self.onrs.insert(onr)
    }

    /// Whether the identity is present
    pub fn has(&self, onr: &ObjectAndRelation) -> bool {
        self.onrs.contains(onr)
    }

    pub fn len(&self) -> usize {
        self.onrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.onrs.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, ObjectAndRelation> {
        self.onrs.iter()
    }

    /// Identities present in either set
    pub fn union(&self, other: &OnrSet) -> OnrSet {
        self.onrs.union(&other.onrs).cloned().collect()
    }

    /// Identities present in both sets
    pub fn intersect(&self, other: &OnrSet) -> OnrSet {
        self.onrs.intersection(&other.onrs).cloned().collect()
    }

    /// Identities present in this set but not in `other`
    pub fn subtract(&self, other: &OnrSet) -> OnrSet {
        self.onrs.difference(&other.onrs).cloned().collect()
    }

    /// Contents in `type:id#relation` order
    pub fn to_sorted_vec(&self) -> Vec<ObjectAndRelation> {
        let mut onrs: Vec<_> = self.onrs.iter().cloned().collect();
        onrs.sort();
        onrs
    }
}

impl FromIterator<ObjectAndRelation> for OnrSet {
    fn from_iter<I: IntoIterator<Item = ObjectAndRelation>>(iter: I) -> Self {
        Self {
            onrs: iter.into_iter().collect(),
        }
    }
}

impl Extend<ObjectAndRelation> for OnrSet {
    fn extend<I: IntoIterator<Item = ObjectAndRelation>>(&mut self, iter: I) {
        self.onrs.extend(iter);
    }
}

impl IntoIterator for OnrSet {
    type Item = ObjectAndRelation;
    type IntoIter = hash_set::IntoIter<ObjectAndRelation>;

    fn into_iter(self) -> Self::IntoIter {
        self.onrs.into_iter()
    }
}

impl<'a> IntoIterator for &'a OnrSet {
    type Item = &'a ObjectAndRelation;
    type IntoIter = hash_set::Iter<'a, ObjectAndRelation>;

    fn into_iter(self) -> Self::IntoIter {
        self.onrs.iter()
    }
}

/// Concurrency-safe accumulator of resources found to have membership
///
/// Every insertion is serialized by a mutex. Reads are only meaningful once
/// all writers have finished.
#[derive(Debug, Default)]
pub struct ResultCollector {
    members: Mutex<OnrSet>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource; inserting the same resource twice is a no-op
    pub fn add(&self, resource: ObjectAndRelation) -> bool {
        self.members.lock().add(resource)
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> OnrSet {
        self.members.lock().clone()
    }

    /// Move the contents out, leaving the collector empty
    pub fn take(&self) -> OnrSet {
        std::mem::take(&mut *self.members.lock())
    }
}
