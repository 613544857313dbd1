//! Id-keyed resource reconciliation.
//!
//! Each layout change yields a new set of pane ids. Resources bound to ids
//! that survive are kept as-is; new ids get fresh resources and vanished
//! ids are released. A pane that moves keeps its terminal.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileDiff<K> {
    pub added: Vec<K>,
    pub removed: Vec<K>,
    pub retained: Vec<K>,
}

impl<K> ReconcileDiff<K> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler<K, R> {
    resources: HashMap<K, R>,
}

impl<K, R> Default for Reconciler<K, R> {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone + Ord, R> Reconciler<K, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the resource map in line with `ids`.
    ///
    /// `allocate` runs for each new id in the given order; `release` runs
    /// for each vanished id in sorted order.
    pub fn sync<I, A, F>(&mut self, ids: I, mut allocate: A, mut release: F) -> ReconcileDiff<K>
    where
        I: IntoIterator<Item = K>,
        A: FnMut(&K) -> R,
        F: FnMut(K, R),
    {
        let mut seen: Vec<K> = Vec::new();
        let mut added = Vec::new();
        let mut retained = Vec::new();
        for id in ids {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id.clone());
            if self.resources.contains_key(&id) {
                retained.push(id);
            } else {
                let resource = allocate(&id);
                self.resources.insert(id.clone(), resource);
                added.push(id);
            }
        }

        let mut removed: Vec<K> = self
            .resources
            .keys()
            .filter(|k| !seen.contains(k))
            .cloned()
            .collect();
        removed.sort();
        for id in &removed {
            if let Some(resource) = self.resources.remove(id) {
                release(id.clone(), resource);
            }
        }

        ReconcileDiff {
            added,
            removed,
            retained,
        }
    }

    pub fn get(&self, id: &K) -> Option<&R> {
        self.resources.get(id)
    }

    pub fn get_mut(&mut self, id: &K) -> Option<&mut R> {
        self.resources.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
