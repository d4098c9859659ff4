//! Invalidation graph between resource kinds

use std::collections::{BTreeMap, BTreeSet};

use crate::api::ResourceKind;

/// Which cached namespaces a successful write makes stale
///
/// A write to `kind` always invalidates `kind` itself plus every kind
/// reachable through the edges. The default graph has one edge: enrollment
/// writes change class enrollment counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationGraph {
    edges: BTreeMap<ResourceKind, BTreeSet<ResourceKind>>,
}

impl Default for InvalidationGraph {
    fn default() -> Self {
        Self::empty().with_edge(ResourceKind::Enrollment, ResourceKind::Class)
    }
}

impl InvalidationGraph {
    /// A graph where writes only invalidate their own resource
    pub fn empty() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }

    pub fn with_edge(mut self, written: ResourceKind, dependent: ResourceKind) -> Self {
        self.add_edge(written, dependent);
        self
    }

    pub fn add_edge(&mut self, written: ResourceKind, dependent: ResourceKind) {
        self.edges.entry(written).or_default().insert(dependent);
    }

    pub fn dependents(&self, written: ResourceKind) -> impl Iterator<Item = ResourceKind> + '_ {
        self.edges.get(&written).into_iter().flatten().copied()
    }

    /// Every kind to invalidate after a write to `written`, itself included
    pub fn affected(&self, written: ResourceKind) -> BTreeSet<ResourceKind> {
        let mut seen = BTreeSet::from([written]);
        let mut queue = vec![written];
        while let Some(kind) = queue.pop() {
            for next in self.dependents(kind) {
                if seen.insert(next) {
                    queue.push(next);
                }
            }
        }
        seen
    }
}
