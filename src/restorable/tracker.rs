use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::foundation::core::ImageId;
use crate::foundation::error::{RestoreError, RestoreResult};

/// Directed graph of which images' pixels depend on which other images' pixels.
///
/// Nodes are images taking part in a pass; an edge `dependent -> dependency` exists when an
/// unresolved command of `dependent` samples `dependency`. Edges to images outside the node set
/// are ignored: those images already hold their final pixels.
///
/// Determinism rule: when several images are ready, the smallest [`ImageId`] comes first.
#[derive(Debug, Default)]
pub struct DependencyTracker {
    deps: BTreeMap<ImageId, BTreeSet<ImageId>>,
}

impl DependencyTracker {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding twice is a no-op.
    pub fn add_image(&mut self, id: ImageId) {
        self.deps.entry(id).or_default();
    }

    /// Record that `dependent` reads `dependency`, adding `dependent` as a node.
    pub fn add_dependency(&mut self, dependent: ImageId, dependency: ImageId) {
        self.deps.entry(dependent).or_default().insert(dependency);
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.deps.len()
    }

    /// `true` when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Topological order, dependencies before dependents.
    ///
    /// Fails with [`RestoreError::CyclicDependency`] naming every image that could not be
    /// ordered.
    pub fn order(&self) -> RestoreResult<Vec<ImageId>> {
        let mut indeg = BTreeMap::<ImageId, u32>::new();
        let mut dependents = BTreeMap::<ImageId, Vec<ImageId>>::new();

        for (&node, deps) in &self.deps {
            let mut count = 0u32;
            for d in deps {
                if *d == node || !self.deps.contains_key(d) {
                    continue;
                }
                dependents.entry(*d).or_default().push(node);
                count = count.saturating_add(1);
            }
            indeg.insert(node, count);
        }

        let mut ready = indeg
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&id, _)| Reverse(id))
            .collect::<BinaryHeap<_>>();

        let mut out = Vec::with_capacity(self.deps.len());
        while let Some(Reverse(id)) = ready.pop() {
            out.push(id);
            for dep in dependents.get(&id).into_iter().flatten() {
                if let Some(d) = indeg.get_mut(dep) {
                    *d = d.saturating_sub(1);
                    if *d == 0 {
                        ready.push(Reverse(*dep));
                    }
                }
            }
        }

        if out.len() != self.deps.len() {
            let images = indeg
                .into_iter()
                .filter(|&(_, deg)| deg > 0)
                .map(|(id, _)| id)
                .collect();
            return Err(RestoreError::CyclicDependency { images });
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/restorable/tracker.rs"]
mod tests;
