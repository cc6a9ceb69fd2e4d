//! Proximity clustering of same-type nodes into [`NodeGroup`]s.
//!
//! Nodes are linked when they share a semantic type and their centres are
//! within `radius` pixels. Clusters are the connected components of that
//! graph (single-link), so a chain of close nodes can span much further than
//! `radius` from any one member.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::classify::{classify_with, ImportanceWeights};
use crate::types::{FlatElement, NodeGroup};
use crate::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProximityConfig {
    /// Maximum centre-to-centre distance in pixels for two nodes to link.
    pub radius: f64,
    /// Clusters smaller than this are dropped from the output.
    pub min_members: usize,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            radius: 100.0,
            min_members: 1,
        }
    }
}

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, i: usize, j: usize) {
        let pi = self.find(i);
        let pj = self.find(j);
        if pi == pj {
            return;
        }
        if self.rank[pi] < self.rank[pj] {
            self.parent[pi] = pj;
        } else if self.rank[pi] > self.rank[pj] {
            self.parent[pj] = pi;
        } else {
            self.parent[pj] = pi;
            self.rank[pi] += 1;
        }
    }
}

/// Cluster flattened elements by type and proximity.
///
/// Output clusters are ordered by their first member in document order.
/// `members` holds the elements' flattened indices; `importance` is the
/// highest member importance.
pub fn cluster_nodes(
    elements: &[FlatElement<'_>],
    viewport: &Viewport,
    config: &ProximityConfig,
) -> Vec<NodeGroup> {
    if elements.is_empty() {
        return vec![];
    }

    let weights = ImportanceWeights::default();
    let classified: Vec<_> = elements
        .iter()
        .map(|e| classify_with(e.node, viewport, &weights))
        .collect();

    let n = elements.len();
    let mut sets = DisjointSet::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if classified[i].semantic_type == classified[j].semantic_type
                && elements[i].node.rect.center_distance(&elements[j].node.rect) <= config.radius
            {
                sets.union(i, j);
            }
        }
    }

    // Keyed by the first member's position so output order is deterministic.
    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut first_of_root: BTreeMap<usize, usize> = BTreeMap::new();
    for i in 0..n {
        let root = sets.find(i);
        let first = *first_of_root.entry(root).or_insert(i);
        components.entry(first).or_default().push(i);
    }

    let mut clusters = Vec::new();
    for members in components.values() {
        if members.len() < config.min_members {
            continue;
        }
        let head = members[0];
        let mut bounds = elements[head].node.rect;
        let mut importance = 0.0f64;
        for &m in members {
            bounds = bounds.union(&elements[m].node.rect);
            importance = importance.max(classified[m].importance);
        }
        clusters.push(NodeGroup {
            id: format!("cluster-{}", clusters.len() + 1),
            group_type: classified[head].semantic_type,
            bounds,
            members: members.iter().map(|&m| elements[m].index).collect(),
            importance,
        });
    }

    debug!(
        elements = n,
        clusters = clusters.len(),
        radius = config.radius,
        "clustered nodes by proximity"
    );
    clusters
}
