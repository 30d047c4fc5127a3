//! Similarity between two trace graphs of the same problem.
//!
//! Nodes are identified by their state and edges by their `(source, destination)` pair;
//! edge labels, timesteps and comments do not take part in the comparison.

use std::collections::BTreeSet;

use crate::builder::GraphBuilder;
use crate::state::State;

fn node_set(graph: &GraphBuilder) -> BTreeSet<&State> {
    graph.nodes().map(|node| &node.state).collect()
}

fn edge_set(graph: &GraphBuilder) -> BTreeSet<(&State, &State)> {
    graph
        .edges()
        .map(|edge| (&edge.source, &edge.destination))
        .collect()
}

/// Intersection over union of the two edge sets. Two edgeless graphs score `1.0`.
pub fn edge_iou(a: &GraphBuilder, b: &GraphBuilder) -> f64 {
    let ea = edge_set(a);
    let eb = edge_set(b);
    let union = ea.union(&eb).count();
    if union == 0 {
        return 1.0;
    }
    ea.intersection(&eb).count() as f64 / union as f64
}

/// Unit-cost edit distance when each node is matched to the node with the same state.
///
/// Every node or edge present in only one of the graphs costs one insertion or deletion.
/// This is an upper bound on the exact graph edit distance.
pub fn aligned_edit_distance(a: &GraphBuilder, b: &GraphBuilder) -> usize {
    let (na, nb) = (node_set(a), node_set(b));
    let (ea, eb) = (edge_set(a), edge_set(b));
    na.symmetric_difference(&nb).count() + ea.symmetric_difference(&eb).count()
}

/// [`aligned_edit_distance`] scaled by `max(|Na|, |Nb|) + max(|Ea|, |Eb|)`.
pub fn normalized_edit_distance(a: &GraphBuilder, b: &GraphBuilder) -> f64 {
    let scale = a.node_count().max(b.node_count()) + a.edge_count().max(b.edge_count());
    // Builders always contain a start node.
    aligned_edit_distance(a, b) as f64 / scale as f64
}
