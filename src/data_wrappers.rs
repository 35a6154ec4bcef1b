use serde::{Deserialize, Serialize};

/// One row of a condensed merge tree: `child` joined `parent` at `lambda`.
///
/// `child` is a point index when it is below the tree's point count, otherwise an internal node.
/// `parent` is always an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeEvent {
    pub child: usize,
    pub parent: usize,
    pub lambda: f64,
    pub size: usize,
}

/// Condensed dendrogram over `n_points` points, as produced by a clustering engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeTree {
    n_points: usize,
    events: Vec<MergeEvent>,
}

impl MergeTree {
    pub fn new(n_points: usize, events: Vec<MergeEvent>) -> Self {
        MergeTree { n_points, events }
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn events(&self) -> &[MergeEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn is_point(&self, node_id: usize) -> bool {
        node_id < self.n_points
    }
}

#[derive(Clone, Debug)]
pub(crate) struct MSTEdge<T> {
    pub(crate) left_node_id: usize,
    pub(crate) right_node_id: usize,
    pub(crate) distance: T,
}

#[derive(Clone, Debug)]
pub(crate) struct SLTNode<T> {
    pub(crate) left_child: usize,
    pub(crate) right_child: usize,
    pub(crate) distance: T,
    pub(crate) size: usize,
}
