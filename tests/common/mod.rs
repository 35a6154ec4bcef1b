#![allow(dead_code)]

use cluster_report::{
    ClusterFit, ClusteringEngine, EngineError, EngineParams, MergeEvent, MergeTree, Point,
};
use std::cell::{Cell, RefCell};

/// Engine returning prepared answers. Fits with prediction data are the primary pass, fits
/// without it the secondary pass.
pub struct ScriptedEngine {
    pub primary: Vec<i32>,
    pub merge_tree: Option<MergeTree>,
    pub memberships: Result<Vec<Vec<f64>>, EngineError>,
    /// Labels for the residual points; everything noise when `None`.
    pub secondary: Option<Result<Vec<i32>, EngineError>>,
    pub secondary_calls: Cell<usize>,
    pub secondary_params: RefCell<Option<EngineParams>>,
}

impl ScriptedEngine {
    pub fn new(primary: Vec<i32>) -> Self {
        ScriptedEngine {
            primary,
            merge_tree: None,
            memberships: Err(EngineError::MembershipUnavailable),
            secondary: None,
            secondary_calls: Cell::new(0),
            secondary_params: RefCell::new(None),
        }
    }

    pub fn with_memberships(mut self, memberships: Vec<Vec<f64>>) -> Self {
        self.memberships = Ok(memberships);
        self
    }

    pub fn with_secondary(mut self, labels: Result<Vec<i32>, EngineError>) -> Self {
        self.secondary = Some(labels);
        self
    }

    pub fn with_merge_tree(mut self, tree: MergeTree) -> Self {
        self.merge_tree = Some(tree);
        self
    }
}

impl ClusteringEngine for ScriptedEngine {
    fn fit(&self, data: &[Vec<f32>], params: &EngineParams) -> Result<ClusterFit, EngineError> {
        if params.prediction_data {
            return Ok(ClusterFit {
                labels: self.primary.clone(),
                merge_tree: self.merge_tree.clone(),
                prediction_data: true,
            });
        }
        self.secondary_calls.set(self.secondary_calls.get() + 1);
        *self.secondary_params.borrow_mut() = Some(params.clone());
        match &self.secondary {
            Some(labels) => labels.clone().map(ClusterFit::from_labels),
            None => Ok(ClusterFit::from_labels(vec![-1; data.len()])),
        }
    }

    fn membership_vectors(
        &self,
        _data: &[Vec<f32>],
        _fit: &ClusterFit,
        _points: &[usize],
    ) -> Result<Vec<Vec<f64>>, EngineError> {
        self.memberships.clone()
    }
}

/// `n` points with ids `v0..v{n-1}` and distinct 3D vectors.
pub fn points(n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| Point { id: format!("v{i}"), vector: vec![1.0, i as f32, (i * i) as f32] })
        .collect()
}

pub fn event(child: usize, parent: usize, lambda: f64, size: usize) -> MergeEvent {
    MergeEvent { child, parent, lambda, size }
}

/// Points 0 and 1 join at 0.9, point 2 joins them at 0.3.
pub fn three_point_tree() -> MergeTree {
    MergeTree::new(
        3,
        vec![
            event(4, 3, 0.3, 2),
            event(2, 3, 0.3, 1),
            event(0, 4, 0.9, 1),
            event(1, 4, 0.9, 1),
        ],
    )
}

/// Pairs {0, 1} and {2, 3} form at 0.9 and join at 0.5, points 4 to 6 fall out at 0.2.
pub fn seven_point_tree() -> MergeTree {
    MergeTree::new(
        7,
        vec![
            event(8, 7, 0.5, 2),
            event(9, 7, 0.5, 2),
            event(4, 7, 0.2, 1),
            event(5, 7, 0.2, 1),
            event(6, 7, 0.2, 1),
            event(0, 8, 0.9, 1),
            event(1, 8, 0.9, 1),
            event(2, 9, 0.9, 1),
            event(3, 9, 0.9, 1),
        ],
    )
}

/// Two tight groups on different axes plus one point on a third axis. Stays well separated
/// after L2 normalization.
pub fn blob_vectors() -> Vec<Vec<f32>> {
    vec![
        vec![1.0, 0.02, 0.01],
        vec![1.0, 0.01, 0.02],
        vec![1.0, 0.03, 0.0],
        vec![1.0, 0.0, 0.03],
        vec![1.0, 0.02, 0.02],
        vec![0.01, 1.0, 0.02],
        vec![0.02, 1.0, 0.01],
        vec![0.0, 1.0, 0.03],
        vec![0.03, 1.0, 0.0],
        vec![0.02, 1.0, 0.02],
        vec![0.0, 0.0, 1.0],
    ]
}

pub fn blob_points() -> Vec<Point> {
    blob_vectors()
        .into_iter()
        .enumerate()
        .map(|(i, vector)| Point { id: format!("v{i}"), vector })
        .collect()
}
