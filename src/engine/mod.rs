//! Seams to the clustering collaborators: the density clustering engine that labels points and
//! produces a merge tree, and the dimensionality reducer applied before it.

use crate::data_wrappers::MergeTree;
use crate::error::EngineError;

pub use hdbscan_adapter::HdbscanEngine;

mod condensed;
mod hdbscan_adapter;
mod membership;
mod validation;

/// Parameters for a single clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    pub min_cluster_size: usize,
    pub min_samples: usize,
    /// Cluster selection epsilon. Zero disables it.
    pub epsilon: f64,
    /// Keep the merge tree and enable membership vectors for this fit.
    pub prediction_data: bool,
}

/// Result of a clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterFit {
    /// One label per point; `-1` is noise, clusters are numbered from `0`.
    pub labels: Vec<i32>,
    pub merge_tree: Option<MergeTree>,
    pub prediction_data: bool,
}

impl ClusterFit {
    /// A fit without a merge tree or prediction data.
    pub fn from_labels(labels: Vec<i32>) -> Self {
        ClusterFit { labels, merge_tree: None, prediction_data: false }
    }

    pub fn n_clusters(&self) -> usize {
        self.labels.iter().max().map_or(0, |&max| (max + 1).max(0) as usize)
    }
}

/// A density based clustering engine.
pub trait ClusteringEngine {
    /// Clusters `data`, returning one label per point.
    fn fit(&self, data: &[Vec<f32>], params: &EngineParams) -> Result<ClusterFit, EngineError>;

    /// Soft membership scores of the given points against every cluster of `fit`.
    ///
    /// Row `i` belongs to `points[i]` and column `c` is the score for cluster label `c`. Scores
    /// are non-negative and are not required to sum to one.
    fn membership_vectors(
        &self,
        data: &[Vec<f32>],
        fit: &ClusterFit,
        points: &[usize],
    ) -> Result<Vec<Vec<f64>>, EngineError>;
}

impl<E: ClusteringEngine + ?Sized> ClusteringEngine for &E {
    fn fit(&self, data: &[Vec<f32>], params: &EngineParams) -> Result<ClusterFit, EngineError> {
        (**self).fit(data, params)
    }

    fn membership_vectors(
        &self,
        data: &[Vec<f32>],
        fit: &ClusterFit,
        points: &[usize],
    ) -> Result<Vec<Vec<f64>>, EngineError> {
        (**self).membership_vectors(data, fit, points)
    }
}

/// Projects vectors into a lower dimensional space before clustering.
pub trait DimensionReducer {
    fn reduce(&self, data: Vec<Vec<f32>>, target_dim: usize)
        -> Result<Vec<Vec<f32>>, EngineError>;
}

/// Leaves vectors in their original space.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReduction;

impl DimensionReducer for NoReduction {
    fn reduce(
        &self,
        data: Vec<Vec<f32>>,
        _target_dim: usize,
    ) -> Result<Vec<Vec<f32>>, EngineError> {
        Ok(data)
    }
}
