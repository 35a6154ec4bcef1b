use super::condensed::MergeTreeBuilder;
use super::membership::SoftMembership;
use super::validation::DataValidator;
use super::{ClusterFit, ClusteringEngine, EngineParams};
use crate::error::EngineError;
use crate::organizer::NOISE_LABEL;
use ::hdbscan::{Hdbscan, HdbscanError, HdbscanHyperParams};
use tracing::{debug, warn};

/// Clustering engine backed by the `hdbscan` crate.
///
/// Labels come straight from [`Hdbscan::cluster`]. When prediction data is requested the
/// condensed merge tree is rebuilt with the same minimum cluster size and min samples, since
/// the crate does not expose its own, and membership vectors become available for the fit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HdbscanEngine;

impl HdbscanEngine {
    pub fn new() -> Self {
        HdbscanEngine
    }

    fn cluster_labels(
        &self,
        data: &[Vec<f32>],
        params: &EngineParams,
    ) -> Result<Vec<i32>, EngineError> {
        if data.len() < params.min_cluster_size {
            debug!(
                "{} points is below min cluster size {}, everything is noise",
                data.len(),
                params.min_cluster_size
            );
            return Ok(vec![NOISE_LABEL; data.len()]);
        }
        let hyper_params = HdbscanHyperParams::builder()
            .min_cluster_size(params.min_cluster_size)
            .min_samples(params.min_samples)
            .epsilon(params.epsilon)
            .build();
        let clusterer = Hdbscan::new(data, hyper_params);
        clusterer.cluster().map_err(from_hdbscan_error)
    }
}

impl ClusteringEngine for HdbscanEngine {
    fn fit(&self, data: &[Vec<f32>], params: &EngineParams) -> Result<ClusterFit, EngineError> {
        DataValidator::new(data).validate_input_data()?;
        let labels = self.cluster_labels(data, params)?;

        let merge_tree = if params.prediction_data {
            let builder = MergeTreeBuilder::new(data, params.min_cluster_size, params.min_samples);
            match builder.build() {
                Ok(tree) => Some(tree),
                Err(err) => {
                    warn!("Failed to build condensed tree: {err}");
                    None
                }
            }
        } else {
            None
        };

        Ok(ClusterFit { labels, merge_tree, prediction_data: params.prediction_data })
    }

    fn membership_vectors(
        &self,
        data: &[Vec<f32>],
        fit: &ClusterFit,
        points: &[usize],
    ) -> Result<Vec<Vec<f64>>, EngineError> {
        if !fit.prediction_data {
            return Err(EngineError::MembershipUnavailable);
        }
        DataValidator::new(data).validate_input_data()?;
        SoftMembership::new(data, &fit.labels).calc_membership_vectors(points)
    }
}

#[allow(unreachable_patterns)]
fn from_hdbscan_error(err: HdbscanError) -> EngineError {
    match err {
        HdbscanError::EmptyDataset => EngineError::EmptyDataset,
        HdbscanError::WrongDimension(msg) => EngineError::WrongDimension(msg),
        HdbscanError::NonFiniteCoordinate(msg) => EngineError::NonFiniteCoordinate(msg),
        other => EngineError::ContractViolation(other.to_string()),
    }
}
