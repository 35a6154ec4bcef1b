use crate::engine::{ClusteringEngine, EngineParams};
use crate::error::EngineError;
use crate::organizer::FlatResult;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Fewest residual points worth re-clustering.
const MIN_RESIDUAL_POINTS: usize = 2;

/// Clusters found among the residual points, and the points that stay noise for good.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackOutcome {
    /// Weak clusters keyed by their secondary label, members as indices into the full data set.
    pub weak_clusters: BTreeMap<i32, Vec<usize>>,
    pub noise: Vec<usize>,
}

impl FallbackOutcome {
    fn all_noise(residual: &[usize]) -> Self {
        FallbackOutcome { weak_clusters: BTreeMap::new(), noise: residual.to_vec() }
    }
}

/// One-shot re-clustering of points left unassigned after reassignment.
///
/// The engine is run a second time on the residual points only, usually with a smaller minimum
/// cluster size and a nonzero selection epsilon. Whatever it labels noise is final; the
/// fallback is never applied to its own output.
pub struct SecondaryClustering<'a, E: ?Sized> {
    engine: &'a E,
    params: EngineParams,
}

impl<'a, E: ClusteringEngine + ?Sized> SecondaryClustering<'a, E> {
    pub fn new(engine: &'a E, min_cluster_size: usize, min_samples: usize, epsilon: f64) -> Self {
        let params =
            EngineParams { min_cluster_size, min_samples, epsilon, prediction_data: false };
        SecondaryClustering { engine, params }
    }

    /// Re-clusters `residual`, given as indices into `data`.
    ///
    /// Never fails: fewer than two residual points, or an engine error, leave every residual
    /// point as noise.
    pub fn run(&self, data: &[Vec<f32>], residual: &[usize]) -> FallbackOutcome {
        if residual.len() < MIN_RESIDUAL_POINTS {
            debug!("{} residual point(s), skipping secondary clustering", residual.len());
            return FallbackOutcome::all_noise(residual);
        }

        info!(
            "Secondary clustering of {} residual points (min cluster size {})",
            residual.len(),
            self.params.min_cluster_size
        );
        let labels = match self.residual_labels(data, residual) {
            Ok(labels) => labels,
            Err(err) => {
                warn!("Secondary clustering failed, residual points stay noise: {err}");
                return FallbackOutcome::all_noise(residual);
            }
        };

        let flat = FlatResult::from_labels(&labels);
        let weak_clusters = flat
            .clusters
            .into_iter()
            .map(|(label, members)| {
                (label, members.into_iter().map(|member| residual[member]).collect())
            })
            .collect::<BTreeMap<i32, Vec<usize>>>();
        let noise = flat.noise.into_iter().map(|member| residual[member]).collect::<Vec<_>>();

        info!(
            "Secondary clustering found {} weak clusters, {} points remain noise",
            weak_clusters.len(),
            noise.len()
        );
        FallbackOutcome { weak_clusters, noise }
    }

    fn residual_labels(
        &self,
        data: &[Vec<f32>],
        residual: &[usize],
    ) -> Result<Vec<i32>, EngineError> {
        let subset = residual
            .iter()
            .map(|&point| {
                data.get(point).cloned().ok_or_else(|| {
                    EngineError::ContractViolation(format!("residual point {point} is out of range"))
                })
            })
            .collect::<Result<Vec<Vec<f32>>, EngineError>>()?;

        let fit = self.engine.fit(&subset, &self.params)?;
        if fit.labels.len() != subset.len() {
            return Err(EngineError::ContractViolation(format!(
                "{} labels for {} residual points",
                fit.labels.len(),
                subset.len()
            )));
        }
        Ok(fit.labels)
    }
}
