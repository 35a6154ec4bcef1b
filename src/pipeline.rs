use crate::config::PipelineConfig;
use crate::data_wrappers::MergeTree;
use crate::engine::{ClusterFit, ClusteringEngine, DimensionReducer, EngineParams};
use crate::error::{EngineError, PipelineError};
use crate::fallback::SecondaryClustering;
use crate::hierarchy::{Hierarchy, HierarchyExtractor};
use crate::organizer::FlatResult;
use crate::reassignment::{NoiseReassigner, Reassignment};
use crate::report::{Report, ReportAssembler};
use crate::request::{Point, Request};
use crate::vectors::l2_normalize;
use tracing::{debug, info, warn};

/// Fewest points worth clustering.
const MIN_POINTS: usize = 2;

/// Runs a clustering engine over a set of points and turns its output into a [`Report`].
///
/// The flow is: reduce and normalize the vectors, fit the engine with prediction data, extract
/// the hierarchy from its merge tree, split labels into base clusters and noise, reassign
/// confident noise points, re-cluster what is left once, and assemble the report.
///
/// Only a failure of the primary fit or of the reducer aborts a run. A missing merge tree,
/// unavailable membership vectors or a failed secondary pass degrade the report instead.
pub struct ReportPipeline<E, R> {
    engine: E,
    reducer: R,
    config: PipelineConfig,
}

impl<E: ClusteringEngine, R: DimensionReducer> ReportPipeline<E, R> {
    pub fn new(engine: E, reducer: R, config: PipelineConfig) -> Self {
        ReportPipeline { engine, reducer, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decodes the request and clusters it. Settings carried by the request override the
    /// pipeline's own for this run.
    pub fn run_request(&self, request: &Request) -> Result<Report, PipelineError> {
        info!("Processing {} summaries", request.summaries.len());
        if request.summaries.len() < MIN_POINTS {
            info!("Not enough summaries to cluster");
            return Ok(Report::degenerate(request.ids()));
        }
        let config = self.request_config(request);
        let points = request.points()?;
        self.cluster(points, &config)
    }

    /// Clusters already decoded points with the pipeline's settings.
    pub fn run(&self, points: Vec<Point>) -> Result<Report, PipelineError> {
        self.cluster(points, &self.config)
    }

    fn request_config(&self, request: &Request) -> PipelineConfig {
        let mut builder = self.config.to_builder();
        if let Some(threshold) = request.membership_threshold {
            builder = builder.membership_threshold(threshold);
        }
        if let Some(size) = request.secondary_min_cluster_size {
            builder = builder.secondary_min_cluster_size(size).all_noise_min_cluster_size(size);
        }
        builder.build()
    }

    fn cluster(
        &self,
        points: Vec<Point>,
        config: &PipelineConfig,
    ) -> Result<Report, PipelineError> {
        let (ids, vectors): (Vec<String>, Vec<Vec<f32>>) =
            points.into_iter().map(|point| (point.id, point.vector)).unzip();
        if ids.len() < MIN_POINTS {
            info!("Fewer than {MIN_POINTS} valid embeddings, everything is noise");
            return Ok(Report::degenerate(ids));
        }

        let data = self.preprocess(vectors, config)?;
        let fit = self.primary_fit(&data, config)?;
        let hierarchy = match &fit.merge_tree {
            Some(tree) if tree.n_points() == data.len() => extract_hierarchy(tree, config),
            Some(tree) => {
                warn!(
                    "Merge tree covers {} points but {} were clustered, skipping hierarchy",
                    tree.n_points(),
                    data.len()
                );
                None
            }
            None => {
                warn!("No merge tree available, skipping hierarchy");
                None
            }
        };

        let mut flat = FlatResult::from_labels(&fit.labels);
        info!("Found {} clusters and {} noise points", flat.n_clusters(), flat.noise.len());

        let (reassignment, fallback_size) = if flat.clusters.is_empty() {
            info!("No clusters found, clustering all points as noise");
            (Reassignment::unassigned(&flat.noise), config.all_noise_min_cluster_size())
        } else {
            let reassignment = self.reassign(&data, &fit, &mut flat, config);
            (reassignment, config.secondary_min_cluster_size())
        };

        let fallback = SecondaryClustering::new(
            &self.engine,
            fallback_size,
            config.min_samples(),
            config.secondary_epsilon(),
        )
        .run(&data, &reassignment.residual);

        let report = ReportAssembler::new(&ids).assemble(
            &flat.clusters,
            &reassignment.records,
            &fallback,
            hierarchy.as_ref(),
        );
        info!(
            "Report: {} clusters, {} noise, {} reassigned",
            report.total_clusters, report.total_noise, report.total_reassigned
        );
        Ok(report)
    }

    /// Reduces to at most `dim - 1` dimensions and L2-normalizes every vector.
    fn preprocess(
        &self,
        vectors: Vec<Vec<f32>>,
        config: &PipelineConfig,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let n_points = vectors.len();
        let dims = vectors.first().map_or(0, Vec::len);
        let target_dim = config.reduced_dimensions().min(dims.saturating_sub(1)).max(1);

        let mut data = self.reducer.reduce(vectors, target_dim)?;
        if data.len() != n_points {
            return Err(EngineError::ContractViolation(format!(
                "reducer returned {} vectors for {} points",
                data.len(),
                n_points
            ))
            .into());
        }
        let reduced_dims = data.first().map_or(0, Vec::len);
        if reduced_dims == dims {
            debug!("Kept {dims}D vectors");
        } else {
            info!("Reduced {dims}D -> {reduced_dims}D");
        }
        data.iter_mut().for_each(|vector| l2_normalize(vector));
        Ok(data)
    }

    fn primary_fit(
        &self,
        data: &[Vec<f32>],
        config: &PipelineConfig,
    ) -> Result<ClusterFit, PipelineError> {
        let params = EngineParams {
            min_cluster_size: config.min_cluster_size(),
            min_samples: config.min_samples(),
            epsilon: 0.0,
            prediction_data: true,
        };
        let fit = self.engine.fit(data, &params)?;
        if fit.labels.len() != data.len() {
            return Err(EngineError::ContractViolation(format!(
                "engine returned {} labels for {} points",
                fit.labels.len(),
                data.len()
            ))
            .into());
        }
        Ok(fit)
    }

    fn reassign(
        &self,
        data: &[Vec<f32>],
        fit: &ClusterFit,
        flat: &mut FlatResult,
        config: &PipelineConfig,
    ) -> Reassignment {
        if flat.noise.is_empty() {
            return Reassignment::default();
        }
        match self.engine.membership_vectors(data, fit, &flat.noise) {
            Ok(memberships) => NoiseReassigner::new(config.membership_threshold()).reassign(
                &mut flat.clusters,
                &flat.noise,
                &memberships,
            ),
            Err(err) => {
                warn!("Could not compute membership vectors, no noise reassigned: {err}");
                Reassignment::unassigned(&flat.noise)
            }
        }
    }
}

fn extract_hierarchy(tree: &MergeTree, config: &PipelineConfig) -> Option<Hierarchy> {
    let extractor =
        HierarchyExtractor::new(tree, config.min_cluster_size(), config.max_hierarchy_levels());
    #[cfg(feature = "parallel")]
    let hierarchy = extractor.extract_par();
    #[cfg(not(feature = "parallel"))]
    let hierarchy = extractor.extract();
    hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NoReduction;

    /// Reducer that drops a vector, breaking the same-count contract.
    struct LossyReducer;

    impl DimensionReducer for LossyReducer {
        fn reduce(
            &self,
            mut data: Vec<Vec<f32>>,
            _target_dim: usize,
        ) -> Result<Vec<Vec<f32>>, EngineError> {
            data.pop();
            Ok(data)
        }
    }

    /// Records the target dimension it was asked for.
    struct RecordingReducer(std::cell::Cell<usize>);

    impl DimensionReducer for RecordingReducer {
        fn reduce(
            &self,
            data: Vec<Vec<f32>>,
            target_dim: usize,
        ) -> Result<Vec<Vec<f32>>, EngineError> {
            self.0.set(target_dim);
            Ok(data)
        }
    }

    /// Labels everything noise, offers no membership vectors.
    struct NoiseEngine;

    impl ClusteringEngine for NoiseEngine {
        fn fit(
            &self,
            data: &[Vec<f32>],
            params: &EngineParams,
        ) -> Result<ClusterFit, EngineError> {
            Ok(ClusterFit {
                labels: vec![-1; data.len()],
                merge_tree: None,
                prediction_data: params.prediction_data,
            })
        }

        fn membership_vectors(
            &self,
            _data: &[Vec<f32>],
            _fit: &ClusterFit,
            _points: &[usize],
        ) -> Result<Vec<Vec<f64>>, EngineError> {
            Err(EngineError::MembershipUnavailable)
        }
    }

    fn points(n: usize, dims: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point { id: format!("p{i}"), vector: vec![1.0 + i as f32; dims] })
            .collect()
    }

    #[test]
    fn reducer_contract_violation_is_fatal() {
        let pipeline = ReportPipeline::new(NoiseEngine, LossyReducer, PipelineConfig::default());
        let result = pipeline.run(points(4, 3));
        assert!(matches!(
            result,
            Err(PipelineError::Engine(EngineError::ContractViolation(..)))
        ));
    }

    #[test]
    fn reduction_target_is_below_input_dimension() {
        let reducer = RecordingReducer(std::cell::Cell::new(0));
        let pipeline = ReportPipeline::new(NoiseEngine, reducer, PipelineConfig::default());
        pipeline.run(points(3, 8)).unwrap();
        assert_eq!(7, pipeline.reducer.0.get());
        pipeline.run(points(3, 200)).unwrap();
        assert_eq!(50, pipeline.reducer.0.get());
        pipeline.run(points(3, 1)).unwrap();
        assert_eq!(1, pipeline.reducer.0.get());
    }

    #[test]
    fn no_reduction_keeps_input_dimension() {
        let pipeline = ReportPipeline::new(NoiseEngine, NoReduction, PipelineConfig::default());
        let data = pipeline
            .preprocess(vec![vec![3.0; 8], vec![0.0; 8]], pipeline.config())
            .unwrap();
        assert!(data.iter().all(|vector| vector.len() == 8));
        let norm: f32 = data[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert_eq!(vec![0.0; 8], data[1]);
    }

    #[test]
    fn request_overrides_settings() {
        let pipeline = ReportPipeline::new(NoiseEngine, NoReduction, PipelineConfig::default());
        let request = Request {
            summaries: Vec::new(),
            membership_threshold: Some(0.5),
            secondary_min_cluster_size: Some(5),
        };
        let config = pipeline.request_config(&request);
        assert_eq!(0.5, config.membership_threshold());
        assert_eq!(5, config.secondary_min_cluster_size());
        assert_eq!(5, config.all_noise_min_cluster_size());
        assert_eq!(0.1, pipeline.config().membership_threshold());
    }

    #[test]
    fn all_noise_without_tree_has_null_hierarchy() {
        let pipeline = ReportPipeline::new(NoiseEngine, NoReduction, PipelineConfig::default());
        let report = pipeline.run(points(4, 2)).unwrap();
        assert!(report.clusters.is_empty());
        assert_eq!(4, report.total_noise);
        assert!(report.hierarchy_data.is_none());
    }
}
