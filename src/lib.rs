//! Multi-level cluster reports over embedding vectors, with noise rescue.
//!
//! A density based clustering engine labels the points and produces a condensed merge tree.
//! This crate turns that output into a [`Report`]:
//!  1. The merge tree is cut at up to 50 thresholds (lambda values), giving the partition of
//!     points into clusters and noise at each level of granularity;
//!  2. Points the engine labelled noise are moved into their best matching cluster when their
//!     soft membership score is at least the membership threshold; and
//!  3. Noise that is still unassigned is clustered once more on its own, and whatever groups
//!     form there are reported as weak clusters.
//!
//! The engine and the dimensionality reducer sit behind the [`ClusteringEngine`] and
//! [`DimensionReducer`] traits. [`HdbscanEngine`] is backed by the `hdbscan` crate.
//!
//! # Examples
//! ```
//!use cluster_report::{HdbscanEngine, NoReduction, PipelineConfig, Point, ReportPipeline};
//!
//!let vectors: Vec<Vec<f32>> = vec![
//!    vec![1.0, 0.0, 0.1],
//!    vec![1.0, 0.1, 0.0],
//!    vec![0.9, 0.0, 0.0],
//!    vec![1.0, 0.05, 0.05],
//!    vec![0.0, 1.0, 0.1],
//!    vec![0.1, 1.0, 0.0],
//!    vec![0.0, 0.9, 0.0],
//!    vec![0.05, 1.0, 0.05],
//!    vec![0.0, 0.0, 1.0],
//!];
//!let points = vectors
//!    .into_iter()
//!    .enumerate()
//!    .map(|(i, vector)| Point { id: format!("video-{i}"), vector })
//!    .collect();
//!
//!let pipeline = ReportPipeline::new(HdbscanEngine::new(), NoReduction, PipelineConfig::default());
//!let report = pipeline.run(points).unwrap();
//!assert_eq!(report.total_clusters, report.clusters.len());
//!assert_eq!(report.total_noise, report.noise.len());
//! ```

pub use crate::config::{PipelineConfig, PipelineConfigBuilder};
pub use crate::data_wrappers::{MergeEvent, MergeTree};
pub use crate::engine::{
    ClusterFit, ClusteringEngine, DimensionReducer, EngineParams, HdbscanEngine, NoReduction,
};
pub use crate::error::{EngineError, HierarchyError, PipelineError};
pub use crate::fallback::{FallbackOutcome, SecondaryClustering};
pub use crate::hierarchy::{Hierarchy, HierarchyExtractor, HierarchyLevel, LevelCluster};
pub use crate::organizer::{FlatResult, NOISE_LABEL};
pub use crate::pipeline::ReportPipeline;
pub use crate::reassignment::{NoiseReassigner, Reassignment, ReassignmentRecord};
pub use crate::report::{
    ClusterEntry, HierarchyData, LevelEntry, ReassignedNoise, Report, ReportAssembler,
};
pub use crate::request::{Point, Request, Summary};
pub use crate::vectors::l2_normalize;

mod config;
mod data_wrappers;
mod engine;
mod error;
mod fallback;
mod hierarchy;
mod organizer;
mod pipeline;
mod reassignment;
mod report;
mod request;
mod union_find;
mod vectors;
