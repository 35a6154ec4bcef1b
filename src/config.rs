use crate::error::PipelineError;
use crate::hierarchy::MAX_LEVELS_DEFAULT;
use crate::reassignment::MEMBERSHIP_THRESHOLD_DEFAULT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

// Defaults for parameters
const MIN_CLUSTER_SIZE_DEFAULT: usize = 3;
const MIN_SAMPLES_DEFAULT: usize = 1;
const SECONDARY_MIN_CLUSTER_SIZE_DEFAULT: usize = 3;
const SECONDARY_EPSILON_DEFAULT: f64 = 0.01;
const REDUCED_DIMENSIONS_DEFAULT: usize = 50;

// Valid minimums/left bounds of parameters
const MIN_CLUSTER_SIZE_MINIMUM: usize = 2;
const MIN_SAMPLES_MINIMUM: usize = 1;
const MAX_LEVELS_MINIMUM: usize = 1;
const REDUCED_DIMENSIONS_MINIMUM: usize = 1;

/// Settings for a report run. Build one with [`PipelineConfig::builder`] or load it from a TOML
/// file; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub(crate) membership_threshold: f64,
    pub(crate) min_cluster_size: usize,
    pub(crate) min_samples: usize,
    pub(crate) secondary_min_cluster_size: usize,
    pub(crate) all_noise_min_cluster_size: usize,
    pub(crate) secondary_epsilon: f64,
    pub(crate) max_hierarchy_levels: usize,
    pub(crate) reduced_dimensions: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineConfig {
    /// Enters the builder pattern, allowing custom settings to be set using various setter
    /// methods.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Continues building from these settings.
    pub fn to_builder(&self) -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            membership_threshold: Some(self.membership_threshold),
            min_cluster_size: Some(self.min_cluster_size),
            min_samples: Some(self.min_samples),
            secondary_min_cluster_size: Some(self.secondary_min_cluster_size),
            all_noise_min_cluster_size: Some(self.all_noise_min_cluster_size),
            secondary_epsilon: Some(self.secondary_epsilon),
            max_hierarchy_levels: Some(self.max_hierarchy_levels),
            reduced_dimensions: Some(self.reduced_dimensions),
        }
    }

    /// Loads settings from a TOML file. Values are passed through the builder, so out of range
    /// values are corrected the same way.
    pub fn from_toml_file(path: &Path) -> Result<Self, PipelineError> {
        let contents = std::fs::read_to_string(path)?;
        let raw: PipelineConfig = toml::from_str(&contents)
            .map_err(|err| PipelineError::Config(format!("{}: {err}", path.display())))?;
        Ok(raw.to_builder().build())
    }

    pub fn membership_threshold(&self) -> f64 {
        self.membership_threshold
    }

    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    pub fn secondary_min_cluster_size(&self) -> usize {
        self.secondary_min_cluster_size
    }

    pub fn all_noise_min_cluster_size(&self) -> usize {
        self.all_noise_min_cluster_size
    }

    pub fn secondary_epsilon(&self) -> f64 {
        self.secondary_epsilon
    }

    pub fn max_hierarchy_levels(&self) -> usize {
        self.max_hierarchy_levels
    }

    pub fn reduced_dimensions(&self) -> usize {
        self.reduced_dimensions
    }
}

/// Builder object to set custom settings.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    membership_threshold: Option<f64>,
    min_cluster_size: Option<usize>,
    min_samples: Option<usize>,
    secondary_min_cluster_size: Option<usize>,
    all_noise_min_cluster_size: Option<usize>,
    secondary_epsilon: Option<f64>,
    max_hierarchy_levels: Option<usize>,
    reduced_dimensions: Option<usize>,
}

impl PipelineConfigBuilder {
    /// Sets the minimum membership score for a noise point to be moved into its best cluster.
    /// Must be finite and non-negative. Defaults to 0.1.
    pub fn membership_threshold(mut self, membership_threshold: f64) -> Self {
        if membership_threshold.is_finite() && membership_threshold >= 0.0 {
            self.membership_threshold = Some(membership_threshold);
        } else {
            warn!(
                "membership_threshold ({membership_threshold}) must be finite and non-negative. \
                Set to {MEMBERSHIP_THRESHOLD_DEFAULT}."
            );
            self.membership_threshold = Some(MEMBERSHIP_THRESHOLD_DEFAULT);
        }
        self
    }

    /// Sets the minimum cluster size of the primary clustering pass. Also the minimum size of
    /// a cluster at every hierarchy level. Defaults to 3.
    pub fn min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = Some(validate_input_left_bound(
            min_cluster_size,
            MIN_CLUSTER_SIZE_MINIMUM,
            "min_cluster_size",
        ));
        self
    }

    /// Sets min samples, the neighbour count used for core distances in both clustering
    /// passes. Defaults to 1.
    pub fn min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples =
            Some(validate_input_left_bound(min_samples, MIN_SAMPLES_MINIMUM, "min_samples"));
        self
    }

    /// Sets the minimum cluster size used when re-clustering noise left over after
    /// reassignment. Defaults to 3.
    pub fn secondary_min_cluster_size(mut self, size: usize) -> Self {
        self.secondary_min_cluster_size = Some(validate_input_left_bound(
            size,
            MIN_CLUSTER_SIZE_MINIMUM,
            "secondary_min_cluster_size",
        ));
        self
    }

    /// Sets the minimum cluster size used when the primary pass found no clusters at all and
    /// every point is re-clustered. Defaults to 3.
    pub fn all_noise_min_cluster_size(mut self, size: usize) -> Self {
        self.all_noise_min_cluster_size = Some(validate_input_left_bound(
            size,
            MIN_CLUSTER_SIZE_MINIMUM,
            "all_noise_min_cluster_size",
        ));
        self
    }

    /// Sets the cluster selection epsilon of the secondary pass. Defaults to 0.01.
    pub fn secondary_epsilon(mut self, epsilon: f64) -> Self {
        if epsilon.is_finite() && epsilon >= 0.0 {
            self.secondary_epsilon = Some(epsilon);
        } else {
            warn!(
                "secondary_epsilon ({epsilon}) must be finite and non-negative. \
                Set to {SECONDARY_EPSILON_DEFAULT}."
            );
            self.secondary_epsilon = Some(SECONDARY_EPSILON_DEFAULT);
        }
        self
    }

    /// Sets the maximum number of hierarchy levels to extract. Defaults to 50.
    pub fn max_hierarchy_levels(mut self, levels: usize) -> Self {
        self.max_hierarchy_levels =
            Some(validate_input_left_bound(levels, MAX_LEVELS_MINIMUM, "max_hierarchy_levels"));
        self
    }

    /// Sets the dimensionality vectors are reduced to before clustering. The effective target
    /// never exceeds one less than the input dimensionality. Defaults to 50.
    pub fn reduced_dimensions(mut self, dimensions: usize) -> Self {
        self.reduced_dimensions = Some(validate_input_left_bound(
            dimensions,
            REDUCED_DIMENSIONS_MINIMUM,
            "reduced_dimensions",
        ));
        self
    }

    /// Finishes the building of the configuration.
    pub fn build(self) -> PipelineConfig {
        // Explicit values go through their setters once more so loaded values are corrected too
        let mut checked = Self::default();
        if let Some(value) = self.membership_threshold {
            checked = checked.membership_threshold(value);
        }
        if let Some(value) = self.min_cluster_size {
            checked = checked.min_cluster_size(value);
        }
        if let Some(value) = self.min_samples {
            checked = checked.min_samples(value);
        }
        if let Some(value) = self.secondary_min_cluster_size {
            checked = checked.secondary_min_cluster_size(value);
        }
        if let Some(value) = self.all_noise_min_cluster_size {
            checked = checked.all_noise_min_cluster_size(value);
        }
        if let Some(value) = self.secondary_epsilon {
            checked = checked.secondary_epsilon(value);
        }
        if let Some(value) = self.max_hierarchy_levels {
            checked = checked.max_hierarchy_levels(value);
        }
        if let Some(value) = self.reduced_dimensions {
            checked = checked.reduced_dimensions(value);
        }

        PipelineConfig {
            membership_threshold: checked
                .membership_threshold
                .unwrap_or(MEMBERSHIP_THRESHOLD_DEFAULT),
            min_cluster_size: checked.min_cluster_size.unwrap_or(MIN_CLUSTER_SIZE_DEFAULT),
            min_samples: checked.min_samples.unwrap_or(MIN_SAMPLES_DEFAULT),
            secondary_min_cluster_size: checked
                .secondary_min_cluster_size
                .unwrap_or(SECONDARY_MIN_CLUSTER_SIZE_DEFAULT),
            all_noise_min_cluster_size: checked
                .all_noise_min_cluster_size
                .unwrap_or(SECONDARY_MIN_CLUSTER_SIZE_DEFAULT),
            secondary_epsilon: checked.secondary_epsilon.unwrap_or(SECONDARY_EPSILON_DEFAULT),
            max_hierarchy_levels: checked.max_hierarchy_levels.unwrap_or(MAX_LEVELS_DEFAULT),
            reduced_dimensions: checked.reduced_dimensions.unwrap_or(REDUCED_DIMENSIONS_DEFAULT),
        }
    }
}

fn validate_input_left_bound(input_param: usize, left_bound: usize, param: &str) -> usize {
    if input_param < left_bound {
        warn!("{param} ({input_param}) cannot be lower than {left_bound}. Set to {left_bound}.");
        left_bound
    } else {
        input_param
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(0.1, config.membership_threshold());
        assert_eq!(3, config.min_cluster_size());
        assert_eq!(1, config.min_samples());
        assert_eq!(3, config.secondary_min_cluster_size());
        assert_eq!(3, config.all_noise_min_cluster_size());
        assert_eq!(0.01, config.secondary_epsilon());
        assert_eq!(50, config.max_hierarchy_levels());
        assert_eq!(50, config.reduced_dimensions());
    }

    #[test]
    fn values_below_bounds_are_clamped() {
        let config = PipelineConfig::builder()
            .min_cluster_size(1)
            .secondary_min_cluster_size(0)
            .max_hierarchy_levels(0)
            .min_samples(0)
            .build();
        assert_eq!(2, config.min_cluster_size());
        assert_eq!(2, config.secondary_min_cluster_size());
        assert_eq!(1, config.max_hierarchy_levels());
        assert_eq!(1, config.min_samples());
    }

    #[test]
    fn invalid_threshold_falls_back_to_default() {
        let config = PipelineConfig::builder().membership_threshold(f64::NAN).build();
        assert_eq!(0.1, config.membership_threshold());
        let config = PipelineConfig::builder().membership_threshold(-0.5).build();
        assert_eq!(0.1, config.membership_threshold());
    }

    #[test]
    fn fallback_sizes_are_independent() {
        let config = PipelineConfig::builder()
            .secondary_min_cluster_size(4)
            .all_noise_min_cluster_size(6)
            .build();
        assert_eq!(4, config.secondary_min_cluster_size());
        assert_eq!(6, config.all_noise_min_cluster_size());
    }

    #[test]
    fn to_builder_round_trips_overrides() {
        let config = PipelineConfig::builder().membership_threshold(0.3).build();
        let updated = config.to_builder().max_hierarchy_levels(10).build();
        assert_eq!(0.3, updated.membership_threshold());
        assert_eq!(10, updated.max_hierarchy_levels());
    }

    #[test]
    fn load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster-report.toml");
        std::fs::write(&path, "membership_threshold = 0.25\nmin_cluster_size = 1\n").unwrap();

        let config = PipelineConfig::from_toml_file(&path).unwrap();
        assert_eq!(0.25, config.membership_threshold());
        assert_eq!(2, config.min_cluster_size());
        assert_eq!(3, config.secondary_min_cluster_size());
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "membership_threshold = \"high\"\n").unwrap();
        let result = PipelineConfig::from_toml_file(&path);
        assert!(matches!(result, Err(PipelineError::Config(..))));
    }
}
