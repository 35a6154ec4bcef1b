use crate::data_wrappers::{MergeEvent, MergeTree};
use crate::error::HierarchyError;
use crate::union_find::UnionFind;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Default cap on the number of levels extracted from a merge tree.
pub const MAX_LEVELS_DEFAULT: usize = 50;

/// A cluster at a single hierarchy level. Members are point indices in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelCluster {
    pub cluster_id: String,
    pub members: Vec<usize>,
}

impl LevelCluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// The partition of all points into clusters and noise at one threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyLevel {
    pub threshold: f64,
    pub clusters: Vec<LevelCluster>,
    pub noise_count: usize,
}

/// Levels in strictly descending threshold order, plus the `(min, max)` of their thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    pub threshold_range: (f64, f64),
    pub levels: Vec<HierarchyLevel>,
}

/// Materializes cluster membership at many thresholds of a condensed merge tree.
///
/// Each threshold is processed independently with its own union-find over `2 * n_points`
/// nodes: every event at or above the threshold links its child to its parent, and points
/// sharing a representative form a group. Groups of at least `min_cluster_size` points are
/// clusters, smaller groups are noise.
#[derive(Debug, Clone)]
pub struct HierarchyExtractor<'a> {
    tree: &'a MergeTree,
    min_cluster_size: usize,
    max_levels: usize,
}

impl<'a> HierarchyExtractor<'a> {
    pub fn new(tree: &'a MergeTree, min_cluster_size: usize, max_levels: usize) -> Self {
        HierarchyExtractor {
            tree,
            min_cluster_size: min_cluster_size.max(1),
            max_levels: max_levels.max(1),
        }
    }

    /// Extracts every selected level in turn. Returns `None` when the tree is empty or no level
    /// could be built.
    pub fn extract(&self) -> Option<Hierarchy> {
        let thresholds = self.select_thresholds();
        if thresholds.is_empty() {
            warn!("Merge tree has no usable thresholds, skipping hierarchy");
            return None;
        }
        let n_levels = thresholds.len();
        let results = thresholds
            .into_iter()
            .enumerate()
            .map(|(i, threshold)| {
                let result = self.extract_level(threshold);
                if let Ok(level) = &result {
                    if (i + 1) % 10 == 0 || i == 0 {
                        debug!(
                            "Level {}/{}: lambda={:.4}, {} clusters, {} noise",
                            i + 1,
                            n_levels,
                            threshold,
                            level.clusters.len(),
                            level.noise_count
                        );
                    }
                }
                (threshold, result)
            })
            .collect();
        self.collect_levels(results)
    }

    /// Same as [`HierarchyExtractor::extract`] with levels built on the rayon thread pool.
    /// Level order is preserved.
    #[cfg(feature = "parallel")]
    pub fn extract_par(&self) -> Option<Hierarchy> {
        let thresholds = self.select_thresholds();
        if thresholds.is_empty() {
            warn!("Merge tree has no usable thresholds, skipping hierarchy");
            return None;
        }
        let results = thresholds
            .into_par_iter()
            .map(|threshold| (threshold, self.extract_level(threshold)))
            .collect();
        self.collect_levels(results)
    }

    /// Distinct finite thresholds of the tree in descending order, evenly subsampled down to
    /// at most `max_levels` values. The first and last values are always kept.
    pub fn select_thresholds(&self) -> Vec<f64> {
        let mut thresholds: Vec<f64> = self
            .tree
            .events()
            .iter()
            .map(|event| event.lambda)
            .filter(|lambda| lambda.is_finite())
            .collect();
        thresholds.sort_by(|a, b| b.total_cmp(a));
        thresholds.dedup();

        let n = thresholds.len();
        if n <= self.max_levels {
            return thresholds;
        }
        info!("Found {} unique lambda values, sampling {}", n, self.max_levels);
        if self.max_levels == 1 {
            return vec![thresholds[0]];
        }
        let last = self.max_levels - 1;
        (0..self.max_levels)
            .map(|i| thresholds[i * (n - 1) / last])
            .collect()
    }

    /// Builds the partition at a single threshold.
    pub fn extract_level(&self, threshold: f64) -> Result<HierarchyLevel, HierarchyError> {
        let n_points = self.tree.n_points();
        let mut union_find = UnionFind::new(2 * n_points);

        for (row, event) in self.tree.events().iter().enumerate() {
            // NaN lambdas never compare as selected
            if !(event.lambda >= threshold) {
                continue;
            }
            self.validate_event(row, event, union_find.len())?;
            union_find.union(event.child, event.parent);
        }

        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for point in 0..n_points {
            let root = union_find.find(point);
            let group = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(point);
        }

        let mut clusters = Vec::new();
        let mut noise_count = 0;
        for members in groups {
            if members.len() >= self.min_cluster_size {
                let cluster_id = format!("lambda_{:.4}_cluster_{}", threshold, clusters.len());
                clusters.push(LevelCluster { cluster_id, members });
            } else {
                noise_count += members.len();
            }
        }

        Ok(HierarchyLevel { threshold, clusters, noise_count })
    }

    fn validate_event(
        &self,
        row: usize,
        event: &MergeEvent,
        universe: usize,
    ) -> Result<(), HierarchyError> {
        if event.child >= universe || event.parent >= universe {
            return Err(HierarchyError::MalformedRow {
                row,
                reason: format!(
                    "node ({} -> {}) outside the node range 0..{universe}",
                    event.child, event.parent
                ),
            });
        }
        if self.tree.is_point(event.parent) {
            return Err(HierarchyError::MalformedRow {
                row,
                reason: format!("parent {} is a point, not an internal node", event.parent),
            });
        }
        Ok(())
    }

    fn collect_levels(
        &self,
        results: Vec<(f64, Result<HierarchyLevel, HierarchyError>)>,
    ) -> Option<Hierarchy> {
        let levels: Vec<HierarchyLevel> = results
            .into_iter()
            .filter_map(|(threshold, result)| match result {
                Ok(level) => Some(level),
                Err(err) => {
                    warn!("Failed to extract clusters at lambda={threshold}: {err}");
                    None
                }
            })
            .collect();

        // Levels are in descending order, so the range comes from the ends
        let (first, last) = match (levels.first(), levels.last()) {
            (Some(first), Some(last)) => (first.threshold, last.threshold),
            _ => {
                warn!("No valid hierarchy levels extracted");
                return None;
            }
        };
        info!(
            "Extracted {} hierarchy levels, lambda range {:.4} to {:.4}",
            levels.len(),
            last,
            first
        );
        Some(Hierarchy { threshold_range: (last, first), levels })
    }
}
