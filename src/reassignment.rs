use crate::organizer::NOISE_LABEL;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Default minimum membership score for a noise point to join a cluster.
pub const MEMBERSHIP_THRESHOLD_DEFAULT: f64 = 0.1;

/// Provenance of a noise point moved into a base cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ReassignmentRecord {
    pub point: usize,
    pub original_label: i32,
    pub reassigned_to: i32,
    pub confidence: f64,
}

/// Outcome of a reassignment pass: records in noise order and the points left unassigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reassignment {
    pub records: Vec<ReassignmentRecord>,
    pub residual: Vec<usize>,
}

impl Reassignment {
    /// Every noise point stays unassigned.
    pub fn unassigned(noise: &[usize]) -> Self {
        Reassignment { records: Vec::new(), residual: noise.to_vec() }
    }
}

/// Moves noise points into their best-fitting base cluster when the soft membership score is
/// confident enough.
///
/// Membership column `i` is the score for cluster label `i`. A matrix whose shape disagrees with
/// the noise set or the base clusters is rejected as a whole and nothing is reassigned.
#[derive(Debug, Clone, Copy)]
pub struct NoiseReassigner {
    threshold: f64,
}

impl NoiseReassigner {
    pub fn new(threshold: f64) -> Self {
        NoiseReassigner { threshold }
    }

    /// Reassigns each noise point whose best score clears the threshold, appending it to the
    /// target cluster's members.
    ///
    /// # Parameters
    /// * `clusters` - base clusters keyed by label, grown in place.
    /// * `noise` - point indices of the noise points.
    /// * `memberships` - one row per noise point, in the same order as `noise`.
    pub fn reassign(
        &self,
        clusters: &mut BTreeMap<i32, Vec<usize>>,
        noise: &[usize],
        memberships: &[Vec<f64>],
    ) -> Reassignment {
        if clusters.is_empty() {
            return Reassignment::unassigned(noise);
        }
        if memberships.len() != noise.len() {
            warn!(
                "Membership matrix has {} rows for {} noise points, skipping reassignment",
                memberships.len(),
                noise.len()
            );
            return Reassignment::unassigned(noise);
        }
        let n_clusters = clusters.len();
        if let Some(row) = memberships.iter().find(|row| row.len() != n_clusters) {
            warn!(
                "Membership vectors have {} columns but there are {} clusters, skipping reassignment",
                row.len(),
                n_clusters
            );
            return Reassignment::unassigned(noise);
        }

        let mut outcome = Reassignment::default();
        for (&point, row) in noise.iter().zip(memberships) {
            let target = best_column(row)
                .filter(|(_, score)| *score >= self.threshold)
                .and_then(|(column, score)| i32::try_from(column).ok().map(|label| (label, score)));

            if let Some((label, score)) = target {
                if let Some(members) = clusters.get_mut(&label) {
                    members.push(point);
                    debug!("Reassigned noise point {point} to cluster {label} (strength: {score:.3})");
                    outcome.records.push(ReassignmentRecord {
                        point,
                        original_label: NOISE_LABEL,
                        reassigned_to: label,
                        confidence: score,
                    });
                    continue;
                }
            }
            outcome.residual.push(point);
        }
        info!(
            "Reassigned {} noise points, {} remain unassigned",
            outcome.records.len(),
            outcome.residual.len()
        );
        outcome
    }
}

/// Index and value of the maximum score. The lowest index wins ties; NaN scores never win.
fn best_column(row: &[f64]) -> Option<(usize, f64)> {
    row.iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best, (column, score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((column, score)),
        })
}
