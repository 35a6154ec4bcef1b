use crate::error::EngineError;
use crate::vectors::euclidean_distance;
use kdtree::{ErrorKind, KdTree};

/// Distance based soft membership of points against the clusters of a labelling.
///
/// For a point `p` and cluster `c`, with `d_c` the distance from `p` to the nearest member of
/// `c` and `s_c` the mean distance between members of `c` and their nearest fellow member:
///
/// ```text
/// share_c = (1 / d_c) / sum_k (1 / d_k)
/// score_c = share_c * min(1, s_c / d_c)
/// ```
///
/// `share` splits the point between clusters by proximity, the second factor discounts clusters
/// the point is far from relative to how tight they are. A point sitting on a member scores `1`
/// for that cluster and `0` elsewhere.
pub(crate) struct SoftMembership<'a> {
    data: &'a [Vec<f32>],
    labels: &'a [i32],
}

struct ClusterIndex<'a> {
    tree: KdTree<f32, usize, &'a Vec<f32>>,
    spread: f64,
}

impl<'a> SoftMembership<'a> {
    pub(crate) fn new(data: &'a [Vec<f32>], labels: &'a [i32]) -> Self {
        Self { data, labels }
    }

    pub(crate) fn calc_membership_vectors(
        &self,
        points: &[usize],
    ) -> Result<Vec<Vec<f64>>, EngineError> {
        if self.labels.len() != self.data.len() {
            return Err(EngineError::ContractViolation(format!(
                "{} labels for {} data points",
                self.labels.len(),
                self.data.len()
            )));
        }
        let indexes = self.build_cluster_indexes()?;
        if indexes.is_empty() {
            return Err(EngineError::NoClusters);
        }

        points
            .iter()
            .map(|&point| {
                let datapoint = self.data.get(point).ok_or_else(|| {
                    EngineError::ContractViolation(format!("point {point} is out of range"))
                })?;
                let distances = indexes
                    .iter()
                    .map(|index| index.nearest_distance(datapoint))
                    .collect::<Result<Vec<f64>, EngineError>>()?;
                Ok(Self::scores(&distances, &indexes))
            })
            .collect()
    }

    fn build_cluster_indexes(&self) -> Result<Vec<ClusterIndex<'a>>, EngineError> {
        let n_clusters = self.labels.iter().max().map_or(0, |&max| (max + 1).max(0) as usize);
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_clusters];
        for (point, &label) in self.labels.iter().enumerate() {
            if label >= 0 {
                members[label as usize].push(point);
            }
        }
        members
            .iter()
            .map(|cluster| ClusterIndex::new(self.data, cluster))
            .collect()
    }

    fn scores(distances: &[f64], indexes: &[ClusterIndex]) -> Vec<f64> {
        if let Some(exact) = distances.iter().position(|d| *d == 0.0) {
            let mut row = vec![0.0; distances.len()];
            row[exact] = 1.0;
            return row;
        }
        let total_inverse: f64 = distances
            .iter()
            .filter(|d| d.is_finite())
            .map(|d| 1.0 / d)
            .sum();
        distances
            .iter()
            .zip(indexes)
            .map(|(&d, index)| {
                if !d.is_finite() || total_inverse <= 0.0 {
                    return 0.0;
                }
                let share = (1.0 / d) / total_inverse;
                share * (index.spread / d).min(1.0)
            })
            .collect()
    }
}

impl<'a> ClusterIndex<'a> {
    fn new(data: &'a [Vec<f32>], members: &[usize]) -> Result<Self, EngineError> {
        let n_dims = data.first().map_or(0, |datapoint| datapoint.len());
        let mut tree = KdTree::new(n_dims);
        for &member in members {
            tree.add(&data[member], member).map_err(kdtree_error)?;
        }

        let mut spread = 0.0;
        if members.len() > 1 {
            let mut total = 0.0;
            for &member in members {
                let neighbours = tree
                    .nearest(&data[member], 2, &euclidean_distance)
                    .map_err(kdtree_error)?;
                total += neighbours.get(1).map_or(0.0, |(dist, _)| f64::from(*dist));
            }
            spread = total / members.len() as f64;
        }
        Ok(ClusterIndex { tree, spread })
    }

    /// Infinite for a cluster with no members.
    fn nearest_distance(&self, datapoint: &[f32]) -> Result<f64, EngineError> {
        if self.tree.size() == 0 {
            return Ok(f64::INFINITY);
        }
        let nearest = self
            .tree
            .nearest(datapoint, 1, &euclidean_distance)
            .map_err(kdtree_error)?;
        Ok(nearest.first().map_or(f64::INFINITY, |(dist, _)| f64::from(*dist)))
    }
}

fn kdtree_error(err: ErrorKind) -> EngineError {
    match err {
        ErrorKind::WrongDimension => {
            EngineError::WrongDimension(String::from("vector does not match cluster dimensions"))
        }
        ErrorKind::NonFiniteCoordinate => {
            EngineError::NonFiniteCoordinate(String::from("vector contains non-finite element(s)"))
        }
        other => EngineError::ContractViolation(format!("nearest neighbour search failed: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_clusters() -> (Vec<Vec<f32>>, Vec<i32>) {
        let data = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![10.0, 1.0],
            // Close to cluster 0
            vec![0.0, 2.0],
            // Far from everything
            vec![5.0, 50.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1, -1, -1];
        (data, labels)
    }

    #[test]
    fn nearby_point_scores_high_for_its_cluster() {
        let (data, labels) = two_clusters();
        let rows = SoftMembership::new(&data, &labels)
            .calc_membership_vectors(&[6])
            .unwrap();
        assert_eq!(2, rows[0].len());
        assert!(rows[0][0] > 0.4);
        assert!(rows[0][0] > rows[0][1]);
    }

    #[test]
    fn distant_point_scores_low_everywhere() {
        let (data, labels) = two_clusters();
        let rows = SoftMembership::new(&data, &labels)
            .calc_membership_vectors(&[7])
            .unwrap();
        assert!(rows[0].iter().all(|score| *score < 0.1));
        assert!(rows[0].iter().all(|score| *score >= 0.0));
    }

    #[test]
    fn point_on_member_is_certain() {
        let (data, labels) = two_clusters();
        let rows = SoftMembership::new(&data, &labels)
            .calc_membership_vectors(&[4])
            .unwrap();
        assert_eq!(vec![0.0, 1.0], rows[0]);
    }

    #[test]
    fn no_clusters() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let labels = vec![-1, -1];
        let result = SoftMembership::new(&data, &labels).calc_membership_vectors(&[0]);
        assert!(matches!(result, Err(EngineError::NoClusters)));
    }

    #[test]
    fn out_of_range_point() {
        let (data, labels) = two_clusters();
        let result = SoftMembership::new(&data, &labels).calc_membership_vectors(&[99]);
        assert!(matches!(result, Err(EngineError::ContractViolation(..))));
    }
}
