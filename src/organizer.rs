use std::collections::BTreeMap;

/// Label marking a point as noise.
pub const NOISE_LABEL: i32 = -1;

/// Flat clustering output split into base clusters and noise.
///
/// Members are point indices in first-seen order. Clusters are keyed by label, so iteration is
/// in ascending label order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatResult {
    pub clusters: BTreeMap<i32, Vec<usize>>,
    pub noise: Vec<usize>,
}

impl FlatResult {
    /// Partitions `labels` in a single pass. Any negative label counts as noise.
    pub fn from_labels(labels: &[i32]) -> Self {
        let mut result = FlatResult::default();
        for (point, &label) in labels.iter().enumerate() {
            if label < 0 {
                result.noise.push(point);
            } else {
                result.clusters.entry(label).or_default().push(point);
            }
        }
        result
    }

    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_labels() {
        let labels = vec![1, 0, NOISE_LABEL, 1, 0, NOISE_LABEL, 2];
        let result = FlatResult::from_labels(&labels);

        assert_eq!(3, result.n_clusters());
        assert_eq!(Some(&vec![1, 4]), result.clusters.get(&0));
        assert_eq!(Some(&vec![0, 3]), result.clusters.get(&1));
        assert_eq!(Some(&vec![6]), result.clusters.get(&2));
        assert_eq!(vec![2, 5], result.noise);
    }

    #[test]
    fn ascending_label_order() {
        let result = FlatResult::from_labels(&[3, 1, 2, 0]);
        let labels: Vec<i32> = result.clusters.keys().copied().collect();
        assert_eq!(vec![0, 1, 2, 3], labels);
    }

    #[test]
    fn all_noise() {
        let result = FlatResult::from_labels(&[NOISE_LABEL; 4]);
        assert_eq!(0, result.n_clusters());
        assert_eq!(vec![0, 1, 2, 3], result.noise);
    }

    #[test]
    fn empty_labels() {
        assert_eq!(FlatResult::default(), FlatResult::from_labels(&[]));
    }
}
