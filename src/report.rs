use crate::fallback::FallbackOutcome;
use crate::hierarchy::{Hierarchy, HierarchyLevel};
use crate::reassignment::ReassignmentRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The structured result of a report run, serialized as the response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub clusters: Vec<ClusterEntry>,
    pub noise: Vec<String>,
    pub reassigned_noise: Vec<ReassignedNoise>,
    pub total_clusters: usize,
    pub total_noise: usize,
    pub total_reassigned: usize,
    /// `null` when no hierarchy could be extracted.
    pub hierarchy_data: Option<HierarchyData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEntry {
    pub cluster_id: String,
    pub video_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_weak_cluster: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignedNoise {
    pub video_id: String,
    pub original_cluster: i32,
    pub reassigned_to: i32,
    pub membership_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyData {
    /// `[min, max]` over the emitted level thresholds.
    pub lambda_range: [f64; 2],
    pub levels: Vec<LevelEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelEntry {
    pub lambda: f64,
    pub clusters: Vec<ClusterEntry>,
    pub noise_count: usize,
    pub cluster_count: usize,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Report {
    /// Report for inputs too small to cluster: every id is noise.
    pub fn degenerate(ids: Vec<String>) -> Self {
        Report {
            clusters: Vec::new(),
            total_clusters: 0,
            total_noise: ids.len(),
            noise: ids,
            reassigned_noise: Vec::new(),
            total_reassigned: 0,
            hierarchy_data: None,
        }
    }
}

/// Builds the [`Report`] from the pieces produced along the pipeline, mapping point indices to
/// their ids. Totals are tallied from the assembled lists.
pub struct ReportAssembler<'a> {
    ids: &'a [String],
}

impl<'a> ReportAssembler<'a> {
    /// `ids[i]` is the id of point `i`.
    pub fn new(ids: &'a [String]) -> Self {
        ReportAssembler { ids }
    }

    /// # Parameters
    /// * `base_clusters` - primary clusters by label, already grown by reassignment.
    /// * `records` - reassignment provenance, in the order points were reassigned.
    /// * `fallback` - weak clusters and final noise.
    /// * `hierarchy` - extracted levels, if any.
    pub fn assemble(
        &self,
        base_clusters: &BTreeMap<i32, Vec<usize>>,
        records: &[ReassignmentRecord],
        fallback: &FallbackOutcome,
        hierarchy: Option<&Hierarchy>,
    ) -> Report {
        let mut clusters: Vec<ClusterEntry> = base_clusters
            .iter()
            .map(|(label, members)| ClusterEntry {
                cluster_id: format!("cluster_{label}"),
                video_ids: self.point_ids(members),
                is_weak_cluster: false,
                size: None,
            })
            .collect();
        clusters.extend(fallback.weak_clusters.iter().map(|(label, members)| ClusterEntry {
            cluster_id: format!("weak_cluster_{label}"),
            video_ids: self.point_ids(members),
            is_weak_cluster: true,
            size: None,
        }));

        let noise = self.point_ids(&fallback.noise);
        let reassigned_noise: Vec<ReassignedNoise> = records
            .iter()
            .map(|record| ReassignedNoise {
                video_id: self.ids[record.point].clone(),
                original_cluster: record.original_label,
                reassigned_to: record.reassigned_to,
                membership_strength: record.confidence,
            })
            .collect();

        Report {
            total_clusters: clusters.len(),
            total_noise: noise.len(),
            total_reassigned: reassigned_noise.len(),
            clusters,
            noise,
            reassigned_noise,
            hierarchy_data: hierarchy.map(|hierarchy| self.hierarchy_data(hierarchy)),
        }
    }

    fn hierarchy_data(&self, hierarchy: &Hierarchy) -> HierarchyData {
        let (min, max) = hierarchy.threshold_range;
        HierarchyData {
            lambda_range: [min, max],
            levels: hierarchy.levels.iter().map(|level| self.level_entry(level)).collect(),
        }
    }

    fn level_entry(&self, level: &HierarchyLevel) -> LevelEntry {
        let clusters: Vec<ClusterEntry> = level
            .clusters
            .iter()
            .map(|cluster| ClusterEntry {
                cluster_id: cluster.cluster_id.clone(),
                video_ids: self.point_ids(&cluster.members),
                is_weak_cluster: false,
                size: Some(cluster.size()),
            })
            .collect();
        LevelEntry {
            lambda: level.threshold,
            cluster_count: clusters.len(),
            clusters,
            noise_count: level.noise_count,
        }
    }

    fn point_ids(&self, points: &[usize]) -> Vec<String> {
        points.iter().map(|&point| self.ids[point].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::LevelCluster;
    use crate::organizer::NOISE_LABEL;
    use serde_json::json;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("v{i}")).collect()
    }

    #[test]
    fn degenerate_report_json() {
        let report = Report::degenerate(vec![String::from("a"), String::from("b")]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json!({
                "clusters": [],
                "noise": ["a", "b"],
                "reassignedNoise": [],
                "totalClusters": 0,
                "totalNoise": 2,
                "totalReassigned": 0,
                "hierarchyData": null
            }),
            value
        );
    }

    #[test]
    fn base_then_weak_clusters_with_tallies() {
        let ids = ids(8);
        let base = BTreeMap::from([(1, vec![2, 3]), (0, vec![0, 1, 6])]);
        let records = vec![ReassignmentRecord {
            point: 6,
            original_label: NOISE_LABEL,
            reassigned_to: 0,
            confidence: 0.4,
        }];
        let fallback = FallbackOutcome {
            weak_clusters: BTreeMap::from([(0, vec![4, 5])]),
            noise: vec![7],
        };

        let report = ReportAssembler::new(&ids).assemble(&base, &records, &fallback, None);

        let cluster_ids: Vec<&str> =
            report.clusters.iter().map(|c| c.cluster_id.as_str()).collect();
        assert_eq!(vec!["cluster_0", "cluster_1", "weak_cluster_0"], cluster_ids);
        assert_eq!(vec!["v0", "v1", "v6"], report.clusters[0].video_ids);
        assert!(report.clusters[2].is_weak_cluster);
        assert_eq!(vec!["v7"], report.noise);
        assert_eq!(3, report.total_clusters);
        assert_eq!(1, report.total_noise);
        assert_eq!(1, report.total_reassigned);
        assert_eq!("v6", report.reassigned_noise[0].video_id);
        assert_eq!(-1, report.reassigned_noise[0].original_cluster);
        assert!(report.hierarchy_data.is_none());
    }

    #[test]
    fn weak_flag_and_size_are_omitted_when_unset() {
        let ids = ids(4);
        let base = BTreeMap::from([(0, vec![0, 1])]);
        let fallback = FallbackOutcome {
            weak_clusters: BTreeMap::from([(0, vec![2, 3])]),
            noise: Vec::new(),
        };
        let report = ReportAssembler::new(&ids).assemble(&base, &[], &fallback, None);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(json!({"clusterId": "cluster_0", "videoIds": ["v0", "v1"]}), value["clusters"][0]);
        assert_eq!(
            json!({"clusterId": "weak_cluster_0", "videoIds": ["v2", "v3"], "isWeakCluster": true}),
            value["clusters"][1]
        );
    }

    #[test]
    fn hierarchy_levels_keep_order() {
        let ids = ids(3);
        let hierarchy = Hierarchy {
            threshold_range: (0.3, 0.9),
            levels: vec![
                HierarchyLevel {
                    threshold: 0.9,
                    clusters: vec![LevelCluster {
                        cluster_id: String::from("lambda_0.9000_cluster_0"),
                        members: vec![0, 1],
                    }],
                    noise_count: 1,
                },
                HierarchyLevel {
                    threshold: 0.3,
                    clusters: vec![LevelCluster {
                        cluster_id: String::from("lambda_0.3000_cluster_0"),
                        members: vec![0, 1, 2],
                    }],
                    noise_count: 0,
                },
            ],
        };
        let fallback = FallbackOutcome::default();
        let report = ReportAssembler::new(&ids).assemble(
            &BTreeMap::new(),
            &[],
            &fallback,
            Some(&hierarchy),
        );

        let data = report.hierarchy_data.unwrap();
        assert_eq!([0.3, 0.9], data.lambda_range);
        assert_eq!(vec![0.9, 0.3], data.levels.iter().map(|l| l.lambda).collect::<Vec<_>>());
        assert_eq!(1, data.levels[0].cluster_count);
        assert_eq!(Some(2), data.levels[0].clusters[0].size);
        assert_eq!(vec!["v0", "v1", "v2"], data.levels[1].clusters[0].video_ids);

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(1, value["levels"][0]["noiseCount"]);
        assert_eq!(2, value["levels"][0]["clusters"][0]["size"]);
    }
}
