use crate::data_wrappers::{MSTEdge, MergeEvent, MergeTree, SLTNode};
use crate::union_find::UnionFind;
use crate::vectors::euclidean_distance;
use num_traits::Float;
use std::cmp::Ordering;
use std::collections::VecDeque;

const BRUTE_FORCE_N_SAMPLES_LIMIT: usize = 250;

/// Builds the condensed merge tree of a data set.
///
/// Core distances feed a mutual reachability minimum spanning tree, which is turned into a
/// single linkage tree and then condensed: a split only creates new tree nodes when both sides
/// hold at least `min_cluster_size` points, otherwise the smaller side's points fall out of
/// their parent at the split's lambda (`1 / distance`).
///
/// Node numbering follows the usual convention: points are `0..n`, the root is `n` and every
/// cluster born from a split gets the next free id.
pub(crate) struct MergeTreeBuilder<'a, T> {
    data: &'a [Vec<T>],
    n_samples: usize,
    min_cluster_size: usize,
    min_samples: usize,
}

impl<'a, T: Float> MergeTreeBuilder<'a, T> {
    pub(crate) fn new(data: &'a [Vec<T>], min_cluster_size: usize, min_samples: usize) -> Self {
        Self {
            data,
            n_samples: data.len(),
            min_cluster_size: min_cluster_size.max(2),
            min_samples: min_samples.clamp(1, data.len().max(1)),
        }
    }

    /// Data must already be validated: non-empty, finite and of equal dimensions.
    pub(crate) fn build(&self) -> Result<MergeTree, String> {
        if self.n_samples < 2 {
            return Ok(MergeTree::new(self.n_samples, Vec::new()));
        }
        let core_distances = self.calc_core_distances()?;
        let min_spanning_tree = self.prims_min_spanning_tree(&core_distances);
        let single_linkage_tree = self.make_single_linkage_tree(&min_spanning_tree);
        let events = self.condense_tree(&single_linkage_tree);
        Ok(MergeTree::new(self.n_samples, events))
    }

    pub(crate) fn calc_core_distances(&self) -> Result<Vec<T>, String> {
        let k = self.min_samples;
        if self.n_samples <= BRUTE_FORCE_N_SAMPLES_LIMIT {
            return Ok(self
                .data
                .iter()
                .map(|point| {
                    let mut distances: Vec<T> = self
                        .data
                        .iter()
                        .map(|other| euclidean_distance(point, other))
                        .collect();
                    distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                    distances[k - 1]
                })
                .collect());
        }

        let mut tree: kdtree::KdTree<T, usize, &Vec<T>> =
            kdtree::KdTree::new(self.data[0].len());
        for (n, datapoint) in self.data.iter().enumerate() {
            tree.add(datapoint, n).map_err(|err| format!("{err:?}"))?;
        }
        self.data
            .iter()
            .map(|datapoint| {
                let neighbours = tree
                    .nearest(datapoint, k, &euclidean_distance)
                    .map_err(|err| format!("{err:?}"))?;
                neighbours
                    .last()
                    .map(|(dist, _idx)| *dist)
                    .ok_or_else(|| String::from("no neighbours found"))
            })
            .collect()
    }

    fn prims_min_spanning_tree(&self, core_distances: &[T]) -> Vec<MSTEdge<T>> {
        let mut in_tree = vec![false; self.n_samples];
        let mut distances = vec![T::infinity(); self.n_samples];
        // Tree node each outside node is closest to
        let mut parents = vec![0_usize; self.n_samples];
        let mut mst = Vec::with_capacity(self.n_samples - 1);

        let mut latest_node_id = 0;
        for _ in 1..self.n_samples {
            in_tree[latest_node_id] = true;
            let mut current_min_dist = T::infinity();
            let mut right_node_id = latest_node_id;

            for i in 0..self.n_samples {
                if in_tree[i] {
                    continue;
                }
                let mrd = self.mutual_reachability(latest_node_id, i, core_distances);
                if mrd < distances[i] {
                    distances[i] = mrd;
                    parents[i] = latest_node_id;
                }
                if right_node_id == latest_node_id || distances[i] < current_min_dist {
                    right_node_id = i;
                    current_min_dist = distances[i];
                }
            }
            mst.push(MSTEdge {
                left_node_id: parents[right_node_id],
                right_node_id,
                distance: current_min_dist,
            });
            latest_node_id = right_node_id;
        }
        mst.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        mst
    }

    fn mutual_reachability(&self, a: usize, b: usize, core_distances: &[T]) -> T {
        let dist_a_b = euclidean_distance(&self.data[a], &self.data[b]);
        core_distances[a].max(core_distances[b]).max(dist_a_b)
    }

    fn make_single_linkage_tree(&self, min_spanning_tree: &[MSTEdge<T>]) -> Vec<SLTNode<T>> {
        let n_nodes = 2 * self.n_samples - 1;
        let mut union_find = UnionFind::new(n_nodes);
        let mut sizes: Vec<usize> =
            (0..n_nodes).map(|n| usize::from(n < self.n_samples)).collect();
        let mut single_linkage_tree = Vec::with_capacity(self.n_samples - 1);

        for (i, edge) in min_spanning_tree.iter().enumerate() {
            let new_node = self.n_samples + i;
            let left_child = union_find.find(edge.left_node_id);
            let right_child = union_find.find(edge.right_node_id);
            let size = sizes[left_child] + sizes[right_child];

            single_linkage_tree.push(SLTNode {
                left_child,
                right_child,
                distance: edge.distance,
                size,
            });

            // The new node is its own root, so both sides end up under it
            sizes[new_node] = size;
            union_find.union(left_child, new_node);
            union_find.union(right_child, new_node);
        }
        single_linkage_tree
    }

    fn condense_tree(&self, single_linkage_tree: &[SLTNode<T>]) -> Vec<MergeEvent> {
        let top_node = (self.n_samples - 1) * 2;
        let node_ids = self.descendants(single_linkage_tree, top_node);

        let mut new_node_ids = vec![0_usize; top_node + 1];
        new_node_ids[top_node] = self.n_samples;
        let mut next_parent_id = self.n_samples + 1;

        let mut visited = vec![false; top_node + 1];
        let mut events = Vec::new();

        for node_id in node_ids {
            if visited[node_id] || self.is_individual_sample(node_id) {
                continue;
            }

            let node = &single_linkage_tree[node_id - self.n_samples];
            let lambda = self.calc_lambda(node.distance);
            let parent = new_node_ids[node_id];
            let children = [node.left_child, node.right_child];
            let sizes = children.map(|child| self.node_size(child, single_linkage_tree));

            match sizes.map(|size| size >= self.min_cluster_size) {
                [true, true] => {
                    for (child, size) in children.into_iter().zip(sizes) {
                        new_node_ids[child] = next_parent_id;
                        next_parent_id += 1;
                        events.push(MergeEvent {
                            child: new_node_ids[child],
                            parent,
                            lambda,
                            size,
                        });
                    }
                }
                [false, false] => {
                    for child in children {
                        self.drop_points(
                            child,
                            parent,
                            lambda,
                            single_linkage_tree,
                            &mut events,
                            &mut visited,
                        );
                    }
                }
                [false, true] => {
                    new_node_ids[children[1]] = parent;
                    self.drop_points(
                        children[0],
                        parent,
                        lambda,
                        single_linkage_tree,
                        &mut events,
                        &mut visited,
                    );
                }
                [true, false] => {
                    new_node_ids[children[0]] = parent;
                    self.drop_points(
                        children[1],
                        parent,
                        lambda,
                        single_linkage_tree,
                        &mut events,
                        &mut visited,
                    );
                }
            }
        }
        events
    }

    /// Breadth first walk of the single linkage tree below `root`, `root` included.
    fn descendants(&self, single_linkage_tree: &[SLTNode<T>], root: usize) -> Vec<usize> {
        let mut process_queue = VecDeque::from([root]);
        let mut nodes = Vec::new();

        while let Some(node_id) = process_queue.pop_front() {
            nodes.push(node_id);
            if self.is_individual_sample(node_id) {
                continue;
            }
            let node = &single_linkage_tree[node_id - self.n_samples];
            process_queue.push_back(node.left_child);
            process_queue.push_back(node.right_child);
        }
        nodes
    }

    /// Every point below `node_id` leaves `parent` at `lambda`.
    fn drop_points(
        &self,
        node_id: usize,
        parent: usize,
        lambda: f64,
        single_linkage_tree: &[SLTNode<T>],
        events: &mut Vec<MergeEvent>,
        visited: &mut [bool],
    ) {
        for child in self.descendants(single_linkage_tree, node_id) {
            if self.is_individual_sample(child) {
                events.push(MergeEvent { child, parent, lambda, size: 1 });
            }
            visited[child] = true;
        }
    }

    fn is_individual_sample(&self, node_id: usize) -> bool {
        node_id < self.n_samples
    }

    fn node_size(&self, node_id: usize, single_linkage_tree: &[SLTNode<T>]) -> usize {
        if self.is_individual_sample(node_id) {
            1
        } else {
            single_linkage_tree[node_id - self.n_samples].size
        }
    }

    fn calc_lambda(&self, dist: T) -> f64 {
        let lambda = if dist > T::zero() { T::one() / dist } else { T::infinity() };
        lambda.to_f64().unwrap_or(f64::INFINITY)
    }
}
