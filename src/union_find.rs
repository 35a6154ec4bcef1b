/// Disjoint set over a fixed universe of indices `[0, len)`.
///
/// Linking is plain parent-pointer linking (no rank or size balancing); `find` compresses the
/// traversed path in place. Indices outside the universe panic through slice indexing, callers
/// are expected to validate them first.
#[derive(Debug, Clone)]
pub(crate) struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(universe: usize) -> Self {
        let parent = (0..universe).collect();
        UnionFind { parent }
    }

    pub(crate) fn len(&self) -> usize {
        self.parent.len()
    }

    /// Links the component of `m` under the representative of `n`.
    pub(crate) fn union(&mut self, m: usize, n: usize) {
        let root_m = self.find(m);
        let root_n = self.find(n);
        if root_m != root_n {
            self.parent[root_m] = root_n;
        }
    }

    pub(crate) fn find(&mut self, n: usize) -> usize {
        let mut root = n;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut p = n;
        while self.parent[p] != root {
            let next = self.parent[p];
            self.parent[p] = root;
            p = next;
        }
        root
    }
}
