/*!
# Union–Find

Disjoint-set forest with path compression and union by rank.

Unlike the textbook structure, the representative reported by [`UnionFind::find`]
is decoupled from the internal tree root: every set carries a representative
*label* that `union` can pin explicitly. The cardinality engine relies on this
to keep a merged bloom's representative equal to the bloom base, no matter
which tree root survives the union.
*/

use crate::graph::{Node, NumNodes};

/// Disjoint sets over `0..n` with steerable representatives.
///
/// # Examples
/// ```
/// use blossoms::utils::UnionFind;
///
/// let mut uf = UnionFind::new(4);
/// uf.union_with_rep(0, 1, 1);
/// uf.union_with_rep(1, 2, 3); // the representative label may be any node
/// assert_eq!(uf.find(0), 3);
/// assert_eq!(uf.find(2), 3);
/// assert_eq!(uf.find(3), 3); // 3 itself still forms its own singleton
/// ```
#[derive(Clone, Debug)]
pub struct UnionFind {
    parent: Vec<Node>,
    rank: Vec<u8>,
    repr: Vec<Node>,
}

impl UnionFind {
    /// Creates `n` singleton sets, each its own representative.
    pub fn new(n: NumNodes) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n as usize],
            repr: (0..n).collect(),
        }
    }

    /// Resets every element back to a singleton set.
    pub fn reset(&mut self) {
        for (i, p) in self.parent.iter_mut().enumerate() {
            *p = i as Node;
        }
        self.rank.fill(0);
        for (i, r) in self.repr.iter_mut().enumerate() {
            *r = i as Node;
        }
    }

    fn root(&mut self, x: Node) -> Node {
        let mut x = x;
        while self.parent[x as usize] != x {
            // halving: point to grandparent
            let gp = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = gp;
            x = gp;
        }
        x
    }

    /// Representative of the set containing `x`.
    pub fn find(&mut self, x: Node) -> Node {
        let r = self.root(x);
        self.repr[r as usize]
    }

    /// Returns *true* if `x` and `y` are in the same set.
    pub fn same_set(&mut self, x: Node, y: Node) -> bool {
        self.root(x) == self.root(y)
    }

    /// Merges the sets of `x` and `y`; the surviving representative is the
    /// one of `x`'s set.
    pub fn union(&mut self, x: Node, y: Node) {
        let rep = self.find(x);
        self.union_with_rep(x, y, rep);
    }

    /// Merges the sets of `x` and `y` and pins `rep` as the representative of
    /// the merged set.
    pub fn union_with_rep(&mut self, x: Node, y: Node, rep: Node) {
        let rx = self.root(x);
        let ry = self.root(y);
        if rx == ry {
            self.repr[rx as usize] = rep;
            return;
        }

        let merged = match self.rank[rx as usize].cmp(&self.rank[ry as usize]) {
            std::cmp::Ordering::Less => {
                self.parent[rx as usize] = ry;
                ry
            }
            std::cmp::Ordering::Greater => {
                self.parent[ry as usize] = rx;
                rx
            }
            std::cmp::Ordering::Equal => {
                self.parent[ry as usize] = rx;
                self.rank[rx as usize] += 1;
                rx
            }
        };
        self.repr[merged as usize] = rep;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn singletons() {
        let mut uf = UnionFind::new(5);
        assert_eq!((0..5).map(|v| uf.find(v)).collect_vec(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn representative_override() {
        let mut uf = UnionFind::new(6);
        uf.union_with_rep(0, 1, 0);
        uf.union_with_rep(2, 3, 2);
        uf.union_with_rep(1, 3, 5);
        for v in [0, 1, 2, 3] {
            assert_eq!(uf.find(v), 5);
        }
        assert_eq!(uf.find(4), 4);
    }

    #[test]
    fn reset_restores_singletons() {
        let mut uf = UnionFind::new(4);
        uf.union(0, 1);
        uf.union(2, 3);
        uf.reset();
        assert_eq!((0..4).map(|v| uf.find(v)).collect_vec(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn random_unions_agree_with_naive_labels() {
        let rng = &mut Pcg64Mcg::seed_from_u64(7);
        let n = 64;

        let mut uf = UnionFind::new(n);
        let mut labels = (0..n).collect_vec();

        for _ in 0..200 {
            let x = rng.random_range(0..n);
            let y = rng.random_range(0..n);
            let rep = rng.random_range(0..n);

            uf.union_with_rep(x, y, rep);
            let (lx, ly) = (labels[x as usize], labels[y as usize]);
            for l in labels.iter_mut() {
                if *l == lx || *l == ly {
                    *l = rep;
                }
            }

            for v in 0..n {
                assert_eq!(uf.find(v), labels[v as usize]);
            }
        }
    }
}
