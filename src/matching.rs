/*!
# Matching Result

A *matching* is a set of edges without shared endpoints. All engines in this
crate report their result as a [`Matching`]: a dense mate array over the
nodes, together with the edge id realizing each pair (relevant for graphs
with parallel edges of different weights).
*/

use crate::graph::*;

/// The matching computed by one of the engines.
///
/// Symmetric by construction: if `a` is matched to `b`, then `b` is matched
/// to `a` via the same edge. Unmatched nodes have no partner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Matching {
    mate: Vec<Node>,
    mate_edge: Vec<EdgeId>,
}

impl Matching {
    /// Creates an empty matching on `n` nodes.
    pub(crate) fn empty(n: NumNodes) -> Self {
        Self {
            mate: vec![NO_NODE; n as usize],
            mate_edge: vec![NO_EDGE; n as usize],
        }
    }

    /// Records edge `e = {u, v}` as matched.
    ///
    /// Both endpoints must currently be unmatched.
    pub(crate) fn match_pair(&mut self, u: Node, v: Node, e: EdgeId) {
        debug_assert_eq!(self.mate[u as usize], NO_NODE);
        debug_assert_eq!(self.mate[v as usize], NO_NODE);
        self.mate[u as usize] = v;
        self.mate[v as usize] = u;
        self.mate_edge[u as usize] = e;
        self.mate_edge[v as usize] = e;
    }

    /// Partner of `v`, or `None` if `v` is unmatched.
    #[inline(always)]
    pub fn partner(&self, v: Node) -> Option<Node> {
        let mate = self.mate[v as usize];
        (mate != NO_NODE).then_some(mate)
    }

    /// Returns *true* if `v` is matched.
    #[inline(always)]
    pub fn is_matched(&self, v: Node) -> bool {
        self.mate[v as usize] != NO_NODE
    }

    /// Number of matched edges.
    pub fn cardinality(&self) -> NumEdges {
        (self.mate.iter().filter(|&&m| m != NO_NODE).count() / 2) as NumEdges
    }

    /// Iterator over matched pairs `(u, v, edge id)` with `u < v`, each edge
    /// reported once, ordered by `u`.
    pub fn edges(&self) -> impl Iterator<Item = (Node, Node, EdgeId)> + '_ {
        self.mate
            .iter()
            .zip(&self.mate_edge)
            .enumerate()
            .filter_map(|(u, (&v, &e))| (v != NO_NODE && (u as Node) < v).then(|| (u as Node, v, e)))
    }

    /// Total weight of the matching in the weights of `graph`.
    pub fn total_weight(&self, graph: &Graph) -> Weight {
        self.edges().map(|(_, _, e)| graph.weight_of(e)).sum()
    }

    /// Checks that the matching is structurally valid for `graph`: mates are
    /// symmetric, every recorded edge exists with the recorded endpoints, and
    /// no node occurs twice.
    pub fn is_valid(&self, graph: &Graph) -> bool {
        if self.mate.len() != graph.number_of_nodes() as usize {
            return false;
        }

        let mut covered = NodeBitSet::new(graph.number_of_nodes());
        for (u, v, e) in self.edges() {
            if covered.get_bit(u) || covered.get_bit(v) {
                return false;
            }
            covered.set_bit(u);
            covered.set_bit(v);

            let (a, b) = graph.edge(e);
            if (a, b) != (u, v) && (b, a) != (u, v) {
                return false;
            }
        }

        graph
            .vertices()
            .all(|v| self.partner(v).is_none_or(|p| self.partner(p) == Some(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn pairs_and_weight() {
        let g = Graph::from_weighted_edges(4, [(0, 1, 4), (2, 3, 6)]).unwrap();
        let mut m = Matching::empty(4);
        m.match_pair(1, 0, 0);
        m.match_pair(2, 3, 1);

        assert_eq!(m.cardinality(), 2);
        assert_eq!(m.partner(0), Some(1));
        assert_eq!(m.partner(1), Some(0));
        assert_eq!(m.edges().collect_vec(), vec![(0, 1, 0), (2, 3, 1)]);
        assert_eq!(m.total_weight(&g), 10);
        assert!(m.is_valid(&g));
    }

    #[test]
    fn empty_matching_is_valid() {
        let g = Graph::from_edges(3, [(0, 1), (1, 2)]).unwrap();
        let m = Matching::empty(3);
        assert_eq!(m.cardinality(), 0);
        assert!(!m.is_matched(1));
        assert!(m.is_valid(&g));
    }
}
