/*!
# Graph Collaborator

The matching engines in this crate operate on a single concrete graph type
instead of a family of storage backends: an **undirected** adjacency-array
graph with **dense edge identifiers** and integer edge weights.

- Nodes are numbered `0..n` ([`Node`] is a plain `u32`).
- Edges are numbered `0..m` in insertion order ([`EdgeId`]); both endpoints
  store the id, so an edge can be recognized from either side.
- **Parallel edges** are allowed and treated as independent edges by all
  algorithms. **Self-loops** are rejected at insertion, since a matching can
  never use one and the blossom machinery assumes their absence.
*/

use std::ops::Range;

use stream_bitset::bitset::BitSetImpl;
use thiserror::Error;

/// Nodes are `u32` in the range `0..n`.
pub type Node = u32;

/// Number of nodes in a graph.
pub type NumNodes = Node;

/// Dense edge identifier in the range `0..m`, assigned in insertion order.
pub type EdgeId = u32;

/// Number of edges in a graph.
pub type NumEdges = EdgeId;

/// Integer edge weight. Weighted matchers internally double all weights, so
/// the usable range is half of `i64`.
pub type Weight = i64;

/// Sentinel for "no node" in dense arrays.
pub const NO_NODE: Node = Node::MAX;

/// Sentinel for "no edge" in dense arrays.
pub const NO_EDGE: EdgeId = EdgeId::MAX;

/// BitSet over nodes.
pub type NodeBitSet = BitSetImpl<Node>;

/// BitSet over edge ids.
pub type EdgeBitSet = BitSetImpl<EdgeId>;

/// Errors reported when a graph or a matcher is constructed from invalid
/// input. All of them are terminal: there is no mid-run recovery.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingError {
    /// The input contains an edge `(u, u)`.
    #[error("self-loop at node {0}")]
    SelfLoop(Node),

    /// A weighted matcher was given a negative edge weight.
    #[error("negative weight {weight} on edge {edge}")]
    NegativeWeight { edge: EdgeId, weight: Weight },

    /// `2 * max_weight * n` does not fit the dual-variable range.
    #[error("weights up to {max_weight} on {nodes} nodes overflow the dual range")]
    WeightOverflow { max_weight: Weight, nodes: NumNodes },
}

/// Undirected graph with weighted, identifiable edges.
///
/// # Examples
/// ```
/// use blossoms::graph::Graph;
///
/// let mut g = Graph::new(3);
/// let e = g.add_edge(0, 1).unwrap();
/// assert_eq!(g.edge(e), (0, 1));
/// assert_eq!(g.weight_of(e), 1);
/// assert_eq!(g.degree_of(1), 1);
/// ```
#[derive(Clone, Default)]
pub struct Graph {
    adj: Vec<Vec<(Node, EdgeId)>>,
    endpoints: Vec<(Node, Node)>,
    weights: Vec<Weight>,
}

impl Graph {
    /// Creates an empty graph on nodes `0..n`.
    pub fn new(n: NumNodes) -> Self {
        Self {
            adj: vec![Vec::new(); n as usize],
            endpoints: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Creates a graph from unit-weight edges.
    pub fn from_edges<I, E>(n: NumNodes, edges: I) -> Result<Self, MatchingError>
    where
        I: IntoIterator<Item = E>,
        E: Into<(Node, Node)>,
    {
        let mut graph = Self::new(n);
        for e in edges {
            let (u, v) = e.into();
            graph.add_edge(u, v)?;
        }
        Ok(graph)
    }

    /// Creates a graph from weighted edges.
    pub fn from_weighted_edges<I>(n: NumNodes, edges: I) -> Result<Self, MatchingError>
    where
        I: IntoIterator<Item = (Node, Node, Weight)>,
    {
        let mut graph = Self::new(n);
        for (u, v, w) in edges {
            graph.add_weighted_edge(u, v, w)?;
        }
        Ok(graph)
    }

    /// Adds the undirected edge `{u, v}` with weight `1` and returns its id.
    pub fn add_edge(&mut self, u: Node, v: Node) -> Result<EdgeId, MatchingError> {
        self.add_weighted_edge(u, v, 1)
    }

    /// Adds the undirected edge `{u, v}` with weight `w` and returns its id.
    ///
    /// Parallel edges are permitted; self-loops are not.
    ///
    /// # Panics
    /// Panics if `u` or `v` is out of range.
    pub fn add_weighted_edge(
        &mut self,
        u: Node,
        v: Node,
        w: Weight,
    ) -> Result<EdgeId, MatchingError> {
        assert!(
            u < self.number_of_nodes() && v < self.number_of_nodes(),
            "invalid endpoint on edge ({u},{v})"
        );
        if u == v {
            return Err(MatchingError::SelfLoop(u));
        }

        let id = self.endpoints.len() as EdgeId;
        self.endpoints.push((u, v));
        self.weights.push(w);
        self.adj[u as usize].push((v, id));
        self.adj[v as usize].push((u, id));
        Ok(id)
    }

    /// Number of nodes.
    #[inline(always)]
    pub fn number_of_nodes(&self) -> NumNodes {
        self.adj.len() as NumNodes
    }

    /// Number of edges (each undirected edge counted once).
    #[inline(always)]
    pub fn number_of_edges(&self) -> NumEdges {
        self.endpoints.len() as NumEdges
    }

    /// Iterator over all nodes.
    #[inline(always)]
    pub fn vertices(&self) -> Range<Node> {
        0..self.number_of_nodes()
    }

    /// Iterator over `(neighbor, edge id)` pairs incident to `u`.
    ///
    /// A parallel edge appears once per copy; the edge id distinguishes them.
    #[inline(always)]
    pub fn neighbors_of(&self, u: Node) -> impl Iterator<Item = (Node, EdgeId)> + '_ {
        self.adj[u as usize].iter().copied()
    }

    /// Degree of `u`, counting parallel edges with multiplicity.
    #[inline(always)]
    pub fn degree_of(&self, u: Node) -> NumNodes {
        self.adj[u as usize].len() as NumNodes
    }

    /// Endpoints of edge `e` in insertion order.
    #[inline(always)]
    pub fn edge(&self, e: EdgeId) -> (Node, Node) {
        self.endpoints[e as usize]
    }

    /// Weight of edge `e`.
    #[inline(always)]
    pub fn weight_of(&self, e: EdgeId) -> Weight {
        self.weights[e as usize]
    }

    /// Iterator over all edges as `(u, v, weight, id)`.
    pub fn edges(&self) -> impl Iterator<Item = (Node, Node, Weight, EdgeId)> + '_ {
        self.endpoints
            .iter()
            .zip(&self.weights)
            .enumerate()
            .map(|(id, (&(u, v), &w))| (u, v, w, id as EdgeId))
    }

    /// Largest edge weight, or `0` for edgeless graphs.
    pub fn max_weight(&self) -> Weight {
        self.weights.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn build_and_query() {
        let g = Graph::from_weighted_edges(4, [(0, 1, 2), (1, 2, 3), (2, 3, 1), (0, 3, 5)]).unwrap();
        assert_eq!(g.number_of_nodes(), 4);
        assert_eq!(g.number_of_edges(), 4);
        assert_eq!(g.edge(1), (1, 2));
        assert_eq!(g.weight_of(3), 5);
        assert_eq!(g.max_weight(), 5);
        assert_eq!(g.neighbors_of(0).collect_vec(), vec![(1, 0), (3, 3)]);
        assert_eq!(g.degree_of(2), 2);
    }

    #[test]
    fn rejects_self_loops() {
        let mut g = Graph::new(2);
        assert_eq!(g.add_edge(1, 1), Err(MatchingError::SelfLoop(1)));
        assert!(g.add_edge(0, 1).is_ok());
    }

    #[test]
    fn parallel_edges_get_distinct_ids() {
        let g = Graph::from_weighted_edges(2, [(0, 1, 1), (0, 1, 7)]).unwrap();
        assert_eq!(g.number_of_edges(), 2);
        assert_eq!(g.neighbors_of(0).collect_vec(), vec![(1, 0), (1, 1)]);
        assert_eq!(g.weight_of(1), 7);
    }
}
