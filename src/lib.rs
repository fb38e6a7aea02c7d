/*!
`blossoms` computes **maximum-weight** and **maximum-cardinality** matchings
in general (non-bipartite) undirected graphs via blossom contraction.

# Engines

| Engine | Problem | Bound | Machinery |
|--------|---------|-------|-----------|
| [`EdmondsMatching`](weighted::edmonds::EdmondsMatching) | max weight | `O(n·m)` per stage | linear scans |
| [`GabowMatching`](weighted::gabow::GabowMatching) | max weight | `O(n³)` | best-edge caches |
| [`MicaliGabowMatching`](weighted::micali_gabow::MicaliGabowMatching) | max weight | `O(n·m·log n)` | concatenable queues, two-level PQs |
| [`MicaliVaziraniMatching`](cardinality::MicaliVaziraniMatching) | max cardinality | `O(m·√n)` | level BFS, double-DFS blooms |

The three weighted engines share one primal–dual driver (see
[`weighted`]) and return matchings of identical total weight; the matchings
themselves may differ. Edge weights are non-negative integers; the engines
double them internally so that every dual adjustment stays integral, and all
reported weights are in the caller's units.

# Representation

Nodes are `u32` in `0..n`, edges carry dense `u32` ids in insertion order
(see [`graph`]). Parallel edges are handled; self-loops are rejected at
construction.

# Usage

Either through the extension trait on [`Graph`](graph::Graph):

```
use blossoms::prelude::*;

let graph = Graph::from_weighted_edges(4, [(0, 1, 10), (1, 2, 11), (2, 3, 10)]).unwrap();
let matching = graph.maximum_weight_matching().unwrap();
assert_eq!(matching.total_weight(&graph), 20);

let matching = graph.maximum_cardinality_matching();
assert_eq!(matching.cardinality(), 2);
```

or by configuring an engine directly:

```
use blossoms::prelude::*;

let graph = Graph::from_edges(5, [(0, 1), (1, 2), (2, 0), (2, 3), (3, 4)]).unwrap();
let mut matcher = GabowMatching::new(&graph).unwrap().verify_invariants(true);
matcher.run();
assert_eq!(matcher.matching().cardinality(), 2);
```

The `verify_invariants` switch turns on internal consistency checks (dual
feasibility, laminarity of the blossom forest, complementary slackness);
they panic on violation and are meant for tests and debugging. Logging goes
through the [`log`] facade at `debug`/`trace` level; behaviour is identical
with logging disabled.
*/

mod blossom;
pub mod cardinality;
pub mod graph;
pub mod matching;
pub mod queues;
#[cfg(test)]
pub(crate) mod testing;
pub mod utils;
pub mod weighted;

use graph::{Graph, MatchingError};
use matching::Matching;

/// `blossoms::prelude` exports the graph type, the matching result and all
/// four engines.
pub mod prelude {
    pub use crate::MaximumMatching;
    pub use crate::cardinality::MicaliVaziraniMatching;
    pub use crate::graph::*;
    pub use crate::matching::Matching;
    pub use crate::weighted::edmonds::EdmondsMatching;
    pub use crate::weighted::gabow::GabowMatching;
    pub use crate::weighted::micali_gabow::MicaliGabowMatching;
}

/// One-call matching algorithms on [`Graph`].
///
/// For repeated runs or invariant checking, construct the engines from
/// [`prelude`] directly.
pub trait MaximumMatching {
    /// Computes a maximum-weight matching (Galil–Micali–Gabow engine).
    ///
    /// Fails on negative weights and on weights large enough to overflow
    /// the dual range.
    fn maximum_weight_matching(&self) -> Result<Matching, MatchingError>;

    /// Computes a maximum-cardinality matching (Micali–Vazirani engine);
    /// weights are ignored.
    fn maximum_cardinality_matching(&self) -> Matching;
}

impl MaximumMatching for Graph {
    fn maximum_weight_matching(&self) -> Result<Matching, MatchingError> {
        let mut matcher = weighted::micali_gabow::MicaliGabowMatching::new(self)?;
        matcher.run();
        Ok(matcher.matching().clone())
    }

    fn maximum_cardinality_matching(&self) -> Matching {
        let mut matcher = cardinality::MicaliVaziraniMatching::new(self);
        matcher.run();
        matcher.matching().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn extension_trait_round_trip() {
        let graph = Graph::from_weighted_edges(4, [(0, 1, 3), (1, 2, 1), (2, 3, 3)]).unwrap();

        let weighted = graph.maximum_weight_matching().unwrap();
        assert_eq!(weighted.total_weight(&graph), 6);
        assert!(weighted.is_valid(&graph));

        let cardinality = graph.maximum_cardinality_matching();
        assert_eq!(cardinality.cardinality(), 2);
    }

    #[test]
    fn weight_errors_surface_through_the_trait() {
        let graph = Graph::from_weighted_edges(2, [(0, 1, -1)]).unwrap();
        assert!(matches!(
            graph.maximum_weight_matching(),
            Err(MatchingError::NegativeWeight { .. })
        ));
    }
}
