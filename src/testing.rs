//! Shared helpers for the test modules: exhaustive reference solvers and
//! random graph sampling. Only compiled for tests.

use rand::Rng;

use crate::graph::*;

/// Exact maximum-weight matching by branching on the lowest free vertex.
/// Exponential; keep inputs at 12 nodes or fewer.
pub fn brute_force_max_weight(graph: &Graph) -> Weight {
    fn rec(graph: &Graph, v: Node, used: &mut NodeBitSet) -> Weight {
        if v == graph.number_of_nodes() {
            return 0;
        }
        if used.get_bit(v) {
            return rec(graph, v + 1, used);
        }

        // leave v unmatched
        let mut best = rec(graph, v + 1, used);

        used.set_bit(v);
        for (w, id) in graph.neighbors_of(v) {
            if !used.get_bit(w) {
                used.set_bit(w);
                best = best.max(graph.weight_of(id) + rec(graph, v + 1, used));
                used.clear_bit(w);
            }
        }
        used.clear_bit(v);

        best
    }

    let mut used = NodeBitSet::new(graph.number_of_nodes());
    rec(graph, 0, &mut used)
}

/// Exact maximum-cardinality matching; same branching as
/// [`brute_force_max_weight`] with unit weights.
pub fn brute_force_max_cardinality(graph: &Graph) -> NumEdges {
    fn rec(graph: &Graph, v: Node, used: &mut NodeBitSet) -> NumEdges {
        if v == graph.number_of_nodes() {
            return 0;
        }
        if used.get_bit(v) {
            return rec(graph, v + 1, used);
        }

        let mut best = rec(graph, v + 1, used);

        used.set_bit(v);
        for (w, _) in graph.neighbors_of(v) {
            if !used.get_bit(w) {
                used.set_bit(w);
                best = best.max(1 + rec(graph, v + 1, used));
                used.clear_bit(w);
            }
        }
        used.clear_bit(v);

        best
    }

    let mut used = NodeBitSet::new(graph.number_of_nodes());
    rec(graph, 0, &mut used)
}

/// Samples a graph with up to `m` edges on `n` nodes and weights in
/// `0..=max_weight`. Parallel edges are possible on purpose; self-loops are
/// skipped.
pub fn random_graph<R: Rng>(rng: &mut R, n: NumNodes, m: NumEdges, max_weight: Weight) -> Graph {
    let mut graph = Graph::new(n);
    for _ in 0..m {
        let u = rng.random_range(0..n);
        let v = rng.random_range(0..n);
        if u != v {
            graph
                .add_weighted_edge(u, v, rng.random_range(0..=max_weight))
                .unwrap();
        }
    }
    graph
}

/// The Petersen graph: 3-regular, 10 nodes, girth 5, and every maximum
/// matching is perfect. A classic stress case for blossom handling.
pub fn petersen() -> Graph {
    let mut graph = Graph::new(10);
    for v in 0..5 {
        graph.add_edge(v, (v + 1) % 5).unwrap(); // outer cycle
        graph.add_edge(v, v + 5).unwrap(); // spokes
        graph.add_edge(v + 5, (v + 2) % 5 + 5).unwrap(); // inner pentagram
    }
    graph
}

/// Standard test suite every weighted engine must pass: the concrete
/// scenarios from the design discussion plus randomized comparison against
/// the exhaustive solver.
macro_rules! weighted_matching_tests {
    ($matcher:ty) => {
        mod driver {
            use crate::graph::Graph;
            use crate::testing;
            use rand::SeedableRng;
            use rand_pcg::Pcg64Mcg;

            fn solve(graph: &Graph) -> crate::matching::Matching {
                let mut matcher = <$matcher>::new(graph).unwrap().verify_invariants(true);
                matcher.run();
                let matching = matcher.matching().clone();
                assert!(matching.is_valid(graph));
                matching
            }

            #[test]
            fn empty_graph() {
                let graph = Graph::new(0);
                assert_eq!(solve(&graph).cardinality(), 0);
            }

            #[test]
            fn single_node() {
                let graph = Graph::new(1);
                assert_eq!(solve(&graph).cardinality(), 0);
            }

            #[test]
            fn single_edge() {
                let graph = Graph::from_weighted_edges(2, [(0, 1, 5)]).unwrap();
                let matching = solve(&graph);
                assert_eq!(matching.partner(0), Some(1));
                assert_eq!(matching.total_weight(&graph), 5);
            }

            #[test]
            fn triangle() {
                let graph = Graph::from_edges(3, [(0, 1), (1, 2), (2, 0)]).unwrap();
                let matching = solve(&graph);
                assert_eq!(matching.cardinality(), 1);
                assert_eq!(matching.total_weight(&graph), 1);
            }

            #[test]
            fn odd_cycle_c5() {
                let graph =
                    Graph::from_edges(5, [(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]).unwrap();
                let matching = solve(&graph);
                assert_eq!(matching.cardinality(), 2);
                assert_eq!(matching.total_weight(&graph), 2);
            }

            #[test]
            fn bowtie() {
                // two triangles sharing node 2
                let graph = Graph::from_edges(
                    5,
                    [(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 2)],
                )
                .unwrap();
                assert_eq!(solve(&graph).cardinality(), 2);
            }

            #[test]
            fn k4_with_heavy_disjoint_pair() {
                let graph = Graph::from_weighted_edges(
                    4,
                    [
                        (0, 1, 10),
                        (2, 3, 10),
                        (0, 2, 1),
                        (0, 3, 1),
                        (1, 2, 1),
                        (1, 3, 1),
                    ],
                )
                .unwrap();
                let matching = solve(&graph);
                assert_eq!(matching.total_weight(&graph), 20);
                assert_eq!(matching.partner(0), Some(1));
                assert_eq!(matching.partner(2), Some(3));
            }

            #[test]
            fn path_of_six() {
                let graph =
                    Graph::from_edges(6, [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]).unwrap();
                let matching = solve(&graph);
                assert_eq!(matching.cardinality(), 3);
            }

            #[test]
            fn petersen_is_perfectly_matchable() {
                let graph = testing::petersen();
                let matching = solve(&graph);
                assert_eq!(matching.cardinality(), 5);
            }

            #[test]
            fn blossom_with_tail() {
                // triangle forced into a blossom, then augmented through it
                let graph =
                    Graph::from_weighted_edges(4, [(0, 1, 2), (1, 2, 2), (2, 0, 2), (2, 3, 2)])
                        .unwrap();
                let matching = solve(&graph);
                assert_eq!(
                    matching.total_weight(&graph),
                    testing::brute_force_max_weight(&graph)
                );
                assert_eq!(matching.cardinality(), 2);
            }

            #[test]
            fn nested_odd_cycles() {
                // a triangle sitting on a 5-cycle sitting on a 7-cycle, all
                // sharing node 0: forces nested contraction before the final
                // augmentation through the pendant
                let graph = Graph::from_edges(
                    10,
                    [
                        (0, 1),
                        (1, 2),
                        (2, 0),
                        (2, 3),
                        (3, 4),
                        (4, 0),
                        (4, 5),
                        (5, 6),
                        (6, 0),
                        (6, 7),
                    ],
                )
                .unwrap();
                let matching = solve(&graph);
                assert_eq!(
                    matching.cardinality(),
                    testing::brute_force_max_cardinality(&graph)
                );
            }

            #[test]
            fn parallel_edges_pick_the_heavier() {
                let graph =
                    Graph::from_weighted_edges(2, [(0, 1, 2), (0, 1, 9), (1, 0, 4)]).unwrap();
                let matching = solve(&graph);
                assert_eq!(matching.total_weight(&graph), 9);
            }

            #[test]
            fn rejects_negative_weights() {
                let graph = Graph::from_weighted_edges(2, [(0, 1, -3)]).unwrap();
                assert!(matches!(
                    <$matcher>::new(&graph),
                    Err(crate::graph::MatchingError::NegativeWeight { .. })
                ));
            }

            #[test]
            fn rejects_overflowing_weights() {
                let graph =
                    Graph::from_weighted_edges(2, [(0, 1, i64::MAX / 2)]).unwrap();
                assert!(matches!(
                    <$matcher>::new(&graph),
                    Err(crate::graph::MatchingError::WeightOverflow { .. })
                ));
            }

            #[test]
            fn deterministic_across_runs() {
                let rng = &mut Pcg64Mcg::seed_from_u64(5);
                for _ in 0..20 {
                    let graph = testing::random_graph(rng, 9, 16, 8);
                    let first = solve(&graph);
                    let second = solve(&graph);
                    assert_eq!(first, second);
                }
            }

            #[test]
            fn random_graphs_match_brute_force() {
                let rng = &mut Pcg64Mcg::seed_from_u64(0xb10550);
                for (n, m) in [(4, 5), (6, 10), (8, 14), (10, 18), (11, 24)] {
                    for _ in 0..30 {
                        let graph = testing::random_graph(rng, n, m, 7);
                        let matching = solve(&graph);
                        assert_eq!(
                            matching.total_weight(&graph),
                            testing::brute_force_max_weight(&graph),
                            "wrong weight on {:?}",
                            graph.edges().collect::<Vec<_>>()
                        );
                    }
                }
            }

            #[test]
            fn unit_weights_reach_maximum_cardinality() {
                // with unit weights, maximum weight equals maximum cardinality
                let rng = &mut Pcg64Mcg::seed_from_u64(0xcafe);
                for _ in 0..30 {
                    let graph = testing::random_graph(rng, 10, 20, 1);
                    let unit = Graph::from_weighted_edges(
                        10,
                        graph.edges().map(|(u, v, _, _)| (u, v, 1)),
                    )
                    .unwrap();
                    let matching = solve(&unit);
                    assert_eq!(
                        matching.cardinality(),
                        testing::brute_force_max_cardinality(&unit)
                    );
                }
            }
        }
    };
}
pub(crate) use weighted_matching_tests;
