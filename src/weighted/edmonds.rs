/*!
# Edmonds Engine

The plainest realisation of the weighted driver: no caches at all. Every
substage re-scans the edge set for tight useful edges, and all four δ values
are computed by linear scans over nodes, edges and root blossoms.
*/

use std::collections::VecDeque;

use crate::blossom::{BlossomId, EdgeInfo, Label};
use crate::graph::*;
use crate::matching::Matching;
use crate::weighted::{Core, INF_WEIGHT, Matcher, Variant};

/// Linear-scan engine state: node duals, a root-blossom pointer per node and
/// a FIFO of tight edges.
pub(crate) struct Edmonds {
    u: Vec<Weight>,
    current_blossom: Vec<BlossomId>,
    useful_edges: VecDeque<EdgeInfo>,
}

impl Edmonds {
    #[inline(always)]
    fn label_of(&self, core: &Core<()>, v: Node) -> Label {
        core.blossoms[self.current_blossom[v as usize]].label
    }

    #[inline(always)]
    fn slack(&self, core: &Core<()>, a: Node, b: Node, id: EdgeId) -> Weight {
        self.u[a as usize] + self.u[b as usize] - core.w2[id as usize]
    }

    /// A tight edge is useful when it can extend the forest or close an
    /// alternating cycle: even–even across blossoms, or even–free.
    fn is_useful(&self, core: &Core<()>, a: Node, b: Node, id: EdgeId) -> bool {
        if self.current_blossom[a as usize] == self.current_blossom[b as usize]
            || self.slack(core, a, b, id) != 0
        {
            return false;
        }
        matches!(
            (self.label_of(core, a), self.label_of(core, b)),
            (Label::Even, Label::Even) | (Label::Even, Label::Free) | (Label::Free, Label::Even)
        )
    }

    /// Enqueues all useful edges incident to `v`.
    fn scan_node(&mut self, core: &Core<()>, v: Node) {
        for (w, id) in core.graph.neighbors_of(v) {
            if self.is_useful(core, v, w, id) {
                self.useful_edges.push_back(EdgeInfo::new(v, w, id));
            }
        }
    }

    /// Enqueues the useful edges of every node of every child of `b` that
    /// carried the given label before contraction or expansion.
    fn scan_children_with_label(&mut self, core: &Core<()>, b: BlossomId, label: Label) {
        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .filter(|&&(c, _)| core.blossoms[c].label == label)
            .map(|&(c, _)| c)
            .collect();
        for child in children {
            for v in core.blossoms.nodes_of(child) {
                self.scan_node(core, v);
            }
        }
    }

    fn reassign_nodes(&mut self, core: &Core<()>, b: BlossomId, target: BlossomId) {
        core.blossoms.for_nodes(b, &mut |v| {
            self.current_blossom[v as usize] = target;
        });
    }
}

impl Variant for Edmonds {
    type Data = ();

    fn new(graph: &Graph) -> Self {
        Self {
            u: vec![graph.max_weight(); graph.number_of_nodes() as usize],
            current_blossom: Vec::new(),
            useful_edges: VecDeque::new(),
        }
    }

    fn initialize(&mut self, core: &mut Core<()>) {
        self.current_blossom = core.graph.vertices().map(|v| core.blossoms.trivial(v)).collect();
    }

    fn initialize_stage(&mut self, _core: &mut Core<()>) {
        self.useful_edges.clear();
    }

    fn initialize_substage(&mut self, core: &mut Core<()>) {
        self.useful_edges.clear();
        for (a, b, _, id) in core.graph.edges() {
            if self.is_useful(core, a, b, id) {
                // orient out of an even blossom for the queue
                let edge = if self.label_of(core, a) == Label::Even {
                    EdgeInfo::new(a, b, id)
                } else {
                    EdgeInfo::new(b, a, id)
                };
                self.useful_edges.push_back(edge);
            }
        }
    }

    fn has_useful_edges(&self) -> bool {
        !self.useful_edges.is_empty()
    }

    fn get_useful_edge(&mut self) -> Option<EdgeInfo> {
        self.useful_edges.pop_front()
    }

    fn label_odd(&mut self, _core: &mut Core<()>, _b: BlossomId) {}

    fn label_even(&mut self, core: &mut Core<()>, b: BlossomId) {
        for v in core.blossoms.nodes_of(b) {
            self.scan_node(core, v);
        }
    }

    fn handle_new_blossom(&mut self, core: &mut Core<()>, b: BlossomId) {
        self.reassign_nodes(core, b, b);
        // nodes of formerly odd children just turned even
        self.scan_children_with_label(core, b, Label::Odd);
    }

    fn handle_subblossom_shift(&mut self, _core: &mut Core<()>, _b: BlossomId, _child: BlossomId) {}

    fn handle_odd_blossom_expansion(&mut self, core: &mut Core<()>, b: BlossomId) {
        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();
        for child in children {
            self.reassign_nodes(core, child, child);
        }
        // children relabelled even gained scannable edges
        self.scan_children_with_label(core, b, Label::Even);
    }

    fn handle_even_blossom_expansion(&mut self, core: &mut Core<()>, b: BlossomId) {
        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();
        for child in children {
            self.reassign_nodes(core, child, child);
        }
    }

    fn calc_delta1(&mut self, core: &Core<()>) -> Weight {
        core.graph
            .vertices()
            .filter(|&v| self.label_of(core, v) == Label::Even)
            .map(|v| self.u[v as usize])
            .min()
            .unwrap_or(INF_WEIGHT)
    }

    fn calc_delta2(&mut self, core: &Core<()>) -> Weight {
        core.graph
            .edges()
            .filter(|&(a, b, _, _)| {
                matches!(
                    (self.label_of(core, a), self.label_of(core, b)),
                    (Label::Even, Label::Free) | (Label::Free, Label::Even)
                )
            })
            .map(|(a, b, _, id)| self.slack(core, a, b, id))
            .min()
            .unwrap_or(INF_WEIGHT)
    }

    fn calc_delta3(&mut self, core: &Core<()>) -> Weight {
        core.graph
            .edges()
            .filter(|&(a, b, _, _)| {
                self.current_blossom[a as usize] != self.current_blossom[b as usize]
                    && self.label_of(core, a) == Label::Even
                    && self.label_of(core, b) == Label::Even
            })
            .map(|(a, b, _, id)| {
                let slack = self.slack(core, a, b, id);
                debug_assert!(slack % 2 == 0, "odd slack between even blossoms");
                slack / 2
            })
            .min()
            .unwrap_or(INF_WEIGHT)
    }

    fn calc_delta4(&mut self, core: &Core<()>) -> Weight {
        core.blossoms
            .roots()
            .filter(|&b| core.blossoms[b].label == Label::Odd && !core.blossoms[b].is_trivial())
            .map(|b| core.blossoms[b].z / 2)
            .min()
            .unwrap_or(INF_WEIGHT)
    }

    fn adjust_by_delta(&mut self, core: &mut Core<()>, delta: Weight) {
        for v in core.graph.vertices() {
            match self.label_of(core, v) {
                Label::Even => self.u[v as usize] -= delta,
                Label::Odd => self.u[v as usize] += delta,
                Label::Free => {}
            }
        }
        let roots: Vec<BlossomId> = core.blossoms.roots().collect();
        for b in roots {
            let blossom = &mut core.blossoms[b];
            if !blossom.is_trivial() {
                match blossom.label {
                    Label::Even => blossom.z += 2 * delta,
                    Label::Odd => blossom.z -= 2 * delta,
                    Label::Free => {}
                }
            }
        }
    }

    fn find_delta2_useful_edges(&mut self, core: &mut Core<()>) {
        // the next substage re-scans everything anyway; scanning here keeps
        // the queue non-empty so the substage actually runs
        self.initialize_substage(core);
    }

    fn find_delta3_useful_edges(&mut self, core: &mut Core<()>) {
        self.initialize_substage(core);
    }

    fn get_odd_blossoms_to_expand(&mut self, core: &mut Core<()>) -> Vec<BlossomId> {
        core.blossoms
            .roots()
            .filter(|&b| {
                core.blossoms[b].label == Label::Odd
                    && !core.blossoms[b].is_trivial()
                    && core.blossoms[b].z == 0
            })
            .collect()
    }

    fn get_blossom(&self, _core: &Core<()>, v: Node) -> BlossomId {
        self.current_blossom[v as usize]
    }

    fn u(&self, _core: &Core<()>, v: Node) -> Weight {
        self.u[v as usize]
    }

    fn blossom_dual(&self, core: &Core<()>, b: BlossomId) -> Weight {
        core.blossoms[b].z
    }

    fn check_consistency(&self, core: &Core<()>) {
        for v in core.graph.vertices() {
            assert_eq!(
                self.current_blossom[v as usize],
                core.blossoms.root_of(core.blossoms.trivial(v)),
                "stale blossom pointer for node {v}"
            );
            assert!(self.u[v as usize] >= 0, "negative dual on node {v}");
        }
    }
}

/// Edmonds' primal–dual maximum-weight matching, `O(n·m)` per stage.
///
/// # Examples
/// ```
/// use blossoms::prelude::*;
///
/// let graph = Graph::from_weighted_edges(4, [(0, 1, 3), (1, 2, 5), (2, 3, 3)]).unwrap();
/// let mut matcher = EdmondsMatching::new(&graph).unwrap();
/// matcher.run();
/// assert_eq!(matcher.matching().total_weight(&graph), 6);
/// ```
pub struct EdmondsMatching<'a> {
    inner: Matcher<'a, Edmonds>,
}

impl<'a> EdmondsMatching<'a> {
    /// Validates the graph (non-negative integer weights within the dual
    /// range) and sets up the engine.
    pub fn new(graph: &'a Graph) -> Result<Self, MatchingError> {
        Ok(Self {
            inner: Matcher::new(graph)?,
        })
    }

    /// Enables the internal invariant checks (§"Driver anatomy"); they panic
    /// on violation and are meant for tests and debugging.
    pub fn verify_invariants(mut self, verify: bool) -> Self {
        self.inner.set_verify(verify);
        self
    }

    /// Executes the algorithm to completion.
    pub fn run(&mut self) {
        self.inner.run();
    }

    /// The computed matching.
    ///
    /// # Panics
    /// Panics if [`run`](Self::run) has not been called.
    pub fn matching(&self) -> &Matching {
        self.inner.matching()
    }
}

#[cfg(test)]
mod tests {
    crate::testing::weighted_matching_tests!(crate::weighted::edmonds::EdmondsMatching);
}
