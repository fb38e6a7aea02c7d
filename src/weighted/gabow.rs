/*!
# Gabow Engine

Caches the linear scans of the Edmonds engine away:

- per node (while not even), the least-slack edge arriving from an even node
  (δ₂ becomes a scan over nodes instead of edges);
- per even root blossom, a table mapping every other even root to the
  least-slack connecting edge, merged upwards on contraction (δ₃ becomes a
  scan over root blossoms).

Each node is scanned once per time its blossom turns even, which amortises to
`O(n²)` per stage and `O(n³)` overall.

A cached minimum stays a minimum across dual adjustments because the slack of
every even–even (resp. even–non-even) edge moves by the same amount; caches
are rebuilt exactly where labels change.
*/

use std::collections::VecDeque;

use fxhash::FxHashMap;

use crate::blossom::{BlossomId, EdgeInfo, Label};
use crate::graph::*;
use crate::matching::Matching;
use crate::weighted::{Core, INF_WEIGHT, Matcher, Variant};

/// Per-blossom cache: for every other even root, the least-slack edge over
/// to it, plus the minimum over the whole table. Only meaningful while the
/// owning blossom is an even root.
#[derive(Clone, Debug, Default)]
pub(crate) struct GabowData {
    best_edges: FxHashMap<u32, EdgeInfo>,
    best_edge: Option<EdgeInfo>,
}

pub(crate) struct Gabow {
    u: Vec<Weight>,
    current_blossom: Vec<BlossomId>,
    edge_queue: VecDeque<EdgeInfo>,
    /// Per non-even node: least-slack edge from an even node into it.
    best_edge: Vec<Option<EdgeInfo>>,
}

impl Gabow {
    #[inline(always)]
    fn label_of(&self, core: &Core<GabowData>, v: Node) -> Label {
        core.blossoms[self.current_blossom[v as usize]].label
    }

    #[inline(always)]
    fn slack(&self, core: &Core<GabowData>, e: EdgeInfo) -> Weight {
        self.u[e.u as usize] + self.u[e.v as usize] - core.w2[e.id as usize]
    }

    /// `(slack, id)` with the smaller edge id breaking ties.
    #[inline(always)]
    fn rank(&self, core: &Core<GabowData>, e: EdgeInfo) -> (Weight, EdgeId) {
        (self.slack(core, e), e.id)
    }

    fn update_min(&self, core: &Core<GabowData>, slot: &mut Option<EdgeInfo>, e: EdgeInfo) {
        if slot.is_none_or(|cur| self.rank(core, e) < self.rank(core, cur)) {
            *slot = Some(e);
        }
    }

    /// Scans all edges leaving the nodes in `nodes` (their blossom `b` has
    /// just become even): merges even–even edges into `table`, refreshes the
    /// per-node caches of non-even endpoints, and enqueues tight edges.
    fn scan_nodes(
        &mut self,
        core: &Core<GabowData>,
        b: BlossomId,
        nodes: &[Node],
        table: &mut FxHashMap<u32, EdgeInfo>,
    ) {
        for &v in nodes {
            for (w, id) in core.graph.neighbors_of(v) {
                let c = self.current_blossom[w as usize];
                if c == b {
                    continue;
                }
                let e = EdgeInfo::new(v, w, id);
                match core.blossoms[c].label {
                    Label::Even => {
                        let slot = table.entry(c.0).or_insert(e);
                        if self.rank(core, e) < self.rank(core, *slot) {
                            *slot = e;
                        }
                        if self.slack(core, e) == 0 {
                            self.edge_queue.push_back(e);
                        }
                    }
                    Label::Odd => {
                        let mut slot = self.best_edge[w as usize].take();
                        self.update_min(core, &mut slot, e);
                        self.best_edge[w as usize] = slot;
                    }
                    Label::Free => {
                        let mut slot = self.best_edge[w as usize].take();
                        self.update_min(core, &mut slot, e);
                        self.best_edge[w as usize] = slot;
                        if self.slack(core, e) == 0 {
                            self.edge_queue.push_back(e);
                        }
                    }
                }
            }
        }
    }

    /// Rebuilds the best-edge table of `b` from scratch.
    fn calc_best_edges(&mut self, core: &mut Core<GabowData>, b: BlossomId) {
        let mut table = FxHashMap::default();
        let nodes = core.blossoms.nodes_of(b);
        self.scan_nodes(core, b, &nodes, &mut table);
        self.store_table(core, b, table);
    }

    fn store_table(&self, core: &mut Core<GabowData>, b: BlossomId, table: FxHashMap<u32, EdgeInfo>) {
        let best = table
            .values()
            .copied()
            .min_by_key(|&e| self.rank(core, e));
        core.blossoms[b].data = GabowData {
            best_edges: table,
            best_edge: best,
        };
    }

    fn reassign_nodes(&mut self, core: &Core<GabowData>, b: BlossomId, target: BlossomId) {
        core.blossoms.for_nodes(b, &mut |v| {
            self.current_blossom[v as usize] = target;
        });
    }
}

impl Variant for Gabow {
    type Data = GabowData;

    fn new(graph: &Graph) -> Self {
        let n = graph.number_of_nodes() as usize;
        Self {
            u: vec![graph.max_weight(); n],
            current_blossom: Vec::new(),
            edge_queue: VecDeque::new(),
            best_edge: vec![None; n],
        }
    }

    fn initialize(&mut self, core: &mut Core<GabowData>) {
        self.current_blossom = core.graph.vertices().map(|v| core.blossoms.trivial(v)).collect();
    }

    fn initialize_stage(&mut self, _core: &mut Core<GabowData>) {
        self.edge_queue.clear();
        self.best_edge.fill(None);
    }

    fn initialize_substage(&mut self, _core: &mut Core<GabowData>) {}

    fn has_useful_edges(&self) -> bool {
        !self.edge_queue.is_empty()
    }

    fn get_useful_edge(&mut self) -> Option<EdgeInfo> {
        self.edge_queue.pop_front()
    }

    fn label_odd(&mut self, _core: &mut Core<GabowData>, _b: BlossomId) {}

    fn label_even(&mut self, core: &mut Core<GabowData>, b: BlossomId) {
        self.calc_best_edges(core, b);
    }

    fn handle_new_blossom(&mut self, core: &mut Core<GabowData>, b: BlossomId) {
        self.reassign_nodes(core, b, b);

        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();

        // merge the tables of formerly even children, re-keyed through the
        // far endpoint (their old keys may name blossoms long dissolved)
        let mut table: FxHashMap<u32, EdgeInfo> = FxHashMap::default();
        for &child in &children {
            if core.blossoms[child].label == Label::Even {
                let child_table = std::mem::take(&mut core.blossoms[child].data.best_edges);
                core.blossoms[child].data.best_edge = None;
                for (_, e) in child_table {
                    let target = self.current_blossom[e.v as usize];
                    if target == b {
                        continue; // became internal
                    }
                    let slot = table.entry(target.0).or_insert(e);
                    if self.rank(core, e) < self.rank(core, *slot) {
                        *slot = e;
                    }
                }
            }
        }

        // formerly odd children turned even and have never been scanned
        for &child in &children {
            if core.blossoms[child].label == Label::Odd {
                let nodes = core.blossoms.nodes_of(child);
                self.scan_nodes(core, b, &nodes, &mut table);
            }
        }

        self.store_table(core, b, table);
    }

    fn handle_subblossom_shift(
        &mut self,
        _core: &mut Core<GabowData>,
        _b: BlossomId,
        _child: BlossomId,
    ) {
    }

    fn handle_odd_blossom_expansion(&mut self, core: &mut Core<GabowData>, b: BlossomId) {
        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();
        for &child in &children {
            self.reassign_nodes(core, child, child);
        }
        for child in children {
            if core.blossoms[child].label == Label::Even {
                self.calc_best_edges(core, child);
            }
        }
    }

    fn handle_even_blossom_expansion(&mut self, core: &mut Core<GabowData>, b: BlossomId) {
        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();
        for child in children {
            self.reassign_nodes(core, child, child);
        }
    }

    fn calc_delta1(&mut self, core: &Core<GabowData>) -> Weight {
        core.graph
            .vertices()
            .filter(|&v| self.label_of(core, v) == Label::Even)
            .map(|v| self.u[v as usize])
            .min()
            .unwrap_or(INF_WEIGHT)
    }

    fn calc_delta2(&mut self, core: &Core<GabowData>) -> Weight {
        core.graph
            .vertices()
            .filter(|&v| self.label_of(core, v) == Label::Free)
            .filter_map(|v| self.best_edge[v as usize])
            .map(|e| self.slack(core, e))
            .min()
            .unwrap_or(INF_WEIGHT)
    }

    fn calc_delta3(&mut self, core: &Core<GabowData>) -> Weight {
        core.blossoms
            .roots()
            .filter(|&b| core.blossoms[b].label == Label::Even)
            .filter_map(|b| core.blossoms[b].data.best_edge)
            .map(|e| {
                let slack = self.slack(core, e);
                debug_assert!(slack % 2 == 0, "odd slack between even blossoms");
                slack / 2
            })
            .min()
            .unwrap_or(INF_WEIGHT)
    }

    fn calc_delta4(&mut self, core: &Core<GabowData>) -> Weight {
        core.blossoms
            .roots()
            .filter(|&b| core.blossoms[b].label == Label::Odd && !core.blossoms[b].is_trivial())
            .map(|b| core.blossoms[b].z / 2)
            .min()
            .unwrap_or(INF_WEIGHT)
    }

    fn adjust_by_delta(&mut self, core: &mut Core<GabowData>, delta: Weight) {
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

    fn find_delta2_useful_edges(&mut self, core: &mut Core<GabowData>) {
        for v in core.graph.vertices() {
            if self.label_of(core, v) != Label::Free {
                continue;
            }
            if let Some(e) = self.best_edge[v as usize] {
                if self.slack(core, e) == 0 {
                    self.edge_queue.push_back(e);
                }
            }
        }
    }

    fn find_delta3_useful_edges(&mut self, core: &mut Core<GabowData>) {
        let tight: Vec<EdgeInfo> = core
            .blossoms
            .roots()
            .filter(|&b| core.blossoms[b].label == Label::Even)
            .filter_map(|b| core.blossoms[b].data.best_edge)
            .filter(|&e| self.slack(core, e) == 0)
            .collect();
        self.edge_queue.extend(tight);
    }

    fn get_odd_blossoms_to_expand(&mut self, core: &mut Core<GabowData>) -> Vec<BlossomId> {
        core.blossoms
            .roots()
            .filter(|&b| {
                core.blossoms[b].label == Label::Odd
                    && !core.blossoms[b].is_trivial()
                    && core.blossoms[b].z == 0
            })
            .collect()
    }

    fn get_blossom(&self, _core: &Core<GabowData>, v: Node) -> BlossomId {
        self.current_blossom[v as usize]
    }

    fn u(&self, _core: &Core<GabowData>, v: Node) -> Weight {
        self.u[v as usize]
    }

    fn blossom_dual(&self, core: &Core<GabowData>, b: BlossomId) -> Weight {
        core.blossoms[b].z
    }

    fn check_consistency(&self, core: &Core<GabowData>) {
        for v in core.graph.vertices() {
            assert_eq!(
                self.current_blossom[v as usize],
                core.blossoms.root_of(core.blossoms.trivial(v)),
                "stale blossom pointer for node {v}"
            );
        }

        // the cached δ₃ minimum must agree with a full recomputation
        let cached = core
            .blossoms
            .roots()
            .filter(|&b| core.blossoms[b].label == Label::Even)
            .filter_map(|b| core.blossoms[b].data.best_edge)
            .map(|e| self.slack(core, e))
            .min();
        let exact = core
            .graph
            .edges()
            .filter(|&(a, b, _, _)| {
                self.current_blossom[a as usize] != self.current_blossom[b as usize]
                    && self.label_of(core, a) == Label::Even
                    && self.label_of(core, b) == Label::Even
            })
            .map(|(a, b, _, id)| self.slack(core, EdgeInfo::new(a, b, id)))
            .min();
        assert_eq!(cached, exact, "best-edge caches disagree with edge scan");
    }
}

/// Gabow's `O(n³)` maximum-weight matching with per-blossom best-edge
/// caches.
///
/// # Examples
/// ```
/// use blossoms::prelude::*;
///
/// let graph = Graph::from_weighted_edges(4, [(0, 1, 3), (1, 2, 5), (2, 3, 3)]).unwrap();
/// let mut matcher = GabowMatching::new(&graph).unwrap();
/// matcher.run();
/// assert_eq!(matcher.matching().total_weight(&graph), 6);
/// ```
pub struct GabowMatching<'a> {
    inner: Matcher<'a, Gabow>,
}

impl<'a> GabowMatching<'a> {
    /// Validates the graph (non-negative integer weights within the dual
    /// range) and sets up the engine.
    pub fn new(graph: &'a Graph) -> Result<Self, MatchingError> {
        Ok(Self {
            inner: Matcher::new(graph)?,
        })
    }

    /// Enables the internal invariant checks; they panic on violation and
    /// are meant for tests and debugging.
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
    use super::*;
    use crate::testing;
    use crate::weighted::edmonds::EdmondsMatching;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    crate::testing::weighted_matching_tests!(crate::weighted::gabow::GabowMatching);

    #[test]
    fn agrees_with_edmonds_on_random_graphs() {
        let rng = &mut Pcg64Mcg::seed_from_u64(0x6ab0);
        for _ in 0..40 {
            let graph = testing::random_graph(rng, 12, 26, 9);

            let mut gabow = GabowMatching::new(&graph).unwrap().verify_invariants(true);
            gabow.run();
            let mut edmonds = EdmondsMatching::new(&graph).unwrap();
            edmonds.run();

            assert_eq!(
                gabow.matching().total_weight(&graph),
                edmonds.matching().total_weight(&graph)
            );
        }
    }
}
