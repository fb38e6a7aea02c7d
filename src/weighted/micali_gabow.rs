/*!
# Galil–Micali–Gabow Engine

Replaces every linear scan of the driver with a priority-queue lookup:

- node duals live in two offset heaps `Ueven`/`Uodd` plus a raw array for
  free nodes; one dual adjustment is an `O(1)` offset shift per heap,
- blossom duals live in `Zeven`/`Zodd` the same way (δ₁ and δ₄ are heap
  minima),
- even–even edges live in `good_edges` keyed by slack/2 (δ₃ directly), with
  lazy removal of edges that became intra-blossom,
- even–(odd/free) edges live in the two-level queue `even_edges`, grouped by
  the non-even endpoint's root blossom (δ₂ is the global minimum); labelling
  a blossom odd freezes its whole group, expansion splits it at sub-blossom
  boundaries.

Every blossom keeps its member nodes in a concatenable queue whose root is
tagged with the blossom id, so `get_blossom` is a pointer walk instead of a
maintained array: contraction concatenates the children's queues, expansion
splits them back. Queues and groups are rebuilt in blossom order at stage
initialisation, which also absorbs the base rotations of the previous
stage's augmentation.

Each node is scanned exactly once per time its blossom turns even
([`MicaliGabow::scan_edges`]); everything else is `O(log)` per event, giving
`O(m log n)` per stage.
*/

use std::collections::VecDeque;

use crate::blossom::{BlossomId, EdgeInfo, Label};
use crate::graph::*;
use crate::matching::Matching;
use crate::queues::{CqPool, CqRef, PriorityQueue1, PriorityQueue2};
use crate::weighted::{Core, INF_WEIGHT, Matcher, Variant};

/// Per-blossom payload: the concatenable queue of member nodes (valid for
/// root blossoms) and the even-edge group (valid for non-even roots within a
/// stage).
#[derive(Clone, Debug, Default)]
pub(crate) struct MgData {
    nodes: Option<u32>,
    group: Option<u32>,
}

pub(crate) struct MicaliGabow {
    edge_queue: VecDeque<EdgeInfo>,

    /// Blossom membership queues; priorities are unused.
    pool: CqPool<Weight>,
    /// Handle of each node inside its blossom's queue.
    nodes_refs: Vec<CqRef>,

    /// Node duals by label; entries migrate with their current value on
    /// every label change.
    u_even: PriorityQueue1<Weight>,
    u_odd: PriorityQueue1<Weight>,
    u_free: Vec<Weight>,

    /// Blossom duals of non-trivial even/odd roots, keyed by blossom id.
    z_even: PriorityQueue1<Weight>,
    z_odd: PriorityQueue1<Weight>,

    /// Even–even edges keyed by slack/2; lazily pruned.
    good_edges: PriorityQueue1<Weight>,

    /// Even–(odd/free) edges grouped by the non-even endpoint's blossom.
    even_edges: PriorityQueue2,
    /// Anchor of each node in its blossom's group; valid while the node's
    /// root blossom is non-even in the current stage.
    anchor_refs: Vec<CqRef>,
}

impl MicaliGabow {
    /// Current dual of `v`, wherever it is stored.
    fn u_of(&self, v: Node) -> Weight {
        self.u_even
            .priority_of(v)
            .or_else(|| self.u_odd.priority_of(v))
            .unwrap_or(self.u_free[v as usize])
    }

    fn slack(&self, core: &Core<MgData>, a: Node, b: Node, id: EdgeId) -> Weight {
        self.u_of(a) + self.u_of(b) - core.w2[id as usize]
    }

    fn blossom_of(&self, v: Node) -> BlossomId {
        BlossomId(self.pool.owner(self.pool.queue_of(self.nodes_refs[v as usize])))
    }

    /// Records an even–even edge for δ₃ (slack halves stay integral).
    fn push_good_edge(&mut self, core: &Core<MgData>, a: Node, b: Node, id: EdgeId) {
        if !self.good_edges.contains(id) {
            let slack = self.slack(core, a, b, id);
            debug_assert!(slack % 2 == 0, "odd slack between even blossoms");
            self.good_edges.insert(id, slack / 2);
        }
    }

    /// Classifies every edge leaving the freshly even blossom `b` into
    /// `good_edges` or the target group of `even_edges`.
    fn scan_edges(&mut self, core: &Core<MgData>, b: BlossomId) {
        for v in core.blossoms.nodes_of(b) {
            self.scan_node(core, b, v);
        }
    }

    fn scan_node(&mut self, core: &Core<MgData>, b: BlossomId, v: Node) {
        for (w, id) in core.graph.neighbors_of(v) {
            let c = self.blossom_of(w);
            if c == b {
                continue;
            }
            if core.blossoms[c].label == Label::Even {
                self.push_good_edge(core, v, w, id);
            } else {
                let slack = self.slack(core, v, w, id);
                self.even_edges
                    .insert_after(self.anchor_refs[w as usize], id, slack);
            }
        }
    }

    /// Moves the entries of a dissolved group into `good_edges`; both
    /// endpoints are even by now.
    fn drain_group_into_good_edges(&mut self, core: &Core<MgData>, group: u32) {
        for (id, slack) in self.even_edges.dissolve_group(group) {
            let (a, b) = core.graph.edge(id);
            if self.blossom_of(a) == self.blossom_of(b) {
                continue; // became internal, no longer a δ₃ candidate
            }
            if !self.good_edges.contains(id) {
                debug_assert_eq!(slack, self.slack(core, a, b, id));
                debug_assert!(slack % 2 == 0, "odd slack between even blossoms");
                self.good_edges.insert(id, slack / 2);
            }
        }
    }

    /// Splits the node queue (and, when present, the even-edge group) of `b`
    /// back onto its children. Queue order matches the cyclic sub-blossom
    /// order, so each child's block starts at its base node.
    fn split_structures_to_children(&mut self, core: &mut Core<MgData>, b: BlossomId) {
        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();

        let mut queue = core.blossoms[b].data.nodes.take().expect("root without queue");
        let group = core.blossoms[b].data.group.take();
        let mut remaining_group = group;

        for k in 1..children.len() {
            let boundary = core.blossoms[children[k]].base;

            let tail = self
                .pool
                .split_off_before(queue, self.nodes_refs[boundary as usize]);
            self.pool.set_owner(queue, children[k - 1].0);
            core.blossoms[children[k - 1]].data.nodes = Some(queue);
            queue = tail;

            if let Some(g) = remaining_group {
                let tail = self
                    .even_edges
                    .split_off_before(g, self.anchor_refs[boundary as usize]);
                core.blossoms[children[k - 1]].data.group = Some(g);
                remaining_group = Some(tail);
            }
        }

        let last = *children.last().unwrap();
        self.pool.set_owner(queue, last.0);
        core.blossoms[last].data.nodes = Some(queue);
        core.blossoms[last].data.group = remaining_group;
    }
}

impl Variant for MicaliGabow {
    type Data = MgData;

    fn new(graph: &Graph) -> Self {
        let n = graph.number_of_nodes();
        Self {
            edge_queue: VecDeque::new(),
            pool: CqPool::new(),
            nodes_refs: vec![0; n as usize],
            u_even: PriorityQueue1::new(n),
            u_odd: PriorityQueue1::new(n),
            u_free: vec![graph.max_weight(); n as usize],
            z_even: PriorityQueue1::new(n),
            z_odd: PriorityQueue1::new(n),
            good_edges: PriorityQueue1::new(graph.number_of_edges()),
            even_edges: PriorityQueue2::new(graph.number_of_edges()),
            anchor_refs: vec![0; n as usize],
        }
    }

    fn initialize(&mut self, core: &mut Core<MgData>) {
        for v in core.graph.vertices() {
            let q = self.pool.new_queue(v);
            self.nodes_refs[v as usize] = self.pool.push_back(q, v, 0);
            core.blossoms[core.blossoms.trivial(v)].data.nodes = Some(q);
        }
    }

    fn initialize_stage(&mut self, core: &mut Core<MgData>) {
        self.edge_queue.clear();

        // flush all duals back to their label-independent homes
        let values: Vec<Weight> = core.graph.vertices().map(|v| self.u_of(v)).collect();
        self.u_free = values;
        self.u_even.clear();
        self.u_odd.clear();

        let roots: Vec<BlossomId> = core.blossoms.roots().collect();
        for &b in &roots {
            if !core.blossoms[b].is_trivial() {
                if let Some(z) = self.z_even.remove(b.0) {
                    core.blossoms[b].z = z;
                } else if let Some(z) = self.z_odd.remove(b.0) {
                    core.blossoms[b].z = z;
                }
            }
        }
        self.z_even.clear();
        self.z_odd.clear();

        self.good_edges.clear();
        self.even_edges = PriorityQueue2::new(core.graph.number_of_edges());

        // rebuild membership queues in current blossom order (this also
        // repairs the orderings rotated by the last augmentation), and hand
        // every non-even root a fresh anchor-carrying group
        let m = core.graph.number_of_edges();
        for &b in &roots {
            let q = core.blossoms[b].data.nodes.expect("root without queue");
            self.pool.drain(q);
            let group = if core.blossoms[b].label == Label::Even {
                None
            } else {
                Some(self.even_edges.create_group(true))
            };
            core.blossoms[b].data.group = group;

            for v in core.blossoms.nodes_of(b) {
                self.nodes_refs[v as usize] = self.pool.push_back(q, v, 0);
                if let Some(g) = group {
                    self.anchor_refs[v as usize] = self.even_edges.insert_anchor(g, m + v);
                }
            }
        }
    }

    fn initialize_substage(&mut self, _core: &mut Core<MgData>) {}

    fn has_useful_edges(&self) -> bool {
        !self.edge_queue.is_empty()
    }

    fn get_useful_edge(&mut self) -> Option<EdgeInfo> {
        self.edge_queue.pop_front()
    }

    fn label_odd(&mut self, core: &mut Core<MgData>, b: BlossomId) {
        for v in core.blossoms.nodes_of(b) {
            self.u_odd.insert(v, self.u_free[v as usize]);
        }
        if let Some(g) = core.blossoms[b].data.group {
            self.even_edges.deactivate(g);
        }
        if !core.blossoms[b].is_trivial() {
            self.z_odd.insert(b.0, core.blossoms[b].z);
        }
    }

    fn label_even(&mut self, core: &mut Core<MgData>, b: BlossomId) {
        for v in core.blossoms.nodes_of(b) {
            self.u_even.insert(v, self.u_free[v as usize]);
        }
        if let Some(g) = core.blossoms[b].data.group.take() {
            self.drain_group_into_good_edges(core, g);
        }
        if !core.blossoms[b].is_trivial() {
            self.z_even.insert(b.0, core.blossoms[b].z);
        }
        self.scan_edges(core, b);
    }

    fn handle_new_blossom(&mut self, core: &mut Core<MgData>, b: BlossomId) {
        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();

        // concatenate the member queues in cyclic order
        let first = core.blossoms[children[0]].data.nodes.take().unwrap();
        for &child in &children[1..] {
            let q = core.blossoms[child].data.nodes.take().unwrap();
            self.pool.concat(first, q);
        }
        self.pool.set_owner(first, b.0);
        core.blossoms[b].data.nodes = Some(first);
        self.z_even.insert(b.0, 0);

        let mut to_scan = Vec::new();
        for &child in &children {
            let trivial = core.blossoms[child].is_trivial();
            match core.blossoms[child].label {
                Label::Even => {
                    if !trivial {
                        if let Some(z) = self.z_even.remove(child.0) {
                            core.blossoms[child].z = z;
                        }
                    }
                }
                Label::Odd => {
                    // the child's nodes just became even
                    for v in core.blossoms.nodes_of(child) {
                        let val = self.u_odd.remove(v).unwrap();
                        self.u_even.insert(v, val);
                    }
                    if !trivial {
                        if let Some(z) = self.z_odd.remove(child.0) {
                            core.blossoms[child].z = z;
                        }
                    }
                    if let Some(g) = core.blossoms[child].data.group.take() {
                        self.drain_group_into_good_edges(core, g);
                    }
                    to_scan.push(child);
                }
                Label::Free => unreachable!("free blossoms never join a contraction"),
            }
        }

        for child in to_scan {
            for v in core.blossoms.nodes_of(child) {
                self.scan_node(core, b, v);
            }
        }
    }

    fn handle_subblossom_shift(
        &mut self,
        _core: &mut Core<MgData>,
        _b: BlossomId,
        _child: BlossomId,
    ) {
        // queue orders are re-synchronised with the rotated sub-blossom
        // orders at the next stage initialisation; membership is unaffected
    }

    fn handle_odd_blossom_expansion(&mut self, core: &mut Core<MgData>, b: BlossomId) {
        self.split_structures_to_children(core, b);

        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();
        for child in children {
            let trivial = core.blossoms[child].is_trivial();
            match core.blossoms[child].label {
                Label::Odd => {
                    // still odd: duals stay put, the group stays frozen
                    if !trivial {
                        self.z_odd.insert(child.0, core.blossoms[child].z);
                    }
                }
                Label::Free => {
                    for v in core.blossoms.nodes_of(child) {
                        let val = self.u_odd.remove(v).unwrap();
                        self.u_free[v as usize] = val;
                    }
                    let g = core.blossoms[child].data.group.expect("split lost a group");
                    self.even_edges.activate(g);
                }
                Label::Even => {
                    for v in core.blossoms.nodes_of(child) {
                        let val = self.u_odd.remove(v).unwrap();
                        self.u_even.insert(v, val);
                    }
                    if let Some(g) = core.blossoms[child].data.group.take() {
                        self.drain_group_into_good_edges(core, g);
                    }
                    if !trivial {
                        self.z_even.insert(child.0, core.blossoms[child].z);
                    }
                    self.scan_edges(core, child);
                }
            }
        }
    }

    fn handle_even_blossom_expansion(&mut self, core: &mut Core<MgData>, b: BlossomId) {
        // end-of-run dissolution: only membership has to stay coherent, and
        // the queue order may still carry the last augmentation's rotations,
        // so the children get freshly built queues instead of splits
        let queue = core.blossoms[b].data.nodes.take().expect("root without queue");
        self.pool.delete_queue(queue);

        let children: Vec<BlossomId> = core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();
        for child in children {
            let q = self.pool.new_queue(child.0);
            for v in core.blossoms.nodes_of(child) {
                self.nodes_refs[v as usize] = self.pool.push_back(q, v, 0);
            }
            core.blossoms[child].data.nodes = Some(q);
        }
    }

    fn calc_delta1(&mut self, _core: &Core<MgData>) -> Weight {
        self.u_even.find_min().map_or(INF_WEIGHT, |(_, p)| p)
    }

    fn calc_delta2(&mut self, _core: &Core<MgData>) -> Weight {
        self.even_edges
            .global_min()
            .map_or(INF_WEIGHT, |(_, _, _, p)| p)
    }

    fn calc_delta3(&mut self, core: &Core<MgData>) -> Weight {
        self.clear_not_good_edges(core);
        self.good_edges.find_min().map_or(INF_WEIGHT, |(_, p)| p)
    }

    fn calc_delta4(&mut self, _core: &Core<MgData>) -> Weight {
        self.z_odd.find_min().map_or(INF_WEIGHT, |(_, p)| p / 2)
    }

    fn adjust_by_delta(&mut self, _core: &mut Core<MgData>, delta: Weight) {
        self.u_even.add_to_all(-delta);
        self.u_odd.add_to_all(delta);
        self.z_even.add_to_all(2 * delta);
        self.z_odd.add_to_all(-2 * delta);
        self.good_edges.add_to_all(-delta);
        self.even_edges.decrease_all_priorities(delta);
    }

    fn find_delta2_useful_edges(&mut self, core: &mut Core<MgData>) {
        while let Some((_, entry, id, p)) = self.even_edges.global_min() {
            if p != 0 {
                break;
            }
            self.even_edges.remove_entry(entry);
            let (a, b) = core.graph.edge(id);
            let edge = if core.blossoms[self.blossom_of(a)].label == Label::Even {
                EdgeInfo::new(a, b, id)
            } else {
                EdgeInfo::new(b, a, id)
            };
            self.edge_queue.push_back(edge);
        }
    }

    fn find_delta3_useful_edges(&mut self, core: &mut Core<MgData>) {
        self.clear_not_good_edges(core);
        while let Some((id, p)) = self.good_edges.find_min() {
            if p != 0 {
                break;
            }
            self.good_edges.remove(id);
            let (a, b) = core.graph.edge(id);
            self.edge_queue.push_back(EdgeInfo::new(a, b, id));
            self.clear_not_good_edges(core);
        }
    }

    fn get_odd_blossoms_to_expand(&mut self, _core: &mut Core<MgData>) -> Vec<BlossomId> {
        let mut out = Vec::new();
        while let Some((b, p)) = self.z_odd.find_min() {
            if p != 0 {
                break;
            }
            self.z_odd.remove(b);
            out.push(BlossomId(b));
        }
        out
    }

    fn get_blossom(&self, _core: &Core<MgData>, v: Node) -> BlossomId {
        self.blossom_of(v)
    }

    fn u(&self, _core: &Core<MgData>, v: Node) -> Weight {
        self.u_of(v)
    }

    fn blossom_dual(&self, core: &Core<MgData>, b: BlossomId) -> Weight {
        if core.blossoms[b].is_trivial() {
            return 0;
        }
        self.z_even
            .priority_of(b.0)
            .or_else(|| self.z_odd.priority_of(b.0))
            .unwrap_or(core.blossoms[b].z)
    }

    fn check_consistency(&self, core: &Core<MgData>) {
        for v in core.graph.vertices() {
            let root = core.blossoms.root_of(core.blossoms.trivial(v));
            assert_eq!(self.blossom_of(v), root, "queue membership of node {v}");

            let label = core.blossoms[root].label;
            assert_eq!(
                self.u_even.contains(v),
                label == Label::Even,
                "dual home of node {v}"
            );
            assert_eq!(
                self.u_odd.contains(v),
                label == Label::Odd,
                "dual home of node {v}"
            );
        }

        for b in core.blossoms.roots() {
            let blossom = &core.blossoms[b];
            assert!(blossom.data.nodes.is_some(), "{b}: root without queue");
            if !blossom.is_trivial() {
                assert_eq!(
                    self.z_even.contains(b.0),
                    blossom.label == Label::Even,
                    "{b}: dual home"
                );
                assert_eq!(
                    self.z_odd.contains(b.0),
                    blossom.label == Label::Odd,
                    "{b}: dual home"
                );
            }
        }
    }
}

impl MicaliGabow {
    /// Lazily removes good-edge entries whose endpoints were contracted into
    /// the same blossom since insertion.
    fn clear_not_good_edges(&mut self, core: &Core<MgData>) {
        while let Some((id, _)) = self.good_edges.find_min() {
            let (a, b) = core.graph.edge(id);
            if self.blossom_of(a) == self.blossom_of(b) {
                self.good_edges.remove(id);
            } else {
                return;
            }
        }
    }
}

/// The Galil–Micali–Gabow `O(n·m·log n)` maximum-weight matching.
///
/// # Examples
/// ```
/// use blossoms::prelude::*;
///
/// let graph = Graph::from_weighted_edges(4, [(0, 1, 3), (1, 2, 5), (2, 3, 3)]).unwrap();
/// let mut matcher = MicaliGabowMatching::new(&graph).unwrap();
/// matcher.run();
/// assert_eq!(matcher.matching().total_weight(&graph), 6);
/// ```
pub struct MicaliGabowMatching<'a> {
    inner: Matcher<'a, MicaliGabow>,
}

impl<'a> MicaliGabowMatching<'a> {
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
    use crate::weighted::gabow::GabowMatching;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    crate::testing::weighted_matching_tests!(crate::weighted::micali_gabow::MicaliGabowMatching);

    /// All three weighted engines must report the same total weight (the
    /// matchings themselves may differ).
    #[test]
    fn all_engines_agree_on_random_graphs() {
        let rng = &mut Pcg64Mcg::seed_from_u64(0x919);
        for _ in 0..40 {
            let graph = testing::random_graph(rng, 12, 26, 9);

            let mut mg = MicaliGabowMatching::new(&graph)
                .unwrap()
                .verify_invariants(true);
            mg.run();
            let mut gabow = GabowMatching::new(&graph).unwrap();
            gabow.run();
            let mut edmonds = EdmondsMatching::new(&graph).unwrap();
            edmonds.run();

            let weight = mg.matching().total_weight(&graph);
            assert_eq!(weight, gabow.matching().total_weight(&graph));
            assert_eq!(weight, edmonds.matching().total_weight(&graph));
        }
    }
}
