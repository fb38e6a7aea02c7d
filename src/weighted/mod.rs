/*!
# Maximum-Weight Matching

Primal–dual maximum-weight matching in general graphs by blossom
contraction. Three engines share one driver and differ only in how they
detect tight edges and which auxiliary structures they maintain:

- [`EdmondsMatching`](edmonds::EdmondsMatching): plain linear scans,
  `O(n·m)` per stage.
- [`GabowMatching`](gabow::GabowMatching): per-blossom best-edge caches,
  `O(n²)` per stage.
- [`MicaliGabowMatching`](micali_gabow::MicaliGabowMatching): concatenable
  queues and two-level priority queues, `O(m·log n)` per stage.

## Driver anatomy

A **stage** attempts one augmentation. Root blossoms with an exposed base
start even, everything else free; **substages** drain the variant's queue of
useful (tight) edges through [`consider_edge`](Matcher::consider_edge),
growing the alternating forest, contracting blossoms, and possibly
augmenting. When no useful edge remains, the duals move by
`δ = min(δ₁, δ₂, δ₃, δ₄)`:

| δ | over | effect when minimal |
|----|------|---------------------|
| δ₁ | `u_v` of even nodes | optimum reached, run ends |
| δ₂ | slack of even–free edges | a free blossom becomes reachable |
| δ₃ | slack/2 of even–even edges | a new blossom or an augmenting path |
| δ₄ | `z/2` of odd compound blossoms | an odd blossom expands |

All weights are doubled internally so every δ stays integral; reported
weights are in the caller's units.

Duals obey complementary slackness throughout: matched edges stay tight,
`z ≥ 0`, and `slack ≥ 0`; the opt-in consistency pass asserts exactly this.
*/

pub mod edmonds;
pub mod gabow;
pub mod micali_gabow;

use log::{debug, trace};
use num::Integer;

use crate::blossom::{Blossom, BlossomId, Blossoms, EdgeInfo, Label};
use crate::graph::*;
use crate::matching::Matching;

/// Sentinel for "no candidate" in δ computations; larger than any real dual
/// quantity (construction rejects weights anywhere near this).
pub(crate) const INF_WEIGHT: Weight = Weight::MAX / 4;

/// One step of a backtracking walk: the next blossom towards the tree root
/// and the edge used to reach the previous one (oriented out of `blossom`).
#[derive(Copy, Clone, Debug)]
pub(crate) struct BacktrackInfo {
    pub blossom: BlossomId,
    pub edge: EdgeInfo,
}

/// Which δ realised the minimum; ties resolve towards the earlier kind.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum DeltaKind {
    D1,
    D2,
    D3,
    D4,
}

/// State shared by all weighted engines: the matching under construction and
/// the blossom forest, with `D` the per-variant blossom payload.
pub(crate) struct Core<'a, D> {
    pub graph: &'a Graph,
    /// Doubled edge weights.
    pub w2: Vec<Weight>,
    /// Partner of each node, `NO_NODE` when exposed.
    pub matched_vertex: Vec<Node>,
    /// Edge realizing the match of each node, `NO_EDGE` when exposed.
    pub matched_edge: Vec<EdgeId>,
    pub in_matching: EdgeBitSet,
    pub blossoms: Blossoms<D>,
}

impl<'a, D> Core<'a, D> {
    fn new(graph: &'a Graph) -> Self
    where
        D: Default,
    {
        let n = graph.number_of_nodes();
        Self {
            graph,
            w2: graph.edges().map(|(_, _, w, _)| 2 * w).collect(),
            matched_vertex: vec![NO_NODE; n as usize],
            matched_edge: vec![NO_EDGE; n as usize],
            in_matching: EdgeBitSet::new(graph.number_of_edges()),
            blossoms: Blossoms::new(n, |_| D::default()),
        }
    }

    /// Returns *true* if the base of `b` is unmatched.
    #[inline(always)]
    pub fn is_exposed(&self, b: BlossomId) -> bool {
        self.matched_vertex[self.blossoms[b].base as usize] == NO_NODE
    }

    /// Records `e` as matched and updates both endpoints.
    fn match_edge(&mut self, e: EdgeInfo) {
        self.in_matching.set_bit(e.id);
        self.matched_vertex[e.u as usize] = e.v;
        self.matched_vertex[e.v as usize] = e.u;
        self.matched_edge[e.u as usize] = e.id;
        self.matched_edge[e.v as usize] = e.id;
    }

    /// Takes `id` out of the matching. The endpoints' mate entries are left
    /// to be overwritten by the edges replacing this one.
    fn unmatch_edge(&mut self, id: EdgeId) {
        self.in_matching.clear_bit(id);
    }
}

/// The capability set a weighted engine plugs into the driver; mirrors the
/// virtual interface of the classical formulation.
pub(crate) trait Variant: Sized {
    /// Per-blossom auxiliary payload.
    type Data: Default;

    fn new(graph: &Graph) -> Self;

    /// One-time setup after the core exists (dual initialisation etc.).
    fn initialize(&mut self, core: &mut Core<Self::Data>);

    /// Per-stage structure reset. Root labels are already assigned, but no
    /// even root has been scanned yet.
    fn initialize_stage(&mut self, core: &mut Core<Self::Data>);

    /// Per-substage hook (the Edmonds engine re-scans here).
    fn initialize_substage(&mut self, core: &mut Core<Self::Data>);

    fn has_useful_edges(&self) -> bool;
    fn get_useful_edge(&mut self) -> Option<EdgeInfo>;

    /// A free root blossom became odd (label and backtrack edge are set).
    fn label_odd(&mut self, core: &mut Core<Self::Data>, b: BlossomId);

    /// A root blossom became even (label and backtrack edge are set).
    fn label_even(&mut self, core: &mut Core<Self::Data>, b: BlossomId);

    /// A compound blossom was contracted from the current roots on an odd
    /// cycle; sub-blossom labels still show their pre-contraction values.
    fn handle_new_blossom(&mut self, core: &mut Core<Self::Data>, b: BlossomId);

    /// The cyclic order of `b` rotated so that `child` is its base child.
    fn handle_subblossom_shift(
        &mut self,
        core: &mut Core<Self::Data>,
        b: BlossomId,
        child: BlossomId,
    );

    /// `b` (odd, z = 0) is about to dissolve; its children carry their final
    /// labels and backtrack edges but are still linked to `b`.
    fn handle_odd_blossom_expansion(&mut self, core: &mut Core<Self::Data>, b: BlossomId);

    /// `b` is dissolved during final recovery; only membership bookkeeping
    /// needs to stay coherent.
    fn handle_even_blossom_expansion(&mut self, core: &mut Core<Self::Data>, b: BlossomId);

    fn calc_delta1(&mut self, core: &Core<Self::Data>) -> Weight;
    fn calc_delta2(&mut self, core: &Core<Self::Data>) -> Weight;
    fn calc_delta3(&mut self, core: &Core<Self::Data>) -> Weight;
    fn calc_delta4(&mut self, core: &Core<Self::Data>) -> Weight;

    fn adjust_by_delta(&mut self, core: &mut Core<Self::Data>, delta: Weight);

    fn find_delta2_useful_edges(&mut self, core: &mut Core<Self::Data>);
    fn find_delta3_useful_edges(&mut self, core: &mut Core<Self::Data>);
    fn get_odd_blossoms_to_expand(&mut self, core: &mut Core<Self::Data>) -> Vec<BlossomId>;

    /// Root blossom containing node `v`.
    fn get_blossom(&self, core: &Core<Self::Data>, v: Node) -> BlossomId;

    /// Current dual of node `v`.
    fn u(&self, core: &Core<Self::Data>, v: Node) -> Weight;

    /// Current dual of root blossom `b`.
    fn blossom_dual(&self, core: &Core<Self::Data>, b: BlossomId) -> Weight;

    /// Variant-specific structure checks (opt-in, may panic).
    fn check_consistency(&self, core: &Core<Self::Data>);
}

/// The shared driver: owns the core and one engine, and runs the
/// stage/substage loop to completion.
pub(crate) struct Matcher<'a, V: Variant> {
    core: Core<'a, V::Data>,
    variant: V,
    verify: bool,
    result: Option<Matching>,
}

impl<'a, V: Variant> Matcher<'a, V> {
    pub fn new(graph: &'a Graph) -> Result<Self, MatchingError> {
        for (_, _, w, id) in graph.edges() {
            if w < 0 {
                return Err(MatchingError::NegativeWeight { edge: id, weight: w });
            }
        }
        let max_weight = graph.max_weight();
        let nodes = graph.number_of_nodes();
        if max_weight > 0 && max_weight > Weight::MAX / (64 * (nodes as Weight + 1)) {
            return Err(MatchingError::WeightOverflow { max_weight, nodes });
        }

        Ok(Self {
            core: Core::new(graph),
            variant: V::new(graph),
            verify: false,
            result: None,
        })
    }

    pub fn set_verify(&mut self, verify: bool) {
        self.verify = verify;
    }

    pub fn matching(&self) -> &Matching {
        self.result.as_ref().expect("run() has not been called")
    }

    /// Executes the algorithm to completion.
    pub fn run(&mut self) {
        if self.result.is_some() {
            return;
        }

        self.variant.initialize(&mut self.core);

        let mut stage = 0usize;
        loop {
            debug!(
                "stage {stage}: {} nodes matched",
                self.core
                    .matched_vertex
                    .iter()
                    .filter(|&&m| m != NO_NODE)
                    .count()
            );
            let finished = self.run_stage();
            if self.verify {
                self.check_consistency(true);
            }
            if finished {
                break;
            }
            stage += 1;
        }

        // recover the matching on the original graph
        let roots: Vec<_> = self.core.blossoms.roots().collect();
        for b in roots {
            self.expand_final_blossom(b);
        }
        // the alternating forest is gone; leave every (trivial) blossom free
        let roots: Vec<_> = self.core.blossoms.roots().collect();
        for b in roots {
            self.core.blossoms[b].label = Label::Free;
            self.core.blossoms[b].backtrack_edge = None;
        }
        if self.verify {
            // labels are gone, so variant label bookkeeping no longer applies
            self.check_consistency(false);
        }

        let mut matching = Matching::empty(self.core.graph.number_of_nodes());
        for (u, v, _, id) in self.core.graph.edges() {
            if self.core.in_matching.get_bit(id) {
                matching.match_pair(u, v, id);
            }
        }
        self.result = Some(matching);
    }

    /// Runs one stage; returns *true* when the optimum is reached.
    fn run_stage(&mut self) -> bool {
        let Self { core, variant, .. } = self;

        let roots: Vec<_> = core.blossoms.roots().collect();
        let mut exposed = Vec::new();
        for b in roots {
            let is_exposed = core.is_exposed(b);
            let blossom = &mut core.blossoms[b];
            blossom.backtrack_edge = None;
            blossom.visited = false;
            blossom.label = if is_exposed {
                exposed.push(b);
                Label::Even
            } else {
                Label::Free
            };
        }
        if exposed.is_empty() {
            return true; // perfect matching, nothing to augment
        }

        variant.initialize_stage(core);
        for b in exposed {
            variant.label_even(core, b);
        }

        loop {
            if self.run_substage() {
                return false; // augmented, start the next stage
            }
            if self.adjust_dual_variables() {
                return true; // δ₁ realised the minimum
            }
        }
    }

    /// Drains useful edges; returns *true* iff an augmentation happened.
    fn run_substage(&mut self) -> bool {
        self.variant.initialize_substage(&mut self.core);
        while let Some(edge) = self.variant.get_useful_edge() {
            if self.consider_edge(edge) {
                return true;
            }
        }
        false
    }

    /// Processes one tight edge; returns *true* iff it led to augmentation.
    fn consider_edge(&mut self, edge: EdgeInfo) -> bool {
        let bu = self.variant.get_blossom(&self.core, edge.u);
        let bv = self.variant.get_blossom(&self.core, edge.v);
        if bu == bv {
            return false;
        }

        match (self.core.blossoms[bu].label, self.core.blossoms[bv].label) {
            (Label::Even, Label::Free) => {
                self.label_odd_and_mate(bv, edge);
                false
            }
            (Label::Free, Label::Even) => {
                self.label_odd_and_mate(bu, edge.reverse());
                false
            }
            (Label::Even, Label::Even) => self.backtrack(bu, bv, edge),
            _ => false,
        }
    }

    /// Labels the free blossom containing `edge.v` odd, and the root blossom
    /// of its base's mate even.
    fn label_odd_and_mate(&mut self, b: BlossomId, edge: EdgeInfo) {
        let Self { core, variant, .. } = self;
        trace!("labeling {b} odd via edge {}", edge.id);

        core.blossoms[b].label = Label::Odd;
        core.blossoms[b].backtrack_edge = Some(edge);
        variant.label_odd(core, b);

        let base = core.blossoms[b].base;
        let mate_vertex = core.matched_vertex[base as usize];
        debug_assert_ne!(mate_vertex, NO_NODE, "free blossoms are never exposed");
        let matched = EdgeInfo::new(base, mate_vertex, core.matched_edge[base as usize]);

        let mate = variant.get_blossom(core, mate_vertex);
        debug_assert_eq!(core.blossoms[mate].label, Label::Free);
        trace!("labeling {mate} even via matched edge {}", matched.id);
        core.blossoms[mate].label = Label::Even;
        core.blossoms[mate].backtrack_edge = Some(matched);
        variant.label_even(core, mate);
    }

    /// Walks both alternating trees from `bu` and `bv` towards their roots.
    /// A collision yields a new blossom (returns *false*), distinct roots an
    /// augmentation (returns *true*).
    fn backtrack(&mut self, bu: BlossomId, bv: BlossomId, edge: EdgeInfo) -> bool {
        let mut u_path: Vec<BacktrackInfo> = Vec::new();
        let mut v_path: Vec<BacktrackInfo> = Vec::new();
        let mut u_iter = Some(bu);
        let mut v_iter = Some(bv);
        self.core.blossoms[bu].visited = true;
        self.core.blossoms[bv].visited = true;

        let mut collision = None;
        while u_iter.is_some() || v_iter.is_some() {
            if let Some(lca) = self.backtrack_step(&mut u_iter, &mut u_path) {
                collision = Some(lca);
                break;
            }
            if let Some(lca) = self.backtrack_step(&mut v_iter, &mut v_path) {
                collision = Some(lca);
                break;
            }
        }

        self.core.blossoms[bu].visited = false;
        self.core.blossoms[bv].visited = false;
        for info in u_path.iter().chain(&v_path) {
            self.core.blossoms[info.blossom].visited = false;
        }

        if let Some(lca) = collision {
            self.create_new_blossom(bu, bv, edge, u_path, v_path, lca);
            false
        } else {
            self.augment_path(bu, bv, edge, &u_path, &v_path);
            true
        }
    }

    /// Advances one walk by one tree edge; reports the collision blossom if
    /// the walk steps onto an already-visited one.
    fn backtrack_step(
        &mut self,
        iter: &mut Option<BlossomId>,
        path: &mut Vec<BacktrackInfo>,
    ) -> Option<BlossomId> {
        let cur = (*iter)?;
        let Some(edge) = self.core.blossoms[cur].backtrack_edge else {
            *iter = None; // reached a tree root
            return None;
        };

        let next = self.variant.get_blossom(&self.core, edge.u);
        path.push(BacktrackInfo {
            blossom: next,
            edge,
        });
        if self.core.blossoms[next].visited {
            return Some(next);
        }
        self.core.blossoms[next].visited = true;
        *iter = Some(next);
        None
    }

    /// Contracts the odd cycle closed by `edge` into a new even blossom.
    ///
    /// The cycle is `reverse(u_path) ++ (bu, edge) ++ v_path`, rotated so
    /// that the lowest common ancestor becomes the base child.
    fn create_new_blossom(
        &mut self,
        bu: BlossomId,
        bv: BlossomId,
        edge: EdgeInfo,
        mut u_path: Vec<BacktrackInfo>,
        mut v_path: Vec<BacktrackInfo>,
        lca: BlossomId,
    ) {
        Self::cut_path_at(&mut u_path, bu, lca);
        Self::cut_path_at(&mut v_path, bv, lca);

        // (child, edge to cyclic successor); the last u_path entry is the lca
        let mut cycle: Vec<(BlossomId, EdgeInfo)> = Vec::new();
        cycle.extend(u_path.iter().rev().map(|info| (info.blossom, info.edge)));
        cycle.push((bu, edge));
        for (i, info) in v_path.iter().enumerate() {
            let child = if i == 0 { bv } else { v_path[i - 1].blossom };
            cycle.push((child, info.edge.reverse()));
        }
        debug_assert_eq!(cycle[0].0, lca);
        debug_assert!(cycle.len().is_odd());

        let base = self.core.blossoms[lca].base;
        let backtrack_edge = self.core.blossoms[lca].backtrack_edge;
        let b = self.core.blossoms.insert(Blossom {
            parent: None,
            initial_base: base,
            base,
            sub_blossoms: cycle,
            label: Label::Even,
            backtrack_edge,
            visited: false,
            z: 0,
            data: V::Data::default(),
        });
        let children: Vec<_> = self.core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();
        for child in children {
            self.core.blossoms[child].parent = Some(b);
        }

        trace!("contracted {b} with base {base}");
        self.variant.handle_new_blossom(&mut self.core, b);
    }

    /// Truncates a backtracking path at the lowest common ancestor so that
    /// its last entry enters `lca` (empty if `start == lca`).
    fn cut_path_at(path: &mut Vec<BacktrackInfo>, start: BlossomId, lca: BlossomId) {
        if start == lca {
            path.clear();
        } else {
            let pos = path
                .iter()
                .position(|info| info.blossom == lca)
                .expect("lca must lie on the path");
            path.truncate(pos + 1);
        }
    }

    /// Augments along `root..bu, edge, bv..root`: flips the tree edges on
    /// both half-paths, rebases every traversed blossom onto the node where
    /// the newly matched edge enters it, and finally matches `edge`.
    fn augment_path(
        &mut self,
        bu: BlossomId,
        bv: BlossomId,
        edge: EdgeInfo,
        u_path: &[BacktrackInfo],
        v_path: &[BacktrackInfo],
    ) {
        trace!("augmenting along edge {}", edge.id);
        self.augment_half(bu, edge.u, u_path);
        self.augment_half(bv, edge.v, v_path);
        self.core.match_edge(edge);
    }

    fn augment_half(&mut self, b0: BlossomId, enter: Node, path: &[BacktrackInfo]) {
        debug_assert!(path.len().is_even());

        for (i, info) in path.iter().enumerate() {
            // the tree edge just above an even blossom is matched, then they
            // alternate; flipping turns every other one on
            if i % 2 == 0 {
                self.core.unmatch_edge(info.edge.id);
            } else {
                // edge oriented from path[i].blossom into path[i-1].blossom
                self.swap_edges_on_even_path(info.blossom, info.edge.u);
                self.swap_edges_on_even_path(path[i - 1].blossom, info.edge.v);
                self.core.match_edge(info.edge);
            }
        }
        self.swap_edges_on_even_path(b0, enter);
    }

    /// Rewrites the matching inside `b` along the even alternating path from
    /// the current base to `x`, making `x` the new base (recursively).
    fn swap_edges_on_even_path(&mut self, b: BlossomId, x: Node) {
        if self.core.blossoms[b].is_trivial() {
            debug_assert_eq!(self.core.blossoms[b].base, x);
            return;
        }

        let entry = self.core.blossoms.child_containing(b, x);
        let k = self.core.blossoms[b].position_of(entry).unwrap();
        let len = self.core.blossoms[b].sub_blossoms.len();

        if k > 0 {
            // the even-length side of the cycle from child k to the base
            // child; every edge on it swaps its matched status
            let range = if k.is_even() { 0..k } else { k..len };
            for j in range {
                let (_, e) = self.core.blossoms[b].sub_blossoms[j];
                if j.is_even() {
                    let left = self.core.blossoms[b].sub_blossoms[j].0;
                    let right = self.core.blossoms[b].sub_blossoms[(j + 1) % len].0;
                    self.swap_edges_on_even_path(left, e.u);
                    self.swap_edges_on_even_path(right, e.v);
                    self.core.match_edge(e);
                } else {
                    self.core.unmatch_edge(e.id);
                }
            }
        }

        self.swap_edges_on_even_path(entry, x);
        self.core.blossoms.rotate_to(b, k);
        debug_assert_eq!(self.core.blossoms[b].base, x);
        if k > 0 {
            self.variant.handle_subblossom_shift(&mut self.core, b, entry);
        }
    }

    /// Applies one dual adjustment; returns *true* when δ₁ realised the
    /// minimum and the run is over.
    fn adjust_dual_variables(&mut self) -> bool {
        let Self { core, variant, .. } = self;

        let d1 = variant.calc_delta1(core);
        let d2 = variant.calc_delta2(core);
        let d3 = variant.calc_delta3(core);
        let d4 = variant.calc_delta4(core);

        // strict comparison: on ties the earlier δ wins, so δ₁ terminates
        let (mut delta, mut kind) = (d1, DeltaKind::D1);
        for (d, k) in [(d2, DeltaKind::D2), (d3, DeltaKind::D3), (d4, DeltaKind::D4)] {
            if d < delta {
                (delta, kind) = (d, k);
            }
        }
        debug_assert!((0..INF_WEIGHT).contains(&delta), "broken duals: δ = {delta}");

        trace!("dual adjustment by δ = {delta} ({kind:?})");
        variant.adjust_by_delta(core, delta);

        match kind {
            DeltaKind::D1 => return true,
            DeltaKind::D2 => variant.find_delta2_useful_edges(core),
            DeltaKind::D3 => variant.find_delta3_useful_edges(core),
            DeltaKind::D4 => {
                for b in variant.get_odd_blossoms_to_expand(core) {
                    self.expand_odd_blossom(b);
                }
            }
        }
        false
    }

    /// Dissolves an odd root blossom whose dual reached zero. The sub-path
    /// of the cycle from the backtrack entry to the base stays in the tree
    /// with alternating labels; children off that path become free roots.
    fn expand_odd_blossom(&mut self, b: BlossomId) {
        let entry_edge = self.core.blossoms[b].backtrack_edge.unwrap();
        debug_assert_eq!(self.core.blossoms[b].label, Label::Odd);
        debug_assert_eq!(self.core.blossoms[b].z, 0);
        trace!("expanding odd blossom {b}");

        let entry = self.core.blossoms.child_containing(b, entry_edge.v);
        let t = self.core.blossoms[b].position_of(entry).unwrap();
        let len = self.core.blossoms[b].sub_blossoms.len();
        let sub_blossoms = self.core.blossoms[b].sub_blossoms.clone();

        // the even-length side of the cycle from the entry child to the base
        // child carries the alternating labels
        let mut labels = vec![Label::Free; len];
        let mut backtracks = vec![None; len];
        labels[t] = Label::Odd;
        backtracks[t] = Some(entry_edge);
        let mut label = Label::Odd;
        if t.is_even() {
            // walk backwards: t, t-1, ..., 0
            for j in (0..t).rev() {
                label = Self::flip(label);
                labels[j] = label;
                // edge j connects child j to child j+1; aim it into child j
                backtracks[j] = Some(sub_blossoms[j].1.reverse());
            }
        } else {
            // walk forwards: t, t+1, ..., len-1, 0
            for j in t..len {
                label = Self::flip(label);
                let next = (j + 1) % len;
                labels[next] = label;
                backtracks[next] = Some(sub_blossoms[j].1);
            }
        }
        debug_assert_eq!(labels[0], Label::Odd, "base child must stay odd");

        for (j, &(child, _)) in sub_blossoms.iter().enumerate() {
            let blossom = &mut self.core.blossoms[child];
            blossom.label = labels[j];
            blossom.backtrack_edge = backtracks[j];
            blossom.visited = false;
        }

        self.variant.handle_odd_blossom_expansion(&mut self.core, b);

        for &(child, _) in &sub_blossoms {
            self.core.blossoms[child].parent = None;
        }
        self.core.blossoms.remove(b);
    }

    const fn flip(label: Label) -> Label {
        match label {
            Label::Odd => Label::Even,
            Label::Even => Label::Odd,
            Label::Free => Label::Free,
        }
    }

    /// Recursively dissolves `b` at the end of the run. The matching inside
    /// is already consistent; only membership bookkeeping remains.
    fn expand_final_blossom(&mut self, b: BlossomId) {
        let children: Vec<_> = self.core.blossoms[b]
            .sub_blossoms
            .iter()
            .map(|&(c, _)| c)
            .collect();
        if children.is_empty() {
            return;
        }

        self.variant.handle_even_blossom_expansion(&mut self.core, b);
        for &child in &children {
            self.core.blossoms[child].parent = None;
        }
        self.core.blossoms.remove(b);

        for child in children {
            self.expand_final_blossom(child);
        }
    }

    /// Asserts the §3 invariants of the current state: laminarity, matched
    /// edge placement, base matching, dual feasibility and complementary
    /// slackness. Panics on violation. Variant bookkeeping is tied to the
    /// stage labels and is only checked while those are live.
    fn check_consistency(&self, include_variant: bool) {
        let core = &self.core;
        let graph = core.graph;

        // every node in exactly one root blossom, structure intact
        let mut seen = NodeBitSet::new(graph.number_of_nodes());
        for b in core.blossoms.roots() {
            core.blossoms.check_structure(b);
            core.blossoms.for_nodes(b, &mut |v| {
                assert!(!seen.get_bit(v), "node {v} in two root blossoms");
                seen.set_bit(v);
            });
        }
        assert_eq!(seen.cardinality(), graph.number_of_nodes());

        // matching symmetry
        for v in graph.vertices() {
            let mate = core.matched_vertex[v as usize];
            if mate != NO_NODE {
                assert_eq!(core.matched_vertex[mate as usize], v);
                assert!(core.in_matching.get_bit(core.matched_edge[v as usize]));
            }
        }

        for b in core.blossoms.roots() {
            let blossom = &core.blossoms[b];
            assert!(blossom.z >= 0, "{b}: negative dual");
            if blossom.is_trivial() {
                assert_eq!(blossom.z, 0, "trivial blossom with dual");
            }

            // matched edges lie inside a root blossom or connect two bases
            let base = blossom.base;
            core.blossoms.for_nodes(b, &mut |v| {
                let mate = core.matched_vertex[v as usize];
                if v != base {
                    assert!(
                        mate != NO_NODE && core.blossoms.contains(b, mate),
                        "non-base node {v} of {b} not matched inside"
                    );
                } else if mate != NO_NODE {
                    let mate_root = self.variant.get_blossom(core, mate);
                    assert!(
                        !core.blossoms.contains(b, mate),
                        "base {v} of {b} matched inside"
                    );
                    assert_eq!(
                        core.blossoms[mate_root].base, mate,
                        "matched edge not between bases"
                    );
                }
            });
        }

        // dual feasibility and complementary slackness
        for (a, c, _, id) in graph.edges() {
            let mut slack =
                self.variant.u(core, a) + self.variant.u(core, c) - core.w2[id as usize];
            let mut blossom = Some(core.blossoms.trivial(a));
            while let Some(x) = blossom {
                if core.blossoms.contains(x, c) {
                    slack += if x == core.blossoms.root_of(x) {
                        self.variant.blossom_dual(core, x)
                    } else {
                        core.blossoms[x].z
                    };
                }
                blossom = core.blossoms[x].parent;
            }
            assert!(slack >= 0, "edge {id}: negative slack {slack}");
            if core.in_matching.get_bit(id) {
                assert_eq!(slack, 0, "matched edge {id} not tight");
            }
        }

        if include_variant {
            self.variant.check_consistency(core);
        }
    }
}
