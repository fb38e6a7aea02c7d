/*!
# Micali–Vazirani Cardinality Matching

Maximum-cardinality matching in general graphs in phases. Each phase runs a
level-synchronised BFS over alternating paths:

- outer (even-level) vertices scan their unmatched edges, inner (odd-level)
  vertices their matched edge; an edge whose second endpoint already carries
  a level of the right parity is a **bridge**, everything else propagates
  levels and predecessor links.
- a bridge of tenacity `2i+1` is inspected after level `i`: either two
  vertex-disjoint descents from its endpoints reach two distinct exposed
  vertices (an augmenting path), or all descents funnel through one
  bottleneck vertex, which becomes the base of a new **bloom**.
- bloom members receive their missing level (`tenacity - min_level`), rejoin
  the BFS at that level, and are short-circuited to the bloom base through a
  union–find over bases, so later descents jump blooms in one step.
- augmenting erases the used vertices; erasure cascades to vertices that
  lost their last live predecessor.

The disjoint-or-bottleneck decision (the double depth-first search of the
original formulation) is resolved exactly here: the reachable descent DAG of
a bridge is small, and two units of vertex-capacitated flow either yield the
two disjoint paths or pin the bottleneck as the first saturated cut vertex.
Path opening through nested blooms then walks predecessors inside the bloom
colors recorded at creation.

A phase augments along a maximal set of disjoint shortest paths; the run
ends with the phase that finds none.
*/

use fxhash::FxHashMap;
use log::{debug, trace};
use smallvec::SmallVec;

use crate::graph::*;
use crate::matching::Matching;
use crate::utils::UnionFind;

const INF_LEVEL: u32 = u32::MAX;

/// Shortest-path predecessors of a vertex; rarely more than a handful.
type PredList = SmallVec<[(Node, EdgeId); 4]>;

const NO_COLOR: u8 = 0;
const GREEN: u8 = 1;
const RED: u8 = 2;

/// A contracted subgraph discovered by a failed disjoint-descent search.
/// The peaks are the bridge endpoints, the roots their base-stars at
/// creation time.
#[derive(Clone, Debug)]
struct Bloom {
    base: Node,
    green_peak: Node,
    green_root: Node,
    red_peak: Node,
    red_root: Node,
}

/// Micali–Vazirani `O(m·√n)` maximum-cardinality matching.
///
/// Edge weights are ignored.
///
/// # Examples
/// ```
/// use blossoms::prelude::*;
///
/// let graph = Graph::from_edges(5, [(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]).unwrap();
/// let mut matcher = MicaliVaziraniMatching::new(&graph);
/// matcher.run();
/// assert_eq!(matcher.matching().cardinality(), 2);
/// ```
pub struct MicaliVaziraniMatching<'a> {
    graph: &'a Graph,
    verify: bool,

    mate: Vec<Node>,
    mate_edge: Vec<EdgeId>,

    // per-phase vertex state
    even_level: Vec<u32>,
    odd_level: Vec<u32>,
    predecessors: Vec<PredList>,
    successors: Vec<Vec<Node>>,
    pred_count: Vec<u32>,
    bloom: Vec<Option<u32>>,
    color: Vec<u8>,
    erased: Vec<bool>,

    // per-phase edge state
    edge_seen: Vec<bool>,

    candidates: Vec<Vec<Node>>,
    bridges: Vec<Vec<EdgeId>>,
    blooms: Vec<Bloom>,
    bloom_bases: UnionFind,
    augmented: bool,

    // DFS scratch marks, valid while stamp equals the current epoch
    stamp: Vec<u32>,
    epoch: u32,

    result: Option<Matching>,
}

impl<'a> MicaliVaziraniMatching<'a> {
    /// Sets up the engine; weights of `graph` are ignored.
    pub fn new(graph: &'a Graph) -> Self {
        let n = graph.number_of_nodes() as usize;
        let m = graph.number_of_edges() as usize;
        Self {
            graph,
            verify: false,
            mate: vec![NO_NODE; n],
            mate_edge: vec![NO_EDGE; n],
            even_level: vec![INF_LEVEL; n],
            odd_level: vec![INF_LEVEL; n],
            predecessors: vec![PredList::new(); n],
            successors: vec![Vec::new(); n],
            pred_count: vec![0; n],
            bloom: vec![None; n],
            color: vec![NO_COLOR; n],
            erased: vec![false; n],
            edge_seen: vec![false; m],
            candidates: vec![Vec::new(); n + 2],
            bridges: vec![Vec::new(); n + 2],
            blooms: Vec::new(),
            bloom_bases: UnionFind::new(n as NumNodes),
            augmented: false,
            stamp: vec![0; n],
            epoch: 0,
            result: None,
        }
    }

    /// Enables per-phase sanity checks; they panic on violation and are
    /// meant for tests and debugging.
    pub fn verify_invariants(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Executes the algorithm to completion.
    pub fn run(&mut self) {
        if self.result.is_some() {
            return;
        }

        self.greedy_init();

        let mut phase = 0usize;
        loop {
            debug!("phase {phase}: {} nodes matched", self.matched_count());
            if !self.search() {
                break;
            }
            if self.verify {
                self.check_consistency();
            }
            phase += 1;
        }

        let mut matching = Matching::empty(self.graph.number_of_nodes());
        for v in self.graph.vertices() {
            let w = self.mate[v as usize];
            if w != NO_NODE && v < w {
                matching.match_pair(v, w, self.mate_edge[v as usize]);
            }
        }
        debug_assert!(matching.is_valid(self.graph));
        self.result = Some(matching);
    }

    /// The computed matching.
    ///
    /// # Panics
    /// Panics if [`run`](Self::run) has not been called.
    pub fn matching(&self) -> &Matching {
        self.result.as_ref().expect("run() has not been called")
    }

    fn matched_count(&self) -> usize {
        self.mate.iter().filter(|&&m| m != NO_NODE).count()
    }

    /// Starting matching: greedily pick the first free neighbor of every
    /// node. Only phase counts are affected, never the result.
    fn greedy_init(&mut self) {
        let graph = self.graph;
        for v in graph.vertices() {
            if self.mate[v as usize] != NO_NODE {
                continue;
            }
            for (w, id) in graph.neighbors_of(v) {
                if self.mate[w as usize] == NO_NODE {
                    self.mate[v as usize] = w;
                    self.mate[w as usize] = v;
                    self.mate_edge[v as usize] = id;
                    self.mate_edge[w as usize] = id;
                    break;
                }
            }
        }
    }

    #[inline(always)]
    fn exposed(&self, v: Node) -> bool {
        self.mate[v as usize] == NO_NODE
    }

    /// Outer vertices carry an even minimum level.
    #[inline(always)]
    fn outer(&self, v: Node) -> bool {
        self.even_level[v as usize] <= self.odd_level[v as usize]
    }

    /// Base of the outermost bloom containing `v` (or `v` itself).
    #[inline(always)]
    fn base_star(&mut self, v: Node) -> Node {
        self.bloom_bases.find(v)
    }

    fn reset_phase(&mut self) {
        self.even_level.fill(INF_LEVEL);
        self.odd_level.fill(INF_LEVEL);
        for preds in &mut self.predecessors {
            preds.clear();
        }
        for succs in &mut self.successors {
            succs.clear();
        }
        self.pred_count.fill(0);
        self.bloom.fill(None);
        self.color.fill(NO_COLOR);
        self.erased.fill(false);
        self.edge_seen.fill(false);
        for level in &mut self.candidates {
            level.clear();
        }
        for level in &mut self.bridges {
            level.clear();
        }
        self.blooms.clear();
        self.bloom_bases.reset();
        self.augmented = false;
    }

    fn set_even_level(&mut self, v: Node, level: u32) {
        debug_assert!(level % 2 == 0);
        self.even_level[v as usize] = level;
        if (level as usize) < self.candidates.len() {
            self.candidates[level as usize].push(v);
        }
    }

    fn set_odd_level(&mut self, v: Node, level: u32) {
        debug_assert!(level % 2 == 1);
        self.odd_level[v as usize] = level;
        if (level as usize) < self.candidates.len() {
            self.candidates[level as usize].push(v);
        }
    }

    /// One phase: BFS by level, bridges after each level, ends after the
    /// first level that augments. Returns *true* iff the matching grew.
    ///
    /// Bloom formation can hand members a level at or below the one being
    /// processed; such buckets are revisited instead of being lost, so the
    /// loop advances only once everything up to the current level is done.
    fn search(&mut self) -> bool {
        self.reset_phase();

        for v in self.graph.vertices() {
            if self.exposed(v) {
                self.set_even_level(v, 0);
            }
        }

        let n = self.graph.number_of_nodes() as usize;
        let mut i = 0;
        while i <= n {
            let level_nodes = std::mem::take(&mut self.candidates[i]);
            for &v in &level_nodes {
                if self.erased[v as usize] {
                    continue;
                }
                if i % 2 == 0 && self.even_level[v as usize] == i as u32 {
                    self.scan_unmatched_edges(v);
                }
                if i % 2 == 1 && self.odd_level[v as usize] == i as u32 {
                    self.scan_matched_edge(v);
                }
            }

            let level_bridges = std::mem::take(&mut self.bridges[i]);
            for id in level_bridges {
                self.bloss_aug(id);
            }
            if self.augmented {
                trace!("phase closed at level {i}");
                return true;
            }

            match (0..=i).find(|&j| !self.candidates[j].is_empty() || !self.bridges[j].is_empty())
            {
                Some(j) => i = j,
                None => i += 1,
            }
        }
        false
    }

    /// Outer `v` propagates odd levels over its unmatched edges; a second
    /// even level on the far side makes the edge a bridge.
    fn scan_unmatched_edges(&mut self, v: Node) {
        let graph = self.graph;
        let level = self.even_level[v as usize];
        for (w, id) in graph.neighbors_of(v) {
            if self.edge_seen[id as usize]
                || self.erased[w as usize]
                || self.mate_edge[v as usize] == id
            {
                continue;
            }
            if self.even_level[w as usize] != INF_LEVEL {
                self.edge_seen[id as usize] = true;
                let tenacity = level + self.even_level[w as usize] + 1;
                self.push_bridge(id, tenacity);
            } else if self.odd_level[w as usize] == INF_LEVEL {
                self.edge_seen[id as usize] = true;
                self.set_odd_level(w, level + 1);
                self.predecessors[w as usize].push((v, id));
                self.pred_count[w as usize] += 1;
                self.successors[v as usize].push(w);
            } else if self.odd_level[w as usize] == level + 1 {
                // another shortest predecessor of w
                self.edge_seen[id as usize] = true;
                self.predecessors[w as usize].push((v, id));
                self.pred_count[w as usize] += 1;
                self.successors[v as usize].push(w);
            }
            // odd_level[w] < level + 1: the edge plays no role at this level;
            // it resurfaces if w ever receives an even level
        }
    }

    /// Inner `v` propagates an even level over its matched edge; a second
    /// odd level on the far side makes the edge a bridge.
    fn scan_matched_edge(&mut self, v: Node) {
        let w = self.mate[v as usize];
        debug_assert_ne!(w, NO_NODE, "inner vertices are matched");
        let id = self.mate_edge[v as usize];
        if self.edge_seen[id as usize] || self.erased[w as usize] {
            return;
        }
        let level = self.odd_level[v as usize];

        self.edge_seen[id as usize] = true;
        if self.odd_level[w as usize] != INF_LEVEL {
            let tenacity = level + self.odd_level[w as usize] + 1;
            self.push_bridge(id, tenacity);
        } else {
            self.set_even_level(w, level + 1);
            self.predecessors[w as usize].push((v, id));
            self.pred_count[w as usize] += 1;
            self.successors[v as usize].push(w);
        }
    }

    /// Buckets a bridge for processing after the level of its tenacity.
    /// Tenacities beyond any possible augmenting path are discarded.
    fn push_bridge(&mut self, id: EdgeId, tenacity: u32) {
        let bucket = ((tenacity - 1) / 2) as usize;
        if bucket < self.bridges.len() {
            trace!("bridge {id} of tenacity {tenacity} at bucket {bucket}");
            self.bridges[bucket].push(id);
        }
    }
}

/// The descent DAG reachable from the two endpoints of a bridge: vertices
/// are current base-star representatives, edges follow predecessors with
/// bloom jumps. Acyclic because minimum levels strictly decrease.
struct DescDag {
    verts: Vec<Node>,
    index: FxHashMap<Node, u32>,
    adj: Vec<Vec<u32>>,
}

/// Tiny unit-capacity max-flow network used to decide the double-DFS
/// outcome exactly: vertex-split nodes, reverse edges at `index ^ 1`.
struct FlowNet {
    // (target, residual capacity)
    edges: Vec<(u32, i32)>,
    adj: Vec<Vec<u32>>,
}

impl FlowNet {
    fn new(nodes: usize) -> Self {
        Self {
            edges: Vec::new(),
            adj: vec![Vec::new(); nodes],
        }
    }

    fn add_edge(&mut self, from: u32, to: u32, cap: i32) {
        let idx = self.edges.len() as u32;
        self.edges.push((to, cap));
        self.edges.push((from, 0));
        self.adj[from as usize].push(idx);
        self.adj[to as usize].push(idx + 1);
    }

    /// Sends one unit from `s` to `t` if possible (DFS on the residual).
    fn augment(&mut self, s: u32, t: u32) -> bool {
        let mut visited = vec![false; self.adj.len()];
        let mut stack: Vec<(u32, usize)> = vec![(s, 0)];
        let mut path: Vec<u32> = Vec::new(); // edge indices
        visited[s as usize] = true;

        while let Some((v, cursor)) = stack.last().copied() {
            if v == t {
                for &e in &path {
                    self.edges[e as usize].1 -= 1;
                    self.edges[(e ^ 1) as usize].1 += 1;
                }
                return true;
            }
            if cursor < self.adj[v as usize].len() {
                stack.last_mut().unwrap().1 += 1;
                let e = self.adj[v as usize][cursor];
                let (to, cap) = self.edges[e as usize];
                if cap > 0 && !visited[to as usize] {
                    visited[to as usize] = true;
                    path.push(e);
                    stack.push((to, 0));
                }
            } else {
                stack.pop();
                path.pop();
            }
        }
        false
    }

    /// Residual reachability from `s`.
    fn reachable(&self, s: u32) -> Vec<bool> {
        let mut seen = vec![false; self.adj.len()];
        let mut stack = vec![s];
        seen[s as usize] = true;
        while let Some(v) = stack.pop() {
            for &e in &self.adj[v as usize] {
                let (to, cap) = self.edges[e as usize];
                if cap > 0 && !seen[to as usize] {
                    seen[to as usize] = true;
                    stack.push(to);
                }
            }
        }
        seen
    }

    /// Consumes one unit of flow starting at node `from`, returning the node
    /// sequence walked (flow decomposition; flow on a forward edge equals
    /// the residual capacity of its reverse).
    fn take_flow_path(&mut self, from: u32, sink: u32) -> Vec<u32> {
        let mut path = vec![from];
        let mut v = from;
        while v != sink {
            let mut moved = false;
            for &e in &self.adj[v as usize] {
                if e % 2 == 0 && self.edges[(e ^ 1) as usize].1 > 0 {
                    let (to, _) = self.edges[e as usize];
                    self.edges[(e ^ 1) as usize].1 -= 1;
                    self.edges[e as usize].1 += 1;
                    path.push(to);
                    v = to;
                    moved = true;
                    break;
                }
            }
            assert!(moved, "flow decomposition ran dry");
        }
        path
    }
}

/// Outcome of inspecting one bridge.
enum BridgeOutcome {
    /// Two disjoint descent paths (as representative sequences) to two
    /// distinct exposed vertices.
    Augmenting { green: Vec<Node>, red: Vec<Node> },
    /// All descents pass through one bottleneck vertex.
    Bottleneck(Node),
    /// One side is dead (fully erased below); nothing to do.
    Dead,
}

impl<'a> MicaliVaziraniMatching<'a> {
    /// Inspects one bridge: augments the matching or creates a new bloom.
    fn bloss_aug(&mut self, id: EdgeId) {
        let (s, t) = self.graph.edge(id);
        if self.erased[s as usize] || self.erased[t as usize] {
            return;
        }
        let g0 = self.base_star(s);
        let r0 = self.base_star(t);
        if g0 == r0 || self.erased[g0 as usize] || self.erased[r0 as usize] {
            return;
        }

        // the true tenacity (bucket clamping may have delayed processing)
        let tenacity = if self.mate_edge[s as usize] == id {
            self.odd_level[s as usize] + self.odd_level[t as usize] + 1
        } else {
            self.even_level[s as usize] + self.even_level[t as usize] + 1
        };

        let dag = self.collect_dag(g0, r0);
        match self.disjoint_descents(&dag, g0, r0) {
            BridgeOutcome::Augmenting { green, red } => {
                trace!("bridge ({s},{t}): augmenting");
                self.augment_path(s, t, g0, r0, &green, &red);
            }
            BridgeOutcome::Bottleneck(base) => {
                trace!("bridge ({s},{t}): bloom with base {base}");
                self.form_bloom(s, t, g0, r0, base, &dag, tenacity);
            }
            BridgeOutcome::Dead => {}
        }
    }

    /// DFS over predecessors with bloom jumps, collecting the local DAG.
    fn collect_dag(&mut self, g0: Node, r0: Node) -> DescDag {
        let mut dag = DescDag {
            verts: Vec::new(),
            index: FxHashMap::default(),
            adj: Vec::new(),
        };
        for root in [g0, r0] {
            if !dag.index.contains_key(&root) {
                dag.index.insert(root, dag.verts.len() as u32);
                dag.verts.push(root);
                dag.adj.push(Vec::new());
            }
        }

        let mut head = 0usize;
        while head < dag.verts.len() {
            let u = dag.verts[head];
            let preds = self.predecessors[u as usize].clone();
            for (p, _) in preds {
                if self.erased[p as usize] {
                    continue;
                }
                let r = self.base_star(p);
                if self.erased[r as usize] {
                    continue;
                }
                let ri = *dag.index.entry(r).or_insert_with(|| {
                    dag.verts.push(r);
                    dag.adj.push(Vec::new());
                    (dag.verts.len() - 1) as u32
                });
                if !dag.adj[head].contains(&ri) {
                    dag.adj[head].push(ri);
                }
            }
            head += 1;
        }
        dag
    }

    /// Decides the double-DFS outcome on the collected DAG with two units of
    /// vertex-capacitated flow towards the exposed vertices.
    fn disjoint_descents(&mut self, dag: &DescDag, g0: Node, r0: Node) -> BridgeOutcome {
        let n = dag.verts.len() as u32;
        let (source, sink) = (2 * n, 2 * n + 1);
        let mut net = FlowNet::new(2 * n as usize + 2);

        // in(v) = 2v, out(v) = 2v + 1; vertex capacities force disjointness,
        // so the DAG edges themselves are uncapacitated
        for (i, &v) in dag.verts.iter().enumerate() {
            let i = i as u32;
            net.add_edge(2 * i, 2 * i + 1, 1);
            if self.exposed(v) && !self.erased[v as usize] {
                net.add_edge(2 * i + 1, sink, 1);
            }
        }
        for (i, targets) in dag.adj.iter().enumerate() {
            for &r in targets {
                net.add_edge(2 * i as u32 + 1, 2 * r, 2);
            }
        }
        let gi = dag.index[&g0];
        let ri = dag.index[&r0];
        net.add_edge(source, 2 * gi, 1);
        net.add_edge(source, 2 * ri, 1);

        let mut flow = 0;
        while flow < 2 && net.augment(source, sink) {
            flow += 1;
        }

        match flow {
            2 => {
                let green = self.decode_path(&mut net, dag, gi, sink);
                let red = self.decode_path(&mut net, dag, ri, sink);
                BridgeOutcome::Augmenting { green, red }
            }
            1 => {
                // the first saturated split edge on the residual frontier is
                // the bottleneck; it may also be a lone reachable exposed
                // vertex whose sink edge is the cut
                let seen = net.reachable(source);
                for (i, &v) in dag.verts.iter().enumerate() {
                    if seen[2 * i] && !seen[2 * i + 1] {
                        return BridgeOutcome::Bottleneck(v);
                    }
                }
                for (i, &v) in dag.verts.iter().enumerate() {
                    if seen[2 * i + 1] && self.exposed(v) && !self.erased[v as usize] {
                        return BridgeOutcome::Bottleneck(v);
                    }
                }
                // the cut is a source edge: one side has no live descent
                BridgeOutcome::Dead
            }
            _ => BridgeOutcome::Dead,
        }
    }

    /// Walks one unit of flow from a source-side vertex to the sink and
    /// translates it back into a representative path.
    fn decode_path(&self, net: &mut FlowNet, dag: &DescDag, start: u32, sink: u32) -> Vec<Node> {
        net.take_flow_path(2 * start, sink)
            .into_iter()
            .filter(|&x| x != sink && x % 2 == 0)
            .map(|x| dag.verts[(x / 2) as usize])
            .collect()
    }
}

impl<'a> MicaliVaziraniMatching<'a> {
    /// Creates the bloom discovered at bridge `(s, t)`: members are the
    /// representatives above the bottleneck, colored so that every member
    /// reaches its side's root, and the root the base, inside one color.
    fn form_bloom(
        &mut self,
        s: Node,
        t: Node,
        g0: Node,
        r0: Node,
        base: Node,
        dag: &DescDag,
        tenacity: u32,
    ) {
        let bid = self.blooms.len() as u32;
        let nlocal = dag.verts.len();
        let base_idx = dag.index[&base];
        let gi = dag.index[&g0];
        let ri = dag.index[&r0];

        // members: representatives reachable without passing the base
        let mut member = vec![false; nlocal];
        let mut stack = Vec::new();
        for root in [gi, ri] {
            if root != base_idx && !member[root as usize] {
                member[root as usize] = true;
                stack.push(root);
            }
        }
        while let Some(u) = stack.pop() {
            for &r in &dag.adj[u as usize] {
                if r != base_idx && !member[r as usize] {
                    member[r as usize] = true;
                    stack.push(r);
                }
            }
        }

        // two vertex-disjoint representative paths onto the base; they exist
        // because the base is the *first* cut vertex below the bridge
        let (source, sink) = (2 * nlocal as u32, 2 * nlocal as u32 + 1);
        let mut net = FlowNet::new(2 * nlocal + 2);
        for i in 0..nlocal {
            if member[i] {
                net.add_edge(2 * i as u32, 2 * i as u32 + 1, 1);
            }
        }
        net.add_edge(2 * base_idx, sink, 2);
        for (i, targets) in dag.adj.iter().enumerate() {
            if !member[i] {
                continue;
            }
            for &r in targets {
                if member[r as usize] || r == base_idx {
                    net.add_edge(2 * i as u32 + 1, 2 * r, 2);
                }
            }
        }
        net.add_edge(source, 2 * gi, 1);
        net.add_edge(source, 2 * ri, 1);

        let mut flow = 0;
        while flow < 2 && net.augment(source, sink) {
            flow += 1;
        }
        assert_eq!(flow, 2, "bottleneck is not the first cut vertex");

        let path_g = self.decode_path(&mut net, dag, gi, sink);
        let path_r = self.decode_path(&mut net, dag, ri, sink);
        debug_assert_eq!(path_g.last(), Some(&base));
        debug_assert_eq!(path_r.last(), Some(&base));

        // green claims everything it reaches while avoiding the red path;
        // the rest is red and stays connected to the red root through it
        let mut on_red_path = vec![false; nlocal];
        for v in &path_r {
            on_red_path[dag.index[v] as usize] = true;
        }
        let mut green = vec![false; nlocal];
        let mut stack = Vec::new();
        if gi != base_idx {
            green[gi as usize] = true;
            stack.push(gi);
        }
        while let Some(u) = stack.pop() {
            for &r in &dag.adj[u as usize] {
                let r = r as usize;
                if member[r] && !on_red_path[r] && !green[r] {
                    green[r] = true;
                    stack.push(r as u32);
                }
            }
        }

        for (i, &v) in dag.verts.iter().enumerate() {
            if !member[i] {
                continue;
            }
            self.bloom[v as usize] = Some(bid);
            self.color[v as usize] = if green[i] { GREEN } else { RED };
            self.bloom_bases.union_with_rep(base, v, base);

            // members gain their missing level and rejoin the search there
            if self.outer(v) {
                if self.odd_level[v as usize] == INF_LEVEL {
                    self.set_odd_level(v, tenacity - self.even_level[v as usize]);
                }
            } else if self.even_level[v as usize] == INF_LEVEL {
                self.set_even_level(v, tenacity - self.odd_level[v as usize]);
            }
        }

        self.blooms.push(Bloom {
            base,
            green_peak: s,
            green_root: g0,
            red_peak: t,
            red_root: r0,
        });
    }

    /// Augments along the two representative descents joined by the bridge
    /// `(s, t)`, opening every traversed bloom, then erases the used
    /// vertices.
    fn augment_path(
        &mut self,
        s: Node,
        t: Node,
        g0: Node,
        r0: Node,
        green: &[Node],
        red: &[Node],
    ) {
        let mut seq_g = vec![s];
        self.append_chain(s, u32::MAX, &mut seq_g);
        debug_assert_eq!(*seq_g.last().unwrap(), g0);
        debug_assert_eq!(green.first(), Some(&g0));
        for w in green.windows(2) {
            self.append_step(w[0], w[1], u32::MAX, &mut seq_g);
        }

        let mut seq_r = vec![t];
        self.append_chain(t, u32::MAX, &mut seq_r);
        debug_assert_eq!(*seq_r.last().unwrap(), r0);
        debug_assert_eq!(red.first(), Some(&r0));
        for w in red.windows(2) {
            self.append_step(w[0], w[1], u32::MAX, &mut seq_r);
        }

        seq_g.reverse();
        let mut full = seq_g;
        full.extend(seq_r);

        self.flip_path(&full);
        self.erase(full);
        self.augmented = true;
    }

    /// Representative of `p` below bloom `limit`: climbs bases of blooms
    /// with a smaller id only.
    fn rep_limited(&self, p: Node, limit: u32) -> Node {
        let mut cur = p;
        while let Some(b2) = self.bloom[cur as usize] {
            if b2 >= limit {
                break;
            }
            cur = self.blooms[b2 as usize].base;
        }
        cur
    }

    /// Appends the opened interior of `x`'s bloom chain (blooms with id
    /// below `limit`) down to its representative; excludes `x`, includes the
    /// representative. Returns the representative.
    fn append_chain(&mut self, x: Node, limit: u32, out: &mut Vec<Node>) -> Node {
        let mut cur = x;
        while let Some(b2) = self.bloom[cur as usize] {
            if b2 >= limit {
                break;
            }
            self.open_bloom_from(cur, b2, out);
            cur = self.blooms[b2 as usize].base;
        }
        cur
    }

    /// Expands the representative step `u → r` into the real path: the
    /// predecessor edge out of `u`, then the opened chain of the
    /// predecessor. Appends everything after `u`, ending at `r`.
    fn append_step(&mut self, u: Node, r: Node, limit: u32, out: &mut Vec<Node>) {
        let (p, _) = self.predecessors[u as usize]
            .iter()
            .copied()
            .find(|&(p, _)| !self.erased[p as usize] && self.rep_limited(p, limit) == r)
            .expect("representative step without a predecessor edge");
        out.push(p);
        let reached = self.append_chain(p, limit, out);
        debug_assert_eq!(reached, r);
    }

    /// Appends the alternating path from `x` to the base of bloom `bid`,
    /// excluding `x`, including the base. Outer members descend inside the
    /// bloom; inner members leave through the bridge.
    fn open_bloom_from(&mut self, x: Node, bid: u32, out: &mut Vec<Node>) {
        let bloom = self.blooms[bid as usize].clone();
        if x == bloom.base {
            return;
        }

        if self.outer(x) {
            let mut cur = x;
            while cur != bloom.base {
                // descend on a predecessor that stays inside this bloom
                let (p, _) = self.predecessors[cur as usize]
                    .iter()
                    .copied()
                    .find(|&(p, _)| {
                        if self.erased[p as usize] {
                            return false;
                        }
                        let r = self.rep_limited(p, bid);
                        r == bloom.base || self.bloom[r as usize] == Some(bid)
                    })
                    .expect("live bloom members keep a live descent");
                out.push(p);
                cur = self.append_chain(p, bid, out);
            }
            return;
        }

        let (peak, root, other_peak, other_root, my_color, other_color) =
            if self.color[x as usize] == GREEN {
                (
                    bloom.green_peak,
                    bloom.green_root,
                    bloom.red_peak,
                    bloom.red_root,
                    GREEN,
                    RED,
                )
            } else {
                (
                    bloom.red_peak,
                    bloom.red_root,
                    bloom.green_peak,
                    bloom.green_root,
                    RED,
                    GREEN,
                )
            };

        // ascending half x ⇝ peak, built as the descent peak ⇝ x and
        // reversed
        let mut down = vec![peak];
        self.append_chain(peak, bid, &mut down);
        let reps = self.rep_dfs(root, x, bid, my_color);
        for w in reps.windows(2) {
            self.append_step(w[0], w[1], bid, &mut down);
        }
        debug_assert_eq!(*down.last().unwrap(), x);
        down.pop(); // the caller's path already ends at x
        down.reverse();
        out.extend(down);

        // over the bridge and down the other side to the base
        out.push(other_peak);
        self.append_chain(other_peak, bid, out);
        let reps = self.rep_dfs(other_root, bloom.base, bid, other_color);
        for w in reps.windows(2) {
            self.append_step(w[0], w[1], bid, out);
        }
    }

    /// Path of bloom-`bid` representatives from `from` to `to` through
    /// vertices of one color (the target itself is exempt from the color
    /// restriction).
    fn rep_dfs(&mut self, from: Node, to: Node, bid: u32, color: u8) -> Vec<Node> {
        self.epoch += 1;
        let epoch = self.epoch;

        let mut stack: Vec<(Node, usize)> = vec![(from, 0)];
        self.stamp[from as usize] = epoch;

        while let Some((u, cursor)) = stack.last().copied() {
            if u == to {
                return stack.iter().map(|&(v, _)| v).collect();
            }
            if cursor < self.predecessors[u as usize].len() {
                stack.last_mut().unwrap().1 += 1;
                let (p, _) = self.predecessors[u as usize][cursor];
                if self.erased[p as usize] {
                    continue;
                }
                let r = self.rep_limited(p, bid);
                if self.stamp[r as usize] == epoch || self.erased[r as usize] {
                    continue;
                }
                let admissible = r == to
                    || (self.bloom[r as usize] == Some(bid) && self.color[r as usize] == color);
                if admissible {
                    self.stamp[r as usize] = epoch;
                    stack.push((r, 0));
                }
            } else {
                stack.pop();
            }
        }
        panic!("bloom lost the path from {from} to {to}");
    }

    /// Flips the matching along the opened augmenting path.
    fn flip_path(&mut self, path: &[Node]) {
        let graph = self.graph;
        debug_assert!(path.len() % 2 == 0, "augmenting paths have even order");
        debug_assert!(self.exposed(path[0]) && self.exposed(*path.last().unwrap()));
        #[cfg(debug_assertions)]
        {
            // simple and alternating, checked before any mate moves
            let mut seen = std::collections::HashSet::new();
            assert!(path.iter().all(|&v| seen.insert(v)), "opened path revisits a vertex");
            for (i, w) in path.windows(2).enumerate() {
                assert_eq!(
                    self.mate[w[0] as usize] == w[1],
                    i % 2 == 1,
                    "path does not alternate at ({},{})",
                    w[0],
                    w[1]
                );
            }
        }

        for (i, w) in path.windows(2).enumerate() {
            let (a, b) = (w[0], w[1]);
            if i % 2 == 0 {
                let (_, id) = graph
                    .neighbors_of(a)
                    .find(|&(x, _)| x == b)
                    .expect("opened path uses graph edges");
                self.mate[a as usize] = b;
                self.mate[b as usize] = a;
                self.mate_edge[a as usize] = id;
                self.mate_edge[b as usize] = id;
            }
        }
    }

    /// Erases the given vertices and cascades to every vertex that lost its
    /// last live predecessor.
    fn erase(&mut self, vertices: Vec<Node>) {
        let mut queue = vertices;
        while let Some(v) = queue.pop() {
            if self.erased[v as usize] {
                continue;
            }
            self.erased[v as usize] = true;
            let succs = std::mem::take(&mut self.successors[v as usize]);
            for &w in &succs {
                if !self.erased[w as usize] {
                    self.pred_count[w as usize] -= 1;
                    if self.pred_count[w as usize] == 0 {
                        queue.push(w);
                    }
                }
            }
            self.successors[v as usize] = succs;
        }
    }

    /// Post-phase sanity: the matching is symmetric and uses graph edges,
    /// and level parities are consistent. Panics on violation.
    fn check_consistency(&self) {
        for v in self.graph.vertices() {
            let mate = self.mate[v as usize];
            if mate != NO_NODE {
                assert_eq!(self.mate[mate as usize], v, "asymmetric mates at {v}");
                let (a, b) = self.graph.edge(self.mate_edge[v as usize]);
                assert!((a, b) == (v, mate) || (b, a) == (v, mate));
            }

            if self.even_level[v as usize] != INF_LEVEL {
                assert!(self.even_level[v as usize] % 2 == 0);
            }
            if self.odd_level[v as usize] != INF_LEVEL {
                assert!(self.odd_level[v as usize] % 2 == 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn solve(graph: &Graph) -> Matching {
        let mut matcher = MicaliVaziraniMatching::new(graph).verify_invariants(true);
        matcher.run();
        let matching = matcher.matching().clone();
        assert!(matching.is_valid(graph));
        matching
    }

    #[test]
    fn empty_graph() {
        assert_eq!(solve(&Graph::new(0)).cardinality(), 0);
    }

    #[test]
    fn single_node() {
        assert_eq!(solve(&Graph::new(1)).cardinality(), 0);
    }

    #[test]
    fn single_edge() {
        let graph = Graph::from_edges(2, [(0, 1)]).unwrap();
        let matching = solve(&graph);
        assert_eq!(matching.partner(0), Some(1));
    }

    #[test]
    fn triangle() {
        let graph = Graph::from_edges(3, [(0, 1), (1, 2), (2, 0)]).unwrap();
        assert_eq!(solve(&graph).cardinality(), 1);
    }

    #[test]
    fn odd_cycle_c5() {
        let graph = Graph::from_edges(5, [(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]).unwrap();
        assert_eq!(solve(&graph).cardinality(), 2);
    }

    #[test]
    fn bowtie() {
        let graph =
            Graph::from_edges(5, [(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 2)]).unwrap();
        assert_eq!(solve(&graph).cardinality(), 2);
    }

    #[test]
    fn path_of_six() {
        let graph = Graph::from_edges(6, [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]).unwrap();
        assert_eq!(solve(&graph).cardinality(), 3);
    }

    #[test]
    fn petersen_is_perfectly_matchable() {
        assert_eq!(solve(&testing::petersen()).cardinality(), 5);
    }

    #[test]
    fn complete_bipartite_k33() {
        let graph = Graph::from_edges(
            6,
            [0, 1, 2]
                .into_iter()
                .flat_map(|a| [3, 4, 5].map(move |b| (a, b))),
        )
        .unwrap();
        assert_eq!(solve(&graph).cardinality(), 3);
    }

    #[test]
    fn blossom_must_be_traversed() {
        // the only augmenting path runs through the odd cycle {1,2,3}
        let graph =
            Graph::from_edges(6, [(0, 1), (1, 2), (2, 3), (3, 1), (3, 4), (4, 5)]).unwrap();
        assert_eq!(
            solve(&graph).cardinality(),
            testing::brute_force_max_cardinality(&graph)
        );
    }

    #[test]
    fn nested_odd_cycles() {
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
        assert_eq!(
            solve(&graph).cardinality(),
            testing::brute_force_max_cardinality(&graph)
        );
    }

    #[test]
    fn chain_of_triangles() {
        // triangles linked by bridges; every augmentation crosses blooms
        let mut graph = Graph::new(12);
        for k in 0..4 {
            let base = 3 * k;
            graph.add_edge(base, base + 1).unwrap();
            graph.add_edge(base + 1, base + 2).unwrap();
            graph.add_edge(base + 2, base).unwrap();
            if k > 0 {
                graph.add_edge(base - 1, base).unwrap();
            }
        }
        assert_eq!(
            solve(&graph).cardinality(),
            testing::brute_force_max_cardinality(&graph)
        );
    }

    #[test]
    fn parallel_edges() {
        let graph = Graph::from_edges(3, [(0, 1), (0, 1), (1, 2)]).unwrap();
        assert_eq!(solve(&graph).cardinality(), 1);
    }

    #[test]
    fn deterministic_across_runs() {
        let rng = &mut Pcg64Mcg::seed_from_u64(11);
        for _ in 0..20 {
            let graph = testing::random_graph(rng, 10, 18, 1);
            assert_eq!(solve(&graph), solve(&graph));
        }
    }

    #[test]
    fn random_graphs_match_brute_force() {
        let rng = &mut Pcg64Mcg::seed_from_u64(0xddf5);
        for (n, m) in [(4, 6), (6, 9), (8, 14), (10, 18), (12, 22), (14, 30)] {
            for _ in 0..40 {
                let graph = testing::random_graph(rng, n, m, 1);
                let matching = solve(&graph);
                assert_eq!(
                    matching.cardinality(),
                    testing::brute_force_max_cardinality(&graph),
                    "wrong cardinality on {:?}",
                    graph.edges().collect::<Vec<_>>()
                );
            }
        }
    }

    #[test]
    fn dense_random_graphs() {
        let rng = &mut Pcg64Mcg::seed_from_u64(0xdead);
        for _ in 0..20 {
            let graph = testing::random_graph(rng, 11, 45, 1);
            let matching = solve(&graph);
            assert_eq!(
                matching.cardinality(),
                testing::brute_force_max_cardinality(&graph)
            );
        }
    }

    #[test]
    fn agrees_with_weighted_engines_on_unit_weights() {
        use crate::weighted::gabow::GabowMatching;

        let rng = &mut Pcg64Mcg::seed_from_u64(0x1234);
        for _ in 0..25 {
            let graph = testing::random_graph(rng, 12, 24, 1);
            let unit =
                Graph::from_weighted_edges(12, graph.edges().map(|(u, v, _, _)| (u, v, 1)))
                    .unwrap();

            let cardinality = solve(&unit).cardinality();
            let mut weighted = GabowMatching::new(&unit).unwrap();
            weighted.run();
            // a maximum-weight matching under unit weights is maximum
            assert_eq!(weighted.matching().total_weight(&unit), cardinality as i64);
        }
    }
}
