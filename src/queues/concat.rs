/*!
# Concatenable Queues

Ordered sequences of `(key, priority)` elements that can be **concatenated**
and **split** in `O(log n)` expected time while element handles stay valid.

All queues of one [`CqPool`] share a single node arena, the index-based
equivalent of the heap-allocated tree nodes in classical descriptions. This
is what keeps handles stable: a [`CqRef`] names an arena slot, not a position,
and survives any number of splits and concatenations until the element is
removed.

Internally each queue is a treap ordered by *position* (no search keys): the
in-order traversal is the queue order. Nodes carry parent pointers, so

- the queue owning an element is found by walking to the root
  ([`CqPool::queue_of`]), which is how blossom membership queries work, and
- a queue can be split *at an element* without knowing its position
  ([`CqPool::split_off_before`]).

Every subtree aggregates its minimum `(priority, key)`, ties towards the
smaller key.
*/

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Stable handle of an element inside a [`CqPool`].
pub type CqRef = u32;

/// Handle of one queue inside a [`CqPool`].
pub type CqHandle = u32;

const NONE: u32 = u32::MAX;

/// Treap priorities only shape the tree, never the reported minima, so a
/// fixed seed keeps runs reproducible without biasing any result.
const TREAP_SEED: u64 = 0x0b10_5503_5eed;

#[derive(Clone, Debug)]
struct CqNode<P> {
    parent: u32,
    left: u32,
    right: u32,
    rand: u64,
    key: u32,
    prio: P,
    min_key: u32,
    min_prio: P,
    /// Owning queue; only meaningful while this node is a root.
    queue: u32,
}

#[derive(Clone, Debug)]
struct QueueSlot {
    root: u32,
    owner: u32,
    live: bool,
}

/// Pool of concatenable queues sharing one node arena.
///
/// # Examples
/// ```
/// use blossoms::queues::CqPool;
///
/// let mut pool: CqPool<i64> = CqPool::new();
/// let q = pool.new_queue(7);
/// let a = pool.push_back(q, 10, 3);
/// let _b = pool.push_back(q, 11, 1);
/// let c = pool.push_back(q, 12, 2);
///
/// assert_eq!(pool.owner(q), 7);
/// assert_eq!(pool.queue_of(c), q);
/// assert_eq!(pool.find_min(q).map(|(_, k, p)| (k, p)), Some((11, 1)));
///
/// // split before the middle element: q keeps [10], the rest moves
/// let rest = pool.split_off_before(q, pool.refs_in_order(q)[1]);
/// assert_eq!(pool.keys_in_order(q), vec![10]);
/// assert_eq!(pool.keys_in_order(rest), vec![11, 12]);
/// let _ = a;
/// ```
#[derive(Clone, Debug)]
pub struct CqPool<P> {
    nodes: Vec<CqNode<P>>,
    free_nodes: Vec<u32>,
    queues: Vec<QueueSlot>,
    free_queues: Vec<u32>,
    rng: Pcg64Mcg,
}

impl<P: Copy + Ord> Default for CqPool<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Copy + Ord> CqPool<P> {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_nodes: Vec::new(),
            queues: Vec::new(),
            free_queues: Vec::new(),
            rng: Pcg64Mcg::seed_from_u64(TREAP_SEED),
        }
    }

    /// Creates a new empty queue tagged with `owner`.
    pub fn new_queue(&mut self, owner: u32) -> CqHandle {
        if let Some(q) = self.free_queues.pop() {
            self.queues[q as usize] = QueueSlot {
                root: NONE,
                owner,
                live: true,
            };
            q
        } else {
            self.queues.push(QueueSlot {
                root: NONE,
                owner,
                live: true,
            });
            (self.queues.len() - 1) as CqHandle
        }
    }

    /// Owner tag of `q`.
    #[inline(always)]
    pub fn owner(&self, q: CqHandle) -> u32 {
        debug_assert!(self.queues[q as usize].live);
        self.queues[q as usize].owner
    }

    /// Replaces the owner tag of `q`.
    #[inline(always)]
    pub fn set_owner(&mut self, q: CqHandle, owner: u32) {
        debug_assert!(self.queues[q as usize].live);
        self.queues[q as usize].owner = owner;
    }

    /// Returns *true* if `q` holds no elements.
    #[inline(always)]
    pub fn is_empty(&self, q: CqHandle) -> bool {
        self.queues[q as usize].root == NONE
    }

    /// The queue currently containing element `r` (`O(log n)` expected).
    pub fn queue_of(&self, r: CqRef) -> CqHandle {
        let mut x = r;
        while self.nodes[x as usize].parent != NONE {
            x = self.nodes[x as usize].parent;
        }
        self.nodes[x as usize].queue
    }

    /// Key stored at element `r`.
    #[inline(always)]
    pub fn key_of(&self, r: CqRef) -> u32 {
        self.nodes[r as usize].key
    }

    /// Priority stored at element `r`.
    #[inline(always)]
    pub fn priority_of(&self, r: CqRef) -> P {
        self.nodes[r as usize].prio
    }

    /// Replaces the priority of element `r` in place.
    pub fn update_priority(&mut self, r: CqRef, prio: P) {
        self.nodes[r as usize].prio = prio;
        let mut x = r;
        while x != NONE {
            self.pull(x);
            x = self.nodes[x as usize].parent;
        }
    }

    /// Appends an element to the back of `q`.
    pub fn push_back(&mut self, q: CqHandle, key: u32, prio: P) -> CqRef {
        let n = self.alloc(key, prio);
        let root = self.merge(self.queues[q as usize].root, n);
        self.attach_root(q, root);
        n
    }

    /// Inserts an element directly after `r` (in the queue containing `r`).
    pub fn insert_after(&mut self, r: CqRef, key: u32, prio: P) -> CqRef {
        let q = self.queue_of(r);
        let (l, rest) = self.split(r, false);
        let n = self.alloc(key, prio);
        let root = self.merge(l, n);
        let root = self.merge(root, rest);
        self.attach_root(q, root);
        n
    }

    /// Removes element `r` from its queue.
    pub fn remove(&mut self, r: CqRef) {
        let q = self.queue_of(r);
        let node = &self.nodes[r as usize];
        let (p, l, rc) = (node.parent, node.left, node.right);

        if l != NONE {
            self.nodes[l as usize].parent = NONE;
        }
        if rc != NONE {
            self.nodes[rc as usize].parent = NONE;
        }
        let m = self.merge(l, rc);

        if p == NONE {
            self.attach_root(q, m);
        } else {
            if self.nodes[p as usize].left == r {
                self.nodes[p as usize].left = m;
            } else {
                debug_assert_eq!(self.nodes[p as usize].right, r);
                self.nodes[p as usize].right = m;
            }
            if m != NONE {
                self.nodes[m as usize].parent = p;
            }
            let mut x = p;
            while x != NONE {
                self.pull(x);
                x = self.nodes[x as usize].parent;
            }
        }
        self.free_nodes.push(r);
    }

    /// Appends all elements of `qb` to the back of `qa` and frees `qb`.
    /// Handles into `qb` remain valid and now report `qa`.
    pub fn concat(&mut self, qa: CqHandle, qb: CqHandle) {
        debug_assert_ne!(qa, qb);
        let root = self.merge(self.queues[qa as usize].root, self.queues[qb as usize].root);
        self.attach_root(qa, root);
        self.release_queue(qb);
    }

    /// Splits the queue containing `r` before `r`: the original queue keeps
    /// everything in front of `r`, the returned queue starts at `r` and
    /// carries the same owner tag.
    pub fn split_off_before(&mut self, q: CqHandle, r: CqRef) -> CqHandle {
        debug_assert_eq!(self.queue_of(r), q);
        let (l, rest) = self.split(r, true);
        self.attach_root(q, l);
        let q2 = self.new_queue(self.queues[q as usize].owner);
        self.attach_root(q2, rest);
        q2
    }

    /// Rotates `q` so that element `r` becomes its first element.
    pub fn rotate_before(&mut self, q: CqHandle, r: CqRef) {
        debug_assert_eq!(self.queue_of(r), q);
        let (l, rest) = self.split(r, true);
        let root = self.merge(rest, l);
        self.attach_root(q, root);
    }

    /// Minimum element of `q` as `(handle, key, priority)`, ties towards the
    /// smaller key.
    pub fn find_min(&self, q: CqHandle) -> Option<(CqRef, u32, P)> {
        let root = self.queues[q as usize].root;
        if root == NONE {
            return None;
        }

        let target = (
            self.nodes[root as usize].min_prio,
            self.nodes[root as usize].min_key,
        );
        let mut x = root;
        loop {
            let node = &self.nodes[x as usize];
            if node.left != NONE {
                let l = &self.nodes[node.left as usize];
                if (l.min_prio, l.min_key) == target {
                    x = node.left;
                    continue;
                }
            }
            if (node.prio, node.key) == target {
                return Some((x, node.key, node.prio));
            }
            debug_assert_ne!(node.right, NONE);
            x = node.right;
        }
    }

    /// Removes all elements of `q` and returns them in queue order.
    pub fn drain(&mut self, q: CqHandle) -> Vec<(u32, P)> {
        let refs = self.refs_in_order(q);
        let out = refs
            .iter()
            .map(|&r| (self.nodes[r as usize].key, self.nodes[r as usize].prio))
            .collect();
        self.free_nodes.extend(refs);
        self.queues[q as usize].root = NONE;
        out
    }

    /// Removes all elements of `q` and frees the queue handle.
    pub fn delete_queue(&mut self, q: CqHandle) {
        self.drain(q);
        self.release_queue(q);
    }

    /// Element handles of `q` in queue order.
    pub fn refs_in_order(&self, q: CqHandle) -> Vec<CqRef> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        let mut x = self.queues[q as usize].root;
        while x != NONE || !stack.is_empty() {
            while x != NONE {
                stack.push(x);
                x = self.nodes[x as usize].left;
            }
            let top = stack.pop().unwrap();
            out.push(top);
            x = self.nodes[top as usize].right;
        }
        out
    }

    /// Keys of `q` in queue order.
    pub fn keys_in_order(&self, q: CqHandle) -> Vec<u32> {
        self.refs_in_order(q)
            .into_iter()
            .map(|r| self.nodes[r as usize].key)
            .collect()
    }

    fn alloc(&mut self, key: u32, prio: P) -> u32 {
        let rand = self.rng.random::<u64>();
        let node = CqNode {
            parent: NONE,
            left: NONE,
            right: NONE,
            rand,
            key,
            prio,
            min_key: key,
            min_prio: prio,
            queue: NONE,
        };
        if let Some(idx) = self.free_nodes.pop() {
            self.nodes[idx as usize] = node;
            idx
        } else {
            self.nodes.push(node);
            (self.nodes.len() - 1) as u32
        }
    }

    fn release_queue(&mut self, q: CqHandle) {
        debug_assert!(self.queues[q as usize].live);
        self.queues[q as usize].live = false;
        self.queues[q as usize].root = NONE;
        self.free_queues.push(q);
    }

    fn attach_root(&mut self, q: CqHandle, root: u32) {
        self.queues[q as usize].root = root;
        if root != NONE {
            self.nodes[root as usize].parent = NONE;
            self.nodes[root as usize].queue = q;
        }
    }

    fn pull(&mut self, x: u32) {
        let node = &self.nodes[x as usize];
        let mut min = (node.prio, node.key);
        for c in [node.left, node.right] {
            if c != NONE {
                let child = &self.nodes[c as usize];
                min = min.min((child.min_prio, child.min_key));
            }
        }
        let node = &mut self.nodes[x as usize];
        node.min_prio = min.0;
        node.min_key = min.1;
    }

    /// Merges two treaps whose elements are already ordered `a` before `b`.
    fn merge(&mut self, a: u32, b: u32) -> u32 {
        if a == NONE {
            return b;
        }
        if b == NONE {
            return a;
        }
        if self.nodes[a as usize].rand < self.nodes[b as usize].rand {
            let m = self.merge(self.nodes[a as usize].right, b);
            self.nodes[a as usize].right = m;
            self.nodes[m as usize].parent = a;
            self.pull(a);
            a
        } else {
            let m = self.merge(a, self.nodes[b as usize].left);
            self.nodes[b as usize].left = m;
            self.nodes[m as usize].parent = b;
            self.pull(b);
            b
        }
    }

    /// Splits the tree containing `r` around `r`: with `before == true`, `r`
    /// starts the right part, otherwise it ends the left part. Both returned
    /// roots are detached from any queue.
    fn split(&mut self, r: CqRef, before: bool) -> (u32, u32) {
        let mut p = self.nodes[r as usize].parent;
        self.nodes[r as usize].parent = NONE;

        let (mut l, mut rest);
        if before {
            rest = r;
            l = self.nodes[r as usize].left;
            self.nodes[r as usize].left = NONE;
            if l != NONE {
                self.nodes[l as usize].parent = NONE;
            }
        } else {
            l = r;
            rest = self.nodes[r as usize].right;
            self.nodes[r as usize].right = NONE;
            if rest != NONE {
                self.nodes[rest as usize].parent = NONE;
            }
        }
        self.pull(r);

        let mut cur = r;
        while p != NONE {
            let pp = self.nodes[p as usize].parent;
            self.nodes[p as usize].parent = NONE;

            if self.nodes[p as usize].left == cur {
                // p and its right subtree follow cur's subtree
                self.nodes[p as usize].left = NONE;
                self.pull(p);
                rest = self.merge(rest, p);
            } else {
                debug_assert_eq!(self.nodes[p as usize].right, cur);
                // p and its left subtree precede cur's subtree
                self.nodes[p as usize].right = NONE;
                self.pull(p);
                l = self.merge(p, l);
            }

            cur = p;
            p = pp;
        }

        (l, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    #[test]
    fn push_min_remove() {
        let mut pool: CqPool<i64> = CqPool::new();
        let q = pool.new_queue(0);
        assert!(pool.is_empty(q));

        let refs: Vec<_> = [(0, 5), (1, 2), (2, 9), (3, 2)]
            .into_iter()
            .map(|(k, p)| pool.push_back(q, k, p))
            .collect();

        // equal minimum priorities resolve to the smaller key
        assert_eq!(pool.find_min(q).unwrap().1, 1);
        pool.remove(refs[1]);
        assert_eq!(pool.find_min(q).unwrap().1, 3);
        assert_eq!(pool.keys_in_order(q), vec![0, 2, 3]);
    }

    #[test]
    fn concat_preserves_refs_and_order() {
        let mut pool: CqPool<i64> = CqPool::new();
        let qa = pool.new_queue(1);
        let qb = pool.new_queue(2);
        let ra = pool.push_back(qa, 10, 0);
        let rb = pool.push_back(qb, 20, 0);
        pool.push_back(qb, 21, 0);

        pool.concat(qa, qb);
        assert_eq!(pool.keys_in_order(qa), vec![10, 20, 21]);
        assert_eq!(pool.queue_of(ra), qa);
        assert_eq!(pool.queue_of(rb), qa);
        assert_eq!(pool.owner(qa), 1);
    }

    #[test]
    fn split_and_rotate() {
        let mut pool: CqPool<i64> = CqPool::new();
        let q = pool.new_queue(0);
        let refs: Vec<_> = (0..7).map(|k| pool.push_back(q, k, k as i64)).collect();

        pool.rotate_before(q, refs[3]);
        assert_eq!(pool.keys_in_order(q), vec![3, 4, 5, 6, 0, 1, 2]);

        let back = pool.split_off_before(q, refs[0]);
        assert_eq!(pool.keys_in_order(q), vec![3, 4, 5, 6]);
        assert_eq!(pool.keys_in_order(back), vec![0, 1, 2]);
        assert_eq!(pool.queue_of(refs[1]), back);
        assert_eq!(pool.find_min(q).unwrap().1, 3);
    }

    #[test]
    fn insert_after_keeps_position() {
        let mut pool: CqPool<i64> = CqPool::new();
        let q = pool.new_queue(0);
        let a = pool.push_back(q, 0, 0);
        pool.push_back(q, 2, 0);
        pool.insert_after(a, 1, 0);
        assert_eq!(pool.keys_in_order(q), vec![0, 1, 2]);
    }

    /// Randomized cross-check against a naive `Vec<Vec<_>>` model covering
    /// every public operation.
    #[test]
    fn randomized_against_naive_model() {
        let rng = &mut Pcg64Mcg::seed_from_u64(99);
        let mut pool: CqPool<i64> = CqPool::new();

        // model: per live queue, the ordered (ref, key, prio) contents
        let mut queues: Vec<(CqHandle, Vec<(CqRef, u32, i64)>)> = Vec::new();
        let mut next_key = 0u32;

        for _ in 0..3 {
            let q = pool.new_queue(0);
            queues.push((q, Vec::new()));
        }

        for _ in 0..3000 {
            match rng.random_range(0..100) {
                0..40 => {
                    let (q, model) = &mut queues[rng.random_range(0..queues.len())];
                    let prio = rng.random_range(0..1000);
                    let r = pool.push_back(*q, next_key, prio);
                    model.push((r, next_key, prio));
                    next_key += 1;
                }
                40..55 => {
                    let (_, model) = &mut queues[rng.random_range(0..queues.len())];
                    if model.is_empty() {
                        continue;
                    }
                    let at = rng.random_range(0..model.len());
                    let prio = rng.random_range(0..1000);
                    let r = pool.insert_after(model[at].0, next_key, prio);
                    model.insert(at + 1, (r, next_key, prio));
                    next_key += 1;
                }
                55..70 => {
                    let (_, model) = &mut queues[rng.random_range(0..queues.len())];
                    if model.is_empty() {
                        continue;
                    }
                    let at = rng.random_range(0..model.len());
                    let (r, _, _) = model.remove(at);
                    pool.remove(r);
                }
                70..80 => {
                    if queues.len() < 2 {
                        continue;
                    }
                    let a = rng.random_range(0..queues.len());
                    let mut b = rng.random_range(0..queues.len());
                    if a == b {
                        b = (b + 1) % queues.len();
                    }
                    let (qb, model_b) = queues.remove(b);
                    let a = if b < a { a - 1 } else { a };
                    pool.concat(queues[a].0, qb);
                    queues[a].1.extend(model_b);
                }
                80..90 => {
                    let idx = rng.random_range(0..queues.len());
                    let (q, model) = &mut queues[idx];
                    if model.is_empty() {
                        continue;
                    }
                    let at = rng.random_range(0..model.len());
                    let q2 = pool.split_off_before(*q, model[at].0);
                    let tail = model.split_off(at);
                    queues.push((q2, tail));
                }
                _ => {
                    let (q, model) = &queues[rng.random_range(0..queues.len())];
                    let expected = model.iter().map(|&(_, k, p)| (p, k)).min();
                    assert_eq!(pool.find_min(*q).map(|(_, k, p)| (p, k)), expected);
                }
            }

            for (q, model) in &queues {
                assert_eq!(
                    pool.keys_in_order(*q),
                    model.iter().map(|&(_, k, _)| k).collect::<Vec<_>>()
                );
                for &(r, _, _) in model {
                    debug_assert_eq!(pool.queue_of(r), *q);
                }
            }
        }
    }
}
