/*!
# Two-Level Priority Queue

Keys partitioned into **groups**; each group is an ordered concatenable
sequence with its own minimum, and a global heap tracks the minimum over all
*active* groups. The Galil–Micali–Gabow variant stores the edges reaching
into each non-even blossom as one group, so that

- δ₂ is the global minimum,
- labelling a blossom odd **freezes** its whole group in `O(log m)` (the
  slack of an even–odd edge does not move under dual adjustment),
- expanding a blossom **splits** its group at sub-blossom boundaries, and
- a uniform slack decrease costs `O(1)` via a shared offset.

Frozen groups accumulate *debt*: the amount of global offset movement they
missed while frozen. The true priority of an entry is
`stored + offset − debt`, where insertion under a frozen group uses the
group's freeze point instead of the live offset. Reactivating a group only
bumps its debt; no entry is touched.

Groups contain one **anchor** per node (with infinite priority, key space
above the real keys) so a split point exists even for nodes without entries.
*/

use crate::graph::Weight;
use crate::queues::concat::{CqPool, CqRef};
use crate::queues::pq1::PriorityQueue1;

/// Handle of one group.
pub type GroupId = u32;

/// Priority assigned to anchors; must dominate every real priority.
const ANCHOR_PRIORITY: Weight = Weight::MAX / 4;

/// True priorities at or above this threshold are anchors, i.e. "no entry".
const REAL_LIMIT: Weight = Weight::MAX / 8;

#[derive(Clone, Debug)]
struct GroupSlot {
    queue: u32,
    debt: Weight,
    active: bool,
    /// Offset value at the moment the group was last deactivated.
    frozen_at: Weight,
    live: bool,
}

/// Two-level priority queue over `u32` keys with group freezing.
///
/// # Examples
/// ```
/// use blossoms::queues::PriorityQueue2;
///
/// let mut pq = PriorityQueue2::new(100);
/// let g = pq.create_group(true);
/// let anchor = pq.insert_anchor(g, 100);
/// pq.insert_after(anchor, 3, 40);
/// pq.insert_after(anchor, 4, 25);
///
/// assert_eq!(pq.group_min(g).map(|(_, k, p)| (k, p)), Some((4, 25)));
/// pq.decrease_all_priorities(5);
/// assert_eq!(pq.global_min().map(|(_, _, k, p)| (k, p)), Some((4, 20)));
/// ```
#[derive(Clone, Debug)]
pub struct PriorityQueue2 {
    pool: CqPool<Weight>,
    groups: Vec<GroupSlot>,
    free_groups: Vec<u32>,
    /// Global minimum over active groups, keyed by group id with priority
    /// `stored_min - debt` (comparable across groups under a shared offset).
    heap: PriorityQueue1<Weight>,
    offset: Weight,
    /// Keys at or above this value are anchors.
    first_anchor_key: u32,
}

impl PriorityQueue2 {
    /// Creates an empty structure; real keys live in `0..first_anchor_key`,
    /// anchor keys at `first_anchor_key` and above.
    pub fn new(first_anchor_key: u32) -> Self {
        Self {
            pool: CqPool::new(),
            groups: Vec::new(),
            free_groups: Vec::new(),
            heap: PriorityQueue1::new(16),
            offset: 0,
            first_anchor_key,
        }
    }

    /// Creates a new empty group.
    pub fn create_group(&mut self, active: bool) -> GroupId {
        let g = if let Some(g) = self.free_groups.pop() {
            g
        } else {
            self.groups.push(GroupSlot {
                queue: 0,
                debt: 0,
                active: false,
                frozen_at: 0,
                live: false,
            });
            (self.groups.len() - 1) as GroupId
        };

        let queue = self.pool.new_queue(g);
        self.groups[g as usize] = GroupSlot {
            queue,
            debt: 0,
            active,
            frozen_at: self.offset,
            live: true,
        };
        self.refresh(g);
        g
    }

    /// Returns *true* if the group currently participates in the global
    /// minimum.
    pub fn is_active(&self, g: GroupId) -> bool {
        self.groups[g as usize].active
    }

    /// The group an entry or anchor currently belongs to.
    pub fn group_of(&self, r: CqRef) -> GroupId {
        self.pool.owner(self.pool.queue_of(r))
    }

    /// Appends the anchor of a node to the back of `g`.
    pub fn insert_anchor(&mut self, g: GroupId, key: u32) -> CqRef {
        debug_assert!(key >= self.first_anchor_key);
        let r = self
            .pool
            .push_back(self.groups[g as usize].queue, key, ANCHOR_PRIORITY);
        self.refresh(g);
        r
    }

    /// Inserts a real entry with the given true priority directly after
    /// `after` (an anchor or another entry of the same group).
    pub fn insert_after(&mut self, after: CqRef, key: u32, priority: Weight) -> CqRef {
        debug_assert!(key < self.first_anchor_key);
        let g = self.group_of(after);
        let slot = &self.groups[g as usize];
        let stored = priority - self.base(slot) + slot.debt;
        let r = self.pool.insert_after(after, key, stored);
        self.refresh(g);
        r
    }

    /// Updates the true priority of an existing entry.
    pub fn change_priority(&mut self, r: CqRef, priority: Weight) {
        let g = self.group_of(r);
        let slot = &self.groups[g as usize];
        let stored = priority - self.base(slot) + slot.debt;
        self.pool.update_priority(r, stored);
        self.refresh(g);
    }

    /// Removes a single entry.
    pub fn remove_entry(&mut self, r: CqRef) {
        let g = self.group_of(r);
        self.pool.remove(r);
        self.refresh(g);
    }

    /// Minimum real entry of `g` as `(ref, key, true priority)`.
    pub fn group_min(&self, g: GroupId) -> Option<(CqRef, u32, Weight)> {
        let slot = &self.groups[g as usize];
        let (r, key, stored) = self.pool.find_min(slot.queue)?;
        let prio = stored + self.base(slot) - slot.debt;
        (prio < REAL_LIMIT).then_some((r, key, prio))
    }

    /// Minimum real entry over all active groups as
    /// `(group, ref, key, true priority)`.
    pub fn global_min(&self) -> Option<(GroupId, CqRef, u32, Weight)> {
        let (g, _) = self.heap.find_min()?;
        let (r, key, prio) = self.group_min(g)?;
        Some((g, r, key, prio))
    }

    /// Removes `g` from global-minimum consideration and freezes the true
    /// priorities of its entries.
    pub fn deactivate(&mut self, g: GroupId) {
        let slot = &mut self.groups[g as usize];
        if !slot.active {
            return;
        }
        slot.active = false;
        slot.frozen_at = self.offset;
        self.heap.remove(g);
    }

    /// Reinstates a frozen group; its entries resume moving with the global
    /// offset from their frozen values.
    pub fn activate(&mut self, g: GroupId) {
        let slot = &mut self.groups[g as usize];
        if slot.active {
            return;
        }
        slot.debt += self.offset - slot.frozen_at;
        slot.active = true;
        self.refresh(g);
    }

    /// Decreases the true priority of every entry in every **active** group,
    /// in constant time.
    pub fn decrease_all_priorities(&mut self, delta: Weight) {
        self.offset -= delta;
    }

    /// Splits `g` before the given anchor/entry: `g` keeps the front part,
    /// the returned group receives the rest and inherits activity and debt.
    pub fn split_off_before(&mut self, g: GroupId, r: CqRef) -> GroupId {
        let q2 = self.pool.split_off_before(self.groups[g as usize].queue, r);

        let g2 = self.create_group(false);
        let src = self.groups[g as usize].clone();
        let slot = &mut self.groups[g2 as usize];
        // `create_group` allocated a fresh empty queue for g2; swap it for
        // the split-off half and carry over the freeze state
        let unused = std::mem::replace(&mut slot.queue, q2);
        slot.debt = src.debt;
        slot.active = false;
        slot.frozen_at = src.frozen_at;
        self.pool.delete_queue(unused);
        self.pool.set_owner(q2, g2);

        if src.active {
            self.groups[g2 as usize].active = true;
            self.refresh(g2);
        }
        self.refresh(g);
        g2
    }

    /// Removes and returns all **real** entries of `g` as
    /// `(key, true priority)` in group order; anchors are discarded and the
    /// group is deleted.
    pub fn dissolve_group(&mut self, g: GroupId) -> Vec<(u32, Weight)> {
        let slot = self.groups[g as usize].clone();
        let base = self.base(&slot) - slot.debt;
        let entries = self
            .pool
            .drain(slot.queue)
            .into_iter()
            .filter(|&(key, _)| key < self.first_anchor_key)
            .map(|(key, stored)| (key, stored + base))
            .collect();

        self.pool.delete_queue(slot.queue);
        self.heap.remove(g);
        self.groups[g as usize].live = false;
        self.free_groups.push(g);
        entries
    }

    /// Offset entries translate against: the live offset for active groups,
    /// the freeze point for frozen ones.
    #[inline(always)]
    fn base(&self, slot: &GroupSlot) -> Weight {
        if slot.active {
            self.offset
        } else {
            slot.frozen_at
        }
    }

    /// Re-syncs the global heap entry of `g` after a structural change.
    fn refresh(&mut self, g: GroupId) {
        let slot = &self.groups[g as usize];
        if !slot.active {
            return;
        }
        let key = match self.pool.find_min(slot.queue) {
            Some((_, _, stored)) => stored - slot.debt,
            None => ANCHOR_PRIORITY,
        };
        if self.heap.contains(g) {
            self.heap.change_priority(g, key);
        } else {
            self.heap.insert(g, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: u32 = 1000; // first anchor key in all tests

    #[test]
    fn group_and_global_minima() {
        let mut pq = PriorityQueue2::new(A);
        let g1 = pq.create_group(true);
        let g2 = pq.create_group(true);

        let a1 = pq.insert_anchor(g1, A);
        let a2 = pq.insert_anchor(g2, A + 1);
        pq.insert_after(a1, 0, 30);
        pq.insert_after(a2, 1, 20);
        pq.insert_after(a2, 2, 50);

        assert_eq!(pq.group_min(g1).map(|(_, k, p)| (k, p)), Some((0, 30)));
        assert_eq!(pq.global_min().map(|(g, _, k, p)| (g, k, p)), Some((g2, 1, 20)));
    }

    #[test]
    fn empty_groups_have_no_minimum() {
        let mut pq = PriorityQueue2::new(A);
        let g = pq.create_group(true);
        assert_eq!(pq.group_min(g), None);
        assert_eq!(pq.global_min(), None);

        // anchors alone do not constitute entries
        pq.insert_anchor(g, A);
        assert_eq!(pq.group_min(g), None);
        assert_eq!(pq.global_min(), None);
    }

    #[test]
    fn freezing_suspends_offset_movement() {
        let mut pq = PriorityQueue2::new(A);
        let g1 = pq.create_group(true);
        let g2 = pq.create_group(true);
        let a1 = pq.insert_anchor(g1, A);
        let a2 = pq.insert_anchor(g2, A + 1);
        pq.insert_after(a1, 0, 100);
        pq.insert_after(a2, 1, 10);

        pq.decrease_all_priorities(4);
        pq.deactivate(g2);
        pq.decrease_all_priorities(30);

        // g2 is invisible globally and its entry froze at 6
        assert_eq!(pq.global_min().map(|(_, _, k, p)| (k, p)), Some((0, 66)));
        assert_eq!(pq.group_min(g2).map(|(_, k, p)| (k, p)), Some((1, 6)));

        // inserts into a frozen group stay frozen too
        let e = pq.insert_after(a2, 2, 3);
        assert_eq!(pq.group_min(g2).map(|(_, k, p)| (k, p)), Some((2, 3)));

        pq.activate(g2);
        assert_eq!(pq.global_min().map(|(_, _, k, p)| (k, p)), Some((2, 3)));
        pq.decrease_all_priorities(2);
        assert_eq!(pq.group_min(g2).map(|(_, k, p)| (k, p)), Some((2, 1)));
        assert_eq!(pq.group_min(g1).map(|(_, k, p)| (k, p)), Some((0, 64)));

        pq.remove_entry(e);
        assert_eq!(pq.group_min(g2).map(|(_, k, p)| (k, p)), Some((1, 4)));
    }

    #[test]
    fn split_inherits_freeze_state() {
        let mut pq = PriorityQueue2::new(A);
        let g = pq.create_group(true);
        let a0 = pq.insert_anchor(g, A);
        let a1 = pq.insert_anchor(g, A + 1);
        pq.insert_after(a0, 0, 8);
        pq.insert_after(a1, 1, 5);

        pq.decrease_all_priorities(3);
        pq.deactivate(g);
        pq.decrease_all_priorities(100); // must not affect the frozen entries

        let g2 = pq.split_off_before(g, a1);
        assert_eq!(pq.group_min(g).map(|(_, k, p)| (k, p)), Some((0, 5)));
        assert_eq!(pq.group_min(g2).map(|(_, k, p)| (k, p)), Some((1, 2)));
        assert_eq!(pq.global_min(), None);

        pq.activate(g2);
        assert_eq!(pq.global_min().map(|(g, _, k, p)| (g, k, p)), Some((g2, 1, 2)));
        pq.decrease_all_priorities(2);
        assert_eq!(pq.group_min(g2).map(|(_, k, p)| (k, p)), Some((1, 0)));
        // the still-frozen left half did not move
        assert_eq!(pq.group_min(g).map(|(_, k, p)| (k, p)), Some((0, 5)));
    }

    #[test]
    fn dissolve_reports_true_priorities() {
        let mut pq = PriorityQueue2::new(A);
        let g = pq.create_group(true);
        let a = pq.insert_anchor(g, A);
        pq.insert_after(a, 4, 12);
        pq.insert_after(a, 3, 7);
        pq.decrease_all_priorities(5);

        let mut entries = pq.dissolve_group(g);
        entries.sort_unstable();
        assert_eq!(entries, vec![(3, 2), (4, 7)]);
        assert_eq!(pq.global_min(), None);
    }
}
