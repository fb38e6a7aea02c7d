/*!
# Indexed Min-Heap

A binary min-heap over dense `u32` keys that keeps the heap position of every
key, enabling `remove` and `change_priority` on arbitrary keys in `O(log n)`.

Two details are specific to the primal–dual matching engines:

- **Uniform adjustment**: [`PriorityQueue1::add_to_all`] shifts the priority
  of every stored key in `O(1)` through an internal offset. Dual adjustments
  touch every even/odd node, so this is the difference between `O(n)` and
  `O(1)` per adjustment.
- **Tie-break**: equal priorities are ordered by key, so the reported minimum
  is independent of insertion order.
*/

use std::ops::{Add, Sub};

use num::Zero;

const NO_POS: u32 = u32::MAX;

/// Indexed min-heap over dense `u32` keys with an additive offset.
///
/// # Examples
/// ```
/// use blossoms::queues::PriorityQueue1;
///
/// let mut pq: PriorityQueue1<i64> = PriorityQueue1::new(4);
/// pq.insert(0, 10);
/// pq.insert(3, 5);
/// pq.add_to_all(-2);
/// assert_eq!(pq.find_min(), Some((3, 3)));
/// pq.change_priority(0, 1);
/// assert_eq!(pq.find_min(), Some((0, 1)));
/// assert_eq!(pq.remove(3), Some(3));
/// ```
#[derive(Clone, Debug)]
pub struct PriorityQueue1<P> {
    /// `(stored priority, key)`; true priority is `stored + offset`.
    heap: Vec<(P, u32)>,
    /// Key to heap index, `NO_POS` when absent.
    pos: Vec<u32>,
    offset: P,
}

impl<P> PriorityQueue1<P>
where
    P: Copy + Ord + Zero + Add<Output = P> + Sub<Output = P>,
{
    /// Creates an empty queue for keys `0..key_space`.
    pub fn new(key_space: u32) -> Self {
        Self {
            heap: Vec::new(),
            pos: vec![NO_POS; key_space as usize],
            offset: P::zero(),
        }
    }

    /// Number of stored keys.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns *true* if no key is stored.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns *true* if `key` is stored.
    #[inline(always)]
    pub fn contains(&self, key: u32) -> bool {
        (key as usize) < self.pos.len() && self.pos[key as usize] != NO_POS
    }

    /// Removes all keys and resets the offset.
    pub fn clear(&mut self) {
        for &(_, k) in &self.heap {
            self.pos[k as usize] = NO_POS;
        }
        self.heap.clear();
        self.offset = P::zero();
    }

    /// Grows the key space to at least `key_space`.
    pub fn ensure_key_space(&mut self, key_space: u32) {
        if self.pos.len() < key_space as usize {
            self.pos.resize(key_space as usize, NO_POS);
        }
    }

    /// Inserts `key` with the given priority.
    ///
    /// # Panics
    /// Debug-asserts that `key` is not already stored.
    pub fn insert(&mut self, key: u32, priority: P) {
        self.ensure_key_space(key + 1);
        debug_assert!(!self.contains(key));

        let idx = self.heap.len() as u32;
        self.heap.push((priority - self.offset, key));
        self.pos[key as usize] = idx;
        self.sift_up(idx);
    }

    /// Current priority of `key`, if stored.
    pub fn priority_of(&self, key: u32) -> Option<P> {
        if !self.contains(key) {
            return None;
        }
        let (stored, _) = self.heap[self.pos[key as usize] as usize];
        Some(stored + self.offset)
    }

    /// Updates the priority of an existing key.
    pub fn change_priority(&mut self, key: u32, priority: P) {
        debug_assert!(self.contains(key));
        let idx = self.pos[key as usize];
        let stored = priority - self.offset;
        let old = self.heap[idx as usize].0;
        self.heap[idx as usize].0 = stored;
        if stored < old {
            self.sift_up(idx);
        } else {
            self.sift_down(idx);
        }
    }

    /// Removes `key`, returning its priority if it was stored.
    pub fn remove(&mut self, key: u32) -> Option<P> {
        if !self.contains(key) {
            return None;
        }
        let idx = self.pos[key as usize];
        let (stored, _) = self.heap[idx as usize];
        self.pos[key as usize] = NO_POS;

        let last = self.heap.pop().unwrap();
        if (idx as usize) < self.heap.len() {
            self.heap[idx as usize] = last;
            self.pos[last.1 as usize] = idx;
            self.sift_down(idx);
            self.sift_up(self.pos[last.1 as usize]);
        }
        Some(stored + self.offset)
    }

    /// Smallest `(key, priority)`, ties broken towards the smaller key.
    pub fn find_min(&self) -> Option<(u32, P)> {
        self.heap.first().map(|&(p, k)| (k, p + self.offset))
    }

    /// Removes and returns the minimum.
    pub fn pop_min(&mut self) -> Option<(u32, P)> {
        let (key, prio) = self.find_min()?;
        self.remove(key);
        Some((key, prio))
    }

    /// Adds `delta` to the priority of every stored key, in constant time.
    pub fn add_to_all(&mut self, delta: P) {
        self.offset = self.offset + delta;
    }

    #[inline(always)]
    fn less(&self, a: u32, b: u32) -> bool {
        let (pa, ka) = self.heap[a as usize];
        let (pb, kb) = self.heap[b as usize];
        (pa, ka) < (pb, kb)
    }

    fn swap(&mut self, a: u32, b: u32) {
        self.heap.swap(a as usize, b as usize);
        self.pos[self.heap[a as usize].1 as usize] = a;
        self.pos[self.heap[b as usize].1 as usize] = b;
    }

    fn sift_up(&mut self, mut idx: u32) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.less(idx, parent) {
                break;
            }
            self.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: u32) {
        loop {
            let mut smallest = idx;
            for child in [2 * idx + 1, 2 * idx + 2] {
                if (child as usize) < self.heap.len() && self.less(child, smallest) {
                    smallest = child;
                }
            }
            if smallest == idx {
                return;
            }
            self.swap(idx, smallest);
            idx = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn min_respects_offset() {
        let mut pq: PriorityQueue1<i64> = PriorityQueue1::new(8);
        pq.insert(1, 10);
        pq.insert(2, 4);
        assert_eq!(pq.find_min(), Some((2, 4)));

        pq.add_to_all(-4);
        assert_eq!(pq.find_min(), Some((2, 0)));
        assert_eq!(pq.priority_of(1), Some(6));

        // keys inserted after the shift see the same frame of reference
        pq.insert(3, 1);
        assert_eq!(pq.pop_min(), Some((2, 0)));
        assert_eq!(pq.pop_min(), Some((3, 1)));
        assert_eq!(pq.pop_min(), Some((1, 6)));
        assert!(pq.is_empty());
    }

    #[test]
    fn equal_priorities_prefer_smaller_key() {
        let mut pq: PriorityQueue1<i64> = PriorityQueue1::new(8);
        for key in [5, 1, 7, 3] {
            pq.insert(key, 42);
        }
        assert_eq!(pq.pop_min(), Some((1, 42)));
        assert_eq!(pq.pop_min(), Some((3, 42)));
    }

    #[test]
    fn randomized_against_naive_model() {
        let rng = &mut Pcg64Mcg::seed_from_u64(123);
        let key_space = 64u32;

        let mut pq: PriorityQueue1<i64> = PriorityQueue1::new(key_space);
        let mut model: Vec<Option<i64>> = vec![None; key_space as usize];

        for _ in 0..2000 {
            let key = rng.random_range(0..key_space);
            match rng.random_range(0..5) {
                0 | 1 => {
                    let prio = rng.random_range(-100..100);
                    if model[key as usize].is_none() {
                        pq.insert(key, prio);
                        model[key as usize] = Some(prio);
                    } else {
                        pq.change_priority(key, prio);
                        model[key as usize] = Some(prio);
                    }
                }
                2 => {
                    assert_eq!(pq.remove(key), model[key as usize].take());
                }
                3 => {
                    let delta = rng.random_range(-10..10);
                    pq.add_to_all(delta);
                    model.iter_mut().flatten().for_each(|p| *p += delta);
                }
                _ => {
                    let expected = model
                        .iter()
                        .enumerate()
                        .filter_map(|(k, p)| p.map(|p| (p, k as u32)))
                        .min()
                        .map(|(p, k)| (k, p));
                    assert_eq!(pq.find_min(), expected);
                }
            }

            assert_eq!(pq.len(), model.iter().flatten().count());
        }

        let mut drained = Vec::new();
        while let Some((k, p)) = pq.pop_min() {
            drained.push((p, k));
        }
        let expected = model
            .iter()
            .enumerate()
            .filter_map(|(k, p)| p.map(|p| (p, k as u32)))
            .sorted()
            .collect_vec();
        assert_eq!(drained, expected);
    }
}
