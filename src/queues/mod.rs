/*!
# Priority-Queue Toolkit

The specialised queue structures that let the weighted matching engines
amortise their edge scans:

- [`PriorityQueue1`](pq1::PriorityQueue1): an indexed binary min-heap over
  dense `u32` keys with `change_priority` on arbitrary keys and a constant
  time *uniform* adjustment of all priorities. Used for node and blossom dual
  variables and for the good-edge queue.
- [`CqPool`](concat::CqPool): a pool of **concatenable queues**: ordered
  sequences supporting split and concatenation in `O(log n)` with stable
  element handles and per-queue owner tags. Blossoms keep their member nodes
  in such queues so that membership queries survive arbitrary merging and
  splitting.
- [`PriorityQueue2`](pq2::PriorityQueue2): a two-level priority queue grouping
  keys into concatenable groups with per-group minima and a global minimum,
  including freezing (deactivation) of whole groups. Tracks the even→non-even
  edges of the Galil–Micali–Gabow variant.

All minima tie-break on the smaller key, so results are reproducible.
*/

pub mod concat;
pub mod pq1;
pub mod pq2;

pub use concat::{CqHandle, CqPool, CqRef};
pub use pq1::PriorityQueue1;
pub use pq2::{GroupId, PriorityQueue2};
