/*!
# Utilities

Supporting data structures that are not specific to a single matching engine:

- [`UnionFind`](union_find::UnionFind): disjoint sets over nodes with a
  steerable representative, used by the cardinality engine to collapse bloom
  bases.
*/

pub mod union_find;

pub use union_find::UnionFind;
