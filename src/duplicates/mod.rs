//! Duplicate-group materialization.
//!
//! A pure read over the inventory: records sharing a content digest form a
//! duplicate group; the grouper orders groups and members and computes the
//! reclaimable space for each.

pub mod grouper;

pub use grouper::{duplicate_groups, DuplicateGroup};
