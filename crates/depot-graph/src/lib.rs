//! The dirty dependency graph (component M's target data structure),
//! its collector, and conflict resolution (components M and N).

pub mod collector;
pub mod conflict;
pub mod graph;
