//! Group Builder: turns a classified element tree into comparable regions.
//!
//! - [`builder`] - hierarchical [`SemanticGroup`](crate::types::SemanticGroup) trees
//! - [`proximity`] - flat [`NodeGroup`](crate::types::NodeGroup) proximity clusters

pub mod builder;
pub mod proximity;

pub use builder::{build_groups, snapshot_groups, GroupBuilderConfig};
pub use proximity::{cluster_nodes, ProximityConfig};
