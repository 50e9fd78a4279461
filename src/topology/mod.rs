//! Network topology module.
//!
//! The graph store: node and link entities, traffic flows, the
//! [`Topology`] aggregate that mediates every operational change, read-only
//! metrics and snapshot export.

pub mod flow;
pub mod graph;
pub mod link;
pub mod metrics;
pub mod node;
pub mod snapshot;
pub mod types;

// Re-export key types for easier access
pub use flow::{Flow, ServiceClass, Sla};
pub use graph::Topology;
pub use link::{power_model, reliability_risk, Link};
pub use metrics::ReliabilityScore;
pub use node::{Node, PathTree};
pub use snapshot::{LinkRecord, NodeRecord, TopologySnapshot};
pub use types::{link_id, LinkDescriptor, NodeDescriptor, Role, Status, TopologyDescriptor};
