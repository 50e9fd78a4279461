//! Error types for topology and routing operations.
//!
//! Every fallible operation on a [`Topology`](crate::topology::Topology)
//! returns [`TopologyError`]. Errors abort only the call that raised them;
//! no operation leaves the topology partially mutated when it fails.

use thiserror::Error;

/// Errors raised by the topology state engine and the routing methods
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Unknown link: {0}")]
    UnknownLink(String),

    #[error("Nodes {from} and {to} are not neighbors")]
    NotNeighbors { from: String, to: String },

    #[error("Link {0} is switched off")]
    LinkDown(String),

    #[error("Invalid status '{0}', expected 'on' or 'off'")]
    InvalidStatus(String),

    #[error("Invalid role '{0}', expected 'NR', 'ER' or 'IR'")]
    InvalidRole(String),

    #[error("Invalid transition for {entity}: {reason}")]
    InvalidTransition { entity: String, reason: String },

    #[error("Flow {0} is already applied on the network")]
    FlowAlreadyApplied(String),

    #[error("Flow {0} is not applied on the network")]
    FlowNotApplied(String),

    #[error("Invalid path for flow {flow}: {reason}")]
    InvalidPath { flow: String, reason: String },

    #[error("No path from {src} to {dst}")]
    NoPath { src: String, dst: String },

    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Duplicate link: {0}")]
    DuplicateLink(String),

    #[error("Link {link} references unknown node {node}")]
    DanglingLink { link: String, node: String },

    #[error("Invalid attribute '{attribute}' on {entity}: {reason}")]
    InvalidAttribute {
        entity: String,
        attribute: String,
        reason: String,
    },

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TopologyError {
    pub(crate) fn transition(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        TopologyError::InvalidTransition {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_path(flow: impl Into<String>, reason: impl Into<String>) -> Self {
        TopologyError::InvalidPath {
            flow: flow.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, TopologyError>;
