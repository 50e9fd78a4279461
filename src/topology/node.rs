//! Node entity.

use super::link::Link;
use super::types::{NodeDescriptor, Role, Status};
use crate::error::{Result, TopologyError};
use std::collections::BTreeMap;

/// Paths from one node to every destination it can reach, keyed by destination
pub type PathTree = BTreeMap<String, Vec<String>>;

/// A router in the topology
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    pop: serde_json::Value,
    links: Vec<String>,
    neighbors: Vec<String>,
    active_links: Vec<String>,
    active_neighbors: Vec<String>,
    status: Status,
    role: Role,
    path_tree: PathTree,
}

impl Node {
    pub(super) fn from_descriptor(descriptor: &NodeDescriptor) -> Self {
        Self {
            name: descriptor.id.clone(),
            pop: descriptor.pop.clone(),
            links: Vec::new(),
            neighbors: Vec::new(),
            active_links: Vec::new(),
            active_neighbors: Vec::new(),
            status: Status::On,
            role: Role::Normal,
            path_tree: PathTree::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pop(&self) -> &serde_json::Value {
        &self.pop
    }

    /// Every link touching this node, in either direction
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Far endpoints of this node's outgoing links
    pub fn neighbors(&self) -> &[String] {
        &self.neighbors
    }

    pub fn active_links(&self) -> &[String] {
        &self.active_links
    }

    /// Far endpoints of this node's outgoing links that are on
    pub fn active_neighbors(&self) -> &[String] {
        &self.active_neighbors
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_on(&self) -> bool {
        self.status.is_on()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn path_tree(&self) -> &PathTree {
        &self.path_tree
    }

    pub fn path_to(&self, destination: &str) -> Option<&[String]> {
        self.path_tree.get(destination).map(Vec::as_slice)
    }

    pub fn has_neighbor(&self, name: &str) -> bool {
        self.neighbors.iter().any(|n| n == name)
    }

    /// Register a link at construction time. Both endpoints call this.
    pub(super) fn attach_link(&mut self, link: &Link) {
        self.links.push(link.id().to_string());
        self.active_links.push(link.id().to_string());
        if link.node1() == self.name && !self.has_neighbor(link.node2()) {
            self.neighbors.push(link.node2().to_string());
            self.active_neighbors.push(link.node2().to_string());
        }
    }

    pub(super) fn shutdown_link(&mut self, link: &Link) -> Result<()> {
        self.check_owns(link)?;
        let position = self
            .active_links
            .iter()
            .position(|id| id == link.id())
            .ok_or_else(|| {
                TopologyError::transition(format!("link {}", link.id()), format!("already inactive at node {}", self.name))
            })?;
        self.active_links.remove(position);
        if link.node1() == self.name {
            self.active_neighbors.retain(|n| n != link.node2());
        }
        Ok(())
    }

    pub(super) fn startup_link(&mut self, link: &Link) -> Result<()> {
        self.check_owns(link)?;
        if self.active_links.iter().any(|id| id == link.id()) {
            return Err(TopologyError::transition(
                format!("link {}", link.id()),
                format!("already active at node {}", self.name),
            ));
        }
        self.active_links.push(link.id().to_string());
        if link.node1() == self.name && !self.active_neighbors.iter().any(|n| n == link.node2()) {
            self.active_neighbors.push(link.node2().to_string());
        }
        Ok(())
    }

    pub(super) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub(super) fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(super) fn set_path_tree(&mut self, tree: PathTree) {
        self.path_tree = tree;
    }

    /// Back to the construction-time operational state
    pub(super) fn reset(&mut self) {
        self.status = Status::On;
        self.role = Role::Normal;
        self.active_links = self.links.clone();
        self.active_neighbors = self.neighbors.clone();
        self.path_tree.clear();
    }

    fn check_owns(&self, link: &Link) -> Result<()> {
        if self.links.iter().any(|id| id == link.id()) {
            Ok(())
        } else {
            Err(TopologyError::UnknownLink(format!("{} at node {}", link.id(), self.name)))
        }
    }
}
