//! The topology aggregate.
//!
//! [`Topology`] owns every node and link, the reachability matrix, the list of
//! flows currently applied on the network and the state of the active routing
//! method. All operational mutation goes through it: status transitions keep
//! both endpoint nodes, the reachability matrix and the routing state in
//! step, and flow admission/removal is validated over the whole path before
//! any link is touched.

use super::flow::Flow;
use super::link::Link;
use super::node::{Node, PathTree};
use super::types::{validate_descriptors, LinkDescriptor, NodeDescriptor, Role, Status, TopologyDescriptor};
use crate::error::{Result, TopologyError};
use crate::routing::{self, RoutingMethod, RoutingState};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Live network state plus the routing method operating on it
#[derive(Debug)]
pub struct Topology {
    name: String,
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    links: Vec<Link>,
    link_index: HashMap<String, usize>,
    edge_index: HashMap<(usize, usize), usize>,
    reachability: Vec<Vec<bool>>,
    current_flows: Vec<Flow>,
    method: RoutingMethod,
    routing: RoutingState,
}

impl Topology {
    /// Build a topology from static descriptors and initialise the routing method.
    ///
    /// Descriptor order is kept as node/link insertion order, which fixes
    /// neighbor iteration order for every routing method.
    ///
    /// # Arguments
    /// * `name` - Topology name, used for snapshots
    /// * `nodes` - Node descriptors
    /// * `links` - Directed link descriptors
    /// * `method` - Routing method and its parameters
    pub fn new(
        name: impl Into<String>,
        nodes: &[NodeDescriptor],
        links: &[LinkDescriptor],
        method: RoutingMethod,
    ) -> Result<Self> {
        validate_descriptors(nodes, links)?;
        method.validate()?;

        let mut topology = Self {
            name: name.into(),
            nodes: nodes.iter().map(Node::from_descriptor).collect(),
            node_index: HashMap::new(),
            links: links.iter().map(Link::from_descriptor).collect(),
            link_index: HashMap::new(),
            edge_index: HashMap::new(),
            reachability: Vec::new(),
            current_flows: Vec::new(),
            routing: RoutingState::for_method(&method),
            method,
        };

        for (idx, node) in topology.nodes.iter().enumerate() {
            topology.node_index.insert(node.name().to_string(), idx);
        }
        for (idx, link) in topology.links.iter().enumerate() {
            let a = topology.node_index[link.node1()];
            let b = topology.node_index[link.node2()];
            topology.link_index.insert(link.id().to_string(), idx);
            topology.edge_index.insert((a, b), idx);
            topology.nodes[a].attach_link(link);
            topology.nodes[b].attach_link(link);
        }

        topology.rebuild_reachability();
        info!(
            "Built topology '{}' with {} nodes and {} links, routing method {}",
            topology.name,
            topology.nodes.len(),
            topology.links.len(),
            topology.method
        );

        routing::initialize(&mut topology)?;
        Ok(topology)
    }

    /// Build a topology from a descriptor set
    pub fn from_descriptor(
        name: impl Into<String>,
        descriptor: &TopologyDescriptor,
        method: RoutingMethod,
    ) -> Result<Self> {
        Self::new(name, &descriptor.nodes, &descriptor.links, method)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn routing_method(&self) -> &RoutingMethod {
        &self.method
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(Node::name).collect()
    }

    pub fn node(&self, name: &str) -> Result<&Node> {
        self.index_of(name).map(|idx| &self.nodes[idx])
    }

    pub fn link(&self, id: &str) -> Result<&Link> {
        self.link_index
            .get(id)
            .map(|&idx| &self.links[idx])
            .ok_or_else(|| TopologyError::UnknownLink(id.to_string()))
    }

    /// The link from `from` to `to`
    pub fn get_link_between_neighbors(&self, from: &str, to: &str) -> Result<&Link> {
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;
        self.edge(a, b).ok_or_else(|| TopologyError::NotNeighbors {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Flows currently applied on the network, in admission order
    pub fn current_flows(&self) -> &[Flow] {
        &self.current_flows
    }

    pub fn is_reachable(&self, src: &str, dst: &str) -> Result<bool> {
        let a = self.index_of(src)?;
        let b = self.index_of(dst)?;
        Ok(self.reachability[a][b])
    }

    /// Node-by-node reachability over operational links, in insertion order
    pub fn reachability_matrix(&self) -> &[Vec<bool>] {
        &self.reachability
    }

    /// Adjacency over every declared link, rows and columns in sorted name order
    pub fn adjacency_matrix(&self) -> (Vec<String>, Vec<Vec<u8>>) {
        self.sorted_adjacency(|_| true)
    }

    /// Adjacency over links that are on, rows and columns in sorted name order
    pub fn operational_adjacency_matrix(&self) -> (Vec<String>, Vec<Vec<u8>>) {
        self.sorted_adjacency(Link::is_on)
    }

    fn sorted_adjacency(&self, include: impl Fn(&Link) -> bool) -> (Vec<String>, Vec<Vec<u8>>) {
        let mut names: Vec<String> = self.nodes.iter().map(|n| n.name().to_string()).collect();
        names.sort();
        let position: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();

        let mut matrix = vec![vec![0u8; names.len()]; names.len()];
        for link in self.links.iter().filter(|l| include(l)) {
            matrix[position[link.node1()]][position[link.node2()]] = 1;
        }
        (names, matrix)
    }

    /// Whether `path` is a simple path over operational links
    pub fn is_valid_path(&self, path: &[String]) -> bool {
        let mut seen = HashSet::new();
        if path.is_empty() || !path.iter().all(|n| seen.insert(n.as_str())) {
            return false;
        }
        path.windows(2).all(|hop| {
            match (self.node_index.get(&hop[0]), self.node_index.get(&hop[1])) {
                (Some(&a), Some(&b)) => self.operational_edge(a, b).is_some(),
                _ => false,
            }
        })
    }

    // ---- status transitions ----

    /// Switch a link off. Carried flows are dropped from the link.
    pub fn switch_off_link(&mut self, link_id: &str) -> Result<()> {
        let idx = self.link_idx(link_id)?;
        self.set_link_status(idx, Status::Off)?;
        self.rebuild_reachability();
        routing::refresh(self)
    }

    /// Switch a link back on. Both endpoints must be on.
    pub fn turn_on_link(&mut self, link_id: &str) -> Result<()> {
        let idx = self.link_idx(link_id)?;
        self.set_link_status(idx, Status::On)?;
        self.rebuild_reachability();
        routing::refresh(self)
    }

    /// Take a node down together with every active link touching it.
    ///
    /// Returns the de-duplicated ids of the flows that were riding those
    /// links. The flows stay in the current flow list, still accounted on
    /// the surviving links of their paths, until the caller clears or
    /// removes them.
    pub fn shutdown_node(&mut self, name: &str) -> Result<Vec<String>> {
        let idx = self.index_of(name)?;
        if !self.nodes[idx].is_on() {
            return Err(TopologyError::transition(format!("node {}", name), "already off"));
        }

        let active: Vec<usize> = self.nodes[idx]
            .active_links()
            .iter()
            .map(|id| self.link_index[id])
            .collect();

        let mut disrupted: Vec<String> = Vec::new();
        for link_idx in active {
            for flow_id in self.links[link_idx].service_flows() {
                if !disrupted.contains(flow_id) {
                    disrupted.push(flow_id.clone());
                }
            }
            self.set_link_status(link_idx, Status::Off)?;
        }
        self.nodes[idx].set_status(Status::Off);

        self.rebuild_reachability();
        routing::refresh(self)?;
        info!("Node {} shut down, {} flows disrupted", name, disrupted.len());
        Ok(disrupted)
    }

    /// Assign a router role
    pub fn set_node_role(&mut self, name: &str, role: Role) -> Result<()> {
        let idx = self.index_of(name)?;
        self.nodes[idx].set_role(role);
        Ok(())
    }

    /// Bring every node and link back on, drop all flows and re-initialise routing
    pub fn reset(&mut self) -> Result<()> {
        for node in &mut self.nodes {
            node.reset();
        }
        for link in &mut self.links {
            link.reset();
        }
        self.current_flows.clear();
        self.routing = RoutingState::for_method(&self.method);
        self.rebuild_reachability();
        info!("Topology '{}' reset", self.name);
        routing::initialize(self)
    }

    // ---- flow accounting ----

    /// Place a flow on every link of `path`.
    ///
    /// The flow's bandwidth must be a positive number. The whole path is
    /// validated first: it must start at the flow's source, end at its
    /// destination, repeat no node and use only links that are on. A
    /// rejected call leaves the topology untouched.
    /// Over-subscribing a link is allowed.
    pub fn apply_service_on_network(&mut self, flow: &Flow, path: &[String]) -> Result<()> {
        if self.current_flows.iter().any(|f| f.id == flow.id) {
            return Err(TopologyError::FlowAlreadyApplied(flow.id.clone()));
        }
        if !(flow.bandwidth.is_finite() && flow.bandwidth > 0.0) {
            return Err(TopologyError::InvalidAttribute {
                entity: format!("flow {}", flow.id),
                attribute: "bandwidth".to_string(),
                reason: format!("bandwidth must be positive, got {}", flow.bandwidth),
            });
        }
        if path.len() < 2 {
            return Err(TopologyError::invalid_path(&flow.id, "a path needs at least two nodes"));
        }
        if path[0] != flow.src || path[path.len() - 1] != flow.dst {
            return Err(TopologyError::invalid_path(
                &flow.id,
                format!("path must run from {} to {}", flow.src, flow.dst),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(repeated) = path.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(TopologyError::invalid_path(&flow.id, format!("node {} repeats", repeated)));
        }

        let hops = self.resolve_path(path)?;
        if let Some(&down) = hops.iter().find(|&&idx| !self.links[idx].is_on()) {
            return Err(TopologyError::LinkDown(self.links[down].id().to_string()));
        }

        for idx in hops {
            self.links[idx].apply_flow(&flow.id, flow.bandwidth);
        }
        self.current_flows.push(flow.clone());
        debug!("Applied flow {} ({}) on {}", flow.id, flow.bandwidth, path.join("-"));
        Ok(())
    }

    /// Release a flow from every link of `path`.
    ///
    /// Links switched off since admission were already cleared and are
    /// skipped. Consumed bandwidth is clamped at zero.
    pub fn remove_service_from_network(&mut self, flow: &Flow, path: &[String]) -> Result<()> {
        let position = self
            .current_flows
            .iter()
            .position(|f| f.id == flow.id)
            .ok_or_else(|| TopologyError::FlowNotApplied(flow.id.clone()))?;

        let hops = self.resolve_path(path)?;
        if let Some(&stray) = hops
            .iter()
            .find(|&&idx| self.links[idx].is_on() && !self.links[idx].carries(&flow.id))
        {
            return Err(TopologyError::invalid_path(
                &flow.id,
                format!("link {} does not carry the flow", self.links[stray].id()),
            ));
        }

        for idx in hops {
            if self.links[idx].is_on() {
                self.links[idx].remove_flow(&flow.id, flow.bandwidth);
            }
        }
        self.current_flows.remove(position);
        debug!("Removed flow {} from {}", flow.id, path.join("-"));
        Ok(())
    }

    /// Drop a flow from every link still carrying it and from the current
    /// flow list. Returns the number of links released.
    pub fn clear_flow_from_network(&mut self, flow: &Flow) -> usize {
        let mut released = 0;
        for link in self.links.iter_mut().filter(|l| l.is_on() && l.carries(&flow.id)) {
            link.remove_flow(&flow.id, flow.bandwidth);
            released += 1;
        }
        self.current_flows.retain(|f| f.id != flow.id);
        debug!("Cleared flow {} from {} links", flow.id, released);
        released
    }

    // ---- routing ----

    /// Path for a flow under the active routing method
    pub fn get_path(&mut self, flow: &Flow) -> Result<Vec<String>> {
        let src = self.index_of(&flow.src)?;
        let dst = self.index_of(&flow.dst)?;
        if !self.reachability[src][dst] {
            return Err(TopologyError::NoPath {
                src: flow.src.clone(),
                dst: flow.dst.clone(),
            });
        }
        routing::route(self, flow)
    }

    /// Path stored in the source node's path tree
    pub fn get_shortest_path(&self, flow: &Flow) -> Result<Vec<String>> {
        self.index_of(&flow.dst)?;
        self.node(&flow.src)?
            .path_to(&flow.dst)
            .map(<[String]>::to_vec)
            .ok_or_else(|| TopologyError::NoPath {
                src: flow.src.clone(),
                dst: flow.dst.clone(),
            })
    }

    /// Every equal-cost shortest path between two nodes, in discovery order
    pub fn calculate_path(&self, src: &str, dst: &str) -> Result<Vec<Vec<String>>> {
        let a = self.index_of(src)?;
        let b = self.index_of(dst)?;
        let costs = routing::dijkstra::cost_matrix(self);
        let distances = routing::dijkstra::dijkstra(&costs, a);
        let paths = routing::dijkstra::equal_cost_paths(&costs, &distances, a, b, None);
        Ok(paths.into_iter().map(|p| self.names_of(&p)).collect())
    }

    /// Re-run the energy-aware role assignment and link pruning
    pub fn rerun_ear(&mut self) -> Result<()> {
        match &self.method {
            RoutingMethod::Ear(params) => {
                let params = params.clone();
                routing::ear::run(self, &params)
            }
            other => Err(TopologyError::transition(
                format!("topology {}", self.name),
                format!("EAR is not the active routing method ({})", other),
            )),
        }
    }

    // ---- crate-internal access for the routing engines ----

    pub(crate) fn index_of(&self, name: &str) -> Result<usize> {
        self.node_index
            .get(name)
            .copied()
            .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))
    }

    pub(crate) fn node_at(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub(crate) fn names_of(&self, path: &[usize]) -> Vec<String> {
        path.iter().map(|&i| self.nodes[i].name().to_string()).collect()
    }

    /// Declared link from `a` to `b`, whatever its status
    pub(crate) fn edge(&self, a: usize, b: usize) -> Option<&Link> {
        self.edge_index.get(&(a, b)).map(|&idx| &self.links[idx])
    }

    /// Link from `a` to `b` if it is on
    pub(crate) fn operational_edge(&self, a: usize, b: usize) -> Option<&Link> {
        self.edge(a, b).filter(|l| l.is_on())
    }

    /// Declared link ids between two nodes, by index
    pub(crate) fn link_idx_between(&self, a: usize, b: usize) -> Option<usize> {
        self.edge_index.get(&(a, b)).copied()
    }

    /// Indices of the far ends of a node's active outgoing links, in activation order
    pub(crate) fn successors(&self, idx: usize) -> Vec<usize> {
        self.nodes[idx]
            .active_neighbors()
            .iter()
            .map(|n| self.node_index[n])
            .collect()
    }

    /// Indices of the nodes with an active link into `idx`
    pub(crate) fn predecessors(&self, idx: usize) -> Vec<usize> {
        self.nodes[idx]
            .active_links()
            .iter()
            .map(|id| &self.links[self.link_index[id]])
            .filter(|l| l.node2() == self.nodes[idx].name())
            .map(|l| self.node_index[l.node1()])
            .collect()
    }

    pub(crate) fn routing_state(&self) -> &RoutingState {
        &self.routing
    }

    pub(crate) fn routing_state_mut(&mut self) -> &mut RoutingState {
        &mut self.routing
    }

    pub(crate) fn set_role_at(&mut self, idx: usize, role: Role) {
        self.nodes[idx].set_role(role);
    }

    pub(crate) fn set_path_tree_at(&mut self, idx: usize, tree: PathTree) {
        self.nodes[idx].set_path_tree(tree);
    }

    /// Switch a batch of links off without refreshing routing state.
    /// The caller refreshes once the batch is done.
    pub(crate) fn switch_off_links_quietly(&mut self, link_indices: &[usize]) -> Result<()> {
        for &idx in link_indices {
            self.set_link_status(idx, Status::Off)?;
        }
        self.rebuild_reachability();
        Ok(())
    }

    pub(crate) fn turn_on_links_quietly(&mut self, link_indices: &[usize]) -> Result<()> {
        for &idx in link_indices {
            if !self.links[idx].is_on() {
                self.set_link_status(idx, Status::On)?;
            }
        }
        self.rebuild_reachability();
        Ok(())
    }

    fn link_idx(&self, id: &str) -> Result<usize> {
        self.link_index
            .get(id)
            .copied()
            .ok_or_else(|| TopologyError::UnknownLink(id.to_string()))
    }

    /// Link indices along a path; fails on unknown nodes or missing links
    fn resolve_path(&self, path: &[String]) -> Result<Vec<usize>> {
        path.windows(2)
            .map(|hop| {
                let a = self.index_of(&hop[0])?;
                let b = self.index_of(&hop[1])?;
                self.link_idx_between(a, b).ok_or_else(|| TopologyError::NotNeighbors {
                    from: hop[0].clone(),
                    to: hop[1].clone(),
                })
            })
            .collect()
    }

    fn set_link_status(&mut self, idx: usize, status: Status) -> Result<()> {
        let link = &self.links[idx];
        if link.status() == status {
            return Err(TopologyError::transition(format!("link {}", link.id()), format!("already {}", status)));
        }
        let a = self.node_index[link.node1()];
        let b = self.node_index[link.node2()];

        match status {
            Status::Off => {
                self.nodes[a].shutdown_link(link)?;
                self.nodes[b].shutdown_link(link)?;
            }
            Status::On => {
                if !self.nodes[a].is_on() || !self.nodes[b].is_on() {
                    return Err(TopologyError::transition(
                        format!("link {}", link.id()),
                        "an endpoint node is off",
                    ));
                }
                self.nodes[a].startup_link(link)?;
                self.nodes[b].startup_link(link)?;
            }
        }
        self.links[idx].set_status(status);
        debug!("Link {} is now {}", self.links[idx].id(), status);
        Ok(())
    }

    /// Depth-first search from every node over active outgoing links
    fn rebuild_reachability(&mut self) {
        let n = self.nodes.len();
        let mut matrix = vec![vec![false; n]; n];
        for (start, row) in matrix.iter_mut().enumerate() {
            if !self.nodes[start].is_on() {
                continue;
            }
            let mut stack = vec![start];
            row[start] = true;
            while let Some(current) = stack.pop() {
                for next in self.successors(current) {
                    if !row[next] {
                        row[next] = true;
                        stack.push(next);
                    }
                }
            }
        }
        self.reachability = matrix;
    }
}
