//! Energy-aware routing (EAR).
//!
//! Three phases:
//! 1. Role assignment. Nodes are visited by descending degree (ties keep
//!    insertion order). A node next to an edge router (ER) becomes an
//!    intermediate router (IR); a node with no ER neighbor and a degree above
//!    the threshold becomes an ER; everything else stays a normal router (NR).
//! 2. Path trees. ER and NR nodes get their shortest-path tree. Each IR takes
//!    the tree of its nearest ER neighbor and splices itself onto it,
//!    producing a modified path tree (MPT).
//! 3. Pruning. Links that are not the first hop of any tree path, and carry
//!    no flow, are switched off and every tree is computed again on what is
//!    left.
//!
//! The links switched off by pruning are remembered. Every run, including
//! the one triggered by a link or node status change, first turns them back
//! on where both endpoints are still up, so the phases always start from
//! the full graph minus real failures.

use super::dijkstra::{all_pairs, cost_matrix, shortest_path_tree};
use super::RoutingState;
use crate::error::Result;
use crate::topology::{PathTree, Role, Topology};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarParams {
    /// A node needs more neighbors than this to become an edge router
    pub er_degree_threshold: usize,
}

impl Default for EarParams {
    fn default() -> Self {
        Self { er_degree_threshold: 2 }
    }
}

/// EAR state kept on the topology: parameters and the links pruning switched off
#[derive(Debug, Clone, Default)]
pub(crate) struct EarState {
    pub(crate) params: EarParams,
    pub(crate) pruned: Vec<usize>,
}

impl EarState {
    pub(crate) fn new(params: EarParams) -> Self {
        Self {
            params,
            pruned: Vec::new(),
        }
    }
}

/// Run all three phases, starting from the graph as it was before the last pruning
pub fn run(topology: &mut Topology, params: &EarParams) -> Result<()> {
    restore_pruned_links(topology)?;
    assign_roles(topology, params.er_degree_threshold);
    compute_trees(topology);
    let pruned = prune_unused_links(topology)?;
    if let RoutingState::EnergyAware(state) = topology.routing_state_mut() {
        state.pruned = pruned;
    }
    compute_trees(topology);
    Ok(())
}

/// Turn back on every previously pruned link whose endpoints are both up
fn restore_pruned_links(topology: &mut Topology) -> Result<()> {
    let pruned = match topology.routing_state_mut() {
        RoutingState::EnergyAware(state) => std::mem::take(&mut state.pruned),
        _ => return Ok(()),
    };
    let revivable: Vec<usize> = pruned
        .into_iter()
        .filter(|&idx| {
            let link = &topology.links()[idx];
            let up = |name: &str| topology.node(name).is_ok_and(|n| n.is_on());
            !link.is_on() && up(link.node1()) && up(link.node2())
        })
        .collect();
    if !revivable.is_empty() {
        debug!("EAR restoring {} pruned links", revivable.len());
        topology.turn_on_links_quietly(&revivable)?;
    }
    Ok(())
}

/// Phase 1. Roles are reset to NR first so the phase can be re-run.
pub fn assign_roles(topology: &mut Topology, threshold: usize) {
    let n = topology.node_count();
    for idx in 0..n {
        topology.set_role_at(idx, Role::Normal);
    }

    let mut ranked: Vec<usize> = (0..n).filter(|&i| topology.node_at(i).is_on()).collect();
    ranked.sort_by(|&a, &b| topology.node_at(b).degree().cmp(&topology.node_at(a).degree()));

    let mut roles = vec![Role::Normal; n];
    for idx in ranked {
        let node = topology.node_at(idx);
        let neighbor_roles: Vec<Role> = node
            .neighbors()
            .iter()
            .filter_map(|name| topology.index_of(name).ok())
            .map(|i| roles[i])
            .collect();

        if neighbor_roles.contains(&Role::Edge) {
            roles[idx] = Role::Intermediate;
        } else if node.degree() > threshold {
            roles[idx] = Role::Edge;
        }
    }

    for (idx, role) in roles.iter().enumerate() {
        topology.set_role_at(idx, *role);
    }
    info!(
        "EAR roles: {} ER, {} IR, {} NR",
        roles.iter().filter(|r| **r == Role::Edge).count(),
        roles.iter().filter(|r| **r == Role::Intermediate).count(),
        roles.iter().filter(|r| **r == Role::Normal).count()
    );
}

/// Phase 2. Shortest-path trees for ER/NR nodes, modified trees for IR nodes.
pub fn compute_trees(topology: &mut Topology) {
    let costs = cost_matrix(topology);
    let distances = all_pairs(&costs);
    let n = topology.node_count();

    let mut trees: Vec<PathTree> = (0..n)
        .map(|src| shortest_path_tree(topology, &costs, &distances[src], src))
        .collect();

    let intermediates: Vec<usize> = (0..n)
        .filter(|&i| topology.node_at(i).role() == Role::Intermediate && topology.node_at(i).is_on())
        .collect();

    for ir in intermediates {
        match nearest_edge_router(topology, &distances, ir) {
            Some(er) => {
                let modified = modified_path_tree(topology, ir, er, &trees[er], &trees[ir]);
                trees[ir] = modified;
            }
            None => warn!(
                "No reachable ER next to IR {}, keeping its shortest-path tree",
                topology.node_at(ir).name()
            ),
        }
    }

    for (idx, tree) in trees.into_iter().enumerate() {
        topology.set_path_tree_at(idx, tree);
    }
}

/// ER neighbor of `ir` with the smallest distance; ties keep neighbor order
fn nearest_edge_router(topology: &Topology, distances: &[Vec<f64>], ir: usize) -> Option<usize> {
    topology
        .node_at(ir)
        .neighbors()
        .iter()
        .filter_map(|name| topology.index_of(name).ok())
        .filter(|&er| {
            let node = topology.node_at(er);
            node.is_on() && node.role() == Role::Edge && distances[ir][er].is_finite()
        })
        .fold(None, |best: Option<usize>, er| match best {
            Some(b) if distances[ir][b] <= distances[ir][er] => Some(b),
            _ => Some(er),
        })
}

/// Splice `ir` onto the tree of `er`.
///
/// - the ER->IR path, reversed, becomes the IR->ER path;
/// - a destination whose ER path already crosses the IR keeps the part
///   after the IR;
/// - any other destination gets the reversed ER->IR path (minus the ER)
///   followed by the ER's own path.
///
/// Spliced paths that repeat a node are loop-erased. Entries that are not
/// valid on the operational graph fall back to the IR's own shortest path.
fn modified_path_tree(topology: &Topology, ir: usize, er: usize, er_tree: &PathTree, ir_spt: &PathTree) -> PathTree {
    let ir_name = topology.node_at(ir).name();
    let er_name = topology.node_at(er).name();

    let Some(er_to_ir) = er_tree.get(ir_name) else {
        return ir_spt.clone();
    };
    let mut lead: Vec<String> = er_to_ir.iter().rev().cloned().collect();
    lead.pop();

    let mut tree = ir_spt.clone();
    for (destination, path) in er_tree {
        let (key, candidate) = if destination == ir_name {
            (er_name.to_string(), path.iter().rev().cloned().collect::<Vec<_>>())
        } else if let Some(position) = path.iter().position(|n| n == ir_name) {
            (destination.clone(), path[position..].to_vec())
        } else {
            let mut spliced = lead.clone();
            spliced.extend(path.iter().cloned());
            (destination.clone(), erase_loops(spliced))
        };

        if topology.is_valid_path(&candidate) {
            tree.insert(key, candidate);
        } else {
            debug!("MPT entry {} -> {} is not operational, keeping shortest path", ir_name, key);
        }
    }
    tree
}

/// Cut out every cycle: on revisiting a node, drop everything since its first visit
fn erase_loops(path: Vec<String>) -> Vec<String> {
    let mut erased: Vec<String> = Vec::with_capacity(path.len());
    for node in path {
        if let Some(position) = erased.iter().position(|n| *n == node) {
            erased.truncate(position + 1);
        } else {
            erased.push(node);
        }
    }
    erased
}

/// Phase 3. Switch off every link that is not the first hop of some tree
/// path and carries no flow.
///
/// Any source/destination pair that loses reachability gets the links of
/// its tree path switched back on. Returns the links left off.
pub fn prune_unused_links(topology: &mut Topology) -> Result<Vec<usize>> {
    let before: Vec<Vec<bool>> = topology.reachability_matrix().to_vec();
    let n = topology.node_count();

    let mut used = BTreeSet::new();
    for idx in 0..n {
        for path in topology.node_at(idx).path_tree().values() {
            if let Some(link) = first_hop(topology, path) {
                used.insert(link);
            }
        }
    }

    let unused: Vec<usize> = topology
        .links()
        .iter()
        .enumerate()
        .filter(|(idx, link)| link.is_on() && !used.contains(idx) && link.service_flows().is_empty())
        .map(|(idx, _)| idx)
        .collect();
    topology.switch_off_links_quietly(&unused)?;

    let mut restore = BTreeSet::new();
    let after = topology.reachability_matrix();
    for src in 0..n {
        for dst in 0..n {
            if before[src][dst] && !after[src][dst] {
                let dst_name = topology.node_at(dst).name();
                if let Some(path) = topology.node_at(src).path_to(dst_name) {
                    restore.extend(path_links(topology, path));
                }
            }
        }
    }
    let restore: Vec<usize> = restore.into_iter().collect();
    if !restore.is_empty() {
        warn!("EAR pruning cut reachability, restoring {} links", restore.len());
        topology.turn_on_links_quietly(&restore)?;
    }

    info!(
        "EAR pruned {} links ({} restored), {} of {} remain on",
        unused.len(),
        restore.len(),
        topology.active_link_count(),
        topology.links().len()
    );
    Ok(unused.into_iter().filter(|idx| !restore.contains(idx)).collect())
}

fn first_hop(topology: &Topology, path: &[String]) -> Option<usize> {
    path_links(topology, path.get(..2)?).into_iter().next()
}

fn path_links(topology: &Topology, path: &[String]) -> Vec<usize> {
    let index: HashMap<&str, usize> = path
        .iter()
        .filter_map(|n| topology.index_of(n).ok().map(|i| (n.as_str(), i)))
        .collect();
    path.windows(2)
        .filter_map(|hop| topology.link_idx_between(*index.get(hop[0].as_str())?, *index.get(hop[1].as_str())?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RoutingMethod;
    use crate::topology::{LinkDescriptor, NodeDescriptor, TopologyDescriptor};

    fn names(path: &[&str]) -> Vec<String> {
        path.iter().map(|n| n.to_string()).collect()
    }

    /// Hub H with spokes, plus a second hub G sharing one spoke
    fn hubs() -> TopologyDescriptor {
        let nodes = ["H", "A", "B", "C", "G", "D", "E"];
        let edges = [
            ("H", "A"),
            ("H", "B"),
            ("H", "C"),
            ("A", "B"),
            ("C", "G"),
            ("G", "D"),
            ("G", "E"),
            ("D", "E"),
        ];
        TopologyDescriptor {
            nodes: nodes.iter().map(|n| NodeDescriptor::new(*n)).collect(),
            links: edges.iter().map(|(a, b)| LinkDescriptor::new(*a, *b, 100.0)).collect(),
        }
        .with_reverse_links()
    }

    fn ear_topology() -> Topology {
        Topology::from_descriptor("hubs", &hubs(), RoutingMethod::Ear(EarParams::default())).unwrap()
    }

    #[test]
    fn test_roles() {
        let topo = ear_topology();
        let role = |n: &str| topo.node(n).unwrap().role();
        assert_eq!(role("H"), Role::Edge);
        assert_eq!(role("G"), Role::Edge);
        assert_eq!(role("A"), Role::Intermediate);
        assert_eq!(role("C"), Role::Intermediate);
        assert_eq!(role("D"), Role::Intermediate);
    }

    #[test]
    fn test_role_invariants() {
        let topo = ear_topology();
        for node in topo.nodes() {
            let neighbor_roles: Vec<Role> =
                node.neighbors().iter().map(|n| topo.node(n).unwrap().role()).collect();
            match node.role() {
                Role::Intermediate => assert!(neighbor_roles.contains(&Role::Edge)),
                Role::Edge => assert!(!neighbor_roles.contains(&Role::Edge)),
                Role::Normal => {}
            }
        }
    }

    #[test]
    fn test_erase_loops() {
        assert_eq!(erase_loops(names(&["I", "X", "E", "X", "D"])), names(&["I", "X", "D"]));
        assert_eq!(erase_loops(names(&["I", "E", "D"])), names(&["I", "E", "D"]));
    }

    #[test]
    fn test_intermediate_routes_through_edge_router() {
        let topo = ear_topology();
        // A is an IR hanging off H: its paths to the far side leave via H
        let path = topo.node("A").unwrap().path_to("E").unwrap().to_vec();
        assert_eq!(path[0], "A");
        assert_eq!(path[1], "H");
        assert_eq!(path.last().unwrap(), "E");
        assert!(topo.is_valid_path(&path));
    }

    #[test]
    fn test_pruning_keeps_reachability() {
        let full = Topology::from_descriptor("full", &hubs(), RoutingMethod::Dijkstra).unwrap();
        let pruned = ear_topology();
        assert!(pruned.active_link_count() < full.active_link_count());
        assert_eq!(pruned.reachability_matrix(), full.reachability_matrix());
    }

    #[test]
    fn test_pruned_links_return_after_failure() {
        let mut topo = ear_topology();
        let mut full = Topology::from_descriptor("full", &hubs(), RoutingMethod::Dijkstra).unwrap();
        assert!(!topo.link("AB").unwrap().is_on());

        topo.shutdown_node("H").unwrap();
        full.shutdown_node("H").unwrap();
        assert!(topo.is_reachable("A", "B").unwrap());
        assert_eq!(topo.reachability_matrix(), full.reachability_matrix());

        topo.rerun_ear().unwrap();
        assert_eq!(topo.reachability_matrix(), full.reachability_matrix());
        for node in topo.nodes() {
            for path in node.path_tree().values() {
                assert!(topo.is_valid_path(path), "stale tree path {:?}", path);
            }
        }
    }

    #[test]
    fn test_links_carrying_flows_are_kept() {
        let mut topo = Topology::from_descriptor("hubs", &hubs(), RoutingMethod::Dijkstra).unwrap();
        let flow = crate::topology::Flow::new("AB", "A", "B", 1.0, crate::topology::ServiceClass::BestEffort);
        topo.apply_service_on_network(&flow, &names(&["A", "B"])).unwrap();

        assign_roles(&mut topo, 2);
        compute_trees(&mut topo);
        let pruned = prune_unused_links(&mut topo).unwrap();

        let position = |id: &str| topo.links().iter().position(|l| l.id() == id).unwrap();
        assert!(topo.link("AB").unwrap().is_on());
        assert!(!topo.link("BA").unwrap().is_on());
        assert!(pruned.contains(&position("BA")));
        assert!(!pruned.contains(&position("AB")));
    }

    #[test]
    fn test_rerun_is_stable() {
        let mut topo = ear_topology();
        let roles: Vec<Role> = topo.nodes().iter().map(|n| n.role()).collect();
        topo.rerun_ear().unwrap();
        let again: Vec<Role> = topo.nodes().iter().map(|n| n.role()).collect();
        assert_eq!(roles, again);
    }
}
