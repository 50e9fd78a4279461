//! Green hop-by-hop routing.
//!
//! Every node estimates the traffic it sinks as its incoming capacity
//! divided by 800. A path towards `dst` minimises the marginal power of
//! pushing that estimate over each link on top of the link's historical
//! average usage, `P(alu + x) - P(alu)`. The estimate grows with the
//! distance left to travel: on a link leaving node `u`,
//! `x = x0(dst) * 1.5^len(spt(u, dst))`, where the length counts the nodes
//! of `u`'s shortest path to `dst`. Because an idle link pays the full
//! fixed power cost, traffic is pulled onto links that are already lit.

use crate::error::{Result, TopologyError};
use crate::topology::Topology;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Incoming capacity divisor for the per-node traffic estimate
const TRAFFIC_ESTIMATE_DIVISOR: f64 = 800.0;

/// Growth of the traffic estimate per node still ahead of it
const DISTANCE_BETA: f64 = 1.5;

/// Traffic estimate of every node, in insertion order
pub fn traffic_estimates(topology: &Topology) -> Vec<f64> {
    let mut estimates = vec![0.0; topology.node_count()];
    for link in topology.links() {
        if let Ok(idx) = topology.index_of(link.node2()) {
            estimates[idx] += link.total_bandwidth();
        }
    }
    estimates.iter().map(|capacity| capacity / TRAFFIC_ESTIMATE_DIVISOR).collect()
}

#[derive(PartialEq)]
struct Entry {
    weight: f64,
    node: usize,
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.weight.total_cmp(&self.weight).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Traffic estimate for `dst` as seen from `from`, scaled by the node
/// count of `from`'s shortest path to `dst`
fn scaled_estimate(topology: &Topology, x0: f64, from: usize, dst: usize) -> f64 {
    let dst_name = topology.node_at(dst).name();
    let nodes = topology.node_at(from).path_to(dst_name).map_or(0, <[String]>::len);
    x0 * DISTANCE_BETA.powi(nodes as i32)
}

/// Minimum marginal-power path from `src` to `dst` over operational links.
///
/// Runs Dijkstra backwards from `dst`, so every settled node knows its
/// next hop towards the destination. Reads the nodes' shortest-path trees,
/// which must be current.
pub fn green_path(topology: &Topology, estimates: &[f64], src: usize, dst: usize) -> Result<Vec<usize>> {
    let n = topology.node_count();
    let x0 = estimates.get(dst).copied().unwrap_or(0.0);

    let mut weights = vec![f64::INFINITY; n];
    let mut next_hop: Vec<Option<usize>> = vec![None; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();

    weights[dst] = 0.0;
    heap.push(Entry { weight: 0.0, node: dst });

    while let Some(Entry { weight, node }) = heap.pop() {
        if settled[node] {
            continue;
        }
        settled[node] = true;
        if node == src {
            break;
        }

        for prev in topology.predecessors(node) {
            if settled[prev] {
                continue;
            }
            let Some(link) = topology.operational_edge(prev, node) else {
                continue;
            };
            let usage = link.average_link_usage();
            let x = scaled_estimate(topology, x0, prev, dst);
            let candidate = weight + link.power_at(usage + x) - link.power_at(usage);
            if candidate < weights[prev] {
                weights[prev] = candidate;
                next_hop[prev] = Some(node);
                heap.push(Entry { weight: candidate, node: prev });
            }
        }
    }

    if !settled[src] {
        return Err(TopologyError::NoPath {
            src: topology.node_at(src).name().to_string(),
            dst: topology.node_at(dst).name().to_string(),
        });
    }

    let mut path = vec![src];
    let mut current = src;
    while current != dst {
        match next_hop[current] {
            Some(next) => {
                path.push(next);
                current = next;
            }
            None => break,
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RoutingMethod;
    use crate::topology::{Flow, LinkDescriptor, NodeDescriptor, ServiceClass, TopologyDescriptor};

    fn square(alu_direct: f64) -> Topology {
        let mut direct = LinkDescriptor::new("A", "C", 800.0);
        direct.alu = alu_direct;
        let mut ab = LinkDescriptor::new("A", "B", 800.0);
        ab.alu = 50.0;
        let mut bc = LinkDescriptor::new("B", "C", 800.0);
        bc.alu = 50.0;
        let descriptor = TopologyDescriptor {
            nodes: ["A", "B", "C"].iter().map(|n| NodeDescriptor::new(*n)).collect(),
            links: vec![ab, bc, direct],
        }
        .with_reverse_links();
        Topology::from_descriptor("square", &descriptor, RoutingMethod::HopByHop).unwrap()
    }

    #[test]
    fn test_traffic_estimates() {
        let topo = square(0.0);
        // C sinks A->C and B->C, 800 each
        assert_eq!(traffic_estimates(&topo)[2], 2.0);
    }

    #[test]
    fn test_estimate_scales_with_distance() {
        let topo = square(0.0);
        // A reaches C directly: two nodes on its shortest path
        assert!((scaled_estimate(&topo, 2.0, 0, 2) - 4.5).abs() < 1e-12);
        // No tree entry for the destination itself: the estimate is unscaled
        assert!((scaled_estimate(&topo, 2.0, 2, 2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_prefers_lit_links() {
        // The direct link is idle, so its fixed power makes the detour cheaper
        let mut topo = square(0.0);
        let flow = Flow::new("f", "A", "C", 1.0, ServiceClass::BestEffort);
        assert_eq!(topo.get_path(&flow).unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_direct_when_lit() {
        let mut topo = square(50.0);
        let flow = Flow::new("f", "A", "C", 1.0, ServiceClass::BestEffort);
        assert_eq!(topo.get_path(&flow).unwrap(), vec!["A", "C"]);
    }
}
