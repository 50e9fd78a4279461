//! Shortest-path engine.
//!
//! Link cost is `REFERENCE_BANDWIDTH / capacity`, so fatter links are
//! cheaper. Links that are off cost infinity. Distances come from a
//! binary-heap Dijkstra; equal-cost multi-path (ECMP) enumeration then walks
//! every path whose total cost equals the shortest distance, in node
//! insertion order, and the first one found is the one a shortest-path
//! tree keeps.

use crate::topology::{Link, PathTree, Topology};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Reference bandwidth of the cost model
pub const REFERENCE_BANDWIDTH: f64 = 300_000.0;

/// Relative tolerance for comparing accumulated path costs
const COST_TOLERANCE: f64 = 1e-9;

/// Dense node-by-node cost matrix, in node insertion order
pub type CostMatrix = Vec<Vec<f64>>;

pub fn link_cost(link: &Link) -> f64 {
    if link.is_on() {
        REFERENCE_BANDWIDTH / link.total_bandwidth()
    } else {
        f64::INFINITY
    }
}

pub fn cost_matrix(topology: &Topology) -> CostMatrix {
    let n = topology.node_count();
    let mut costs = vec![vec![f64::INFINITY; n]; n];
    for (a, row) in costs.iter_mut().enumerate() {
        for b in 0..n {
            if let Some(link) = topology.operational_edge(a, b) {
                row[b] = link_cost(link);
            }
        }
    }
    costs
}

#[derive(Debug, PartialEq)]
struct HeapEntry {
    distance: f64,
    node: usize,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    // Reversed so the std max-heap pops the smallest distance first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest distance from `root` to every node
pub fn dijkstra(costs: &[Vec<f64>], root: usize) -> Vec<f64> {
    let n = costs.len();
    let mut distances = vec![f64::INFINITY; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();

    distances[root] = 0.0;
    heap.push(HeapEntry { distance: 0.0, node: root });

    while let Some(HeapEntry { distance, node }) = heap.pop() {
        if settled[node] {
            continue;
        }
        settled[node] = true;

        for (next, &cost) in costs[node].iter().enumerate() {
            if !cost.is_finite() || settled[next] {
                continue;
            }
            let candidate = distance + cost;
            if candidate < distances[next] {
                distances[next] = candidate;
                heap.push(HeapEntry { distance: candidate, node: next });
            }
        }
    }

    distances
}

/// Shortest distances between every pair of nodes
pub fn all_pairs(costs: &[Vec<f64>]) -> Vec<Vec<f64>> {
    (0..costs.len()).into_par_iter().map(|root| dijkstra(costs, root)).collect()
}

fn within(cost: f64, bound: f64) -> bool {
    cost <= bound + COST_TOLERANCE * bound.abs().max(1.0)
}

fn same_cost(a: f64, b: f64) -> bool {
    (a - b).abs() <= COST_TOLERANCE * b.abs().max(1.0)
}

/// Every minimum-cost path from `src` to `dst`, in depth-first discovery order.
///
/// `distances` are the shortest distances from `src`. A prefix is only
/// extended to a node it reaches at that node's shortest distance and
/// within the distance to `dst`. `limit` stops the walk after that many
/// paths.
pub fn equal_cost_paths(
    costs: &[Vec<f64>],
    distances: &[f64],
    src: usize,
    dst: usize,
    limit: Option<usize>,
) -> Vec<Vec<usize>> {
    if !distances[dst].is_finite() {
        return Vec::new();
    }
    if src == dst {
        return vec![vec![src]];
    }

    let mut walk = EcmpWalk {
        costs,
        distances,
        dst,
        limit: limit.unwrap_or(usize::MAX),
        on_path: vec![false; costs.len()],
        prefix: vec![src],
        found: Vec::new(),
    };
    walk.on_path[src] = true;
    walk.extend(src, 0.0);
    walk.found
}

struct EcmpWalk<'a> {
    costs: &'a [Vec<f64>],
    distances: &'a [f64],
    dst: usize,
    limit: usize,
    on_path: Vec<bool>,
    prefix: Vec<usize>,
    found: Vec<Vec<usize>>,
}

impl EcmpWalk<'_> {
    fn extend(&mut self, current: usize, cost: f64) {
        if current == self.dst {
            if same_cost(cost, self.distances[self.dst]) {
                self.found.push(self.prefix.clone());
            }
            return;
        }

        for next in 0..self.costs.len() {
            if self.found.len() >= self.limit {
                return;
            }
            let step = self.costs[current][next];
            if !step.is_finite() || self.on_path[next] {
                continue;
            }
            let reached = cost + step;
            if !within(reached, self.distances[next]) || !within(reached, self.distances[self.dst]) {
                continue;
            }

            self.on_path[next] = true;
            self.prefix.push(next);
            self.extend(next, reached);
            self.prefix.pop();
            self.on_path[next] = false;
        }
    }
}

/// First ECMP path from `src` to every reachable node, keyed by destination name
pub fn shortest_path_tree(topology: &Topology, costs: &[Vec<f64>], distances: &[f64], src: usize) -> PathTree {
    let mut tree = PathTree::new();
    if !topology.node_at(src).is_on() {
        return tree;
    }
    for dst in (0..costs.len()).filter(|&d| d != src) {
        if let Some(path) = equal_cost_paths(costs, distances, src, dst, Some(1)).into_iter().next() {
            tree.insert(topology.node_at(dst).name().to_string(), topology.names_of(&path));
        }
    }
    tree
}

/// Recompute every node's shortest-path tree over the operational graph
pub fn set_spt(topology: &mut Topology) {
    let costs = cost_matrix(topology);
    let distances = all_pairs(&costs);
    let trees: Vec<PathTree> = {
        let topology = &*topology;
        (0..costs.len())
            .into_par_iter()
            .map(|src| shortest_path_tree(topology, &costs, &distances[src], src))
            .collect()
    };
    for (idx, tree) in trees.into_iter().enumerate() {
        topology.set_path_tree_at(idx, tree);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RoutingMethod;
    use crate::topology::{LinkDescriptor, NodeDescriptor, TopologyDescriptor};

    fn topology(nodes: &[&str], links: &[(&str, &str, f64)]) -> Topology {
        let descriptor = TopologyDescriptor {
            nodes: nodes.iter().map(|n| NodeDescriptor::new(*n)).collect(),
            links: links.iter().map(|(a, b, bw)| LinkDescriptor::new(*a, *b, *bw)).collect(),
        }
        .with_reverse_links();
        Topology::from_descriptor("test", &descriptor, RoutingMethod::Dijkstra).unwrap()
    }

    #[test]
    fn test_cost_matrix() {
        let mut topo = topology(&["A", "B"], &[("A", "B", 1000.0)]);
        let costs = cost_matrix(&topo);
        assert_eq!(costs[0][1], 300.0);
        assert!(costs[0][0].is_infinite());

        topo.switch_off_link("AB").unwrap();
        let costs = cost_matrix(&topo);
        assert!(costs[0][1].is_infinite());
        assert_eq!(costs[1][0], 300.0);
    }

    #[test]
    fn test_dijkstra_prefers_capacity() {
        // A-B-C over fat links beats the thin direct A-C link
        let topo = topology(
            &["A", "B", "C"],
            &[("A", "B", 300_000.0), ("B", "C", 300_000.0), ("A", "C", 1000.0)],
        );
        let costs = cost_matrix(&topo);
        let distances = dijkstra(&costs, 0);
        assert_eq!(distances, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_unreachable_is_infinite() {
        let topo = topology(&["A", "B", "C"], &[("A", "B", 10.0)]);
        let distances = dijkstra(&cost_matrix(&topo), 0);
        assert!(distances[2].is_infinite());
        assert!(equal_cost_paths(&cost_matrix(&topo), &distances, 0, 2, None).is_empty());
    }

    #[test]
    fn test_ecmp_enumerates_all_equal_paths() {
        let topo = topology(
            &["A", "B", "C", "D", "E"],
            &[("A", "B", 10.0), ("B", "E", 10.0), ("A", "C", 10.0), ("C", "E", 10.0), ("A", "D", 5.0), ("D", "E", 5.0)],
        );
        let costs = cost_matrix(&topo);
        let distances = dijkstra(&costs, 0);
        let paths = equal_cost_paths(&costs, &distances, 0, 4, None);
        assert_eq!(paths, vec![vec![0, 1, 4], vec![0, 2, 4]]);

        let first = equal_cost_paths(&costs, &distances, 0, 4, Some(1));
        assert_eq!(first, vec![vec![0, 1, 4]]);
    }

    #[test]
    fn test_path_to_self() {
        let topo = topology(&["A", "B"], &[("A", "B", 10.0)]);
        let costs = cost_matrix(&topo);
        let distances = dijkstra(&costs, 0);
        assert_eq!(equal_cost_paths(&costs, &distances, 0, 0, None), vec![vec![0]]);
    }

    #[test]
    fn test_set_spt_fills_trees() {
        let topo = topology(&["A", "B", "C"], &[("A", "B", 10.0), ("B", "C", 10.0)]);
        let tree = topo.node("A").unwrap().path_tree();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree["C"], vec!["A", "B", "C"]);
        assert!(!tree.contains_key("A"));
    }
}
