//! Scenario runner.
//!
//! Drives a topology through one scripted run: every configured flow is
//! routed and admitted in order, then each failure node is shut down and
//! the flows it disrupted are cleared and re-admitted on what is left.

use crate::config::ScenarioConfig;
use crate::error::TopologyError;
use crate::topology::{Flow, ReliabilityScore, Topology};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub topology: String,
    pub routing_method: String,
    pub generated_at: String,
    pub node_count: usize,
    pub link_count: usize,
    pub active_links: usize,
    /// Flows admitted on first routing, in admission order
    pub admitted: Vec<String>,
    /// Flows that could not be routed, with the reason
    pub rejected: BTreeMap<String, String>,
    pub failed_nodes: Vec<String>,
    /// Flows that rode a failed node, in discovery order
    pub disrupted: Vec<String>,
    /// Disrupted flows admitted again on a new path
    pub rerouted: Vec<String>,
    /// Disrupted flows with no surviving path, with the reason
    pub dropped: BTreeMap<String, String>,
    /// Current path of every flow still on the network
    pub paths: BTreeMap<String, Vec<String>>,
    pub reliability: ReliabilityScore,
    pub power_consumption: f64,
    pub link_usages: BTreeMap<String, f64>,
}

/// Route and place a flow under the topology's routing method
pub fn admit(topology: &mut Topology, flow: &Flow) -> std::result::Result<Vec<String>, TopologyError> {
    let path = topology.get_path(flow)?;
    topology.apply_service_on_network(flow, &path)?;
    Ok(path)
}

/// Run the scenario against `topology`
pub fn run(topology: &mut Topology, scenario: &ScenarioConfig) -> Result<ScenarioReport> {
    let mut admitted = Vec::new();
    let mut rejected = BTreeMap::new();
    let mut paths = BTreeMap::new();

    for flow in &scenario.flows {
        match admit(topology, flow) {
            Ok(path) => {
                info!("Admitted flow {} on {}", flow.id, path.join("-"));
                admitted.push(flow.id.clone());
                paths.insert(flow.id.clone(), path);
            }
            Err(e) => {
                warn!("Rejected flow {}: {}", flow.id, e);
                rejected.insert(flow.id.clone(), e.to_string());
            }
        }
    }

    let mut disrupted: Vec<String> = Vec::new();
    let mut rerouted = Vec::new();
    let mut dropped = BTreeMap::new();

    for node in &scenario.failures {
        let hit = topology
            .shutdown_node(node)
            .wrap_err_with(|| format!("Failed to shut down node '{}'", node))?;

        for flow_id in hit {
            let Some(flow) = topology.current_flows().iter().find(|f| f.id == flow_id).cloned() else {
                continue;
            };
            if !disrupted.contains(&flow_id) {
                disrupted.push(flow_id.clone());
            }
            topology.clear_flow_from_network(&flow);
            paths.remove(&flow.id);
            rerouted.retain(|id| id != &flow.id);

            match admit(topology, &flow) {
                Ok(path) => {
                    info!("Rerouted flow {} on {}", flow.id, path.join("-"));
                    rerouted.push(flow.id.clone());
                    paths.insert(flow.id.clone(), path);
                }
                Err(e) => {
                    warn!("Dropped flow {} after failure of {}: {}", flow.id, node, e);
                    dropped.insert(flow.id.clone(), e.to_string());
                }
            }
        }
    }

    info!(
        "Scenario finished: {} admitted, {} rejected, {} disrupted, {} rerouted, {} dropped",
        admitted.len(),
        rejected.len(),
        disrupted.len(),
        rerouted.len(),
        dropped.len()
    );

    Ok(ScenarioReport {
        topology: topology.name().to_string(),
        routing_method: topology.routing_method().to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        node_count: topology.node_count(),
        link_count: topology.links().len(),
        active_links: topology.active_link_count(),
        admitted,
        rejected,
        failed_nodes: scenario.failures.clone(),
        disrupted,
        rerouted,
        dropped,
        paths,
        reliability: topology.reliability_score(),
        power_consumption: topology.power_consumption(),
        link_usages: topology.link_usages(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RoutingMethod;
    use crate::topology::{LinkDescriptor, NodeDescriptor, ServiceClass, TopologyDescriptor};

    fn ring() -> Topology {
        let descriptor = TopologyDescriptor {
            nodes: ["A", "B", "C", "D"].iter().map(|n| NodeDescriptor::new(*n)).collect(),
            links: vec![
                LinkDescriptor::new("A", "B", 10.0),
                LinkDescriptor::new("B", "C", 10.0),
                LinkDescriptor::new("C", "D", 10.0),
                LinkDescriptor::new("D", "A", 10.0),
            ],
        }
        .with_reverse_links();
        Topology::from_descriptor("ring", &descriptor, RoutingMethod::Dijkstra).unwrap()
    }

    #[test]
    fn test_failure_reroutes_flow() {
        let mut topo = ring();
        let scenario = ScenarioConfig {
            flows: vec![Flow::new("AC", "A", "C", 4.0, ServiceClass::Premium)],
            flows_path: None,
            failures: vec![],
        };
        let report = run(&mut topo, &scenario).unwrap();
        let first = report.paths["AC"].clone();
        assert_eq!(report.admitted, vec!["AC"]);

        let via = first[1].clone();
        let mut topo = ring();
        let scenario = ScenarioConfig {
            failures: vec![via.clone()],
            ..scenario
        };
        let report = run(&mut topo, &scenario).unwrap();
        assert_eq!(report.disrupted, vec!["AC"]);
        assert_eq!(report.rerouted, vec!["AC"]);
        assert!(!report.paths["AC"].contains(&via));
        assert_eq!(topo.current_flows().len(), 1);
    }

    #[test]
    fn test_unroutable_flow_rejected() {
        let mut topo = ring();
        let scenario = ScenarioConfig {
            flows: vec![
                Flow::new("AZ", "A", "Z", 1.0, ServiceClass::BestEffort),
                Flow::new("AB", "A", "B", 1.0, ServiceClass::BestEffort),
            ],
            flows_path: None,
            failures: vec![],
        };
        let report = run(&mut topo, &scenario).unwrap();
        assert!(report.rejected.contains_key("AZ"));
        assert_eq!(report.admitted, vec!["AB"]);
    }

    #[test]
    fn test_isolated_destination_dropped() {
        let mut topo = ring();
        let scenario = ScenarioConfig {
            flows: vec![Flow::new("AC", "A", "C", 1.0, ServiceClass::BestEffort)],
            flows_path: None,
            failures: vec!["C".to_string()],
        };
        let report = run(&mut topo, &scenario).unwrap();
        assert_eq!(report.disrupted, vec!["AC"]);
        assert!(report.dropped.contains_key("AC"));
        assert!(report.paths.is_empty());
        assert!(topo.current_flows().is_empty());
        assert!(topo.links().iter().all(|l| l.consumed_bandwidth() == 0.0));
    }

    #[test]
    fn test_unknown_failure_node_is_an_error() {
        let mut topo = ring();
        let scenario = ScenarioConfig {
            failures: vec!["Z".to_string()],
            ..ScenarioConfig::default()
        };
        assert!(run(&mut topo, &scenario).is_err());
    }
}
