//! Fitness of a candidate path for one flow.
//!
//! Objectives, all minimised, in this order:
//! `[power delta, max link risk, summed link risk, latency]`.
//! A candidate that breaks the flow's latency bound or over-subscribes a
//! link is penalised with the squared excess latency plus the squared
//! excess bandwidth of every over-subscribed link; the penalty and a fixed
//! offset are added to every objective.

use super::MetaObjective;
use crate::error::{Result, TopologyError};
use crate::topology::{reliability_risk, Flow, Topology};
use serde::Serialize;

pub const OBJECTIVE_COUNT: usize = 4;

pub type Objectives = [f64; OBJECTIVE_COUNT];

/// Raw measurements of a candidate path
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Evaluation {
    pub hops: usize,
    pub latency: f64,
    pub power_delta: f64,
    pub max_risk: f64,
    pub total_risk: f64,
    pub penalty: f64,
}

impl Evaluation {
    pub fn is_feasible(&self) -> bool {
        self.penalty == 0.0
    }

    /// Objective vector used for Pareto ranking
    pub fn objectives(&self, penalty_offset: f64) -> Objectives {
        let raw = [self.power_delta, self.max_risk, self.total_risk, self.latency];
        if self.is_feasible() {
            raw
        } else {
            raw.map(|value| value + penalty_offset + self.penalty)
        }
    }

    /// Value of the single objective used to pick the final answer
    pub fn meta_value(&self, objective: MetaObjective) -> f64 {
        match objective {
            MetaObjective::ShortestPath => self.hops as f64,
            MetaObjective::Latency => self.latency,
            MetaObjective::Power => self.power_delta,
            MetaObjective::Reliability => self.max_risk,
        }
    }
}

/// Evaluate `path` as if `flow` were added on top of the current load
pub fn evaluate(topology: &Topology, flow: &Flow, path: &[usize]) -> Result<Evaluation> {
    let mut evaluation = Evaluation {
        hops: path.len().saturating_sub(1),
        ..Evaluation::default()
    };
    let mut excess_bandwidth = 0.0;

    for hop in path.windows(2) {
        let link = topology.operational_edge(hop[0], hop[1]).ok_or_else(|| {
            TopologyError::invalid_path(
                &flow.id,
                format!(
                    "no operational link from {} to {}",
                    topology.node_at(hop[0]).name(),
                    topology.node_at(hop[1]).name()
                ),
            )
        })?;

        evaluation.latency += link.latency();
        evaluation.power_delta += link.marginal_power(flow.bandwidth);

        let risk = reliability_risk(link.projected_utilization(flow.bandwidth));
        evaluation.max_risk = evaluation.max_risk.max(risk);
        evaluation.total_risk += risk;

        let over = flow.bandwidth - link.available_bandwidth();
        if over > 0.0 {
            excess_bandwidth += over * over;
        }
    }

    let late = evaluation.latency - flow.sla().latency;
    let excess_latency = if late > 0.0 { late * late } else { 0.0 };
    evaluation.penalty = excess_latency + excess_bandwidth;
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RoutingMethod;
    use crate::topology::{power_model, LinkDescriptor, NodeDescriptor, ServiceClass, Sla, TopologyDescriptor};

    fn line() -> Topology {
        let descriptor = TopologyDescriptor {
            nodes: ["A", "B", "C"].iter().map(|n| NodeDescriptor::new(*n)).collect(),
            links: vec![
                LinkDescriptor::new("A", "B", 10.0).with_delay(30.0),
                LinkDescriptor::new("B", "C", 10.0).with_delay(40.0),
            ],
        }
        .with_reverse_links();
        Topology::from_descriptor("line", &descriptor, RoutingMethod::Dijkstra).unwrap()
    }

    #[test]
    fn test_feasible_evaluation() {
        let topo = line();
        let flow = Flow::new("f", "A", "C", 7.0, ServiceClass::Premium);
        let eval = evaluate(&topo, &flow, &[0, 1, 2]).unwrap();
        assert_eq!(eval.hops, 2);
        assert_eq!(eval.latency, 70.0);
        assert!((eval.power_delta - 2.0 * power_model(7.0)).abs() < 1e-9);
        let risk = reliability_risk(0.7);
        assert!((eval.max_risk - risk).abs() < 1e-12);
        assert!((eval.total_risk - 2.0 * risk).abs() < 1e-12);
        assert!(eval.is_feasible());
        assert_eq!(eval.objectives(20.0), [eval.power_delta, eval.max_risk, eval.total_risk, 70.0]);
    }

    #[test]
    fn test_latency_penalty() {
        let topo = line();
        let flow = Flow::new("f", "A", "C", 1.0, ServiceClass::Premium).with_sla(Sla {
            latency: 60.0,
            jitter: 1.0,
            loss: 1.0,
        });
        let eval = evaluate(&topo, &flow, &[0, 1, 2]).unwrap();
        assert_eq!(eval.penalty, 100.0);
        assert_eq!(eval.objectives(20.0)[3], 70.0 + 120.0);
    }

    #[test]
    fn test_capacity_penalty() {
        let topo = line();
        let flow = Flow::new("f", "A", "B", 12.0, ServiceClass::BestEffort);
        let eval = evaluate(&topo, &flow, &[0, 1]).unwrap();
        assert_eq!(eval.penalty, 4.0);
        assert!(!eval.is_feasible());
        assert!(eval.max_risk > 1.0);
    }

    #[test]
    fn test_meta_values() {
        let eval = Evaluation {
            hops: 3,
            latency: 12.0,
            power_delta: 400.0,
            max_risk: 0.2,
            total_risk: 0.3,
            penalty: 0.0,
        };
        assert_eq!(eval.meta_value(MetaObjective::ShortestPath), 3.0);
        assert_eq!(eval.meta_value(MetaObjective::Latency), 12.0);
        assert_eq!(eval.meta_value(MetaObjective::Power), 400.0);
        assert_eq!(eval.meta_value(MetaObjective::Reliability), 0.2);
    }

    #[test]
    fn test_missing_link_is_an_error() {
        let topo = line();
        let flow = Flow::new("f", "A", "C", 1.0, ServiceClass::BestEffort);
        assert!(evaluate(&topo, &flow, &[0, 2]).is_err());
    }
}
