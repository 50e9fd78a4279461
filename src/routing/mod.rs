//! Routing methods.
//!
//! A topology is built with exactly one [`RoutingMethod`]. The method is
//! initialised when the topology is constructed, refreshed whenever a link
//! or node changes status, and asked for a path on every
//! [`Topology::get_path`] call:
//!
//! - `Dijkstra`: per-node shortest-path trees over capacity-derived costs.
//! - `EAR`: energy-aware routing; edge/intermediate router roles, modified
//!   path trees and shutdown of links no tree uses.
//! - `MORA`: multi-objective genetic optimisation of each flow's path.
//! - `HopByHop`: minimum marginal-power path towards the destination.

pub mod dijkstra;
pub mod ear;
pub mod hop_by_hop;
pub mod mora;

use crate::error::Result;
use crate::topology::{Flow, Topology};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use ear::EarParams;
pub use mora::{MetaObjective, MoraParams};

/// Routing method and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "method")]
pub enum RoutingMethod {
    #[default]
    Dijkstra,
    #[serde(rename = "EAR")]
    Ear(EarParams),
    #[serde(rename = "MORA")]
    Mora(MoraParams),
    HopByHop,
}

impl RoutingMethod {
    /// Check the method's parameters
    pub fn validate(&self) -> Result<()> {
        match self {
            RoutingMethod::Mora(params) => params.validate(),
            RoutingMethod::Dijkstra | RoutingMethod::Ear(_) | RoutingMethod::HopByHop => Ok(()),
        }
    }
}

impl fmt::Display for RoutingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoutingMethod::Dijkstra => "Dijkstra",
            RoutingMethod::Ear(_) => "EAR",
            RoutingMethod::Mora(_) => "MORA",
            RoutingMethod::HopByHop => "HopByHop",
        };
        write!(f, "{}", name)
    }
}

/// Per-topology state owned by the active routing method
#[derive(Debug)]
pub(crate) enum RoutingState {
    ShortestPath,
    EnergyAware(ear::EarState),
    Genetic(mora::MoraState),
    HopByHop(Vec<f64>),
}

impl RoutingState {
    pub(crate) fn for_method(method: &RoutingMethod) -> Self {
        match method {
            RoutingMethod::Dijkstra => RoutingState::ShortestPath,
            RoutingMethod::Ear(params) => RoutingState::EnergyAware(ear::EarState::new(params.clone())),
            RoutingMethod::Mora(params) => RoutingState::Genetic(mora::MoraState::new(params.clone())),
            RoutingMethod::HopByHop => RoutingState::HopByHop(Vec::new()),
        }
    }
}

enum Step {
    Trees,
    Ear(EarParams),
    Support(usize),
    Estimates,
}

/// Build the method's state from scratch
pub(crate) fn initialize(topology: &mut Topology) -> Result<()> {
    let step = match topology.routing_state() {
        RoutingState::ShortestPath => Step::Trees,
        RoutingState::EnergyAware(state) => Step::Ear(state.params.clone()),
        RoutingState::Genetic(state) => Step::Support(state.params.max_hops),
        RoutingState::HopByHop(_) => Step::Estimates,
    };
    apply(topology, step)
}

/// Bring the method's state in line with a changed operational graph
pub(crate) fn refresh(topology: &mut Topology) -> Result<()> {
    let step = match topology.routing_state() {
        RoutingState::ShortestPath => Step::Trees,
        RoutingState::EnergyAware(state) => Step::Ear(state.params.clone()),
        RoutingState::Genetic(state) => Step::Support(state.params.max_hops),
        RoutingState::HopByHop(_) => Step::Trees,
    };
    apply(topology, step)
}

fn apply(topology: &mut Topology, step: Step) -> Result<()> {
    match step {
        Step::Trees => dijkstra::set_spt(topology),
        Step::Ear(params) => ear::run(topology, &params)?,
        Step::Support(max_hops) => {
            let support = mora::MutationSupport::enumerate(topology, max_hops);
            if let RoutingState::Genetic(state) = topology.routing_state_mut() {
                state.support = support;
            }
        }
        Step::Estimates => {
            dijkstra::set_spt(topology);
            let estimates = hop_by_hop::traffic_estimates(topology);
            *topology.routing_state_mut() = RoutingState::HopByHop(estimates);
        }
    }
    Ok(())
}

/// Path for `flow` under the active method. Reachability is checked by the caller.
pub(crate) fn route(topology: &mut Topology, flow: &Flow) -> Result<Vec<String>> {
    match topology.routing_state() {
        RoutingState::ShortestPath | RoutingState::EnergyAware(_) => topology.get_shortest_path(flow),
        RoutingState::Genetic(state) => mora::optimize_route(topology, state, flow, state.next_seed()),
        RoutingState::HopByHop(estimates) => {
            let src = topology.index_of(&flow.src)?;
            let dst = topology.index_of(&flow.dst)?;
            let path = hop_by_hop::green_path(topology, estimates, src, dst)?;
            Ok(topology.names_of(&path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mora_params_validation() {
        assert!(RoutingMethod::Mora(MoraParams::default()).validate().is_ok());
        for params in [
            MoraParams { max_hops: 0, ..MoraParams::default() },
            MoraParams { population_size: 1, ..MoraParams::default() },
            MoraParams { crossover_probability: 1.5, ..MoraParams::default() },
            MoraParams { mutation_probability: f64::NAN, ..MoraParams::default() },
            MoraParams { penalty_offset: -1.0, ..MoraParams::default() },
        ] {
            assert!(RoutingMethod::Mora(params).validate().is_err());
        }
    }

    #[test]
    fn test_method_from_yaml() {
        let method: RoutingMethod = serde_yaml::from_str("method: Dijkstra").unwrap();
        assert_eq!(method, RoutingMethod::Dijkstra);

        let method: RoutingMethod = serde_yaml::from_str("method: EAR\ner_degree_threshold: 3").unwrap();
        assert_eq!(method, RoutingMethod::Ear(EarParams { er_degree_threshold: 3 }));

        let method: RoutingMethod = serde_yaml::from_str("method: MORA\ngenerations: 4").unwrap();
        match method {
            RoutingMethod::Mora(params) => {
                assert_eq!(params.generations, 4);
                assert_eq!(params.max_hops, 3);
                assert_eq!(params.favored_objective, MetaObjective::Power);
            }
            other => panic!("unexpected method {}", other),
        }

        let method: RoutingMethod = serde_yaml::from_str("method: HopByHop").unwrap();
        assert_eq!(method.to_string(), "HopByHop");
        assert!(serde_yaml::from_str::<RoutingMethod>("method: OSPF").is_err());
    }
}
