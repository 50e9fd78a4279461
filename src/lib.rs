//! # Trafficsim - Traffic engineering testbed
//!
//! This library provides a topology state engine and the routing strategies
//! that operate on it.
//!
//! ## Overview
//!
//! Trafficsim keeps the live state of a network (nodes, directed links,
//! operational status and per-link bandwidth accounting) and routes traffic
//! flows over it. Flows are admitted on paths chosen by the active routing
//! method; links and nodes can fail underneath them.
//!
//! ## Key Features
//!
//! - **Graph Store**: transactional flow admission/removal, node and link
//!   status transitions, reachability and adjacency matrices
//! - **Shortest Paths**: capacity-derived link costs, Dijkstra, equal-cost
//!   multi-path enumeration and per-node shortest-path trees
//! - **Energy-Aware Routing**: edge/intermediate router roles, modified path
//!   trees and shutdown of links no tree needs
//! - **Multi-Objective Routing**: NSGA-II genetic search over paths with
//!   topology-aware crossover and mutation
//! - **Power and Reliability**: per-link power model and utilization risk
//!
//! ## Architecture
//!
//! - `topology`: nodes, links, flows and the `Topology` aggregate
//! - `routing`: Dijkstra/ECMP, EAR, MORA and hop-by-hop green routing
//! - `config`: Type-safe run configuration and validation
//! - `config_loader`: Configuration, descriptor and flow file loading
//! - `scenario`: Scripted admission and failure runs
//! - `report`: JSON and text reports
//! - `error`: Domain error taxonomy
//! - `utils`: Measurement parsing helpers
//!
//! ## Example Usage
//!
//! ```rust
//! use trafficsim::routing::RoutingMethod;
//! use trafficsim::topology::{Flow, LinkDescriptor, NodeDescriptor, ServiceClass, Topology, TopologyDescriptor};
//!
//! let descriptor = TopologyDescriptor {
//!     nodes: ["A", "B", "C"].iter().map(|n| NodeDescriptor::new(*n)).collect(),
//!     links: vec![LinkDescriptor::new("A", "B", 10.0), LinkDescriptor::new("B", "C", 10.0)],
//! }
//! .with_reverse_links();
//!
//! let mut topology = Topology::from_descriptor("line", &descriptor, RoutingMethod::Dijkstra)?;
//! let flow = Flow::new("AC", "A", "C", 4.0, ServiceClass::Premium);
//! let path = topology.get_path(&flow)?;
//! topology.apply_service_on_network(&flow, &path)?;
//!
//! assert_eq!(path, vec!["A", "B", "C"]);
//! assert_eq!(topology.link("AB")?.bandwidth_usage(), 0.4);
//! # Ok::<(), trafficsim::error::TopologyError>(())
//! ```
//!
//! ## Configuration Format
//!
//! Runs are described in YAML:
//!
//! ```yaml
//! general:
//!   name: ring
//!   seed: 7
//!
//! topology:
//!   path: ring.json
//!
//! routing:
//!   method: MORA          # Dijkstra/EAR/MORA/HopByHop
//!   generations: 10
//!   favored_objective: power
//!
//! scenario:
//!   flows:
//!     - { id: AC, node1: A, node2: C, bandwidth: 4.0, class: premium }
//!   failures: [B]
//! ```
//!
//! ## Error Handling
//!
//! Topology operations return `trafficsim::error::Result` with a
//! `TopologyError`; a failed call leaves the topology unchanged. The
//! configuration and scenario layers use `color_eyre` for error reports
//! with context.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod report;
pub mod routing;
pub mod scenario;
pub mod topology;
pub mod utils;
