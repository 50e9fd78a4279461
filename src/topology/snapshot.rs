//! Flat export of the current topology state.
//!
//! A snapshot is two keyed collections, `nodes` and `links`, each entry a
//! flat attribute map. It is written as `nodes.json` and `links.json` so
//! external tooling can pick either up independently. Snapshots are
//! best-effort: nothing is ever read back into a live topology.

use super::graph::Topology;
use super::types::{Role, Status};
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub pop: serde_json::Value,
    pub links: Vec<String>,
    pub active_links: Vec<String>,
    pub neighbors: Vec<String>,
    pub active_neighbors: Vec<String>,
    pub status: Status,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: String,
    pub node1: String,
    pub node2: String,
    pub bw: f64,
    pub len: f64,
    pub delay: f64,
    pub jitter: f64,
    pub loss: f64,
    pub alu: f64,
    pub status: Status,
    pub consumed_bw: f64,
    pub bw_usage: f64,
    pub service_flows: Vec<String>,
    pub power_consumption: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub name: String,
    pub exported_at: String,
    pub nodes: BTreeMap<String, NodeRecord>,
    pub links: BTreeMap<String, LinkRecord>,
}

impl TopologySnapshot {
    /// Write `nodes.json` and `links.json` into `dir`, creating it if needed
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join("nodes.json"), serde_json::to_string_pretty(&self.nodes)?)?;
        fs::write(dir.join("links.json"), serde_json::to_string_pretty(&self.links)?)?;
        info!("Snapshot of '{}' written to {}", self.name, dir.display());
        Ok(())
    }
}

impl Topology {
    pub fn snapshot(&self) -> TopologySnapshot {
        let nodes = self
            .nodes()
            .iter()
            .map(|n| {
                let record = NodeRecord {
                    id: n.name().to_string(),
                    pop: n.pop().clone(),
                    links: n.links().to_vec(),
                    active_links: n.active_links().to_vec(),
                    neighbors: n.neighbors().to_vec(),
                    active_neighbors: n.active_neighbors().to_vec(),
                    status: n.status(),
                    role: n.role(),
                };
                (record.id.clone(), record)
            })
            .collect();

        let links = self
            .links()
            .iter()
            .map(|l| {
                let record = LinkRecord {
                    id: l.id().to_string(),
                    node1: l.node1().to_string(),
                    node2: l.node2().to_string(),
                    bw: l.total_bandwidth(),
                    len: l.length(),
                    delay: l.latency(),
                    jitter: l.jitter(),
                    loss: l.loss(),
                    alu: l.average_link_usage(),
                    status: l.status(),
                    consumed_bw: l.consumed_bandwidth(),
                    bw_usage: l.bandwidth_usage(),
                    service_flows: l.service_flows().iter().cloned().collect(),
                    power_consumption: l.power_consumption(),
                };
                (record.id.clone(), record)
            })
            .collect();

        TopologySnapshot {
            name: self.name().to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            nodes,
            links,
        }
    }
}
