//! Topology type definitions.
//!
//! Operational enums shared by nodes and links, plus the static descriptors
//! a [`Topology`](super::Topology) is built from.

use crate::error::{Result, TopologyError};
use crate::utils::deserialize_measure;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Operational status of a node or link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    On,
    Off,
}

impl Status {
    pub fn is_on(self) -> bool {
        self == Status::On
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::On => write!(f, "on"),
            Status::Off => write!(f, "off"),
        }
    }
}

impl FromStr for Status {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "on" => Ok(Status::On),
            "off" => Ok(Status::Off),
            other => Err(TopologyError::InvalidStatus(other.to_string())),
        }
    }
}

/// Router role assigned by energy-aware routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    /// Normal router
    #[default]
    #[serde(rename = "NR")]
    Normal,
    /// Edge router: keeps its own shortest-path tree
    #[serde(rename = "ER")]
    Edge,
    /// Intermediate router: routes through a neighboring edge router
    #[serde(rename = "IR")]
    Intermediate,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Role::Normal => "NR",
            Role::Edge => "ER",
            Role::Intermediate => "IR",
        };
        write!(f, "{}", code)
    }
}

impl FromStr for Role {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NR" => Ok(Role::Normal),
            "ER" => Ok(Role::Edge),
            "IR" => Ok(Role::Intermediate),
            other => Err(TopologyError::InvalidRole(other.to_string())),
        }
    }
}

/// Static node attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    #[serde(alias = "name")]
    pub id: String,
    /// Point-of-presence metadata, carried through untouched
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub pop: serde_json::Value,
}

impl NodeDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pop: serde_json::Value::Null,
        }
    }
}

/// Static link attributes. The link is directed from `node1` to `node2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    /// Optional explicit id; the effective id is always `node1 + node2`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub node1: String,
    pub node2: String,
    #[serde(alias = "bandwidth", alias = "total_bandwidth", deserialize_with = "deserialize_measure")]
    pub bw: f64,
    #[serde(default, alias = "length", deserialize_with = "deserialize_measure")]
    pub len: f64,
    #[serde(default, alias = "latency", deserialize_with = "deserialize_measure")]
    pub delay: f64,
    #[serde(default, deserialize_with = "deserialize_measure")]
    pub jitter: f64,
    #[serde(default, deserialize_with = "deserialize_measure")]
    pub loss: f64,
    /// Historical average link usage
    #[serde(default, alias = "average_link_usage", deserialize_with = "deserialize_measure")]
    pub alu: f64,
}

impl LinkDescriptor {
    /// Descriptor with the given capacity and every other attribute zeroed
    pub fn new(node1: impl Into<String>, node2: impl Into<String>, bw: f64) -> Self {
        Self {
            id: None,
            node1: node1.into(),
            node2: node2.into(),
            bw,
            len: 0.0,
            delay: 0.0,
            jitter: 0.0,
            loss: 0.0,
            alu: 0.0,
        }
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn link_id(&self) -> String {
        link_id(&self.node1, &self.node2)
    }

    /// Same attributes in the opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            id: None,
            node1: self.node2.clone(),
            node2: self.node1.clone(),
            ..self.clone()
        }
    }
}

/// Link identity: concatenation of the endpoint names
pub fn link_id(node1: &str, node2: &str) -> String {
    format!("{}{}", node1, node2)
}

/// A complete set of node and link descriptors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyDescriptor {
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
    #[serde(default)]
    pub links: Vec<LinkDescriptor>,
}

impl TopologyDescriptor {
    /// Add the reverse of every link that was only given in one direction.
    /// Reverse links are appended after the declared ones.
    pub fn with_reverse_links(mut self) -> Self {
        let declared: HashSet<(String, String)> = self
            .links
            .iter()
            .map(|l| (l.node1.clone(), l.node2.clone()))
            .collect();

        let reverse: Vec<LinkDescriptor> = self
            .links
            .iter()
            .filter(|l| !declared.contains(&(l.node2.clone(), l.node1.clone())))
            .map(LinkDescriptor::reversed)
            .collect();

        self.links.extend(reverse);
        self
    }
}

/// Validate descriptors before a topology is built from them
pub fn validate_descriptors(nodes: &[NodeDescriptor], links: &[LinkDescriptor]) -> Result<()> {
    let mut node_ids = HashSet::new();
    for node in nodes {
        if node.id.is_empty() {
            return Err(TopologyError::InvalidAttribute {
                entity: "node".to_string(),
                attribute: "id".to_string(),
                reason: "node id cannot be empty".to_string(),
            });
        }
        if !node_ids.insert(node.id.as_str()) {
            return Err(TopologyError::DuplicateNode(node.id.clone()));
        }
    }

    let mut link_ids = HashSet::new();
    for link in links {
        let id = link.link_id();
        for endpoint in [&link.node1, &link.node2] {
            if !node_ids.contains(endpoint.as_str()) {
                return Err(TopologyError::DanglingLink {
                    link: id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
        if link.node1 == link.node2 {
            return Err(TopologyError::InvalidAttribute {
                entity: format!("link {}", id),
                attribute: "node2".to_string(),
                reason: "self-loops are not allowed".to_string(),
            });
        }
        if !(link.bw.is_finite() && link.bw > 0.0) {
            return Err(TopologyError::InvalidAttribute {
                entity: format!("link {}", id),
                attribute: "bw".to_string(),
                reason: format!("bandwidth must be positive, got {}", link.bw),
            });
        }
        for (attribute, value) in [
            ("len", link.len),
            ("delay", link.delay),
            ("jitter", link.jitter),
            ("loss", link.loss),
            ("alu", link.alu),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(TopologyError::InvalidAttribute {
                    entity: format!("link {}", id),
                    attribute: attribute.to_string(),
                    reason: format!("must be a non-negative number, got {}", value),
                });
            }
        }
        if !link_ids.insert(id.clone()) {
            return Err(TopologyError::DuplicateLink(id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("on".parse::<Status>().unwrap(), Status::On);
        assert_eq!("off".parse::<Status>().unwrap(), Status::Off);
        assert!(matches!(
            "standby".parse::<Status>(),
            Err(TopologyError::InvalidStatus(s)) if s == "standby"
        ));
        assert_eq!(Status::Off.to_string(), "off");
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("ER".parse::<Role>().unwrap(), Role::Edge);
        assert_eq!("IR".parse::<Role>().unwrap(), Role::Intermediate);
        assert_eq!("NR".parse::<Role>().unwrap(), Role::Normal);
        assert!("er".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::Normal);
    }

    #[test]
    fn test_link_descriptor_from_json() {
        let json = r#"{
            "node1": "A", "node2": "B",
            "bw": "10 Gbps", "len": 120.5, "delay": "3 ms",
            "jitter": 0.1, "loss": "0.01%", "alu": 2.0
        }"#;
        let link: LinkDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(link.link_id(), "AB");
        assert_eq!(link.bw, 10.0);
        assert_eq!(link.delay, 3.0);
        assert_eq!(link.loss, 0.01);
    }

    #[test]
    fn test_with_reverse_links() {
        let descriptor = TopologyDescriptor {
            nodes: vec![NodeDescriptor::new("A"), NodeDescriptor::new("B"), NodeDescriptor::new("C")],
            links: vec![
                LinkDescriptor::new("A", "B", 10.0),
                LinkDescriptor::new("B", "A", 10.0),
                LinkDescriptor::new("B", "C", 5.0),
            ],
        }
        .with_reverse_links();

        let ids: Vec<String> = descriptor.links.iter().map(|l| l.link_id()).collect();
        assert_eq!(ids, vec!["AB", "BA", "BC", "CB"]);
        assert_eq!(descriptor.links[3].bw, 5.0);
    }

    #[test]
    fn test_validate_descriptors() {
        let nodes = vec![NodeDescriptor::new("A"), NodeDescriptor::new("B")];
        let good = vec![LinkDescriptor::new("A", "B", 10.0)];
        assert!(validate_descriptors(&nodes, &good).is_ok());

        let dangling = vec![LinkDescriptor::new("A", "Z", 10.0)];
        assert!(matches!(
            validate_descriptors(&nodes, &dangling),
            Err(TopologyError::DanglingLink { node, .. }) if node == "Z"
        ));

        let duplicate = vec![LinkDescriptor::new("A", "B", 10.0), LinkDescriptor::new("A", "B", 5.0)];
        assert!(matches!(
            validate_descriptors(&nodes, &duplicate),
            Err(TopologyError::DuplicateLink(_))
        ));

        let zero_bw = vec![LinkDescriptor::new("A", "B", 0.0)];
        assert!(validate_descriptors(&nodes, &zero_bw).is_err());

        let dup_nodes = vec![NodeDescriptor::new("A"), NodeDescriptor::new("A")];
        assert!(matches!(
            validate_descriptors(&dup_nodes, &[]),
            Err(TopologyError::DuplicateNode(_))
        ));
    }
}
