use crate::routing::RoutingMethod;
use crate::topology::Flow;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Run configuration as read from YAML
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub topology: TopologySource,
    #[serde(default)]
    pub routing: RoutingMethod,
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.general.name.trim().is_empty() {
            return Err(ValidationError::InvalidGeneral("name cannot be empty".to_string()));
        }
        if let Some(level) = &self.general.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(ValidationError::InvalidGeneral(format!(
                    "unknown log_level '{}', expected one of {}",
                    level,
                    LOG_LEVELS.join("/")
                )));
            }
        }
        if self.general.threads == Some(0) {
            return Err(ValidationError::InvalidGeneral("threads must be at least 1".to_string()));
        }

        if self.topology.path.trim().is_empty() {
            return Err(ValidationError::InvalidTopology("path cannot be empty".to_string()));
        }

        Self::validate_routing(&self.routing)?;
        self.scenario.validate()?;
        Ok(())
    }

    fn validate_routing(method: &RoutingMethod) -> Result<(), ValidationError> {
        method
            .validate()
            .map_err(|e| ValidationError::InvalidRouting(e.to_string()))
    }

    /// Routing method with the general seed filled in where MORA has none
    pub fn routing_method(&self) -> RoutingMethod {
        let mut method = self.routing.clone();
        if let RoutingMethod::Mora(params) = &mut method {
            if params.seed.is_none() {
                params.seed = self.general.seed;
            }
        }
        method
    }

    /// Log filter for env_logger
    pub fn log_level(&self) -> &str {
        self.general.log_level.as_deref().unwrap_or("info")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Random seed for stochastic routing methods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Worker threads for parallel path evaluation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

fn default_name() -> String {
    "trafficsim".to_string()
}

/// Where the node/link descriptors live
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TopologySource {
    /// JSON or YAML descriptor file, relative to the configuration file
    pub path: String,
    /// Add the reverse of every link declared in one direction only
    #[serde(default = "default_bidirectional")]
    pub bidirectional: bool,
}

fn default_bidirectional() -> bool {
    true
}

/// Flows to admit and nodes to fail afterwards
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub flows: Vec<Flow>,
    /// Extra flow records read from a JSON or YAML file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows_path: Option<String>,
    #[serde(default)]
    pub failures: Vec<String>,
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut ids = HashSet::new();
        for flow in &self.flows {
            if !ids.insert(flow.id.as_str()) {
                return Err(ValidationError::InvalidScenario(format!("duplicate flow id {}", flow.id)));
            }
            if flow.src == flow.dst {
                return Err(ValidationError::InvalidScenario(format!(
                    "flow {} starts and ends at {}",
                    flow.id, flow.src
                )));
            }
            if !flow.bandwidth.is_finite() || flow.bandwidth <= 0.0 {
                return Err(ValidationError::InvalidScenario(format!(
                    "flow {} needs a positive bandwidth, got {}",
                    flow.id, flow.bandwidth
                )));
            }
        }

        let mut failed = HashSet::new();
        if let Some(node) = self.failures.iter().find(|n| !failed.insert(n.as_str())) {
            return Err(ValidationError::InvalidScenario(format!("node {} fails twice", node)));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid topology configuration: {0}")]
    InvalidTopology(String),
    #[error("Invalid routing configuration: {0}")]
    InvalidRouting(String),
    #[error("Invalid scenario configuration: {0}")]
    InvalidScenario(String),
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: Some("info".to_string()),
            seed: None,
            threads: None,
        }
    }
}
