//! Read-only network metrics over the operational links.

use super::graph::Topology;
use super::link::{Link, RISK_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reliability risk summary over the links that are on
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReliabilityScore {
    /// Highest single-link risk
    pub max_risk: f64,
    /// Mean risk over operational links
    pub mean_risk: f64,
    /// Operational links running above 60% of capacity
    pub links_above_threshold: usize,
}

impl Topology {
    pub fn reliability_score(&self) -> ReliabilityScore {
        let active: Vec<&Link> = self.links().iter().filter(|l| l.is_on()).collect();
        if active.is_empty() {
            return ReliabilityScore::default();
        }

        let risks: Vec<f64> = active.iter().map(|l| l.reliability_risk()).collect();
        ReliabilityScore {
            max_risk: risks.iter().copied().fold(0.0, f64::max),
            mean_risk: risks.iter().sum::<f64>() / risks.len() as f64,
            links_above_threshold: active.iter().filter(|l| l.bandwidth_usage() > RISK_THRESHOLD).count(),
        }
    }

    /// Total power drawn by the operational links
    pub fn power_consumption(&self) -> f64 {
        self.links().iter().filter(|l| l.is_on()).map(Link::power_consumption).sum()
    }

    /// Consumed fraction of capacity per link id
    pub fn link_usages(&self) -> BTreeMap<String, f64> {
        self.links()
            .iter()
            .map(|l| (l.id().to_string(), l.bandwidth_usage()))
            .collect()
    }

    pub fn active_link_count(&self) -> usize {
        self.links().iter().filter(|l| l.is_on()).count()
    }
}
