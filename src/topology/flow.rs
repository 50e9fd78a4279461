//! Traffic flows and their service-level terms.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Service class of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceClass {
    Premium,
    Assured,
    #[default]
    #[serde(alias = "best_effort")]
    BestEffort,
}

impl ServiceClass {
    pub const ALL: [ServiceClass; 3] = [ServiceClass::Premium, ServiceClass::Assured, ServiceClass::BestEffort];

    /// Latency bound in milliseconds
    pub fn latency_threshold(self) -> f64 {
        match self {
            ServiceClass::Premium => 150.0,
            ServiceClass::Assured => 400.0,
            ServiceClass::BestEffort => 300_000.0,
        }
    }

    /// Share of an aggregate demand carried by this class
    pub fn demand_share(self) -> f64 {
        match self {
            ServiceClass::Premium => 0.16,
            ServiceClass::Assured => 0.67,
            ServiceClass::BestEffort => 0.17,
        }
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceClass::Premium => "premium",
            ServiceClass::Assured => "assured",
            ServiceClass::BestEffort => "besteffort",
        };
        write!(f, "{}", name)
    }
}

/// Service-level agreement terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sla {
    pub latency: f64,
    #[serde(default = "unbounded")]
    pub jitter: f64,
    #[serde(default = "unbounded")]
    pub loss: f64,
}

fn unbounded() -> f64 {
    f64::INFINITY
}

impl Sla {
    pub fn for_class(class: ServiceClass) -> Self {
        Self {
            latency: class.latency_threshold(),
            jitter: f64::INFINITY,
            loss: f64::INFINITY,
        }
    }
}

/// A traffic flow between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    #[serde(rename = "node1", alias = "src")]
    pub src: String,
    #[serde(rename = "node2", alias = "dst")]
    pub dst: String,
    #[serde(alias = "bw")]
    pub bandwidth: f64,
    #[serde(default, rename = "class")]
    pub service_class: ServiceClass,
    /// Explicit terms; the class defaults apply when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla: Option<Sla>,
}

impl Flow {
    pub fn new(
        id: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
        bandwidth: f64,
        service_class: ServiceClass,
    ) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            dst: dst.into(),
            bandwidth,
            service_class,
            sla: None,
        }
    }

    pub fn with_sla(mut self, sla: Sla) -> Self {
        self.sla = Some(sla);
        self
    }

    pub fn sla(&self) -> Sla {
        self.sla.unwrap_or_else(|| Sla::for_class(self.service_class))
    }

    /// Split an aggregate demand between two nodes into one flow per service class.
    /// Flow ids are `src + dst + class`.
    pub fn split_demand(src: &str, dst: &str, total_bandwidth: f64) -> Vec<Flow> {
        ServiceClass::ALL
            .iter()
            .map(|&class| {
                Flow::new(
                    format!("{}{}{}", src, dst, class),
                    src,
                    dst,
                    total_bandwidth * class.demand_share(),
                    class,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_defaults() {
        let flow = Flow::new("f", "A", "B", 1.0, ServiceClass::Premium);
        assert_eq!(flow.sla().latency, 150.0);
        assert!(flow.sla().jitter.is_infinite());

        let flow = flow.with_sla(Sla { latency: 20.0, jitter: 1.0, loss: 0.1 });
        assert_eq!(flow.sla().latency, 20.0);
    }

    #[test]
    fn test_split_demand() {
        let flows = Flow::split_demand("A", "B", 100.0);
        assert_eq!(flows.len(), 3);
        assert_eq!(flows[0].id, "ABpremium");
        assert_eq!(flows[2].id, "ABbesteffort");
        let total: f64 = flows.iter().map(|f| f.bandwidth).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert!((flows[1].bandwidth - 67.0).abs() < 1e-9);
    }

    #[test]
    fn test_flow_from_yaml() {
        let yaml = "id: AC\nnode1: A\nnode2: C\nbandwidth: 4.0\nclass: assured\n";
        let flow: Flow = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(flow.src, "A");
        assert_eq!(flow.dst, "C");
        assert_eq!(flow.service_class, ServiceClass::Assured);
        assert_eq!(flow.sla().latency, 400.0);
    }
}
