//! Link entity, power model and reliability-risk function.

use super::types::{link_id, LinkDescriptor, Status};
use std::collections::BTreeSet;

/// Fixed power drawn by an active line card pair
const POWER_DELTA: f64 = 180.0;
/// Linear traffic coefficient
const POWER_RHO: f64 = 5e-4;
/// Super-linear traffic coefficient
const POWER_MU: f64 = 1e-3;
/// Super-linear exponent
const POWER_ALPHA: f64 = 1.4;
/// Physical links bundled in one logical link
const BUNDLED_LINKS: f64 = 1.0;

/// Utilization above which a link starts contributing reliability risk
pub const RISK_THRESHOLD: f64 = 0.6;

/// Values this close to zero are snapped to zero after bandwidth release
const DRIFT_EPSILON: f64 = 1e-9;

/// Power drawn by a link carrying `traffic` units of bandwidth.
///
/// Zero when idle, otherwise `2 n (delta + rho x/n + mu (x/n)^alpha)`.
pub fn power_model(traffic: f64) -> f64 {
    if traffic <= 0.0 {
        return 0.0;
    }
    let per_link = traffic / BUNDLED_LINKS;
    2.0 * BUNDLED_LINKS * (POWER_DELTA + POWER_RHO * per_link + POWER_MU * per_link.powf(POWER_ALPHA))
}

/// Reliability risk of running a link at `utilization` (fraction of capacity).
///
/// Zero up to 60% utilization, then `6.25u^2 - 7.5u + 2.25`, which is
/// continuous at the threshold and reaches 1.0 at full capacity.
pub fn reliability_risk(utilization: f64) -> f64 {
    if utilization > RISK_THRESHOLD {
        6.25 * utilization * utilization - 7.5 * utilization + 2.25
    } else {
        0.0
    }
}

/// Directed link between two nodes
#[derive(Debug, Clone)]
pub struct Link {
    id: String,
    node1: String,
    node2: String,
    total_bandwidth: f64,
    length: f64,
    latency: f64,
    jitter: f64,
    loss: f64,
    average_link_usage: f64,
    status: Status,
    consumed_bandwidth: f64,
    bandwidth_usage: f64,
    service_flows: BTreeSet<String>,
    power_consumption: f64,
}

impl Link {
    pub(super) fn from_descriptor(descriptor: &LinkDescriptor) -> Self {
        Self {
            id: link_id(&descriptor.node1, &descriptor.node2),
            node1: descriptor.node1.clone(),
            node2: descriptor.node2.clone(),
            total_bandwidth: descriptor.bw,
            length: descriptor.len,
            latency: descriptor.delay,
            jitter: descriptor.jitter,
            loss: descriptor.loss,
            average_link_usage: descriptor.alu,
            status: Status::On,
            consumed_bandwidth: 0.0,
            bandwidth_usage: 0.0,
            service_flows: BTreeSet::new(),
            power_consumption: 0.0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node1(&self) -> &str {
        &self.node1
    }

    pub fn node2(&self) -> &str {
        &self.node2
    }

    pub fn total_bandwidth(&self) -> f64 {
        self.total_bandwidth
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn latency(&self) -> f64 {
        self.latency
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn loss(&self) -> f64 {
        self.loss
    }

    pub fn average_link_usage(&self) -> f64 {
        self.average_link_usage
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_on(&self) -> bool {
        self.status.is_on()
    }

    pub fn consumed_bandwidth(&self) -> f64 {
        self.consumed_bandwidth
    }

    /// Consumed fraction of capacity, capped at 1.0
    pub fn bandwidth_usage(&self) -> f64 {
        self.bandwidth_usage
    }

    pub fn service_flows(&self) -> &BTreeSet<String> {
        &self.service_flows
    }

    pub fn carries(&self, flow_id: &str) -> bool {
        self.service_flows.contains(flow_id)
    }

    pub fn power_consumption(&self) -> f64 {
        self.power_consumption
    }

    /// Capacity left before the link is over-subscribed (may be negative)
    pub fn available_bandwidth(&self) -> f64 {
        self.total_bandwidth - self.consumed_bandwidth
    }

    /// Power drawn at a hypothetical load, capped at the link capacity
    pub fn power_at(&self, traffic: f64) -> f64 {
        power_model(traffic.min(self.total_bandwidth))
    }

    /// Power the link would draw additionally if `bandwidth` more were routed over it
    pub fn marginal_power(&self, bandwidth: f64) -> f64 {
        self.power_at(self.consumed_bandwidth + bandwidth) - self.power_at(self.consumed_bandwidth)
    }

    /// Utilization if `bandwidth` more were routed over it. Not capped.
    pub fn projected_utilization(&self, bandwidth: f64) -> f64 {
        (self.consumed_bandwidth + bandwidth) / self.total_bandwidth
    }

    pub fn reliability_risk(&self) -> f64 {
        reliability_risk(self.bandwidth_usage)
    }

    /// Switch the link on or off. Going off drops every carried flow.
    pub(super) fn set_status(&mut self, status: Status) {
        self.status = status;
        if status == Status::Off {
            self.consumed_bandwidth = 0.0;
            self.service_flows.clear();
            self.refresh_derived();
        }
    }

    pub(super) fn apply_flow(&mut self, flow_id: &str, bandwidth: f64) {
        self.service_flows.insert(flow_id.to_string());
        self.consumed_bandwidth += bandwidth;
        self.refresh_derived();
    }

    pub(super) fn remove_flow(&mut self, flow_id: &str, bandwidth: f64) {
        self.service_flows.remove(flow_id);
        self.consumed_bandwidth -= bandwidth;
        if self.consumed_bandwidth < DRIFT_EPSILON || self.service_flows.is_empty() {
            self.consumed_bandwidth = 0.0;
        }
        self.refresh_derived();
    }

    pub(super) fn reset(&mut self) {
        self.status = Status::On;
        self.consumed_bandwidth = 0.0;
        self.service_flows.clear();
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        self.bandwidth_usage = (self.consumed_bandwidth / self.total_bandwidth).min(1.0);
        self.power_consumption = self.power_at(self.consumed_bandwidth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(bw: f64) -> Link {
        Link::from_descriptor(&LinkDescriptor::new("A", "B", bw))
    }

    #[test]
    fn test_power_model() {
        assert_eq!(power_model(0.0), 0.0);
        let expected = 2.0 * (180.0 + 5e-4 * 100.0 + 1e-3 * 100f64.powf(1.4));
        assert!((power_model(100.0) - expected).abs() < 1e-9);
        assert!(power_model(200.0) > power_model(100.0));
    }

    #[test]
    fn test_power_capped_at_capacity() {
        let l = link(10.0);
        assert_eq!(l.power_at(25.0), l.power_at(10.0));
        assert!(l.marginal_power(4.0) > 360.0);
    }

    #[test]
    fn test_reliability_risk() {
        assert_eq!(reliability_risk(0.0), 0.0);
        assert_eq!(reliability_risk(0.6), 0.0);
        assert!(reliability_risk(0.61) > 0.0);
        assert!((reliability_risk(1.0) - 1.0).abs() < 1e-12);
        assert!(reliability_risk(0.9) < reliability_risk(0.95));
    }

    #[test]
    fn test_apply_and_remove_flow() {
        let mut l = link(10.0);
        l.apply_flow("f1", 4.0);
        assert_eq!(l.consumed_bandwidth(), 4.0);
        assert!((l.bandwidth_usage() - 0.4).abs() < 1e-12);
        assert!(l.carries("f1"));
        assert!(l.power_consumption() > 0.0);

        l.remove_flow("f1", 4.0);
        assert_eq!(l.consumed_bandwidth(), 0.0);
        assert_eq!(l.bandwidth_usage(), 0.0);
        assert_eq!(l.power_consumption(), 0.0);
        assert!(l.service_flows().is_empty());
    }

    #[test]
    fn test_usage_capped_when_oversubscribed() {
        let mut l = link(10.0);
        l.apply_flow("f1", 15.0);
        assert_eq!(l.bandwidth_usage(), 1.0);
        assert_eq!(l.available_bandwidth(), -5.0);
        assert!((l.projected_utilization(5.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_switch_off_clears_state() {
        let mut l = link(10.0);
        l.apply_flow("f1", 3.0);
        l.set_status(Status::Off);
        assert!(!l.is_on());
        assert_eq!(l.consumed_bandwidth(), 0.0);
        assert_eq!(l.power_consumption(), 0.0);
        assert!(l.service_flows().is_empty());
    }
}
