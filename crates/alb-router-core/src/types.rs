//! Common types for the router module

use alb_types::NodeDescriptor;
use serde::{Deserialize, Serialize};

/// How a routing decision was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingMethod {
    /// Next node in rotation
    RoundRobin,
    /// Deterministic choice from the partition key
    ByKey,
}

impl std::fmt::Display for RoutingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingMethod::RoundRobin => write!(f, "round-robin"),
            RoutingMethod::ByKey => write!(f, "key"),
        }
    }
}

/// Result of routing one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Node the request goes to
    pub node: NodeDescriptor,

    /// Method used for routing
    pub method: RoutingMethod,
}
