//! Error types for the router module

use alb_types::RoutingFilter;
use thiserror::Error;

/// Router error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// No live node passes the filter; retry later
    #[error("No eligible node available for routing")]
    NoEligibleNode,

    /// The requested datacenter/rack is absent from current membership
    #[error("No node in current membership matches {0}")]
    FilterUnsatisfiable(RoutingFilter),

    /// No partition key schema is known for the table.
    /// Handled inside the router by falling back to round-robin.
    #[error("Partition key schema unknown for table {0}")]
    SchemaUnknown(String),
}

impl RouterError {
    /// Worth retrying once membership changes
    pub fn is_transient(&self) -> bool {
        matches!(self, RouterError::NoEligibleNode)
    }
}
