//! Error types for the core module

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No seed node to bootstrap from
    #[error("At least one seed node is required")]
    NoSeedNodes,

    /// A setting could not be parsed
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// Settings that are valid alone but not together
    #[error("Conflicting settings: {0}")]
    Conflict(String),
}

/// Membership query errors.
///
/// These never reach a request caller: the refresher logs them and keeps
/// the last published snapshot.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// The node answered, but not with a usable node list
    #[error("Membership query to {node} failed: {reason}")]
    MembershipQueryFailed { node: String, reason: String },

    /// The node did not answer in time
    #[error("Membership query to {node} timed out")]
    Timeout { node: String },

    /// Neither the directory nor the seeds offer a node to ask
    #[error("No node available to query membership from")]
    NoQueryTarget,
}
