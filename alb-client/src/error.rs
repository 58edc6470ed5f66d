//! Client error types

use alb_core::ConfigError;
use alb_router_core::RouterError;
use alb_types::TypesError;
use thiserror::Error;

/// Errors surfaced to callers of the client
#[derive(Debug, Error)]
pub enum ClientError {
    /// No node could be chosen; nothing was sent
    #[error("Routing failed: {0}")]
    Routing(#[from] RouterError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The request could not be understood well enough to route it
    #[error("Invalid request: {0}")]
    Request(#[from] TypesError),

    /// The selected node could not be reached
    #[error("Transport error to {node}: {reason}")]
    Transport { node: String, reason: String },
}

impl ClientError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Routing(e) => e.is_transient(),
            ClientError::Transport { .. } => true,
            ClientError::Config(_) | ClientError::Request(_) => false,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
