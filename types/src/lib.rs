//! Shared types for the Alternator load balancer.
//!
//! Everything here is plain data: node descriptors produced by membership
//! queries, routing filters and modes, partition key values, and the narrow
//! operation capability the router consumes instead of concrete SDK request
//! types.

// ========== Core Modules ==========
pub mod node;
pub mod routing;
pub mod key;
pub mod operation;

// Export commonly used types
pub use node::{NodeDescriptor, Scheme, Endpoint};
pub use routing::{RoutingFilter, RouteAffinityMode, KeyHashing};
pub use key::{AttributeValue, KeyValues, KeySchemaElement, KeyType, canonical_key, project};
pub use operation::{OperationKind, RoutableOperation, Operation};

// Error types
pub type TypesResult<T> = Result<T, TypesError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    #[error("Invalid scheme: {0}")]
    InvalidScheme(String),
    
    #[error("Invalid route affinity mode: {0}")]
    InvalidAffinityMode(String),
    
    #[error("Invalid attribute value: {0}")]
    InvalidAttributeValue(String),
    
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}
