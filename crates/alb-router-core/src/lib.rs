//! Alb Router - Request Routing Module
//!
//! Chooses the Alternator node each request is sent to.
//!
//! # Architecture
//!
//! ```text
//! Request (table, kind, key values)
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │   PartitionKeyLearner   │  Narrows key values to the partition key
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │        Router           │  Round-robin or key affinity
//! │   (Which node?)         │  over the live, filtered snapshot
//! └─────────────────────────┘
//! ```
//!
//! # Routing Strategies
//!
//! - **RoundRobinStrategy**: Strict rotation, one atomic increment per call
//! - **ConsistentHashStrategy**: Same partition key → same node, minimal
//!   remapping when membership changes
//! - **ModuloHashStrategy**: Same partition key → same node, remaps most
//!   keys on any membership change
//!
//! # Example
//!
//! ```rust,ignore
//! use alb_router_core::{Router, PartitionKeyLearner};
//!
//! let router = Router::new(directory, Arc::new(PartitionKeyLearner::new()));
//! let decision = router.route("orders", kind, Some(&key), mode, &filter)?;
//! ```

// Core modules
mod error;
mod types;
mod key_learner;

// Strategy module (contains all node selection strategies)
mod strategy;

// Router
mod router;


// Re-exports: Error types
pub use error::RouterError;

// Re-exports: Core types
pub use types::{RoutingDecision, RoutingMethod};

// Re-exports: Partition key learning
pub use key_learner::{PartitionKeyLearner, SchemaEntry, SchemaSource};

// Re-exports: Strategy traits and implementations
pub use strategy::{
    // Traits
    NodeStrategy,
    // Node selection strategies
    RoundRobinStrategy, ConsistentHashStrategy, ModuloHashStrategy,
    key_strategy,
};

// Re-exports: Router
pub use router::Router;
