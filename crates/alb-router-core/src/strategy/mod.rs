//! Node Selection Strategies
//!
//! This module contains the strategies the router picks a node with:
//!
//! - `RoundRobinStrategy`: Strict rotation over eligible nodes
//! - `ConsistentHashStrategy`: Deterministic key → node mapping on a hash ring
//! - `ModuloHashStrategy`: Deterministic key → node mapping by hash modulo
//!
//! # Strategy Hierarchy
//!
//! ```text
//! Request
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │   Eligibility           │  (snapshot ∩ filter ∩ alive)
//! │   (Which nodes?)        │
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │   Node Selection        │  (RoundRobin / ConsistentHash / ModuloHash)
//! │   (Which node?)         │
//! └─────────────────────────┘
//! ```

mod consistent_hash;
mod modulo_hash;
mod round_robin;

pub use consistent_hash::ConsistentHashStrategy;
pub use modulo_hash::ModuloHashStrategy;
pub use round_robin::RoundRobinStrategy;

use alb_types::{KeyHashing, NodeDescriptor};
use blake3::Hasher;

use crate::error::RouterError;

/// Trait for node selection strategies
pub trait NodeStrategy: Send + Sync {
    /// Select a node from the eligible set based on a routing key
    fn select(&self, eligible: &[&NodeDescriptor], routing_key: &[u8]) -> Result<NodeDescriptor, RouterError>;

    /// Strategy name for logging
    fn name(&self) -> &'static str;
}

/// Build the key strategy for a hashing mode
pub fn key_strategy(hashing: KeyHashing) -> Box<dyn NodeStrategy> {
    match hashing {
        KeyHashing::Ring { virtual_nodes } => Box::new(ConsistentHashStrategy::with_virtual_nodes(virtual_nodes)),
        KeyHashing::Modulo => Box::new(ModuloHashStrategy::new()),
    }
}

/// Hash bytes using blake3, truncated to 64 bits
pub(crate) fn hash64(bytes: &[u8]) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    let hash = hasher.finalize();
    let bytes = hash.as_bytes();
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

#[cfg(test)]
pub(crate) fn create_test_nodes(count: usize) -> Vec<NodeDescriptor> {
    (1..=count)
        .map(|i| NodeDescriptor::new(format!("10.0.0.{}", i), alb_types::Scheme::Http, 8000))
        .collect()
}
