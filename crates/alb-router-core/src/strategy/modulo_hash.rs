//! Modulo Hash Strategy for Node Selection
//!
//! Maps a key to `hash % eligible.len()`. Deterministic for a fixed node set
//! and needs no ring, but any membership change remaps most keys, so every
//! conditional-write coordinator moves at once. Prefer
//! [`ConsistentHashStrategy`](super::ConsistentHashStrategy).

use alb_types::NodeDescriptor;
use tracing::trace;

use crate::error::RouterError;
use super::{hash64, NodeStrategy};

/// Plain modulo routing strategy
#[derive(Debug, Clone, Default)]
pub struct ModuloHashStrategy;

impl ModuloHashStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl NodeStrategy for ModuloHashStrategy {
    fn select(&self, eligible: &[&NodeDescriptor], routing_key: &[u8]) -> Result<NodeDescriptor, RouterError> {
        if eligible.is_empty() {
            return Err(RouterError::NoEligibleNode);
        }

        let hash = hash64(routing_key);
        let idx = (hash % eligible.len() as u64) as usize;

        trace!(hash = %hash, node = %eligible[idx].node_key(), "Modulo hash lookup");
        Ok(eligible[idx].clone())
    }

    fn name(&self) -> &'static str {
        "ModuloHash"
    }
}
