//! Partition-key ring
//!
//! Maps each routing key to one node of the eligible set, so conditional
//! writes on a key keep the same coordinator. Ring points are derived from
//! node identity alone: when a node leaves, only the keys it owned move.

use alb_types::NodeDescriptor;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

use crate::error::RouterError;
use super::{hash64, NodeStrategy};

/// Ring point → index into the eligible slice the ring was built from
type Ring = BTreeMap<u64, usize>;

/// Ring built for one eligible set
struct CachedRing {
    fingerprint: u64,
    points: Arc<Ring>,
}

/// Key-affinity strategy over a hash ring
pub struct ConsistentHashStrategy {
    /// Ring points per node
    virtual_nodes: u32,
    /// Last ring built; rebuilt when the eligible set changes
    cache: RwLock<Option<CachedRing>>,
}

impl ConsistentHashStrategy {
    /// 150 points per node
    pub fn new() -> Self {
        Self::with_virtual_nodes(150)
    }

    pub fn with_virtual_nodes(virtual_nodes: u32) -> Self {
        Self {
            virtual_nodes: virtual_nodes.max(1),
            cache: RwLock::new(None),
        }
    }

    /// Identity of an eligible set, order included
    fn fingerprint(nodes: &[&NodeDescriptor]) -> u64 {
        let mut ids = Vec::with_capacity(nodes.len() * 16);
        for n in nodes {
            ids.extend_from_slice(n.node_key().as_bytes());
            ids.push(0);
        }
        hash64(&ids)
    }

    fn build_ring(&self, nodes: &[&NodeDescriptor]) -> Ring {
        nodes
            .iter()
            .enumerate()
            .flat_map(|(idx, node)| {
                let id = node.node_key();
                (0..self.virtual_nodes).map(move |vn| (hash64(format!("{}#{}", id, vn).as_bytes()), idx))
            })
            .collect()
    }

    fn ring_for(&self, nodes: &[&NodeDescriptor]) -> Arc<Ring> {
        let fingerprint = Self::fingerprint(nodes);
        if let Some(cached) = self.cache.read().as_ref().filter(|c| c.fingerprint == fingerprint) {
            return cached.points.clone();
        }

        let points = Arc::new(self.build_ring(nodes));
        *self.cache.write() = Some(CachedRing {
            fingerprint,
            points: points.clone(),
        });
        points
    }

    /// Owner of `hash`: the next point clockwise
    fn owner(ring: &Ring, hash: u64) -> Option<usize> {
        ring.range(hash..)
            .chain(ring.range(..hash))
            .next()
            .map(|(_, &idx)| idx)
    }
}

impl Default for ConsistentHashStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStrategy for ConsistentHashStrategy {
    fn select(&self, eligible: &[&NodeDescriptor], routing_key: &[u8]) -> Result<NodeDescriptor, RouterError> {
        match eligible {
            [] => return Err(RouterError::NoEligibleNode),
            [only] => return Ok((*only).clone()),
            _ => {}
        }

        let hash = hash64(routing_key);
        let idx = Self::owner(&self.ring_for(eligible), hash).ok_or(RouterError::NoEligibleNode)?;

        trace!(hash, node = %eligible[idx].node_key(), "Ring lookup");
        Ok(eligible[idx].clone())
    }

    fn name(&self) -> &'static str {
        "ConsistentHash"
    }
}
