//! Node directory
//!
//! Holds the current node list as an immutable snapshot behind an
//! `ArcSwap`. Readers load an `Arc<Snapshot>` without locking and keep
//! using it for as long as they like; the single writer (the liveness
//! refresher) builds a whole new snapshot and swaps it in.

use alb_types::{NodeDescriptor, RoutingFilter};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Immutable, internally consistent view of the known nodes
#[derive(Debug, Clone)]
pub struct Snapshot {
    nodes: Vec<NodeDescriptor>,
    generation: u64,
    published_at: Instant,
    provisional: bool,
}

impl Snapshot {
    fn new(nodes: Vec<NodeDescriptor>, generation: u64, provisional: bool) -> Self {
        Self {
            nodes,
            generation,
            published_at: Instant::now(),
            provisional,
        }
    }

    /// All nodes, in the order the membership query reported them
    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Publication counter; 0 is the snapshot built at construction
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True for a bootstrap seed list that no membership query has confirmed.
    /// Seeds carry no datacenter/rack, so a filter that matches nothing here
    /// says nothing about the cluster yet.
    pub fn is_provisional(&self) -> bool {
        self.provisional
    }

    /// Time since this snapshot was published
    pub fn age(&self) -> Duration {
        self.published_at.elapsed()
    }

    /// Live nodes
    pub fn live_nodes(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.nodes.iter().filter(|n| n.alive)
    }

    /// Nodes matching `filter` on topology, regardless of liveness
    pub fn matching<'a>(&'a self, filter: &'a RoutingFilter) -> impl Iterator<Item = &'a NodeDescriptor> {
        self.nodes.iter().filter(move |n| filter.matches(n))
    }
}

/// Single-writer, many-reader holder of the current [`Snapshot`]
#[derive(Debug)]
pub struct NodeDirectory {
    current: ArcSwap<Snapshot>,
}

impl NodeDirectory {
    /// Create a directory holding `nodes` as generation 0
    pub fn new(nodes: Vec<NodeDescriptor>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::new(nodes, 0, false)),
        }
    }

    /// Create a directory from unconfirmed seed nodes; the first
    /// [`publish`](Self::publish) replaces them with real membership
    pub fn from_seeds(seeds: Vec<NodeDescriptor>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::new(seeds, 0, true)),
        }
    }

    /// Current snapshot. Never blocks, never observes a partial update.
    pub fn get(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot; returns the new generation.
    ///
    /// Must only be called from one writer at a time. Readers holding the
    /// previous snapshot are unaffected.
    pub fn publish(&self, nodes: Vec<NodeDescriptor>) -> u64 {
        let generation = self.current.load().generation + 1;
        let changed = self.current.load().nodes != nodes;
        let count = nodes.len();

        self.current.store(Arc::new(Snapshot::new(nodes, generation, false)));

        debug!(generation, nodes = count, changed, "Published node snapshot");
        generation
    }
}

impl Default for NodeDirectory {
    fn default() -> Self {
        Self::new(vec![])
    }
}
