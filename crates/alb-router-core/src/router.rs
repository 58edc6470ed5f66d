//! Router
//!
//! Picks the node for each request from the current directory snapshot.
//!
//! # Routing Decision Tree
//!
//! ```text
//! Request arrives
//!        │
//!        ▼
//! Mode permits key routing ──No──► Round-robin
//! for this operation kind?              ▲
//!        │                              │
//!       Yes                             │
//!        │                              │
//!        ▼                              │
//! Key values available? ──────No────────┘
//!        │                 (schema unknown)
//!       Yes
//!        │
//!        ▼
//! (table, partition key) → hash → node
//! ```
//!
//! Both branches choose among the same eligible set: the snapshot's nodes
//! that match the filter and are alive. The router holds no state besides
//! the round-robin counter and a ring cache derived from the eligible set.

use alb_core::{NodeDirectory, Snapshot};
use alb_types::{canonical_key, KeyHashing, KeyValues, NodeDescriptor, OperationKind, RouteAffinityMode, RoutingFilter};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::RouterError;
use crate::key_learner::PartitionKeyLearner;
use crate::strategy::{key_strategy, NodeStrategy, RoundRobinStrategy};
use crate::types::{RoutingDecision, RoutingMethod};

/// Request router
pub struct Router {
    directory: Arc<NodeDirectory>,
    learner: Arc<PartitionKeyLearner>,
    round_robin: RoundRobinStrategy,
    key_strategy: Box<dyn NodeStrategy>,
}

impl Router {
    /// Create a router over `directory` using the default hash ring
    pub fn new(directory: Arc<NodeDirectory>, learner: Arc<PartitionKeyLearner>) -> Self {
        Self::with_key_hashing(directory, learner, KeyHashing::default())
    }

    /// Create with a specific key → node mapping
    pub fn with_key_hashing(
        directory: Arc<NodeDirectory>,
        learner: Arc<PartitionKeyLearner>,
        key_hashing: KeyHashing,
    ) -> Self {
        Self {
            directory,
            learner,
            round_robin: RoundRobinStrategy::new(),
            key_strategy: key_strategy(key_hashing),
        }
    }

    /// The directory this router reads
    pub fn directory(&self) -> &Arc<NodeDirectory> {
        &self.directory
    }

    /// The partition key learner used to narrow key values
    pub fn learner(&self) -> &Arc<PartitionKeyLearner> {
        &self.learner
    }

    /// Nodes of `snapshot` that pass `filter` and are alive.
    ///
    /// Distinguishes a filter nothing matches (misconfiguration) from
    /// matching nodes that are all down (transient).
    pub fn eligible<'a>(snapshot: &'a Snapshot, filter: &RoutingFilter) -> Result<Vec<&'a NodeDescriptor>, RouterError> {
        if snapshot.is_empty() {
            return Err(RouterError::NoEligibleNode);
        }

        let matching: Vec<&NodeDescriptor> = snapshot
            .nodes()
            .iter()
            .filter(|n| filter.matches(n))
            .collect();
        if matching.is_empty() {
            // Untagged seeds cannot disprove a datacenter/rack
            return Err(if filter.is_unrestricted() || snapshot.is_provisional() {
                RouterError::NoEligibleNode
            } else {
                RouterError::FilterUnsatisfiable(filter.clone())
            });
        }

        let live: Vec<&NodeDescriptor> = matching.into_iter().filter(|n| n.alive).collect();
        if live.is_empty() {
            return Err(RouterError::NoEligibleNode);
        }
        Ok(live)
    }

    /// Next eligible node in rotation
    pub fn select_round_robin(&self, filter: &RoutingFilter) -> Result<NodeDescriptor, RouterError> {
        let snapshot = self.directory.get();
        let eligible = Self::eligible(&snapshot, filter)?;
        self.round_robin.select(&eligible, &[])
    }

    /// Node owning `(table, key_values)` among the eligible set.
    ///
    /// Stable for as long as the eligible set is unchanged.
    pub fn select_by_key(
        &self,
        table: &str,
        key_values: &KeyValues,
        filter: &RoutingFilter,
    ) -> Result<NodeDescriptor, RouterError> {
        let snapshot = self.directory.get();
        let eligible = Self::eligible(&snapshot, filter)?;
        let routing_key = canonical_key(table, key_values);
        self.key_strategy.select(&eligible, &routing_key)
    }

    /// Route one request.
    ///
    /// Key routing is used only when `mode` permits it for `kind` and key
    /// values are at hand; key values are narrowed to the table's known
    /// partition key first. Everything else goes round-robin.
    pub fn route(
        &self,
        table: &str,
        kind: OperationKind,
        key_values: Option<&KeyValues>,
        mode: RouteAffinityMode,
        filter: &RoutingFilter,
    ) -> Result<RoutingDecision, RouterError> {
        if mode.permits(kind) {
            match key_values {
                Some(keys) if !keys.is_empty() => {
                    let partition_key = self.learner.partition_key_of(table, keys);
                    let node = self.select_by_key(table, &partition_key, filter)?;
                    trace!(
                        table = %table,
                        kind = %kind,
                        node = %node.node_key(),
                        strategy = self.key_strategy.name(),
                        "Routed by key"
                    );
                    return Ok(RoutingDecision { node, method: RoutingMethod::ByKey });
                }
                _ => {
                    let reason = RouterError::SchemaUnknown(table.to_string());
                    debug!(kind = %kind, reason = %reason, "Key affinity unavailable, using round-robin");
                }
            }
        }

        let node = self.select_round_robin(filter)?;
        trace!(table = %table, kind = %kind, node = %node.node_key(), "Routed round-robin");
        Ok(RoutingDecision { node, method: RoutingMethod::RoundRobin })
    }
}
