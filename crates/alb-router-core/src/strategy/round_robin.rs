//! Round Robin Strategy for Node Selection
//!
//! Hands out eligible nodes in strict rotation. The shared counter advances
//! exactly once per call, with a single atomic increment.

use alb_types::NodeDescriptor;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

use crate::error::RouterError;
use super::NodeStrategy;

/// Round-robin routing strategy
#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    /// Calls served so far
    counter: AtomicUsize,
}

impl RoundRobinStrategy {
    /// Create a new round-robin strategy starting at the first node
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of selections made so far
    pub fn position(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

impl NodeStrategy for RoundRobinStrategy {
    fn select(&self, eligible: &[&NodeDescriptor], _routing_key: &[u8]) -> Result<NodeDescriptor, RouterError> {
        if eligible.is_empty() {
            return Err(RouterError::NoEligibleNode);
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let node = eligible[n % eligible.len()];

        trace!(node = %node.node_key(), position = n, "Selected by round-robin");
        Ok(node.clone())
    }

    fn name(&self) -> &'static str {
        "RoundRobin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::create_test_nodes;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_round_robin_cycles_in_order() {
        let strategy = RoundRobinStrategy::new();
        let nodes = create_test_nodes(3);
        let eligible: Vec<_> = nodes.iter().collect();

        let picked: Vec<_> = (0..6)
            .map(|_| strategy.select(&eligible, b"").unwrap().address)
            .collect();

        assert_eq!(
            picked,
            vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.1", "10.0.0.2", "10.0.0.3"]
        );
        assert_eq!(strategy.position(), 6);
    }

    #[test]
    fn test_round_robin_even_under_concurrency() {
        let strategy = Arc::new(RoundRobinStrategy::new());
        let nodes = Arc::new(create_test_nodes(4));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let strategy = strategy.clone();
                let nodes = nodes.clone();
                std::thread::spawn(move || {
                    let eligible: Vec<_> = nodes.iter().collect();
                    (0..1000)
                        .map(|_| strategy.select(&eligible, b"").unwrap().address)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut distribution: HashMap<String, usize> = HashMap::new();
        for h in handles {
            for addr in h.join().unwrap() {
                *distribution.entry(addr).or_insert(0) += 1;
            }
        }

        // 8000 selections over 4 nodes, counter is shared: exact split
        assert_eq!(distribution.len(), 4);
        assert!(distribution.values().all(|&c| c == 2000));
    }

    #[test]
    fn test_empty_nodes() {
        let strategy = RoundRobinStrategy::new();
        let result = strategy.select(&[], b"");
        assert!(matches!(result, Err(RouterError::NoEligibleNode)));
        // Failed selections do not advance the rotation
        assert_eq!(strategy.position(), 0);
    }
}
