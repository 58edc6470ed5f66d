//! Liveness refresher
//!
//! Background task that periodically asks the cluster for its node list and
//! publishes the answer into the [`NodeDirectory`]. It runs on its own task
//! and never blocks request handling. A failed query keeps the previous
//! snapshot in place.
//!
//! # Scheduling
//!
//! ```text
//!            requests seen since last tick?
//!                 │               │
//!                yes              no
//!                 │               │
//!                 ▼               ▼
//!   refresh every `period`   refresh every `idle_period`
//! ```
//!
//! A zero period disables that branch; both zero means no task at all and
//! the directory stays as constructed.

use alb_types::NodeDescriptor;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::directory::NodeDirectory;
use crate::error::MembershipError;

/// Cluster membership query primitive
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Ask `target` for the current node list
    async fn fetch_nodes(&self, target: &NodeDescriptor) -> Result<Vec<NodeDescriptor>, MembershipError>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

/// Request activity flag shared between the request path and the refresher
#[derive(Debug, Default)]
pub struct ActivityTracker {
    active: AtomicBool,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a request was routed
    pub fn mark(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    /// Read and clear the flag
    pub fn take(&self) -> bool {
        self.active.swap(false, Ordering::Relaxed)
    }
}

/// Refresh timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Period while active (zero = disabled)
    pub period: Duration,
    /// Period while idle (zero = disabled)
    pub idle_period: Duration,
    /// Snapshot age past which queries go to the seeds instead
    pub max_staleness: Duration,
    /// Timeout for one query
    pub query_timeout: Duration,
}

impl RefreshSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            period: config.nodes_list_update_period,
            idle_period: config.idle_nodes_list_update_period,
            max_staleness: config.max_staleness,
            query_timeout: config.membership_query_timeout,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.period.is_zero() && self.idle_period.is_zero()
    }

    /// Wake-up granularity of the loop
    fn tick(&self) -> Duration {
        match (self.period.is_zero(), self.idle_period.is_zero()) {
            (false, false) => self.period.min(self.idle_period),
            (false, true) => self.period,
            (true, false) => self.idle_period,
            (true, true) => Duration::MAX,
        }
    }

    fn is_due(&self, active: bool, since_last: Duration) -> bool {
        (active && !self.period.is_zero() && since_last >= self.period)
            || (!self.idle_period.is_zero() && since_last >= self.idle_period)
    }
}

/// Keeps a [`NodeDirectory`] in sync with cluster membership
pub struct LivenessRefresher {
    directory: Arc<NodeDirectory>,
    source: Arc<dyn MembershipSource>,
    seeds: Vec<NodeDescriptor>,
    settings: RefreshSettings,
    activity: Arc<ActivityTracker>,
    next_target: AtomicUsize,
    consecutive_failures: AtomicU32,
}

impl LivenessRefresher {
    pub fn new(
        directory: Arc<NodeDirectory>,
        source: Arc<dyn MembershipSource>,
        seeds: Vec<NodeDescriptor>,
        settings: RefreshSettings,
        activity: Arc<ActivityTracker>,
    ) -> Self {
        Self {
            directory,
            source,
            seeds,
            settings,
            activity,
            next_target: AtomicUsize::new(0),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Failures since the last successful refresh
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Pick the node to ask: live directory nodes in rotation, or the seeds
    /// when the directory is empty or has gone stale while failing.
    fn query_target(&self) -> Option<NodeDescriptor> {
        let snapshot = self.directory.get();
        let stale = self.consecutive_failures() > 0 && snapshot.age() > self.settings.max_staleness;

        let live: Vec<&NodeDescriptor> = snapshot.live_nodes().collect();
        let n = self.next_target.fetch_add(1, Ordering::Relaxed);
        if !live.is_empty() && !stale {
            return Some(live[n % live.len()].clone());
        }
        if self.seeds.is_empty() {
            return None;
        }
        Some(self.seeds[n % self.seeds.len()].clone())
    }

    /// Run one query-and-publish cycle.
    ///
    /// On success the new node list is published and its length returned.
    /// On failure the directory is left untouched.
    pub async fn refresh_once(&self) -> Result<usize, MembershipError> {
        let result = self.query().await;

        match &result {
            Ok(nodes) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                if nodes.is_empty() {
                    warn!(source = self.source.name(), "Membership query returned no nodes");
                }
            }
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                let age = self.directory.get().age();
                if age > self.settings.max_staleness {
                    error!(
                        error = %e,
                        failures,
                        snapshot_age_ms = age.as_millis() as u64,
                        "Node list is stale; keeping last known snapshot"
                    );
                } else {
                    warn!(error = %e, failures, "Membership query failed; keeping last known snapshot");
                }
            }
        }

        let nodes = result?;
        let count = nodes.len();
        self.directory.publish(nodes);
        Ok(count)
    }

    async fn query(&self) -> Result<Vec<NodeDescriptor>, MembershipError> {
        let target = self.query_target().ok_or(MembershipError::NoQueryTarget)?;
        debug!(target = %target.node_key(), source = self.source.name(), "Querying membership");

        match tokio::time::timeout(self.settings.query_timeout, self.source.fetch_nodes(&target)).await {
            Ok(result) => result,
            Err(_) => Err(MembershipError::Timeout { node: target.node_key() }),
        }
    }

    /// Start the background loop.
    ///
    /// Returns an idle handle without spawning anything when both periods
    /// are zero.
    pub fn spawn(self: Arc<Self>) -> RefresherHandle {
        if self.settings.is_disabled() {
            info!("Node list refresh disabled");
            return RefresherHandle { task: None, shutdown_tx: None };
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let tick = self.settings.tick();

        let task = tokio::spawn(async move {
            info!(
                period_ms = self.settings.period.as_millis() as u64,
                idle_period_ms = self.settings.idle_period.as_millis() as u64,
                "Liveness refresher started"
            );

            // Replace the seed list with real topology straight away,
            // unless the caller already did
            if self.directory.get().is_provisional() {
                tokio::select! {
                    _ = shutdown_rx.recv() => return,
                    _ = self.refresh_once() => {}
                }
            }
            let mut last_attempt = Instant::now();

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(tick) => {}
                }

                let active = self.activity.take();
                if !self.settings.is_due(active, last_attempt.elapsed()) {
                    continue;
                }

                // Dropping the query future on shutdown is safe: publication
                // is a single store that either happened or did not.
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = self.refresh_once() => {}
                }
                last_attempt = Instant::now();
            }

            debug!("Liveness refresher shutting down");
        });

        RefresherHandle {
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
        }
    }
}

/// Handle to a running refresher loop
#[derive(Debug)]
pub struct RefresherHandle {
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl RefresherHandle {
    /// Whether a background task was started
    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// An in-flight query is cancelled before it can publish; once this
    /// returns no further publication happens.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Liveness refresher task ended abnormally");
            }
        }
    }
}
