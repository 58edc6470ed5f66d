//! Alb Core - node directory and membership refresh
//!
//! This crate owns the routing state that changes over time:
//! the current node snapshot, and the background task that keeps it in
//! sync with the cluster.
//!
//! ```text
//! MembershipSource ──► LivenessRefresher ──publish──► NodeDirectory ──get──► readers
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod refresher;

pub use config::{ClientConfig, DEFAULT_PORT};
pub use directory::{NodeDirectory, Snapshot};
pub use error::{ConfigError, MembershipError};
pub use refresher::{ActivityTracker, LivenessRefresher, MembershipSource, RefreshSettings, RefresherHandle};
