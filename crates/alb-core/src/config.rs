//! Configuration module for the load-balancing client

use alb_types::{KeyHashing, NodeDescriptor, RouteAffinityMode, RoutingFilter, Scheme};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;

/// Default Alternator HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client instance ID, attached to log spans
    pub client_id: String,

    /// Initial node addresses; also the fallback query targets
    pub seed_nodes: Vec<String>,

    /// Scheme used for every node
    pub scheme: Scheme,

    /// Alternator port used for every node
    pub port: u16,

    /// Only route to nodes in this datacenter
    pub datacenter: Option<String>,

    /// Only route to nodes in this rack
    pub rack: Option<String>,

    /// Refresh period while requests are flowing (zero = disabled)
    pub nodes_list_update_period: Duration,

    /// Refresh period while the client is idle (zero = disabled)
    pub idle_nodes_list_update_period: Duration,

    /// How long a snapshot is trusted while refreshes keep failing
    /// before queries fall back to the seed nodes
    pub max_staleness: Duration,

    /// Timeout for one membership query
    pub membership_query_timeout: Duration,

    /// When to route by partition key
    pub key_route_affinity: RouteAffinityMode,

    /// Table → partition key attributes, for write-only workloads
    pub partition_keys: HashMap<String, Vec<String>>,

    /// Key → node mapping scheme
    pub key_hashing: KeyHashing,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            seed_nodes: vec![],
            scheme: Scheme::Http,
            port: DEFAULT_PORT,
            datacenter: None,
            rack: None,
            nodes_list_update_period: Duration::from_secs(5),
            idle_nodes_list_update_period: Duration::from_secs(60),
            max_staleness: Duration::from_secs(300),
            membership_query_timeout: Duration::from_secs(5),
            key_route_affinity: RouteAffinityMode::None,
            partition_keys: HashMap::new(),
            key_hashing: KeyHashing::default(),
        }
    }
}

impl ClientConfig {
    /// Create a config bootstrapping from `seed_nodes`
    pub fn new<I, S>(seed_nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seed_nodes: seed_nodes.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    pub fn with_rack(mut self, rack: impl Into<String>) -> Self {
        self.rack = Some(rack.into());
        self
    }

    pub fn with_nodes_list_update_period(mut self, period: Duration) -> Self {
        self.nodes_list_update_period = period;
        self
    }

    pub fn with_idle_nodes_list_update_period(mut self, period: Duration) -> Self {
        self.idle_nodes_list_update_period = period;
        self
    }

    pub fn with_max_staleness(mut self, max_staleness: Duration) -> Self {
        self.max_staleness = max_staleness;
        self
    }

    pub fn with_membership_query_timeout(mut self, timeout: Duration) -> Self {
        self.membership_query_timeout = timeout;
        self
    }

    pub fn with_key_route_affinity(mut self, mode: RouteAffinityMode) -> Self {
        self.key_route_affinity = mode;
        self
    }

    /// Declare the partition key of a table that is only ever written with
    /// unconditional puts, where the key cannot be inferred from traffic
    pub fn with_partition_key<I, S>(mut self, table: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_keys
            .insert(table.into(), attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_key_hashing(mut self, key_hashing: KeyHashing) -> Self {
        self.key_hashing = key_hashing;
        self
    }

    /// True when the refresher has nothing to do
    pub fn refresh_disabled(&self) -> bool {
        self.nodes_list_update_period.is_zero() && self.idle_nodes_list_update_period.is_zero()
    }

    /// Client-wide routing filter
    pub fn routing_filter(&self) -> RoutingFilter {
        RoutingFilter {
            datacenter: self.datacenter.clone(),
            rack: self.rack.clone(),
        }
    }

    /// Seed nodes as descriptors.
    ///
    /// Seeds are assumed live. They carry no datacenter/rack: only a
    /// membership answer can say where a node lives.
    pub fn seed_descriptors(&self) -> Vec<NodeDescriptor> {
        self.seed_nodes
            .iter()
            .map(|addr| NodeDescriptor::new(addr.clone(), self.scheme, self.port))
            .collect()
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seed_nodes.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::NoSeedNodes);
        }
        if let KeyHashing::Ring { virtual_nodes: 0 } = self.key_hashing {
            return Err(ConfigError::InvalidValue {
                key: "key_hashing.virtual_nodes".to_string(),
                value: "0".to_string(),
            });
        }
        if !self.routing_filter().is_unrestricted() && self.refresh_disabled() {
            return Err(ConfigError::Conflict(format!(
                "routing filter {} needs node list refresh to learn node locations",
                self.routing_filter()
            )));
        }
        let (period, idle) = (self.nodes_list_update_period, self.idle_nodes_list_update_period);
        if !period.is_zero() && !idle.is_zero() && idle < period {
            return Err(ConfigError::Conflict(format!(
                "idle update period {}ms is shorter than active update period {}ms",
                idle.as_millis(),
                period.as_millis()
            )));
        }
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();

        // Seed nodes
        if let Some(nodes) = lookup("ALTERNATOR_NODES") {
            config.seed_nodes = split_list(&nodes, ',');
        }

        if let Some(scheme) = lookup("ALTERNATOR_SCHEME") {
            config.scheme = scheme
                .parse()
                .map_err(|_| invalid("ALTERNATOR_SCHEME", &scheme))?;
        }

        if let Some(port) = lookup("ALTERNATOR_PORT") {
            config.port = port.trim().parse().map_err(|_| invalid("ALTERNATOR_PORT", &port))?;
        }

        config.datacenter = lookup("ALTERNATOR_DATACENTER").filter(|s| !s.trim().is_empty());
        config.rack = lookup("ALTERNATOR_RACK").filter(|s| !s.trim().is_empty());

        if let Some(ms) = lookup("ALTERNATOR_UPDATE_PERIOD_MS") {
            config.nodes_list_update_period = parse_millis("ALTERNATOR_UPDATE_PERIOD_MS", &ms)?;
        }
        if let Some(ms) = lookup("ALTERNATOR_IDLE_UPDATE_PERIOD_MS") {
            config.idle_nodes_list_update_period =
                parse_millis("ALTERNATOR_IDLE_UPDATE_PERIOD_MS", &ms)?;
        }
        if let Some(ms) = lookup("ALTERNATOR_MAX_STALENESS_MS") {
            config.max_staleness = parse_millis("ALTERNATOR_MAX_STALENESS_MS", &ms)?;
        }

        if let Some(mode) = lookup("ALTERNATOR_KEY_AFFINITY") {
            config.key_route_affinity = mode
                .parse()
                .map_err(|_| invalid("ALTERNATOR_KEY_AFFINITY", &mode))?;
        }

        if let Some(value) = lookup("ALTERNATOR_PARTITION_KEYS") {
            config.partition_keys = parse_partition_keys(&value)?;
        }

        Ok(config)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn split_list(s: &str, sep: char) -> Vec<String> {
    s.split(sep)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| invalid(key, value))
}

/// Parse `orders=orderId;users=tenant,userId`
pub fn parse_partition_keys(value: &str) -> Result<HashMap<String, Vec<String>>, ConfigError> {
    let mut out = HashMap::new();
    for entry in split_list(value, ';') {
        let (table, attrs) = entry
            .split_once('=')
            .ok_or_else(|| invalid("ALTERNATOR_PARTITION_KEYS", &entry))?;
        let table = table.trim();
        let attrs = split_list(attrs, ',');
        if table.is_empty() || attrs.is_empty() {
            return Err(invalid("ALTERNATOR_PARTITION_KEYS", &entry));
        }
        out.insert(table.to_string(), attrs);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(!config.client_id.is_empty());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.key_route_affinity, RouteAffinityMode::None);
        assert!(config.routing_filter().is_unrestricted());
        assert_eq!(config.validate(), Err(ConfigError::NoSeedNodes));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("ALTERNATOR_NODES", "10.0.0.1, 10.0.0.2,,"),
            ("ALTERNATOR_SCHEME", "https"),
            ("ALTERNATOR_PORT", "8043"),
            ("ALTERNATOR_DATACENTER", "dc1"),
            ("ALTERNATOR_RACK", ""),
            ("ALTERNATOR_UPDATE_PERIOD_MS", "0"),
            ("ALTERNATOR_KEY_AFFINITY", "any-write"),
            ("ALTERNATOR_PARTITION_KEYS", "orders=orderId; users=tenant,userId"),
        ]))
        .unwrap();

        assert_eq!(config.seed_nodes, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(config.scheme, Scheme::Https);
        assert_eq!(config.port, 8043);
        assert_eq!(config.datacenter.as_deref(), Some("dc1"));
        assert_eq!(config.rack, None);
        assert!(config.nodes_list_update_period.is_zero());
        assert!(!config.refresh_disabled());
        assert_eq!(config.key_route_affinity, RouteAffinityMode::AnyWrite);
        assert_eq!(config.partition_keys["users"], vec!["tenant", "userId"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = ClientConfig::from_lookup(lookup_from(&[("ALTERNATOR_PORT", "eighty")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));

        let err = ClientConfig::from_lookup(lookup_from(&[("ALTERNATOR_KEY_AFFINITY", "maybe")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));

        assert!(parse_partition_keys("orders").is_err());
        assert!(parse_partition_keys("orders=").is_err());
    }

    #[test]
    fn test_seed_descriptors_are_untagged() {
        let config = ClientConfig::new(["a", "b"])
            .with_datacenter("dc1")
            .with_rack("r1")
            .with_port(9000);

        let seeds = config.seed_descriptors();
        assert_eq!(seeds.len(), 2);
        assert!(seeds.iter().all(|n| n.alive && n.port == 9000));
        assert!(seeds.iter().all(|n| n.datacenter.is_none() && n.rack.is_none()));
        assert!(!seeds.iter().any(|n| config.routing_filter().matches(n)));
    }

    #[test]
    fn test_filter_requires_refresh() {
        let config = ClientConfig::new(["a"])
            .with_datacenter("dc1")
            .with_nodes_list_update_period(Duration::ZERO)
            .with_idle_nodes_list_update_period(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::Conflict(_))));

        let config = config.with_idle_nodes_list_update_period(Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_idle_period_not_shorter_than_active() {
        let config = ClientConfig::new(["a"])
            .with_nodes_list_update_period(Duration::from_secs(60))
            .with_idle_nodes_list_update_period(Duration::from_secs(1));
        assert!(matches!(config.validate(), Err(ConfigError::Conflict(_))));

        // Either period alone may be zero
        let config = config.with_idle_nodes_list_update_period(Duration::ZERO);
        assert!(config.validate().is_ok());
        let config = config
            .with_nodes_list_update_period(Duration::ZERO)
            .with_idle_nodes_list_update_period(Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }
}
