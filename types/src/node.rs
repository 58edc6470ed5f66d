//! Node descriptors
//!
//! A `NodeDescriptor` is an immutable value produced by a membership query.
//! A node that changes (goes down, moves rack) is represented by a new
//! descriptor inside a new directory snapshot, never by mutating this one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Transport scheme used to reach a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Default for Scheme {
    fn default() -> Self {
        Self::Http
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
        }
    }
}

impl FromStr for Scheme {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(TypesError::InvalidScheme(other.to_string())),
        }
    }
}

/// Destination of a single outgoing call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Build a URL for `path` on this endpoint
    pub fn url(&self, path: &str) -> String {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            // bare IPv6 literal
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{}://{}:{}{}", self.scheme, host, self.port, path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url(""))
    }
}

/// One addressable Alternator node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Host name or IP address
    pub address: String,

    /// Scheme used to reach the node
    pub scheme: Scheme,

    /// Alternator port
    pub port: u16,

    /// Rack the node lives in (None = not reported)
    pub rack: Option<String>,

    /// Datacenter the node lives in (None = not reported)
    pub datacenter: Option<String>,

    /// Whether the node was reported live by the last membership query
    pub alive: bool,
}

impl NodeDescriptor {
    /// Create a live node with no topology metadata
    pub fn new(address: impl Into<String>, scheme: Scheme, port: u16) -> Self {
        Self {
            address: address.into(),
            scheme,
            port,
            rack: None,
            datacenter: None,
            alive: true,
        }
    }

    /// Set the datacenter
    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    /// Set the rack
    pub fn with_rack(mut self, rack: impl Into<String>) -> Self {
        self.rack = Some(rack.into());
        self
    }

    /// Set liveness
    pub fn with_alive(mut self, alive: bool) -> Self {
        self.alive = alive;
        self
    }

    /// Stable identity of the node, independent of liveness and topology tags
    pub fn node_key(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Endpoint a request should be sent to
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            scheme: self.scheme,
            host: self.address.clone(),
            port: self.port,
        }
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{} (dc={}, rack={}, {})",
            self.scheme,
            self.address,
            self.port,
            self.datacenter.as_deref().unwrap_or("-"),
            self.rack.as_deref().unwrap_or("-"),
            if self.alive { "up" } else { "down" },
        )
    }
}
