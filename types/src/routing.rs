//! Routing filters and modes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::node::NodeDescriptor;
use crate::operation::OperationKind;
use crate::TypesError;

/// Datacenter/rack restriction applied to node selection.
///
/// Filtering is a pure predicate: it never touches the directory it is
/// applied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingFilter {
    /// Required datacenter (None = any)
    pub datacenter: Option<String>,

    /// Required rack (None = any)
    pub rack: Option<String>,
}

impl RoutingFilter {
    /// Filter that accepts every node
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to a datacenter
    pub fn datacenter(datacenter: impl Into<String>) -> Self {
        Self {
            datacenter: Some(datacenter.into()),
            rack: None,
        }
    }

    /// Additionally restrict to a rack
    pub fn with_rack(mut self, rack: impl Into<String>) -> Self {
        self.rack = Some(rack.into());
        self
    }

    /// True when no restriction is set
    pub fn is_unrestricted(&self) -> bool {
        self.datacenter.is_none() && self.rack.is_none()
    }

    /// Topology match only; liveness is checked separately
    pub fn matches(&self, node: &NodeDescriptor) -> bool {
        let dc_ok = match &self.datacenter {
            Some(dc) => node.datacenter.as_deref() == Some(dc.as_str()),
            None => true,
        };
        let rack_ok = match &self.rack {
            Some(rack) => node.rack.as_deref() == Some(rack.as_str()),
            None => true,
        };
        dc_ok && rack_ok
    }
}

impl fmt::Display for RoutingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dc={}, rack={}",
            self.datacenter.as_deref().unwrap_or("*"),
            self.rack.as_deref().unwrap_or("*"),
        )
    }
}

/// When key-based deterministic routing applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteAffinityMode {
    /// Never route by key
    None,
    /// Only conditional read-modify-write operations
    RmwOnly,
    /// Every write operation
    AnyWrite,
}

impl Default for RouteAffinityMode {
    fn default() -> Self {
        Self::None
    }
}

impl RouteAffinityMode {
    /// Whether key routing is allowed for `kind` under this mode
    pub fn permits(&self, kind: OperationKind) -> bool {
        match self {
            RouteAffinityMode::None => false,
            RouteAffinityMode::RmwOnly => kind.is_read_modify_write(),
            RouteAffinityMode::AnyWrite => kind.is_write(),
        }
    }
}

impl fmt::Display for RouteAffinityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteAffinityMode::None => write!(f, "none"),
            RouteAffinityMode::RmwOnly => write!(f, "rmw"),
            RouteAffinityMode::AnyWrite => write!(f, "any-write"),
        }
    }
}

impl FromStr for RouteAffinityMode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(RouteAffinityMode::None),
            "rmw" | "rmw-only" | "lwt" => Ok(RouteAffinityMode::RmwOnly),
            "any-write" | "anywrite" | "write" => Ok(RouteAffinityMode::AnyWrite),
            other => Err(TypesError::InvalidAffinityMode(other.to_string())),
        }
    }
}

/// How a key is mapped onto the eligible node set.
///
/// `Ring` only moves keys owned by nodes that joined or left. `Modulo`
/// takes the hash modulo the eligible set size; it is simpler but remaps
/// nearly every key whenever membership changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyHashing {
    Ring { virtual_nodes: u32 },
    Modulo,
}

impl Default for KeyHashing {
    fn default() -> Self {
        Self::Ring { virtual_nodes: 150 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Scheme;

    fn node(dc: &str, rack: &str) -> NodeDescriptor {
        NodeDescriptor::new("n", Scheme::Http, 8000)
            .with_datacenter(dc)
            .with_rack(rack)
    }

    #[test]
    fn test_filter_matches() {
        let n = node("dc1", "r1");

        assert!(RoutingFilter::any().matches(&n));
        assert!(RoutingFilter::datacenter("dc1").matches(&n));
        assert!(RoutingFilter::datacenter("dc1").with_rack("r1").matches(&n));
        assert!(!RoutingFilter::datacenter("dc2").matches(&n));
        assert!(!RoutingFilter::datacenter("dc1").with_rack("r2").matches(&n));
    }

    #[test]
    fn test_filter_rejects_untagged_node() {
        let n = NodeDescriptor::new("n", Scheme::Http, 8000);
        assert!(!RoutingFilter::datacenter("dc1").matches(&n));
        assert!(RoutingFilter::any().matches(&n));
    }

    #[test]
    fn test_affinity_mode_permits() {
        use OperationKind::*;

        assert!(!RouteAffinityMode::None.permits(ConditionalUpdateItem));

        assert!(RouteAffinityMode::RmwOnly.permits(ConditionalUpdateItem));
        assert!(RouteAffinityMode::RmwOnly.permits(ConditionalDeleteItem));
        assert!(!RouteAffinityMode::RmwOnly.permits(PutItem));
        assert!(!RouteAffinityMode::RmwOnly.permits(UpdateItem));

        assert!(RouteAffinityMode::AnyWrite.permits(PutItem));
        assert!(RouteAffinityMode::AnyWrite.permits(DeleteItem));
        assert!(RouteAffinityMode::AnyWrite.permits(ConditionalPutItem));
        assert!(!RouteAffinityMode::AnyWrite.permits(GetItem));
        assert!(!RouteAffinityMode::AnyWrite.permits(CreateTable));
    }

    #[test]
    fn test_affinity_mode_parse() {
        assert_eq!("none".parse::<RouteAffinityMode>().unwrap(), RouteAffinityMode::None);
        assert_eq!("RMW".parse::<RouteAffinityMode>().unwrap(), RouteAffinityMode::RmwOnly);
        assert_eq!("any-write".parse::<RouteAffinityMode>().unwrap(), RouteAffinityMode::AnyWrite);
        assert!("sometimes".parse::<RouteAffinityMode>().is_err());
    }
}
