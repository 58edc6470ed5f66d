//! `/localnodes` membership source
//!
//! Alternator answers `GET /localnodes` with the nodes of the queried node's
//! datacenter (or of `?dc=`/`&rack=` when given). Older servers return a
//! bare list of addresses; richer answers carry one object per node.
//!
//! A filtered query that comes back empty or rejected is checked against
//! the unfiltered list: if the cluster answers there, the filter names no
//! real location and the cluster view is returned untagged, which the
//! router reports as unsatisfiable.

use alb_core::{MembershipError, MembershipSource};
use alb_types::{NodeDescriptor, RoutingFilter};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Path of the membership endpoint
pub const LOCAL_NODES_PATH: &str = "/localnodes";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LocalNodeEntry {
    Address(String),
    Node(LocalNode),
}

#[derive(Debug, Deserialize)]
struct LocalNode {
    address: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default, alias = "dc")]
    datacenter: Option<String>,
    #[serde(default)]
    rack: Option<String>,
    #[serde(default = "default_alive")]
    alive: bool,
}

fn default_alive() -> bool {
    true
}

/// Turn a `/localnodes` answer into descriptors.
///
/// Nodes inherit scheme and port from the queried node. `scope` is the
/// datacenter/rack the query asked for: the server only lists nodes in it,
/// so bare addresses from a scoped answer are tagged with it. Unscoped
/// answers leave bare addresses untagged.
pub fn parse_local_nodes(
    body: &[u8],
    queried: &NodeDescriptor,
    scope: &RoutingFilter,
) -> Result<Vec<NodeDescriptor>, MembershipError> {
    let entries: Vec<LocalNodeEntry> =
        serde_json::from_slice(body).map_err(|e| MembershipError::MembershipQueryFailed {
            node: queried.node_key(),
            reason: format!("unexpected /localnodes payload: {}", e),
        })?;

    let nodes = entries
        .into_iter()
        .map(|entry| match entry {
            LocalNodeEntry::Address(address) => NodeDescriptor {
                address,
                scheme: queried.scheme,
                port: queried.port,
                rack: scope.rack.clone(),
                datacenter: scope.datacenter.clone(),
                alive: true,
            },
            LocalNodeEntry::Node(node) => NodeDescriptor {
                address: node.address,
                scheme: queried.scheme,
                port: node.port.unwrap_or(queried.port),
                rack: node.rack.or_else(|| scope.rack.clone()),
                datacenter: node.datacenter.or_else(|| scope.datacenter.clone()),
                alive: node.alive,
            },
        })
        .collect();
    Ok(nodes)
}

fn query_params(scope: &RoutingFilter) -> Vec<(&'static str, &str)> {
    let mut params = Vec::new();
    if let Some(dc) = &scope.datacenter {
        params.push(("dc", dc.as_str()));
    }
    if let Some(rack) = &scope.rack {
        params.push(("rack", rack.as_str()));
    }
    params
}

/// Outcome of one `/localnodes` request that reached the server
enum Reply {
    Nodes(Vec<NodeDescriptor>),
    /// 4xx: the server refused the query as asked
    Rejected(StatusCode),
}

/// [`MembershipSource`] querying Alternator over HTTP
#[derive(Debug, Clone)]
pub struct HttpMembershipSource {
    client: reqwest::Client,
    filter: RoutingFilter,
    timeout: Duration,
}

impl HttpMembershipSource {
    /// `timeout` bounds each `/localnodes` request; `client` may be shared
    /// with the data path
    pub fn new(client: reqwest::Client, filter: RoutingFilter, timeout: Duration) -> Self {
        Self { client, filter, timeout }
    }

    async fn query(&self, target: &NodeDescriptor, scope: &RoutingFilter) -> Result<Reply, MembershipError> {
        let url = target.endpoint().url(LOCAL_NODES_PATH);
        let failed = |reason: String| MembershipError::MembershipQueryFailed {
            node: target.node_key(),
            reason,
        };
        let request_err = |e: reqwest::Error| {
            if e.is_timeout() {
                MembershipError::Timeout { node: target.node_key() }
            } else {
                failed(e.to_string())
            }
        };

        let response = self
            .client
            .get(&url)
            .query(&query_params(scope))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        if status.is_client_error() {
            return Ok(Reply::Rejected(status));
        }
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status)));
        }

        let body = response.bytes().await.map_err(request_err)?;
        parse_local_nodes(&body, target, scope).map(Reply::Nodes)
    }

    fn rejected(target: &NodeDescriptor, status: StatusCode) -> MembershipError {
        MembershipError::MembershipQueryFailed {
            node: target.node_key(),
            reason: format!("HTTP {}", status),
        }
    }
}

#[async_trait]
impl MembershipSource for HttpMembershipSource {
    async fn fetch_nodes(&self, target: &NodeDescriptor) -> Result<Vec<NodeDescriptor>, MembershipError> {
        let scoped = match self.query(target, &self.filter).await? {
            Reply::Nodes(nodes) if !nodes.is_empty() || self.filter.is_unrestricted() => return Ok(nodes),
            Reply::Rejected(status) if self.filter.is_unrestricted() => return Err(Self::rejected(target, status)),
            reply => reply,
        };

        // Nothing in the requested location: does the cluster know it at all?
        debug!(filter = %self.filter, node = %target.node_key(), "Filtered query empty; checking cluster view");
        let cluster = match self.query(target, &RoutingFilter::any()).await? {
            Reply::Nodes(nodes) => nodes,
            Reply::Rejected(status) => return Err(Self::rejected(target, status)),
        };
        if cluster.is_empty() {
            return match scoped {
                Reply::Nodes(nodes) => Ok(nodes),
                Reply::Rejected(status) => Err(Self::rejected(target, status)),
            };
        }

        warn!(
            filter = %self.filter,
            cluster_nodes = cluster.len(),
            "Requested datacenter/rack has no nodes in cluster membership"
        );
        Ok(cluster)
    }

    fn name(&self) -> &'static str {
        "localnodes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::TestServer;
    use alb_core::NodeDirectory;
    use alb_router_core::{PartitionKeyLearner, Router, RouterError};
    use alb_types::Scheme;
    use std::sync::Arc;

    fn queried() -> NodeDescriptor {
        NodeDescriptor::new("10.0.0.1", Scheme::Https, 8043)
    }

    #[test]
    fn test_parse_address_list() {
        let filter = RoutingFilter::datacenter("dc1").with_rack("r1");
        let nodes = parse_local_nodes(br#"["10.0.0.1","10.0.0.2"]"#, &queried(), &filter).unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].address, "10.0.0.2");
        assert_eq!(nodes[1].scheme, Scheme::Https);
        assert_eq!(nodes[1].port, 8043);
        assert_eq!(nodes[1].datacenter.as_deref(), Some("dc1"));
        assert_eq!(nodes[1].rack.as_deref(), Some("r1"));
        assert!(nodes.iter().all(|n| n.alive));
    }

    #[test]
    fn test_parse_node_objects() {
        let body = br#"[
            {"address": "10.0.0.1", "dc": "dc1", "rack": "r1"},
            {"address": "10.0.0.2", "datacenter": "dc1", "rack": "r2", "alive": false, "port": 9000}
        ]"#;
        let nodes = parse_local_nodes(body, &queried(), &RoutingFilter::any()).unwrap();

        assert_eq!(nodes[0].datacenter.as_deref(), Some("dc1"));
        assert!(nodes[0].alive);
        assert_eq!(nodes[0].port, 8043);
        assert_eq!(nodes[1].rack.as_deref(), Some("r2"));
        assert!(!nodes[1].alive);
        assert_eq!(nodes[1].port, 9000);
    }

    #[test]
    fn test_parse_unfiltered_addresses_are_untagged() {
        let nodes = parse_local_nodes(br#"["a"]"#, &queried(), &RoutingFilter::any()).unwrap();
        assert!(nodes[0].datacenter.is_none());
        assert!(nodes[0].rack.is_none());
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse_local_nodes(b"[]", &queried(), &RoutingFilter::any()).unwrap().is_empty());

        let err = parse_local_nodes(b"{\"nodes\": 1}", &queried(), &RoutingFilter::any()).unwrap_err();
        assert!(matches!(err, MembershipError::MembershipQueryFailed { .. }));
    }

    #[test]
    fn test_query_params_follow_filter() {
        assert!(query_params(&RoutingFilter::any()).is_empty());
        assert_eq!(
            query_params(&RoutingFilter::datacenter("dc1").with_rack("r1")),
            vec![("dc", "dc1"), ("rack", "r1")]
        );
    }

    fn source(filter: RoutingFilter) -> HttpMembershipSource {
        HttpMembershipSource::new(reqwest::Client::new(), filter, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_fetch_sends_filter_and_tags_answer() {
        let server = TestServer::start(Duration::ZERO, |_| (200, r#"["127.0.0.1","127.0.0.2"]"#.to_string())).await;
        let nodes = source(RoutingFilter::datacenter("dc1").with_rack("r1"))
            .fetch_nodes(&server.node())
            .await
            .unwrap();

        assert_eq!(server.request_lines(), vec!["GET /localnodes?dc=dc1&rack=r1 HTTP/1.1"]);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].address, "127.0.0.2");
        assert_eq!(nodes[1].port, server.port());
        assert!(nodes.iter().all(|n| n.datacenter.as_deref() == Some("dc1") && n.rack.as_deref() == Some("r1")));
    }

    #[tokio::test]
    async fn test_fetch_unfiltered() {
        let server = TestServer::start(Duration::ZERO, |_| (200, r#"["127.0.0.1"]"#.to_string())).await;
        let nodes = source(RoutingFilter::any()).fetch_nodes(&server.node()).await.unwrap();

        assert_eq!(server.request_lines(), vec!["GET /localnodes HTTP/1.1"]);
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].datacenter.is_none());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = TestServer::start(Duration::ZERO, |_| (400, r#"{"message":"bad"}"#.to_string())).await;
        let err = source(RoutingFilter::any()).fetch_nodes(&server.node()).await.unwrap_err();
        match err {
            MembershipError::MembershipQueryFailed { reason, .. } => assert!(reason.contains("400"), "{}", reason),
            other => panic!("unexpected error: {}", other),
        }

        let server = TestServer::start(Duration::ZERO, |_| (503, String::new())).await;
        let err = source(RoutingFilter::any()).fetch_nodes(&server.node()).await.unwrap_err();
        assert!(matches!(err, MembershipError::MembershipQueryFailed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_empty_list() {
        let server = TestServer::start(Duration::ZERO, |_| (200, "[]".to_string())).await;
        let nodes = source(RoutingFilter::any()).fetch_nodes(&server.node()).await.unwrap();
        assert!(nodes.is_empty());
        assert_eq!(server.requests().len(), 1);

        // Filtered and unfiltered both empty: nothing to learn either way
        let nodes = source(RoutingFilter::datacenter("dc1")).fetch_nodes(&server.node()).await.unwrap();
        assert!(nodes.is_empty());
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = TestServer::start(Duration::from_millis(300), |_| (200, "[]".to_string())).await;
        let source = HttpMembershipSource::new(reqwest::Client::new(), RoutingFilter::any(), Duration::from_millis(50));
        let err = source.fetch_nodes(&server.node()).await.unwrap_err();
        assert!(matches!(err, MembershipError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_unknown_datacenter_returns_cluster_view() {
        let server = TestServer::start(Duration::ZERO, |line| {
            if line.contains("dc=") {
                (200, "[]".to_string())
            } else {
                (200, r#"["127.0.0.1","127.0.0.2"]"#.to_string())
            }
        })
        .await;
        let filter = RoutingFilter::datacenter("dc-typo");
        let nodes = source(filter.clone()).fetch_nodes(&server.node()).await.unwrap();

        assert_eq!(
            server.request_lines(),
            vec!["GET /localnodes?dc=dc-typo HTTP/1.1", "GET /localnodes HTTP/1.1"]
        );
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.datacenter.is_none()));

        // Published, this membership refutes the filter
        let directory = Arc::new(NodeDirectory::from_seeds(vec![server.node()]));
        directory.publish(nodes);
        let router = Router::new(directory, Arc::new(PartitionKeyLearner::new()));
        assert!(matches!(
            router.select_round_robin(&filter),
            Err(RouterError::FilterUnsatisfiable(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_rack_returns_cluster_view() {
        let server = TestServer::start(Duration::ZERO, |line| {
            if line.contains("rack=") {
                (400, r#"{"message":"unknown rack"}"#.to_string())
            } else {
                (200, r#"[{"address":"127.0.0.1","dc":"dc1","rack":"r1"}]"#.to_string())
            }
        })
        .await;
        let nodes = source(RoutingFilter::datacenter("dc1").with_rack("r9"))
            .fetch_nodes(&server.node())
            .await
            .unwrap();

        assert_eq!(server.requests().len(), 2);
        assert_eq!(nodes[0].rack.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_filtered_rejection_without_cluster_view_is_an_error() {
        let server = TestServer::start(Duration::ZERO, |line| {
            if line.contains("dc=") {
                (400, String::new())
            } else {
                (200, "[]".to_string())
            }
        })
        .await;
        let err = source(RoutingFilter::datacenter("dc1")).fetch_nodes(&server.node()).await.unwrap_err();
        assert!(matches!(err, MembershipError::MembershipQueryFailed { .. }));
    }
}
