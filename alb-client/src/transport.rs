//! Outgoing HTTP
//!
//! The interceptor decides where a call goes; a [`Transport`] only carries
//! it there. One pooled `reqwest::Client` serves every node, so connections
//! to a node are reused across calls routed to it.

use alb_types::Endpoint;
use async_trait::async_trait;
use std::time::Duration;
use tracing::trace;

use crate::error::{ClientError, ClientResult};

/// Header carrying the DynamoDB action name
pub const AMZ_TARGET_HEADER: &str = "X-Amz-Target";

/// Content type of DynamoDB JSON requests
pub const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Idle connections kept per node
pub const MAX_IDLE_CONNECTIONS_PER_NODE: usize = 100;

/// How long an idle pooled connection is kept
pub const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(6);

/// A DynamoDB call, independent of its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// `X-Amz-Target` value, e.g. `DynamoDB_20120810.PutItem`
    pub target: String,
    /// JSON body
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(target: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            target: target.into(),
            body: body.into(),
        }
    }
}

/// Raw response from a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a request to the endpoint chosen for it
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &Endpoint, request: &HttpRequest) -> ClientResult<HttpResponse>;
}

/// Build the pooled HTTP client shared by the transport and membership source.
///
/// The client has no overall timeout; membership queries set their own per
/// request, data calls take as long as the server does.
pub fn build_http_client() -> ClientResult<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_NODE)
        .pool_idle_timeout(IDLE_CONNECTION_TIMEOUT)
        .build()
        .map_err(|e| ClientError::Transport {
            node: "-".to_string(),
            reason: format!("failed to build HTTP client: {}", e),
        })
}

/// [`Transport`] over `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, endpoint: &Endpoint, request: &HttpRequest) -> ClientResult<HttpResponse> {
        let url = endpoint.url("/");
        let transport_err = |e: reqwest::Error| ClientError::Transport {
            node: endpoint.to_string(),
            reason: e.to_string(),
        };

        trace!(url = %url, target = %request.target, "Sending request");
        let response = self
            .client
            .post(&url)
            .header(AMZ_TARGET_HEADER, &request.target)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .body(request.body.clone())
            .send()
            .await
            .map_err(transport_err)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_err)?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::HttpMembershipSource;
    use crate::test_server::TestServer;
    use alb_core::{MembershipError, MembershipSource};
    use alb_types::RoutingFilter;

    #[test]
    fn test_response_success_range() {
        let ok = HttpResponse { status: 200, body: vec![] };
        let bad = HttpResponse { status: 400, body: vec![] };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }

    #[tokio::test]
    async fn test_send_posts_dynamodb_call() {
        let server = TestServer::start(Duration::ZERO, |_| (200, r#"{"TableNames":[]}"#.to_string())).await;
        let transport = ReqwestTransport::new(build_http_client().unwrap());

        let response = transport
            .send(&server.endpoint(), &HttpRequest::new("DynamoDB_20120810.ListTables", "{}"))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.body, br#"{"TableNames":[]}"#.to_vec());

        let request = &server.requests()[0];
        assert_eq!(request.line, "POST / HTTP/1.1");
        assert_eq!(request.header(AMZ_TARGET_HEADER), Some("DynamoDB_20120810.ListTables"));
        assert_eq!(request.header("content-type"), Some(AMZ_JSON_CONTENT_TYPE));
        assert_eq!(request.body, "{}");
    }

    #[tokio::test]
    async fn test_slow_call_outlives_membership_timeout() {
        let server = TestServer::start(Duration::from_millis(300), |line| {
            if line.starts_with("GET") {
                (200, r#"["127.0.0.1"]"#.to_string())
            } else {
                (200, "{}".to_string())
            }
        })
        .await;
        let http = build_http_client().unwrap();
        let source = HttpMembershipSource::new(http.clone(), RoutingFilter::any(), Duration::from_millis(100));
        let transport = ReqwestTransport::new(http);

        // The membership query gives up on the slow node
        let err = source.fetch_nodes(&server.node()).await.unwrap_err();
        assert!(matches!(err, MembershipError::Timeout { .. }));

        // A data call on the same pooled client waits for the answer
        let response = transport
            .send(&server.endpoint(), &HttpRequest::new("DynamoDB_20120810.Scan", "{}"))
            .await
            .unwrap();
        assert!(response.is_success());
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client().is_ok());
    }
}
