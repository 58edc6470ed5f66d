//! Request interceptor
//!
//! Sits between the caller and the transport:
//!
//! ```text
//! operation ──► learn schema ──► Router::route ──► rewrite endpoint ──► Transport
//! ```
//!
//! A routing error ends the call here, before any I/O.

use alb_core::ActivityTracker;
use alb_router_core::{PartitionKeyLearner, Router, RoutingDecision};
use alb_types::{RoutableOperation, RouteAffinityMode, RoutingFilter};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::adapter;
use crate::error::ClientResult;
use crate::transport::{HttpRequest, HttpResponse, Transport};

pub struct RequestInterceptor {
    router: Arc<Router>,
    transport: Arc<dyn Transport>,
    activity: Arc<ActivityTracker>,
    mode: RouteAffinityMode,
    filter: RoutingFilter,
}

impl RequestInterceptor {
    pub fn new(
        router: Arc<Router>,
        transport: Arc<dyn Transport>,
        activity: Arc<ActivityTracker>,
        mode: RouteAffinityMode,
        filter: RoutingFilter,
    ) -> Self {
        Self {
            router,
            transport,
            activity,
            mode,
            filter,
        }
    }

    fn learner(&self) -> &PartitionKeyLearner {
        self.router.learner()
    }

    /// Feed whatever schema information `op` carries to the learner
    pub fn learn<O: RoutableOperation + ?Sized>(&self, op: &O) {
        let table = op.table_name();
        if table.is_empty() {
            return;
        }
        if let Some(schema) = op.key_schema() {
            self.learner().learn_from_key_schema(table, schema);
        }
        if let Some(key) = op.key_attributes() {
            self.learner().learn_from_key_argument(table, key.keys().map(String::as_str));
        }
    }

    /// Choose the node for `op` without sending anything
    pub fn route<O: RoutableOperation + ?Sized>(&self, op: &O) -> ClientResult<RoutingDecision> {
        self.learn(op);
        self.activity.mark();

        let table = op.table_name();
        // Puts carry the whole item; only the partition key part routes
        let from_item = match (op.key_attributes(), op.item()) {
            (None, Some(item)) => match self.learner().partition_key_of_item(table, item) {
                Ok(key) => Some(key),
                Err(e) => {
                    debug!(table = %table, reason = %e, "Item key not extractable");
                    None
                }
            },
            _ => None,
        };
        let key_values = op.key_attributes().or(from_item.as_ref());

        let decision = self
            .router
            .route(table, op.operation_kind(), key_values, self.mode, &self.filter)?;
        Ok(decision)
    }

    /// Route `op` and send `request` to the chosen node
    pub async fn dispatch<O: RoutableOperation + ?Sized>(
        &self,
        op: &O,
        request: &HttpRequest,
    ) -> ClientResult<HttpResponse> {
        let decision = self.route(op)?;
        let endpoint = decision.node.endpoint();
        trace!(
            endpoint = %endpoint,
            target = %request.target,
            method = %decision.method,
            "Forwarding request"
        );
        self.transport.send(&endpoint, request).await
    }

    /// Parse a raw DynamoDB call, route it and send it
    pub async fn execute(&self, request: &HttpRequest) -> ClientResult<HttpResponse> {
        let op = adapter::parse_request(&request.target, &request.body)?;
        self.dispatch(&op, request).await
    }
}
