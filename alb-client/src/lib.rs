//! Alb Client - load-balancing Alternator client
//!
//! Wires the pieces together:
//! - a [`NodeDirectory`] seeded from configuration
//! - a [`LivenessRefresher`] keeping it current in the background
//! - a [`Router`] and [`PartitionKeyLearner`] choosing a node per call
//! - a [`RequestInterceptor`] sending each call to its node

pub mod adapter;
pub mod error;
pub mod interceptor;
pub mod membership;
pub mod transport;

#[cfg(test)]
mod test_server;

pub use error::{ClientError, ClientResult};
pub use interceptor::RequestInterceptor;
pub use membership::HttpMembershipSource;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

use alb_core::{ActivityTracker, ClientConfig, LivenessRefresher, MembershipSource, NodeDirectory, RefreshSettings, RefresherHandle};
use alb_router_core::{PartitionKeyLearner, Router, RoutingDecision};
use alb_types::RoutableOperation;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument, Span};

/// Alternator client with client-side load balancing
pub struct AlternatorClient {
    config: ClientConfig,
    directory: Arc<NodeDirectory>,
    router: Arc<Router>,
    interceptor: RequestInterceptor,
    refresher: RefresherHandle,
    span: Span,
}

impl AlternatorClient {
    /// Start a client over the given membership source and transport.
    ///
    /// The directory starts from the seed nodes. When refresh is enabled,
    /// one membership query runs before this returns so routing starts from
    /// real topology; if it fails the seeds serve until the background
    /// refresher succeeds.
    pub async fn start(
        config: ClientConfig,
        source: Arc<dyn MembershipSource>,
        transport: Arc<dyn Transport>,
    ) -> ClientResult<Self> {
        config.validate()?;

        let span = info_span!("alternator_client", client_id = %config.client_id);

        let seeds = config.seed_descriptors();
        let directory = Arc::new(NodeDirectory::from_seeds(seeds.clone()));
        let learner = Arc::new(PartitionKeyLearner::with_preconfigured(&config.partition_keys));
        let router = Arc::new(Router::with_key_hashing(directory.clone(), learner, config.key_hashing));
        let activity = Arc::new(ActivityTracker::new());

        let refresher = Arc::new(LivenessRefresher::new(
            directory.clone(),
            source,
            seeds,
            RefreshSettings::from_config(&config),
            activity.clone(),
        ));
        if !config.refresh_disabled() {
            if let Err(e) = refresher.refresh_once().instrument(span.clone()).await {
                span.in_scope(|| debug!(error = %e, "Initial membership query failed; routing to seeds"));
            }
        }
        let refresher = span.in_scope(|| refresher.spawn());

        let interceptor = RequestInterceptor::new(
            router.clone(),
            transport,
            activity,
            config.key_route_affinity,
            config.routing_filter(),
        );

        span.in_scope(|| {
            info!(
                seeds = config.seed_nodes.len(),
                nodes = directory.get().len(),
                filter = %config.routing_filter(),
                affinity = %config.key_route_affinity,
                "Alternator client started"
            )
        });

        Ok(Self {
            config,
            directory,
            router,
            interceptor,
            refresher,
            span,
        })
    }

    /// Start a client talking HTTP to the cluster
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        let http = transport::build_http_client()?;
        let source = Arc::new(HttpMembershipSource::new(
            http.clone(),
            config.routing_filter(),
            config.membership_query_timeout,
        ));
        let transport = Arc::new(ReqwestTransport::new(http));
        Self::start(config, source, transport).await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<NodeDirectory> {
        &self.directory
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn learner(&self) -> &Arc<PartitionKeyLearner> {
        self.router.learner()
    }

    pub fn interceptor(&self) -> &RequestInterceptor {
        &self.interceptor
    }

    /// Choose the node for `op` without sending anything
    pub fn route<O: RoutableOperation + ?Sized>(&self, op: &O) -> ClientResult<RoutingDecision> {
        let _enter = self.span.enter();
        self.interceptor.route(op)
    }

    /// Route and send a raw DynamoDB call
    pub async fn execute(&self, request: &HttpRequest) -> ClientResult<HttpResponse> {
        self.interceptor.execute(request).instrument(self.span.clone()).await
    }

    /// Route `op` and send `request` for it
    pub async fn dispatch<O: RoutableOperation + ?Sized>(
        &self,
        op: &O,
        request: &HttpRequest,
    ) -> ClientResult<HttpResponse> {
        self.interceptor.dispatch(op, request).instrument(self.span.clone()).await
    }

    /// Stop background refresh and release pooled connections.
    ///
    /// No snapshot is published after this returns.
    pub async fn stop(self) {
        let Self { refresher, span, .. } = self;
        refresher.stop().instrument(span.clone()).await;
        let _enter = span.enter();
        info!("Alternator client stopped");
    }
}
