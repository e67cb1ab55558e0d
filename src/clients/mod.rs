//! Outbound client registry.
//!
//! One pooled HTTP client per logical remote capability, each carrying a
//! fixed delegating-handler chain and a bounded connection-handler lifetime.
//! The registry transports remote failures unchanged to the caller; it never
//! retries and never interprets response bodies.

pub mod handlers;

pub use handlers::{HandlerKind, RequestContext};

use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Method, Request, Response, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use url::Url;

use crate::config::schema::DevspacesConfig;
use crate::config::{AppConfig, ConfigError};

/// Default lifetime of a pooled connection handler. Bounded so connection
/// reuse cannot outlive DNS or load-balancer reconfiguration for long.
const DEFAULT_HANDLER_LIFETIME: Duration = Duration::from_secs(2 * 60);

/// Extended lifetime for the high-traffic capabilities.
const EXTENDED_HANDLER_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Logical remote capabilities the hosts call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Catalog,
    Basket,
    Ordering,
    Campaign,
    Location,
    Identity,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::Catalog,
        Capability::Basket,
        Capability::Ordering,
        Capability::Campaign,
        Capability::Location,
        Capability::Identity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Catalog => "catalog",
            Capability::Basket => "basket",
            Capability::Ordering => "ordering",
            Capability::Campaign => "campaign",
            Capability::Location => "location",
            Capability::Identity => "identity",
        }
    }

    /// The fixed handler chain, applied in order.
    pub fn handler_chain(self) -> &'static [HandlerKind] {
        match self {
            Capability::Catalog => &[],
            Capability::Basket | Capability::Campaign | Capability::Location | Capability::Identity => {
                &[HandlerKind::Authorization]
            }
            Capability::Ordering => &[HandlerKind::Authorization, HandlerKind::RequestId],
        }
    }

    pub fn handler_lifetime(self) -> Duration {
        match self {
            Capability::Basket | Capability::Ordering | Capability::Identity => {
                EXTENDED_HANDLER_LIFETIME
            }
            _ => DEFAULT_HANDLER_LIFETIME,
        }
    }
}

/// Immutable description of one registered client.
#[derive(Clone, Debug)]
pub struct ClientDescriptor {
    pub capability: Capability,
    pub base_url: Url,
    pub handlers: &'static [HandlerKind],
    pub handler_lifetime: Duration,
}

/// The pooled connection handler and its birth time.
struct PooledHandler {
    client: Client<HttpConnector, Body>,
    built_at: Instant,
}

impl PooledHandler {
    fn build() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            built_at: Instant::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("outbound request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("invalid outbound request")]
    InvalidRequest,

    #[error("client base URL is unusable")]
    InvalidBaseUrl,
}

/// One registered capability client.
pub struct ServiceClient {
    descriptor: ClientDescriptor,
    devspaces: DevspacesConfig,
    pool: ArcSwap<PooledHandler>,
}

impl ServiceClient {
    fn new(descriptor: ClientDescriptor, devspaces: DevspacesConfig) -> Self {
        Self {
            descriptor,
            devspaces,
            pool: ArcSwap::from_pointee(PooledHandler::build()),
        }
    }

    pub fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    /// Current pooled handler, recycled once its lifetime has elapsed.
    fn handler(&self) -> Client<HttpConnector, Body> {
        let current = self.pool.load();
        if current.built_at.elapsed() <= self.descriptor.handler_lifetime {
            return current.client.clone();
        }

        let fresh = Arc::new(PooledHandler::build());
        let client = fresh.client.clone();
        self.pool.store(fresh);
        tracing::debug!(
            client = self.descriptor.capability.name(),
            "recycled pooled connection handler"
        );
        client
    }

    /// Send an outbound request. The request URI's path and query are kept;
    /// scheme and authority come from the descriptor's base URL (or the
    /// dev-space rewrite when routed). Failures are returned unchanged.
    pub async fn send(
        &self,
        ctx: &RequestContext,
        mut req: Request<Body>,
    ) -> Result<Response<hyper::body::Incoming>, ClientError> {
        *req.uri_mut() = self.outbound_uri(req.uri(), ctx)?;
        for kind in self.descriptor.handlers {
            handlers::apply(*kind, ctx, &mut req);
        }
        Ok(self.handler().request(req).await?)
    }

    /// Convenience GET against the capability.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        path_and_query: &str,
    ) -> Result<Response<hyper::body::Incoming>, ClientError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(path_and_query)
            .body(Body::empty())
            .map_err(|_| ClientError::InvalidRequest)?;
        self.send(ctx, req).await
    }

    fn outbound_uri(&self, original: &Uri, ctx: &RequestContext) -> Result<Uri, ClientError> {
        let base = &self.descriptor.base_url;
        let mut host = base
            .host_str()
            .ok_or(ClientError::InvalidBaseUrl)?
            .to_string();

        // Dev-space routing: prefix the target host with the routed space.
        if self.devspaces.enabled {
            if let Some(route) = &ctx.route_as {
                host = format!("{route}.{host}");
            }
        }

        let authority = match base.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        };
        let path_and_query = original
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        format!("{}://{}{}", base.scheme(), authority, path_and_query)
            .parse()
            .map_err(|_| ClientError::InvalidBaseUrl)
    }

    #[cfg(test)]
    fn pool_handle(&self) -> Arc<PooledHandler> {
        self.pool.load_full()
    }
}

/// The registry: one client per capability, built once at startup.
pub struct ClientRegistry {
    catalog: ServiceClient,
    basket: ServiceClient,
    ordering: ServiceClient,
    campaign: ServiceClient,
    location: ServiceClient,
    identity: ServiceClient,
}

impl ClientRegistry {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let build = |capability: Capability| -> Result<ServiceClient, ConfigError> {
            let raw = match capability {
                Capability::Catalog => &config.services.catalog,
                Capability::Basket => &config.services.basket,
                Capability::Ordering => &config.services.ordering,
                Capability::Campaign => &config.services.campaign,
                Capability::Location => &config.services.location,
                Capability::Identity => &config.services.identity,
            };
            let base_url = Url::parse(raw).map_err(|e| ConfigError::Malformed {
                key: "services",
                reason: format!("{}: {e}", capability.name()),
            })?;
            Ok(ServiceClient::new(
                ClientDescriptor {
                    capability,
                    base_url,
                    handlers: capability.handler_chain(),
                    handler_lifetime: capability.handler_lifetime(),
                },
                config.devspaces.clone(),
            ))
        };

        Ok(Self {
            catalog: build(Capability::Catalog)?,
            basket: build(Capability::Basket)?,
            ordering: build(Capability::Ordering)?,
            campaign: build(Capability::Campaign)?,
            location: build(Capability::Location)?,
            identity: build(Capability::Identity)?,
        })
    }

    pub fn client(&self, capability: Capability) -> &ServiceClient {
        match capability {
            Capability::Catalog => &self.catalog,
            Capability::Basket => &self.basket,
            Capability::Ordering => &self.ordering,
            Capability::Campaign => &self.campaign,
            Capability::Location => &self.location,
            Capability::Identity => &self.identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ClientRegistry {
        ClientRegistry::from_config(&AppConfig::default()).unwrap()
    }

    #[test]
    fn ordering_client_carries_both_handlers_in_order() {
        let chain = registry()
            .client(Capability::Ordering)
            .descriptor()
            .handlers;
        assert_eq!(chain, &[HandlerKind::Authorization, HandlerKind::RequestId]);
    }

    #[test]
    fn catalog_client_carries_no_handlers() {
        assert!(registry().client(Capability::Catalog).descriptor().handlers.is_empty());
    }

    #[test]
    fn high_traffic_capabilities_get_extended_handler_lifetime() {
        let registry = registry();
        assert_eq!(
            registry.client(Capability::Basket).descriptor().handler_lifetime,
            EXTENDED_HANDLER_LIFETIME
        );
        assert_eq!(
            registry.client(Capability::Ordering).descriptor().handler_lifetime,
            EXTENDED_HANDLER_LIFETIME
        );
        assert_eq!(
            registry.client(Capability::Catalog).descriptor().handler_lifetime,
            DEFAULT_HANDLER_LIFETIME
        );
    }

    #[test]
    fn outbound_uri_targets_the_base_url() {
        let client = registry();
        let catalog = client.client(Capability::Catalog);
        let uri = catalog
            .outbound_uri(&"/api/v1/catalog/items?page=1".parse().unwrap(), &RequestContext::default())
            .unwrap();
        assert_eq!(uri.to_string(), "http://localhost:5101/api/v1/catalog/items?page=1");
    }

    #[test]
    fn dev_space_routing_rewrites_the_target_host() {
        let mut config = AppConfig::default();
        config.devspaces.enabled = true;
        let registry = ClientRegistry::from_config(&config).unwrap();

        let ctx = RequestContext {
            route_as: Some("alice".to_string()),
            ..RequestContext::default()
        };
        let uri = registry
            .client(Capability::Basket)
            .outbound_uri(&"/api/v1/basket".parse().unwrap(), &ctx)
            .unwrap();
        assert_eq!(uri.to_string(), "http://alice.localhost:5103/api/v1/basket");
    }

    #[tokio::test]
    async fn pooled_handler_is_recycled_after_its_lifetime() {
        let mut descriptor = registry().client(Capability::Catalog).descriptor().clone();
        descriptor.handler_lifetime = Duration::ZERO;
        let client = ServiceClient::new(descriptor, DevspacesConfig::default());

        let before = client.pool_handle();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let _ = client.handler();
        let after = client.pool_handle();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn pooled_handler_is_reused_within_its_lifetime() {
        let client = registry();
        let catalog = client.client(Capability::Catalog);

        let before = catalog.pool_handle();
        let _ = catalog.handler();
        let after = catalog.pool_handle();
        assert!(Arc::ptr_eq(&before, &after));
    }
}
