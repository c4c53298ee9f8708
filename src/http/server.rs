//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy and diagnostic handlers
//! - Wire up middleware (request ID, tracing)
//! - Resolve the service and hand the request to the forwarding engine
//! - Serve until shutdown, then close the engine

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::{get, on, MethodFilter},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::forwarding::{ForwardingEngine, InboundRequest};
use crate::http::diagnostics::{get_health, get_info, no_route};
use crate::http::request::{
    propagate_request_id_layer, set_request_id_layer, split_request, RequestIdExt,
};
use crate::http::response::RelayError;
use crate::observability::metrics;
use crate::routing::{ServiceMap, ServiceMapError};

/// Methods relayed to backends.
const RELAYED_METHODS: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PUT)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::DELETE)
    .or(MethodFilter::HEAD)
    .or(MethodFilter::OPTIONS);

/// Failure to assemble the server from a configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid service map: {0}")]
    Services(#[from] ServiceMapError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ServiceMap>,
    pub engine: Arc<ForwardingEngine>,
    pub prefix: Arc<str>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    engine: Arc<ForwardingEngine>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The configuration is validated first; an invalid one is refused.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let services = Arc::new(ServiceMap::from_config(&config.services)?);
        let engine = Arc::new(ForwardingEngine::new(&config, &services)?);

        let state = AppState {
            services,
            engine: engine.clone(),
            prefix: Arc::from(config.listener.path_prefix.trim_end_matches('/')),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            engine,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let prefix = state.prefix.to_string();

        let mut router = Router::new();
        if prefix.is_empty() {
            router = router.route("/", get(get_info));
        } else {
            router = router
                .route(&prefix, get(get_info))
                .route(&format!("{prefix}/"), get(get_info));
        }

        router
            .route(&format!("{prefix}/health"), get(get_health))
            .route(&format!("{prefix}/{{service}}"), on(RELAYED_METHODS, proxy_handler))
            .route(&format!("{prefix}/{{service}}/"), on(RELAYED_METHODS, proxy_handler))
            .route(
                &format!("{prefix}/{{service}}/{{*rest}}"),
                on(RELAYED_METHODS, proxy_handler),
            )
            .fallback(no_route)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        tracing::info_span!(
                            "http",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %req.request_id(),
                        )
                    }))
                    .layer(propagate_request_id_layer()),
            )
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the forwarding engine.
    pub fn engine(&self) -> Arc<ForwardingEngine> {
        self.engine.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then release the engine.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefix = %self.config.listener.path_prefix,
            services = self.config.services.len(),
            "HTTP server starting"
        );

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining connections");
            })
            .await;

        self.engine.shutdown();
        tracing::info!("HTTP server stopped");
        served
    }
}

/// Main proxy handler.
/// Resolves the service, forwards the request and relays the outcome.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();

    let (service, inbound) = match split_request(request, &state.prefix) {
        Ok(split) => split,
        Err(_) => {
            let err = RelayError::NoRoute;
            err.log();
            return err.into_response();
        }
    };

    let span = tracing::info_span!("relay", service = %service);
    async move {
        let response = match relay(&state, &service, inbound).await {
            Ok(response) => response,
            Err(err) => {
                err.log();
                if let RelayError::Forward(e) = &err {
                    metrics::record_upstream_error(&service, e.kind());
                }
                err.into_response()
            }
        };

        let status = response.status();
        metrics::record_request(&service, method.as_str(), status.as_u16(), start_time);
        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Response headers relayed"
        );
        response
    }
    .instrument(span)
    .await
}

async fn relay(
    state: &AppState,
    service: &str,
    inbound: InboundRequest,
) -> Result<Response, RelayError> {
    let backend = state.services.resolve(service)?;
    let proxied = state.engine.forward(backend, inbound).await?;
    Ok(proxied.into_response())
}
