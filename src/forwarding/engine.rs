//! The forwarding engine.
//!
//! # Responsibilities
//! - Rebuild an inbound request for the resolved backend
//! - Execute it through the shared pool under the request deadline
//! - Hand back status, filtered headers and a streaming body
//!
//! # Design Decisions
//! - Response bodies are never buffered; request bodies only up to the
//!   replay limit, so redirects that keep the method can resend them
//! - Dropping the relayed body drops the backend response, which closes
//!   that backend connection; caller disconnects therefore propagate
//! - At most one attempt per inbound request

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, StatusCode};
use futures_util::{stream, Stream, StreamExt, TryStreamExt};

use crate::config::ProxyConfig;
use crate::forwarding::error::{BodyError, ForwardError};
use crate::forwarding::pool::{ExchangeGuard, UpstreamPool};
use crate::http::headers::{outbound_request_headers, relayed_response_headers};
use crate::resilience::{idle_timeout, with_deadline};
use crate::routing::{has_dot_segment, join_target, Backend, ServiceMap};

/// One inbound call, already split from its service segment.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    /// Path after the service segment; `None` when nothing followed it.
    pub remaining_path: Option<String>,
    /// Raw query string, without the `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Body,
}

/// A backend response ready to be relayed.
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Whether the inbound body should be attached to the outbound request.
fn carries_body(method: &Method, headers: &HeaderMap) -> bool {
    if matches!(*method, Method::POST | Method::PUT | Method::PATCH) {
        return true;
    }
    let declared_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0);
    declared_length || headers.contains_key(header::TRANSFER_ENCODING)
}

/// Turn the inbound body into the outbound one.
///
/// Bodies that end within `limit` bytes are buffered so the client can
/// replay them on a 307/308 redirect. Longer bodies are streamed: the
/// chunks read so far go first, then the rest as it arrives.
async fn outbound_body(body: Body, limit: usize) -> Result<reqwest::Body, axum::Error> {
    let mut chunks = body.into_data_stream();
    let mut buffered = Vec::new();
    let mut size = 0usize;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        size += chunk.len();
        buffered.push(chunk);
        if size > limit {
            let head = stream::iter(buffered.into_iter().map(Ok::<_, axum::Error>));
            return Ok(reqwest::Body::wrap_stream(head.chain(chunks)));
        }
    }

    let mut whole = Vec::with_capacity(size);
    for chunk in &buffered {
        whole.extend_from_slice(chunk);
    }
    Ok(reqwest::Body::from(whole))
}

/// Forwards requests to backends through one shared, pooled client.
#[derive(Debug)]
pub struct ForwardingEngine {
    pool: UpstreamPool,
    request_timeout: Duration,
    idle_timeout: Duration,
    replay_limit: usize,
}

impl ForwardingEngine {
    /// Create the engine and its pooled client. Call once per process.
    pub fn new(config: &ProxyConfig, services: &ServiceMap) -> Result<Self, reqwest::Error> {
        let pool = UpstreamPool::new(services, &config.timeouts, &config.pool)?;

        tracing::info!(
            backends = services.len(),
            max_connections = config.pool.max_connections,
            max_connections_per_backend = config.pool.max_connections_per_backend,
            request_timeout_secs = config.timeouts.request_secs,
            "Forwarding engine ready"
        );

        Ok(Self {
            pool,
            request_timeout: config.timeouts.request(),
            idle_timeout: config.timeouts.idle(),
            replay_limit: config.pool.replay_buffer_bytes,
        })
    }

    /// Forward `inbound` to `backend` and return the response to relay.
    pub async fn forward(
        &self,
        backend: &Backend,
        inbound: InboundRequest,
    ) -> Result<ProxyResponse, ForwardError> {
        if inbound.remaining_path.as_deref().is_some_and(has_dot_segment) {
            return Err(ForwardError::DotSegment);
        }

        let target = join_target(
            backend.base_url(),
            inbound.remaining_path.as_deref(),
            inbound.query.as_deref(),
        );
        let with_body = carries_body(&inbound.method, &inbound.headers);

        tracing::debug!(
            method = %inbound.method,
            target = %target,
            with_body,
            "Forwarding request"
        );

        let request = self
            .pool
            .client()
            .request(inbound.method, &target)
            .headers(outbound_request_headers(&inbound.headers));
        let body = inbound.body;

        let deadline = self.request_timeout;
        let exchange = async {
            let request = if with_body {
                let body = outbound_body(body, self.replay_limit)
                    .await
                    .map_err(ForwardError::InboundBody)?;
                request.body(body)
            } else {
                request
            };
            let guard = self.pool.admit(backend.origin()).await?;
            let response = request
                .send()
                .await
                .map_err(|e| ForwardError::from_client(e, deadline))?;
            Ok::<_, ForwardError>((guard, response))
        };
        let (guard, response) = with_deadline(deadline, exchange).await??;

        let status = response.status();
        let headers = relayed_response_headers(response.headers());

        tracing::debug!(
            status = status.as_u16(),
            redirected = response.url().as_str() != target.as_str(),
            "Backend responded"
        );

        let chunks = idle_timeout(
            response.bytes_stream().map_err(BodyError::from),
            self.idle_timeout,
        );
        let body = Body::from_stream(RelayBody::new(chunks, guard));

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }

    /// Exchanges currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    /// Stop admitting new exchanges. Idle pooled connections are released
    /// once the last handle to the engine is dropped.
    pub fn shutdown(&self) {
        if !self.pool.is_closed() {
            self.pool.close();
            tracing::info!(in_flight = self.in_flight(), "Forwarding engine closed");
        }
    }
}

/// Streams a backend body to the caller while holding its exchange slot.
struct RelayBody {
    chunks: Pin<Box<dyn Stream<Item = Result<Bytes, BodyError>> + Send>>,
    _guard: ExchangeGuard,
    relayed: u64,
    finished: bool,
}

impl RelayBody {
    fn new<S>(chunks: S, guard: ExchangeGuard) -> Self
    where
        S: Stream<Item = Result<Bytes, BodyError>> + Send + 'static,
    {
        Self {
            chunks: Box::pin(chunks),
            _guard: guard,
            relayed: 0,
            finished: false,
        }
    }
}

impl Stream for RelayBody {
    type Item = Result<Bytes, BodyError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.chunks.as_mut().poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => self.relayed += chunk.len() as u64,
            Poll::Ready(Some(Err(e))) => {
                tracing::warn!(relayed_bytes = self.relayed, error = %e, "Response body ended early");
                self.finished = true;
            }
            Poll::Ready(None) => self.finished = true,
            Poll::Pending => {}
        }
        polled
    }
}

impl Drop for RelayBody {
    fn drop(&mut self) {
        if self.finished {
            tracing::trace!(relayed_bytes = self.relayed, "Response relay finished");
        } else {
            tracing::debug!(
                relayed_bytes = self.relayed,
                "Relay dropped before the backend body completed; exchange cancelled"
            );
        }
    }
}
