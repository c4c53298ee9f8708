//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the caller sent none
//! - Split the inbound request into service name and engine input
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The ID travels to the backend as an ordinary end-to-end header
//! - Path and query stay raw; nothing is decoded or re-encoded here

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

use crate::forwarding::InboundRequest;
use crate::routing::split_service_path;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Produces UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer that assigns `x-request-id` to requests lacking one.
pub fn set_request_id_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId)
}

/// Layer that copies `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Read access to the request ID.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> &str {
        self.get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers().request_id()
    }
}

/// Split a request into its service name and the engine's view of it.
///
/// Returns the request untouched when its path has no service segment
/// under `prefix`.
pub fn split_request(
    request: Request<Body>,
    prefix: &str,
) -> Result<(String, InboundRequest), Request<Body>> {
    let Some(split) = split_service_path(request.uri().path(), prefix) else {
        return Err(request);
    };
    let service = split.service.to_string();
    let remaining_path = split.remaining.map(str::to_string);
    let query = request.uri().query().map(str::to_string);

    let (parts, body) = request.into_parts();
    Ok((
        service,
        InboundRequest {
            method: parts.method,
            remaining_path,
            query,
            headers: parts.headers,
            body,
        },
    ))
}
