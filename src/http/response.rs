//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn a relayed backend response into the caller's response
//! - Map routing and forwarding failures to caller-visible statuses
//! - Log failure causes server-side; show the caller a generic message
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire body
//! - Error bodies are small JSON documents and never name a backend
//! - Backend timeouts result in 504 Gateway Timeout

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::forwarding::{ForwardError, ProxyResponse};
use crate::routing::NotFound;

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Everything that can stop a request from being relayed.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    UnknownService(#[from] NotFound),

    #[error("no proxy route matched")]
    NoRoute,

    #[error(transparent)]
    Forward(#[from] ForwardError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<&'a [String]>,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::UnknownService(_) | RelayError::NoRoute => StatusCode::NOT_FOUND,
            RelayError::Forward(e) => e.status(),
        }
    }

    /// Record the failure with as much detail as the logs may carry.
    pub fn log(&self) {
        match self {
            RelayError::UnknownService(e) => {
                tracing::warn!(service = %e.service, "Unknown service");
            }
            RelayError::NoRoute => tracing::debug!("No proxy route matched"),
            RelayError::Forward(e @ ForwardError::Internal(_)) => {
                tracing::error!(error = ?e, "Forwarding failed unexpectedly");
            }
            RelayError::Forward(e @ (ForwardError::InboundBody(_) | ForwardError::DotSegment)) => {
                tracing::info!(error = %e, "Request refused");
            }
            RelayError::Forward(e @ ForwardError::ShuttingDown) => {
                tracing::info!(error = %e, "Request refused during shutdown");
            }
            RelayError::Forward(e) => {
                tracing::warn!(kind = e.kind(), error = %e, "Upstream error");
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            RelayError::UnknownService(e) => {
                let message = e.to_string();
                Json(ErrorBody {
                    error: &message,
                    services: Some(&e.known),
                })
                .into_response()
            }
            RelayError::NoRoute => Json(ErrorBody {
                error: "no proxy route matched",
                services: None,
            })
            .into_response(),
            RelayError::Forward(e) => Json(ErrorBody {
                error: e.public_message(),
                services: None,
            })
            .into_response(),
        };
        (status, body).into_response()
    }
}
