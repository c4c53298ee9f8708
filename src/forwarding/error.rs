//! Forwarding failures and their classification.
//!
//! | Condition                                     | Status |
//! |-----------------------------------------------|--------|
//! | deadline exceeded (admission/connect/headers) | 504    |
//! | connect, DNS, TLS, reset, redirect loop       | 502    |
//! | caller's request body unreadable              | 400    |
//! | `.` or `..` segment in the remaining path     | 400    |
//! | engine shut down                              | 503    |
//! | anything else                                 | 500    |

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::resilience::{DeadlineExceeded, Stalled};

/// Failure to obtain a usable response from a backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("backend unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("relay is shutting down")]
    ShuttingDown,

    #[error("request path contains a dot segment")]
    DotSegment,

    #[error("failed to read the request body: {0}")]
    InboundBody(#[source] axum::Error),

    #[error("unexpected forwarding failure: {0}")]
    Internal(#[source] reqwest::Error),
}

impl ForwardError {
    /// Classify a client error into the gateway taxonomy.
    pub fn from_client(err: reqwest::Error, deadline: Duration) -> Self {
        if err.is_timeout() {
            ForwardError::Timeout(deadline)
        } else if err.is_connect()
            || err.is_request()
            || err.is_redirect()
            || err.is_body()
            || err.is_decode()
        {
            ForwardError::Transport(err)
        } else {
            ForwardError::Internal(err)
        }
    }

    /// Status code surfaced to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::Transport(_) => StatusCode::BAD_GATEWAY,
            ForwardError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ForwardError::InboundBody(_) | ForwardError::DotSegment => StatusCode::BAD_REQUEST,
            ForwardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Timeout(_) => "timeout",
            ForwardError::Transport(_) => "transport",
            ForwardError::ShuttingDown => "shutting_down",
            ForwardError::InboundBody(_) => "inbound_body",
            ForwardError::DotSegment => "dot_segment",
            ForwardError::Internal(_) => "internal",
        }
    }

    /// Message safe to show the caller. Never carries backend details.
    pub fn public_message(&self) -> &'static str {
        match self {
            ForwardError::Timeout(_) => "Backend did not respond in time",
            ForwardError::Transport(_) => "Backend request failed",
            ForwardError::ShuttingDown => "Relay is shutting down",
            ForwardError::InboundBody(_) => "Request body could not be read",
            ForwardError::DotSegment => "Path segments '.' and '..' are not allowed",
            ForwardError::Internal(_) => "Internal server error",
        }
    }
}

impl From<DeadlineExceeded> for ForwardError {
    fn from(e: DeadlineExceeded) -> Self {
        ForwardError::Timeout(e.0)
    }
}

/// Failure while relaying a response body that already started.
///
/// The caller has the status line by then, so these only end the stream.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("backend body failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error(transparent)]
    Stalled(#[from] Stalled),
}
