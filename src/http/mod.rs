//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (request ID, split service name / remaining path)
//!     → routing (service → backend)
//!     → forwarding (outbound request, streamed response)
//!     → headers.rs (hop-by-hop filtering, both directions)
//!     → response.rs (relay or map failure to a status)
//!     → Send to client
//! ```

pub mod diagnostics;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use response::RelayError;
pub use server::{AppState, HttpServer, ServerError};
