//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (deadline on admission + connect + response headers)
//!     → response body: timeouts.rs (idle bound between chunks)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: every inbound request is forwarded at most once
//! - A timeout only ends its own request, never the shared client

pub mod timeouts;

pub use timeouts::{idle_timeout, with_deadline, DeadlineExceeded, Stalled};
