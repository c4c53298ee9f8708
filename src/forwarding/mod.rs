//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Backend + InboundRequest
//!     → engine.rs (target URL, filtered headers, streamed body)
//!     → pool.rs (admission slot, shared pooled client)
//!     → resilience::timeouts (deadline until response headers)
//!     → engine.rs (filtered response headers, idle-bounded body stream)
//!     → Return: ProxyResponse or ForwardError (error.rs)
//! ```
//!
//! # Design Decisions
//! - One client per process, injected rather than global
//! - Errors are typed and mapped to gateway statuses in one place
//! - Bytes are relayed as they arrive, in order, never re-serialized

pub mod engine;
pub mod error;
pub mod pool;

pub use engine::{ForwardingEngine, InboundRequest, ProxyResponse};
pub use error::{BodyError, ForwardError};
pub use pool::{build_client, ExchangeGuard, UpstreamPool};
