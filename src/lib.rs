//! Service relay library.
//!
//! Resolves the first path segment of an inbound request to a backend base
//! URL and relays the request there, streaming the response back.

pub mod cli;
pub mod config;
pub mod forwarding;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use forwarding::ForwardingEngine;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::ServiceMap;
