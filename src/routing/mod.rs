//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → path.rs (strip prefix, split service segment / remaining path)
//!     → service_map.rs (service name → backend base URL)
//!     → Return: Backend or NotFound (names only)
//!
//! Map Construction (at startup):
//!     [services] table
//!     → validate names and URLs
//!     → Freeze as immutable ServiceMap
//! ```
//!
//! # Design Decisions
//! - Built once at startup, immutable at runtime
//! - A path outside the prefix never reaches the resolver
//! - Remaining paths with dot segments are never joined to a base URL
//! - Deterministic: same input always resolves to the same backend

pub mod path;
pub mod service_map;

pub use path::{has_dot_segment, join_target, split_service_path, ServicePath};
pub use service_map::{Backend, NotFound, ServiceMap, ServiceMapError};
