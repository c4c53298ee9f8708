//! Service name to backend resolution.
//!
//! # Responsibilities
//! - Validate service names and backend base URLs once, at startup
//! - Resolve a service name to its backend (exact, case-sensitive)
//! - Report unknown names without ever exposing backend URLs
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - `BTreeMap` keeps lookups O(log n) and the name listing sorted
//! - Trailing slashes are trimmed so joining a path never doubles them

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use url::Url;

/// Names answered by the relay itself and therefore unusable as services.
pub const RESERVED_NAMES: &[&str] = &["health"];

/// Error raised while building a [`ServiceMap`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceMapError {
    #[error("service name must not be empty")]
    EmptyName,

    #[error("service name `{0}` must not contain '/'")]
    SlashInName(String),

    #[error("service name `{0}` is reserved")]
    ReservedName(String),

    #[error("service `{0}` is defined more than once")]
    Duplicate(String),

    #[error("service `{name}` has an invalid backend URL: {reason}")]
    InvalidUrl { name: String, reason: String },
}

/// Lookup failure for a service name that is not configured.
///
/// Carries only names, so rendering it to a caller is always safe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown service `{service}`")]
pub struct NotFound {
    pub service: String,
    pub known: Vec<String>,
}

/// A resolved backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    base_url: String,
    origin: String,
}

impl Backend {
    /// Absolute base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `scheme://host:port` of the backend, used to group connection limits.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// Immutable mapping from service name to backend.
#[derive(Debug, Clone, Default)]
pub struct ServiceMap {
    services: BTreeMap<String, Backend>,
}

impl ServiceMap {
    /// Build a map from `(name, url)` pairs, rejecting duplicates.
    pub fn new<I, N, U>(entries: I) -> Result<Self, ServiceMapError>
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: AsRef<str>,
    {
        let mut services = BTreeMap::new();
        for (name, url) in entries {
            let name = name.into();
            let backend = check_entry(&name, url.as_ref())?;
            if services.insert(name.clone(), backend).is_some() {
                return Err(ServiceMapError::Duplicate(name));
            }
        }
        Ok(Self { services })
    }

    /// Build from the `[services]` table of the configuration.
    pub fn from_config(services: &BTreeMap<String, String>) -> Result<Self, ServiceMapError> {
        Self::new(services.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Resolve a service name to its backend.
    pub fn resolve(&self, service: &str) -> Result<&Backend, NotFound> {
        self.services.get(service).ok_or_else(|| NotFound {
            service: service.to_string(),
            known: self.names().map(str::to_string).collect(),
        })
    }

    /// Configured service names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Iterate over all configured backends.
    pub fn backends(&self) -> impl Iterator<Item = &Backend> {
        self.services.values()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Validate one service entry and normalize its base URL.
pub fn check_entry(name: &str, url: &str) -> Result<Backend, ServiceMapError> {
    if name.is_empty() {
        return Err(ServiceMapError::EmptyName);
    }
    if name.contains('/') {
        return Err(ServiceMapError::SlashInName(name.to_string()));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(ServiceMapError::ReservedName(name.to_string()));
    }

    let invalid = |reason: &str| ServiceMapError::InvalidUrl {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed"));
    }

    Ok(Backend {
        base_url: url.trim_end_matches('/').to_string(),
        origin: parsed.origin().ascii_serialization(),
    })
}
