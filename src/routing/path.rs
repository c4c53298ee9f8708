//! Inbound path splitting and outbound target construction.
//!
//! # Design Decisions
//! - Works on the raw (still percent-encoded) path; nothing is re-encoded
//! - The query string is carried verbatim, duplicates and ordering included
//! - Exactly one `/` between base URL and remaining path
//! - Dot segments are refused: URL parsing would resolve them and climb
//!   out of the backend's base path

/// An inbound path split into its service segment and the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePath<'a> {
    /// First segment after the prefix.
    pub service: &'a str,
    /// Everything after the `/` that follows the service name.
    /// `None` when the path ends right after the service name.
    pub remaining: Option<&'a str>,
}

/// Split `path` into service name and remaining path under `prefix`.
///
/// Returns `None` when the path is outside the prefix or carries no service
/// segment; that is a routing miss, not an unknown service.
pub fn split_service_path<'a>(path: &'a str, prefix: &str) -> Option<ServicePath<'a>> {
    let rest = path.strip_prefix(prefix.trim_end_matches('/'))?;
    let rest = rest.strip_prefix('/')?;

    let (service, remaining) = match rest.split_once('/') {
        Some((service, remaining)) => (service, Some(remaining)),
        None => (rest, None),
    };

    if service.is_empty() {
        return None;
    }
    Some(ServicePath { service, remaining })
}

/// Whether `remaining` holds a `.` or `..` segment, literal or
/// percent-encoded (`%2e`, any case). A backslash counts as a separator.
pub fn has_dot_segment(remaining: &str) -> bool {
    remaining.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Join a backend base URL, a remaining path and a raw query string.
pub fn join_target(base_url: &str, remaining: Option<&str>, query: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    let mut target = String::with_capacity(
        base.len() + remaining.map_or(0, str::len) + query.map_or(0, str::len) + 2,
    );
    target.push_str(base);

    if let Some(remaining) = remaining {
        target.push('/');
        target.push_str(remaining.trim_start_matches('/'));
    }

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    target
}
