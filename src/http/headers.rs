//! Header filtering between the caller leg and the backend leg.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Drop `host` so the client derives it from the target URL
//! - Offer backends only the content codings the client decodes
//! - Drop framing headers on responses; the server re-frames the body
//!
//! # Design Decisions
//! - Headers stay in `HeaderMap`: case-insensitive, multi-valued, ordered
//! - Tokens listed in `Connection` are hop-by-hop for that message too

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Headers describing a single transport connection.
pub const HOP_BY_HOP: &[HeaderName] = &[
    header::CONNECTION,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Non-standard hop-by-hop headers still sent by older clients.
const LEGACY_HOP_BY_HOP: &[&str] = &["keep-alive", "proxy-connection"];

/// Extra headers never relayed back to the caller.
pub const RESPONSE_EXCLUDED: &[HeaderName] = &[header::CONTENT_ENCODING, header::CONTENT_LENGTH];

/// Codings the outbound client decodes before the body is relayed.
pub const DECODED_CODINGS: &str = "gzip, br, zstd, deflate";

/// Headers named by `Connection` tokens (`Connection: close, x-foo`).
fn connection_tokens(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

fn is_hop_by_hop(name: &HeaderName, tokens: &[HeaderName]) -> bool {
    HOP_BY_HOP.contains(name)
        || LEGACY_HOP_BY_HOP.contains(&name.as_str())
        || tokens.contains(name)
}

/// Headers to send to the backend for an inbound request.
pub fn outbound_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let tokens = connection_tokens(inbound);
    let mut out = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if *name == header::HOST
            || *name == header::ACCEPT_ENCODING
            || is_hop_by_hop(name, &tokens)
        {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    // a partial body cannot be decoded, so ranges are asked for unencoded
    let accepted = if inbound.contains_key(header::RANGE) {
        HeaderValue::from_static("identity")
    } else {
        HeaderValue::from_static(DECODED_CODINGS)
    };
    out.insert(header::ACCEPT_ENCODING, accepted);
    out
}

/// Headers to relay to the caller for a backend response.
pub fn relayed_response_headers(backend: &HeaderMap) -> HeaderMap {
    let tokens = connection_tokens(backend);
    let mut out = HeaderMap::with_capacity(backend.len());
    for (name, value) in backend {
        if RESPONSE_EXCLUDED.contains(name) || is_hop_by_hop(name, &tokens) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
