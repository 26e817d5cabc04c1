//! Header forwarding rules.
//!
//! Both directions are deny-lists so arbitrary backend headers pass through.

use axum::http::{
    header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING},
    HeaderMap, HeaderName,
};

/// Never forwarded to the backend; recomputed for the new target.
pub const REQUEST_DENY_LIST: [HeaderName; 1] = [HOST];

/// Never relayed to the caller; the server picks its own framing.
pub const RESPONSE_DENY_LIST: [HeaderName; 1] = [TRANSFER_ENCODING];

/// Inbound headers minus the request deny-list. Repeated headers keep every value.
pub fn forwardable_request_headers(inbound: &HeaderMap) -> HeaderMap {
    filter_headers(inbound, &REQUEST_DENY_LIST)
}

/// Backend headers minus the response deny-list.
pub fn forwardable_response_headers(upstream: &HeaderMap) -> HeaderMap {
    filter_headers(upstream, &RESPONSE_DENY_LIST)
}

/// True when the inbound request carries a body worth streaming upstream.
pub fn declares_body(headers: &HeaderMap) -> bool {
    let has_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0);

    has_length || headers.contains_key(TRANSFER_ENCODING)
}

fn filter_headers(source: &HeaderMap, deny: &[HeaderName]) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(source.len());
    for (name, value) in source.iter() {
        if deny.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
