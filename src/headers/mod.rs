//! Header policy for edge-function mutations.
//!
//! # Responsibilities
//! - Classify header names against the forbidden and read-only sets
//! - Support trailing-wildcard entries (`x-edge-*`)
//! - Canonicalize header casing for write-back to the wire
//!
//! # Design Decisions
//! - Classification is case-insensitive (per HTTP spec)
//! - The sets are protocol constants, not configuration
//! - No regex; a suffix-`*` prefix scan is all the patterns need

/// Header names a function may never set, add, or modify — on the
/// forwarded request or on a direct response. Entries ending in `*`
/// match any name with that prefix.
pub const FORBIDDEN_HEADERS: &[&str] = &[
    "connection",
    "expect",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "trailer",
    "upgrade",
    "x-accel-buffering",
    "x-accel-charset",
    "x-accel-limit-rate",
    "x-accel-redirect",
    "x-amz-cf-*",
    "x-amzn-auth",
    "x-amzn-cf-billing",
    "x-amzn-cf-id",
    "x-amzn-cf-xff",
    "x-amzn-errortype",
    "x-amzn-fle-profile",
    "x-amzn-header-count",
    "x-amzn-lambda-integration-tag",
    "x-amzn-request-id",
    "x-cache",
    "x-edge-*",
    "x-forwarded-proto",
    "x-real-ip",
];

/// Header names a function may read but never alter on the forwarded
/// request. Does not apply to direct responses, where no prior request
/// state exists.
pub const READONLY_HEADERS_REQUEST: &[&str] = &[
    "content-length",
    "host",
    "transfer-encoding",
    "via",
];

/// Classification of a header name under the mutation contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderClass {
    /// Never settable by a function; hard failure anywhere.
    Forbidden,
    /// Readable but immutable on the request-mutation path.
    ReadOnly,
    /// No restriction.
    Normal,
}

fn in_set(set: &[&str], lower: &str) -> bool {
    set.iter().any(|entry| match entry.strip_suffix('*') {
        Some(prefix) => lower.starts_with(prefix),
        None => *entry == lower,
    })
}

/// Classify a header name. Pure; case-insensitive.
pub fn classify(name: &str) -> HeaderClass {
    let lower = name.to_ascii_lowercase();
    if in_set(FORBIDDEN_HEADERS, &lower) {
        HeaderClass::Forbidden
    } else if in_set(READONLY_HEADERS_REQUEST, &lower) {
        HeaderClass::ReadOnly
    } else {
        HeaderClass::Normal
    }
}

/// Canonical wire casing: each `-`-separated segment capitalized
/// (`x-custom-header` → `X-Custom-Header`). Applied to every header a
/// function declares, independent of the casing it supplied.
pub fn canonical(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, segment) in name.split('-').enumerate() {
        if i > 0 {
            out.push('-');
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_case_insensitive() {
        for name in FORBIDDEN_HEADERS.iter().filter(|n| !n.ends_with('*')) {
            assert_eq!(classify(name), HeaderClass::Forbidden);
            assert_eq!(classify(&name.to_uppercase()), HeaderClass::Forbidden);
        }
        assert_eq!(classify("Connection"), HeaderClass::Forbidden);
    }

    #[test]
    fn wildcard_entries_match_by_prefix() {
        assert_eq!(classify("x-edge-location"), HeaderClass::Forbidden);
        assert_eq!(classify("X-Amz-Cf-Id"), HeaderClass::Forbidden);
        assert_eq!(classify("x-edge"), HeaderClass::Normal);
    }

    #[test]
    fn readonly_set() {
        assert_eq!(classify("Host"), HeaderClass::ReadOnly);
        assert_eq!(classify("content-length"), HeaderClass::ReadOnly);
        assert_eq!(classify("VIA"), HeaderClass::ReadOnly);
    }

    #[test]
    fn normal_headers_pass() {
        assert_eq!(classify("user-agent"), HeaderClass::Normal);
        assert_eq!(classify("x-custom"), HeaderClass::Normal);
    }

    #[test]
    fn canonical_casing() {
        assert_eq!(canonical("x-custom-header"), "X-Custom-Header");
        assert_eq!(canonical("HOST"), "Host");
        assert_eq!(canonical("content-type"), "Content-Type");
    }
}
