//! Canonical event envelope construction.
//!
//! # Responsibilities
//! - Copy client IP, method, path (query stripped) and query string
//! - Filter request headers through the forbidden set (dropped, not renamed)
//! - Base64-encode the body only when the routing entry asks for it
//!
//! # Design Decisions
//! - One entry per header name, first occurrence order preserved
//! - Entry `key` carries the conventional wire casing; the map key stays
//!   lowercased, matching what functions see in production
//! - `include_body = false` still emits the body block with empty data,
//!   so functions cannot distinguish it from an empty body by accident

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::event::types::{
    CfConfig, CfData, CfRequest, CfRequestBody, EdgeEvent, EdgeRecord, HeaderBag, HeaderEntry,
    InterceptedRequest,
};
use crate::headers::{self, HeaderClass};
use crate::routing::EventType;

const EMULATED_DOMAIN: &str = "emulated.cloudfront.localhost";
const EMULATED_DISTRIBUTION_ID: &str = "LOCALDISTRIBUTION";

/// Build the canonical event envelope for one stage invocation.
pub fn encode(
    request: &InterceptedRequest,
    stage: EventType,
    include_body: bool,
    request_id: &str,
) -> EdgeEvent {
    let mut bag = HeaderBag::default();
    for name in request.headers.keys() {
        let lower = name.as_str().to_ascii_lowercase();
        if headers::classify(&lower) == HeaderClass::Forbidden {
            continue;
        }
        let Some(value) = request.headers.get(name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        bag.push(
            lower,
            HeaderEntry {
                key: Some(headers::canonical(name.as_str())),
                value: value.to_string(),
            },
        );
    }

    let data = if include_body {
        BASE64.encode(&request.body)
    } else {
        String::new()
    };

    EdgeEvent {
        records: vec![EdgeRecord {
            cf: CfData {
                config: CfConfig {
                    distribution_domain_name: EMULATED_DOMAIN.to_string(),
                    distribution_id: EMULATED_DISTRIBUTION_ID.to_string(),
                    event_type: stage.as_str().to_string(),
                    request_id: request_id.to_string(),
                },
                request: CfRequest {
                    client_ip: request.client_ip.to_string(),
                    headers: bag,
                    method: request.method.to_string(),
                    querystring: request.querystring().to_string(),
                    uri: request.path().to_string(),
                    body: CfRequestBody {
                        input_truncated: false,
                        action: "read-only".to_string(),
                        encoding: "base64".to_string(),
                        data,
                    },
                },
            },
        }],
    }
}
