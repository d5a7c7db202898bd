//! Applying function output back onto the transaction.
//!
//! # Responsibilities
//! - Enforce the header policy on everything a function declares
//! - Apply mutation envelopes in fixed order: headers → body → uri
//! - Synthesize terminal responses from direct-response envelopes
//!
//! # Design Decisions
//! - Validate the whole envelope before writing anything (all-or-nothing)
//! - A read-only header echoed back unchanged is tolerated, not an error
//! - Absent body/action means the original body is retained

use axum::http::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use axum::http::{HeaderMap, StatusCode};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use thiserror::Error;

use crate::event::types::{
    DirectResponse, HeaderBag, HeaderEntry, InterceptedRequest, MutationEnvelope,
    SyntheticResponse,
};
use crate::headers::{self, HeaderClass};

/// A function output that breaks the protocol contract. Always surfaces
/// as a terminal client-visible error response, never silently dropped.
#[derive(Debug, Error)]
pub enum PolicyViolation {
    #[error("function set forbidden header {name:?}")]
    ForbiddenHeader { name: String },
    #[error("function modified read-only header {name:?}")]
    ReadOnlyHeader { name: String },
    #[error("function declared invalid header {name:?}")]
    InvalidHeader { name: String },
    #[error("uri must start with '/', got {uri:?}")]
    InvalidUri { uri: String },
    #[error("unknown body encoding {encoding:?}")]
    UnknownBodyEncoding { encoding: String },
    #[error("body data is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("status {status} is not a valid HTTP status code")]
    InvalidStatus { status: u16 },
}

/// The header a bag entry names: the entry `key` when present, the map
/// key otherwise.
fn entry_name<'a>(map_key: &'a str, bag: &'a [HeaderEntry]) -> &'a str {
    bag.first().and_then(|e| e.key.as_deref()).unwrap_or(map_key)
}

/// Apply a mutation envelope onto the in-flight request.
///
/// The envelope is validated in full first; on any violation the request
/// is left untouched. Application order is headers, then body, then URI.
pub fn apply_mutation(
    request: &mut InterceptedRequest,
    envelope: &MutationEnvelope,
) -> Result<(), PolicyViolation> {
    let header_writes = plan_header_writes(request, envelope.headers.as_ref())?;
    let new_body = plan_body(envelope)?;
    let new_target = plan_uri(request, envelope)?;

    for (name, value) in header_writes {
        match request.headers.get(&name) {
            None => {
                tracing::info!(header = %name, "header added by edge function");
            }
            Some(existing) if existing != &value => {
                tracing::info!(header = %name, "header modified by edge function");
            }
            Some(_) => continue,
        }
        request.headers.insert(name, value);
    }

    if let Some(body) = new_body {
        tracing::info!(bytes = body.len(), "body replaced by edge function");
        if let Ok(len) = HeaderValue::from_str(&body.len().to_string()) {
            request.headers.insert(CONTENT_LENGTH, len);
        }
        request.body = body;
    }

    if let Some(target) = new_target {
        if target != request.path_and_query {
            tracing::info!(uri = %target, "uri replaced by edge function");
            request.path_and_query = target;
        }
    }

    Ok(())
}

/// Validate envelope headers against the request-stage policy and turn
/// them into concrete writes. Nothing is written here.
fn plan_header_writes(
    request: &InterceptedRequest,
    bag: Option<&HeaderBag>,
) -> Result<Vec<(HeaderName, HeaderValue)>, PolicyViolation> {
    let Some(bag) = bag else {
        return Ok(Vec::new());
    };

    let mut writes = Vec::new();
    for (map_key, entries) in bag.iter() {
        let name = entry_name(map_key, entries);
        let Some(entry) = entries.first() else {
            continue;
        };
        match headers::classify(name) {
            HeaderClass::Forbidden => {
                return Err(PolicyViolation::ForbiddenHeader { name: name.to_string() });
            }
            HeaderClass::ReadOnly => {
                let unchanged = request
                    .headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|existing| existing == entry.value);
                if !unchanged {
                    return Err(PolicyViolation::ReadOnlyHeader { name: name.to_string() });
                }
            }
            HeaderClass::Normal => {
                let header_name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| PolicyViolation::InvalidHeader { name: name.to_string() })?;
                let header_value = HeaderValue::from_str(&entry.value)
                    .map_err(|_| PolicyViolation::InvalidHeader { name: name.to_string() })?;
                writes.push((header_name, header_value));
            }
        }
    }
    Ok(writes)
}

/// Decode the replacement body, if the envelope declares one.
///
/// Only an explicit `{action: "replace", encoding: "base64"|"text"}` is
/// honored; an unknown encoding is a hard failure, anything else is a
/// no-op.
fn plan_body(envelope: &MutationEnvelope) -> Result<Option<Bytes>, PolicyViolation> {
    let Some(body) = &envelope.body else {
        return Ok(None);
    };
    if body.action.as_deref() != Some("replace") {
        return Ok(None);
    }
    match body.encoding.as_deref() {
        Some("base64") => Ok(Some(Bytes::from(BASE64.decode(&body.data)?))),
        Some("text") => Ok(Some(Bytes::from(body.data.clone()))),
        other => Err(PolicyViolation::UnknownBodyEncoding {
            encoding: other.unwrap_or("").to_string(),
        }),
    }
}

/// Compute the replacement path-and-query, if the envelope re-targets
/// either part. An absent `uri` keeps the current path; an empty one
/// normalizes to `/`.
fn plan_uri(
    request: &InterceptedRequest,
    envelope: &MutationEnvelope,
) -> Result<Option<String>, PolicyViolation> {
    if envelope.uri.is_none() && envelope.querystring.is_none() {
        return Ok(None);
    }
    let path = match envelope.uri.as_deref() {
        None => request.path(),
        Some("") => "/",
        Some(uri) if uri.starts_with('/') => uri,
        Some(uri) => {
            return Err(PolicyViolation::InvalidUri { uri: uri.to_string() });
        }
    };
    let querystring = envelope
        .querystring
        .as_deref()
        .unwrap_or_else(|| request.querystring());
    let target = if querystring.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{querystring}")
    };
    Ok(Some(target))
}

/// Synthesize a terminal response from a direct-response envelope.
///
/// Forbidden headers are rejected; there is no read-only restriction
/// because no prior request state exists on this path.
pub fn build_direct_response(envelope: &DirectResponse) -> Result<SyntheticResponse, PolicyViolation> {
    let status = StatusCode::from_u16(envelope.status)
        .map_err(|_| PolicyViolation::InvalidStatus { status: envelope.status })?;

    let body = match envelope.body_encoding.as_deref() {
        Some("base64") => Bytes::from(BASE64.decode(envelope.body.as_deref().unwrap_or(""))?),
        Some("text") | None => Bytes::from(envelope.body.clone().unwrap_or_default()),
        Some(other) => {
            return Err(PolicyViolation::UnknownBodyEncoding { encoding: other.to_string() });
        }
    };

    let mut headers = HeaderMap::new();
    if let Some(bag) = &envelope.headers {
        for (map_key, entries) in bag.iter() {
            let name = entry_name(map_key, entries);
            if headers::classify(name) == HeaderClass::Forbidden {
                return Err(PolicyViolation::ForbiddenHeader { name: name.to_string() });
            }
            let Some(entry) = entries.first() else {
                continue;
            };
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| PolicyViolation::InvalidHeader { name: name.to_string() })?;
            let header_value = HeaderValue::from_str(&entry.value)
                .map_err(|_| PolicyViolation::InvalidHeader { name: name.to_string() })?;
            headers.insert(header_name, header_value);
        }
    }

    tracing::info!(status = %status, "direct response generated by edge function");
    Ok(SyntheticResponse {
        status,
        status_description: envelope.status_description.clone(),
        headers,
        body,
    })
}
