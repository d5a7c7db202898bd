//! Envelope and transaction-view type definitions.
//!
//! The outbound types mirror the CloudFront event record wire format;
//! the inbound types mirror what edge functions return. All of them
//! serialize camelCase.

use std::net::IpAddr;

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The translator's view of an in-flight intercepted transaction.
///
/// Exclusively owned by the handling of one request; never shared.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub client_ip: IpAddr,
    pub method: Method,
    /// Path plus optional query string, exactly as it appeared on the wire.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InterceptedRequest {
    /// The path component, query string stripped.
    pub fn path(&self) -> &str {
        match self.path_and_query.find('?') {
            Some(i) => &self.path_and_query[..i],
            None => &self.path_and_query,
        }
    }

    /// The query string without the `?`, empty if none.
    pub fn querystring(&self) -> &str {
        match self.path_and_query.find('?') {
            Some(i) => &self.path_and_query[i + 1..],
            None => "",
        }
    }
}

/// A terminal response synthesized from a direct-response envelope or an
/// error taxonomy entry, handed back to the proxy host.
#[derive(Debug, Clone)]
pub struct SyntheticResponse {
    pub status: StatusCode,
    pub status_description: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// One `{key, value}` pair inside an envelope header list. Functions may
/// omit `key`, in which case the map key names the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

/// Envelope headers: lowercased name → entry list, insertion order
/// preserved on both serialize and deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBag(pub Vec<(String, Vec<HeaderEntry>)>);

impl HeaderBag {
    pub fn push(&mut self, name: impl Into<String>, entry: HeaderEntry) {
        self.0.push((name.into(), vec![entry]));
    }

    /// First value recorded under `name` (exact key match).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.first())
            .map(|e| e.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Vec<HeaderEntry>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for HeaderBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

impl<'de> Deserialize<'de> for HeaderBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BagVisitor;

        impl<'de> Visitor<'de> for BagVisitor {
            type Value = HeaderBag;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of header name to entry list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, list)) = map.next_entry::<String, Vec<HeaderEntry>>()? {
                    entries.push((name, list));
                }
                Ok(HeaderBag(entries))
            }
        }

        deserializer.deserialize_map(BagVisitor)
    }
}

/// The outbound event record: `{"Records": [{"cf": {...}}]}`.
#[derive(Debug, Serialize)]
pub struct EdgeEvent {
    #[serde(rename = "Records")]
    pub records: Vec<EdgeRecord>,
}

#[derive(Debug, Serialize)]
pub struct EdgeRecord {
    pub cf: CfData,
}

#[derive(Debug, Serialize)]
pub struct CfData {
    pub config: CfConfig,
    pub request: CfRequest,
}

/// Distribution identity block. The emulated distribution carries
/// placeholder identity; the stage name and request id are real.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CfConfig {
    pub distribution_domain_name: String,
    pub distribution_id: String,
    pub event_type: String,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CfRequest {
    pub client_ip: String,
    pub headers: HeaderBag,
    pub method: String,
    pub querystring: String,
    /// Never contains a query string.
    pub uri: String,
    pub body: CfRequestBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CfRequestBody {
    pub input_truncated: bool,
    pub action: String,
    pub encoding: String,
    pub data: String,
}

/// Function output continuing the pipeline, with overrides for the
/// in-flight request. Every field is optional; an empty envelope is a
/// no-op.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutationEnvelope {
    pub headers: Option<HeaderBag>,
    pub uri: Option<String>,
    pub querystring: Option<String>,
    pub body: Option<BodyMutation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BodyMutation {
    pub action: Option<String>,
    pub encoding: Option<String>,
    #[serde(default)]
    pub data: String,
}

/// Function output terminating the pipeline. Distinguished from a
/// mutation envelope solely by the presence of `status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectResponse {
    #[serde(deserialize_with = "status_code_lenient")]
    pub status: u16,
    pub status_description: Option<String>,
    pub headers: Option<HeaderBag>,
    pub body: Option<String>,
    pub body_encoding: Option<String>,
}

/// Functions declare `status` either as a number or as a numeric string
/// (the CloudFront wire format uses the string form).
fn status_code_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    struct StatusVisitor;

    impl<'de> Visitor<'de> for StatusVisitor {
        type Value = u16;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("an HTTP status code as integer or numeric string")
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<u16, E> {
            u16::try_from(v).map_err(|_| E::custom(format!("status out of range: {v}")))
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<u16, E> {
            u16::try_from(v).map_err(|_| E::custom(format!("status out of range: {v}")))
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<u16, E> {
            v.parse().map_err(|_| E::custom(format!("status is not numeric: {v:?}")))
        }
    }

    deserializer.deserialize_any(StatusVisitor)
}
