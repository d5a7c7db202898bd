//! Routing table lookup.
//!
//! # Responsibilities
//! - Hold the ordered function associations per event type
//! - Look up the first matching entry for a request path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan; behavior counts are small by construction
//! - Explicit `None` for "no function at this stage" rather than a default

use serde::{Deserialize, Serialize};

use crate::routing::matcher::PathPattern;

/// The pipeline stages this engine dispatches.
///
/// The origin-response and viewer-response stages are intentionally not
/// represented: the response-side hook is an inert pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "viewer-request")]
    ViewerRequest,
    #[serde(rename = "origin-request")]
    OriginRequest,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ViewerRequest => "viewer-request",
            EventType::OriginRequest => "origin-request",
        }
    }

    /// Parse a descriptor event-type string. Returns `None` for stages the
    /// engine does not dispatch (callers skip those with a warning).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "viewer-request" => Some(EventType::ViewerRequest),
            "origin-request" => Some(EventType::OriginRequest),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One function association: path pattern → function, in behavior order.
#[derive(Debug, Clone)]
pub struct RoutingEntry {
    pub pattern: PathPattern,
    pub event_type: EventType,
    pub function_name: String,
    pub include_body: bool,
}

/// Ordered routing entries per event type.
///
/// Owned by the descriptor resolver; the pipeline reads an immutable
/// snapshot. Rebuilt wholesale on descriptor reload.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    viewer_request: Vec<RoutingEntry>,
    origin_request: Vec<RoutingEntry>,
}

impl RoutingTable {
    pub fn push(&mut self, entry: RoutingEntry) {
        match entry.event_type {
            EventType::ViewerRequest => self.viewer_request.push(entry),
            EventType::OriginRequest => self.origin_request.push(entry),
        }
    }

    /// First entry whose pattern matches `path`, in declaration order.
    /// `path` must not contain a query string.
    pub fn lookup(&self, event_type: EventType, path: &str) -> Option<&RoutingEntry> {
        self.entries(event_type).iter().find(|e| e.pattern.matches(path))
    }

    pub fn entries(&self, event_type: EventType) -> &[RoutingEntry] {
        match event_type {
            EventType::ViewerRequest => &self.viewer_request,
            EventType::OriginRequest => &self.origin_request,
        }
    }

    /// True when no event type has any entry; callers treat this as "no
    /// routing configured."
    pub fn is_empty(&self) -> bool {
        self.viewer_request.is_empty() && self.origin_request.is_empty()
    }

    pub fn len(&self) -> usize {
        self.viewer_request.len() + self.origin_request.len()
    }
}
