//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline / invocation client produce:
//!     → tracing events (structured, request-id keyed)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log (env-filter controlled)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metrics are cheap (atomic increments), recorded at stage exits
//! - The exporter is optional; local development usually wants logs only

pub mod metrics;
