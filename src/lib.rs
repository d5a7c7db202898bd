//! Local Lambda@Edge emulation proxy.
//!
//! Emulates the viewer-request / origin-request stages of a CloudFront
//! function pipeline against locally running functions, so edge-function
//! code can be developed and tested without deploying.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │              EMULATION PROXY                  │
//!   Client Request       │  ┌────────┐   ┌──────────┐   ┌────────────┐  │
//!   ─────────────────────┼─▶│ server │──▶│ pipeline │──▶│  routing   │  │
//!                        │  │adapter │   │  stages  │   │  snapshot  │  │
//!                        │  └────────┘   └────┬─────┘   └────────────┘  │
//!                        │                    │ encode / apply          │
//!                        │               ┌────▼─────┐   ┌────────────┐  │
//!                        │               │  event   │   │  headers   │  │
//!                        │               │translate │   │  policy    │  │
//!                        │               └────┬─────┘   └────────────┘  │
//!                        │                    │ invoke                  │
//!                        │               ┌────▼─────┐                   │     Local Lambda
//!                        │               │  invoke  │───────────────────┼───▶ endpoint
//!                        │               │  client  │                   │
//!                        │               └──────────┘                   │
//!   Client Response      │  ┌────────┐                                  │
//!   ◀────────────────────┼──│ origin │◀─ forwarded (mutated) request    │──▶ Origin
//!                        │  │forward │   or synthesized terminal resp.  │
//!                        │  └────────┘                                  │
//!                        │  ┌────────────────────────────────────────┐  │
//!                        │  │ config + descriptor (watched, swapped) │  │
//!                        │  └────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod descriptor;
pub mod event;
pub mod headers;
pub mod invoke;
pub mod pipeline;
pub mod routing;
pub mod server;

// Cross-cutting concerns
pub mod observability;

pub use config::ProxyConfig;
pub use pipeline::{Disposition, Engine};
pub use server::ProxyServer;
