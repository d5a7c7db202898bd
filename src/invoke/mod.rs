//! Function invocation subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline (encoded event)
//!     → client.rs (POST to the local invocation endpoint, bounded wait)
//!     → classify: transport failure / invocation status / error marker /
//!       payload shape
//!     → InvocationOutcome consumed immediately by the pipeline
//! ```
//!
//! # Design Decisions
//! - Single attempt, no retry: edge-function failures should surface
//!   immediately to the developer
//! - Classification is an exhaustive variant, not key-presence checks,
//!   so every call site handles all outcome kinds
//! - Unparseable payloads are logged verbatim for diagnosis

pub mod client;

use async_trait::async_trait;
use bytes::Bytes;

use crate::event::{DirectResponse, MutationEnvelope};

pub use client::LambdaClient;

/// One invocation's classified result. Produced once, consumed
/// immediately, never persisted.
#[derive(Debug)]
pub enum InvocationOutcome {
    /// Continue to the next stage with the declared overrides.
    Continue(MutationEnvelope),
    /// Terminate and respond immediately.
    Direct(DirectResponse),
    /// The function raised or returned an execution error.
    FunctionError { message: String },
    /// The invocation endpoint could not be reached in time.
    TransportFailure { cause: String },
    /// Empty or unparseable function output; `raw` is empty for the
    /// no-payload case.
    Malformed { raw: Bytes },
}

/// Seam between the pipeline and the invocation transport.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Invoke `function_name` with the JSON event payload.
    async fn invoke(&self, function_name: &str, payload: serde_json::Value) -> InvocationOutcome;
}
