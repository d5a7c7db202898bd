//! Event translation subsystem.
//!
//! # Data Flow
//! ```text
//! Intercepted request
//!     → encode.rs (canonical event envelope, forbidden headers filtered)
//!     → invocation client
//!     → function output (mutation envelope or direct-response envelope)
//!     → apply.rs (validate against header policy, then
//!        headers → body → uri, all-or-nothing)
//!     → mutated request, or synthesized terminal response
//! ```
//!
//! # Design Decisions
//! - Envelope header order is significant; `HeaderBag` preserves it
//! - Mutations are validated in full before anything is written
//! - Fixed application order: headers, then body, then URI (a body
//!   replacement rewrites Content-Length, which a later header pass
//!   would otherwise stomp)

pub mod apply;
pub mod encode;
pub mod types;

pub use apply::{apply_mutation, build_direct_response, PolicyViolation};
pub use encode::encode;
pub use types::{
    BodyMutation, DirectResponse, EdgeEvent, HeaderBag, HeaderEntry, InterceptedRequest,
    MutationEnvelope, SyntheticResponse,
};
