//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Intercepted request (server adapter)
//!     → engine.rs (routing snapshot + invoker handle, atomically swapped)
//!     → orchestrator.rs: viewer-request stage, then origin-request stage
//!         lookup → encode → invoke → apply / synthesize / fail
//!     → Disposition: forward with accumulated mutations,
//!       or respond with an installed terminal response
//! ```
//!
//! # Design Decisions
//! - One routing snapshot per request: a concurrent descriptor reload
//!   never exposes entries from two document versions to one lookup
//! - A stage with no matching entry is a no-op, not an error
//! - A direct response short-circuits; origin-request is never reached
//! - Response-side stages are an inert pass-through: replaying which
//!   entry matched the original request would require per-request
//!   routing state that is not carried through

pub mod engine;
pub mod orchestrator;

pub use engine::Engine;
pub use orchestrator::Disposition;
