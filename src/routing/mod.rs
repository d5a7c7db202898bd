//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Deployment descriptor (descriptor::resolve)
//!     → RoutingEntry[] per event type, declaration order
//!     → Freeze as immutable RoutingTable
//!
//! Per request (pipeline):
//!     path + event type
//!     → table.rs (ordered scan)
//!     → matcher.rs (glob evaluation)
//!     → Return: matched entry or None (stage no-op)
//! ```
//!
//! # Design Decisions
//! - Table rebuilt wholesale on descriptor reload, never mutated in place
//! - First match in declaration order wins (cache behaviors before default)
//! - Case-sensitive glob over the path only, never the query string
//! - No regex in the match path

pub mod matcher;
pub mod table;

pub use matcher::PathPattern;
pub use table::{EventType, RoutingEntry, RoutingTable};
