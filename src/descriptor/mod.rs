//! Deployment descriptor subsystem.
//!
//! # Data Flow
//! ```text
//! descriptor file (CloudFormation/SAM YAML)
//!     → resolver.rs (locate distribution, walk behaviors)
//!     → resolve function references (literal / version Ref / GetAtt)
//!     → RoutingTable (ordered, immutable)
//!     → atomic swap into the engine
//!
//! On reload:
//!     config::watcher detects change
//!     → resolver.rs builds a new table
//!     → engine swaps the snapshot; failures keep the previous table
//! ```
//!
//! # Design Decisions
//! - Reference indirection resolved once at load time into flat names
//! - Unsupported associations are skipped with a warning, never fatal
//! - Descriptor failures mean "no routing configured", never a crash

pub mod resolver;

pub use resolver::{load, resolve, DescriptorError};
