//! Process configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects it
//!     → config file: reload, revalidate, rebuild invocation client
//!     → descriptor file: re-resolve, swap the routing table
//!     → failures keep the current state
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - The descriptor file is configuration too, watched the same way

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::load_config;
pub use schema::ProxyConfig;
pub use watcher::{Reload, ReloadWatcher};
