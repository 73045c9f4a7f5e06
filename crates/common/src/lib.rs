//! Splicer Common Utilities
//!
//! Shared infrastructure for all Splicer crates:
//! - Error types and result aliases
//! - Time tolerance helpers for floating-point schedule math
//! - Tracing/logging initialization
//! - Configuration file loading

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use config::*;
pub use error::*;
pub use time::*;
