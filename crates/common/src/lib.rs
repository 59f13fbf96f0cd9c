//! Burnsub Common Utilities
//!
//! Shared infrastructure for all burnsub crates:
//! - Error types and result aliases
//! - Clock and frame timing utilities
//! - Tracing/logging initialization
//! - Configuration loading
//! - The single-export session lock

pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use lock::*;
