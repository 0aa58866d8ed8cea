//! StreamProbe Common Library
//!
//! Locator types, harness configuration, device profiles and logging setup
//! shared by the automation core and the CLI.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::{DeviceCatalog, HarnessConfig};
pub use error::{Error, Result};
pub use logging::LogContext;
pub use types::*;
