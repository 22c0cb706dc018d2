//! Configuration Management
//!
//! Hierarchical resolution, later sources win:
//! 1. Built-in defaults
//! 2. Global config (~/.config/repodocs/config.toml)
//! 3. Project config (.repodocs/config.toml)
//! 4. Environment variables (REPODOCS_*)

mod loader;
mod types;

pub use loader::{ConfigFormat, ConfigLoader};
pub use types::*;
