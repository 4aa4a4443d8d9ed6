//! Configuration for the Strata voxel client.
//!
//! Settings persist to disk as RON, every section falls back to defaults for
//! missing fields, and command-line flags override whatever was loaded.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, InteractionConfig, RenderConfig, StreamingConfig, WorldConfig};
pub use error::ConfigError;
