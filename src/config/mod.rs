//! Configuration module
//!
//! This module handles configuration types, defaults, loading and
//! validation for the servers a downloader connects to.

mod defaults;
mod loading;
mod types;
mod validation;

pub use loading::{load_config, parse_config};
pub use types::{Config, GlobalSettings, ServerConfig, ServerConfigBuilder, TlsSettings};
