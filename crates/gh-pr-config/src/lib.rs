//! Configuration for gh-pr-batch
//!
//! This crate provides:
//! - Configuration file lookup (TOML, CWD then home directory)
//! - Application configuration (AppConfig)

pub mod app_config;
pub mod config_file;

pub use app_config::AppConfig;
pub use config_file::{load_config_file, CONFIG_FILE};
