//! Configuration module for SSA Vault
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - Non-secret settings persistence
//! - Environment-provided provider defaults

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{ProviderDefaults, Settings};
