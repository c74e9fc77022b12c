//! CLI command handlers
//!
//! Bridges clap argument parsing with the repositories.

pub mod config;
pub mod passphrase;
pub mod report;

pub use config::{handle_config_command, ConfigCommands};
pub use passphrase::{ensure_unlocked, handle_init};
pub use report::{handle_report_command, ReportCommands};
