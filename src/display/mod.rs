//! Display formatting for terminal output
//!
//! Plain-text tables and detail views for the CLI.

pub mod config;
pub mod report;

pub use config::{format_provider_settings, mask_key};
pub use report::{format_report_details, format_report_list};
