//! Core data models for SSA Vault
//!
//! Persisted entities (`Report`, `AppConfig`) carry envelopes and non-secret
//! metadata only. Their decrypted counterparts (`ReportData`,
//! `ProviderSettings`) exist in memory while the vault is unlocked.

pub mod app_config;
pub mod ids;
pub mod report;
pub mod sync_status;

pub use app_config::{ApiKeys, AppConfig, ModelConfigs, Provider, ProviderSettings};
pub use ids::ReportId;
pub use report::{
    FunctionalInputs, GeneratedSections, Report, ReportData, ReportListing, ReportPatch,
    UNREADABLE_TITLE,
};
pub use sync_status::{SyncEvent, SyncStatus};
