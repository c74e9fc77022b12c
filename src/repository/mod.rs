//! Repositories over encrypted records
//!
//! Each repository pairs an [`EnvelopeCipher`](crate::crypto::EnvelopeCipher)
//! with a [`PersistentStore`](crate::storage::PersistentStore). Plaintext
//! goes in and comes out; only envelopes reach the store.

pub mod provider_config;
pub mod reports;

pub use provider_config::{ConfigEvent, ConfigRepository, CONFIG_RECORD_ID};
pub use reports::{ReportEvent, ReportRepository};
