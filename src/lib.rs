//! SSA Vault - encrypted local-first storage for disability benefit reports
//!
//! Reports and AI provider credentials are encrypted with AES-256-GCM under a
//! key derived from the user's passphrase. Only envelopes and non-secret
//! metadata ever reach a [`storage::PersistentStore`].
//!
//! # Architecture
//!
//! - `config`: Paths, settings and environment defaults
//! - `error`: Custom error types
//! - `crypto`: Key derivation, session lifecycle and envelope encryption
//! - `models`: Persisted and decrypted data models
//! - `storage`: Record stores (in-memory and JSON files)
//! - `repository`: Report and provider-config repositories
//! - `collaborators`: Seams for section generation and remote sync
//! - `vault`: Facade wiring everything over one store
//! - `cli` / `display`: Command handlers and terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ssa_vault::{config::Settings, models::ReportPatch, storage::MemoryStore, vault::Vault};
//!
//! let vault = Vault::open(Arc::new(MemoryStore::new()), &Settings::default()).await?;
//! vault.setup_passphrase("correct horse battery".into()).await?;
//! let id = vault.reports().create("Back injury", ReportPatch::new()).await?;
//! ```

pub mod cli;
pub mod collaborators;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod models;
pub mod repository;
pub mod storage;
pub mod vault;

pub use error::{VaultError, VaultResult};
