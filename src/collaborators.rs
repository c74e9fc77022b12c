//! Seams for the two external collaborators
//!
//! A [`SectionGenerator`] turns a question and a free-form answer into
//! report text. A [`SyncCollaborator`] receives an encrypted envelope and
//! non-secret metadata and reports whether the remote accepted it. Neither
//! is implemented here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::crypto::Envelope;
use crate::error::VaultResult;
use crate::models::ReportId;

/// Produces answer text for one report question
///
/// The returned text is stored as-is in `generatedSections`.
#[async_trait]
pub trait SectionGenerator: Send + Sync {
    async fn generate(&self, question: &str, answer: &str) -> VaultResult<String>;
}

/// What a sync collaborator is allowed to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub id: ReportId,
    pub envelope: Envelope,
    pub last_modified: DateTime<Utc>,
    pub last_sync_timestamp: Option<DateTime<Utc>>,
}

/// Result of pushing one report to the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote now matches the local state
    Synced { remote_timestamp: DateTime<Utc> },
    /// Remote holds a divergent envelope
    Conflict { remote: Envelope },
}

#[async_trait]
pub trait SyncCollaborator: Send + Sync {
    async fn push(&self, request: SyncRequest) -> VaultResult<SyncOutcome>;
}
