//! Sync status of a report
//!
//! The tag describes how a report relates to a remote copy. The transport
//! and conflict resolution live elsewhere; this module only owns the tag and
//! its transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relationship between a local report and its remote copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// Never synced
    #[default]
    LocalOnly,
    /// Changed locally since the last sync
    Pending,
    /// Matches the last known remote state
    Synced,
    /// Remote diverged; resolution is up to the caller
    Conflict,
}

/// Events that move a report between sync states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// Content changed through a repository update
    LocalUpdate,
    /// The sync collaborator accepted the local state
    RemoteAccepted,
    /// The sync collaborator found a divergent remote state
    RemoteDiverged,
}

impl SyncStatus {
    /// Status of a freshly created report
    pub const INITIAL: SyncStatus = SyncStatus::LocalOnly;

    /// Apply an event. Every event is valid from every state.
    pub fn apply(self, event: SyncEvent) -> SyncStatus {
        match event {
            SyncEvent::LocalUpdate => SyncStatus::Pending,
            SyncEvent::RemoteAccepted => SyncStatus::Synced,
            SyncEvent::RemoteDiverged => SyncStatus::Conflict,
        }
    }

    /// Whether this report has local state the remote hasn't seen
    pub fn needs_sync(&self) -> bool {
        matches!(self, Self::LocalOnly | Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalOnly => "local-only",
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
