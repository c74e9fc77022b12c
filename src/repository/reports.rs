//! Report repository
//!
//! Composes [`EnvelopeCipher`] and a [`PersistentStore`] into CRUD over
//! reports. This is the only place that knows how a [`Report`] record maps
//! onto its envelopes.
//!
//! Concurrent updates of the same report are not coordinated: the last
//! write to reach the store wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::collaborators::{SectionGenerator, SyncCollaborator, SyncOutcome, SyncRequest};
use crate::crypto::EnvelopeCipher;
use crate::error::{VaultError, VaultResult};
use crate::models::{
    Report, ReportData, ReportId, ReportListing, ReportPatch, SyncEvent, SyncStatus,
};
use crate::storage::{PersistentStore, RecordKind, StoredRecord};

/// Change notifications for UI binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Created(ReportId),
    Updated(ReportId),
    Deleted(ReportId),
    SyncStatusChanged { id: ReportId, status: SyncStatus },
}

const EVENT_CAPACITY: usize = 64;

/// CRUD and sync bookkeeping for encrypted reports
pub struct ReportRepository {
    store: Arc<dyn PersistentStore>,
    cipher: EnvelopeCipher,
    events: broadcast::Sender<ReportEvent>,
}

impl ReportRepository {
    pub fn new(store: Arc<dyn PersistentStore>, cipher: EnvelopeCipher) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            cipher,
            events,
        }
    }

    /// Subscribe to report changes
    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.events.subscribe()
    }

    /// List every report with its title decrypted independently
    ///
    /// A record that cannot be read or a title that fails to decrypt yields
    /// an `Err` in that row only; the other rows are unaffected. Rows are
    /// ordered newest first.
    pub async fn list(&self) -> VaultResult<Vec<ReportListing>> {
        if !self.cipher.key_manager().is_unlocked() {
            return Err(VaultError::Locked);
        }

        let mut listings = Vec::new();
        let mut reports = Vec::new();
        for (raw_id, report) in self.scan().await? {
            match (report, ReportId::parse(&raw_id)) {
                (Ok(report), _) => reports.push(report),
                (Err(e), Ok(id)) => {
                    warn!(id = %id, error = %e, "report record could not be read");
                    listings.push(ReportListing::unreadable(id, e));
                }
                (Err(e), Err(_)) => {
                    warn!(id = %raw_id, error = %e, "skipping unreadable record with a foreign id");
                }
            }
        }

        let titles = join_all(
            reports
                .iter()
                .map(|report| self.cipher.decrypt_string(&report.encrypted_title)),
        )
        .await;

        listings.extend(reports.into_iter().zip(titles).map(|(report, title)| {
            if let Err(e) = &title {
                warn!(id = %report.id, error = %e, "report title could not be decrypted");
            }
            ReportListing {
                id: report.id,
                title,
                last_modified: report.last_modified,
                sync_status: report.sync_status,
            }
        }));

        listings.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(listings)
    }

    /// Create a report and return its id
    ///
    /// `title` takes precedence over any title in `initial`.
    pub async fn create(&self, title: &str, initial: ReportPatch) -> VaultResult<ReportId> {
        let title = validated_title(title)?;

        let id = ReportId::new();
        let now = Utc::now();
        let data = ReportData::new(id, title, initial, now);

        let report = Report {
            id,
            encrypted_title: self.cipher.encrypt_str(&data.title).await?,
            encrypted_data: self.cipher.encrypt_json(&data).await?,
            last_modified: now,
            last_sync_timestamp: None,
            sync_status: SyncStatus::INITIAL,
        };
        self.persist(&report).await?;

        info!(id = %id, "report created");
        self.notify(ReportEvent::Created(id));
        Ok(id)
    }

    /// Shallow-merge `patch` into a report and re-encrypt it
    ///
    /// Top-level fields present in the patch replace the stored ones
    /// wholesale; nested maps such as `functional_inputs` are not merged.
    /// The report becomes `pending` whatever its previous sync status.
    pub async fn update(&self, id: ReportId, mut patch: ReportPatch) -> VaultResult<()> {
        if let Some(title) = patch.title.take() {
            patch.title = Some(validated_title(&title)?);
        }

        let existing = self.require(id).await?;
        let mut data: ReportData = self.cipher.decrypt_json(&existing.encrypted_data).await?;

        let title_changed = patch
            .title
            .as_ref()
            .is_some_and(|title| *title != data.title);

        data.apply_patch(patch, Utc::now().max(existing.last_modified));

        let encrypted_title = if title_changed {
            self.cipher.encrypt_str(&data.title).await?
        } else {
            existing.encrypted_title.clone()
        };

        let report = Report {
            id,
            encrypted_title,
            encrypted_data: self.cipher.encrypt_json(&data).await?,
            last_modified: data.last_modified,
            last_sync_timestamp: existing.last_sync_timestamp,
            sync_status: existing.sync_status.apply(SyncEvent::LocalUpdate),
        };
        self.persist(&report).await?;

        debug!(id = %id, title_changed, "report updated");
        self.notify(ReportEvent::Updated(id));
        Ok(())
    }

    /// Permanently delete a report
    pub async fn delete(&self, id: ReportId) -> VaultResult<()> {
        if !self.store.delete(RecordKind::Reports, &id.to_string()).await? {
            return Err(VaultError::report_not_found(id.to_string()));
        }

        info!(id = %id, "report deleted");
        self.notify(ReportEvent::Deleted(id));
        Ok(())
    }

    /// Fully decrypt one report
    ///
    /// `Ok(None)` when the id is unknown. Decryption failures propagate;
    /// there is no placeholder here.
    pub async fn get_decrypted(&self, id: ReportId) -> VaultResult<Option<ReportData>> {
        match self.load(id).await? {
            Some(report) => Ok(Some(self.cipher.decrypt_json(&report.encrypted_data).await?)),
            None => Ok(None),
        }
    }

    /// The stored record with its envelopes and metadata
    pub async fn get(&self, id: ReportId) -> VaultResult<Option<Report>> {
        self.load(id).await
    }

    /// Ask the generator for a section and store it under `question_id`
    ///
    /// Other generated sections are kept; the report becomes `pending`.
    pub async fn generate_section(
        &self,
        id: ReportId,
        question_id: &str,
        question: &str,
        answer: &str,
        generator: &dyn SectionGenerator,
    ) -> VaultResult<String> {
        let data = self
            .get_decrypted(id)
            .await?
            .ok_or_else(|| VaultError::report_not_found(id.to_string()))?;

        let text = generator.generate(question, answer).await?;

        let mut sections = data.generated_sections;
        sections.insert(question_id.to_string(), text.clone());
        self.update(id, ReportPatch::new().generated_sections(sections))
            .await?;

        Ok(text)
    }

    /// Ids of reports with local changes the remote hasn't seen
    ///
    /// Reads metadata only, so it works while locked. Unreadable records
    /// are skipped.
    pub async fn pending_sync(&self) -> VaultResult<Vec<ReportId>> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .filter_map(|(raw_id, report)| match report {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(id = %raw_id, error = %e, "skipping unreadable report");
                    None
                }
            })
            .filter(|report| report.sync_status.needs_sync())
            .map(|report| report.id)
            .collect())
    }

    /// Record a successful sync at `at`
    pub async fn mark_synced(&self, id: ReportId, at: DateTime<Utc>) -> VaultResult<()> {
        let mut report = self.require(id).await?;
        report.sync_status = report.sync_status.apply(SyncEvent::RemoteAccepted);
        report.last_sync_timestamp = Some(at);
        self.persist(&report).await?;

        self.notify(ReportEvent::SyncStatusChanged {
            id,
            status: report.sync_status,
        });
        Ok(())
    }

    /// Record that the remote copy diverged
    pub async fn mark_conflict(&self, id: ReportId) -> VaultResult<()> {
        let mut report = self.require(id).await?;
        report.sync_status = report.sync_status.apply(SyncEvent::RemoteDiverged);
        self.persist(&report).await?;

        self.notify(ReportEvent::SyncStatusChanged {
            id,
            status: report.sync_status,
        });
        Ok(())
    }

    /// Push one report through a sync collaborator and record the outcome
    ///
    /// The collaborator sees the data envelope and non-secret metadata only.
    /// If the report was updated while the push was in flight, an accepted
    /// push leaves it `pending` so the newer content is pushed next time.
    pub async fn sync(
        &self,
        id: ReportId,
        collaborator: &dyn SyncCollaborator,
    ) -> VaultResult<SyncStatus> {
        let report = self.require(id).await?;
        let pushed = report.encrypted_data.clone();
        let request = SyncRequest {
            id,
            envelope: report.encrypted_data,
            last_modified: report.last_modified,
            last_sync_timestamp: report.last_sync_timestamp,
        };

        match collaborator.push(request).await? {
            SyncOutcome::Synced { remote_timestamp } => {
                let mut current = self.require(id).await?;
                current.last_sync_timestamp = Some(remote_timestamp);
                // Every update seals a fresh envelope, so equality means unchanged
                if current.encrypted_data == pushed {
                    current.sync_status = current.sync_status.apply(SyncEvent::RemoteAccepted);
                } else {
                    debug!(id = %id, "report changed during sync, left pending");
                }
                self.persist(&current).await?;

                self.notify(ReportEvent::SyncStatusChanged {
                    id,
                    status: current.sync_status,
                });
                Ok(current.sync_status)
            }
            SyncOutcome::Conflict { remote } => {
                // Only the divergence is recorded; the remote copy is not kept
                warn!(id = %id, remote_nonce = %remote.nonce, "remote copy diverged");
                self.mark_conflict(id).await?;
                Ok(SyncStatus::Conflict)
            }
        }
    }

    async fn load(&self, id: ReportId) -> VaultResult<Option<Report>> {
        self.store
            .get(RecordKind::Reports, &id.to_string())
            .await?
            .map(|record| record.to_entity())
            .transpose()
    }

    /// Every report record, each parsed on its own
    async fn scan(&self) -> VaultResult<Vec<(String, VaultResult<Report>)>> {
        Ok(self
            .store
            .get_all(RecordKind::Reports)
            .await?
            .into_iter()
            .map(|scanned| {
                let id = scanned.id.clone();
                let report = scanned
                    .into_record()
                    .and_then(|record| record.to_entity::<Report>());
                (id, report)
            })
            .collect())
    }

    async fn require(&self, id: ReportId) -> VaultResult<Report> {
        self.load(id)
            .await?
            .ok_or_else(|| VaultError::report_not_found(id.to_string()))
    }

    async fn persist(&self, report: &Report) -> VaultResult<()> {
        let record = StoredRecord::from_entity(report.id.to_string(), report)?;
        self.store.put(RecordKind::Reports, record).await
    }

    fn notify(&self, event: ReportEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn validated_title(title: &str) -> VaultResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(VaultError::Validation("Report title cannot be empty".into()));
    }
    Ok(title.to_string())
}
