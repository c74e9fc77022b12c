//! Report CLI commands

use chrono::Utc;
use clap::Subcommand;

use crate::display::report::{format_report_details, format_report_list};
use crate::error::{VaultError, VaultResult};
use crate::models::{FunctionalInputs, ReportId, ReportPatch, SyncStatus};
use crate::repository::ReportRepository;

/// Report subcommands
#[derive(Subcommand)]
pub enum ReportCommands {
    /// List all reports, newest first
    List,
    /// Create a new report
    Create {
        /// Report title
        title: String,
        /// Impairment listing id (repeatable)
        #[arg(short, long = "listing")]
        listings: Vec<String>,
        /// Functional inputs as a JSON object
        #[arg(short, long)]
        inputs: Option<String>,
    },
    /// Show a decrypted report
    Show {
        /// Report ID or unique ID prefix
        report: String,
    },
    /// Update a report (each given field replaces the stored one)
    Update {
        /// Report ID or unique ID prefix
        report: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// Impairment listing id (repeatable; replaces the whole list)
        #[arg(short, long = "listing")]
        listings: Vec<String>,
        /// Functional inputs as a JSON object (replaces all inputs)
        #[arg(short, long)]
        inputs: Option<String>,
    },
    /// Permanently delete a report
    Delete {
        /// Report ID or unique ID prefix
        report: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Show sync status, or record the outcome of a manual sync
    SyncStatus {
        /// Report ID or unique ID prefix; omit to list reports awaiting sync
        report: Option<String>,
        /// Record an outcome: synced or conflict
        #[arg(short, long)]
        mark: Option<String>,
    },
}

/// Handle a report command against an unlocked repository
pub async fn handle_report_command(repo: &ReportRepository, cmd: ReportCommands) -> VaultResult<()> {
    match cmd {
        ReportCommands::List => {
            let listings = repo.list().await?;
            print!("{}", format_report_list(&listings));
            if listings.is_empty() {
                println!();
            }
        }

        ReportCommands::Create {
            title,
            listings,
            inputs,
        } => {
            let mut initial = ReportPatch::new();
            if !listings.is_empty() {
                initial = initial.selected_listings(listings);
            }
            if let Some(raw) = inputs {
                initial = initial.functional_inputs(parse_inputs(&raw)?);
            }

            let id = repo.create(&title, initial).await?;
            println!("Created report: {}", title);
            println!("  ID: {}", id);
        }

        ReportCommands::Show { report } => {
            let id = resolve_report(repo, &report).await?;
            let data = repo
                .get_decrypted(id)
                .await?
                .ok_or_else(|| VaultError::report_not_found(&report))?;
            let record = repo
                .get(id)
                .await?
                .ok_or_else(|| VaultError::report_not_found(&report))?;
            print!("{}", format_report_details(&record, &data));
        }

        ReportCommands::Update {
            report,
            title,
            listings,
            inputs,
        } => {
            let id = resolve_report(repo, &report).await?;

            let mut patch = ReportPatch::new();
            if let Some(title) = title {
                patch = patch.title(title);
            }
            if !listings.is_empty() {
                patch = patch.selected_listings(listings);
            }
            if let Some(raw) = inputs {
                patch = patch.functional_inputs(parse_inputs(&raw)?);
            }

            if patch.is_empty() {
                println!("No changes specified.");
                return Ok(());
            }

            repo.update(id, patch).await?;
            println!("Updated report {}", id.short());
        }

        ReportCommands::Delete { report, force } => {
            let id = resolve_report(repo, &report).await?;

            if !force {
                print!("Permanently delete report {}? (yes/no): ", id.short());
                std::io::Write::flush(&mut std::io::stdout())?;

                let mut confirm = String::new();
                std::io::stdin().read_line(&mut confirm)?;

                if confirm.trim().to_lowercase() != "yes" {
                    println!("Aborted.");
                    return Ok(());
                }
            }

            repo.delete(id).await?;
            println!("Deleted report {}", id.short());
        }

        ReportCommands::SyncStatus { report, mark } => match report {
            None => {
                let pending = repo.pending_sync().await?;
                if pending.is_empty() {
                    println!("All reports are synced.");
                } else {
                    println!("{} report(s) awaiting sync:", pending.len());
                    for id in pending {
                        println!("  {}", id);
                    }
                }
            }
            Some(report) => {
                let id = resolve_report(repo, &report).await?;
                match mark.as_deref().map(parse_mark).transpose()? {
                    Some(SyncStatus::Synced) => repo.mark_synced(id, Utc::now()).await?,
                    Some(_) => repo.mark_conflict(id).await?,
                    None => {}
                }

                let record = repo
                    .get(id)
                    .await?
                    .ok_or_else(|| VaultError::report_not_found(&report))?;
                println!("{}  {}", id.short(), record.sync_status);
                if let Some(at) = record.last_sync_timestamp {
                    println!("Last synced: {}", at.format("%Y-%m-%d %H:%M:%S"));
                }
            }
        },
    }

    Ok(())
}

/// Resolve a full report id or a unique prefix of one
async fn resolve_report(repo: &ReportRepository, input: &str) -> VaultResult<ReportId> {
    if let Ok(id) = ReportId::parse(input) {
        return Ok(id);
    }

    let prefix = input.trim().to_lowercase();
    if prefix.is_empty() {
        return Err(VaultError::Validation("Report ID cannot be empty".into()));
    }

    let matches: Vec<ReportId> = repo
        .list()
        .await?
        .into_iter()
        .map(|listing| listing.id)
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(VaultError::report_not_found(input)),
        _ => Err(VaultError::Validation(format!(
            "Report ID prefix '{}' is ambiguous ({} matches)",
            input,
            matches.len()
        ))),
    }
}

fn parse_inputs(raw: &str) -> VaultResult<FunctionalInputs> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(VaultError::Validation(
            "Functional inputs must be a JSON object".into(),
        )),
        Err(e) => Err(VaultError::Validation(format!(
            "Invalid functional inputs JSON: {}",
            e
        ))),
    }
}

fn parse_mark(raw: &str) -> VaultResult<SyncStatus> {
    match raw.trim().to_lowercase().as_str() {
        "synced" => Ok(SyncStatus::Synced),
        "conflict" => Ok(SyncStatus::Conflict),
        other => Err(VaultError::Validation(format!(
            "Invalid sync mark: '{}'. Valid marks: synced, conflict",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EnvelopeCipher, KeyManager};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    async fn unlocked_repo() -> ReportRepository {
        let store = Arc::new(MemoryStore::new());
        let keys = Arc::new(KeyManager::with_iterations(store.clone(), 1_000));
        keys.initialize().await.unwrap();
        keys.setup_passphrase("cli tests".into()).await.unwrap();
        ReportRepository::new(store, EnvelopeCipher::new(keys))
    }

    #[test]
    fn test_parse_inputs() {
        let map = parse_inputs(r#"{"sitting": "20 minutes"}"#).unwrap();
        assert_eq!(map["sitting"], "20 minutes");
        assert!(parse_inputs("[1, 2]").is_err());
        assert!(parse_inputs("{not json").is_err());
    }

    #[test]
    fn test_parse_mark() {
        assert_eq!(parse_mark("Synced").unwrap(), SyncStatus::Synced);
        assert_eq!(parse_mark("conflict").unwrap(), SyncStatus::Conflict);
        assert!(parse_mark("pending").is_err());
    }

    #[tokio::test]
    async fn test_resolve_by_full_id_and_prefix() {
        let repo = unlocked_repo().await;
        let id = repo.create("A", ReportPatch::new()).await.unwrap();

        assert_eq!(resolve_report(&repo, &id.to_string()).await.unwrap(), id);
        assert_eq!(resolve_report(&repo, &id.short()).await.unwrap(), id);
        assert!(resolve_report(&repo, "zzzz").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_sync_status_mark() {
        let repo = unlocked_repo().await;
        let id = repo.create("A", ReportPatch::new()).await.unwrap();

        handle_report_command(
            &repo,
            ReportCommands::SyncStatus {
                report: Some(id.to_string()),
                mark: Some("synced".into()),
            },
        )
        .await
        .unwrap();

        let record = repo.get(id).await.unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert!(record.last_sync_timestamp.is_some());
    }
}
