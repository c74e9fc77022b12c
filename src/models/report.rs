//! Report models
//!
//! [`Report`] is what the store holds: two envelopes plus plaintext metadata
//! that reveals nothing about the content. [`ReportData`] is what the
//! `encryptedData` envelope decrypts to.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ReportId;
use super::sync_status::SyncStatus;
use crate::crypto::Envelope;
use crate::error::{VaultError, VaultResult};

/// Title shown for a report whose title envelope fails to open
pub const UNREADABLE_TITLE: &str = "[Decryption Error]";

/// Free-form nested answers keyed by field name
pub type FunctionalInputs = serde_json::Map<String, serde_json::Value>;

/// Generated answer text keyed by question id
pub type GeneratedSections = BTreeMap<String, String>;

/// Persisted form of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub encrypted_title: Envelope,
    pub encrypted_data: Envelope,
    pub last_modified: DateTime<Utc>,
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
}

/// Decrypted report content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub id: ReportId,
    pub title: String,

    /// Selected impairment listing ids, in the order the user picked them
    #[serde(default, alias = "selectedBlueBookListings")]
    pub selected_listings: Vec<String>,

    #[serde(default)]
    pub functional_inputs: FunctionalInputs,

    #[serde(default)]
    pub generated_sections: GeneratedSections,

    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl ReportData {
    /// Build fresh report content from a title and initial fields
    ///
    /// The `title` argument wins over any title carried by `initial`.
    pub fn new(id: ReportId, title: impl Into<String>, initial: ReportPatch, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            selected_listings: initial.selected_listings.unwrap_or_default(),
            functional_inputs: initial.functional_inputs.unwrap_or_default(),
            generated_sections: initial.generated_sections.unwrap_or_default(),
            created_at: now,
            last_modified: now,
        }
    }

    /// Shallow merge: each field present in `patch` replaces the current
    /// value wholesale. Nested maps are not merged, so patching
    /// `functional_inputs` with `{x: 9}` over `{x: 1, y: 2}` leaves `{x: 9}`.
    ///
    /// `id` and `created_at` are never touched. `last_modified` never moves
    /// backwards.
    pub fn apply_patch(&mut self, patch: ReportPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(listings) = patch.selected_listings {
            self.selected_listings = listings;
        }
        if let Some(inputs) = patch.functional_inputs {
            self.functional_inputs = inputs;
        }
        if let Some(sections) = patch.generated_sections {
            self.generated_sections = sections;
        }
        self.last_modified = now.max(self.last_modified);
    }
}

/// Partial report content for create and update
///
/// `None` means "leave as is"; `Some` replaces the whole top-level field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(
        default,
        alias = "selectedBlueBookListings",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_listings: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functional_inputs: Option<FunctionalInputs>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_sections: Option<GeneratedSections>,
}

impl ReportPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn selected_listings<I, S>(mut self, listings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_listings = Some(listings.into_iter().map(Into::into).collect());
        self
    }

    pub fn functional_inputs(mut self, inputs: FunctionalInputs) -> Self {
        self.functional_inputs = Some(inputs);
        self
    }

    pub fn generated_sections(mut self, sections: GeneratedSections) -> Self {
        self.generated_sections = Some(sections);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.selected_listings.is_none()
            && self.functional_inputs.is_none()
            && self.generated_sections.is_none()
    }
}

/// One row of a report listing
///
/// `title` carries the per-record decryption outcome untouched; callers
/// decide whether to substitute [`UNREADABLE_TITLE`] via
/// [`ReportListing::display_title`].
#[derive(Debug, Clone)]
pub struct ReportListing {
    pub id: ReportId,
    pub title: VaultResult<String>,
    pub last_modified: DateTime<Utc>,
    pub sync_status: SyncStatus,
}

impl ReportListing {
    /// Row for a record that could not be read at all; sorts last
    pub fn unreadable(id: ReportId, error: VaultError) -> Self {
        Self {
            id,
            title: Err(error),
            last_modified: DateTime::<Utc>::default(),
            sync_status: SyncStatus::default(),
        }
    }

    /// The decrypted title, or the placeholder if it could not be opened
    pub fn display_title(&self) -> &str {
        match &self.title {
            Ok(title) => title,
            Err(_) => UNREADABLE_TITLE,
        }
    }

    pub fn is_readable(&self) -> bool {
        self.title.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn inputs(value: serde_json::Value) -> FunctionalInputs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_report_data() {
        let now = Utc::now();
        let patch = ReportPatch::new()
            .title("ignored")
            .selected_listings(["12.04", "1.15"]);
        let data = ReportData::new(ReportId::new(), "A", patch, now);

        assert_eq!(data.title, "A");
        assert_eq!(data.selected_listings, vec!["12.04", "1.15"]);
        assert!(data.functional_inputs.is_empty());
        assert_eq!(data.created_at, now);
        assert_eq!(data.last_modified, now);
    }

    #[test]
    fn test_shallow_merge_replaces_nested_maps() {
        let now = Utc::now();
        let initial = ReportPatch::new().functional_inputs(inputs(json!({"x": 1, "y": 2})));
        let mut data = ReportData::new(ReportId::new(), "A", initial, now);

        data.apply_patch(
            ReportPatch::new().functional_inputs(inputs(json!({"x": 9}))),
            now,
        );

        assert_eq!(serde_json::Value::Object(data.functional_inputs), json!({"x": 9}));
    }

    #[test]
    fn test_patch_leaves_absent_fields() {
        let now = Utc::now();
        let initial = ReportPatch::new().selected_listings(["4.04"]);
        let mut data = ReportData::new(ReportId::new(), "A", initial, now);

        data.apply_patch(ReportPatch::new().title("B"), now);

        assert_eq!(data.title, "B");
        assert_eq!(data.selected_listings, vec!["4.04"]);
    }

    #[test]
    fn test_last_modified_never_moves_backwards() {
        let now = Utc::now();
        let mut data = ReportData::new(ReportId::new(), "A", ReportPatch::new(), now);

        data.apply_patch(ReportPatch::new().title("B"), now - Duration::hours(1));
        assert_eq!(data.last_modified, now);

        let later = now + Duration::seconds(5);
        data.apply_patch(ReportPatch::new(), later);
        assert_eq!(data.last_modified, later);
    }

    #[test]
    fn test_report_data_field_names() {
        let data = ReportData::new(ReportId::new(), "A", ReportPatch::new(), Utc::now());
        let value = serde_json::to_value(&data).unwrap();

        for field in [
            "id",
            "title",
            "selectedListings",
            "functionalInputs",
            "generatedSections",
            "createdAt",
            "lastModified",
        ] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_legacy_listing_field_accepted() {
        let patch: ReportPatch =
            serde_json::from_value(json!({"selectedBlueBookListings": ["3.02"]})).unwrap();
        assert_eq!(patch.selected_listings, Some(vec!["3.02".to_string()]));
    }

    #[test]
    fn test_display_title_placeholder() {
        let listing = ReportListing {
            id: ReportId::new(),
            title: Err(crate::error::VaultError::Decryption("bad tag".into())),
            last_modified: Utc::now(),
            sync_status: SyncStatus::LocalOnly,
        };
        assert_eq!(listing.display_title(), UNREADABLE_TITLE);
        assert!(!listing.is_readable());
    }

    #[test]
    fn test_unreadable_listing_sorts_oldest() {
        let listing = ReportListing::unreadable(
            ReportId::new(),
            crate::error::VaultError::Storage("truncated".into()),
        );
        assert_eq!(listing.display_title(), UNREADABLE_TITLE);
        assert!(listing.last_modified < Utc::now());
    }
}
