//! Import Job and Import Job Result
//!
//! The JSON shapes here are consumed by execution and reporting tooling; field names
//! and the seven-list structure are part of the contract.

use crate::preserved::{Binary, Container};
use crate::types::Uri;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A computed change-set for one archival group.
///
/// Each container or binary id appears in at most one of the add, delete and patch
/// lists. The rename lists only hold items that are otherwise unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_id: Option<String>,
    pub archival_group: Uri,
    /// Name for a new archival group (or a new name for an existing one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archival_group_name: Option<String>,
    pub is_update: bool,
    /// Location of the deposit files the job reads from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Version of the existing archival group the diff was computed against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_version: Option<String>,
    pub created: DateTime<Utc>,
    pub containers_to_add: Vec<Container>,
    pub containers_to_delete: Vec<Container>,
    pub containers_to_rename: Vec<Container>,
    pub binaries_to_add: Vec<Binary>,
    pub binaries_to_delete: Vec<Binary>,
    pub binaries_to_patch: Vec<Binary>,
    pub binaries_to_rename: Vec<Binary>,
}

/// Counts per list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobSummary {
    pub containers_to_add: usize,
    pub containers_to_delete: usize,
    pub containers_to_rename: usize,
    pub binaries_to_add: usize,
    pub binaries_to_delete: usize,
    pub binaries_to_patch: usize,
    pub binaries_to_rename: usize,
}

impl ImportJob {
    pub fn new(archival_group: impl Into<Uri>, is_update: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            deposit_id: None,
            archival_group: archival_group.into(),
            archival_group_name: None,
            is_update,
            source: None,
            source_version: None,
            created: Utc::now(),
            containers_to_add: Vec::new(),
            containers_to_delete: Vec::new(),
            containers_to_rename: Vec::new(),
            binaries_to_add: Vec::new(),
            binaries_to_delete: Vec::new(),
            binaries_to_patch: Vec::new(),
            binaries_to_rename: Vec::new(),
        }
    }

    /// True when applying the job would change nothing.
    pub fn is_empty(&self) -> bool {
        self.containers_to_add.is_empty()
            && self.containers_to_delete.is_empty()
            && self.containers_to_rename.is_empty()
            && self.binaries_to_add.is_empty()
            && self.binaries_to_delete.is_empty()
            && self.binaries_to_patch.is_empty()
            && self.binaries_to_rename.is_empty()
    }

    pub fn summary(&self) -> ImportJobSummary {
        ImportJobSummary {
            containers_to_add: self.containers_to_add.len(),
            containers_to_delete: self.containers_to_delete.len(),
            containers_to_rename: self.containers_to_rename.len(),
            binaries_to_add: self.binaries_to_add.len(),
            binaries_to_delete: self.binaries_to_delete.len(),
            binaries_to_patch: self.binaries_to_patch.len(),
            binaries_to_rename: self.binaries_to_rename.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportJobStatus {
    Waiting,
    Running,
    Completed,
    CompletedWithErrors,
}

/// A failure applying one item of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportItemError {
    pub id: Uri,
    pub message: String,
}

/// Outcome of executing an [`ImportJob`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobResult {
    pub id: String,
    pub import_job_id: String,
    pub archival_group: Uri,
    pub status: ImportJobStatus,
    pub date_submitted: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_begun: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_finished: Option<DateTime<Utc>>,
    #[serde(default)]
    pub errors: Vec<ImportItemError>,
    #[serde(default)]
    pub containers_added: Vec<Container>,
    #[serde(default)]
    pub containers_deleted: Vec<Container>,
    #[serde(default)]
    pub containers_renamed: Vec<Container>,
    #[serde(default)]
    pub binaries_added: Vec<Binary>,
    #[serde(default)]
    pub binaries_deleted: Vec<Binary>,
    #[serde(default)]
    pub binaries_patched: Vec<Binary>,
    #[serde(default)]
    pub binaries_renamed: Vec<Binary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
}

impl ImportJobResult {
    /// A result for a job that has been queued but not started.
    pub fn waiting(job: &ImportJob) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            import_job_id: job.id.clone(),
            archival_group: job.archival_group.clone(),
            status: ImportJobStatus::Waiting,
            date_submitted: Utc::now(),
            date_begun: None,
            date_finished: None,
            errors: Vec::new(),
            containers_added: Vec::new(),
            containers_deleted: Vec::new(),
            containers_renamed: Vec::new(),
            binaries_added: Vec::new(),
            binaries_deleted: Vec::new(),
            binaries_patched: Vec::new(),
            binaries_renamed: Vec::new(),
            new_version: None,
        }
    }

    pub fn begin(&mut self) {
        self.status = ImportJobStatus::Running;
        self.date_begun = Some(Utc::now());
    }

    pub fn record_error(&mut self, id: impl Into<Uri>, message: impl Into<String>) {
        self.errors.push(ImportItemError {
            id: id.into(),
            message: message.into(),
        });
    }

    /// Close the result; the status reflects whether any item failed.
    pub fn finish(&mut self, new_version: Option<String>) {
        self.status = if self.errors.is_empty() {
            ImportJobStatus::Completed
        } else {
            ImportJobStatus::CompletedWithErrors
        };
        self.date_finished = Some(Utc::now());
        self.new_version = new_version;
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            ImportJobStatus::Completed | ImportJobStatus::CompletedWithErrors
        )
    }
}
