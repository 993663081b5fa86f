//! Deposits: staging areas whose content is imported into an archival group.
//!
//! A deposit carries an opaque version tag. Mutating operations must present the
//! tag they last read; a stale tag is a conflict. Only one import job may be active
//! per deposit at a time.

use crate::error::ImportError;
use crate::types::{is_under, Uri};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Where things live inside a deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositLayout {
    /// Sub-root holding the content to preserve
    #[serde(default = "default_content_root")]
    pub content_root: String,

    /// Sub-root holding tool output; never compared against METS
    #[serde(default = "default_metadata_root")]
    pub metadata_root: String,

    /// The deposit's self-describing METS file, at the deposit root
    #[serde(default = "default_mets_file_name")]
    pub mets_file_name: String,

    /// Sidecar index of the enumerated working tree
    #[serde(default = "default_index_file_name")]
    pub index_file_name: String,
}

fn default_content_root() -> String {
    "objects".to_string()
}

fn default_metadata_root() -> String {
    "metadata".to_string()
}

fn default_mets_file_name() -> String {
    "mets.xml".to_string()
}

fn default_index_file_name() -> String {
    "__METSlike.json".to_string()
}

impl Default for DepositLayout {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
            metadata_root: default_metadata_root(),
            mets_file_name: default_mets_file_name(),
            index_file_name: default_index_file_name(),
        }
    }
}

impl DepositLayout {
    pub fn is_content(&self, path: &str) -> bool {
        is_under(path, &self.content_root)
    }

    pub fn is_metadata(&self, path: &str) -> bool {
        is_under(path, &self.metadata_root)
    }

    pub fn is_mets_file(&self, path: &str) -> bool {
        path == self.mets_file_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DepositStatus {
    New,
    Exporting,
    Preserved,
    Error,
}

/// A deposit record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: String,
    /// Location of the deposit's files (object-store URI or directory)
    pub files: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archival_group: Option<Uri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archival_group_name: Option<String>,
    pub version_tag: String,
    pub status: DepositStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_job: Option<String>,
}

impl Deposit {
    pub fn new(id: impl Into<String>, files: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            files: files.into(),
            archival_group: None,
            archival_group_name: None,
            version_tag: new_version_tag(),
            status: DepositStatus::New,
            active_job: None,
        }
    }

    /// Fail with a conflict unless `supplied` matches the current tag.
    pub fn check_version(&self, supplied: &str) -> Result<(), ImportError> {
        if supplied != self.version_tag {
            warn!(
                deposit = %self.id,
                expected = %self.version_tag,
                supplied = %supplied,
                "Stale deposit version tag"
            );
            return Err(ImportError::VersionConflict {
                expected: self.version_tag.clone(),
                supplied: supplied.to_string(),
            });
        }
        Ok(())
    }

    /// Record a change to the deposit; returns the new tag.
    pub fn touch(&mut self, supplied: &str) -> Result<&str, ImportError> {
        self.check_version(supplied)?;
        self.version_tag = new_version_tag();
        Ok(&self.version_tag)
    }

    /// Claim the deposit for a job. A second concurrent job is refused.
    pub fn begin_job(&mut self, job_id: &str) -> Result<(), ImportError> {
        if let Some(active) = &self.active_job {
            if active != job_id {
                return Err(ImportError::JobAlreadyActive(self.id.clone()));
            }
        }
        self.active_job = Some(job_id.to_string());
        self.status = DepositStatus::Exporting;
        Ok(())
    }

    pub fn end_job(&mut self, succeeded: bool) {
        self.active_job = None;
        self.status = if succeeded {
            DepositStatus::Preserved
        } else {
            DepositStatus::Error
        };
    }
}

/// Deposits known to the process, keyed by id.
///
/// Claims and releases go through here so the version tag check and the single
/// active job rule hold across every caller sharing the ledger.
#[derive(Default)]
pub struct DepositLedger {
    deposits: RwLock<HashMap<String, Deposit>>,
}

impl DepositLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, deposit: Deposit) {
        self.deposits.write().insert(deposit.id.clone(), deposit);
    }

    /// Snapshot of a deposit
    pub fn get(&self, id: &str) -> Option<Deposit> {
        self.deposits.read().get(id).cloned()
    }

    /// Record a change to a deposit; returns the new tag.
    pub fn touch(&self, id: &str, supplied: &str) -> Result<String, ImportError> {
        let mut deposits = self.deposits.write();
        let deposit = deposits
            .get_mut(id)
            .ok_or_else(|| ImportError::NotFound(format!("deposit {}", id)))?;
        deposit.touch(supplied).map(str::to_string)
    }

    /// Check the supplied tag and claim the deposit for `job_id`.
    pub fn claim(&self, id: &str, supplied: &str, job_id: &str) -> Result<(), ImportError> {
        let mut deposits = self.deposits.write();
        let deposit = deposits
            .get_mut(id)
            .ok_or_else(|| ImportError::NotFound(format!("deposit {}", id)))?;
        deposit.check_version(supplied)?;
        deposit.begin_job(job_id)?;
        debug!(deposit = %id, job = %job_id, "Deposit claimed");
        Ok(())
    }

    /// Release the claim held by `job_id`. A claim held by another job is left alone.
    pub fn release(&self, id: &str, job_id: &str, succeeded: bool) {
        let mut deposits = self.deposits.write();
        match deposits.get_mut(id) {
            Some(deposit) if deposit.active_job.as_deref() == Some(job_id) => {
                deposit.end_job(succeeded);
                debug!(deposit = %id, job = %job_id, status = ?deposit.status, "Deposit released");
            }
            _ => warn!(deposit = %id, job = %job_id, "No claim to release"),
        }
    }
}

fn new_version_tag() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
