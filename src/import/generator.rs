//! Asynchronous import job generation
//!
//! Gathers the three inputs of a diff (working tree, METS, existing archival group)
//! from their collaborators, then runs the synchronous [`DiffEngine`]. Cancellation is
//! checked between the I/O phases; the diff itself has no cancellation points.

use super::diff::{DiffEngine, ImportTarget};
use super::job::ImportJob;
use super::ImportSettings;
use crate::combined::{CombinedDirectory, MismatchReport, Whereabouts};
use crate::deposit::DepositLayout;
use crate::error::ImportError;
use crate::mets::{MetsFileWrapper, MetsSource};
use crate::preserved::{ArchivalGroup, ArchivalGroupSource, PathAvailability};
use crate::working::{DepositStore, WorkingDirectory, WorkingTreeBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the caller expects to find in the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportIntent {
    /// Create when absent, update when present
    #[default]
    Any,
    /// A new archival group; the path must be available
    Create,
    /// An existing archival group; absence is `NotFound`
    Update,
}

/// The gathered inputs of one diff
#[derive(Debug)]
pub struct DiffInputs {
    pub working_tree: WorkingDirectory,
    pub mets: Option<MetsFileWrapper>,
    pub existing: Option<ArchivalGroup>,
}

impl DiffInputs {
    pub fn combined<'a>(&'a self, layout: &DepositLayout) -> CombinedDirectory<'a> {
        CombinedDirectory::build(&self.working_tree, self.mets.as_ref(), layout)
    }
}

/// Deposit and METS compared without touching the repository
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAudit {
    /// Every path of the combined tree and which sources hold it
    pub whereabouts: BTreeMap<String, Whereabouts>,
    pub mismatches: Vec<MismatchReport>,
}

impl DepositAudit {
    /// Paths held by only one source (or outside the reconciled area)
    pub fn unmatched(&self) -> impl Iterator<Item = (&str, Whereabouts)> {
        self.whereabouts
            .iter()
            .filter(|(_, w)| **w != Whereabouts::Both)
            .map(|(path, w)| (path.as_str(), *w))
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.unmatched().next().is_none()
    }
}

pub struct ImportJobGenerator<'a> {
    store: &'a dyn DepositStore,
    mets: &'a dyn MetsSource,
    archive: &'a dyn ArchivalGroupSource,
    engine: DiffEngine,
    settings: ImportSettings,
}

impl<'a> ImportJobGenerator<'a> {
    pub fn new(
        store: &'a dyn DepositStore,
        mets: &'a dyn MetsSource,
        archive: &'a dyn ArchivalGroupSource,
        layout: DepositLayout,
        settings: ImportSettings,
    ) -> Self {
        Self {
            store,
            mets,
            archive,
            engine: DiffEngine::new(layout, settings.max_slug_length),
            settings,
        }
    }

    pub fn engine(&self) -> &DiffEngine {
        &self.engine
    }

    /// Build the working tree and parse METS.
    pub async fn load_deposit(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(WorkingDirectory, Option<MetsFileWrapper>), ImportError> {
        let layout = self.engine.layout();
        let working_tree = WorkingTreeBuilder::new(self.store, layout)
            .build(self.settings.read_index, self.settings.write_index, cancel)
            .await?;

        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        let mets = self.mets.parse(&self.store.location()).await?;
        if mets.is_none() {
            debug!(location = %self.store.location(), "Deposit has no METS file");
        }
        Ok((working_tree, mets))
    }

    /// Fetch the existing archival group, checking it against the caller's intent.
    pub async fn load_existing(
        &self,
        archival_group: &str,
        intent: ImportIntent,
    ) -> Result<Option<ArchivalGroup>, ImportError> {
        let existing = self.archive.get_archival_group(archival_group, None).await?;
        match (&existing, intent) {
            (None, ImportIntent::Update) => {
                return Err(ImportError::NotFound(archival_group.to_string()));
            }
            (Some(_), ImportIntent::Create) => {
                return Err(ImportError::PathUnavailable(format!(
                    "{} already exists",
                    archival_group
                )));
            }
            (None, _) => {
                if let PathAvailability::Conflict(reason) =
                    self.archive.test_path_available(archival_group).await?
                {
                    warn!(archival_group = %archival_group, reason = %reason, "Path not available");
                    return Err(ImportError::PathUnavailable(reason));
                }
            }
            (Some(_), _) => {}
        }
        Ok(existing)
    }

    pub async fn gather(
        &self,
        target: &ImportTarget,
        intent: ImportIntent,
        cancel: &CancellationToken,
    ) -> Result<DiffInputs, ImportError> {
        let (working_tree, mets) = self.load_deposit(cancel).await?;
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        let existing = self.load_existing(&target.archival_group, intent).await?;
        Ok(DiffInputs {
            working_tree,
            mets,
            existing,
        })
    }

    /// Gather inputs and compute the import job.
    pub async fn generate(
        &self,
        target: &ImportTarget,
        intent: ImportIntent,
        cancel: &CancellationToken,
    ) -> Result<ImportJob, ImportError> {
        let inputs = self.gather(target, intent, cancel).await?;
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        let mut target = target.clone();
        if target.archival_group_name.is_none() {
            target.archival_group_name = inputs.mets.as_ref().and_then(|m| m.name.clone());
        }

        let combined = inputs.combined(self.engine.layout());
        let job = self
            .engine
            .diff(&target, &combined, inputs.existing.as_ref())?;
        info!(
            archival_group = %target.archival_group,
            job = %job.id,
            empty = job.is_empty(),
            "Import job ready"
        );
        Ok(job)
    }

    /// Whereabouts and mismatch reports for the deposit, without touching the
    /// repository.
    pub async fn audit(&self, cancel: &CancellationToken) -> Result<DepositAudit, ImportError> {
        let (working_tree, mets) = self.load_deposit(cancel).await?;
        let combined = CombinedDirectory::build(&working_tree, mets.as_ref(), self.engine.layout());
        let audit = DepositAudit {
            whereabouts: combined.whereabouts_summary(),
            mismatches: combined.mismatch_reports(),
        };
        debug!(
            paths = audit.whereabouts.len(),
            mismatches = audit.mismatches.len(),
            "Deposit audited"
        );
        Ok(audit)
    }

}
