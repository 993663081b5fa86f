//! Diff engine
//!
//! Compares the reconciled deposit tree with the existing archival group and produces
//! an [`ImportJob`]. The engine is synchronous and does no I/O. It validates the whole
//! source before classifying anything, so a failure never yields a partial job.
//!
//! The source tree is the content root plus the METS file at the archival group root.
//! Metadata tool output and anything outside the layout are not imported.

use super::job::ImportJob;
use super::slug::check_path_slug;
use crate::combined::{CombinedDirectory, CombinedFile, Whereabouts};
use crate::deposit::DepositLayout;
use crate::error::ImportError;
use crate::preserved::{ArchivalGroup, Binary, Container};
use crate::types::{join_path, uri_for, Uri};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info};

/// What the job is for: identity and provenance of the archival group being written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTarget {
    pub archival_group: Uri,
    pub archival_group_name: Option<String>,
    pub deposit_id: Option<String>,
    /// Location of the deposit files; binary origins are resolved against it
    pub source: Option<String>,
}

impl ImportTarget {
    pub fn new(archival_group: impl Into<Uri>) -> Self {
        Self {
            archival_group: archival_group.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.archival_group_name = Some(name.into());
        self
    }

    pub fn with_deposit(mut self, deposit_id: impl Into<String>, source: impl Into<String>) -> Self {
        self.deposit_id = Some(deposit_id.into());
        self.source = Some(source.into());
        self
    }

    fn origin(&self, local_path: &str) -> String {
        match &self.source {
            Some(source) => join_path(source.trim_end_matches('/'), local_path),
            None => local_path.to_string(),
        }
    }
}

/// Computes import jobs for one deposit layout
#[derive(Debug, Clone)]
pub struct DiffEngine {
    layout: DepositLayout,
    max_slug_length: usize,
}

impl DiffEngine {
    pub fn new(layout: DepositLayout, max_slug_length: usize) -> Self {
        Self {
            layout,
            max_slug_length,
        }
    }

    pub fn layout(&self) -> &DepositLayout {
        &self.layout
    }

    /// Produce the change-set that brings `existing` in line with the deposit.
    ///
    /// With no existing archival group everything in the source is added.
    pub fn diff(
        &self,
        target: &ImportTarget,
        combined: &CombinedDirectory<'_>,
        existing: Option<&ArchivalGroup>,
    ) -> Result<ImportJob, ImportError> {
        let source = self.source_tree(target, combined)?;
        let (source_containers, source_binaries) = source.flatten();

        let mut job = ImportJob::new(target.archival_group.clone(), existing.is_some());
        job.deposit_id = target.deposit_id.clone();
        job.source = target.source.clone();
        job.archival_group_name = target.archival_group_name.clone();

        match existing {
            None => {
                for binary in &source_binaries {
                    if binary.origin.is_none() {
                        return Err(ImportError::validation(
                            binary.id.clone(),
                            "described in METS but not present in the deposit",
                        ));
                    }
                }
                job.containers_to_add = source_containers;
                job.binaries_to_add = source_binaries;
            }
            Some(existing) => {
                if existing.id().trim_end_matches('/') != target.archival_group {
                    error!(
                        archival_group = %target.archival_group,
                        existing = %existing.id(),
                        "Existing archival group does not match the import target"
                    );
                    return Err(ImportError::Invariant(format!(
                        "existing archival group {} is not {}",
                        existing.id(),
                        target.archival_group
                    )));
                }
                job.source_version = existing.version.as_ref().map(|v| v.name.clone());
                if job.archival_group_name.as_deref() == Some(existing.root.name.as_str()) {
                    job.archival_group_name = None;
                }

                let (existing_containers, existing_binaries) = existing.flatten();
                diff_containers(&mut job, source_containers, existing_containers);
                self.diff_binaries(&mut job, source_binaries, existing_binaries)?;
            }
        }

        info!(
            archival_group = %job.archival_group,
            is_update = job.is_update,
            containers_to_add = job.containers_to_add.len(),
            containers_to_delete = job.containers_to_delete.len(),
            containers_to_rename = job.containers_to_rename.len(),
            binaries_to_add = job.binaries_to_add.len(),
            binaries_to_delete = job.binaries_to_delete.len(),
            binaries_to_patch = job.binaries_to_patch.len(),
            binaries_to_rename = job.binaries_to_rename.len(),
            "Computed import job"
        );
        Ok(job)
    }

    /// The validated tree the archival group should end up as.
    ///
    /// Fails on the first invalid slug, missing digest or digest conflict.
    pub fn source_tree(
        &self,
        target: &ImportTarget,
        combined: &CombinedDirectory<'_>,
    ) -> Result<Container, ImportError> {
        let name = target
            .archival_group_name
            .clone()
            .unwrap_or_else(|| crate::types::last_segment(&target.archival_group).to_string());
        let mut root = Container::new(target.archival_group.clone(), name);

        if let Some(mets_file) = combined.find_file(&self.layout.mets_file_name) {
            if mets_file.deposit_file().is_some() {
                root.binaries.push(self.binary_for(target, mets_file, true)?);
            }
        }

        if let Some(content) = combined.find_directory(&self.layout.content_root) {
            if content.whereabouts() != Whereabouts::Neither {
                root.containers.push(self.container_for(target, content)?);
            }
        }

        Ok(root)
    }

    fn container_for(
        &self,
        target: &ImportTarget,
        directory: &CombinedDirectory<'_>,
    ) -> Result<Container, ImportError> {
        check_path_slug(directory.local_path(), self.max_slug_length)?;
        let mut container = Container::new(
            uri_for(&target.archival_group, directory.local_path()),
            directory.name(),
        );

        for file in directory.files() {
            if file.whereabouts() == Whereabouts::Neither {
                continue;
            }
            container.binaries.push(self.binary_for(target, file, false)?);
        }
        for child in directory.directories() {
            if child.whereabouts() == Whereabouts::Neither {
                continue;
            }
            container.containers.push(self.container_for(target, child)?);
        }
        Ok(container)
    }

    fn binary_for(
        &self,
        target: &ImportTarget,
        file: &CombinedFile<'_>,
        is_mets_file: bool,
    ) -> Result<Binary, ImportError> {
        check_path_slug(file.local_path(), self.max_slug_length)?;
        let digest = resolve_digest(file, is_mets_file)?;
        Ok(Binary {
            id: uri_for(&target.archival_group, file.local_path()),
            name: file.name().to_string(),
            content_type: file.content_type(),
            size: file.size(),
            digest,
            origin: file.deposit_file().map(|f| target.origin(&f.local_path)),
        })
    }

    fn diff_binaries(
        &self,
        job: &mut ImportJob,
        source: Vec<Binary>,
        existing: Vec<Binary>,
    ) -> Result<(), ImportError> {
        let mets_uri = uri_for(&job.archival_group, &self.layout.mets_file_name);
        let existing_by_id: HashMap<&str, &Binary> =
            existing.iter().map(|b| (b.id.as_str(), b)).collect();
        let source_ids: HashSet<&str> = source.iter().map(|b| b.id.as_str()).collect();

        let mut to_add = Vec::new();
        let mut to_patch = Vec::new();
        let mut to_rename = Vec::new();

        for binary in &source {
            let Some(current) = existing_by_id.get(binary.id.as_str()) else {
                if binary.origin.is_none() {
                    return Err(ImportError::validation(
                        binary.id.clone(),
                        "described in METS but not present in the deposit or the archive",
                    ));
                }
                to_add.push(binary.clone());
                continue;
            };

            let changed = match (&binary.digest, &current.digest) {
                (Some(new), Some(old)) => !new.eq_ignore_ascii_case(old),
                // Only the METS file may lack a digest; its content is re-sent
                _ if binary.id == mets_uri => true,
                _ => {
                    error!(id = %binary.id, "Digest missing after validation");
                    return Err(ImportError::Invariant(format!(
                        "digest missing for {} when comparing with the archive",
                        binary.id
                    )));
                }
            };

            if changed {
                if binary.origin.is_none() {
                    return Err(ImportError::validation(
                        binary.id.clone(),
                        "METS digest differs from the archive but the deposit has no file to send",
                    ));
                }
                to_patch.push(binary.clone());
            } else if binary.name != current.name {
                to_rename.push(binary.clone());
            } else {
                debug!(id = %binary.id, "Binary unchanged");
            }
        }

        job.binaries_to_add = to_add;
        job.binaries_to_patch = to_patch;
        job.binaries_to_rename = to_rename;
        job.binaries_to_delete = existing
            .iter()
            .filter(|b| !source_ids.contains(b.id.as_str()))
            .cloned()
            .collect();
        Ok(())
    }
}

fn diff_containers(job: &mut ImportJob, source: Vec<Container>, existing: Vec<Container>) {
    let existing_by_id: HashMap<&str, &Container> =
        existing.iter().map(|c| (c.id.as_str(), c)).collect();
    let source_ids: HashSet<&str> = source.iter().map(|c| c.id.as_str()).collect();

    for container in &source {
        match existing_by_id.get(container.id.as_str()) {
            None => job.containers_to_add.push(container.clone()),
            Some(current) if current.name != container.name => {
                job.containers_to_rename.push(container.clone())
            }
            Some(_) => {}
        }
    }

    // Children before parents, so a container is empty when it is removed
    job.containers_to_delete = existing
        .iter()
        .rev()
        .filter(|c| !source_ids.contains(c.id.as_str()))
        .cloned()
        .collect();
}

/// Digest for a source binary: METS first, and the two sources must agree.
fn resolve_digest(file: &CombinedFile<'_>, allow_missing: bool) -> Result<Option<String>, ImportError> {
    match (file.deposit_digest(), file.mets_digest()) {
        (Some(deposit), Some(mets)) if !deposit.eq_ignore_ascii_case(mets) => {
            Err(ImportError::DigestConflict {
                path: file.local_path().to_string(),
                deposit_digest: deposit.to_string(),
                mets_digest: mets.to_string(),
            })
        }
        (_, Some(mets)) => Ok(Some(mets.to_string())),
        (Some(deposit), None) => Ok(Some(deposit.to_string())),
        (None, None) if allow_missing => Ok(None),
        (None, None) => Err(ImportError::MissingDigest {
            path: file.local_path().to_string(),
        }),
    }
}
