//! Executes an import job against a repository writer.
//!
//! Operations run in dependency order: containers to add (parents first), binaries to
//! add, binaries to patch, renames, binaries to delete, containers to delete (children
//! first). A failed item is recorded and the run continues.

use super::ImportJobExecutor;
use crate::error::ImportError;
use crate::import::{ImportJob, ImportJobResult};
use crate::preserved::{Binary, Container};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Write side of the repository
#[async_trait]
pub trait RepositoryWriter: Send + Sync {
    /// Prepare to apply `job` (create the archival group for a new object).
    async fn begin(&self, job: &ImportJob) -> Result<(), ImportError>;

    async fn create_container(&self, container: &Container) -> Result<(), ImportError>;

    async fn delete_container(&self, container: &Container) -> Result<(), ImportError>;

    async fn put_binary(&self, binary: &Binary) -> Result<(), ImportError>;

    /// Replace content and name of an existing binary.
    async fn patch_binary(&self, binary: &Binary) -> Result<(), ImportError>;

    async fn delete_binary(&self, binary: &Binary) -> Result<(), ImportError>;

    /// Change the display name of a container or binary.
    async fn rename(&self, id: &str, name: &str) -> Result<(), ImportError>;

    /// Finish the job; returns the new version of the archival group.
    async fn commit(&self, job: &ImportJob) -> Result<Option<String>, ImportError>;
}

pub struct ImportJobRunner<W> {
    writer: Arc<W>,
}

impl<W: RepositoryWriter> ImportJobRunner<W> {
    pub fn new(writer: Arc<W>) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &Arc<W> {
        &self.writer
    }
}

fn record<T: Clone>(
    result: &mut ImportJobResult,
    outcome: Result<(), ImportError>,
    id: &str,
    item: &T,
    done: fn(&mut ImportJobResult) -> &mut Vec<T>,
) {
    match outcome {
        Ok(()) => done(result).push(item.clone()),
        Err(e) => {
            warn!(id = %id, error = %e, "Import item failed");
            result.record_error(id, e.to_string());
        }
    }
}

#[async_trait]
impl<W: RepositoryWriter> ImportJobExecutor for ImportJobRunner<W> {
    async fn execute(&self, job: &ImportJob) -> ImportJobResult {
        let mut result = ImportJobResult::waiting(job);
        result.begin();

        if let Err(e) = self.writer.begin(job).await {
            warn!(archival_group = %job.archival_group, error = %e, "Could not start import job");
            result.record_error(job.archival_group.clone(), e.to_string());
            result.finish(None);
            return result;
        }

        for container in &job.containers_to_add {
            let outcome = self.writer.create_container(container).await;
            record(&mut result, outcome, &container.id, container, |r| &mut r.containers_added);
        }
        for binary in &job.binaries_to_add {
            let outcome = self.writer.put_binary(binary).await;
            record(&mut result, outcome, &binary.id, binary, |r| &mut r.binaries_added);
        }
        for binary in &job.binaries_to_patch {
            let outcome = self.writer.patch_binary(binary).await;
            record(&mut result, outcome, &binary.id, binary, |r| &mut r.binaries_patched);
        }
        for container in &job.containers_to_rename {
            let outcome = self.writer.rename(&container.id, &container.name).await;
            record(&mut result, outcome, &container.id, container, |r| &mut r.containers_renamed);
        }
        for binary in &job.binaries_to_rename {
            let outcome = self.writer.rename(&binary.id, &binary.name).await;
            record(&mut result, outcome, &binary.id, binary, |r| &mut r.binaries_renamed);
        }
        for binary in &job.binaries_to_delete {
            let outcome = self.writer.delete_binary(binary).await;
            record(&mut result, outcome, &binary.id, binary, |r| &mut r.binaries_deleted);
        }
        for container in &job.containers_to_delete {
            let outcome = self.writer.delete_container(container).await;
            record(&mut result, outcome, &container.id, container, |r| &mut r.containers_deleted);
        }

        let new_version = match self.writer.commit(job).await {
            Ok(version) => version,
            Err(e) => {
                result.record_error(job.archival_group.clone(), e.to_string());
                None
            }
        };
        result.finish(new_version);
        debug!(
            job = %job.id,
            status = ?result.status,
            errors = result.errors.len(),
            "Import job executed"
        );
        result
    }
}
