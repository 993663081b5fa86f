//! In-memory repository writer
//!
//! Applies import jobs to [`InMemoryArchivalGroups`], so a job can be executed and
//! the result diffed again without a repository.

use super::RepositoryWriter;
use crate::error::ImportError;
use crate::import::ImportJob;
use crate::preserved::{ArchivalGroup, Binary, Container, InMemoryArchivalGroups, ObjectVersion};
use crate::types::{last_segment, parent_path};
use async_trait::async_trait;

#[async_trait]
impl RepositoryWriter for InMemoryArchivalGroups {
    async fn begin(&self, job: &ImportJob) -> Result<(), ImportError> {
        self.with_groups(|groups| begin_in(groups, job))
    }

    async fn create_container(&self, container: &Container) -> Result<(), ImportError> {
        self.with_container(parent_path(&container.id), |parent| {
            if parent.containers.iter().any(|c| c.id == container.id) {
                return Err(ImportError::Repository(format!("{} already exists", container.id)));
            }
            parent.containers.push(container.shallow());
            Ok(())
        })
    }

    async fn delete_container(&self, container: &Container) -> Result<(), ImportError> {
        self.with_container(parent_path(&container.id), |parent| {
            let before = parent.containers.len();
            parent.containers.retain(|c| c.id != container.id);
            if parent.containers.len() == before {
                return Err(ImportError::Repository(format!("no container {}", container.id)));
            }
            Ok(())
        })
    }

    async fn put_binary(&self, binary: &Binary) -> Result<(), ImportError> {
        self.with_container(parent_path(&binary.id), |parent| {
            if parent.binaries.iter().any(|b| b.id == binary.id) {
                return Err(ImportError::Repository(format!("{} already exists", binary.id)));
            }
            parent.binaries.push(stored(binary));
            Ok(())
        })
    }

    async fn patch_binary(&self, binary: &Binary) -> Result<(), ImportError> {
        self.with_container(parent_path(&binary.id), |parent| {
            let current = parent
                .binaries
                .iter_mut()
                .find(|b| b.id == binary.id)
                .ok_or_else(|| ImportError::Repository(format!("no binary {}", binary.id)))?;
            *current = stored(binary);
            Ok(())
        })
    }

    async fn delete_binary(&self, binary: &Binary) -> Result<(), ImportError> {
        self.with_container(parent_path(&binary.id), |parent| {
            let before = parent.binaries.len();
            parent.binaries.retain(|b| b.id != binary.id);
            if parent.binaries.len() == before {
                return Err(ImportError::Repository(format!("no binary {}", binary.id)));
            }
            Ok(())
        })
    }

    async fn rename(&self, id: &str, name: &str) -> Result<(), ImportError> {
        self.with_container(parent_path(id), |parent| {
            if let Some(c) = parent.containers.iter_mut().find(|c| c.id == id) {
                c.name = name.to_string();
                return Ok(());
            }
            if let Some(b) = parent.binaries.iter_mut().find(|b| b.id == id) {
                b.name = name.to_string();
                return Ok(());
            }
            Err(ImportError::Repository(format!("nothing to rename at {}", id)))
        })
    }

    async fn commit(&self, job: &ImportJob) -> Result<Option<String>, ImportError> {
        self.with_groups(|groups| next_version(groups, job)).map(Some)
    }
}

fn next_version(groups: &mut [ArchivalGroup], job: &ImportJob) -> Result<String, ImportError> {
    let group = groups
        .iter_mut()
        .find(|g| g.id().trim_end_matches('/') == job.archival_group)
        .ok_or_else(|| ImportError::NotFound(job.archival_group.clone()))?;
    let next = group
        .version
        .as_ref()
        .and_then(|v| v.name.trim_start_matches('v').parse::<u32>().ok())
        .unwrap_or(0)
        + 1;
    let name = format!("v{}", next);
    group.version = Some(ObjectVersion {
        name: name.clone(),
        date: Some(chrono::Utc::now()),
    });
    Ok(name)
}

fn begin_in(groups: &mut Vec<ArchivalGroup>, job: &ImportJob) -> Result<(), ImportError> {
    let existing = groups
        .iter()
        .position(|g| g.id().trim_end_matches('/') == job.archival_group);

    match (existing, job.is_update) {
        (Some(index), true) => {
            let group = &mut groups[index];
            let current = group.version.as_ref().map(|v| v.name.as_str());
            if let Some(expected) = job.source_version.as_deref() {
                if current != Some(expected) {
                    return Err(ImportError::VersionConflict {
                        expected: expected.to_string(),
                        supplied: current.unwrap_or_default().to_string(),
                    });
                }
            }
            if let Some(name) = &job.archival_group_name {
                group.root.name = name.clone();
            }
            Ok(())
        }
        (None, false) => {
            let name = job
                .archival_group_name
                .clone()
                .unwrap_or_else(|| last_segment(&job.archival_group).to_string());
            groups.push(ArchivalGroup {
                root: Container::new(job.archival_group.clone(), name),
                version: None,
            });
            Ok(())
        }
        (Some(_), false) => Err(ImportError::PathUnavailable(format!(
            "{} already exists",
            job.archival_group
        ))),
        (None, true) => Err(ImportError::NotFound(job.archival_group.clone())),
    }
}

fn stored(binary: &Binary) -> Binary {
    Binary {
        origin: None,
        ..binary.clone()
    }
}
