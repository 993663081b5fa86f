//! Preserved Tree
//!
//! The existing archival group as the repository returns it: containers owning
//! containers and binaries. Identity is the resource URI; two nodes are "the same"
//! for diffing when their ids match, whatever else differs.

use crate::error::{ImportError, StorageError};
use crate::types::{is_under, Digest, Uri};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A container (directory-like resource)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: Uri,
    pub name: String,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub binaries: Vec<Binary>,
}

/// A binary (file-like resource)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binary {
    pub id: Uri,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    /// Where the content comes from (deposit location of the file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Container {
    pub fn new(id: impl Into<Uri>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            containers: Vec::new(),
            binaries: Vec::new(),
        }
    }

    /// Copy without children
    pub fn shallow(&self) -> Container {
        Container::new(self.id.clone(), self.name.clone())
    }

    /// All descendant containers (shallow copies) and binaries, parents first.
    /// `self` is not included.
    pub fn flatten(&self) -> (Vec<Container>, Vec<Binary>) {
        let mut containers = Vec::new();
        let mut binaries = Vec::new();
        self.collect(&mut containers, &mut binaries);
        (containers, binaries)
    }

    fn collect(&self, containers: &mut Vec<Container>, binaries: &mut Vec<Binary>) {
        binaries.extend(self.binaries.iter().cloned());
        for child in &self.containers {
            containers.push(child.shallow());
            child.collect(containers, binaries);
        }
    }
}

/// Version of an archival group in the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectVersion {
    /// OCFL-style version name, e.g. `v3`
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<chrono::DateTime<chrono::Utc>>,
}

/// An archival group: the root container plus version information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivalGroup {
    #[serde(flatten)]
    pub root: Container,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ObjectVersion>,
}

impl ArchivalGroup {
    pub fn id(&self) -> &str {
        &self.root.id
    }

    pub fn flatten(&self) -> (Vec<Container>, Vec<Binary>) {
        self.root.flatten()
    }
}

/// Whether a repository path can host a new archival group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathAvailability {
    Available,
    /// Something already exists at or above the path
    Conflict(String),
}

/// Repository lookups the import needs
#[async_trait]
pub trait ArchivalGroupSource: Send + Sync {
    /// The archival group at `uri`, optionally at a given version; `None` if absent.
    async fn get_archival_group(
        &self,
        uri: &str,
        version: Option<&str>,
    ) -> Result<Option<ArchivalGroup>, StorageError>;

    async fn test_path_available(&self, uri: &str) -> Result<PathAvailability, StorageError>;
}

/// Archival groups held in memory, keyed by id.
///
/// Serves as both lookup and writer, so a job can be applied and the result diffed
/// again. Used by the CLI (loaded from JSON) and by tests.
#[derive(Debug, Default)]
pub struct InMemoryArchivalGroups {
    groups: RwLock<Vec<ArchivalGroup>>,
}

impl InMemoryArchivalGroups {
    pub fn new(groups: Vec<ArchivalGroup>) -> Self {
        Self {
            groups: RwLock::new(groups),
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, StorageError> {
        let group: ArchivalGroup = serde_json::from_slice(bytes)?;
        Ok(Self::new(vec![group]))
    }

    /// Snapshot of the group with this id
    pub fn get(&self, uri: &str) -> Option<ArchivalGroup> {
        let uri = uri.trim_end_matches('/');
        self.groups
            .read()
            .iter()
            .find(|g| g.id().trim_end_matches('/') == uri)
            .cloned()
    }

    /// Run `f` over all groups under the write lock.
    pub(crate) fn with_groups<R>(&self, f: impl FnOnce(&mut Vec<ArchivalGroup>) -> R) -> R {
        f(&mut self.groups.write())
    }

    /// Run `f` on the container `id`, inside the group that owns it.
    pub(crate) fn with_container<F>(&self, id: &str, f: F) -> Result<(), ImportError>
    where
        F: FnOnce(&mut Container) -> Result<(), ImportError>,
    {
        let mut groups = self.groups.write();
        let group = groups
            .iter_mut()
            .find(|g| is_under(id, g.id()))
            .ok_or_else(|| ImportError::Repository(format!("no archival group holds {}", id)))?;
        let container = container_mut(&mut group.root, id)
            .ok_or_else(|| ImportError::Repository(format!("no container {}", id)))?;
        f(container)
    }
}

fn container_mut<'c>(container: &'c mut Container, id: &str) -> Option<&'c mut Container> {
    if container.id == id {
        return Some(container);
    }
    container
        .containers
        .iter_mut()
        .find(|c| is_under(id, &c.id))
        .and_then(|c| container_mut(c, id))
}

#[async_trait]
impl ArchivalGroupSource for InMemoryArchivalGroups {
    async fn get_archival_group(
        &self,
        uri: &str,
        version: Option<&str>,
    ) -> Result<Option<ArchivalGroup>, StorageError> {
        Ok(self.get(uri).filter(|g| match version {
            Some(v) => g.version.as_ref().map(|ov| ov.name.as_str()) == Some(v),
            None => true,
        }))
    }

    async fn test_path_available(&self, uri: &str) -> Result<PathAvailability, StorageError> {
        let uri = uri.trim_end_matches('/');
        for group in self.groups.read().iter() {
            let id = group.id().trim_end_matches('/');
            if is_under(uri, id) {
                return Ok(PathAvailability::Conflict(format!(
                    "{} is inside existing archival group {}",
                    uri, id
                )));
            }
            if is_under(id, uri) {
                return Ok(PathAvailability::Conflict(format!(
                    "{} contains existing archival group {}",
                    uri, id
                )));
            }
        }
        Ok(PathAvailability::Available)
    }
}
