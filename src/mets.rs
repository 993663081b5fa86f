//! METS contract
//!
//! Parsing METS XML is done elsewhere; this module defines what the import code needs
//! from a parsed document: the physical structure as a Working Tree, and the entry for
//! the METS file itself.

use crate::error::StorageError;
use crate::working::{WorkingDirectory, WorkingFile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A parsed METS document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetsFileWrapper {
    /// Object name declared by the METS document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Entry for the METS file itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_file: Option<WorkingFile>,

    /// Physical structure rooted at the deposit root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_structure: Option<WorkingDirectory>,
}

#[async_trait]
pub trait MetsSource: Send + Sync {
    /// Parse the METS document at `location`; `None` when there is no METS file.
    async fn parse(&self, location: &str) -> Result<Option<MetsFileWrapper>, StorageError>;
}

/// Reads a JSON-serialised [`MetsFileWrapper`] from a file.
///
/// `location` is ignored; the source always reads its configured path.
#[derive(Debug, Clone)]
pub struct JsonMetsSource {
    path: PathBuf,
}

impl JsonMetsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetsSource for JsonMetsSource {
    async fn parse(&self, _location: &str) -> Result<Option<MetsFileWrapper>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut wrapper: MetsFileWrapper = serde_json::from_slice(&bytes)?;
        if let Some(structure) = wrapper.physical_structure.as_mut() {
            structure.sort();
        }
        Ok(Some(wrapper))
    }
}

/// Source for deposits that have no METS document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMets;

#[async_trait]
impl MetsSource for NoMets {
    async fn parse(&self, _location: &str) -> Result<Option<MetsFileWrapper>, StorageError> {
        Ok(None)
    }
}
