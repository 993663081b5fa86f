//! Sidecar index: a serialised Working Tree stored alongside the deposit so later
//! requests can skip re-enumerating the store.

use super::WorkingDirectory;
use crate::error::StorageError;

pub fn read_index(bytes: &[u8]) -> Result<WorkingDirectory, StorageError> {
    let mut root: WorkingDirectory = serde_json::from_slice(bytes)?;
    root.sort();
    Ok(root)
}

pub fn write_index(root: &WorkingDirectory) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec_pretty(root)?)
}
