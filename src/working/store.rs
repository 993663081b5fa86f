//! Deposit store contract and the local filesystem implementation.
//!
//! A store is rooted at one deposit. Keys are deposit-relative and `/`-separated.

use super::listing::StoredObject;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[async_trait]
pub trait DepositStore: Send + Sync {
    /// Human-readable location of the deposit (bucket URI, directory)
    fn location(&self) -> String;

    /// Enumerate every object and directory marker in the deposit.
    async fn list(&self) -> Result<Vec<StoredObject>, StorageError>;

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Deposit held in a local directory
#[derive(Debug, Clone)]
pub struct LocalDepositStore {
    root: PathBuf,
    compute_digests: bool,
}

impl LocalDepositStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        let root = dunce::canonicalize(&root).map_err(|e| {
            StorageError::InvalidPath(format!("cannot open deposit at {:?}: {}", root, e))
        })?;
        Ok(Self {
            root,
            compute_digests: true,
        })
    }

    /// Skip SHA-256 computation during listing.
    pub fn without_digests(mut self) -> Self {
        self.compute_digests = false;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(key);
        if key.is_empty() || rel.is_absolute() {
            return Err(StorageError::InvalidPath(format!(
                "key must be a non-empty relative path: {:?}",
                key
            )));
        }
        for component in rel.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(StorageError::InvalidPath(format!(
                    "key must not contain traversal or root components: {:?}",
                    key
                )));
            }
        }
        Ok(self.root.join(rel))
    }
}

/// Hex SHA-256 of a file's content.
pub fn sha256_file(path: &Path) -> Result<String, StorageError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn list_blocking(root: &Path, compute_digests: bool) -> Result<Vec<StoredObject>, StorageError> {
    let mut objects = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| StorageError::IoError(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| StorageError::InvalidPath(e.to_string()))?;
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let meta = entry.metadata().map_err(|e| StorageError::IoError(e.into()))?;
        let modified = meta.modified().ok().map(DateTime::<Utc>::from);

        if meta.is_dir() {
            objects.push(StoredObject {
                key: format!("{}/", key),
                size: 0,
                modified,
                digest: None,
                content_type: None,
            });
        } else if meta.is_file() {
            let digest = if compute_digests {
                Some(sha256_file(entry.path())?)
            } else {
                None
            };
            objects.push(StoredObject {
                key,
                size: meta.len(),
                modified,
                digest,
                content_type: None,
            });
        }
    }
    Ok(objects)
}

#[async_trait]
impl DepositStore for LocalDepositStore {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    async fn list(&self) -> Result<Vec<StoredObject>, StorageError> {
        let root = self.root.clone();
        let compute_digests = self.compute_digests;
        let objects = tokio::task::spawn_blocking(move || list_blocking(&root, compute_digests))
            .await
            .map_err(|e| StorageError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        debug!(root = %self.root.display(), count = objects.len(), "Listed deposit store");
        Ok(objects)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}
