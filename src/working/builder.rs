//! Build a Working Tree for a deposit, from its sidecar index or by enumeration.

use super::index::{read_index, write_index};
use super::listing::normalize_key;
use super::store::DepositStore;
use super::WorkingDirectory;
use crate::deposit::DepositLayout;
use crate::error::{ImportError, StorageError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct WorkingTreeBuilder<'a> {
    store: &'a dyn DepositStore,
    layout: &'a DepositLayout,
}

impl<'a> WorkingTreeBuilder<'a> {
    pub fn new(store: &'a dyn DepositStore, layout: &'a DepositLayout) -> Self {
        Self { store, layout }
    }

    /// Build the tree.
    ///
    /// With `use_index`, a present and readable sidecar index is returned as-is.
    /// Otherwise the store is enumerated; with `refresh_index` the fresh tree is then
    /// stored as the new index. An unreadable index is logged and ignored.
    pub async fn build(
        &self,
        use_index: bool,
        refresh_index: bool,
        cancel: &CancellationToken,
    ) -> Result<WorkingDirectory, ImportError> {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        if use_index {
            match self.read_existing_index().await {
                Ok(Some(tree)) => {
                    debug!(location = %self.store.location(), "Using existing deposit index");
                    return Ok(tree);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        location = %self.store.location(),
                        error = %e,
                        "Deposit index unreadable, enumerating store instead"
                    );
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        let tree = self.enumerate().await?;

        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        if refresh_index {
            let bytes = write_index(&tree)?;
            self.store
                .write(&self.layout.index_file_name, &bytes)
                .await?;
        }

        info!(
            location = %self.store.location(),
            files = tree.file_count(),
            "Built working tree from deposit store"
        );
        Ok(tree)
    }

    pub async fn read_existing_index(&self) -> Result<Option<WorkingDirectory>, StorageError> {
        if !self.store.exists(&self.layout.index_file_name).await? {
            return Ok(None);
        }
        let bytes = self.store.read(&self.layout.index_file_name).await?;
        Ok(Some(read_index(&bytes)?))
    }

    /// Enumerate the store; the index file is never part of the tree.
    pub async fn enumerate(&self) -> Result<WorkingDirectory, StorageError> {
        let index_key = normalize_key(&self.layout.index_file_name);
        let objects = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|o| normalize_key(&o.key) != index_key);
        Ok(WorkingDirectory::from_listing(objects))
    }
}
