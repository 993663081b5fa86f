//! Build a Working Tree from a flat object-store listing.

use super::{WorkingDirectory, WorkingFile};
use crate::types::trim_path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// One entry of a deposit store listing.
///
/// Keys are relative to the deposit root. A key ending in `/` is a directory marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl StoredObject {
    pub fn is_directory_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// NFC-normalise and trim a store key into a deposit-relative path.
pub fn normalize_key(key: &str) -> String {
    let nfc: String = key.nfc().collect();
    trim_path(&nfc.replace('\\', "/"))
}

impl WorkingDirectory {
    /// Assemble a tree from listing entries. Entries whose key normalises to the
    /// empty path are ignored.
    pub fn from_listing<I>(objects: I) -> WorkingDirectory
    where
        I: IntoIterator<Item = StoredObject>,
    {
        let mut root = WorkingDirectory::root();
        for object in objects {
            let path = normalize_key(&object.key);
            if path.is_empty() {
                continue;
            }
            if object.is_directory_marker() {
                let dir = root.directory_entry(&path);
                if dir.modified.is_none() {
                    dir.modified = object.modified;
                }
                continue;
            }
            let mut file = WorkingFile::new(path);
            file.size = Some(object.size);
            file.modified = object.modified;
            file.digest = object.digest;
            file.content_type = object.content_type;
            root.insert_file(file);
        }
        root.sort();
        root
    }
}
