//! Working Tree
//!
//! A path-keyed model of a deposit's directories and files. A tree is built fresh for
//! every diff or validation request, either by enumerating the deposit store or by
//! reading the sidecar index written by a previous enumeration. Both routes produce
//! the same shape.

pub mod builder;
pub mod index;
pub mod listing;
pub mod store;

use crate::content_type::resolve_content_type;
use crate::metadata::{Metadata, MetadataLookup};
use crate::types::{join_path, last_segment, parent_path};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use builder::WorkingTreeBuilder;
pub use listing::StoredObject;
pub use store::{DepositStore, LocalDepositStore};

/// A file in a deposit (or a file described by METS)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingFile {
    pub local_path: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
}

impl WorkingFile {
    /// New file at `local_path`; the name defaults to the final path segment.
    pub fn new(local_path: impl Into<String>) -> Self {
        let local_path = local_path.into();
        let name = last_segment(&local_path).to_string();
        Self {
            local_path,
            name,
            content_type: None,
            digest: None,
            size: None,
            modified: None,
            metadata: Vec::new(),
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.push(metadata);
        self
    }

    /// Own content type plus one hint per format-identification record.
    pub fn content_type_hints(&self) -> Vec<&str> {
        let mut hints: Vec<&str> = self.content_type.iter().map(String::as_str).collect();
        hints.extend(
            self.file_format_metadata_all()
                .into_iter()
                .filter_map(|f| f.content_type.as_deref()),
        );
        hints
    }

    pub fn resolved_content_type(&self) -> Option<String> {
        resolve_content_type(self.content_type_hints())
    }

    /// Digest recorded on the file itself, else the one from format identification.
    pub fn effective_digest(&self) -> Option<&str> {
        self.digest
            .as_deref()
            .or_else(|| self.file_format_metadata().and_then(|f| f.digest.as_deref()))
            .filter(|d| !d.trim().is_empty())
    }
}

impl MetadataLookup for WorkingFile {
    fn records(&self) -> &[Metadata] {
        &self.metadata
    }
}

/// A directory in a deposit; owns its children by value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDirectory {
    pub local_path: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub directories: Vec<WorkingDirectory>,
    #[serde(default)]
    pub files: Vec<WorkingFile>,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
}

impl Default for WorkingDirectory {
    fn default() -> Self {
        Self::root()
    }
}

impl WorkingDirectory {
    /// The deposit root (empty local path)
    pub fn root() -> Self {
        Self::new("")
    }

    pub fn new(local_path: impl Into<String>) -> Self {
        let local_path = local_path.into();
        let name = last_segment(&local_path).to_string();
        Self {
            local_path,
            name,
            modified: None,
            directories: Vec::new(),
            files: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Find a descendant directory by its path relative to this directory's root.
    ///
    /// The empty path returns `self`.
    pub fn find_directory(&self, path: &str) -> Option<&WorkingDirectory> {
        if path.is_empty() {
            return Some(self);
        }
        let mut current = self;
        for segment in path.split('/') {
            current = current.directories.iter().find(|d| segment_of(d) == segment)?;
        }
        Some(current)
    }

    pub fn find_file(&self, path: &str) -> Option<&WorkingFile> {
        let parent = self.find_directory(parent_path(path))?;
        let name = last_segment(path);
        parent.files.iter().find(|f| last_segment(&f.local_path) == name)
    }

    /// Get or create the directory at `path` (relative to this directory).
    pub fn directory_entry(&mut self, path: &str) -> &mut WorkingDirectory {
        let mut current = self;
        if path.is_empty() {
            return current;
        }
        for segment in path.split('/') {
            let idx = match current
                .directories
                .iter()
                .position(|d| segment_of(d) == segment)
            {
                Some(idx) => idx,
                None => {
                    let child = WorkingDirectory::new(join_path(&current.local_path, segment));
                    current.directories.push(child);
                    current.directories.len() - 1
                }
            };
            current = &mut current.directories[idx];
        }
        current
    }

    /// Insert (or replace) a file, creating intermediate directories.
    ///
    /// Only valid on the root, since `local_path` is deposit-relative.
    pub fn insert_file(&mut self, file: WorkingFile) {
        let parent = self.directory_entry(parent_path(&file.local_path));
        match parent
            .files
            .iter_mut()
            .find(|f| f.local_path == file.local_path)
        {
            Some(existing) => *existing = file,
            None => parent.files.push(file),
        }
    }

    pub fn remove_file(&mut self, path: &str) -> Option<WorkingFile> {
        let parent = self.find_directory_mut(parent_path(path))?;
        let idx = parent.files.iter().position(|f| f.local_path == path)?;
        Some(parent.files.remove(idx))
    }

    fn find_directory_mut(&mut self, path: &str) -> Option<&mut WorkingDirectory> {
        let mut current = self;
        if path.is_empty() {
            return Some(current);
        }
        for segment in path.split('/') {
            current = current
                .directories
                .iter_mut()
                .find(|d| segment_of(d) == segment)?;
        }
        Some(current)
    }

    /// Every descendant file, depth first: a directory's own files precede its
    /// subdirectories'.
    pub fn files_recursive(&self) -> Vec<&WorkingFile> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a WorkingFile>) {
        out.extend(self.files.iter());
        for dir in &self.directories {
            dir.collect_files(out);
        }
    }

    /// Every descendant directory (excluding `self`), parents before children.
    pub fn directories_recursive(&self) -> Vec<&WorkingDirectory> {
        let mut out = Vec::new();
        self.collect_directories(&mut out);
        out
    }

    fn collect_directories<'a>(&'a self, out: &mut Vec<&'a WorkingDirectory>) {
        for dir in &self.directories {
            out.push(dir);
            dir.collect_directories(out);
        }
    }

    /// Sort children by path segment, recursively.
    pub fn sort(&mut self) {
        self.files
            .sort_by(|a, b| last_segment(&a.local_path).cmp(last_segment(&b.local_path)));
        self.directories.sort_by(|a, b| segment_of(a).cmp(segment_of(b)));
        for dir in &mut self.directories {
            dir.sort();
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len() + self.directories.iter().map(|d| d.file_count()).sum::<usize>()
    }
}

impl MetadataLookup for WorkingDirectory {
    fn records(&self) -> &[Metadata] {
        &self.metadata
    }
}

/// Path segment of a directory. `name` may be a display label (METS), so lookups
/// go through the path.
fn segment_of(dir: &WorkingDirectory) -> &str {
    last_segment(&dir.local_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FileFormatMetadata;

    fn sample_tree() -> WorkingDirectory {
        let mut root = WorkingDirectory::root();
        root.insert_file(WorkingFile::new("mets.xml"));
        root.insert_file(WorkingFile::new("objects/b.tif").with_digest("bb"));
        root.insert_file(WorkingFile::new("objects/a.tif").with_digest("aa"));
        root.insert_file(WorkingFile::new("objects/sub/c.jpg").with_digest("cc"));
        root.sort();
        root
    }

    #[test]
    fn test_insert_creates_intermediate_directories() {
        let root = sample_tree();
        let sub = root.find_directory("objects/sub").unwrap();
        assert_eq!(sub.local_path, "objects/sub");
        assert_eq!(sub.name, "sub");
        assert_eq!(sub.files.len(), 1);
        assert_eq!(root.file_count(), 4);
    }

    #[test]
    fn test_find_file() {
        let root = sample_tree();
        assert_eq!(root.find_file("objects/a.tif").unwrap().digest.as_deref(), Some("aa"));
        assert!(root.find_file("objects/zz.tif").is_none());
        assert!(root.find_file("nowhere/a.tif").is_none());
        assert!(root.find_file("mets.xml").is_some());
    }

    #[test]
    fn test_find_uses_path_not_display_name() {
        let mut root = WorkingDirectory::root();
        root.directory_entry("objects").name = "Digitised pages".to_string();
        root.insert_file(WorkingFile::new("objects/a.tif").with_name("Page one"));
        assert!(root.find_directory("objects").is_some());
        assert!(root.find_file("objects/a.tif").is_some());
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut root = sample_tree();
        root.insert_file(WorkingFile::new("objects/a.tif").with_digest("a2"));
        assert_eq!(root.file_count(), 4);
        assert_eq!(root.find_file("objects/a.tif").unwrap().digest.as_deref(), Some("a2"));
    }

    #[test]
    fn test_recursive_order_is_depth_first() {
        let root = sample_tree();
        let paths: Vec<&str> = root
            .files_recursive()
            .iter()
            .map(|f| f.local_path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec!["mets.xml", "objects/a.tif", "objects/b.tif", "objects/sub/c.jpg"]
        );
        let dirs: Vec<&str> = root
            .directories_recursive()
            .iter()
            .map(|d| d.local_path.as_str())
            .collect();
        assert_eq!(dirs, vec!["objects", "objects/sub"]);
    }

    #[test]
    fn test_remove_file() {
        let mut root = sample_tree();
        let removed = root.remove_file("objects/sub/c.jpg").unwrap();
        assert_eq!(removed.local_path, "objects/sub/c.jpg");
        assert!(root.find_file("objects/sub/c.jpg").is_none());
        assert!(root.remove_file("objects/sub/c.jpg").is_none());
    }

    #[test]
    fn test_effective_digest_falls_back_to_format_metadata() {
        let file = WorkingFile::new("objects/a.tif").with_metadata(Metadata::FileFormat(
            FileFormatMetadata {
                source: "siegfried".to_string(),
                timestamp: None,
                content_type: Some("image/tiff".to_string()),
                format_name: None,
                pronom_key: None,
                digest: Some("abc".to_string()),
                size: None,
            },
        ));
        assert_eq!(file.effective_digest(), Some("abc"));

        let file = file.with_digest("def");
        assert_eq!(file.effective_digest(), Some("def"));
    }

    #[test]
    fn test_content_type_hints_include_format_records() {
        let file = WorkingFile::new("objects/a.jpg")
            .with_content_type("application/octet-stream")
            .with_metadata(Metadata::FileFormat(FileFormatMetadata {
                source: "siegfried".to_string(),
                timestamp: None,
                content_type: Some("image/jpeg".to_string()),
                format_name: None,
                pronom_key: None,
                digest: None,
                size: None,
            }));
        assert_eq!(file.content_type_hints(), vec!["application/octet-stream", "image/jpeg"]);
        assert_eq!(file.resolved_content_type().as_deref(), Some("image/jpeg"));
    }
}
