//! Shared fixtures: in-memory deposits and archival groups.

use archivist::deposit::DepositLayout;
use archivist::import::{DiffEngine, ImportJob, ImportTarget};
use archivist::combined::CombinedDirectory;
use archivist::error::ImportError;
use archivist::mets::MetsFileWrapper;
use archivist::preserved::{ArchivalGroup, Binary, Container, ObjectVersion};
use archivist::working::{WorkingDirectory, WorkingFile};
use std::fs;
use std::path::Path;

pub const AG: &str = "https://repo/ag";

pub fn engine() -> DiffEngine {
    DiffEngine::new(DepositLayout::default(), 254)
}

pub fn target() -> ImportTarget {
    ImportTarget::new(AG).with_deposit("d1", "/deposits/d1")
}

/// Deposit tree with a METS file and the given `(path, digest)` content files.
pub fn deposit_tree(files: &[(&str, &str)]) -> WorkingDirectory {
    let mut root = WorkingDirectory::root();
    root.insert_file(WorkingFile::new("mets.xml").with_digest("m0"));
    for (path, digest) in files {
        root.insert_file(WorkingFile::new(*path).with_digest(*digest));
    }
    root.sort();
    root
}

pub fn diff(
    deposit: &WorkingDirectory,
    mets: Option<&MetsFileWrapper>,
    existing: Option<&ArchivalGroup>,
) -> Result<ImportJob, ImportError> {
    let layout = DepositLayout::default();
    let combined = CombinedDirectory::build(deposit, mets, &layout);
    engine().diff(&target(), &combined, existing)
}

/// Archival group holding `mets.xml` plus `(path, digest, name)` binaries.
pub fn archival_group(binaries: &[(&str, &str, &str)]) -> ArchivalGroup {
    let mut root = Container::new(AG, "ag");
    insert_binary(&mut root, "mets.xml", "m0", "mets.xml");
    for (path, digest, name) in binaries {
        insert_binary(&mut root, path, digest, name);
    }
    ArchivalGroup {
        root,
        version: Some(ObjectVersion {
            name: "v1".to_string(),
            date: None,
        }),
    }
}

/// Add a binary at `path`, creating intermediate containers.
pub fn insert_binary(root: &mut Container, path: &str, digest: &str, name: &str) {
    let segments: Vec<&str> = path.split('/').collect();
    let (file, dirs) = segments.split_last().expect("non-empty path");
    let mut current = root;
    for dir in dirs {
        let id = format!("{}/{}", current.id, dir);
        let index = match current.containers.iter().position(|c| c.id == id) {
            Some(index) => index,
            None => {
                current.containers.push(Container::new(id, *dir));
                current.containers.len() - 1
            }
        };
        current = &mut current.containers[index];
    }
    current.binaries.push(Binary {
        id: format!("{}/{}", current.id, file),
        name: name.to_string(),
        content_type: None,
        size: None,
        digest: Some(digest.to_string()),
        origin: None,
    });
}

pub fn ids<T, F: Fn(&T) -> &str>(items: &[T], id: F) -> Vec<String> {
    items.iter().map(|i| id(i).to_string()).collect()
}

/// Write a file inside a deposit directory, creating parents.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
