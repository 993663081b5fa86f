//! Combined (reconciliation) tree
//!
//! Merges the deposit's Working Tree with the physical structure decoded from METS,
//! keyed by deposit-relative path. Every node borrows from the two input trees and
//! records which of them contain it. Building is pure: no I/O, so validation can
//! rebuild the tree as often as it likes.

pub mod mismatch;
pub mod tags;

use crate::content_type::resolve_content_type;
use crate::deposit::DepositLayout;
use crate::mets::MetsFileWrapper;
use crate::types::{join_path, last_segment, parent_path};
use crate::working::{WorkingDirectory, WorkingFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub use mismatch::{Mismatch, MismatchReport};

/// Which sources contain a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Whereabouts {
    Both,
    Deposit,
    Mets,
    Neither,
    /// In the deposit but outside the area reconciled against METS
    Extra,
}

/// Where a path sits in the deposit layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Root,
    Content,
    Metadata,
    MetsFile,
    Outside,
}

impl Scope {
    fn of(path: &str, layout: &DepositLayout, is_file: bool) -> Scope {
        if path.is_empty() {
            Scope::Root
        } else if layout.is_content(path) {
            Scope::Content
        } else if layout.is_metadata(path) {
            Scope::Metadata
        } else if is_file && layout.is_mets_file(path) {
            Scope::MetsFile
        } else {
            Scope::Outside
        }
    }
}

fn whereabouts_of(in_deposit: bool, in_mets: bool, scope: Scope) -> Whereabouts {
    match (in_deposit, in_mets) {
        (true, true) => Whereabouts::Both,
        (true, false) if scope == Scope::Outside => Whereabouts::Extra,
        (true, false) => Whereabouts::Deposit,
        (false, true) => Whereabouts::Mets,
        (false, false) => Whereabouts::Neither,
    }
}

/// A file seen through both sources
#[derive(Debug)]
pub struct CombinedFile<'a> {
    local_path: String,
    scope: Scope,
    deposit: Option<&'a WorkingFile>,
    mets: Option<&'a WorkingFile>,
    mismatches: OnceLock<Vec<Mismatch>>,
}

impl<'a> CombinedFile<'a> {
    fn new(
        local_path: String,
        scope: Scope,
        deposit: Option<&'a WorkingFile>,
        mets: Option<&'a WorkingFile>,
    ) -> Self {
        Self {
            local_path,
            scope,
            deposit,
            mets,
            mismatches: OnceLock::new(),
        }
    }

    pub fn local_path(&self) -> &str {
        &self.local_path
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn deposit_file(&self) -> Option<&'a WorkingFile> {
        self.deposit
    }

    pub fn mets_file(&self) -> Option<&'a WorkingFile> {
        self.mets
    }

    pub fn whereabouts(&self) -> Whereabouts {
        whereabouts_of(self.deposit.is_some(), self.mets.is_some(), self.scope)
    }

    /// Display name: the METS label when there is one.
    pub fn name(&self) -> &str {
        self.mets
            .map(|f| f.name.as_str())
            .or_else(|| self.deposit.map(|f| f.name.as_str()))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| last_segment(&self.local_path))
    }

    pub fn deposit_digest(&self) -> Option<&'a str> {
        self.deposit.and_then(|f| f.effective_digest())
    }

    pub fn mets_digest(&self) -> Option<&'a str> {
        self.mets.and_then(|f| f.effective_digest())
    }

    /// Digest, METS first.
    pub fn digest(&self) -> Option<&'a str> {
        self.mets_digest().or_else(|| self.deposit_digest())
    }

    /// Resolved content type over both sources' hints together.
    pub fn content_type(&self) -> Option<String> {
        let mut hints = Vec::new();
        if let Some(f) = self.deposit {
            hints.extend(f.content_type_hints());
        }
        if let Some(f) = self.mets {
            hints.extend(f.content_type_hints());
        }
        resolve_content_type(hints)
    }

    /// Size, METS first.
    pub fn size(&self) -> Option<u64> {
        self.mets
            .and_then(|f| f.size)
            .or_else(|| self.deposit.and_then(|f| f.size))
    }

    /// Same node without the deposit side. The original node is untouched.
    pub fn delete_file_in_deposit(&self) -> CombinedFile<'a> {
        CombinedFile::new(self.local_path.clone(), self.scope, None, self.mets)
    }

    /// Same node without the METS side. The original node is untouched.
    pub fn delete_file_in_mets(&self) -> CombinedFile<'a> {
        CombinedFile::new(self.local_path.clone(), self.scope, self.deposit, None)
    }

    /// Field-level disagreements between deposit and METS, computed once.
    ///
    /// Empty unless the file is in both sources and in a compared area.
    pub fn mismatches(&self) -> &[Mismatch] {
        self.mismatches.get_or_init(|| match (self.deposit, self.mets) {
            (Some(deposit), Some(mets))
                if !matches!(self.scope, Scope::Metadata | Scope::MetsFile) =>
            {
                mismatch::detect(deposit, mets)
            }
            _ => Vec::new(),
        })
    }
}

/// A directory seen through both sources
#[derive(Debug)]
pub struct CombinedDirectory<'a> {
    local_path: String,
    scope: Scope,
    deposit: Option<&'a WorkingDirectory>,
    mets: Option<&'a WorkingDirectory>,
    directories: Vec<CombinedDirectory<'a>>,
    files: Vec<CombinedFile<'a>>,
}

struct Pair<'a, T> {
    deposit: Option<&'a T>,
    mets: Option<&'a T>,
}

impl<'a, T> Default for Pair<'a, T> {
    fn default() -> Self {
        Self {
            deposit: None,
            mets: None,
        }
    }
}

impl<'a> CombinedDirectory<'a> {
    /// Merge a deposit tree and an optional parsed METS document.
    pub fn build(
        deposit_root: &'a WorkingDirectory,
        mets: Option<&'a MetsFileWrapper>,
        layout: &DepositLayout,
    ) -> CombinedDirectory<'a> {
        let mets_root = mets.and_then(|m| m.physical_structure.as_ref());
        let self_file = mets.and_then(|m| m.self_file.as_ref());
        Self::merge(String::new(), Some(deposit_root), mets_root, self_file, layout)
    }

    fn merge(
        local_path: String,
        deposit: Option<&'a WorkingDirectory>,
        mets: Option<&'a WorkingDirectory>,
        self_file: Option<&'a WorkingFile>,
        layout: &DepositLayout,
    ) -> CombinedDirectory<'a> {
        let mut dirs: BTreeMap<&'a str, Pair<'a, WorkingDirectory>> = BTreeMap::new();
        let mut files: BTreeMap<&'a str, Pair<'a, WorkingFile>> = BTreeMap::new();

        if let Some(dir) = deposit {
            for child in &dir.directories {
                dirs.entry(last_segment(&child.local_path)).or_default().deposit = Some(child);
            }
            for file in &dir.files {
                files.entry(last_segment(&file.local_path)).or_default().deposit = Some(file);
            }
        }
        if let Some(dir) = mets {
            for child in &dir.directories {
                dirs.entry(last_segment(&child.local_path)).or_default().mets = Some(child);
            }
            for file in &dir.files {
                files.entry(last_segment(&file.local_path)).or_default().mets = Some(file);
            }
        }
        if let Some(file) = self_file {
            if parent_path(&file.local_path) == local_path {
                let entry = files.entry(last_segment(&file.local_path)).or_default();
                if entry.mets.is_none() {
                    entry.mets = Some(file);
                }
            }
        }

        let directories = dirs
            .into_iter()
            .map(|(segment, pair)| {
                Self::merge(
                    join_path(&local_path, segment),
                    pair.deposit,
                    pair.mets,
                    self_file,
                    layout,
                )
            })
            .collect();
        let files = files
            .into_iter()
            .map(|(segment, pair)| {
                let path = join_path(&local_path, segment);
                let scope = Scope::of(&path, layout, true);
                CombinedFile::new(path, scope, pair.deposit, pair.mets)
            })
            .collect();

        CombinedDirectory {
            scope: Scope::of(&local_path, layout, false),
            local_path,
            deposit,
            mets,
            directories,
            files,
        }
    }

    pub fn local_path(&self) -> &str {
        &self.local_path
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn deposit_directory(&self) -> Option<&'a WorkingDirectory> {
        self.deposit
    }

    pub fn mets_directory(&self) -> Option<&'a WorkingDirectory> {
        self.mets
    }

    pub fn whereabouts(&self) -> Whereabouts {
        whereabouts_of(self.deposit.is_some(), self.mets.is_some(), self.scope)
    }

    /// Display name: the METS label when there is one.
    pub fn name(&self) -> &str {
        self.mets
            .map(|d| d.name.as_str())
            .or_else(|| self.deposit.map(|d| d.name.as_str()))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| last_segment(&self.local_path))
    }

    pub fn directories(&self) -> &[CombinedDirectory<'a>] {
        &self.directories
    }

    pub fn files(&self) -> &[CombinedFile<'a>] {
        &self.files
    }

    /// Find a descendant directory by deposit-relative path.
    pub fn find_directory(&self, path: &str) -> Option<&CombinedDirectory<'a>> {
        if path == self.local_path {
            return Some(self);
        }
        self.directories
            .iter()
            .find(|d| crate::types::is_under(path, &d.local_path))
            .and_then(|d| d.find_directory(path))
    }

    pub fn find_file(&self, path: &str) -> Option<&CombinedFile<'a>> {
        self.find_directory(parent_path(path))?
            .files
            .iter()
            .find(|f| f.local_path == path)
    }

    /// Every descendant file, a directory's own files before its subdirectories'.
    pub fn files_recursive(&self) -> Vec<&CombinedFile<'a>> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'s>(&'s self, out: &mut Vec<&'s CombinedFile<'a>>) {
        out.extend(self.files.iter());
        for dir in &self.directories {
            dir.collect_files(out);
        }
    }

    /// Every descendant directory, parents before children.
    pub fn directories_recursive(&self) -> Vec<&CombinedDirectory<'a>> {
        let mut out = Vec::new();
        self.collect_directories(&mut out);
        out
    }

    fn collect_directories<'s>(&'s self, out: &mut Vec<&'s CombinedDirectory<'a>>) {
        for dir in &self.directories {
            out.push(dir);
            dir.collect_directories(out);
        }
    }

    /// Mismatches for every file that has any, in tree order.
    pub fn mismatch_reports(&self) -> Vec<MismatchReport> {
        self.files_recursive()
            .into_iter()
            .filter(|f| !f.mismatches().is_empty())
            .map(|f| MismatchReport {
                path: f.local_path().to_string(),
                mismatches: f.mismatches().to_vec(),
            })
            .collect()
    }

    /// Paths grouped by whereabouts, for audit displays.
    pub fn whereabouts_summary(&self) -> BTreeMap<String, Whereabouts> {
        let mut out = BTreeMap::new();
        for dir in self.directories_recursive() {
            out.insert(dir.local_path.clone(), dir.whereabouts());
        }
        for file in self.files_recursive() {
            out.insert(file.local_path.clone(), file.whereabouts());
        }
        out
    }
}
