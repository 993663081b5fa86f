//! Tool-derived file metadata
//!
//! Files in a deposit (and the files described by METS) carry metadata produced by
//! external tools: format identification, virus scanning and embedded technical tags.
//! Records are attached to a file, not inherited; a file "has" a kind of metadata when
//! one of its records is of that variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format identification result (e.g. from a PRONOM-based identifier)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFormatMetadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_name: Option<String>,
    /// Identifier-scheme key, e.g. `fmt/353`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronom_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Virus scanner verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirusScanMetadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub has_virus: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virus_found: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virus_definition: Option<String>,
}

/// One embedded technical tag (EXIF-like name/value pair)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalTag {
    pub tag_name: String,
    pub tag_value: String,
}

impl TechnicalTag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag_name: name.into(),
            tag_value: value.into(),
        }
    }
}

/// Ordered list of technical tags. Order carries no meaning; names may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalTagMetadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<TechnicalTag>,
}

/// Kind of metadata, used when reporting disagreements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetadataKind {
    FileFormat,
    VirusScan,
    TechnicalTags,
}

impl MetadataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKind::FileFormat => "FileFormatMetadata",
            MetadataKind::VirusScan => "VirusScanMetadata",
            MetadataKind::TechnicalTags => "TechnicalTagMetadata",
        }
    }
}

impl std::fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metadata record attached to a file or directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Metadata {
    FileFormat(FileFormatMetadata),
    VirusScan(VirusScanMetadata),
    TechnicalTags(TechnicalTagMetadata),
}

impl Metadata {
    pub fn kind(&self) -> MetadataKind {
        match self {
            Metadata::FileFormat(_) => MetadataKind::FileFormat,
            Metadata::VirusScan(_) => MetadataKind::VirusScan,
            Metadata::TechnicalTags(_) => MetadataKind::TechnicalTags,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Metadata::FileFormat(m) => &m.source,
            Metadata::VirusScan(m) => &m.source,
            Metadata::TechnicalTags(m) => &m.source,
        }
    }
}

/// Typed lookup over a list of metadata records.
///
/// Implemented for slices so both working files and directories share it.
pub trait MetadataLookup {
    fn records(&self) -> &[Metadata];

    fn file_format_metadata(&self) -> Option<&FileFormatMetadata> {
        self.records().iter().find_map(|m| match m {
            Metadata::FileFormat(f) => Some(f),
            _ => None,
        })
    }

    fn file_format_metadata_all(&self) -> Vec<&FileFormatMetadata> {
        self.records()
            .iter()
            .filter_map(|m| match m {
                Metadata::FileFormat(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    fn virus_scan_metadata(&self) -> Option<&VirusScanMetadata> {
        self.records().iter().find_map(|m| match m {
            Metadata::VirusScan(v) => Some(v),
            _ => None,
        })
    }

    fn technical_tag_metadata(&self) -> Option<&TechnicalTagMetadata> {
        self.records().iter().find_map(|m| match m {
            Metadata::TechnicalTags(t) => Some(t),
            _ => None,
        })
    }

    fn has_metadata(&self, kind: MetadataKind) -> bool {
        self.records().iter().any(|m| m.kind() == kind)
    }
}

impl MetadataLookup for [Metadata] {
    fn records(&self) -> &[Metadata] {
        self
    }
}

impl MetadataLookup for Vec<Metadata> {
    fn records(&self) -> &[Metadata] {
        self.as_slice()
    }
}
