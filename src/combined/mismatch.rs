//! Field-level disagreement between a deposit file and its METS description.
//!
//! Detection never fails. Missing data on one side is itself reported (for virus
//! scans and tags); format identification is only compared when both sides have it.

use super::tags::compare_tags;
use crate::content_type::display_content_type;
use crate::metadata::{MetadataKind, MetadataLookup, VirusScanMetadata};
use crate::working::WorkingFile;
use serde::{Deserialize, Serialize};

pub const FIELD_FORMAT_NAME: &str = "FormatName";
pub const FIELD_PRONOM_KEY: &str = "PronomKey";
pub const FIELD_CONTENT_TYPE: &str = "ContentType";
pub const FIELD_DIGEST: &str = "Digest";
pub const FIELD_HAS_VIRUS: &str = "HasVirus";
pub const FIELD_VIRUS_FOUND: &str = "VirusFound";
pub const FIELD_VIRUS_DEFINITION: &str = "VirusDefinition";
/// Field name used when a whole metadata section is present on one side only
pub const FIELD_SECTION: &str = "(section)";

/// One disagreement: `(metadata type, field, value in deposit, value in METS)`.
///
/// A `None` value means the field (or section) does not exist on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mismatch {
    pub metadata_type: MetadataKind,
    pub field: String,
    pub value_in_deposit: Option<String>,
    pub value_in_mets: Option<String>,
}

impl Mismatch {
    pub fn new(
        metadata_type: MetadataKind,
        field: impl Into<String>,
        value_in_deposit: Option<String>,
        value_in_mets: Option<String>,
    ) -> Self {
        Self {
            metadata_type,
            field: field.into(),
            value_in_deposit,
            value_in_mets,
        }
    }

    /// Short human-readable description
    pub fn describe(&self) -> String {
        match (&self.value_in_deposit, &self.value_in_mets) {
            (Some(_), None) if self.field == FIELD_SECTION => {
                format!("{} missing in METS", self.metadata_type)
            }
            (None, Some(_)) if self.field == FIELD_SECTION => {
                format!("{} missing in deposit", self.metadata_type)
            }
            (Some(_), None) => format!("{} does not exist in METS", self.field),
            (None, Some(_)) => format!("{} does not exist in deposit", self.field),
            (Some(d), Some(m)) => format!("{}: deposit '{}' vs METS '{}'", self.field, d, m),
            (None, None) => format!("{} differs", self.field),
        }
    }
}

/// Mismatches for one file, for reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MismatchReport {
    pub path: String,
    pub mismatches: Vec<Mismatch>,
}

/// Compare everything both sources say about one file.
pub fn detect(deposit: &WorkingFile, mets: &WorkingFile) -> Vec<Mismatch> {
    let mut out = Vec::new();
    compare_format(deposit, mets, &mut out);
    compare_virus_scan(
        deposit.virus_scan_metadata(),
        mets.virus_scan_metadata(),
        &mut out,
    );
    let empty = Vec::new();
    match (deposit.technical_tag_metadata(), mets.technical_tag_metadata()) {
        (None, None) => {}
        (d, m) => out.extend(compare_tags(
            d.map(|t| &t.tags).unwrap_or(&empty),
            m.map(|t| &t.tags).unwrap_or(&empty),
        )),
    }
    out
}

fn push_if_different(
    out: &mut Vec<Mismatch>,
    kind: MetadataKind,
    field: &str,
    deposit: Option<&str>,
    mets: Option<&str>,
) {
    if deposit != mets {
        out.push(Mismatch::new(
            kind,
            field,
            deposit.map(str::to_string),
            mets.map(str::to_string),
        ));
    }
}

fn compare_format(deposit: &WorkingFile, mets: &WorkingFile, out: &mut Vec<Mismatch>) {
    let (Some(d), Some(m)) = (deposit.file_format_metadata(), mets.file_format_metadata()) else {
        return;
    };
    let kind = MetadataKind::FileFormat;
    push_if_different(out, kind, FIELD_FORMAT_NAME, d.format_name.as_deref(), m.format_name.as_deref());
    push_if_different(out, kind, FIELD_PRONOM_KEY, d.pronom_key.as_deref(), m.pronom_key.as_deref());

    let deposit_type = deposit.resolved_content_type();
    let mets_type = mets.resolved_content_type();
    push_if_different(
        out,
        kind,
        FIELD_CONTENT_TYPE,
        Some(display_content_type(deposit_type.as_deref())),
        Some(display_content_type(mets_type.as_deref())),
    );

    push_if_different(
        out,
        kind,
        FIELD_DIGEST,
        deposit.effective_digest(),
        mets.effective_digest(),
    );
}

fn compare_virus_scan(
    deposit: Option<&VirusScanMetadata>,
    mets: Option<&VirusScanMetadata>,
    out: &mut Vec<Mismatch>,
) {
    let kind = MetadataKind::VirusScan;
    let (d, m) = match (deposit, mets) {
        (None, None) => return,
        (Some(d), None) => {
            out.push(Mismatch::new(kind, FIELD_SECTION, Some(d.source.clone()), None));
            return;
        }
        (None, Some(m)) => {
            out.push(Mismatch::new(kind, FIELD_SECTION, None, Some(m.source.clone())));
            return;
        }
        (Some(d), Some(m)) => (d, m),
    };

    if d.has_virus != m.has_virus {
        out.push(Mismatch::new(
            kind,
            FIELD_HAS_VIRUS,
            Some(d.has_virus.to_string()),
            Some(m.has_virus.to_string()),
        ));
    }
    push_if_different(out, kind, FIELD_VIRUS_FOUND, d.virus_found.as_deref(), m.virus_found.as_deref());
    push_if_different(
        out,
        kind,
        FIELD_VIRUS_DEFINITION,
        d.virus_definition.as_deref().map(str::trim),
        m.virus_definition.as_deref().map(str::trim),
    );
}
