//! Technical-tag list comparison
//!
//! Tag lists are unordered and names repeat (one `ToolVersionNumber` per tool run).
//! Plain set difference over-reports, and grouping by name cannot pair distinct
//! same-named values when the counts differ. Instead, tags unique to one side are
//! paired by name with unconsumed tags on the other side, first match wins. Each
//! physical tag is consumed at most once, so nothing is reported twice.

use super::mismatch::Mismatch;
use crate::metadata::{MetadataKind, TechnicalTag};
use std::collections::HashSet;

fn key(tag: &TechnicalTag) -> (String, String) {
    (tag.tag_name.to_lowercase(), tag.tag_value.to_lowercase())
}

fn same_name(a: &TechnicalTag, b: &TechnicalTag) -> bool {
    a.tag_name.to_lowercase() == b.tag_name.to_lowercase()
}

fn same_value(a: &TechnicalTag, b: &TechnicalTag) -> bool {
    a.tag_value.to_lowercase() == b.tag_value.to_lowercase()
}

fn mismatch(name: &str, deposit: Option<&str>, mets: Option<&str>) -> Mismatch {
    Mismatch::new(
        MetadataKind::TechnicalTags,
        name,
        deposit.map(str::to_string),
        mets.map(str::to_string),
    )
}

/// Compare the deposit's tags with the METS tags.
pub fn compare_tags(deposit: &[TechnicalTag], mets: &[TechnicalTag]) -> Vec<Mismatch> {
    let deposit_keys: HashSet<(String, String)> = deposit.iter().map(key).collect();
    let mets_keys: HashSet<(String, String)> = mets.iter().map(key).collect();
    if deposit_keys == mets_keys {
        return Vec::new();
    }

    // One-sided differences, original order preserved
    let deposit_only: Vec<usize> = (0..deposit.len())
        .filter(|&i| !mets_keys.contains(&key(&deposit[i])))
        .collect();
    let mets_only: Vec<usize> = (0..mets.len())
        .filter(|&i| !deposit_keys.contains(&key(&mets[i])))
        .collect();

    let deposit_names: HashSet<String> = deposit.iter().map(|t| t.tag_name.to_lowercase()).collect();
    let mets_names: HashSet<String> = mets.iter().map(|t| t.tag_name.to_lowercase()).collect();

    let mut deposit_used = vec![false; deposit.len()];
    let mut mets_used = vec![false; mets.len()];
    let mut out = Vec::new();

    for &d in &deposit_only {
        let tag = &deposit[d];
        if !mets_names.contains(&tag.tag_name.to_lowercase()) {
            // Reported once per name below
            continue;
        }
        deposit_used[d] = true;
        let partner = mets_only
            .iter()
            .copied()
            .find(|&m| !mets_used[m] && same_name(&mets[m], tag))
            .or_else(|| (0..mets.len()).find(|&m| !mets_used[m] && same_name(&mets[m], tag)));
        match partner {
            Some(m) => {
                mets_used[m] = true;
                if !same_value(&mets[m], tag) {
                    out.push(mismatch(&tag.tag_name, Some(&tag.tag_value), Some(&mets[m].tag_value)));
                }
            }
            None => out.push(mismatch(&tag.tag_name, Some(&tag.tag_value), None)),
        }
    }

    // METS-only tags nothing on the deposit side has claimed yet
    for &m in &mets_only {
        if mets_used[m] {
            continue;
        }
        let tag = &mets[m];
        if !deposit_names.contains(&tag.tag_name.to_lowercase()) {
            continue;
        }
        mets_used[m] = true;
        let partner = (0..deposit.len()).find(|&d| !deposit_used[d] && same_name(&deposit[d], tag));
        match partner {
            Some(d) => {
                deposit_used[d] = true;
                if !same_value(&deposit[d], tag) {
                    out.push(mismatch(&tag.tag_name, Some(&deposit[d].tag_value), Some(&tag.tag_value)));
                }
            }
            None => out.push(mismatch(&tag.tag_name, None, Some(&tag.tag_value))),
        }
    }

    // Names present on one side only, once per name
    let mut reported = HashSet::new();
    for tag in deposit {
        let name = tag.tag_name.to_lowercase();
        if !mets_names.contains(&name) && reported.insert(name) {
            out.push(mismatch(&tag.tag_name, Some(&tag.tag_value), None));
        }
    }
    let mut reported = HashSet::new();
    for tag in mets {
        let name = tag.tag_name.to_lowercase();
        if !deposit_names.contains(&name) && reported.insert(name) {
            out.push(mismatch(&tag.tag_name, None, Some(&tag.tag_value)));
        }
    }

    out
}
