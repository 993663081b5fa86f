//! Content-type resolution
//!
//! A file can carry several content-type hints: the type recorded when it was
//! deposited and one per format-identification record. This module reduces them
//! to a single value, or to "undetermined" when no rule is confident.
//!
//! Each disambiguation rule is a separate, disjoint case. New cases are added as new
//! rules; there is no general "most specific wins" ordering.

use std::collections::BTreeSet;

/// Display value for an unresolved content type
pub const UNDETERMINED: &str = "undetermined";

/// Types that say nothing about the content
pub const GENERIC_CONTENT_TYPES: [&str; 3] = [
    "application/octet-stream",
    "binary/octet-stream",
    "application/x-www-form-urlencoded",
];

/// Resolve a set of content-type hints to a single value.
///
/// Returns `None` ("undetermined") when the candidates disagree and no rule applies,
/// or when there are no candidates at all.
pub fn resolve_content_type<'a, I>(hints: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidates: BTreeSet<&str> = hints
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if candidates.len() == 1 {
        return candidates.into_iter().next().map(str::to_string);
    }
    if candidates.is_empty() {
        return None;
    }

    // A generic type only survives when nothing more specific is present.
    if candidates.iter().any(|c| !is_generic(c)) {
        candidates.retain(|c| !is_generic(c));
    }
    if candidates.len() == 1 {
        return candidates.into_iter().next().map(str::to_string);
    }

    disambiguate(&candidates)
}

fn is_generic(content_type: &str) -> bool {
    GENERIC_CONTENT_TYPES.contains(&content_type)
}

fn top_level(content_type: &str) -> &str {
    content_type
        .split_once('/')
        .map(|(top, _)| top)
        .unwrap_or(content_type)
}

fn disambiguate(candidates: &BTreeSet<&str>) -> Option<String> {
    let (application, others): (Vec<&str>, Vec<&str>) = candidates
        .iter()
        .copied()
        .partition(|c| top_level(c) == "application");

    // One application type against one media type: the media type wins.
    if application.len() == 1 && others.len() == 1 {
        let other = others[0];
        match top_level(other) {
            "image" | "video" | "audio" => return Some(other.to_string()),
            "text" => {
                if other == "text/rtf" {
                    return Some("text/rtf".to_string());
                }
                if other == "text/xml" {
                    return Some("application/xml".to_string());
                }
            }
            _ => {}
        }
    }

    if others.is_empty()
        && application.len() == 2
        && application.contains(&"application/rtf")
        && application.contains(&"application/msword")
    {
        return Some("application/rtf".to_string());
    }

    None
}

/// Display helper: the resolved value or [`UNDETERMINED`].
pub fn display_content_type(resolved: Option<&str>) -> &str {
    resolved.unwrap_or(UNDETERMINED)
}
