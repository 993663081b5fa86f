//! Slug validation
//!
//! Every container and binary in an archival group is addressed by its final path
//! segment. Slugs are lowercase ASCII letters, digits, `.`, `_` and `-`.

use crate::error::{ImportError, SlugValidationError};
use crate::types::last_segment;

/// Default upper bound on slug length
pub const DEFAULT_MAX_SLUG_LENGTH: usize = 254;

pub fn validate_slug(slug: &str, max_length: usize) -> Result<(), SlugValidationError> {
    if slug.is_empty() {
        return Err(SlugValidationError::Required);
    }

    if slug.len() > max_length {
        return Err(SlugValidationError::TooLong { max_length });
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err(SlugValidationError::InvalidFormat);
    }

    // "." and ".." would address the parent rather than a child
    if slug.chars().all(|c| c == '.') {
        return Err(SlugValidationError::InvalidFormat);
    }

    Ok(())
}

/// Validate the final segment of a deposit path, reporting the path on failure.
pub fn check_path_slug(path: &str, max_length: usize) -> Result<(), ImportError> {
    let slug = last_segment(path);
    validate_slug(slug, max_length).map_err(|reason| ImportError::InvalidSlug {
        path: path.to_string(),
        slug: slug.to_string(),
        reason,
    })
}
