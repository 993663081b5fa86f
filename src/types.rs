//! Core types shared across the deposit, archive and import modules.
//!
//! Paths inside a deposit are `/`-separated and relative to the deposit root
//! (`objects/images/page-1.tif`). They never start or end with `/`.

/// Hex-encoded content digest (SHA-256 unless the repository says otherwise)
pub type Digest = String;

/// Resource identity in the repository (an absolute URI)
pub type Uri = String;

/// Join a relative parent path and a child name.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent of a relative path; the root's children have parent `""`.
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Final segment of a relative path.
pub fn last_segment(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Whether `path` is `root` or lies beneath it.
pub fn is_under(path: &str, root: &str) -> bool {
    if root.is_empty() {
        return true;
    }
    path == root || (path.starts_with(root) && path.as_bytes().get(root.len()) == Some(&b'/'))
}

/// Strip leading and trailing separators; collapse empty segments.
pub fn trim_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Resource URI for a deposit-relative path inside an archival group.
pub fn uri_for(archival_group: &str, local_path: &str) -> Uri {
    let base = archival_group.trim_end_matches('/');
    if local_path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, local_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_helpers() {
        assert_eq!(join_path("", "objects"), "objects");
        assert_eq!(join_path("objects", "a.tif"), "objects/a.tif");
        assert_eq!(parent_path("objects/a/b.tif"), "objects/a");
        assert_eq!(parent_path("mets.xml"), "");
        assert_eq!(last_segment("objects/a/b.tif"), "b.tif");
        assert_eq!(last_segment("objects"), "objects");
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("objects/a.tif", "objects"));
        assert!(is_under("objects", "objects"));
        assert!(!is_under("objectsx/a.tif", "objects"));
        assert!(!is_under("metadata/a.csv", "objects"));
        assert!(is_under("anything", ""));
    }

    #[test]
    fn test_trim_and_uri() {
        assert_eq!(trim_path("/objects//a.tif/"), "objects/a.tif");
        assert_eq!(uri_for("https://repo/ag/", "objects/a.tif"), "https://repo/ag/objects/a.tif");
        assert_eq!(uri_for("https://repo/ag", ""), "https://repo/ag");
    }
}
