//! Content hashing and repo-id resolution.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of raw bytes. Used for `source_file_hash` and for
/// rename-detection's "does the new file's content match the deleted one".
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Hex-encoded SHA-256 of a string. Used for the entity-id scope hash and for
/// caching query results by SQL text.
pub fn string_hash(s: &str) -> String {
    content_hash(s.as_bytes())
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").expect("writing to a String cannot fail");
    }
    out
}

/// Resolve a stable repo identifier for `package_path`.
///
/// Prefers the VCS remote (`remote.origin.url` from the nearest `.git`
/// config), falling back to the package directory's base name when no VCS
/// metadata is present. The caller is responsible for persisting whichever
/// value is chosen at first registration — `generate()` depends on it
/// remaining stable for the lifetime of a seed set.
pub fn resolve_repo_id(package_path: &Path) -> String {
    if let Some(remote) = remote_origin_url(package_path) {
        return normalize_remote_url(&remote);
    }
    package_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| package_path.to_string_lossy().into_owned())
}

fn remote_origin_url(start: &Path) -> Option<String> {
    let repo = git2::Repository::discover(start).ok()?;
    let remote = repo.find_remote("origin").ok()?;
    remote.url().map(|s| s.to_string())
}

/// Strip a VCS remote URL down to something filesystem-and-string-safe:
/// drop protocol/credentials, `.git` suffix, and any trailing slash.
fn normalize_remote_url(url: &str) -> String {
    let without_protocol = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    let without_creds = without_protocol
        .split_once('@')
        .map(|(_, rest)| rest)
        .unwrap_or(without_protocol);
    let without_trailing_slash = without_creds.trim_end_matches('/');
    without_trailing_slash
        .strip_suffix(".git")
        .unwrap_or(without_trailing_slash)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }

    #[test]
    fn string_hash_matches_content_hash() {
        assert_eq!(string_hash("hello"), content_hash(b"hello"));
    }

    #[test]
    fn normalize_strips_protocol_and_suffix() {
        assert_eq!(
            normalize_remote_url("https://github.com/acme/widgets.git"),
            "github.com/acme/widgets"
        );
        assert_eq!(
            normalize_remote_url("git@github.com:acme/widgets.git"),
            "github.com:acme/widgets"
        );
    }

    #[test]
    fn resolve_repo_id_falls_back_to_dirname() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = tmp.path().join("my-package");
        std::fs::create_dir_all(&pkg).unwrap();
        assert_eq!(resolve_repo_id(&pkg), "my-package");
    }
}
