//! Workspace discovery (§6).
//!
//! REDESIGN from the teacher: `canopy-core::workspace::detect_workspace`
//! asked "does this exact directory look like a Cargo/npm/Go project";
//! here the question is the opposite direction and a different predicate —
//! "walk ancestors looking for the nearest one that has a VCS repository as
//! a direct child" — per §6's workspace discovery rule. Kept in its own
//! module because the marker-scan idea is still the same shape, just aimed
//! at `.git` directories instead of manifest files.

use std::path::{Path, PathBuf};

/// Starting from `start`, find the nearest ancestor directory that has at
/// least one VCS repository as a direct child. If `start` itself is a VCS
/// repository, the workspace is its parent, provided the parent also
/// satisfies the rule.
pub fn discover_workspace(start: &Path) -> Option<PathBuf> {
    let start = std::fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());

    if is_vcs_repo(&start) {
        let parent = start.parent()?;
        if has_vcs_child(parent) {
            return Some(parent.to_path_buf());
        }
    }

    let mut current = start.as_path();
    loop {
        if has_vcs_child(current) {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

fn is_vcs_repo(dir: &Path) -> bool {
    dir.join(".git").exists()
}

fn has_vcs_child(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(Result::ok)
        .any(|entry| entry.path().is_dir() && is_vcs_repo(&entry.path()))
}

/// The hub directory for a discovered workspace, per GLOSSARY: `<workspace>/.devac/`.
pub fn hub_dir(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".devac")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_ancestor_with_vcs_child() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = tmp.path().join("workspace");
        let repo = workspace.join("repo-a");
        fs::create_dir_all(repo.join(".git")).unwrap();
        let nested = repo.join("src");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_workspace(&nested), Some(workspace));
    }

    #[test]
    fn starting_inside_repo_uses_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = tmp.path().join("workspace");
        let repo = workspace.join("repo-a");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert_eq!(discover_workspace(&repo), Some(workspace));
    }

    #[test]
    fn no_vcs_anywhere_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let lonely = tmp.path().join("lonely");
        fs::create_dir_all(&lonely).unwrap();
        assert_eq!(discover_workspace(&lonely), None);
    }
}
