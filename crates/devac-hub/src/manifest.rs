//! Manifest generation (§4.9): walk a repo, find its packages by
//! conventional markers, hash each package's seed directory, and extract
//! declared external dependencies.

use std::path::{Path, PathBuf};

use devac_core::{content_hash, ExternalDependency, ManifestPackage, RepoManifest};

const PACKAGE_MARKERS: &[(&str, &str)] =
    &[("Cargo.toml", "rust"), ("package.json", "javascript"), ("go.mod", "go"), ("pyproject.toml", "python")];

pub struct ManifestGenerator;

impl ManifestGenerator {
    /// Finds every package under `repo_root` that has both a conventional
    /// marker file and a `.devac/seed` directory, and produces the repo's
    /// manifest. `known_repo_ids` annotates external dependencies whose name
    /// textually matches an already-registered repo.
    pub fn generate(repo_root: &Path, repo_id: &str, known_repo_ids: &[String]) -> anyhow::Result<RepoManifest> {
        let mut packages = Vec::new();
        let mut external_dependencies = Vec::new();

        for package_dir in discover_packages(repo_root) {
            let seed_dir = package_dir.join(".devac").join("seed");
            if !seed_dir.exists() {
                continue;
            }

            let language = PACKAGE_MARKERS
                .iter()
                .find(|(marker, _)| package_dir.join(marker).exists())
                .map(|(_, lang)| lang.to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let name = package_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| package_dir.to_string_lossy().into_owned());

            packages.push(ManifestPackage {
                name,
                seed_path: seed_dir.clone(),
                language,
                hash: hash_seed_dir(&seed_dir)?,
            });

            external_dependencies.extend(declared_dependencies(&package_dir, known_repo_ids));
        }

        Ok(RepoManifest {
            repo_id: repo_id.to_string(),
            packages,
            external_dependencies,
            generated_at: chrono::Utc::now(),
        })
    }
}

fn discover_packages(repo_root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![repo_root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if dir.file_name().is_some_and(|n| n == ".git" || n == "node_modules" || n == "target" || n == ".devac") {
            continue;
        }
        if PACKAGE_MARKERS.iter().any(|(marker, _)| dir.join(marker).exists()) {
            out.push(dir.clone());
        }
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.filter_map(Result::ok) {
            if entry.path().is_dir() {
                stack.push(entry.path());
            }
        }
    }
    out
}

/// Hash every table file's bytes, sorted by file name for determinism, so
/// the manifest hash changes whenever the package's seed set changes.
fn hash_seed_dir(seed_dir: &Path) -> anyhow::Result<String> {
    let mut entries = Vec::new();
    collect_files(seed_dir, &mut entries)?;
    entries.sort();

    let mut combined = Vec::new();
    for path in &entries {
        combined.extend_from_slice(path.to_string_lossy().as_bytes());
        combined.extend_from_slice(&std::fs::read(path)?);
    }
    Ok(content_hash(&combined))
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn declared_dependencies(package_dir: &Path, known_repo_ids: &[String]) -> Vec<ExternalDependency> {
    if let Ok(text) = std::fs::read_to_string(package_dir.join("Cargo.toml")) {
        return parse_cargo_toml_deps(&text, known_repo_ids);
    }
    if let Ok(text) = std::fs::read_to_string(package_dir.join("package.json")) {
        return parse_package_json_deps(&text, known_repo_ids);
    }
    Vec::new()
}

fn parse_cargo_toml_deps(text: &str, known_repo_ids: &[String]) -> Vec<ExternalDependency> {
    let Ok(doc) = toml::from_str::<toml::Table>(text) else { return Vec::new() };
    let Some(deps) = doc.get("dependencies").and_then(|v| v.as_table()) else { return Vec::new() };

    deps.iter()
        .map(|(name, value)| {
            let version = match value {
                toml::Value::String(v) => v.clone(),
                toml::Value::Table(t) => t.get("version").and_then(|v| v.as_str()).unwrap_or("*").to_string(),
                _ => "*".to_string(),
            };
            ExternalDependency { repo_id: match_repo_id(name, known_repo_ids), package: name.clone(), version }
        })
        .collect()
}

fn parse_package_json_deps(text: &str, known_repo_ids: &[String]) -> Vec<ExternalDependency> {
    let Ok(doc) = serde_json::from_str::<serde_json::Value>(text) else { return Vec::new() };
    let Some(deps) = doc.get("dependencies").and_then(|v| v.as_object()) else { return Vec::new() };

    deps.iter()
        .map(|(name, value)| {
            let version = value.as_str().unwrap_or("*").to_string();
            ExternalDependency { repo_id: match_repo_id(name, known_repo_ids), package: name.clone(), version }
        })
        .collect()
}

/// A dependency name is associated with a registered repo when either
/// textually contains the other, case-insensitively.
fn match_repo_id(dependency_name: &str, known_repo_ids: &[String]) -> Option<String> {
    let lower = dependency_name.to_lowercase();
    known_repo_ids
        .iter()
        .find(|repo_id| {
            let repo_lower = repo_id.to_lowercase();
            lower.contains(&repo_lower) || repo_lower.contains(&lower)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generates_manifest_with_one_package_and_matched_dependency() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("svc");
        std::fs::create_dir_all(pkg.join(".devac/seed/base")).unwrap();
        std::fs::write(pkg.join("Cargo.toml"), "[dependencies]\nusers-service = \"1.0\"\n").unwrap();
        std::fs::write(pkg.join(".devac/seed/base/nodes.parquet"), b"data").unwrap();

        let manifest =
            ManifestGenerator::generate(dir.path(), "r1", &["users-service".to_string()]).unwrap();

        assert_eq!(manifest.packages.len(), 1);
        assert_eq!(manifest.packages[0].language, "rust");
        assert_eq!(manifest.external_dependencies.len(), 1);
        assert_eq!(manifest.external_dependencies[0].repo_id.as_deref(), Some("users-service"));
    }

    #[test]
    fn package_without_seed_directory_is_skipped() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("svc");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("Cargo.toml"), "[dependencies]\n").unwrap();

        let manifest = ManifestGenerator::generate(dir.path(), "r1", &[]).unwrap();
        assert!(manifest.packages.is_empty());
    }
}
