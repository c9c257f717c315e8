//! The central hub (§4.8): one `duckdb` database per workspace tying
//! together every registered repo's manifest, cross-repo edges and unified
//! diagnostics, plus a federated SQL surface over every repo's package seed
//! tables.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use duckdb::Connection;
use fs2::FileExt;
use serde_json::Value as JsonValue;

use devac_core::{
    hub_dir, resolve_repo_id, CrossRepoEdge, DevacError, DiagnosticCategory,
    DiagnosticSeverity, DiagnosticSource, EdgeKind, EntityId, RepoManifest, RepoRegistration,
    RepoStatus, UnifiedDiagnostic,
};
use devac_seed::cache::QueryCache;
use devac_seed::{QueryResult, SeedLayout, Table, DEFAULT_BRANCH};

use crate::m2m::{find_m2m_connections, M2mOptions, M2mResult};
use crate::manifest::ManifestGenerator;
use crate::registry;

const WORKSPACE_MARKER_FILE: &str = "workspace_root.txt";
const DB_FILE: &str = "central.duckdb";
const LOCK_FILE: &str = "central.duckdb.lock";

pub struct AffectedRepo {
    pub repo_id: String,
    pub impact_level: &'static str,
}

pub struct AffectedReposResult {
    pub changed_entities: usize,
    pub affected_repos: Vec<AffectedRepo>,
    pub total_affected: usize,
    pub analysis_time_ms: u64,
}

pub struct CentralHub {
    conn: Connection,
    hub_dir: PathBuf,
    read_only: bool,
    cache: QueryCache,
    _lock_file: Option<File>,
}

impl CentralHub {
    /// Opens the hub at `workspace_root`, requesting write access when
    /// `write` is true. If another process already holds the write lock the
    /// open falls back to read-only transparently rather than erroring, per
    /// the hub's concurrency contract; callers check [`Self::is_read_only`].
    pub fn open(workspace_root: &Path, write: bool) -> Result<Self, DevacError> {
        let dir = hub_dir(workspace_root);
        std::fs::create_dir_all(&dir).map_err(|e| DevacError::Hub(e.to_string()))?;

        validate_workspace_root(&dir, workspace_root)?;

        let lock_path = dir.join(LOCK_FILE);
        let (lock_file, read_only) = if write {
            match acquire_exclusive(&lock_path) {
                Ok(file) => (Some(file), false),
                Err(_) => (None, true),
            }
        } else {
            (None, true)
        };

        let db_path = dir.join(DB_FILE);
        let conn = if read_only {
            if !db_path.exists() {
                return Err(DevacError::Hub("no hub has been initialized for this workspace yet".into()));
            }
            let config = duckdb::Config::default()
                .access_mode(duckdb::AccessMode::ReadOnly)
                .map_err(|e| DevacError::Storage(e.to_string()))?;
            Connection::open_with_flags(&db_path, config).map_err(|e| DevacError::Storage(e.to_string()))?
        } else {
            let conn = Connection::open(&db_path).map_err(|e| DevacError::Storage(e.to_string()))?;
            registry::ensure_schema(&conn)?;
            conn
        };

        Ok(Self { conn, hub_dir: dir, read_only, cache: QueryCache::new(64), _lock_file: lock_file })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn require_writable(&self) -> Result<(), DevacError> {
        if self.read_only {
            return Err(DevacError::Hub("hub is open read-only; write operations are forbidden".into()));
        }
        Ok(())
    }

    pub fn register_repo(&self, path: &Path) -> Result<(String, RepoManifest, Vec<CrossRepoEdge>), DevacError> {
        self.require_writable()?;

        let repo_id = resolve_repo_id(path);
        let known = self.known_repo_ids()?;
        let manifest = ManifestGenerator::generate(path, &repo_id, &known)
            .map_err(|e| DevacError::Hub(e.to_string()))?;
        if manifest.packages.is_empty() {
            return Err(DevacError::Hub(format!("no analyzed package found under {}", path.display())));
        }

        let manifest_json = serde_json::to_string(&manifest).map_err(|e| DevacError::Hub(e.to_string()))?;
        let row = RepoRegistration {
            repo_id: repo_id.clone(),
            local_path: path.to_path_buf(),
            manifest_hash: manifest.digest().map_err(|e| DevacError::Hub(e.to_string()))?,
            last_synced: chrono::Utc::now(),
            status: RepoStatus::Active,
        };
        registry::upsert_repo(&self.conn, &row, &manifest_json)?;

        let edges = cross_repo_edges_from_manifest(&manifest);
        registry::replace_cross_repo_edges(&self.conn, &repo_id, &edges)?;

        self.cache.clear();
        Ok((repo_id, manifest, edges))
    }

    pub fn unregister_repo(&self, repo_id: &str) -> Result<(), DevacError> {
        self.require_writable()?;
        registry::delete_repo(&self.conn, repo_id)?;
        self.cache.clear();
        Ok(())
    }

    /// Re-walks a registered repo's manifest in place. If the repo's local
    /// path no longer exists it's marked `Missing` instead of erroring.
    pub fn refresh_repo(&self, repo_id: &str) -> Result<(), DevacError> {
        self.require_writable()?;
        let Some(row) = registry::get_repo(&self.conn, repo_id)? else {
            return Err(DevacError::Hub(format!("repo not registered: {repo_id}")));
        };
        if !row.local_path.exists() {
            registry::update_status(&self.conn, repo_id, RepoStatus::Missing)?;
            return Ok(());
        }
        self.register_repo(&row.local_path).map(|_| ())
    }

    pub fn refresh_all(&self) -> Result<(), DevacError> {
        self.require_writable()?;
        for row in registry::list_repos(&self.conn)? {
            self.refresh_repo(&row.repo_id)?;
        }
        Ok(())
    }

    pub fn list_repos(&self) -> Result<Vec<RepoRegistration>, DevacError> {
        registry::list_repos(&self.conn)
    }

    fn known_repo_ids(&self) -> Result<Vec<String>, DevacError> {
        Ok(registry::list_repos(&self.conn)?.into_iter().map(|r| r.repo_id).collect())
    }

    fn manifests(&self) -> Result<Vec<(String, RepoManifest)>, DevacError> {
        let mut out = Vec::new();
        for row in registry::list_repos(&self.conn)? {
            if row.status == RepoStatus::Missing {
                continue;
            }
            if let Some(json) = registry::get_repo_manifest_json(&self.conn, &row.repo_id)? {
                let manifest: RepoManifest =
                    serde_json::from_str(&json).map_err(|e| DevacError::Hub(e.to_string()))?;
                out.push((row.repo_id, manifest));
            }
        }
        Ok(out)
    }

    /// Runs `sql` against a union-by-name view of every registered repo's
    /// packages for `nodes`/`edges`/`external_refs`/`effects`. Results are
    /// cached by SQL text unless the hub is read-only, mirroring the
    /// per-package query engine's cache contract.
    pub fn query(&self, sql: &str) -> Result<QueryResult, DevacError> {
        if !self.read_only {
            if let Some(cached) = self.cache.get(sql) {
                return Ok(cached);
            }
        }

        let started = std::time::Instant::now();
        let conn = Connection::open_in_memory().map_err(|e| DevacError::Storage(e.to_string()))?;
        for table in Table::all() {
            register_union_view(&conn, &self.manifests()?, table)?;
        }

        let mut stmt = conn.prepare(sql).map_err(|e| DevacError::Storage(format!("query syntax error: {e}")))?;
        let column_names: Vec<String> = stmt.column_names().into_iter().map(|s| s.to_string()).collect();
        let mut rows_out = Vec::new();
        let mut rows = stmt.query([]).map_err(|e| DevacError::Storage(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| DevacError::Storage(e.to_string()))? {
            let mut map = serde_json::Map::new();
            for (i, name) in column_names.iter().enumerate() {
                let value: duckdb::types::Value = row.get(i).map_err(|e| DevacError::Storage(e.to_string()))?;
                map.insert(name.clone(), duckdb_value_to_json(value));
            }
            rows_out.push(map);
        }

        let result = QueryResult {
            row_count: rows_out.len(),
            rows: rows_out,
            time_ms: started.elapsed().as_millis() as u64,
        };
        if !self.read_only {
            self.cache.put(sql, &result);
        }
        Ok(result)
    }

    pub fn push_diagnostics(&self, diagnostics: &[UnifiedDiagnostic]) -> Result<(), DevacError> {
        self.require_writable()?;
        registry::insert_diagnostics(&self.conn, diagnostics)
    }

    pub fn clear_diagnostics(&self, repo_id: Option<&str>, source: Option<DiagnosticSource>) -> Result<(), DevacError> {
        self.require_writable()?;
        let sql = match (repo_id, source) {
            (Some(_), Some(_)) => "DELETE FROM diagnostics WHERE repo_id = ? AND source = ?",
            (Some(_), None) => "DELETE FROM diagnostics WHERE repo_id = ?",
            (None, Some(_)) => "DELETE FROM diagnostics WHERE source = ?",
            (None, None) => "DELETE FROM diagnostics",
        };
        match (repo_id, source) {
            (Some(r), Some(s)) => self
                .conn
                .execute(sql, duckdb::params![r, registry::diagnostic_source_str(s)])
                .map(|_| ())
                .map_err(|e| DevacError::Storage(e.to_string())),
            (Some(r), None) => self
                .conn
                .execute(sql, duckdb::params![r])
                .map(|_| ())
                .map_err(|e| DevacError::Storage(e.to_string())),
            (None, Some(s)) => self
                .conn
                .execute(sql, duckdb::params![registry::diagnostic_source_str(s)])
                .map(|_| ())
                .map_err(|e| DevacError::Storage(e.to_string())),
            (None, None) => self.conn.execute(sql, []).map(|_| ()).map_err(|e| DevacError::Storage(e.to_string())),
        }
    }

    pub fn get_diagnostics(&self, repo_id: Option<&str>) -> Result<Vec<UnifiedDiagnostic>, DevacError> {
        let sql = match repo_id {
            Some(_) => "SELECT diagnostic_id, repo_id, source, file_path, line, col, severity, category, title,
                description, code, suggestion, resolved, actionable, created_at, updated_at,
                github_issue_number, github_pr_number, workflow_name, ci_url
                FROM diagnostics WHERE repo_id = ? ORDER BY created_at DESC",
            None => "SELECT diagnostic_id, repo_id, source, file_path, line, col, severity, category, title,
                description, code, suggestion, resolved, actionable, created_at, updated_at,
                github_issue_number, github_pr_number, workflow_name, ci_url
                FROM diagnostics ORDER BY created_at DESC",
        };
        let mut stmt = self.conn.prepare(sql).map_err(|e| DevacError::Storage(e.to_string()))?;
        let mut rows = match repo_id {
            Some(r) => stmt.query(duckdb::params![r]).map_err(|e| DevacError::Storage(e.to_string()))?,
            None => stmt.query([]).map_err(|e| DevacError::Storage(e.to_string()))?,
        };
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| DevacError::Storage(e.to_string()))? {
            out.push(diagnostic_from_row(row)?);
        }
        Ok(out)
    }

    pub fn get_diagnostics_summary(&self, group_by_repo: bool) -> Result<BTreeMap<String, usize>, DevacError> {
        let diagnostics = self.get_diagnostics(None)?;
        let mut counts = BTreeMap::new();
        for d in diagnostics {
            let key = if group_by_repo { d.repo_id } else { registry::diagnostic_severity_str(d.severity).to_string() };
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }

    pub fn get_diagnostics_counts(&self) -> Result<BTreeMap<String, usize>, DevacError> {
        let diagnostics = self.get_diagnostics(None)?;
        let mut counts = BTreeMap::new();
        for d in diagnostics {
            *counts.entry(registry::diagnostic_category_str(d.category).to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    pub fn resolve_diagnostics(&self, ids: &[String]) -> Result<(), DevacError> {
        self.require_writable()?;
        for id in ids {
            self.conn
                .execute(
                    "UPDATE diagnostics SET resolved = TRUE, updated_at = ? WHERE diagnostic_id = ?",
                    duckdb::params![chrono::Utc::now().to_rfc3339(), id],
                )
                .map_err(|e| DevacError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    pub fn find_m2m_connections(&self, options: &M2mOptions) -> Result<M2mResult, DevacError> {
        find_m2m_connections(&self.manifests()?, options)
    }

    /// Repos owning the source end of any cross-repo edge that targets one
    /// of `changed_entity_ids`. No transitive closure: only direct edges.
    pub fn get_affected_repos(&self, changed_entity_ids: &[String]) -> Result<AffectedReposResult, DevacError> {
        let started = std::time::Instant::now();
        let edges = registry::edges_targeting(&self.conn, changed_entity_ids)?;
        let mut repos: Vec<String> = edges.iter().map(|e| e.source_repo.clone()).collect();
        repos.sort();
        repos.dedup();

        Ok(AffectedReposResult {
            changed_entities: changed_entity_ids.len(),
            total_affected: repos.len(),
            affected_repos: repos.into_iter().map(|repo_id| AffectedRepo { repo_id, impact_level: "direct" }).collect(),
            analysis_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    pub fn hub_dir(&self) -> &Path {
        &self.hub_dir
    }
}

fn validate_workspace_root(hub_dir: &Path, workspace_root: &Path) -> Result<(), DevacError> {
    let marker = hub_dir.join(WORKSPACE_MARKER_FILE);
    let canonical = workspace_root.canonicalize().unwrap_or_else(|_| workspace_root.to_path_buf());
    let canonical = canonical.to_string_lossy().into_owned();

    match std::fs::read_to_string(&marker) {
        Ok(existing) if existing.trim() != canonical => Err(DevacError::Hub(format!(
            "hub at {} belongs to workspace {}, not {}",
            hub_dir.display(),
            existing.trim(),
            canonical
        ))),
        Ok(_) => Ok(()),
        Err(_) => std::fs::write(&marker, &canonical).map_err(|e| DevacError::Hub(e.to_string())),
    }
}

fn acquire_exclusive(lock_path: &Path) -> std::io::Result<File> {
    let file = OpenOptions::new().create(true).write(true).open(lock_path)?;
    file.try_lock_exclusive()?;
    Ok(file)
}

/// External dependencies are package-level, so a cross-repo edge's source
/// entity is a synthetic per-package identifier rather than a specific
/// symbol — there is no finer-grained source in a manifest alone.
fn cross_repo_edges_from_manifest(manifest: &RepoManifest) -> Vec<CrossRepoEdge> {
    let mut edges = Vec::new();
    for package in &manifest.packages {
        for dep in &manifest.external_dependencies {
            let Some(target_repo) = dep.repo_id.clone() else { continue };
            edges.push(CrossRepoEdge {
                source_repo: manifest.repo_id.clone(),
                source_entity_id: EntityId(format!("pkg:{}:{}", manifest.repo_id, package.name)),
                target_repo,
                target_entity_id: EntityId(format!("pkg:{}", dep.package)),
                edge_type: EdgeKind::Imports,
                metadata: BTreeMap::new(),
            });
        }
    }
    edges
}

fn register_union_view(conn: &Connection, manifests: &[(String, RepoManifest)], table: Table) -> Result<(), DevacError> {
    let view = table.view_name();
    let mut selects = Vec::new();
    for (repo_id, manifest) in manifests {
        for package in &manifest.packages {
            let package_root = package.seed_path.parent().and_then(|p| p.parent()).unwrap_or(&package.seed_path);
            let layout = SeedLayout::new(package_root, DEFAULT_BRANCH);
            let path = layout.table_path(table);
            if path.exists() {
                selects.push(format!(
                    "SELECT '{}' AS repo_id, '{}' AS package_name, * FROM read_parquet('{}')",
                    repo_id.replace('\'', "''"),
                    package.name.replace('\'', "''"),
                    path.to_string_lossy().replace('\'', "''")
                ));
            }
        }
    }

    let ddl = if selects.is_empty() {
        format!(
            "CREATE VIEW {view} AS SELECT CAST(NULL AS VARCHAR) AS repo_id, CAST(NULL AS VARCHAR) AS package_name, {} WHERE 1 = 0",
            empty_columns(table)
        )
    } else {
        format!("CREATE VIEW {view} AS {}", selects.join(" UNION ALL BY NAME "))
    };
    conn.execute_batch(&ddl).map_err(|e| DevacError::Storage(e.to_string()))
}

fn empty_columns(table: Table) -> String {
    let cols: &[(&str, &str)] = match table {
        Table::Nodes => &[("entity_id", "VARCHAR"), ("name", "VARCHAR"), ("kind", "VARCHAR"), ("file_path", "VARCHAR")],
        Table::Edges => &[("source_entity_id", "VARCHAR"), ("target_entity_id", "VARCHAR"), ("edge_type", "VARCHAR")],
        Table::ExternalRefs => &[("source_entity_id", "VARCHAR"), ("module_specifier", "VARCHAR")],
        Table::Effects => &[("effect_type", "VARCHAR"), ("source_entity_id", "VARCHAR")],
    };
    cols.iter().map(|(name, ty)| format!("CAST(NULL AS {ty}) AS {name}")).collect::<Vec<_>>().join(", ")
}

fn duckdb_value_to_json(value: duckdb::types::Value) -> JsonValue {
    use duckdb::types::Value;
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(b),
        Value::TinyInt(i) => JsonValue::from(i),
        Value::SmallInt(i) => JsonValue::from(i),
        Value::Int(i) => JsonValue::from(i),
        Value::BigInt(i) => JsonValue::from(i),
        Value::UTinyInt(i) => JsonValue::from(i),
        Value::USmallInt(i) => JsonValue::from(i),
        Value::UInt(i) => JsonValue::from(i),
        Value::UBigInt(i) => JsonValue::from(i),
        Value::Float(f) => serde_json::Number::from_f64(f as f64).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        Value::Double(f) => serde_json::Number::from_f64(f).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        Value::Text(s) => JsonValue::String(s),
        other => JsonValue::String(format!("{other:?}")),
    }
}

fn diagnostic_from_row(row: &duckdb::Row<'_>) -> Result<UnifiedDiagnostic, DevacError> {
    let get = |i: usize| -> Result<String, DevacError> { row.get(i).map_err(|e| DevacError::Storage(e.to_string())) };
    let file_path: Option<String> = row.get(3).map_err(|e| DevacError::Storage(e.to_string()))?;
    let created_at: String = get(14)?;
    let updated_at: String = get(15)?;

    Ok(UnifiedDiagnostic {
        diagnostic_id: get(0)?,
        repo_id: get(1)?,
        source: diagnostic_source_from_str(&get(2)?),
        file_path: file_path.map(PathBuf::from),
        line: row.get(4).map_err(|e| DevacError::Storage(e.to_string()))?,
        col: row.get(5).map_err(|e| DevacError::Storage(e.to_string()))?,
        severity: diagnostic_severity_from_str(&get(6)?),
        category: diagnostic_category_from_str(&get(7)?),
        title: get(8)?,
        description: get(9)?,
        code: row.get(10).map_err(|e| DevacError::Storage(e.to_string()))?,
        suggestion: row.get(11).map_err(|e| DevacError::Storage(e.to_string()))?,
        resolved: row.get(12).map_err(|e| DevacError::Storage(e.to_string()))?,
        actionable: row.get(13).map_err(|e| DevacError::Storage(e.to_string()))?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        github_issue_number: row.get(16).map_err(|e| DevacError::Storage(e.to_string()))?,
        github_pr_number: row.get(17).map_err(|e| DevacError::Storage(e.to_string()))?,
        workflow_name: row.get(18).map_err(|e| DevacError::Storage(e.to_string()))?,
        ci_url: row.get(19).map_err(|e| DevacError::Storage(e.to_string()))?,
    })
}

fn diagnostic_source_from_str(s: &str) -> DiagnosticSource {
    match s {
        "eslint" => DiagnosticSource::Eslint,
        "biome" => DiagnosticSource::Biome,
        "test" => DiagnosticSource::Test,
        "coverage" => DiagnosticSource::Coverage,
        "axe" => DiagnosticSource::Axe,
        "ci-check" => DiagnosticSource::CiCheck,
        "github-issue" => DiagnosticSource::GithubIssue,
        "github-review" => DiagnosticSource::GithubReview,
        _ => DiagnosticSource::Tsc,
    }
}

fn diagnostic_severity_from_str(s: &str) -> DiagnosticSeverity {
    match s {
        "note" => DiagnosticSeverity::Note,
        "suggestion" => DiagnosticSeverity::Suggestion,
        "warning" => DiagnosticSeverity::Warning,
        "critical" => DiagnosticSeverity::Critical,
        _ => DiagnosticSeverity::Error,
    }
}

fn diagnostic_category_from_str(s: &str) -> DiagnosticCategory {
    match s {
        "linting" => DiagnosticCategory::Linting,
        "testing" => DiagnosticCategory::Testing,
        "accessibility" => DiagnosticCategory::Accessibility,
        "ci-check" => DiagnosticCategory::CiCheck,
        "task" => DiagnosticCategory::Task,
        _ => DiagnosticCategory::Compilation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_package(repo_root: &Path, name: &str, cargo_deps: &str) -> PathBuf {
        let pkg = repo_root.join(name);
        std::fs::create_dir_all(pkg.join(".devac/seed/base")).unwrap();
        std::fs::write(pkg.join("Cargo.toml"), format!("[dependencies]\n{cargo_deps}")).unwrap();
        std::fs::write(pkg.join(".devac/seed/base/nodes.parquet"), b"data").unwrap();
        pkg
    }

    #[test]
    fn opens_writable_and_registers_a_repo() {
        let workspace = tempdir().unwrap();
        make_package(workspace.path(), "svc", "");

        let hub = CentralHub::open(workspace.path(), true).unwrap();
        assert!(!hub.is_read_only());

        let (repo_id, manifest, _) = hub.register_repo(workspace.path()).unwrap();
        assert_eq!(manifest.packages.len(), 1);
        assert_eq!(hub.list_repos().unwrap().len(), 1);
        assert!(!repo_id.is_empty());
    }

    #[test]
    fn second_writer_falls_back_to_read_only_and_rejects_writes() {
        let workspace = tempdir().unwrap();
        make_package(workspace.path(), "svc", "");

        let first = CentralHub::open(workspace.path(), true).unwrap();
        let second = CentralHub::open(workspace.path(), true).unwrap();

        assert!(!first.is_read_only());
        assert!(second.is_read_only());
        assert!(second.register_repo(workspace.path()).is_err());
    }

    #[test]
    fn diagnostics_round_trip_and_resolve() {
        let workspace = tempdir().unwrap();
        make_package(workspace.path(), "svc", "");
        let hub = CentralHub::open(workspace.path(), true).unwrap();
        hub.register_repo(workspace.path()).unwrap();

        let diag = UnifiedDiagnostic {
            diagnostic_id: "d1".into(),
            repo_id: "r1".into(),
            source: DiagnosticSource::Tsc,
            file_path: Some(PathBuf::from("src/a.ts")),
            line: Some(1),
            col: Some(2),
            severity: DiagnosticSeverity::Error,
            category: DiagnosticCategory::Compilation,
            title: "type error".into(),
            description: "mismatch".into(),
            code: None,
            suggestion: None,
            resolved: false,
            actionable: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            github_issue_number: None,
            github_pr_number: None,
            workflow_name: None,
            ci_url: None,
        };
        hub.push_diagnostics(&[diag]).unwrap();
        assert_eq!(hub.get_diagnostics(None).unwrap().len(), 1);

        hub.resolve_diagnostics(&["d1".to_string()]).unwrap();
        assert!(hub.get_diagnostics(None).unwrap()[0].resolved);
    }
}
