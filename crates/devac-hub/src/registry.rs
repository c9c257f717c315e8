//! The hub's native `duckdb` tables (§4.8): repo registry, cross-repo
//! edges, and unified diagnostics. Unlike package seed tables these are not
//! parquet files referenced by path — they live inside `central.duckdb`
//! itself, since the hub owns them directly rather than deferring to a
//! package's own seed writer.

use std::collections::BTreeMap;

use duckdb::Connection;
use serde_json::Value as JsonValue;

use devac_core::{CrossRepoEdge, DevacError, EdgeKind, EntityId, RepoRegistration, RepoStatus, UnifiedDiagnostic};

pub fn ensure_schema(conn: &Connection) -> Result<(), DevacError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS repos (
            repo_id VARCHAR PRIMARY KEY,
            local_path VARCHAR NOT NULL,
            manifest_hash VARCHAR NOT NULL,
            manifest_json VARCHAR NOT NULL,
            last_synced VARCHAR NOT NULL,
            status VARCHAR NOT NULL
        );
        CREATE TABLE IF NOT EXISTS cross_repo_edges (
            source_repo VARCHAR NOT NULL,
            source_entity_id VARCHAR NOT NULL,
            target_repo VARCHAR NOT NULL,
            target_entity_id VARCHAR NOT NULL,
            edge_type VARCHAR NOT NULL,
            metadata VARCHAR NOT NULL
        );
        CREATE TABLE IF NOT EXISTS diagnostics (
            diagnostic_id VARCHAR PRIMARY KEY,
            repo_id VARCHAR NOT NULL,
            source VARCHAR NOT NULL,
            file_path VARCHAR,
            line UINTEGER,
            col UINTEGER,
            severity VARCHAR NOT NULL,
            category VARCHAR NOT NULL,
            title VARCHAR NOT NULL,
            description VARCHAR NOT NULL,
            code VARCHAR,
            suggestion VARCHAR,
            resolved BOOLEAN NOT NULL,
            actionable BOOLEAN NOT NULL,
            created_at VARCHAR NOT NULL,
            updated_at VARCHAR NOT NULL,
            github_issue_number UBIGINT,
            github_pr_number UBIGINT,
            workflow_name VARCHAR,
            ci_url VARCHAR
        );",
    )
    .map_err(|e| DevacError::Storage(e.to_string()))
}

pub fn upsert_repo(conn: &Connection, row: &RepoRegistration, manifest_json: &str) -> Result<(), DevacError> {
    conn.execute(
        "INSERT INTO repos (repo_id, local_path, manifest_hash, manifest_json, last_synced, status)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (repo_id) DO UPDATE SET
            local_path = excluded.local_path,
            manifest_hash = excluded.manifest_hash,
            manifest_json = excluded.manifest_json,
            last_synced = excluded.last_synced,
            status = excluded.status",
        duckdb::params![
            row.repo_id,
            row.local_path.to_string_lossy().to_string(),
            row.manifest_hash,
            manifest_json,
            row.last_synced.to_rfc3339(),
            status_str(row.status),
        ],
    )
    .map_err(|e| DevacError::Storage(e.to_string()))?;
    Ok(())
}

pub fn update_status(conn: &Connection, repo_id: &str, status: RepoStatus) -> Result<(), DevacError> {
    conn.execute(
        "UPDATE repos SET status = ? WHERE repo_id = ?",
        duckdb::params![status_str(status), repo_id],
    )
    .map_err(|e| DevacError::Storage(e.to_string()))?;
    Ok(())
}

pub fn delete_repo(conn: &Connection, repo_id: &str) -> Result<(), DevacError> {
    conn.execute("DELETE FROM repos WHERE repo_id = ?", duckdb::params![repo_id])
        .map_err(|e| DevacError::Storage(e.to_string()))?;
    conn.execute("DELETE FROM cross_repo_edges WHERE source_repo = ?", duckdb::params![repo_id])
        .map_err(|e| DevacError::Storage(e.to_string()))?;
    Ok(())
}

pub fn get_repo(conn: &Connection, repo_id: &str) -> Result<Option<RepoRegistration>, DevacError> {
    let mut stmt = conn
        .prepare("SELECT repo_id, local_path, manifest_hash, last_synced, status FROM repos WHERE repo_id = ?")
        .map_err(|e| DevacError::Storage(e.to_string()))?;
    let mut rows = stmt.query(duckdb::params![repo_id]).map_err(|e| DevacError::Storage(e.to_string()))?;
    match rows.next().map_err(|e| DevacError::Storage(e.to_string()))? {
        Some(row) => Ok(Some(repo_registration_from_row(row)?)),
        None => Ok(None),
    }
}

pub fn get_repo_manifest_json(conn: &Connection, repo_id: &str) -> Result<Option<String>, DevacError> {
    let mut stmt = conn
        .prepare("SELECT manifest_json FROM repos WHERE repo_id = ?")
        .map_err(|e| DevacError::Storage(e.to_string()))?;
    let mut rows = stmt.query(duckdb::params![repo_id]).map_err(|e| DevacError::Storage(e.to_string()))?;
    match rows.next().map_err(|e| DevacError::Storage(e.to_string()))? {
        Some(row) => Ok(Some(row.get(0).map_err(|e| DevacError::Storage(e.to_string()))?)),
        None => Ok(None),
    }
}

pub fn list_repos(conn: &Connection) -> Result<Vec<RepoRegistration>, DevacError> {
    let mut stmt = conn
        .prepare("SELECT repo_id, local_path, manifest_hash, last_synced, status FROM repos ORDER BY repo_id")
        .map_err(|e| DevacError::Storage(e.to_string()))?;
    let mut rows = stmt.query([]).map_err(|e| DevacError::Storage(e.to_string()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| DevacError::Storage(e.to_string()))? {
        out.push(repo_registration_from_row(row)?);
    }
    Ok(out)
}

fn repo_registration_from_row(row: &duckdb::Row<'_>) -> Result<RepoRegistration, DevacError> {
    let repo_id: String = row.get(0).map_err(|e| DevacError::Storage(e.to_string()))?;
    let local_path: String = row.get(1).map_err(|e| DevacError::Storage(e.to_string()))?;
    let manifest_hash: String = row.get(2).map_err(|e| DevacError::Storage(e.to_string()))?;
    let last_synced: String = row.get(3).map_err(|e| DevacError::Storage(e.to_string()))?;
    let status: String = row.get(4).map_err(|e| DevacError::Storage(e.to_string()))?;
    Ok(RepoRegistration {
        repo_id,
        local_path: local_path.into(),
        manifest_hash,
        last_synced: chrono::DateTime::parse_from_rfc3339(&last_synced)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        status: status_from_str(&status),
    })
}

fn status_str(status: RepoStatus) -> &'static str {
    match status {
        RepoStatus::Active => "active",
        RepoStatus::Stale => "stale",
        RepoStatus::Missing => "missing",
    }
}

fn status_from_str(s: &str) -> RepoStatus {
    match s {
        "stale" => RepoStatus::Stale,
        "missing" => RepoStatus::Missing,
        _ => RepoStatus::Active,
    }
}

pub fn replace_cross_repo_edges(conn: &Connection, repo_id: &str, edges: &[CrossRepoEdge]) -> Result<(), DevacError> {
    conn.execute("DELETE FROM cross_repo_edges WHERE source_repo = ?", duckdb::params![repo_id])
        .map_err(|e| DevacError::Storage(e.to_string()))?;
    for edge in edges {
        let metadata = serde_json::to_string(&edge.metadata).unwrap_or_default();
        conn.execute(
            "INSERT INTO cross_repo_edges (source_repo, source_entity_id, target_repo, target_entity_id, edge_type, metadata)
             VALUES (?, ?, ?, ?, ?, ?)",
            duckdb::params![
                edge.source_repo,
                edge.source_entity_id.as_str(),
                edge.target_repo,
                edge.target_entity_id.as_str(),
                edge_type_str(edge.edge_type),
                metadata,
            ],
        )
        .map_err(|e| DevacError::Storage(e.to_string()))?;
    }
    Ok(())
}

pub fn edges_targeting(conn: &Connection, entity_ids: &[String]) -> Result<Vec<CrossRepoEdge>, DevacError> {
    if entity_ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = entity_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT source_repo, source_entity_id, target_repo, target_entity_id, edge_type, metadata
         FROM cross_repo_edges WHERE target_entity_id IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| DevacError::Storage(e.to_string()))?;
    let params: Vec<&dyn duckdb::ToSql> = entity_ids.iter().map(|s| s as &dyn duckdb::ToSql).collect();
    let mut rows = stmt.query(params.as_slice()).map_err(|e| DevacError::Storage(e.to_string()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| DevacError::Storage(e.to_string()))? {
        let source_repo: String = row.get(0).map_err(|e| DevacError::Storage(e.to_string()))?;
        let source_entity_id: String = row.get(1).map_err(|e| DevacError::Storage(e.to_string()))?;
        let target_repo: String = row.get(2).map_err(|e| DevacError::Storage(e.to_string()))?;
        let target_entity_id: String = row.get(3).map_err(|e| DevacError::Storage(e.to_string()))?;
        let edge_type: String = row.get(4).map_err(|e| DevacError::Storage(e.to_string()))?;
        let metadata: String = row.get(5).map_err(|e| DevacError::Storage(e.to_string()))?;
        out.push(CrossRepoEdge {
            source_repo,
            source_entity_id: EntityId(source_entity_id),
            target_repo,
            target_entity_id: EntityId(target_entity_id),
            edge_type: edge_type_from_str(&edge_type),
            metadata: serde_json::from_str::<BTreeMap<String, JsonValue>>(&metadata).unwrap_or_default(),
        });
    }
    Ok(out)
}

fn edge_type_str(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Contains => "CONTAINS",
        EdgeKind::Extends => "EXTENDS",
        EdgeKind::Implements => "IMPLEMENTS",
        EdgeKind::Calls => "CALLS",
        EdgeKind::Imports => "IMPORTS",
        EdgeKind::References => "REFERENCES",
        EdgeKind::Overrides => "OVERRIDES",
    }
}

fn edge_type_from_str(s: &str) -> EdgeKind {
    match s {
        "EXTENDS" => EdgeKind::Extends,
        "IMPLEMENTS" => EdgeKind::Implements,
        "CALLS" => EdgeKind::Calls,
        "REFERENCES" => EdgeKind::References,
        "OVERRIDES" => EdgeKind::Overrides,
        "CONTAINS" => EdgeKind::Contains,
        _ => EdgeKind::Imports,
    }
}

pub fn insert_diagnostics(conn: &Connection, diagnostics: &[UnifiedDiagnostic]) -> Result<(), DevacError> {
    for d in diagnostics {
        conn.execute(
            "INSERT INTO diagnostics (diagnostic_id, repo_id, source, file_path, line, col, severity, category,
                title, description, code, suggestion, resolved, actionable, created_at, updated_at,
                github_issue_number, github_pr_number, workflow_name, ci_url)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (diagnostic_id) DO UPDATE SET
                resolved = excluded.resolved, updated_at = excluded.updated_at",
            duckdb::params![
                d.diagnostic_id,
                d.repo_id,
                diagnostic_source_str(d.source),
                d.file_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                d.line,
                d.col,
                diagnostic_severity_str(d.severity),
                diagnostic_category_str(d.category),
                d.title,
                d.description,
                d.code,
                d.suggestion,
                d.resolved,
                d.actionable,
                d.created_at.to_rfc3339(),
                d.updated_at.to_rfc3339(),
                d.github_issue_number,
                d.github_pr_number,
                d.workflow_name,
                d.ci_url,
            ],
        )
        .map_err(|e| DevacError::Storage(e.to_string()))?;
    }
    Ok(())
}

pub fn diagnostic_source_str(source: devac_core::DiagnosticSource) -> &'static str {
    use devac_core::DiagnosticSource::*;
    match source {
        Tsc => "tsc",
        Eslint => "eslint",
        Biome => "biome",
        Test => "test",
        Coverage => "coverage",
        Axe => "axe",
        CiCheck => "ci-check",
        GithubIssue => "github-issue",
        GithubReview => "github-review",
    }
}

pub fn diagnostic_severity_str(severity: devac_core::DiagnosticSeverity) -> &'static str {
    use devac_core::DiagnosticSeverity::*;
    match severity {
        Note => "note",
        Suggestion => "suggestion",
        Warning => "warning",
        Error => "error",
        Critical => "critical",
    }
}

pub fn diagnostic_category_str(category: devac_core::DiagnosticCategory) -> &'static str {
    use devac_core::DiagnosticCategory::*;
    match category {
        Compilation => "compilation",
        Linting => "linting",
        Testing => "testing",
        Accessibility => "accessibility",
        CiCheck => "ci-check",
        Task => "task",
    }
}
