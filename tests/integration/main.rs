//! End-to-end scenarios spanning orchestrator, update manager and hub.

use std::path::Path;
use std::sync::Arc;

use devac_core::{
    DiagnosticCategory, DiagnosticSeverity, DiagnosticSource, EffectHeader, EntityId, Effect,
    SendType, UnifiedDiagnostic,
};
use devac_hub::{CentralHub, M2mOptions};
use devac_indexer::ParserRegistry;
use devac_orchestrator::{AnalyzeOrchestrator, BuildOptions};
use devac_resolver::Resolver;
use devac_seed::{SeedLayout, SeedStore, SeedWriter, DEFAULT_BRANCH};
use devac_update::{ChangeType, FileChangeEvent, RenameEvent, UpdateManager};
use tempfile::tempdir;

fn write_utils_and_service(root: &Path) {
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/utils.ts"), "export function helper(): string { return \"h\"; }\n").unwrap();
    std::fs::write(
        root.join("src/service.ts"),
        "import { helper } from \"./utils\";\nexport function doWork(): string { return helper(); }\n",
    )
    .unwrap();
}

/// Scenario 1: fresh analyze.
#[tokio::test]
async fn fresh_analyze_resolves_the_cross_file_call() {
    let dir = tempdir().unwrap();
    write_utils_and_service(dir.path());

    let orchestrator = AnalyzeOrchestrator::new();
    let options = BuildOptions { repo_name: "r".into(), branch: "main".into(), ..Default::default() };
    let result = orchestrator.analyze(dir.path(), &options).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.files_analyzed, 2);

    let seed = SeedStore::open(dir.path(), "main");
    let calls = seed.query_engine().query("SELECT COUNT(*) AS n FROM edges WHERE edge_type = 'CALLS'").unwrap();
    let count = calls.rows[0].get("n").unwrap().as_i64().unwrap();
    assert!(count >= 1);

    let unresolved = seed
        .query_engine()
        .query("SELECT target_entity_id FROM edges WHERE edge_type = 'CALLS' AND target_entity_id LIKE 'unresolved:helper%'")
        .unwrap();
    assert_eq!(unresolved.row_count, 0);
}

/// Scenario 2: incremental unchanged short-circuit.
#[tokio::test]
async fn analyze_if_changed_skips_second_run() {
    let dir = tempdir().unwrap();
    write_utils_and_service(dir.path());

    let orchestrator = AnalyzeOrchestrator::new();
    let options = BuildOptions { if_changed: true, repo_name: "r".into(), branch: "main".into(), ..Default::default() };

    let first = orchestrator.analyze(dir.path(), &options).await;
    assert!(first.success && !first.skipped);

    let second = orchestrator.analyze(dir.path(), &options).await;
    assert!(second.skipped);
}

/// Scenario 3 / invariant P6: rename moves rows to the new path under a new entity id.
#[tokio::test]
async fn rename_moves_rows_to_the_new_path_with_a_new_entity_id() {
    let dir = tempdir().unwrap();
    write_utils_and_service(dir.path());

    let registry = Arc::new(ParserRegistry::new());
    let resolver = Arc::new(Resolver::new());
    let manager = UpdateManager::new(dir.path().to_path_buf(), "base".to_string(), registry, resolver);

    for path in ["src/utils.ts", "src/service.ts"] {
        let result = manager
            .process_file_change(FileChangeEvent {
                change_type: ChangeType::Add,
                file_path: dir.path().join(path),
                timestamp: 0,
            })
            .await;
        assert!(result.success, "{:?}", result.error);
    }

    let seed = SeedStore::open(dir.path(), "base");
    let before = seed.query_engine().query("SELECT entity_id FROM nodes WHERE name = 'helper'").unwrap();
    let old_entity_id = before.rows[0].get("entity_id").unwrap().as_str().unwrap().to_string();

    let old_path = dir.path().join("src/utils.ts");
    let new_path = dir.path().join("src/util2.ts");
    std::fs::rename(&old_path, &new_path).unwrap();

    let rename_result = manager
        .process_rename(RenameEvent { old_path: old_path.clone(), new_path: new_path.clone(), timestamp: 1 })
        .await;
    assert!(rename_result.success, "{:?}", rename_result.error);

    seed.invalidate_queries();
    let old_rows = seed
        .query_engine()
        .query(&format!("SELECT * FROM nodes WHERE file_path = '{}'", old_path.to_string_lossy()))
        .unwrap();
    assert_eq!(old_rows.row_count, 0);

    let new_rows = seed.query_engine().query("SELECT entity_id FROM nodes WHERE name = 'helper'").unwrap();
    assert_eq!(new_rows.row_count, 1);
    assert_ne!(new_rows.rows[0].get("entity_id").unwrap().as_str().unwrap(), old_entity_id);
}

fn effect_header(id: &str) -> EffectHeader {
    EffectHeader {
        effect_id: id.to_string(),
        source_entity_id: EntityId(format!("id:{id}")),
        source_file_path: "src/lib.rs".into(),
        source_line: 1,
        source_col: 0,
        is_deleted: false,
    }
}

/// Writes a minimal package: a marker file the manifest generator
/// recognizes, plus a pre-built seed directory with the given effects.
fn write_effect_package(repo_root: &Path, package_name: &str, effects: &[Effect]) -> std::path::PathBuf {
    let package_dir = repo_root.join(package_name);
    std::fs::create_dir_all(&package_dir).unwrap();
    std::fs::write(package_dir.join("Cargo.toml"), "[package]\nname = \"p\"\n").unwrap();

    let layout = SeedLayout::new(package_dir.clone(), DEFAULT_BRANCH);
    SeedWriter::new(layout).write_all(&[], &[], &[], Some(effects), 1).unwrap();
    package_dir
}

/// Scenario 4: M2M match between a request in one repo and an m2m send in another.
#[test]
fn m2m_match_links_send_to_request_across_repos() {
    let repo_a_parent = tempdir().unwrap();
    let repo_a = repo_a_parent.path().join("users-service");
    std::fs::create_dir_all(&repo_a).unwrap();
    write_effect_package(
        &repo_a,
        "pkg",
        &[Effect::Request {
            header: effect_header("req1"),
            method: "GET".into(),
            route_pattern: "users/{userId}".into(),
            framework: "axum".into(),
        }],
    );

    let repo_b = tempdir().unwrap();
    write_effect_package(
        repo_b.path(),
        "pkg",
        &[Effect::Send {
            header: effect_header("send1"),
            send_type: SendType::M2m,
            method: "POST".into(),
            target: "/stage/users-endpoints/${id}".into(),
            service_name: None,
            is_third_party: false,
        }],
    );

    let workspace = tempdir().unwrap();
    let hub = CentralHub::open(workspace.path(), true).unwrap();
    // Repo ids fall back to directory basename when there is no git remote,
    // so the repo roots themselves carry the names the matcher compares.
    hub.register_repo(&repo_a).unwrap();
    hub.register_repo(repo_b.path()).unwrap();

    let result = hub.find_m2m_connections(&M2mOptions::default()).unwrap();
    assert_eq!(result.connections.len(), 1);
    assert_eq!(result.connections[0].target_service, "users");
}

/// Scenario 5: affected repos via a cross-repo dependency edge.
#[tokio::test]
async fn affected_repos_reports_the_dependent_repo() {
    let repo_a = tempdir().unwrap();
    let svc = repo_a.path().join("users-service");
    std::fs::create_dir_all(svc.join("src")).unwrap();
    std::fs::write(svc.join("Cargo.toml"), "[package]\nname = \"users-service\"\n").unwrap();
    std::fs::write(svc.join("src/lib.rs"), "pub fn greet() {}\n").unwrap();
    AnalyzeOrchestrator::new()
        .analyze(&svc, &BuildOptions { repo_name: "users-service".into(), ..Default::default() })
        .await;

    let repo_b = tempdir().unwrap();
    let caller = repo_b.path().join("caller");
    std::fs::create_dir_all(caller.join("src")).unwrap();
    std::fs::write(
        caller.join("Cargo.toml"),
        "[package]\nname = \"caller\"\n[dependencies]\nusers-service = \"1.0\"\n",
    )
    .unwrap();
    std::fs::write(caller.join("src/lib.rs"), "fn use_it() {}\n").unwrap();
    AnalyzeOrchestrator::new()
        .analyze(&caller, &BuildOptions { repo_name: "caller".into(), ..Default::default() })
        .await;

    let workspace = tempdir().unwrap();
    let hub = CentralHub::open(workspace.path(), true).unwrap();
    hub.register_repo(&svc).unwrap();
    hub.register_repo(&caller).unwrap();

    let affected = hub.get_affected_repos(&["pkg:users-service".to_string()]).unwrap();

    assert_eq!(affected.total_affected, 1);
    assert_eq!(affected.affected_repos[0].repo_id, "caller");
    assert_eq!(affected.affected_repos[0].impact_level, "direct");
}

/// Scenario 6 / invariant P7: read-only fallback.
#[test]
fn second_open_is_read_only_and_rejects_writes() {
    let workspace = tempdir().unwrap();

    let writer = CentralHub::open(workspace.path(), true).unwrap();
    assert!(!writer.is_read_only());

    let reader = CentralHub::open(workspace.path(), true).unwrap();
    assert!(reader.is_read_only());

    let diagnostic = UnifiedDiagnostic {
        diagnostic_id: "d1".into(),
        repo_id: "r1".into(),
        source: DiagnosticSource::Tsc,
        file_path: None,
        line: None,
        col: None,
        severity: DiagnosticSeverity::Error,
        category: DiagnosticCategory::Compilation,
        title: "t".into(),
        description: "d".into(),
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
    assert!(reader.push_diagnostics(&[diagnostic]).is_err());
    assert!(reader.get_diagnostics(None).is_ok());
}
