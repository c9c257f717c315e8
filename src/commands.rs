//! CLI command implementations. The CLI is a surface only (§6): most of its
//! behaviour is a thin dispatch onto the core crates; a few named
//! subcommands name collaborators outside this core's scope and report that
//! plainly rather than pretending to run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use devac_hub::CentralHub;
use devac_indexer::ParserRegistry;
use devac_orchestrator::{AnalyzeOrchestrator, BuildOptions};
use devac_resolver::Resolver;
use devac_seed::{SeedLayout, SeedReader, SeedStore};
use devac_update::{ChangeType, FileChangeEvent, RenameEvent, UpdateManager};
use devac_watch::{FileWatcher, RenameDetector, WatchOptions};

use crate::HubAction;

pub async fn analyze(
    package: &Path,
    branch: &str,
    if_changed: bool,
    force: bool,
    repo: String,
    json: bool,
) -> anyhow::Result<()> {
    tracing::info!("Analyzing package: {}", package.display());

    let orchestrator = AnalyzeOrchestrator::new();
    let options = BuildOptions { if_changed, force, repo_name: repo, branch: branch.to_string() };
    let result = orchestrator.analyze(package, &options).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&build_result_json(&result))?);
    } else if result.skipped {
        tracing::info!("Nothing changed since the last analyze; skipped");
    } else if result.success {
        tracing::info!(
            "Analyzed {} files: {} nodes, {} edges in {}ms",
            result.files_analyzed,
            result.nodes_created,
            result.edges_created,
            result.time_ms
        );
    } else {
        anyhow::bail!(result.error.unwrap_or_else(|| "analyze failed".into()));
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn build_result_json(result: &devac_orchestrator::BuildResult) -> serde_json::Value {
    serde_json::json!({
        "success": result.success,
        "skipped": result.skipped,
        "filesAnalyzed": result.files_analyzed,
        "nodesCreated": result.nodes_created,
        "edgesCreated": result.edges_created,
        "timeMs": result.time_ms,
        "error": result.error,
    })
}

/// Watches `package` and applies incremental updates as files change.
/// Runs until interrupted; each coalesced batch is categorized into
/// add/change/unlink/rename and driven through an [`UpdateManager`].
pub async fn watch(package: &Path, branch: &str) -> anyhow::Result<()> {
    tracing::info!("Watching: {}", package.display());

    let manager = UpdateManager::new(
        package.to_path_buf(),
        branch.to_string(),
        Arc::new(ParserRegistry::new()),
        Arc::new(Resolver::new()),
    );
    let mut watcher = FileWatcher::new(package, WatchOptions::default())?;
    let mut detector = RenameDetector::new();

    while let Some(events) = watcher.next_batch().await {
        let categorized = detector.categorize(&events, |path| std::fs::read(path).ok());
        let now = chrono::Utc::now().timestamp_millis();

        let mut file_events = Vec::new();
        for path in categorized.adds {
            file_events.push(FileChangeEvent { change_type: ChangeType::Add, file_path: path, timestamp: now });
        }
        for path in categorized.changes {
            file_events.push(FileChangeEvent { change_type: ChangeType::Change, file_path: path, timestamp: now });
        }
        for path in categorized.deletes {
            file_events.push(FileChangeEvent { change_type: ChangeType::Unlink, file_path: path, timestamp: now });
        }

        let batch_result = manager.process_batch(file_events).await;
        for rename in categorized.renames {
            manager
                .process_rename(RenameEvent { old_path: rename.old_path, new_path: rename.new_path, timestamp: now })
                .await;
        }

        tracing::info!(
            success = batch_result.success_count,
            skipped = batch_result.skipped_count,
            errors = batch_result.error_count,
            "applied update batch"
        );
    }

    manager.dispose();
    Ok(())
}

pub fn query(package: &Path, branch: &str, sql: &str, json: bool) -> anyhow::Result<()> {
    let seed = SeedStore::open(package.to_path_buf(), branch.to_string());
    let result = seed.query_engine().query(sql)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "rows": result.rows,
                "rowCount": result.row_count,
                "timeMs": result.time_ms,
            }))?
        );
    } else {
        for row in &result.rows {
            println!("{}", serde_json::Value::Object(row.clone()));
        }
        tracing::info!("{} rows in {}ms", result.row_count, result.time_ms);
    }
    Ok(())
}

/// Checks a package's seed set for structural integrity: `meta.json` and
/// `stats.json` parse, and every table file that exists is readable parquet.
/// Missing optional files are warnings; a table that exists but fails to
/// read is a fatal error, per §7's storage-error policy.
pub fn verify(package: &Path, branch: &str, json: bool) -> anyhow::Result<()> {
    let layout = SeedLayout::new(package.to_path_buf(), branch.to_string());
    let reader = SeedReader::new(layout.clone());

    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    if !layout.meta_path().exists() {
        warnings.push("meta.json missing".to_string());
    } else if let Err(e) = reader.read_meta() {
        errors.push(format!("meta.json unreadable: {e}"));
    }

    if !layout.stats_path().exists() {
        warnings.push("stats.json missing".to_string());
    } else if let Err(e) = reader.read_stats() {
        errors.push(format!("stats.json unreadable: {e}"));
    }

    if let Err(e) = reader.read_nodes() {
        errors.push(format!("nodes table unreadable: {e}"));
    }
    if let Err(e) = reader.read_edges() {
        errors.push(format!("edges table unreadable: {e}"));
    }
    if let Err(e) = reader.read_external_refs() {
        errors.push(format!("external_refs table unreadable: {e}"));
    }
    // effects.parquet is optional; a missing file is not an error for it.
    let _ = reader.read_effects();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "ok": errors.is_empty(),
                "warnings": warnings,
                "errors": errors,
            }))?
        );
    } else {
        for w in &warnings {
            tracing::warn!("{w}");
        }
        for e in &errors {
            tracing::error!("{e}");
        }
        if errors.is_empty() {
            tracing::info!("seed set OK");
        }
    }

    if !errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

pub fn clean(package: &Path) -> anyhow::Result<()> {
    let devac_dir = package.join(".devac");
    if devac_dir.exists() {
        std::fs::remove_dir_all(&devac_dir)?;
        tracing::info!("Removed {}", devac_dir.display());
    } else {
        tracing::info!("Nothing to clean at {}", devac_dir.display());
    }
    Ok(())
}

pub fn affected(workspace: Option<&Path>, package: &Path, entity_ids: &[String], json: bool) -> anyhow::Result<()> {
    let root = resolve_workspace(workspace, package)?;
    let hub = CentralHub::open(&root, false)?;
    let result = hub.get_affected_repos(entity_ids)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "changedEntities": result.changed_entities,
                "affectedRepos": result.affected_repos.iter().map(|r| serde_json::json!({
                    "repoId": r.repo_id,
                    "impactLevel": r.impact_level,
                })).collect::<Vec<_>>(),
                "totalAffected": result.total_affected,
                "analysisTimeMs": result.analysis_time_ms,
            }))?
        );
    } else {
        for repo in &result.affected_repos {
            println!("{} ({})", repo.repo_id, repo.impact_level);
        }
        tracing::info!("{} repos affected in {}ms", result.total_affected, result.analysis_time_ms);
    }
    Ok(())
}

pub async fn hub(action: HubAction, package: &Path, json: bool) -> anyhow::Result<()> {
    match action {
        HubAction::Init { workspace } => {
            let root = resolve_workspace(workspace.as_deref(), package)?;
            CentralHub::open(&root, true)?;
            tracing::info!("Hub initialized at {}", devac_core::hub_dir(&root).display());
        }
        HubAction::Register { path, workspace } => {
            let root = resolve_workspace(workspace.as_deref(), package)?;
            let hub = CentralHub::open(&root, true)?;
            let (repo_id, manifest, edges) = hub.register_repo(&path)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "repoId": repo_id,
                        "packages": manifest.packages.len(),
                        "crossRepoEdges": edges.len(),
                    }))?
                );
            } else {
                tracing::info!("Registered {repo_id}: {} packages, {} cross-repo edges", manifest.packages.len(), edges.len());
            }
        }
        HubAction::Unregister { repo_id, workspace } => {
            let root = resolve_workspace(workspace.as_deref(), package)?;
            let hub = CentralHub::open(&root, true)?;
            hub.unregister_repo(&repo_id)?;
            tracing::info!("Unregistered {repo_id}");
        }
        HubAction::List { workspace } => {
            let root = resolve_workspace(workspace.as_deref(), package)?;
            let hub = CentralHub::open(&root, false)?;
            let repos = hub.list_repos()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&repos_json(&repos))?);
            } else {
                for repo in &repos {
                    println!("{} — {}", repo.repo_id, repo.local_path.display());
                }
            }
        }
        HubAction::Refresh { repo_id, workspace } => {
            let root = resolve_workspace(workspace.as_deref(), package)?;
            let hub = CentralHub::open(&root, true)?;
            match repo_id {
                Some(id) => hub.refresh_repo(&id)?,
                None => hub.refresh_all()?,
            }
            tracing::info!("Refresh complete");
        }
        HubAction::Status { workspace } => {
            let root = resolve_workspace(workspace.as_deref(), package)?;
            let hub = CentralHub::open(&root, false)?;
            let repos = hub.list_repos()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&repos_json(&repos))?);
            } else {
                for repo in &repos {
                    println!("{} — {:?}", repo.repo_id, repo.status);
                }
            }
        }
        HubAction::Diagnostics { repo, workspace } => {
            let root = resolve_workspace(workspace.as_deref(), package)?;
            let hub = CentralHub::open(&root, false)?;
            let diagnostics = hub.get_diagnostics(repo.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&diagnostics)?);
            } else {
                for d in &diagnostics {
                    println!("[{}] {}: {}", d.repo_id, d.title, d.description);
                }
            }
        }
    }
    Ok(())
}

fn repos_json(repos: &[devac_core::RepoRegistration]) -> serde_json::Value {
    serde_json::json!(repos
        .iter()
        .map(|r| serde_json::json!({
            "repoId": r.repo_id,
            "localPath": r.local_path,
            "manifestHash": r.manifest_hash,
            "status": format!("{:?}", r.status),
        }))
        .collect::<Vec<_>>())
}

fn resolve_workspace(explicit: Option<&Path>, package: &Path) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    devac_core::discover_workspace(package).ok_or_else(|| anyhow::anyhow!("no workspace found above {}", package.display()))
}

pub fn unimplemented_surface(name: &str) -> anyhow::Result<()> {
    anyhow::bail!("`{name}` is not implemented in this surface")
}
