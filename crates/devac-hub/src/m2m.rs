//! Fuzzy machine-to-machine connection matching (§4.8): every `Send` effect
//! with `send_type = m2m` is matched against a `Request` effect in another
//! repo whose route pattern shows up in the send target, heuristically
//! confirmed by a loose relation between the target repo's name and the
//! send's declared service name. Deliberately heuristic per §9 — thresholds
//! are tunable, confidence is surfaced rather than hidden.

use std::time::Instant;

use regex::Regex;

use devac_core::{DevacError, EntityId, Effect, RepoManifest, SendType};
use devac_seed::{SeedLayout, SeedReader, DEFAULT_BRANCH};

#[derive(Debug, Clone, PartialEq)]
pub struct M2mConnection {
    pub source_repo: String,
    pub source_entity_id: EntityId,
    pub target_repo: String,
    pub target_entity_id: EntityId,
    pub target_service: String,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct M2mOptions {
    pub min_confidence: f64,
}

impl Default for M2mOptions {
    fn default() -> Self {
        Self { min_confidence: 0.5 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct M2mResult {
    pub connections: Vec<M2mConnection>,
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub time_ms: u64,
}

struct RepoEffects {
    repo_id: String,
    sends: Vec<Effect>,
    requests: Vec<Effect>,
}

pub fn find_m2m_connections(manifests: &[(String, RepoManifest)], options: &M2mOptions) -> Result<M2mResult, DevacError> {
    let started = Instant::now();

    let mut repos = Vec::new();
    for (repo_id, manifest) in manifests {
        let mut sends = Vec::new();
        let mut requests = Vec::new();
        for package in &manifest.packages {
            let package_root = package_root_from_seed_path(&package.seed_path);
            let reader = SeedReader::new(SeedLayout::new(package_root, DEFAULT_BRANCH));
            let effects = reader.read_effects().map_err(|e| DevacError::Storage(e.to_string()))?;
            for effect in effects {
                match &effect {
                    Effect::Send { send_type: SendType::M2m, .. } => sends.push(effect),
                    Effect::Request { .. } => requests.push(effect),
                    _ => {}
                }
            }
        }
        repos.push(RepoEffects { repo_id: repo_id.clone(), sends, requests });
    }

    let total: usize = repos.iter().map(|r| r.sends.len()).sum();
    let mut connections = Vec::new();

    for (i, source) in repos.iter().enumerate() {
        for send in &source.sends {
            let Effect::Send { header: send_header, target, service_name, .. } = send else { continue };
            let normalized_target = normalize_target(target);

            let mut best: Option<M2mConnection> = None;
            for (j, target_repo) in repos.iter().enumerate() {
                if i == j {
                    continue;
                }
                for request in &target_repo.requests {
                    let Effect::Request { header: req_header, route_pattern, .. } = request else { continue };
                    let route_prefix = static_prefix(route_pattern);
                    if route_prefix.is_empty() || !normalized_target.to_lowercase().contains(&route_prefix.to_lowercase()) {
                        continue;
                    }

                    let candidate_service = service_name.clone().unwrap_or_else(|| route_prefix.clone());
                    if !names_related(&target_repo.repo_id, &candidate_service) {
                        continue;
                    }

                    let confidence = match_confidence(&route_prefix, &normalized_target);
                    let candidate = M2mConnection {
                        source_repo: source.repo_id.clone(),
                        source_entity_id: send_header.source_entity_id.clone(),
                        target_repo: target_repo.repo_id.clone(),
                        target_entity_id: req_header.source_entity_id.clone(),
                        target_service: route_prefix,
                        confidence,
                    };
                    if best.as_ref().is_none_or(|b| candidate.confidence > b.confidence) {
                        best = Some(candidate);
                    }
                }
            }

            if let Some(connection) = best {
                if connection.confidence >= options.min_confidence {
                    connections.push(connection);
                }
            }
        }
    }

    let matched = connections.len();
    Ok(M2mResult {
        total,
        matched,
        unmatched: total.saturating_sub(matched),
        connections,
        time_ms: started.elapsed().as_millis() as u64,
    })
}

fn package_root_from_seed_path(seed_path: &std::path::Path) -> std::path::PathBuf {
    seed_path.parent().and_then(|p| p.parent()).map(|p| p.to_path_buf()).unwrap_or_else(|| seed_path.to_path_buf())
}

/// Strip protocol/host/query and collapse `${...}`/`:param` placeholders to
/// a uniform token, so structurally similar targets compare equal.
fn normalize_target(target: &str) -> String {
    let without_query = target.split('?').next().unwrap_or(target);
    let path = strip_protocol_and_host(without_query);
    let template = Regex::new(r"\$\{[^}]*\}").unwrap();
    let colon_param = Regex::new(r":[A-Za-z_][A-Za-z0-9_]*").unwrap();
    let curly_param = Regex::new(r"\{[^}]*\}").unwrap();
    let normalized = template.replace_all(path, "{}");
    let normalized = colon_param.replace_all(&normalized, "{}");
    curly_param.replace_all(&normalized, "{}").into_owned()
}

fn strip_protocol_and_host(s: &str) -> &str {
    if let Some((_, rest)) = s.split_once("://") {
        rest.find('/').map(|idx| &rest[idx..]).unwrap_or("")
    } else {
        s
    }
}

/// The static, non-parameterized leading segment(s) of a route pattern,
/// e.g. `users/{userId}` → `users`.
fn static_prefix(route_pattern: &str) -> String {
    route_pattern.split(['{', ':']).next().unwrap_or("").trim_matches('/').to_string()
}

fn names_related(repo_id: &str, service_name: &str) -> bool {
    let repo_lower = repo_id.to_lowercase();
    let service_lower = service_name.to_lowercase();
    if repo_lower.is_empty() || service_lower.is_empty() {
        return false;
    }
    repo_lower.contains(&service_lower) || service_lower.contains(&repo_lower)
}

fn match_confidence(route_prefix: &str, normalized_target: &str) -> f64 {
    if normalized_target.to_lowercase() == route_prefix.to_lowercase() {
        1.0
    } else {
        0.7
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devac_core::{EffectHeader, ManifestPackage};
    use devac_seed::SeedWriter;
    use tempfile::tempdir;

    fn header(id: &str) -> EffectHeader {
        EffectHeader {
            effect_id: id.to_string(),
            source_entity_id: EntityId(format!("id:{id}")),
            source_file_path: "src/a.ts".into(),
            source_line: 1,
            source_col: 0,
            is_deleted: false,
        }
    }

    fn write_effects(root: &std::path::Path, effects: &[Effect]) -> std::path::PathBuf {
        let layout = SeedLayout::new(root, DEFAULT_BRANCH);
        SeedWriter::new(layout.clone()).write_all(&[], &[], &[], Some(effects), 1).unwrap();
        layout.seed_dir()
    }

    fn manifest_with(repo_id: &str, seed_path: std::path::PathBuf) -> (String, RepoManifest) {
        (
            repo_id.to_string(),
            RepoManifest {
                repo_id: repo_id.to_string(),
                packages: vec![ManifestPackage {
                    name: "pkg".into(),
                    seed_path,
                    language: "rust".into(),
                    hash: "h".into(),
                }],
                external_dependencies: vec![],
                generated_at: chrono::Utc::now(),
            },
        )
    }

    #[test]
    fn matches_send_to_request_by_route_prefix_and_repo_name() {
        let repo_a = tempdir().unwrap();
        let seed_a = write_effects(
            repo_a.path(),
            &[Effect::Request {
                header: header("req1"),
                method: "GET".into(),
                route_pattern: "users/{userId}".into(),
                framework: "express".into(),
            }],
        );

        let repo_b = tempdir().unwrap();
        let seed_b = write_effects(
            repo_b.path(),
            &[Effect::Send {
                header: header("send1"),
                send_type: SendType::M2m,
                method: "POST".into(),
                target: "/stage/users-endpoints/${id}".into(),
                service_name: None,
                is_third_party: false,
            }],
        );

        let manifests = vec![manifest_with("users-service", seed_a), manifest_with("repo-b", seed_b)];
        let result = find_m2m_connections(&manifests, &M2mOptions::default()).unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.matched, 1);
        assert_eq!(result.connections[0].target_repo, "users-service");
        assert_eq!(result.connections[0].source_repo, "repo-b");
        assert_eq!(result.connections[0].target_service, "users");
    }

    #[test]
    fn unrelated_repo_name_prevents_a_false_match() {
        let repo_a = tempdir().unwrap();
        let seed_a = write_effects(
            repo_a.path(),
            &[Effect::Request {
                header: header("req1"),
                method: "GET".into(),
                route_pattern: "users/{userId}".into(),
                framework: "express".into(),
            }],
        );

        let repo_b = tempdir().unwrap();
        let seed_b = write_effects(
            repo_b.path(),
            &[Effect::Send {
                header: header("send1"),
                send_type: SendType::M2m,
                method: "POST".into(),
                target: "/stage/users-endpoints/${id}".into(),
                service_name: None,
                is_third_party: false,
            }],
        );

        let manifests = vec![manifest_with("billing-service", seed_a), manifest_with("repo-b", seed_b)];
        let result = find_m2m_connections(&manifests, &M2mOptions::default()).unwrap();

        assert_eq!(result.matched, 0);
    }
}
