//! Core data model for the code graph, seeds, and the federation hub.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ids::EntityId;

/// What kind of code entity a [`Node`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Module,
    Class,
    Interface,
    Function,
    Method,
    Property,
    Constant,
    Variable,
    Type,
    Enum,
    EnumMember,
    Namespace,
    HtmlElement,
    JsxComponent,
    Unknown,
}

/// Access level of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    Internal,
}

/// The structural table: one row per declared symbol (or per file, for
/// `Module` nodes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub entity_id: EntityId,
    pub name: String,
    pub qualified_name: String,
    pub kind: NodeKind,
    pub file_path: PathBuf,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub is_exported: bool,
    pub is_default_export: bool,
    pub visibility: Visibility,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub type_signature: Option<String>,
    pub documentation: Option<String>,
    pub decorators: Vec<String>,
    pub type_parameters: Vec<String>,
    pub properties: BTreeMap<String, JsonValue>,
    pub source_file_hash: String,
    pub branch: String,
    pub is_deleted: bool,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// What kind of relationship an [`Edge`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Contains,
    Extends,
    Implements,
    Calls,
    Imports,
    References,
    Overrides,
}

/// A directed relationship between two entities.
///
/// A `target_entity_id` with the `unresolved:` prefix is a stub awaiting a
/// resolver pass; after resolution of a package no stub remains whose name
/// matches a declared local or exported symbol within that package (P3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_entity_id: EntityId,
    pub target_entity_id: EntityId,
    pub edge_type: EdgeKind,
    pub source_line: u32,
    pub source_col: u32,
    pub properties: BTreeMap<String, JsonValue>,
}

/// How an import binds in the importing module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStyle {
    Named,
    Default,
    Namespace,
    SideEffect,
    Dynamic,
    Reexport,
}

/// An import statement not yet resolved to an [`Edge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRef {
    pub source_entity_id: EntityId,
    pub source_file_path: PathBuf,
    pub module_specifier: String,
    pub imported_symbol: String,
    pub local_alias: Option<String>,
    pub is_type_only: bool,
    pub is_default: bool,
    pub is_namespace: bool,
    pub import_style: ImportStyle,
    pub is_reexport: bool,
}

/// Fields shared by every [`Effect`] variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectHeader {
    pub effect_id: String,
    pub source_entity_id: EntityId,
    pub source_file_path: PathBuf,
    pub source_line: u32,
    pub source_col: u32,
    pub is_deleted: bool,
}

/// Outbound send protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendType {
    Http,
    M2m,
}

/// A recorded side effect extracted from source. Serialized with
/// `serde`'s adjacently-tagged representation (`effect_type` discriminates
/// `FunctionCall`/`Request`/`Send`/`Store`/`Retrieve`) and flattened into
/// nullable parquet columns by the seed writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect_type", content = "fields", rename_all = "snake_case")]
pub enum Effect {
    FunctionCall {
        header: EffectHeader,
        callee_name: String,
        is_method_call: bool,
        is_constructor: bool,
        is_async: bool,
        argument_count: u32,
        is_external: bool,
        external_module: Option<String>,
    },
    Request {
        header: EffectHeader,
        method: String,
        route_pattern: String,
        framework: String,
    },
    Send {
        header: EffectHeader,
        send_type: SendType,
        method: String,
        target: String,
        service_name: Option<String>,
        is_third_party: bool,
    },
    Store {
        header: EffectHeader,
        target: String,
    },
    Retrieve {
        header: EffectHeader,
        target: String,
    },
}

impl Effect {
    pub fn header(&self) -> &EffectHeader {
        match self {
            Effect::FunctionCall { header, .. }
            | Effect::Request { header, .. }
            | Effect::Send { header, .. }
            | Effect::Store { header, .. }
            | Effect::Retrieve { header, .. } => header,
        }
    }

    pub fn header_mut(&mut self) -> &mut EffectHeader {
        match self {
            Effect::FunctionCall { header, .. }
            | Effect::Request { header, .. }
            | Effect::Send { header, .. }
            | Effect::Store { header, .. }
            | Effect::Retrieve { header, .. } => header,
        }
    }
}

/// One package entry inside a [`RepoManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestPackage {
    pub name: String,
    pub seed_path: PathBuf,
    pub language: String,
    pub hash: String,
}

/// An external dependency declared by a package, optionally annotated with
/// the registered `repo_id` it was matched against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDependency {
    pub package: String,
    pub version: String,
    pub repo_id: Option<String>,
}

/// Summary of a repo's packages and their external dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoManifest {
    pub repo_id: String,
    pub packages: Vec<ManifestPackage>,
    pub external_dependencies: Vec<ExternalDependency>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl RepoManifest {
    /// Digest of this manifest's JSON encoding. `manifest.json`'s on-disk
    /// hash must equal this for the manifest to be considered valid.
    pub fn digest(&self) -> anyhow::Result<String> {
        let encoded = serde_json::to_vec(self)?;
        Ok(crate::hash::content_hash(&encoded))
    }
}

/// Liveness state of a registered repo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Active,
    Stale,
    Missing,
}

/// A row in the hub's repo registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRegistration {
    pub repo_id: String,
    pub local_path: PathBuf,
    pub manifest_hash: String,
    pub last_synced: chrono::DateTime<chrono::Utc>,
    pub status: RepoStatus,
}

/// A hub-level edge spanning two repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossRepoEdge {
    pub source_repo: String,
    pub source_entity_id: EntityId,
    pub target_repo: String,
    pub target_entity_id: EntityId,
    pub edge_type: EdgeKind,
    pub metadata: BTreeMap<String, JsonValue>,
}

/// Where a [`UnifiedDiagnostic`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticSource {
    Tsc,
    Eslint,
    Biome,
    Test,
    Coverage,
    Axe,
    CiCheck,
    GithubIssue,
    GithubReview,
}

/// Severity of a [`UnifiedDiagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    Note,
    Suggestion,
    Warning,
    Error,
    Critical,
}

/// Category of a [`UnifiedDiagnostic`], used for grouped summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCategory {
    Compilation,
    Linting,
    Testing,
    Accessibility,
    CiCheck,
    Task,
}

/// A diagnostic finding from an external tool, unified into one hub row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedDiagnostic {
    pub diagnostic_id: String,
    pub repo_id: String,
    pub source: DiagnosticSource,
    pub file_path: Option<PathBuf>,
    pub line: Option<u32>,
    pub col: Option<u32>,
    pub severity: DiagnosticSeverity,
    pub category: DiagnosticCategory,
    pub title: String,
    pub description: String,
    pub code: Option<String>,
    pub suggestion: Option<String>,
    pub resolved: bool,
    pub actionable: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub github_issue_number: Option<u64>,
    pub github_pr_number: Option<u64>,
    pub workflow_name: Option<String>,
    pub ci_url: Option<String>,
}

/// Languages a [`crate::hash`] / parser can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
    Other,
}

impl Language {
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("rs") => Language::Rust,
            Some("ts") | Some("tsx") => Language::TypeScript,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Language::JavaScript,
            Some("py") | Some("pyi") => Language::Python,
            Some("go") => Language::Go,
            Some("java") => Language::Java,
            _ => Language::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_digest_is_stable_for_same_content() {
        let manifest = RepoManifest {
            repo_id: "r".into(),
            packages: vec![],
            external_dependencies: vec![],
            generated_at: chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        };
        assert_eq!(manifest.digest().unwrap(), manifest.digest().unwrap());
    }

    #[test]
    fn language_from_path() {
        assert_eq!(Language::from_path(std::path::Path::new("a.rs")), Language::Rust);
        assert_eq!(Language::from_path(std::path::Path::new("a.ts")), Language::TypeScript);
        assert_eq!(Language::from_path(std::path::Path::new("a.xyz")), Language::Other);
    }
}
