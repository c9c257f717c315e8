//! Uniform parser contract (§4.2): every language backend implements the
//! same operation set so the resolver and orchestrator never special-case a
//! language.

use std::path::{Path, PathBuf};

use devac_core::{Edge, Effect, ExternalRef, Node};

/// Per-parse configuration, shared by every language backend.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    pub repo_name: String,
    pub package_path: String,
    pub branch: String,
    pub include_documentation: bool,
    pub max_node_depth: Option<usize>,
    pub strict: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            repo_name: String::new(),
            package_path: String::new(),
            branch: "base".to_string(),
            include_documentation: true,
            max_node_depth: None,
            strict: false,
        }
    }
}

/// A non-fatal issue recorded during parsing. Syntax errors never throw —
/// they land here and parsing continues with the best-effort AST.
#[derive(Debug, Clone)]
pub struct ParseWarning {
    pub message: String,
    pub line: Option<u32>,
}

/// The result of parsing one file.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub external_refs: Vec<ExternalRef>,
    pub effects: Vec<Effect>,
    pub source_file_hash: String,
    pub file_path: PathBuf,
    pub parse_time_ms: u64,
    pub warnings: Vec<ParseWarning>,
}

/// One language backend. Implementations live under `languages/`.
pub trait LanguageParser: Send + Sync {
    fn language(&self) -> devac_core::Language;
    fn extensions(&self) -> &'static [&'static str];
    fn version(&self) -> &'static str;

    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }

    /// Reads `path` from disk and parses it. Missing files fail the
    /// operation (per §4.2's failure semantics — this is the one error
    /// class that is not downgraded to a warning).
    fn parse(&self, path: &Path, config: &ParseConfig) -> anyhow::Result<ParseOutput> {
        let content = std::fs::read(path)?;
        self.parse_content(&content, path, config)
    }

    fn parse_content(
        &self,
        content: &[u8],
        path: &Path,
        config: &ParseConfig,
    ) -> anyhow::Result<ParseOutput>;
}
