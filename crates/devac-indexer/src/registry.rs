//! Dispatches a file path to the backend that claims it, falling back to
//! the generic backend so no file is ever left unparsed.

use std::path::Path;
use std::sync::Arc;

use crate::languages::{generic::GenericParser, go::GoParser, java::JavaParser, javascript::EcmaParser, python::PythonParser, rust::RustParser};
use crate::parser::{LanguageParser, ParseConfig, ParseOutput};
use crate::parser_pool::{create_parser_pool, ParserPool};

pub struct ParserRegistry {
    backends: Vec<Arc<dyn LanguageParser>>,
    generic: Arc<dyn LanguageParser>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::with_pool(create_parser_pool())
    }

    pub fn with_pool(pool: ParserPool) -> Self {
        let backends: Vec<Arc<dyn LanguageParser>> = vec![
            Arc::new(RustParser::new(pool.clone())),
            Arc::new(EcmaParser::typescript(pool.clone())),
            Arc::new(EcmaParser::javascript(pool.clone())),
            Arc::new(PythonParser::new(pool.clone())),
            Arc::new(GoParser::new(pool.clone())),
            Arc::new(JavaParser::new(pool)),
        ];
        Self { backends, generic: Arc::new(GenericParser) }
    }

    pub fn backend_for(&self, path: &Path) -> Arc<dyn LanguageParser> {
        self.backends
            .iter()
            .find(|b| b.can_parse(path))
            .cloned()
            .unwrap_or_else(|| self.generic.clone())
    }

    pub fn parse(&self, path: &Path, config: &ParseConfig) -> anyhow::Result<ParseOutput> {
        self.backend_for(path).parse(path, config)
    }

    /// Whether a dedicated backend claims this path, as opposed to the
    /// generic fallback. Used by the orchestrator's file discovery to skip
    /// files no language backend has any real interest in.
    pub fn is_recognized(&self, path: &Path) -> bool {
        self.backends.iter().any(|b| b.can_parse(path))
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_extension_and_falls_back_to_generic() {
        let registry = ParserRegistry::new();
        assert_eq!(registry.backend_for(Path::new("a.py")).language(), devac_core::Language::Python);
        assert_eq!(registry.backend_for(Path::new("a.unknown")).language(), devac_core::Language::Other);
    }

    #[test]
    fn is_recognized_excludes_generic_fallback() {
        let registry = ParserRegistry::new();
        assert!(registry.is_recognized(Path::new("a.rs")));
        assert!(!registry.is_recognized(Path::new("a.bin")));
    }
}
