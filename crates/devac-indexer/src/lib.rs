//! Multi-language tree-sitter parsing: the uniform `LanguageParser` contract,
//! the per-language backends that implement it, and the worker-pool that
//! runs tree-sitter off the calling thread.

pub mod effects;
pub mod languages;
pub mod parser;
pub mod parser_pool;
pub mod registry;

#[cfg(test)]
pub mod tests;

pub use parser::{LanguageParser, ParseConfig, ParseOutput, ParseWarning};
pub use registry::ParserRegistry;
