//! Columnar seed storage: parquet tables on disk per package/branch, a
//! `duckdb`-backed SQL facade over them, and the atomic write protocol that
//! keeps concurrent writers and readers from tearing each other's state
//! (§4.4).

pub mod cache;
pub mod layout;
pub mod meta;
pub mod query;
pub mod reader;
pub mod schema;
pub mod writer;

pub use layout::{SeedLayout, Table, DEFAULT_BRANCH, SCHEMA_VERSION};
pub use meta::{SeedMeta, SeedStats};
pub use query::{QueryResult, SeedQueryEngine};
pub use reader::SeedReader;
pub use writer::SeedWriter;

/// One package's seed set: writer, reader, and query engine sharing a
/// layout. The natural entry point for the orchestrator and update manager.
///
/// The query engine is a single long-lived instance rather than one built
/// per call: its result cache only means something if it survives across
/// queries, and `invalidate_queries` only has something to clear if callers
/// share it.
pub struct SeedStore {
    layout: SeedLayout,
    query_engine: SeedQueryEngine,
}

impl SeedStore {
    pub fn open(package_root: impl Into<std::path::PathBuf>, branch: impl Into<String>) -> Self {
        let layout = SeedLayout::new(package_root, branch);
        let query_engine = SeedQueryEngine::new(layout.clone());
        Self { layout, query_engine }
    }

    pub fn layout(&self) -> &SeedLayout {
        &self.layout
    }

    pub fn writer(&self) -> SeedWriter {
        SeedWriter::new(self.layout.clone())
    }

    pub fn reader(&self) -> SeedReader {
        SeedReader::new(self.layout.clone())
    }

    pub fn query_engine(&self) -> &SeedQueryEngine {
        &self.query_engine
    }

    /// Called after any write to the package's tables.
    pub fn invalidate_queries(&self) {
        self.query_engine.invalidate();
    }
}
