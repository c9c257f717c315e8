//! On-disk layout of a package's seed set (§4.4):
//!
//! ```text
//! P/.devac/seed/
//!   meta.json
//!   <branch>/nodes.parquet
//!   <branch>/edges.parquet
//!   <branch>/external_refs.parquet
//!   <branch>/effects.parquet   # optional
//!   <branch>/stats.json
//! ```

use std::path::{Path, PathBuf};

pub const DEFAULT_BRANCH: &str = "base";
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Nodes,
    Edges,
    ExternalRefs,
    Effects,
}

impl Table {
    pub fn file_name(self) -> &'static str {
        match self {
            Table::Nodes => "nodes.parquet",
            Table::Edges => "edges.parquet",
            Table::ExternalRefs => "external_refs.parquet",
            Table::Effects => "effects.parquet",
        }
    }

    pub fn view_name(self) -> &'static str {
        match self {
            Table::Nodes => "nodes",
            Table::Edges => "edges",
            Table::ExternalRefs => "external_refs",
            Table::Effects => "effects",
        }
    }

    pub fn all() -> [Table; 4] {
        [Table::Nodes, Table::Edges, Table::ExternalRefs, Table::Effects]
    }
}

#[derive(Debug, Clone)]
pub struct SeedLayout {
    package_root: PathBuf,
    branch: String,
}

impl SeedLayout {
    pub fn new(package_root: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self { package_root: package_root.into(), branch: branch.into() }
    }

    pub fn seed_dir(&self) -> PathBuf {
        self.package_root.join(".devac").join("seed")
    }

    pub fn branch_dir(&self) -> PathBuf {
        self.seed_dir().join(&self.branch)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.seed_dir().join("meta.json")
    }

    pub fn stats_path(&self) -> PathBuf {
        self.branch_dir().join("stats.json")
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        self.branch_dir().join(table.file_name())
    }

    pub fn tmp_path(&self, table: Table) -> PathBuf {
        self.branch_dir().join(format!("{}.tmp", table.file_name()))
    }

    pub fn lock_path(&self, table: Table) -> PathBuf {
        self.branch_dir().join(format!("{}.lock", table.file_name()))
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }
}
