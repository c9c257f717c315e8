//! `meta.json` and `stats.json` payloads (§4.4).

use serde::{Deserialize, Serialize};

use crate::layout::SCHEMA_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedMeta {
    pub schema_version: u32,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl SeedMeta {
    pub fn current() -> Self {
        Self { schema_version: SCHEMA_VERSION, generated_at: chrono::Utc::now() }
    }

    pub fn is_compatible(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub ref_count: usize,
    pub file_count: usize,
}
