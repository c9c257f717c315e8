//! devac-core — data model, entity-id hashing, in-memory graph, diff
//! engine, and workspace discovery shared by every other crate.

pub mod error;
pub mod graph;
pub mod hash;
pub mod ids;
pub mod model;
pub mod diff;
pub mod workspace;

#[cfg(test)]
pub mod tests;

#[cfg(test)]
pub mod test_utils;

pub use diff::{DiffEngine, GraphDiff};
pub use error::DevacError;
pub use graph::Graph;
pub use hash::{content_hash, resolve_repo_id, string_hash};
pub use ids::{generate, EntityId};
pub use model::{
    CrossRepoEdge, DiagnosticCategory, DiagnosticSeverity, DiagnosticSource, Edge, EdgeKind,
    Effect, EffectHeader, ExternalDependency, ExternalRef, ImportStyle, Language,
    ManifestPackage, Node, NodeKind, RepoManifest, RepoRegistration, RepoStatus, SendType,
    UnifiedDiagnostic, Visibility,
};
pub use workspace::{discover_workspace, hub_dir};
