//! Entity identifiers — content-addressed, not insertion-order derived.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::NodeKind;

/// Primary key for a [`Node`](crate::model::Node).
///
/// Built as `{repo_id}:{package_path}:{kind}:{scope_hash}`. Two parses of the
/// same file produce the same `EntityId`; the hash never depends on
/// insertion order, so it survives being recomputed across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the `unresolved:<callee>` stub target used by parsers before a
    /// resolution pass runs.
    pub fn unresolved(name: &str) -> Self {
        EntityId(format!("unresolved:{name}"))
    }

    pub fn is_unresolved(&self) -> bool {
        self.0.starts_with("unresolved:")
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the scope hash segment of an `EntityId` from the enclosing-scope
/// chain and symbol name, then assemble the full ID.
///
/// `generate` is a pure function: no I/O, no reliance on insertion order.
/// Collision resistance within a package comes from folding the file's
/// relative path into the scope hash, per §4.1's contract.
pub fn generate(
    repo_id: &str,
    package_path: &str,
    kind: NodeKind,
    relative_path: &str,
    scope_chain: &[&str],
    name: &str,
) -> EntityId {
    let mut scope_input = String::new();
    scope_input.push_str(relative_path);
    for scope in scope_chain {
        scope_input.push_str("::");
        scope_input.push_str(scope);
    }
    scope_input.push_str("::");
    scope_input.push_str(name);
    let scope_hash = crate::hash::string_hash(&scope_input);
    EntityId(format!(
        "{repo_id}:{package_path}:{kind:?}:{scope_hash}",
        kind = kind
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_is_deterministic() {
        let a = generate("r", "pkg", NodeKind::Function, "src/a.ts", &[], "helper");
        let b = generate("r", "pkg", NodeKind::Function, "src/a.ts", &[], "helper");
        assert_eq!(a, b);
    }

    #[test]
    fn generate_varies_with_name() {
        let a = generate("r", "pkg", NodeKind::Function, "src/a.ts", &[], "helper");
        let b = generate("r", "pkg", NodeKind::Function, "src/a.ts", &[], "other");
        assert_ne!(a, b);
    }

    #[test]
    fn generate_varies_with_path() {
        let a = generate("r", "pkg", NodeKind::Function, "src/a.ts", &[], "helper");
        let b = generate("r", "pkg", NodeKind::Function, "src/b.ts", &[], "helper");
        assert_ne!(a, b, "renaming the file must yield a different id");
    }

    #[test]
    fn unresolved_roundtrip() {
        let id = EntityId::unresolved("a.b.c");
        assert!(id.is_unresolved());
        assert_eq!(id.as_str(), "unresolved:a.b.c");
    }
}
