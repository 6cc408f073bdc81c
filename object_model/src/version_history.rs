use std::collections::BTreeSet;

use hash::Ref;
use serde::{Deserialize, Serialize};

/// A single entry of the denormalized per-component DAG cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionParents {
    pub hash: Ref,
    pub parents: Vec<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrelated: Option<Ref>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub squashed: Vec<Ref>,
}

/// Denormalized DAG of `VersionParents` for a single component, plus a
/// memoization cache of "graph complete from this ref" marks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHistory {
    pub scope: String,
    pub name: String,
    pub versions: Vec<VersionParents>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub graph_complete_refs: BTreeSet<Ref>,
}

impl VersionHistory {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        VersionHistory {
            scope: scope.into(),
            name: name.into(),
            versions: Vec::new(),
            graph_complete_refs: BTreeSet::new(),
        }
    }

    /// Invariant (a): no two entries share a hash.
    pub fn has_duplicate_hashes(&self) -> bool {
        let mut seen = BTreeSet::new();
        for v in &self.versions {
            if !seen.insert(v.hash) {
                return true;
            }
        }
        false
    }

    pub fn entry(&self, hash: Ref) -> Option<&VersionParents> {
        self.versions.iter().find(|v| v.hash == hash)
    }

    pub fn contains(&self, hash: Ref) -> bool {
        self.entry(hash).is_some()
    }

    /// Insert or replace the entry for `hash`. Persisted `Version`s are
    /// immutable, but the cache entry describing their shape in the DAG can
    /// be appended as new versions are learned about.
    pub fn record(&mut self, entry: VersionParents) {
        if let Some(existing) = self.versions.iter_mut().find(|v| v.hash == entry.hash) {
            *existing = entry;
        } else {
            self.versions.push(entry);
        }
    }

    pub fn mark_graph_complete(&mut self, from: Ref) {
        self.graph_complete_refs.insert(from);
    }

    pub fn is_marked_graph_complete(&self, from: Ref) -> bool {
        self.graph_complete_refs.contains(&from)
    }
}
