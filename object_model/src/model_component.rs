use std::collections::BTreeMap;

use hash::Ref;
use serde::{Deserialize, Serialize};

/// Per-component head pointer and tag map -- the entry point into a
/// component's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelComponent {
    pub scope: String,
    pub name: String,
    /// Current local main head.
    pub head: Ref,
    /// The latest head known from a remote, if one has been fetched. Used
    /// for merge-pending detection; see DESIGN.md.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_head: Option<Ref>,
    /// Immutable once written: tag name -> Ref.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Ref>,
}

impl ModelComponent {
    pub fn new(scope: impl Into<String>, name: impl Into<String>, head: Ref) -> Self {
        ModelComponent {
            scope: scope.into(),
            name: name.into(),
            head,
            remote_head: None,
            tags: BTreeMap::new(),
        }
    }

    /// The ref `checkout head` resolves to: the local head always wins,
    /// since it is guaranteed to exist; `remote_head` is informational only
    /// here and consulted elsewhere for merge-pending detection.
    pub fn head_include_remote(&self) -> Ref {
        self.head
    }

    /// The `Ref` of the tag with the greatest semver value, if any tag
    /// parses as valid semver.
    pub fn latest_version_if_exist(&self) -> Option<Ref> {
        self.tags
            .iter()
            .filter_map(|(tag, r)| semver::Version::parse(tag).ok().map(|v| (v, *r)))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, r)| r)
    }

    pub fn tag(&self, name: &str) -> Option<Ref> {
        self.tags.get(name).copied()
    }
}
