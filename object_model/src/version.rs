use std::collections::BTreeMap;

use hash::Ref;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One point in a component's history.
///
/// `parents` is empty for the initial version, has one entry for a linear
/// tag, and two or more for a merge. `unrelated` and `squashed` carry no
/// ancestry semantics -- see `history` for how traversal treats them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub parents: Vec<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrelated: Option<Ref>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub squashed: Vec<Ref>,
    /// Ref of the `FileTree` record holding this version's files.
    pub files: Ref,
    /// Opaque extension payload, keyed by extension id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
    pub removed: bool,
}

impl Version {
    pub fn initial(files: Ref) -> Self {
        Version {
            parents: Vec::new(),
            unrelated: None,
            squashed: Vec::new(),
            files,
            config: BTreeMap::new(),
            removed: false,
        }
    }

    pub fn child_of(parent: Ref, files: Ref) -> Self {
        Version {
            parents: vec![parent],
            unrelated: None,
            squashed: Vec::new(),
            files,
            config: BTreeMap::new(),
            removed: false,
        }
    }

    pub fn is_initial(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() >= 2
    }

    pub fn config_value(&self, ext_id: &str) -> Option<&Value> {
        self.config.get(ext_id)
    }
}
