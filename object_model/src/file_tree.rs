use std::collections::BTreeMap;

use hash::Ref;
use serde::{Deserialize, Serialize};

/// A blob of file content, content-addressed: raw bytes, nothing else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(with = "bytes_as_base64")]
    pub content: Vec<u8>,
}

impl Source {
    pub fn new(content: Vec<u8>) -> Self {
        Source { content }
    }
}

/// A flat snapshot of a component's tracked files: relative path -> the
/// `Ref` of the `Source` record holding that file's content.
///
/// The spec's `files: Ref -> FileTree` models a component's file set as a
/// single tree reference; we resolve that reference to this flat map rather
/// than a recursive directory tree, since nothing in the checkout engine
/// needs directory-level sharing -- only whole-file diffing and
/// replacement. See DESIGN.md for this open-question resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTree {
    pub entries: BTreeMap<String, Ref>,
}

impl FileTree {
    pub fn new() -> Self {
        FileTree::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content_ref: Ref) -> Self {
        self.entries.insert(path.into(), content_ref);
        self
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

mod bytes_as_base64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        // Keep the on-disk form plain JSON-friendly (no raw binary in a
        // JSON string) while remaining byte-exact: an array of u8 is
        // deterministic and trivially canonical.
        bytes.to_vec().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Vec::<u8>::deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_tree_tracks_entries_by_path() {
        let r = Ref::of(b"hello");
        let tree = FileTree::new().with_file("src/lib.rs", r);
        assert_eq!(tree.entries.get("src/lib.rs"), Some(&r));
        assert_eq!(tree.paths().collect::<Vec<_>>(), vec!["src/lib.rs"]);
    }
}
