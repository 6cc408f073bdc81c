use hash::Ref;
use serde::{Deserialize, Serialize};

use crate::file_tree::{FileTree, Source};
use crate::lane::Lane;
use crate::model_component::ModelComponent;
use crate::version::Version;
use crate::version_history::VersionHistory;

/// The sealed sum of every record kind that can live in the object store.
/// Each variant is serialized deterministically; a record's `Ref` is the
/// sha1 of its canonical bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ObjectRecord {
    Version(Version),
    ModelComponent(ModelComponent),
    Lane(Lane),
    VersionHistory(VersionHistory),
    FileTree(FileTree),
    Source(Source),
}

#[derive(Debug, thiserror::Error)]
pub enum CanonicalizeError {
    #[error("failed to serialize record: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ObjectRecord {
    /// Canonical byte form: deterministic JSON plus a trailing newline.
    /// Field order follows struct definition order; every map field in
    /// this crate is a `BTreeMap`/`BTreeSet`, so key order is always
    /// sorted -- together these make serialization byte-for-byte
    /// reproducible, which is the concrete mechanism behind the hash
    /// integrity invariant.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalizeError> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// The `Ref` this record would be stored under: sha1 of its canonical
    /// bytes.
    pub fn hash(&self) -> Result<Ref, CanonicalizeError> {
        Ok(Ref::of(&self.canonical_bytes()?))
    }

    pub fn as_version(&self) -> Option<&Version> {
        match self {
            ObjectRecord::Version(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_model_component(&self) -> Option<&ModelComponent> {
        match self {
            ObjectRecord::ModelComponent(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_lane(&self) -> Option<&Lane> {
        match self {
            ObjectRecord::Lane(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_version_history(&self) -> Option<&VersionHistory> {
        match self {
            ObjectRecord::VersionHistory(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_file_tree(&self) -> Option<&FileTree> {
        match self {
            ObjectRecord::FileTree(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_source(&self) -> Option<&Source> {
        match self {
            ObjectRecord::Source(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_record_hashes_to_same_ref() {
        let v = ObjectRecord::Version(Version::initial(Ref::of(b"tree")));
        assert_eq!(v.hash().unwrap(), v.hash().unwrap());
    }

    #[test]
    fn different_records_hash_differently() {
        let a = ObjectRecord::Version(Version::initial(Ref::of(b"tree-a")));
        let b = ObjectRecord::Version(Version::initial(Ref::of(b"tree-b")));
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn round_trips_through_canonical_bytes() {
        let v = ObjectRecord::Source(Source::new(b"hi".to_vec()));
        let bytes = v.canonical_bytes().unwrap();
        assert!(bytes.ends_with(b"\n"));
        let parsed: ObjectRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, v);
    }
}
