//! The workspace Bitmap: the persistent mapping of tracked, version-less
//! component ids to their currently checked-out version, file set, and
//! config, mutated only by checkout, write, and removal operations.

use std::collections::BTreeMap;

use hash::Ref;
use object_model::ComponentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmapEntry {
    pub version: Ref,
    pub files: BTreeMap<String, Ref>,
    pub config: BTreeMap<String, serde_json::Value>,
    /// Flipped by `makeComponentsAvailableOnMain` when exiting a lane.
    #[serde(default)]
    pub new_on_main: bool,
    /// Set when a prior checkout left conflict markers on disk that were
    /// never resolved; classification refuses a further checkout (including
    /// `reset`) until this is cleared, surfacing the "in during-merge
    /// state, please resolve" failure reason.
    #[serde(default)]
    pub unresolved_conflict: bool,
}

impl BitmapEntry {
    pub fn new(version: Ref) -> Self {
        BitmapEntry {
            version,
            files: BTreeMap::new(),
            config: BTreeMap::new(),
            new_on_main: false,
            unresolved_conflict: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    entries: BTreeMap<ComponentId, BitmapEntry>,
}

impl Bitmap {
    pub fn new() -> Self {
        Bitmap::default()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ComponentId, &BitmapEntry)> {
        self.entries.iter()
    }

    pub fn get(&self, id: &ComponentId) -> Option<&BitmapEntry> {
        self.entries.get(&id.without_version())
    }

    /// `getBitId`: resolve `id` against the tracked entries. When
    /// `ignore_version` is false and `id` carries a version, the lookup
    /// only succeeds if that version matches what's currently tracked.
    /// Returns the canonical, version-stamped id of the tracked entry.
    pub fn get_bit_id(&self, id: &ComponentId, ignore_version: bool) -> Option<ComponentId> {
        let key = id.without_version();
        let entry = self.entries.get(&key)?;

        if !ignore_version {
            if let Some(requested) = &id.version {
                if requested.as_str() != entry.version.to_string() {
                    return None;
                }
            }
        }

        Some(key.with_version(entry.version.to_string()))
    }

    pub fn set(&mut self, id: &ComponentId, entry: BitmapEntry) {
        self.entries.insert(id.without_version(), entry);
    }

    pub fn remove(&mut self, id: &ComponentId) -> Option<BitmapEntry> {
        self.entries.remove(&id.without_version())
    }

    /// `makeComponentsAvailableOnMain`: flips the per-entry flag used when
    /// exiting a lane. Ids with no tracked entry are silently ignored.
    pub fn make_components_available_on_main(&mut self, ids: &[ComponentId]) {
        for id in ids {
            if let Some(entry) = self.entries.get_mut(&id.without_version()) {
                entry.new_on_main = true;
            }
        }
    }
}
