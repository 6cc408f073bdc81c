use anyhow::Result;
use blobstore::Blobstore;
use hash::Ref;
use object_model::{Lane, ObjectRecord};

/// Loads and saves `Lane` records through a `Blobstore`.
///
/// Unlike every other record kind, a `Lane` is mutable and keyed by its own
/// stable `hash` field rather than the hash of its current bytes -- saving
/// an existing lane overwrites it in place (`Blobstore::put_at`) instead of
/// writing a new content-addressed entry.
pub struct LaneStore<'a> {
    blobstore: &'a dyn Blobstore,
}

impl<'a> LaneStore<'a> {
    pub fn new(blobstore: &'a dyn Blobstore) -> Self {
        LaneStore { blobstore }
    }

    /// Persists `lane` only if it is new or has unsaved changes, per its
    /// `is_new`/`has_changed` flags. Clears both flags on success.
    pub async fn save(&self, lane: &mut Lane) -> Result<Ref> {
        if !lane.is_new && !lane.has_changed {
            return Ok(lane.hash);
        }
        self.blobstore
            .put_at(lane.hash, ObjectRecord::Lane(lane.clone()))
            .await?;
        lane.is_new = false;
        lane.has_changed = false;
        Ok(lane.hash)
    }

    pub async fn load(&self, hash: Ref) -> Result<Option<Lane>> {
        Ok(self
            .blobstore
            .get(hash)
            .await?
            .and_then(|record| record.as_lane().cloned()))
    }
}
