use anyhow::Result;
use async_trait::async_trait;
use hash::Ref;
use object_model::ObjectRecord;

/// Persist and load typed immutable records by hash.
///
/// Writes are atomic per record; a concurrent `put` of the same ref is safe
/// because two puts of the same logical record produce identical bytes
/// (last-writer-wins over identical bytes).
#[async_trait]
pub trait Blobstore: Send + Sync {
    /// Serialize canonically, hash, write if absent. Idempotent.
    async fn put(&self, record: ObjectRecord) -> Result<Ref>;

    /// Fails only on I/O; a missing record is `Ok(None)`, never an error.
    async fn get(&self, r: Ref) -> Result<Option<ObjectRecord>>;

    /// Write `record` keyed under the caller-supplied `r` rather than the
    /// hash of its own bytes, overwriting whatever was there before.
    ///
    /// Every record kind is content-addressed and immutable *except*
    /// `Lane`, which is a mutable record identified by a stable opaque
    /// hash. This method exists solely to support that one exception;
    /// ordinary records should always go through `put`.
    async fn put_at(&self, r: Ref, record: ObjectRecord) -> Result<()>;

    async fn has(&self, r: Ref) -> Result<bool> {
        Ok(self.get(r).await?.is_some())
    }
}

/// The external capability that stands in for "objects are available
/// remotely" -- transport is assumed available and out of scope here.
/// `fetch` returning `Ok(None)` means the remote genuinely doesn't have the
/// object -- this is the case `importMany` treats as "new component, not
/// an error".
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch(&self, r: Ref) -> Result<Option<ObjectRecord>>;
}

/// A `RemoteSource` with nothing behind it -- every fetch reports "not
/// found". Useful for tests and for workspaces with no configured remote.
pub struct NoRemote;

#[async_trait]
impl RemoteSource for NoRemote {
    async fn fetch(&self, _r: Ref) -> Result<Option<ObjectRecord>> {
        Ok(None)
    }
}
