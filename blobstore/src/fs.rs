use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use atomicwrites::{AllowOverwrite, AtomicFile};
use hash::Ref;
use object_model::ObjectRecord;

use crate::errors::CorruptionError;
use crate::traits::Blobstore;

/// On-disk object store: one file per record, named by hash, grouped under
/// a two-character prefix directory. Writes go through `atomicwrites`
/// (write-temp + rename) so a crash mid-write never leaves a partial file
/// at the final path.
pub struct FsBlobstore {
    root: PathBuf,
}

impl FsBlobstore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsBlobstore { root: root.into() }
    }

    fn path_for(&self, r: Ref) -> PathBuf {
        self.root.join(r.shard_prefix()).join(r.to_string())
    }
}

#[async_trait]
impl Blobstore for FsBlobstore {
    async fn put(&self, record: ObjectRecord) -> Result<Ref> {
        let r = record.hash()?;
        let path = self.path_for(r);
        if path.exists() {
            return Ok(r);
        }
        let bytes = record.canonical_bytes()?;
        let dir = path
            .parent()
            .expect("object path always has a shard-prefix parent")
            .to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating shard directory {}", dir.display()))?;
        let path_for_write = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path_for_write, &bytes))
            .await
            .context("atomic write task panicked")??;
        Ok(r)
    }

    async fn get(&self, r: Ref) -> Result<Option<ObjectRecord>> {
        let path = self.path_for(r);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading object {r} from {}", path.display()))?;
        let actual = Ref::of(&bytes);
        if actual != r {
            return Err(CorruptionError::HashMismatch {
                expected: r,
                actual,
            }
            .into());
        }
        let record: ObjectRecord = serde_json::from_slice(&bytes)
            .map_err(|_| CorruptionError::ParseFailure(r))?;
        Ok(Some(record))
    }

    async fn put_at(&self, r: Ref, record: ObjectRecord) -> Result<()> {
        let path = self.path_for(r);
        let bytes = record.canonical_bytes()?;
        let dir = path
            .parent()
            .expect("object path always has a shard-prefix parent")
            .to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating shard directory {}", dir.display()))?;
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .context("atomic write task panicked")??;
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let af = AtomicFile::new(path, AllowOverwrite);
    af.write(|f| f.write_all(bytes))
        .with_context(|| format!("atomically writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_model::Version;

    #[tokio::test]
    async fn put_then_get_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobstore::new(dir.path());
        let record = ObjectRecord::Version(Version::initial(Ref::of(b"tree")));
        let r = store.put(record.clone()).await.unwrap();
        assert_eq!(store.get(r).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn records_are_sharded_by_hash_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobstore::new(dir.path());
        let record = ObjectRecord::Version(Version::initial(Ref::of(b"shard-me")));
        let r = store.put(record).await.unwrap();
        assert!(dir.path().join(r.shard_prefix()).join(r.to_string()).exists());
    }

    #[tokio::test]
    async fn detects_hash_mismatch_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobstore::new(dir.path());
        let record = ObjectRecord::Version(Version::initial(Ref::of(b"corrupt-me")));
        let r = store.put(record).await.unwrap();
        let path = store.path_for(r);
        tokio::fs::write(&path, b"{\"tampered\":true}\n").await.unwrap();
        let err = store.get(r).await.unwrap_err();
        assert!(err.downcast_ref::<CorruptionError>().is_some());
    }
}
