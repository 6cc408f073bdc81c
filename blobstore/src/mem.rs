use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use hash::Ref;
use object_model::ObjectRecord;

use crate::traits::Blobstore;

/// In-process object store, matching the `memblob` pattern used throughout
/// this codebase's dev-dependencies. Useful for tests and for the `Tmp`
/// scratch stores the checkout engine creates per merge.
#[derive(Default)]
pub struct MemBlobstore {
    records: Mutex<HashMap<Ref, ObjectRecord>>,
}

impl MemBlobstore {
    pub fn new() -> Self {
        MemBlobstore::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("mem blobstore lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Blobstore for MemBlobstore {
    async fn put(&self, record: ObjectRecord) -> Result<Ref> {
        let r = record.hash()?;
        let mut records = self.records.lock().expect("mem blobstore lock poisoned");
        records.entry(r).or_insert(record);
        Ok(r)
    }

    async fn get(&self, r: Ref) -> Result<Option<ObjectRecord>> {
        let records = self.records.lock().expect("mem blobstore lock poisoned");
        Ok(records.get(&r).cloned())
    }

    async fn put_at(&self, r: Ref, record: ObjectRecord) -> Result<()> {
        let mut records = self.records.lock().expect("mem blobstore lock poisoned");
        records.insert(r, record);
        Ok(())
    }
}
