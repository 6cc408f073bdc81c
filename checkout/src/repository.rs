//! Access to a component's `ModelComponent` index and `VersionHistory`
//! cache through a `Blobstore`.
//!
//! Both record kinds have process-wide singleton identity per `(scope,
//! name)` rather than being addressed by the hash of their own bytes: at
//! most one in-memory instance per process, loaded lazily. We give each a
//! deterministic synthetic `Ref` derived from its `(scope, name)`, and
//! persist through `Blobstore::put_at` the same way `lanes::LaneStore` does
//! for `Lane`'s stable-but-mutable identity.

use anyhow::Result;
use async_trait::async_trait;
use blobstore::Blobstore;
use hash::Ref;
use object_model::{FileTree, ModelComponent, ObjectRecord, Version, VersionHistory};

fn model_component_key(scope: &str, name: &str) -> Ref {
    Ref::of(format!("model-component:{scope}/{name}").as_bytes())
}

fn version_history_key(scope: &str, name: &str) -> Ref {
    Ref::of(format!("version-history:{scope}/{name}").as_bytes())
}

/// The engine's view onto the object model: component index lookups plus
/// plain content-addressed record reads.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn model_component(&self, scope: &str, name: &str) -> Result<Option<ModelComponent>>;
    async fn version_history(&self, scope: &str, name: &str) -> Result<Option<VersionHistory>>;
    async fn save_model_component(&self, component: &ModelComponent) -> Result<()>;
    async fn save_version_history(&self, history: &VersionHistory) -> Result<()>;
    async fn get_version(&self, r: Ref) -> Result<Option<Version>>;
    async fn get_file_tree(&self, r: Ref) -> Result<Option<FileTree>>;
    async fn get_source(&self, r: Ref) -> Result<Option<Vec<u8>>>;
}

pub struct BlobstoreRepository<'a> {
    blobstore: &'a dyn Blobstore,
}

impl<'a> BlobstoreRepository<'a> {
    pub fn new(blobstore: &'a dyn Blobstore) -> Self {
        BlobstoreRepository { blobstore }
    }
}

#[async_trait]
impl<'a> Repository for BlobstoreRepository<'a> {
    async fn model_component(&self, scope: &str, name: &str) -> Result<Option<ModelComponent>> {
        Ok(self
            .blobstore
            .get(model_component_key(scope, name))
            .await?
            .and_then(|r| r.as_model_component().cloned()))
    }

    async fn version_history(&self, scope: &str, name: &str) -> Result<Option<VersionHistory>> {
        Ok(self
            .blobstore
            .get(version_history_key(scope, name))
            .await?
            .and_then(|r| r.as_version_history().cloned()))
    }

    async fn save_model_component(&self, component: &ModelComponent) -> Result<()> {
        let key = model_component_key(&component.scope, &component.name);
        self.blobstore
            .put_at(key, ObjectRecord::ModelComponent(component.clone()))
            .await
    }

    async fn save_version_history(&self, history: &VersionHistory) -> Result<()> {
        let key = version_history_key(&history.scope, &history.name);
        self.blobstore
            .put_at(key, ObjectRecord::VersionHistory(history.clone()))
            .await
    }

    async fn get_version(&self, r: Ref) -> Result<Option<Version>> {
        Ok(self.blobstore.get(r).await?.and_then(|o| o.as_version().cloned()))
    }

    async fn get_file_tree(&self, r: Ref) -> Result<Option<FileTree>> {
        Ok(self
            .blobstore
            .get(r)
            .await?
            .and_then(|o| o.as_file_tree().cloned()))
    }

    async fn get_source(&self, r: Ref) -> Result<Option<Vec<u8>>> {
        Ok(self
            .blobstore
            .get(r)
            .await?
            .and_then(|o| o.as_source().map(|s| s.content.clone())))
    }
}
