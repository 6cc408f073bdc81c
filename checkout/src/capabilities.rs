//! The external collaborators the checkout engine delegates to. The engine
//! is in-process-testable against fakes of these traits; a real CLI wires
//! in a filesystem-backed implementation.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use merge::MergeStrategy;
use object_model::ComponentId;

/// One component's resolved file set and config, ready to be written to
/// disk.
#[derive(Debug, Clone)]
pub struct ComponentWrite {
    pub id: ComponentId,
    pub files: BTreeMap<String, Vec<u8>>,
    pub config: BTreeMap<String, serde_json::Value>,
    pub has_conflicts: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WriteManyRequest {
    pub components: Vec<ComponentWrite>,
    pub skip_dependency_installation: bool,
    pub reset_config: bool,
    pub verbose: bool,
    pub skip_bitmap: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WriteManyOutcome {
    pub installation_error: Option<String>,
    pub compilation_error: Option<String>,
}

/// `writeMany`: the engine never touches the filesystem or a package
/// manager directly.
#[async_trait]
pub trait ComponentWriter: Send + Sync {
    async fn write_many(&self, request: WriteManyRequest) -> Result<WriteManyOutcome>;
}

/// `removeLocally`.
#[async_trait]
pub trait Remover: Send + Sync {
    async fn remove_locally(&self, ids: &[ComponentId], force: bool) -> Result<()>;
}

/// `promptMergeStrategy`: used only when the caller pre-set neither a
/// strategy nor `promptMergeOptions=false`.
#[async_trait]
pub trait MergePrompter: Send + Sync {
    async fn prompt_merge_strategy(&self) -> Result<MergeStrategy>;
}

/// Reads a tracked component's current on-disk file content -- the
/// `current` side of the three-way merge and the basis for "is this file
/// locally modified". Abstracted the same way as the write-back path so
/// tests never touch the real filesystem.
#[async_trait]
pub trait CurrentFiles: Send + Sync {
    async fn read(&self, id: &ComponentId, path: &str) -> Result<Option<Vec<u8>>>;
    async fn paths(&self, id: &ComponentId) -> Result<Vec<String>>;
}
