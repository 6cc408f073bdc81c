//! End-to-end scenarios for the checkout pipeline, run against an
//! in-memory blobstore and a fake in-memory workspace instead of touching
//! the filesystem.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use blobstore::{Blobstore, ImporterCache, MemBlobstore, NoRemote};
use checkout::{
    BlobstoreRepository, CheckoutContext, CheckoutProps, CheckoutTarget, ComponentWriter, CurrentFiles,
    MergePrompter, Remover, WriteManyOutcome, WriteManyRequest,
};
use hash::Ref;
use merge::{Diff3LineMerger, MergeStrategy};
use object_model::{
    ComponentId, FileTree, Lane, LaneComponent, LaneLog, ModelComponent, ObjectRecord, Source, Version, VersionHistory,
    VersionParents,
};
use workspace_index::{Bitmap, BitmapEntry};

#[derive(Default)]
struct FakeWorkspace {
    files: Mutex<BTreeMap<ComponentId, BTreeMap<String, Vec<u8>>>>,
    removed: Mutex<Vec<ComponentId>>,
}

impl FakeWorkspace {
    fn set_files(&self, id: &ComponentId, files: BTreeMap<String, Vec<u8>>) {
        self.files.lock().unwrap().insert(id.clone(), files);
    }

    fn files_of(&self, id: &ComponentId) -> BTreeMap<String, Vec<u8>> {
        self.files.lock().unwrap().get(id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CurrentFiles for FakeWorkspace {
    async fn read(&self, id: &ComponentId, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.files.lock().unwrap().get(id).and_then(|f| f.get(path).cloned()))
    }

    async fn paths(&self, id: &ComponentId) -> anyhow::Result<Vec<String>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(id)
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ComponentWriter for FakeWorkspace {
    async fn write_many(&self, request: WriteManyRequest) -> anyhow::Result<WriteManyOutcome> {
        let mut files = self.files.lock().unwrap();
        for component in request.components {
            files.insert(component.id, component.files);
        }
        Ok(WriteManyOutcome::default())
    }
}

#[async_trait]
impl Remover for FakeWorkspace {
    async fn remove_locally(&self, ids: &[ComponentId], _force: bool) -> anyhow::Result<()> {
        let mut files = self.files.lock().unwrap();
        for id in ids {
            files.remove(id);
        }
        self.removed.lock().unwrap().extend(ids.iter().cloned());
        Ok(())
    }
}

struct AlwaysManual;

#[async_trait]
impl MergePrompter for AlwaysManual {
    async fn prompt_merge_strategy(&self) -> anyhow::Result<MergeStrategy> {
        Ok(MergeStrategy::Manual)
    }
}

async fn put_source(store: &MemBlobstore, content: &[u8]) -> Ref {
    store.put(ObjectRecord::Source(Source::new(content.to_vec()))).await.unwrap()
}

async fn put_tree(store: &MemBlobstore, entries: &[(&str, Ref)]) -> Ref {
    let mut tree = FileTree::new();
    for (path, r) in entries {
        tree = tree.with_file(*path, *r);
    }
    store.put(ObjectRecord::FileTree(tree)).await.unwrap()
}

async fn put_version(store: &MemBlobstore, version: Version) -> Ref {
    store.put(ObjectRecord::Version(version)).await.unwrap()
}

fn bare(name: &str) -> ComponentId {
    ComponentId::new("org", name)
}

struct Fixture {
    store: MemBlobstore,
    workspace: FakeWorkspace,
    importer_cache: ImporterCache,
    logger: slog::Logger,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            store: MemBlobstore::new(),
            workspace: FakeWorkspace::default(),
            importer_cache: ImporterCache::new(),
            logger: slog::Logger::root(slog::Discard, slog::o!()),
        }
    }

    async fn run(&self, props: &CheckoutProps, bitmap: &mut Bitmap) -> anyhow::Result<checkout::CheckoutReport> {
        self.run_with_lane(props, bitmap, None).await
    }

    async fn run_with_lane(
        &self,
        props: &CheckoutProps,
        bitmap: &mut Bitmap,
        active_lane: Option<&Lane>,
    ) -> anyhow::Result<checkout::CheckoutReport> {
        let repository = BlobstoreRepository::new(&self.store);
        let remote = NoRemote;
        let prompter = AlwaysManual;
        let line_merger = Diff3LineMerger;
        let deps = BTreeMap::new();
        let ctx = CheckoutContext {
            repository: &repository,
            blobstore: &self.store,
            remote: &remote,
            importer_cache: Some(&self.importer_cache),
            active_lane,
            current_files: &self.workspace,
            writer: &self.workspace,
            remover: &self.workspace,
            merge_prompter: &prompter,
            line_merger: &line_merger,
            logger: &self.logger,
            workspace_dependency_versions: &deps,
        };
        checkout::run_checkout(props, bitmap, &ctx).await
    }
}

fn fake_lane(components: &[(&ComponentId, Ref)]) -> Lane {
    Lane {
        name: "feature".to_string(),
        scope: "org".to_string(),
        hash: Ref::of(b"lane:org/feature"),
        log: LaneLog {
            date: chrono::Utc::now(),
            username: "tester".to_string(),
            email: "tester@example.com".to_string(),
            profile_image: None,
        },
        components: components
            .iter()
            .map(|(id, head)| LaneComponent { id: (*id).clone(), head: *head })
            .collect(),
        readme_component: None,
        forked_from: None,
        is_new: false,
        has_changed: false,
    }
}

fn props_for(id: ComponentId, target: CheckoutTarget) -> CheckoutProps {
    CheckoutProps {
        target,
        ids: Some(vec![id]),
        all: false,
        merge_strategy: None,
        prompt_merge_options: false,
        workspace_only: false,
        skip_files_write: false,
        version_per_id: BTreeMap::new(),
        skip_npm_install: true,
        verbose: false,
    }
}

#[tokio::test]
async fn clean_switch_to_a_later_tagged_version() {
    let fx = Fixture::new();
    let id = bare("button");

    let src1 = put_source(&fx.store, b"hello v1\n").await;
    let tree1 = put_tree(&fx.store, &[("index.js", src1)]).await;
    let v1 = put_version(&fx.store, Version::initial(tree1)).await;

    let src2 = put_source(&fx.store, b"hello v2\n").await;
    let tree2 = put_tree(&fx.store, &[("index.js", src2)]).await;
    let v2 = put_version(&fx.store, Version::child_of(v1, tree2)).await;

    let mut model = ModelComponent::new("org", "button", v2);
    model.tags.insert("2.0.0".into(), v2);
    fx.store.put_at(Ref::of(b"model-component:org/button"), ObjectRecord::ModelComponent(model)).await.unwrap();

    let mut bitmap = Bitmap::new();
    let mut entry = BitmapEntry::new(v1);
    entry.files.insert("index.js".to_string(), src1);
    bitmap.set(&id, entry);
    fx.workspace.set_files(&id, BTreeMap::from([("index.js".to_string(), b"hello v1\n".to_vec())]));

    let props = props_for(id.clone(), CheckoutTarget::Literal("2.0.0".to_string()));
    let report = fx.run(&props, &mut bitmap).await.unwrap();

    assert_eq!(report.applied, vec![id.clone()]);
    assert!(report.failed.is_empty());
    assert_eq!(fx.workspace.files_of(&id).get("index.js").unwrap(), b"hello v2\n");
    assert_eq!(bitmap.get(&id).unwrap().version, v2);
}

#[tokio::test]
async fn rollback_to_an_ancestor_preserves_local_edits_without_conflict() {
    let fx = Fixture::new();
    let id = bare("button");

    let src1 = put_source(&fx.store, b"line one\n").await;
    let tree1 = put_tree(&fx.store, &[("index.js", src1)]).await;
    let v1 = put_version(&fx.store, Version::initial(tree1)).await;

    let src2 = put_source(&fx.store, b"line two\n").await;
    let tree2 = put_tree(&fx.store, &[("index.js", src2)]).await;
    let v2 = put_version(&fx.store, Version::child_of(v1, tree2)).await;

    let mut model = ModelComponent::new("org", "button", v2);
    model.tags.insert("1.0.0".into(), v1);
    fx.store.put_at(Ref::of(b"model-component:org/button"), ObjectRecord::ModelComponent(model)).await.unwrap();

    let mut history = VersionHistory::new("org", "button");
    history.record(VersionParents { hash: v1, parents: vec![], unrelated: None, squashed: vec![] });
    history.record(VersionParents { hash: v2, parents: vec![v1], unrelated: None, squashed: vec![] });
    fx.store
        .put_at(Ref::of(b"version-history:org/button"), ObjectRecord::VersionHistory(history))
        .await
        .unwrap();

    let mut bitmap = Bitmap::new();
    let mut entry = BitmapEntry::new(v2);
    entry.files.insert("index.js".to_string(), src2);
    bitmap.set(&id, entry);
    // Local edit: the workspace no longer matches the tracked v2 content.
    fx.workspace.set_files(&id, BTreeMap::from([("index.js".to_string(), b"line two, modified locally\n".to_vec())]));

    let props = props_for(id.clone(), CheckoutTarget::Literal("1.0.0".to_string()));
    let report = fx.run(&props, &mut bitmap).await.unwrap();

    assert_eq!(report.applied, vec![id.clone()]);
    assert!(!report.left_unresolved_conflicts);
    assert_eq!(
        fx.workspace.files_of(&id).get("index.js").unwrap(),
        b"line two, modified locally\n"
    );
    assert_eq!(bitmap.get(&id).unwrap().version, v1);
}

#[tokio::test]
async fn reset_discards_local_modifications() {
    let fx = Fixture::new();
    let id = bare("button");

    let src1 = put_source(&fx.store, b"tracked content\n").await;
    let tree1 = put_tree(&fx.store, &[("index.js", src1)]).await;
    let v1 = put_version(&fx.store, Version::initial(tree1)).await;

    let model = ModelComponent::new("org", "button", v1);
    fx.store.put_at(Ref::of(b"model-component:org/button"), ObjectRecord::ModelComponent(model)).await.unwrap();

    let mut bitmap = Bitmap::new();
    let mut entry = BitmapEntry::new(v1);
    entry.files.insert("index.js".to_string(), src1);
    bitmap.set(&id, entry);
    fx.workspace.set_files(&id, BTreeMap::from([("index.js".to_string(), b"locally broken\n".to_vec())]));

    let props = props_for(id.clone(), CheckoutTarget::Reset);
    let report = fx.run(&props, &mut bitmap).await.unwrap();

    assert_eq!(report.applied, vec![id.clone()]);
    assert_eq!(fx.workspace.files_of(&id).get("index.js").unwrap(), b"tracked content\n");
}

#[tokio::test]
async fn checkout_of_unknown_version_is_a_hard_failure() {
    let fx = Fixture::new();
    let id = bare("button");

    let src1 = put_source(&fx.store, b"v1\n").await;
    let tree1 = put_tree(&fx.store, &[("index.js", src1)]).await;
    let v1 = put_version(&fx.store, Version::initial(tree1)).await;

    let model = ModelComponent::new("org", "button", v1);
    fx.store.put_at(Ref::of(b"model-component:org/button"), ObjectRecord::ModelComponent(model)).await.unwrap();

    let mut bitmap = Bitmap::new();
    let mut entry = BitmapEntry::new(v1);
    entry.files.insert("index.js".to_string(), src1);
    bitmap.set(&id, entry);

    let props = props_for(id.clone(), CheckoutTarget::Literal("9.9.9".to_string()));
    let report = fx.run(&props, &mut bitmap).await.unwrap();

    assert!(report.applied.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert!(!report.failed[0].legitimate);
    assert!(report.failed[0].reason.contains("doesn't have version"));
}

#[tokio::test]
async fn checking_out_a_removed_version_removes_the_component_locally() {
    let fx = Fixture::new();
    let id = bare("button");

    let src1 = put_source(&fx.store, b"v1\n").await;
    let tree1 = put_tree(&fx.store, &[("index.js", src1)]).await;
    let v1 = put_version(&fx.store, Version::initial(tree1)).await;

    let mut removed_version = Version::child_of(v1, tree1);
    removed_version.removed = true;
    let v2 = put_version(&fx.store, removed_version).await;

    let mut model = ModelComponent::new("org", "button", v2);
    model.tags.insert("2.0.0".into(), v2);
    fx.store.put_at(Ref::of(b"model-component:org/button"), ObjectRecord::ModelComponent(model)).await.unwrap();

    let mut bitmap = Bitmap::new();
    let mut entry = BitmapEntry::new(v1);
    entry.files.insert("index.js".to_string(), src1);
    bitmap.set(&id, entry);
    fx.workspace.set_files(&id, BTreeMap::from([("index.js".to_string(), b"v1\n".to_vec())]));

    let props = props_for(id.clone(), CheckoutTarget::Literal("2.0.0".to_string()));
    let report = fx.run(&props, &mut bitmap).await.unwrap();

    assert_eq!(report.removed, vec![id.clone()]);
    assert!(fx.workspace.files_of(&id).is_empty());
    assert!(bitmap.get(&id).is_none());
}

#[tokio::test]
async fn head_with_active_lane_moves_tracked_components_and_adds_new_ones() {
    let fx = Fixture::new();
    let id_a = bare("a");
    let id_b = bare("b");

    // `a` is already tracked at v_a1; the lane's head for it is v_a2.
    let src_a1 = put_source(&fx.store, b"a v1\n").await;
    let tree_a1 = put_tree(&fx.store, &[("index.js", src_a1)]).await;
    let v_a1 = put_version(&fx.store, Version::initial(tree_a1)).await;

    let src_a2 = put_source(&fx.store, b"a v2\n").await;
    let tree_a2 = put_tree(&fx.store, &[("index.js", src_a2)]).await;
    let v_a2 = put_version(&fx.store, Version::child_of(v_a1, tree_a2)).await;

    let model_a = ModelComponent::new("org", "a", v_a2);
    fx.store.put_at(Ref::of(b"model-component:org/a"), ObjectRecord::ModelComponent(model_a)).await.unwrap();

    let mut bitmap = Bitmap::new();
    let mut entry_a = BitmapEntry::new(v_a1);
    entry_a.files.insert("index.js".to_string(), src_a1);
    bitmap.set(&id_a, entry_a);
    fx.workspace.set_files(&id_a, BTreeMap::from([("index.js".to_string(), b"a v1\n".to_vec())]));

    // `b` is new: it exists in the lane but the workspace has never tracked
    // it, so it's a pure new-from-lane addition.
    let src_b1 = put_source(&fx.store, b"b v1\n").await;
    let tree_b1 = put_tree(&fx.store, &[("readme.md", src_b1)]).await;
    let v_b1 = put_version(&fx.store, Version::initial(tree_b1)).await;

    let lane = fake_lane(&[(&id_a, v_a2), (&id_b, v_b1)]);

    let props = CheckoutProps {
        target: CheckoutTarget::Head,
        ids: None,
        all: true,
        merge_strategy: None,
        prompt_merge_options: false,
        workspace_only: false,
        skip_files_write: false,
        version_per_id: BTreeMap::new(),
        skip_npm_install: true,
        verbose: false,
    };
    let report = fx.run_with_lane(&props, &mut bitmap, Some(&lane)).await.unwrap();

    assert_eq!(report.applied, vec![id_a.clone()]);
    assert_eq!(fx.workspace.files_of(&id_a).get("index.js").unwrap(), b"a v2\n");
    assert_eq!(bitmap.get(&id_a).unwrap().version, v_a2);

    assert_eq!(report.new_from_lane, vec![id_b.clone()]);
    assert!(report.new_from_lane_added);
    assert_eq!(fx.workspace.files_of(&id_b).get("readme.md").unwrap(), b"b v1\n");
    assert_eq!(bitmap.get(&id_b).unwrap().version, v_b1);
    assert!(bitmap.get(&id_b).unwrap().new_on_main);
}
