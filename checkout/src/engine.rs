//! The checkout pipeline orchestrator: ties together target
//! resolution, per-component classification (`status.rs`), the three-way
//! file and config mergers (the `merge` crate), and the write-back/removal
//! capabilities (`capabilities.rs`) into one `CheckoutReport`.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Result};
use hash::Ref;
use merge::{ConfigMergeResult, DepField, LineMerger, MergeStrategy};
use object_model::{ComponentId, Lane, ModelComponent, Version};
use slog::{info, warn, Logger};
use workspace_index::{Bitmap, BitmapEntry};

use crate::capabilities::{ComponentWrite, ComponentWriter, CurrentFiles, MergePrompter, Remover, WriteManyRequest};
use crate::config_policy;
use crate::errors::{CheckoutFailure, CorruptionError};
use crate::props::{CheckoutProps, CheckoutTarget};
use crate::report::CheckoutReport;
use crate::repository::Repository;
use crate::status::{classify_component, ClassificationInputs, ComponentStatus};

/// Collaborators the pipeline needs beyond `CheckoutProps` and the bitmap,
/// bundled so `run_checkout` doesn't take a dozen positional arguments.
pub struct CheckoutContext<'a> {
    pub repository: &'a dyn Repository,
    pub blobstore: &'a dyn blobstore::Blobstore,
    pub remote: &'a dyn blobstore::RemoteSource,
    pub importer_cache: Option<&'a blobstore::ImporterCache>,
    pub active_lane: Option<&'a Lane>,
    pub current_files: &'a dyn CurrentFiles,
    pub writer: &'a dyn ComponentWriter,
    pub remover: &'a dyn Remover,
    pub merge_prompter: &'a dyn MergePrompter,
    pub line_merger: &'a dyn LineMerger,
    pub logger: &'a Logger,
    /// The workspace's currently recorded dependency range per `(field,
    /// pkg)` -- "ours" at the workspace level for `merge::merge_workspace_policy`.
    pub workspace_dependency_versions: &'a BTreeMap<(DepField, String), String>,
}

struct NeedsMergeWork {
    id: ComponentId,
    base_for_merge: Ref,
    target_version: Ref,
    outcome: merge::MergeOutcome,
}

/// Runs the full 11-step pipeline and returns the summary report. Mutates
/// `bitmap` in place (the caller persists it, e.g. via `workspace::BitmapStore`)
/// unless `props.skip_files_write` is set, in which case `bitmap` is left
/// untouched and the report describes what *would* have happened.
pub async fn run_checkout(
    props: &CheckoutProps,
    bitmap: &mut Bitmap,
    ctx: &CheckoutContext<'_>,
) -> Result<CheckoutReport> {
    props.validate()?;

    if let Some(cache) = ctx.importer_cache {
        cache.invalidate();
    }

    let mut target_ids: Vec<ComponentId> = if props.all {
        bitmap.entries().map(|(id, _)| id.clone()).collect()
    } else {
        props.ids.clone().unwrap_or_default()
    };
    target_ids.sort();
    target_ids.dedup();

    // Step 2: if a lane is active, narrow the request down to the
    // components it actually binds -- a lane never drives a component it
    // doesn't carry.
    if let Some(lane) = ctx.active_lane {
        let lane_ids: BTreeSet<ComponentId> =
            lane.components.iter().map(|c| c.id.without_version()).collect();
        target_ids.retain(|id| lane_ids.contains(&id.without_version()));
    }

    let mut report = CheckoutReport::default();

    // Step 3/4 inputs: resolve each id's target ref and gather the model
    // index entries needed for classification.
    struct Resolved {
        id: ComponentId,
        model: Option<ModelComponent>,
        history: Option<object_model::VersionHistory>,
        bitmap_entry: Option<BitmapEntry>,
        label: String,
        target_version: Option<Ref>,
    }

    let mut resolved = Vec::with_capacity(target_ids.len());
    let mut wanted_refs: BTreeSet<Ref> = BTreeSet::new();

    for id in &target_ids {
        let bare = id.without_version();
        let model = ctx.repository.model_component(&bare.scope, &bare.name).await?;
        let history = ctx.repository.version_history(&bare.scope, &bare.name).await?;
        let bitmap_entry = bitmap.get(&bare).cloned();

        if model.is_none() && bitmap_entry.is_some() {
            return Err(anyhow!(CorruptionError::Corrupt(
                bare.to_string(),
                "tracked component has no model index entry".to_string(),
            )));
        }

        let label = target_label(props, &bare);
        let target_version = resolve_target_ref(
            props,
            &bare,
            model.as_ref(),
            bitmap_entry.as_ref().map(|e| e.version),
            ctx.active_lane,
        );

        if let Some(r) = target_version {
            wanted_refs.insert(r);
        }
        if let Some(e) = &bitmap_entry {
            wanted_refs.insert(e.version);
        }

        resolved.push(Resolved {
            id: bare,
            model,
            history,
            bitmap_entry,
            label,
            target_version,
        });
    }

    // Step 5 (moved earlier): import anything we're about to read.
    let missing: Vec<Ref> = {
        let mut out = Vec::new();
        for r in &wanted_refs {
            if !ctx.blobstore.has(*r).await? {
                out.push(*r);
            }
        }
        out
    };
    if !missing.is_empty() {
        blobstore::import_many(&missing, ctx.blobstore, ctx.remote, ctx.importer_cache, ctx.logger).await?;
    }

    // Step 4: classify.
    let mut ready_plain: Vec<(ComponentId, Ref)> = Vec::new();
    let mut needs_merge_ids: Vec<(ComponentId, Ref, Ref)> = Vec::new();
    let mut should_remove: Vec<(ComponentId, Ref)> = Vec::new();

    for r in &resolved {
        let target_is_removed = match r.target_version {
            Some(t) => ctx
                .repository
                .get_version(t)
                .await?
                .map(|v| v.removed)
                .unwrap_or(false),
            None => false,
        };

        let merge_pending = match (&r.model, &r.history) {
            (Some(m), Some(h)) => history::is_merge_pending(h, m.head, m.remote_head),
            _ => false,
        };

        let locally_modified = is_locally_modified(ctx.current_files, &r.id, r.bitmap_entry.as_ref()).await?;

        let inputs = ClassificationInputs {
            tracked_version: r.bitmap_entry.as_ref().map(|e| e.version),
            unresolved_conflict: r.bitmap_entry.as_ref().map(|e| e.unresolved_conflict).unwrap_or(false),
            is_reset: matches!(props.target, CheckoutTarget::Reset),
            requested_label: r.label.clone(),
            target_version: r.target_version,
            target_is_removed,
            merge_pending,
            locally_modified,
        };

        match classify_component(&r.id, &inputs) {
            ComponentStatus::Failure(f) => report.failed.push(f),
            ComponentStatus::ShouldBeRemoved { target_version } => {
                should_remove.push((r.id.clone(), target_version))
            }
            ComponentStatus::ReadyPlain { target_version } => ready_plain.push((r.id.clone(), target_version)),
            ComponentStatus::NeedsMerge {
                base_version,
                target_version,
            } => needs_merge_ids.push((r.id.clone(), base_version, target_version)),
        }
    }

    // Step 6: three-way merge for everything that needs one. The special
    // base rule: when the target is an ancestor of the currently tracked
    // version -- i.e. this is a rollback -- merge against the target
    // itself as base rather than the old tracked version, so local edits
    // survive the rollback undiluted instead of being re-diffed against
    // content that's about to disappear anyway.
    let mut needs_merge_work = Vec::with_capacity(needs_merge_ids.len());
    for (id, base_version, target_version) in &needs_merge_ids {
        let history = resolved
            .iter()
            .find(|r| r.id == *id)
            .and_then(|r| r.history.as_ref());
        let is_rollback = history
            .map(|h| history::is_ref_part_of_history(h, *base_version, *target_version))
            .unwrap_or(false);
        let base_for_merge = if is_rollback { *target_version } else { *base_version };
        needs_merge_work.push((id.clone(), base_for_merge, *target_version));
    }

    let mut strategy = props.merge_strategy;
    let mut merged = merge_all(ctx, &needs_merge_work, strategy).await?;

    if merged.iter().any(|w| w.outcome.has_conflicts) && strategy.is_none() {
        if props.prompt_merge_options {
            strategy = Some(ctx.merge_prompter.prompt_merge_strategy().await?);
            merged = merge_all(ctx, &needs_merge_work, strategy).await?;
        } else {
            let offender = merged
                .iter()
                .find(|w| w.outcome.has_conflicts)
                .map(|w| w.id.to_string())
                .unwrap_or_default();
            return Err(anyhow!(
                "component {offender} has unresolved merge conflicts; rerun with a merge strategy"
            ));
        }
    }

    // Step 5b (config): aggregate dependency-field decisions across every
    // component that actually needed a merge.
    let mut config_entries = Vec::new();
    for work in &merged {
        let base_version_rec = ctx.repository.get_version(work.base_for_merge).await?;
        let target_version_rec = ctx
            .repository
            .get_version(work.target_version)
            .await?
            .ok_or_else(|| anyhow!(CorruptionError::Corrupt(work.target_version.to_string(), "missing".into())))?;
        let current_config = bitmap.get(&work.id).map(|e| e.config.clone()).unwrap_or_default();
        config_entries.extend(config_policy::component_dependency_entries(
            base_version_rec.as_ref(),
            &current_config,
            &target_version_rec,
        ));
    }
    let config_merge: Option<ConfigMergeResult> = if config_entries.is_empty() {
        None
    } else {
        Some(merge::merge_workspace_policy(ctx.workspace_dependency_versions, &config_entries))
    };

    // Step 7: apply. Build every component's final write, in deterministic
    // id order.
    let mut writes: Vec<ComponentWrite> = Vec::new();

    for (id, target_version) in &ready_plain {
        let (tree_refs, files) = load_component_tree_and_files(ctx.repository, *target_version).await?;
        let version_rec = ctx
            .repository
            .get_version(*target_version)
            .await?
            .ok_or_else(|| anyhow!(CorruptionError::Corrupt(target_version.to_string(), "missing".into())))?;
        writes.push(ComponentWrite {
            id: id.clone(),
            files,
            config: version_rec.config.clone(),
            has_conflicts: false,
        });
        if !props.skip_files_write {
            bitmap.set(
                id,
                BitmapEntry {
                    version: *target_version,
                    files: tree_refs,
                    config: version_rec.config,
                    new_on_main: false,
                    unresolved_conflict: false,
                },
            );
        }
        report.applied.push(id.clone());
    }

    for work in &merged {
        let target_version_rec = ctx
            .repository
            .get_version(work.target_version)
            .await?
            .ok_or_else(|| anyhow!(CorruptionError::Corrupt(work.target_version.to_string(), "missing".into())))?;

        let mut files = BTreeMap::new();
        let mut tree_refs = BTreeMap::new();
        for f in &work.outcome.files {
            tree_refs.insert(f.path.clone(), Ref::of(&f.result.content));
            files.insert(f.path.clone(), f.result.content.clone());
        }

        if work.outcome.has_conflicts {
            report.left_unresolved_conflicts = true;
        }

        writes.push(ComponentWrite {
            id: work.id.clone(),
            files,
            config: target_version_rec.config.clone(),
            has_conflicts: work.outcome.has_conflicts,
        });
        if !props.skip_files_write {
            bitmap.set(
                &work.id,
                BitmapEntry {
                    version: work.target_version,
                    files: tree_refs,
                    config: target_version_rec.config,
                    new_on_main: false,
                    unresolved_conflict: work.outcome.has_conflicts,
                },
            );
        }
        report.applied.push(work.id.clone());
    }

    // Step 8: new-from-lane. Only on `head`, only when not workspace-only,
    // and only for lane-bound components the bitmap doesn't track yet --
    // this is the condition under which `new_from_lane_added` ever
    // becomes true.
    if matches!(props.target, CheckoutTarget::Head) && !props.workspace_only {
        if let Some(lane) = ctx.active_lane {
            for bound in &lane.components {
                let bare = bound.id.without_version();
                if bitmap.get(&bare).is_some() || target_ids.iter().any(|t| *t == bare) {
                    continue;
                }
                if !ctx.blobstore.has(bound.head).await? {
                    blobstore::import_many(&[bound.head], ctx.blobstore, ctx.remote, ctx.importer_cache, ctx.logger)
                        .await?;
                }
                let (tree_refs, files) = load_component_tree_and_files(ctx.repository, bound.head).await?;
                let version_rec = ctx
                    .repository
                    .get_version(bound.head)
                    .await?
                    .ok_or_else(|| anyhow!(CorruptionError::Corrupt(bound.head.to_string(), "missing".into())))?;

                writes.push(ComponentWrite {
                    id: bare.clone(),
                    files,
                    config: version_rec.config.clone(),
                    has_conflicts: false,
                });
                if !props.skip_files_write {
                    bitmap.set(
                        &bare,
                        BitmapEntry {
                            version: bound.head,
                            files: tree_refs,
                            config: version_rec.config,
                            new_on_main: true,
                            unresolved_conflict: false,
                        },
                    );
                }
                report.new_from_lane.push(bare);
            }
            report.new_from_lane_added = !report.new_from_lane.is_empty();
        }
    }

    // Step 9: write-back.
    if !props.skip_files_write && !writes.is_empty() {
        let outcome = ctx
            .writer
            .write_many(WriteManyRequest {
                components: writes,
                skip_dependency_installation: props.skip_npm_install || report.left_unresolved_conflicts,
                reset_config: matches!(props.target, CheckoutTarget::Reset),
                verbose: props.verbose,
                skip_bitmap: false,
            })
            .await?;
        report.installation_error = outcome.installation_error;
        report.compilation_error = outcome.compilation_error;
    }

    // Step 10: remove.
    let remove_ids: Vec<ComponentId> = should_remove.iter().map(|(id, _)| id.clone()).collect();
    if !props.skip_files_write && !remove_ids.is_empty() {
        ctx.remover.remove_locally(&remove_ids, false).await?;
        for id in &remove_ids {
            bitmap.remove(id);
        }
    }
    report.removed.extend(remove_ids);

    if props.verbose {
        info!(ctx.logger, "checkout complete";
            "applied" => report.applied.len(),
            "removed" => report.removed.len(),
            "failed" => report.failed.len(),
        );
    }
    if let Some(cm) = &config_merge {
        if !cm.workspace_conflicts.is_empty() {
            warn!(ctx.logger, "workspace dependency conflicts require manual resolution";
                "count" => cm.workspace_conflicts.len());
        }
    }

    Ok(report)
}

async fn merge_all(
    ctx: &CheckoutContext<'_>,
    work: &[(ComponentId, Ref, Ref)],
    strategy: Option<MergeStrategy>,
) -> Result<Vec<NeedsMergeWork>> {
    let mut out = Vec::with_capacity(work.len());
    for (id, base_for_merge, target_version) in work {
        let (_, base_files) = load_component_tree_and_files(ctx.repository, *base_for_merge).await?;
        let (_, other_files) = load_component_tree_and_files(ctx.repository, *target_version).await?;
        let current_paths = ctx.current_files.paths(id).await?;

        let mut paths: BTreeSet<String> = base_files.keys().cloned().collect();
        paths.extend(other_files.keys().cloned());
        paths.extend(current_paths);

        let mut current_files = BTreeMap::new();
        for p in &paths {
            if let Some(bytes) = ctx.current_files.read(id, p).await? {
                current_files.insert(p.clone(), bytes);
            }
        }

        let outcome = merge::merge_component_files(
            paths.iter().map(|s| s.as_str()),
            |p| base_files.get(p).map(|v| v.as_slice()),
            |p| current_files.get(p).map(|v| v.as_slice()),
            |p| other_files.get(p).map(|v| v.as_slice()),
            strategy,
            ctx.line_merger,
        );

        out.push(NeedsMergeWork {
            id: id.clone(),
            base_for_merge: *base_for_merge,
            target_version: *target_version,
            outcome,
        });
    }
    Ok(out)
}

fn target_label(props: &CheckoutProps, bare: &ComponentId) -> String {
    if let Some(v) = props.version_per_id.get(bare) {
        return v.clone();
    }
    match &props.target {
        CheckoutTarget::Head => "head".to_string(),
        CheckoutTarget::Latest => "latest".to_string(),
        CheckoutTarget::Reset => "current".to_string(),
        CheckoutTarget::Literal(v) => v.clone(),
    }
}

fn resolve_target_ref(
    props: &CheckoutProps,
    bare: &ComponentId,
    model: Option<&ModelComponent>,
    tracked_version: Option<Ref>,
    active_lane: Option<&Lane>,
) -> Option<Ref> {
    if let Some(v) = props.version_per_id.get(bare) {
        return model.and_then(|m| m.tag(v)).or_else(|| v.parse::<Ref>().ok());
    }
    match &props.target {
        CheckoutTarget::Head => {
            if let Some(lane) = active_lane {
                if let Some(h) = lane.component_head(bare) {
                    return Some(h);
                }
            }
            model.map(|m| m.head_include_remote())
        }
        CheckoutTarget::Latest => model.and_then(|m| m.latest_version_if_exist()),
        CheckoutTarget::Reset => tracked_version,
        CheckoutTarget::Literal(v) => model.and_then(|m| m.tag(v)).or_else(|| v.parse::<Ref>().ok()),
    }
}

async fn is_locally_modified(
    current_files: &dyn CurrentFiles,
    id: &ComponentId,
    entry: Option<&BitmapEntry>,
) -> Result<bool> {
    let Some(entry) = entry else {
        return Ok(false);
    };
    let current_paths: BTreeSet<String> = current_files.paths(id).await?.into_iter().collect();
    let tracked_paths: BTreeSet<String> = entry.files.keys().cloned().collect();
    if current_paths != tracked_paths {
        return Ok(true);
    }
    for (path, expected) in &entry.files {
        let content = current_files.read(id, path).await?.unwrap_or_default();
        if Ref::of(&content) != *expected {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn load_component_tree_and_files(
    repo: &dyn Repository,
    version_ref: Ref,
) -> Result<(BTreeMap<String, Ref>, BTreeMap<String, Vec<u8>>)> {
    let version: Version = repo
        .get_version(version_ref)
        .await?
        .ok_or_else(|| anyhow!(CorruptionError::Corrupt(version_ref.to_string(), "version record missing".into())))?;
    let tree = repo
        .get_file_tree(version.files)
        .await?
        .ok_or_else(|| anyhow!(CorruptionError::Corrupt(version.files.to_string(), "file tree missing".into())))?;

    let mut files = BTreeMap::new();
    for (path, content_ref) in &tree.entries {
        let content = repo
            .get_source(*content_ref)
            .await?
            .ok_or_else(|| anyhow!(CorruptionError::Corrupt(content_ref.to_string(), "source missing".into())))?;
        files.insert(path.clone(), content);
    }
    Ok((tree.entries, files))
}
