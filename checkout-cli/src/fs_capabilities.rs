//! Filesystem-backed implementations of the checkout engine's external
//! capabilities (`checkout::capabilities`). Each tracked component lives
//! under `<workspace_root>/<scope>/<name>/`; write-back uses the same
//! write-temp-then-rename discipline as `lanes::ActiveLanePointer` and
//! `workspace::BitmapStore`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use atomicwrites::{AllowOverwrite, AtomicFile};
use checkout::{ComponentWriter, CurrentFiles, MergePrompter, Remover, WriteManyOutcome, WriteManyRequest};
use merge::MergeStrategy;
use object_model::ComponentId;
use std::io::Write;

pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl AsRef<Path>) -> Self {
        FsWorkspace {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn component_dir(&self, id: &ComponentId) -> PathBuf {
        self.root.join(&id.scope).join(&id.name)
    }
}

#[async_trait]
impl ComponentWriter for FsWorkspace {
    async fn write_many(&self, request: WriteManyRequest) -> Result<WriteManyOutcome> {
        for component in &request.components {
            let dir = self.component_dir(&component.id);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;

            for (path, content) in &component.files {
                let full = dir.join(path);
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                let af = AtomicFile::new(&full, AllowOverwrite);
                af.write(|f| f.write_all(content))
                    .with_context(|| format!("writing {}", full.display()))?;
            }
        }

        // Dependency installation and build verification are delegated to
        // the host's package manager/compiler out of process; neither is
        // modeled here.
        let _ = request.skip_dependency_installation;
        Ok(WriteManyOutcome::default())
    }
}

#[async_trait]
impl Remover for FsWorkspace {
    async fn remove_locally(&self, ids: &[ComponentId], _force: bool) -> Result<()> {
        for id in ids {
            let dir = self.component_dir(id);
            if dir.exists() {
                std::fs::remove_dir_all(&dir)
                    .with_context(|| format!("removing {}", dir.display()))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CurrentFiles for FsWorkspace {
    async fn read(&self, id: &ComponentId, path: &str) -> Result<Option<Vec<u8>>> {
        let full = self.component_dir(id).join(path);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", full.display())),
        }
    }

    async fn paths(&self, id: &ComponentId) -> Result<Vec<String>> {
        let dir = self.component_dir(id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        walk(&dir, &dir, &mut out)?;
        Ok(out)
    }
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, out)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .expect("walked path is under root")
                .to_string_lossy()
                .replace('\\', "/");
            out.push(relative);
        }
    }
    Ok(())
}

/// Non-interactive default: a CI or scripted invocation that hits an
/// unresolved conflict without `--manual`/`--ours`/`--theirs` and without a
/// TTY to prompt on should fail rather than hang, so this always resolves
/// to manual (conflict markers on disk, left for the user to fix by hand).
pub struct NonInteractivePrompter;

#[async_trait]
impl MergePrompter for NonInteractivePrompter {
    async fn prompt_merge_strategy(&self) -> Result<MergeStrategy> {
        Ok(MergeStrategy::Manual)
    }
}
