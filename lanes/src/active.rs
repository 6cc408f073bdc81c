use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atomicwrites::{AllowOverwrite, AtomicFile};
use hash::Ref;

/// Tracks which lane (if any) is active for a workspace, persisted as a
/// single small file. When no lane is active the workspace is "on main"
/// and every component id participates in checkout unfiltered.
pub struct ActiveLanePointer {
    path: PathBuf,
}

impl ActiveLanePointer {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        ActiveLanePointer {
            path: workspace_root.as_ref().join(".active-lane"),
        }
    }

    pub fn get(&self) -> Result<Option<Ref>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let r: Ref = trimmed
            .parse()
            .with_context(|| format!("parsing active lane pointer {trimmed:?}"))?;
        Ok(Some(r))
    }

    pub fn set(&self, hash: Ref) -> Result<()> {
        self.write(&hash.to_string())
    }

    pub fn clear(&self) -> Result<()> {
        self.write("")
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let af = AtomicFile::new(&self.path, AllowOverwrite);
        af.write(|f| f.write_all(contents.as_bytes()))
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_active_lane() {
        let dir = tempfile::tempdir().unwrap();
        let pointer = ActiveLanePointer::new(dir.path());
        assert_eq!(pointer.get().unwrap(), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let pointer = ActiveLanePointer::new(dir.path());
        let h = Ref::of(b"lane");
        pointer.set(h).unwrap();
        assert_eq!(pointer.get().unwrap(), Some(h));
    }

    #[test]
    fn clear_returns_to_no_active_lane() {
        let dir = tempfile::tempdir().unwrap();
        let pointer = ActiveLanePointer::new(dir.path());
        pointer.set(Ref::of(b"lane")).unwrap();
        pointer.clear().unwrap();
        assert_eq!(pointer.get().unwrap(), None);
    }
}
