use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atomicwrites::{AllowOverwrite, AtomicFile};

use crate::bitmap::Bitmap;

/// Persists the Bitmap as a single workspace file, written atomically
/// (write-temp+rename), the same pattern as `lanes::ActiveLanePointer`.
pub struct BitmapStore {
    path: PathBuf,
}

impl BitmapStore {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        BitmapStore {
            path: workspace_root.as_ref().join(".bitmap.json"),
        }
    }

    pub fn load(&self) -> Result<Bitmap> {
        if !self.path.exists() {
            return Ok(Bitmap::new());
        }
        let contents = std::fs::read(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let bitmap = serde_json::from_slice(&contents)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(bitmap)
    }

    pub fn save(&self, bitmap: &Bitmap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let serialized = serde_json::to_vec_pretty(bitmap).context("serializing bitmap")?;
        let af = AtomicFile::new(&self.path, AllowOverwrite);
        af.write(|f| f.write_all(&serialized))
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::BitmapEntry;
    use hash::Ref;
    use object_model::ComponentId;

    #[test]
    fn missing_file_loads_as_empty_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        let store = BitmapStore::new(dir.path());
        let bitmap = store.load().unwrap();
        assert!(bitmap.entries().next().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BitmapStore::new(dir.path());

        let mut bitmap = Bitmap::new();
        let id = ComponentId::new("org", "button");
        bitmap.set(&id, BitmapEntry::new(Ref::of(b"v1")));
        store.save(&bitmap).unwrap();

        let reloaded = store.load().unwrap();
        assert!(reloaded.get_bit_id(&id, true).is_some());
    }
}
