//! Per-workspace session configuration, loaded once at startup from a TOML
//! file at the workspace root. Mirrors the repo-level config pattern seen
//! elsewhere in this codebase (a TOML-backed `RepoConfig`), scaled down to
//! what a single workspace checkout needs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "checkout.toml";

/// Process-wide user identity: loaded lazily from disk and passed
/// explicitly into lane creation rather than read from a process global.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub token: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    /// Name of the scope this workspace's components default to.
    pub default_scope: String,
    /// Whether `checkout` installs dependencies after a successful
    /// write-back unless overridden by `--skip-npm-install`.
    pub install_dependencies: bool,
    /// The workspace's currently recorded dependency version/range per
    /// package, keyed `"dependencies:pkg"` / `"peerDependencies:pkg"` --
    /// the flattened form of what `merge::merge_workspace_policy` calls
    /// `workspace_versions`.
    pub dependency_versions: BTreeMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            token: None,
            username: None,
            email: None,
            default_scope: String::new(),
            install_dependencies: true,
            dependency_versions: BTreeMap::new(),
        }
    }
}

impl SessionConfig {
    pub fn load(workspace_root: impl AsRef<Path>) -> Result<Self> {
        let path = Self::path(workspace_root);
        if !path.exists() {
            return Ok(SessionConfig::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    fn path(workspace_root: impl AsRef<Path>) -> PathBuf {
        workspace_root.as_ref().join(CONFIG_FILE_NAME)
    }

    /// Expands `dependency_versions` into the `(DepField, pkg) -> version`
    /// map `merge::merge_workspace_policy` expects.
    pub fn workspace_dependency_versions(&self) -> BTreeMap<(merge::DepField, String), String> {
        let mut out = BTreeMap::new();
        for (key, value) in &self.dependency_versions {
            let (field_str, pkg) = match key.split_once(':') {
                Some(parts) => parts,
                None => continue,
            };
            let field = match field_str {
                "dependencies" => merge::DepField::Dependencies,
                "peerDependencies" => merge::DepField::PeerDependencies,
                _ => continue,
            };
            out.insert((field, pkg.to_string()), value.clone());
        }
        out
    }
}
