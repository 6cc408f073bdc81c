use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a component, optionally pinned to a version (a `Ref` or a tag
/// name -- callers resolve which one it is).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId {
    pub scope: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ComponentId {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        ComponentId {
            scope: scope.into(),
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Two ids are "equal without version" when scope+name match.
    pub fn eq_without_version(&self, other: &ComponentId) -> bool {
        self.scope == other.scope && self.name == other.name
    }

    /// Strip the version, for use as a map key by identity.
    pub fn without_version(&self) -> ComponentId {
        ComponentId {
            scope: self.scope.clone(),
            name: self.name.clone(),
            version: None,
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)?;
        if let Some(v) = &self.version {
            write!(f, "@{v}")?;
        }
        Ok(())
    }
}
