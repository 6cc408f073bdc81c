//! `CheckoutProps` and the checkout target.

use std::collections::BTreeMap;

use merge::MergeStrategy;
use object_model::ComponentId;

use crate::errors::ValidationError;

/// Exactly one of `Head`, `Latest`, `Reset`, `Literal` is selected per
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutTarget {
    Head,
    Latest,
    Reset,
    Literal(String),
}

#[derive(Debug, Clone)]
pub struct CheckoutProps {
    pub target: CheckoutTarget,
    pub ids: Option<Vec<ComponentId>>,
    pub all: bool,
    pub merge_strategy: Option<MergeStrategy>,
    pub prompt_merge_options: bool,
    pub workspace_only: bool,
    pub skip_files_write: bool,
    /// Per-id target override: authoritative for matched ids, `target`
    /// governs the rest.
    pub version_per_id: BTreeMap<ComponentId, String>,
    pub skip_npm_install: bool,
    pub verbose: bool,
}

impl CheckoutProps {
    /// Step 1 ("Parse"): `ids` or `all` but not both; refuse
    /// `workspaceOnly` unless `head`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (&self.ids, self.all) {
            (Some(_), true) => {
                return Err(ValidationError::ConflictingArguments(
                    "both `ids` and `all` were set".into(),
                ))
            }
            (None, false) => {
                return Err(ValidationError::ConflictingArguments(
                    "neither `ids` nor `all` was set".into(),
                ))
            }
            _ => {}
        }

        if self.workspace_only && self.target != CheckoutTarget::Head {
            return Err(ValidationError::ConflictingArguments(
                "`workspaceOnly` is only valid with target `head`".into(),
            ));
        }

        Ok(())
    }
}
