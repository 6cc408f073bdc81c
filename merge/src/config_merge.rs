//! Workspace dependency-policy merge: field-wise merge of
//! `{dependencies, peerDependencies}` across all per-component merge
//! results, promoted to a single workspace-level decision per package.

use std::collections::{BTreeMap, BTreeSet};

use semver::{Version, VersionReq};

/// The two recognized dependency fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DepField {
    Dependencies,
    PeerDependencies,
}

/// One package's outcome from a single component's three-way merge, as fed
/// into the two-pass workspace aggregation.
#[derive(Debug, Clone)]
pub struct DependencyEntry {
    pub field: DepField,
    pub pkg: String,
    /// The workspace's currently recorded version/range string for `pkg`.
    pub ours: String,
    /// The incoming version/range string from the side being merged in.
    pub theirs: String,
    /// Auto-detected (`false`) vs. explicitly forced by the caller.
    pub force: bool,
    /// Whether this component's merge of this one package was clean.
    pub merged_clean: bool,
}

/// The general ours/theirs decision table, used to classify a single
/// package's change as a clean update, a no-op, a conflict, or
/// unclassifiable (not valid semver on one side -- "likely a snap hash").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyDecision {
    Update(String),
    NoUpdate,
    Conflict,
    Skip,
}

enum Kind {
    Version(Version),
    Range(VersionReq),
}

fn parse_kind(s: &str) -> Option<Kind> {
    if let Ok(v) = Version::parse(s) {
        return Some(Kind::Version(v));
    }
    if let Ok(r) = VersionReq::parse(s) {
        return Some(Kind::Range(r));
    }
    None
}

/// A representative minimum version implied by a range, read off its first
/// comparator. Ranges with no comparators (`*`) have no meaningful minimum.
fn range_min(req: &VersionReq) -> Option<Version> {
    let c = req.comparators.first()?;
    Some(Version::new(c.major, c.minor.unwrap_or(0), c.patch.unwrap_or(0)))
}

/// Classify a single `(ours, theirs)` pair per the decision table above.
pub fn classify(ours: &str, theirs: &str) -> DependencyDecision {
    let (Some(ours_kind), Some(theirs_kind)) = (parse_kind(ours), parse_kind(theirs)) else {
        return DependencyDecision::Skip;
    };

    match (ours_kind, theirs_kind) {
        (Kind::Version(ov), Kind::Version(tv)) => {
            if tv > ov {
                DependencyDecision::Conflict
            } else {
                DependencyDecision::NoUpdate
            }
        }
        (Kind::Range(or), Kind::Range(tr)) => match (range_min(&or), range_min(&tr)) {
            (Some(om), Some(tm)) if tm > om => DependencyDecision::Update(theirs.to_string()),
            _ => DependencyDecision::NoUpdate,
        },
        (Kind::Range(or), Kind::Version(tv)) => {
            if or.matches(&tv) {
                DependencyDecision::Update(theirs.to_string())
            } else {
                match range_min(&or) {
                    Some(om) if om > tv => DependencyDecision::Conflict,
                    _ => DependencyDecision::NoUpdate,
                }
            }
        }
        (Kind::Version(ov), Kind::Range(tr)) => {
            if tr.matches(&ov) {
                // `theirs` already covers our pinned version; adopt it.
                // Preserving "ours' range prefix" doesn't apply here since
                // `ours` parsed as a bare version, not a prefixed range.
                DependencyDecision::Update(theirs.to_string())
            } else {
                match range_min(&tr) {
                    Some(tm) if tm > ov => DependencyDecision::NoUpdate,
                    _ => DependencyDecision::Conflict,
                }
            }
        }
    }
}

/// Literal `CONFLICT::<ours>::<theirs>` wire encoding for a workspace config
/// entry that couldn't be resolved automatically.
pub fn encode_conflict(ours: &str, theirs: &str) -> String {
    format!("CONFLICT::{ours}::{theirs}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceUpdate {
    pub field: DepField,
    pub pkg: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConflict {
    pub field: DepField,
    pub pkg: String,
    pub ours: String,
    pub theirs: String,
}

impl WorkspaceConflict {
    pub fn encoded(&self) -> String {
        encode_conflict(&self.ours, &self.theirs)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConfigMergeResult {
    pub updates: Vec<WorkspaceUpdate>,
    pub workspace_conflicts: Vec<WorkspaceConflict>,
    /// Conflicts that could not be promoted because more than one distinct
    /// `(ours, theirs)` tuple was seen for the same package across
    /// components; these remain per-component only.
    pub unpromoted_conflicts: BTreeMap<(DepField, String), BTreeSet<(String, String)>>,
}

/// `workspace_versions` is the workspace's current recorded version/range
/// per `(field, pkg)`, i.e. "ours" at the workspace level.
pub fn merge_workspace_policy(
    workspace_versions: &BTreeMap<(DepField, String), String>,
    entries: &[DependencyEntry],
) -> ConfigMergeResult {
    let mut non_conflicting: BTreeMap<(DepField, String), BTreeSet<String>> = BTreeMap::new();
    let mut conflicting: BTreeMap<(DepField, String), BTreeSet<(String, String)>> =
        BTreeMap::new();

    for e in entries {
        let key = (e.field, e.pkg.clone());
        if !e.force && e.merged_clean {
            non_conflicting
                .entry(key.clone())
                .or_default()
                .insert(e.theirs.clone());
        }
        if !e.merged_clean {
            conflicting
                .entry(key)
                .or_default()
                .insert((e.ours.clone(), e.theirs.clone()));
        }
    }

    let mut result = ConfigMergeResult::default();

    for (key, workspace_version) in workspace_versions {
        if let Some(versions) = non_conflicting.get(key) {
            if versions.len() == 1 {
                let v = versions.iter().next().unwrap();
                if v != workspace_version {
                    result.updates.push(WorkspaceUpdate {
                        field: key.0,
                        pkg: key.1.clone(),
                        from: workspace_version.clone(),
                        to: v.clone(),
                    });
                }
            }
        }

        if let Some(tuples) = conflicting.get(key) {
            if tuples.len() == 1 {
                let (ours, theirs) = tuples.iter().next().unwrap().clone();
                let compatible = match (VersionReq::parse(&ours), Version::parse(&theirs)) {
                    (Ok(range), Ok(version)) => range.matches(&version),
                    // Not valid semver on one side: can't prove
                    // compatibility, so it stays a workspace conflict.
                    _ => false,
                };
                if !compatible {
                    result.workspace_conflicts.push(WorkspaceConflict {
                        field: key.0,
                        pkg: key.1.clone(),
                        ours,
                        theirs,
                    });
                }
                // Promoted either way: dropped from the per-component set.
            } else if tuples.len() > 1 {
                result
                    .unpromoted_conflicts
                    .insert(key.clone(), tuples.clone());
            }
        }
    }

    result
}
