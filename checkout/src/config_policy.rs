//! Bridges a component's `Version.config` dependency fields into the
//! workspace-level config merger. `Version.config` is an opaque
//! `ext-id -> json` payload; the two recognized extension ids here are
//! `dependencies` and `peerDependencies`.

use std::collections::BTreeMap;

use merge::{DepField, DependencyEntry};
use object_model::Version;
use serde_json::Value;

fn dep_map(version: &Version, ext_id: &str) -> BTreeMap<String, String> {
    version
        .config_value(ext_id)
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Per-package classification of a single component's dependency field
/// across base (old tracked version), current (what the bitmap already
/// records), and other (the new target version) -- the same four-way
/// shape as `merge::merge_file`, at package-entry granularity instead of
/// line granularity.
fn entries_for_field(
    field: DepField,
    base: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
    other: &BTreeMap<String, String>,
) -> Vec<DependencyEntry> {
    let mut pkgs: std::collections::BTreeSet<&String> =
        base.keys().chain(current.keys()).chain(other.keys()).collect();
    pkgs = pkgs.into_iter().collect();

    let mut out = Vec::new();
    for pkg in pkgs {
        let b = base.get(pkg);
        let c = current.get(pkg);
        let o = other.get(pkg);

        let (ours, theirs, merged_clean) = match (b, c, o) {
            (_, Some(c), Some(o)) if Some(c) == b => (c.clone(), o.clone(), true),
            (_, Some(c), Some(o)) if Some(o) == b => (c.clone(), c.clone(), true),
            (_, Some(c), Some(o)) if c == o => (c.clone(), c.clone(), true),
            (_, Some(c), Some(o)) => (c.clone(), o.clone(), false),
            (_, Some(c), None) => (c.clone(), c.clone(), true),
            (_, None, Some(o)) => (o.clone(), o.clone(), true),
            (_, None, None) => continue,
        };

        out.push(DependencyEntry {
            field,
            pkg: pkg.clone(),
            ours,
            theirs,
            force: false,
            merged_clean,
        });
    }
    out
}

/// All dependency-field entries for one component's checkout, ready to
/// feed into `merge::merge_workspace_policy` alongside every other
/// component's.
pub fn component_dependency_entries(
    base: Option<&Version>,
    current_config: &std::collections::BTreeMap<String, Value>,
    other: &Version,
) -> Vec<DependencyEntry> {
    let base_deps = base.map(|v| dep_map(v, "dependencies")).unwrap_or_default();
    let base_peer = base
        .map(|v| dep_map(v, "peerDependencies"))
        .unwrap_or_default();

    let current_deps: BTreeMap<String, String> = current_config
        .get("dependencies")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();
    let current_peer: BTreeMap<String, String> = current_config
        .get("peerDependencies")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let other_deps = dep_map(other, "dependencies");
    let other_peer = dep_map(other, "peerDependencies");

    let mut entries = entries_for_field(DepField::Dependencies, &base_deps, &current_deps, &other_deps);
    entries.extend(entries_for_field(
        DepField::PeerDependencies,
        &base_peer,
        &current_peer,
        &other_peer,
    ));
    entries
}
