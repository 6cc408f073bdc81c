//! `componentStatusBeforeMergeAttempt`: the per-component state machine,
//! expressed as a pure function over already-resolved facts so it can be
//! tested without touching the object store or the filesystem.

use hash::Ref;
use object_model::ComponentId;

use crate::errors::CheckoutFailure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentStatus {
    Failure(CheckoutFailure),
    ShouldBeRemoved { target_version: Ref },
    ReadyPlain { target_version: Ref },
    NeedsMerge { base_version: Ref, target_version: Ref },
}

/// Everything `classify_component` needs, already resolved by the engine's
/// I/O-bearing steps (model/history lookups, target resolution, on-disk
/// modification check).
#[derive(Debug, Clone)]
pub struct ClassificationInputs {
    /// `None` when this id isn't currently tracked by the bitmap -- the
    /// "new component" state.
    pub tracked_version: Option<Ref>,
    pub unresolved_conflict: bool,
    pub is_reset: bool,
    /// Human label for error messages (e.g. "1.2.3", "latest").
    pub requested_label: String,
    /// `None` when the requested target couldn't be resolved to a Ref at
    /// all (unknown tag / not a valid hash / no tags exist for `latest`).
    pub target_version: Option<Ref>,
    pub target_is_removed: bool,
    pub merge_pending: bool,
    pub locally_modified: bool,
}

pub fn classify_component(id: &ComponentId, inputs: &ClassificationInputs) -> ComponentStatus {
    let fail = |reason: &str, legitimate: bool| {
        ComponentStatus::Failure(CheckoutFailure {
            id: id.clone(),
            reason: reason.to_string(),
            legitimate,
        })
    };

    let Some(tracked) = inputs.tracked_version else {
        return fail("new component, no version to checkout", true);
    };

    if inputs.unresolved_conflict {
        return fail("in during-merge state, please resolve", false);
    }

    if inputs.is_reset {
        if !inputs.locally_modified {
            return fail("not modified", true);
        }
        return ComponentStatus::ReadyPlain {
            target_version: tracked,
        };
    }

    let Some(target_version) = inputs.target_version else {
        return fail(
            &format!("doesn't have version {}", inputs.requested_label),
            false,
        );
    };

    if inputs.merge_pending {
        return fail("merge-pending; run status", false);
    }

    if inputs.target_is_removed {
        return ComponentStatus::ShouldBeRemoved { target_version };
    }

    if target_version == tracked {
        let reason = if inputs.requested_label == "latest" {
            "already at latest".to_string()
        } else {
            format!("already at version {}", inputs.requested_label)
        };
        return fail(&reason, true);
    }

    if !inputs.locally_modified {
        return ComponentStatus::ReadyPlain { target_version };
    }

    ComponentStatus::NeedsMerge {
        base_version: tracked,
        target_version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ComponentId {
        ComponentId::new("org", "button")
    }

    fn base_inputs() -> ClassificationInputs {
        ClassificationInputs {
            tracked_version: Some(Ref::of(b"v1")),
            unresolved_conflict: false,
            is_reset: false,
            requested_label: "1.1.0".to_string(),
            target_version: Some(Ref::of(b"v2")),
            target_is_removed: false,
            merge_pending: false,
            locally_modified: false,
        }
    }

    #[test]
    fn untracked_component_fails_legitimately_as_new() {
        let mut inputs = base_inputs();
        inputs.tracked_version = None;
        let status = classify_component(&id(), &inputs);
        match status {
            ComponentStatus::Failure(f) => assert!(f.legitimate),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn during_merge_state_refuses_even_reset() {
        let mut inputs = base_inputs();
        inputs.unresolved_conflict = true;
        inputs.is_reset = true;
        let status = classify_component(&id(), &inputs);
        match status {
            ComponentStatus::Failure(f) => assert!(!f.legitimate),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn reset_unmodified_is_legitimate_noop() {
        let mut inputs = base_inputs();
        inputs.is_reset = true;
        inputs.locally_modified = false;
        let status = classify_component(&id(), &inputs);
        match status {
            ComponentStatus::Failure(f) => {
                assert!(f.legitimate);
                assert_eq!(f.reason, "not modified");
            }
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn reset_modified_is_ready_plain() {
        let mut inputs = base_inputs();
        inputs.is_reset = true;
        inputs.locally_modified = true;
        let status = classify_component(&id(), &inputs);
        assert_eq!(
            status,
            ComponentStatus::ReadyPlain {
                target_version: Ref::of(b"v1")
            }
        );
    }

    #[test]
    fn unresolvable_target_is_hard_failure() {
        let mut inputs = base_inputs();
        inputs.target_version = None;
        let status = classify_component(&id(), &inputs);
        match status {
            ComponentStatus::Failure(f) => {
                assert!(!f.legitimate);
                assert!(f.reason.contains("doesn't have version"));
            }
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn merge_pending_is_hard_failure() {
        let mut inputs = base_inputs();
        inputs.merge_pending = true;
        let status = classify_component(&id(), &inputs);
        match status {
            ComponentStatus::Failure(f) => assert!(!f.legitimate),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn removed_target_should_be_removed() {
        let mut inputs = base_inputs();
        inputs.target_is_removed = true;
        let status = classify_component(&id(), &inputs);
        assert_eq!(
            status,
            ComponentStatus::ShouldBeRemoved {
                target_version: Ref::of(b"v2")
            }
        );
    }

    #[test]
    fn same_version_is_legitimate_already_at() {
        let mut inputs = base_inputs();
        inputs.target_version = Some(Ref::of(b"v1"));
        let status = classify_component(&id(), &inputs);
        match status {
            ComponentStatus::Failure(f) => {
                assert!(f.legitimate);
                assert!(f.reason.contains("already at version"));
            }
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn same_version_with_latest_label_reports_already_at_latest() {
        let mut inputs = base_inputs();
        inputs.requested_label = "latest".to_string();
        inputs.target_version = Some(Ref::of(b"v1"));
        let status = classify_component(&id(), &inputs);
        match status {
            ComponentStatus::Failure(f) => assert_eq!(f.reason, "already at latest"),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn unmodified_non_reset_is_ready_plain() {
        let inputs = base_inputs();
        let status = classify_component(&id(), &inputs);
        assert_eq!(
            status,
            ComponentStatus::ReadyPlain {
                target_version: Ref::of(b"v2")
            }
        );
    }

    #[test]
    fn modified_non_reset_needs_merge() {
        let mut inputs = base_inputs();
        inputs.locally_modified = true;
        let status = classify_component(&id(), &inputs);
        assert_eq!(
            status,
            ComponentStatus::NeedsMerge {
                base_version: Ref::of(b"v1"),
                target_version: Ref::of(b"v2")
            }
        );
    }
}
