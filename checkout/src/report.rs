//! `CheckoutReport`: the summary returned at the end of a checkout
//! operation.

use object_model::ComponentId;

use crate::errors::CheckoutFailure;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutReport {
    pub applied: Vec<ComponentId>,
    pub removed: Vec<ComponentId>,
    pub failed: Vec<CheckoutFailure>,
    pub left_unresolved_conflicts: bool,
    pub new_from_lane: Vec<ComponentId>,
    pub new_from_lane_added: bool,
    pub installation_error: Option<String>,
    pub compilation_error: Option<String>,
}

impl CheckoutReport {
    /// 0 on success, 1 on any per-component failure that isn't a
    /// legitimate no-op, or on unresolved conflicts left behind. Invalid
    /// argument combinations are surfaced before a report even exists.
    pub fn exit_code(&self) -> i32 {
        let has_hard_failure = self.failed.iter().any(|f| !f.legitimate);
        if has_hard_failure || self.left_unresolved_conflicts {
            1
        } else {
            0
        }
    }
}
