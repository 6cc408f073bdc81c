//! Error taxonomy for the checkout engine. Validation and precondition
//! errors unwind immediately via `anyhow::Result`; per-component failures
//! accumulate in `CheckoutReport::failed` instead.

/// Impossible argument combinations. Fatal, surfaces at the edge.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid checkout arguments: {0}")]
    ConflictingArguments(String),
}

/// Not in a workspace; during-merge; merge-pending at the operation
/// level. Fatal, never swallowed.
#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    #[error("not inside a workspace")]
    NotInWorkspace,
    #[error("component {0} is in a during-merge state; resolve it before continuing")]
    DuringMerge(String),
}

/// Hash mismatch on load, parse failure of a persisted record. Always
/// fatal; the message points at the reset recovery path.
#[derive(Debug, thiserror::Error)]
pub enum CorruptionError {
    #[error("corrupt record at {0}: {1} -- run `checkout reset` to recover")]
    Corrupt(String, String),
}

/// A per-component failure. Non-fatal: collected into
/// `CheckoutReport::failed` rather than aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutFailure {
    pub id: object_model::ComponentId,
    pub reason: String,
    pub legitimate: bool,
}
