use hash::Ref;

/// Corruption is always fatal: a hash mismatch on load, or a parse failure
/// of a persisted record. The message always points at the recovery path.
#[derive(Debug, thiserror::Error)]
pub enum CorruptionError {
    #[error(
        "object {expected} is corrupt: stored bytes hash to {actual} instead; run \
         `checkout reset` to recover"
    )]
    HashMismatch { expected: Ref, actual: Ref },
    #[error("object {0} is corrupt: failed to parse record; run `checkout reset` to recover")]
    ParseFailure(Ref),
}
