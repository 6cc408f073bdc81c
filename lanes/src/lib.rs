//! Lane persistence, active-lane tracking, and the cross-cutting
//! `isFullyMerged` query. The `Lane` record itself and its pure,
//! data-only algebra (`create`/`add_component`/`validate`/...) live in
//! `object_model`; this crate is the layer that talks to the object
//! store and to `history`.

mod active;
mod merged;
mod store;

pub use active::ActiveLanePointer;
pub use merged::is_fully_merged;
pub use store::LaneStore;
