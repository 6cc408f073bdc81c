//! The object model: the five-plus-one record kinds that make up a
//! component's content-addressed history, and the `ComponentId` that names
//! what they describe.

mod component_id;
mod file_tree;
mod lane;
mod model_component;
mod record;
mod version;
mod version_history;

pub use component_id::ComponentId;
pub use file_tree::{FileTree, Source};
pub use lane::{Lane, LaneComponent, LaneError, LaneLog, RESERVED_LANE_NAMES};
pub use model_component::ModelComponent;
pub use record::{CanonicalizeError, ObjectRecord};
pub use version::Version;
pub use version_history::{VersionHistory, VersionParents};
