//! The dependency graph walker.

pub mod context;
pub mod follow;
pub mod walker;

pub use context::{Dep, WalkContext};
pub use follow::FollowCallback;
pub use walker::{IndexEntry, build_index_entry};
