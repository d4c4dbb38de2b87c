//! Orchestration of incremental index updates.

pub mod registry;
pub mod updater;

pub use registry::{ChangeEvent, ChangeListener, ListenerRegistry};
pub use updater::{IndexUpdater, SearchSink};
