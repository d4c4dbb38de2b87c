//! The record indexing lock and its coordination service seam.

pub mod coordinator;
pub mod record_lock;

pub use coordinator::{Coordinator, CoordinatorError, MemoryCoordinator, NodeMeta, SessionId};
pub use record_lock::{LOCK_PATH, RecordLock, RecordLockConfig};
