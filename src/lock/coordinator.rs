//! Coordination service seam.
//!
//! The record lock stores its state in an external coordination service
//! (ZooKeeper-like): ephemeral, session-scoped nodes created atomically at
//! a path, readable with ownership metadata, deletable. The [`Coordinator`]
//! trait captures exactly the operations the lock needs; the
//! [`MemoryCoordinator`] is an in-process implementation for tests and
//! single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

/// Identifier of a coordination session. Ephemeral nodes belong to the
/// session that created them.
pub type SessionId = u64;

/// Errors of individual coordination operations.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// `create_ephemeral` found the path already taken.
    #[error("node already exists")]
    NodeExists,
    /// The operation may or may not have been applied; the caller should
    /// retry and re-verify actual state.
    #[error("connection loss: {0}")]
    ConnectionLoss(String),
    /// Non-retryable protocol failure.
    #[error("coordination failure: {0}")]
    Failure(String),
}

/// Metadata of a coordination node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMeta {
    /// The session that owns the (ephemeral) node.
    pub owner_session: SessionId,
}

/// The coordination service operations the record lock is built on.
pub trait Coordinator: Send + Sync {
    /// Atomically create an ephemeral node at `path` carrying `data`.
    /// Fails with [`CoordinatorError::NodeExists`] if the path is taken.
    fn create_ephemeral(&self, path: &str, data: &[u8]) -> Result<(), CoordinatorError>;

    /// Read a node's data and metadata; `None` if the node does not exist.
    fn get_data(&self, path: &str) -> Result<Option<(Vec<u8>, NodeMeta)>, CoordinatorError>;

    /// Delete the node at `path` if it exists.
    fn delete(&self, path: &str) -> Result<(), CoordinatorError>;

    /// The id of this handle's session.
    fn session_id(&self) -> SessionId;

    /// Whether the calling thread is the one servicing this coordinator's
    /// notification callbacks. Blocking on the lock from that thread would
    /// deadlock the session, so the lock fails fast when this is true.
    fn is_event_thread(&self) -> bool {
        false
    }
}

const RETRY_DELAY: Duration = Duration::from_millis(20);

/// Run a coordination operation, retrying across transient connection loss
/// until it resolves.
///
/// Mirrors the discipline the lock requires of every network call: after a
/// connection loss the outcome of the last attempt is unknown, so the
/// operation is re-issued and the caller re-verifies actual state from the
/// data it returns.
pub fn retry_operation<T>(
    mut operation: impl FnMut() -> Result<T, CoordinatorError>,
) -> Result<T, CoordinatorError> {
    loop {
        match operation() {
            Err(CoordinatorError::ConnectionLoss(reason)) => {
                tracing::warn!(%reason, "coordination operation interrupted, retrying");
                thread::sleep(RETRY_DELAY);
            }
            other => return other,
        }
    }
}

#[derive(Debug)]
struct Node {
    data: Vec<u8>,
    owner_session: SessionId,
}

#[derive(Debug, Default)]
struct SharedState {
    nodes: Mutex<HashMap<String, Node>>,
    next_session: AtomicU64,
}

/// An in-process coordination service.
///
/// All handles derived with [`new_session`](MemoryCoordinator::new_session)
/// share one node table but act as distinct sessions, so several parties
/// (worker threads, a rebuild job) can contend for the same locks inside
/// one process.
#[derive(Debug, Clone)]
pub struct MemoryCoordinator {
    state: Arc<SharedState>,
    session: SessionId,
}

impl MemoryCoordinator {
    /// Create a coordination service with one initial session.
    pub fn new() -> Self {
        let state = Arc::new(SharedState::default());
        state.next_session.store(2, Ordering::SeqCst);
        MemoryCoordinator { state, session: 1 }
    }

    /// Derive a handle with a fresh session over the same node table.
    pub fn new_session(&self) -> Self {
        MemoryCoordinator {
            state: self.state.clone(),
            session: self.state.next_session.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Drop every ephemeral node owned by this handle's session, as the
    /// real service would on session expiry.
    pub fn expire_session(&self) {
        self.state
            .nodes
            .lock()
            .retain(|_, node| node.owner_session != self.session);
    }
}

impl Default for MemoryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator for MemoryCoordinator {
    fn create_ephemeral(&self, path: &str, data: &[u8]) -> Result<(), CoordinatorError> {
        let mut nodes = self.state.nodes.lock();
        if nodes.contains_key(path) {
            return Err(CoordinatorError::NodeExists);
        }
        nodes.insert(
            path.to_string(),
            Node {
                data: data.to_vec(),
                owner_session: self.session,
            },
        );
        Ok(())
    }

    fn get_data(&self, path: &str) -> Result<Option<(Vec<u8>, NodeMeta)>, CoordinatorError> {
        Ok(self.state.nodes.lock().get(path).map(|node| {
            (
                node.data.clone(),
                NodeMeta {
                    owner_session: node.owner_session,
                },
            )
        }))
    }

    fn delete(&self, path: &str) -> Result<(), CoordinatorError> {
        self.state.nodes.lock().remove(path);
        Ok(())
    }

    fn session_id(&self) -> SessionId {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_atomic_per_path() {
        let coordinator = MemoryCoordinator::new();
        coordinator.create_ephemeral("/a", b"x").unwrap();
        let err = coordinator.create_ephemeral("/a", b"y").unwrap_err();
        assert!(matches!(err, CoordinatorError::NodeExists));
        // The losing create did not clobber the node.
        let (data, meta) = coordinator.get_data("/a").unwrap().unwrap();
        assert_eq!(data, b"x");
        assert_eq!(meta.owner_session, coordinator.session_id());
    }

    #[test]
    fn test_sessions_share_nodes_with_distinct_identity() {
        let first = MemoryCoordinator::new();
        let second = first.new_session();
        assert_ne!(first.session_id(), second.session_id());

        first.create_ephemeral("/a", b"x").unwrap();
        let (_, meta) = second.get_data("/a").unwrap().unwrap();
        assert_eq!(meta.owner_session, first.session_id());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let coordinator = MemoryCoordinator::new();
        coordinator.create_ephemeral("/a", b"x").unwrap();
        coordinator.delete("/a").unwrap();
        coordinator.delete("/a").unwrap();
        assert!(coordinator.get_data("/a").unwrap().is_none());
    }

    #[test]
    fn test_session_expiry_drops_owned_nodes() {
        let first = MemoryCoordinator::new();
        let second = first.new_session();
        first.create_ephemeral("/a", b"x").unwrap();
        second.create_ephemeral("/b", b"y").unwrap();

        first.expire_session();
        assert!(first.get_data("/a").unwrap().is_none());
        assert!(first.get_data("/b").unwrap().is_some());
    }

    #[test]
    fn test_retry_operation_retries_connection_loss() {
        let mut attempts = 0;
        let result = retry_operation(|| {
            attempts += 1;
            if attempts < 3 {
                Err(CoordinatorError::ConnectionLoss("flaky".to_string()))
            } else {
                Ok(attempts)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }
}
