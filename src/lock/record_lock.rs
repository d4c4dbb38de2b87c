//! The record indexing lock.
//!
//! To avoid multiple processes/threads concurrently indexing the same
//! record, indexers take an index lock on the record before building its
//! entry. The lock lives entirely in the coordination service: it is
//! obtained by atomically creating a node at a path derived from the record
//! identity. If the create succeeds you have the lock; if the node already
//! exists you wait a bit and retry.
//!
//! Since the change-delivery layer guarantees at most one in-flight
//! delivery per (row, subscription), the lock only matters where two
//! *different* delivery paths can process the same record concurrently,
//! such as a full index rebuild running alongside incremental updates.
//! Deployments where that overlap is impossible can disable the lock
//! (`enabled = false`), which turns every operation into a trivial
//! success.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{Result, TernError};
use crate::lock::coordinator::{Coordinator, CoordinatorError, retry_operation};
use crate::record::RecordId;

/// Base path under which per-record lock nodes are created.
pub const LOCK_PATH: &str = "/tern/indexer/recordlock";

/// Tuning knobs of the record lock.
#[derive(Debug, Clone)]
pub struct RecordLockConfig {
    /// Poll interval while the lock is held by someone else.
    pub wait_between_tries: Duration,
    /// Maximum total time to wait for an acquisition.
    pub max_wait_time: Duration,
    /// When false, every operation is a no-op that trivially succeeds.
    pub enabled: bool,
}

impl Default for RecordLockConfig {
    fn default() -> Self {
        RecordLockConfig {
            wait_between_tries: Duration::from_millis(20),
            max_wait_time: Duration::from_secs(20),
            enabled: true,
        }
    }
}

/// A per-worker handle on the record indexing lock.
///
/// The lock is reentrant per (session, worker): acquiring it twice through
/// the same handle silently succeeds. Ownership is decided purely by
/// comparing the stored token against the handle's own, never by local
/// state, so a retried create whose success outcome was lost to a
/// connectivity fault still resolves correctly.
pub struct RecordLock {
    coordinator: Arc<dyn Coordinator>,
    config: RecordLockConfig,
    /// Opaque worker identity stored in the lock node. Constructed once per
    /// handle and compared by value.
    token: Uuid,
}

impl RecordLock {
    /// Create a lock handle with default configuration.
    pub fn new(coordinator: Arc<dyn Coordinator>) -> Self {
        Self::with_config(coordinator, RecordLockConfig::default())
    }

    /// Create a lock handle with the given configuration.
    pub fn with_config(coordinator: Arc<dyn Coordinator>, config: RecordLockConfig) -> Self {
        RecordLock {
            coordinator,
            config,
            token: Uuid::new_v4(),
        }
    }

    /// Obtain the lock for the given record, blocking until it is held.
    ///
    /// Acquiring a lock this handle already holds silently succeeds. Fails
    /// with [`TernError::LockTimeout`] if the lock could not be obtained
    /// within the configured maximum wait time.
    pub fn lock(&self, record_id: &RecordId) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.check_not_event_thread()?;

        let path = self.path(record_id);
        let data = self.token.as_bytes().as_slice();
        let start = Instant::now();

        loop {
            if start.elapsed() > self.config.max_wait_time {
                return Err(TernError::lock_timeout(format!(
                    "Failed to obtain the index lock for record {record_id} within {} ms",
                    self.config.max_wait_time.as_millis()
                )));
            }

            match retry_operation(|| self.coordinator.create_ephemeral(&path, data)) {
                // We created the node, hence we have the lock.
                Ok(()) => return Ok(()),
                Err(CoordinatorError::NodeExists) => {}
                Err(e) => return Err(coordination_error(record_id, e)),
            }

            // The failed create does not mean we do not have the lock: a
            // retried create whose success was lost to connection loss
            // leaves the node in place under our session. Read the owner
            // back to check; this also handles reentrant acquisition.
            if self.owns_node(&path).map_err(|e| coordination_error(record_id, e))? {
                return Ok(());
            }

            thread::sleep(self.config.wait_between_tries);
        }
    }

    /// Release a previously obtained lock.
    ///
    /// Fails with [`TernError::Lock`] if this handle does not currently
    /// hold it; the lock node is left untouched in that case. The
    /// verify-and-delete is retried across transient connectivity faults
    /// until the lock state is resolved.
    pub fn unlock(&self, record_id: &RecordId) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.check_not_event_thread()?;

        let path = self.path(record_id);
        let removed = retry_operation(|| {
            match self.coordinator.get_data(&path)? {
                Some((data, meta)) if self.matches(&data, meta.owner_session) => {
                    self.coordinator.delete(&path)?;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
        .map_err(|e| coordination_error(record_id, e))?;

        if removed {
            Ok(())
        } else {
            Err(TernError::lock(format!(
                "Cannot remove the index lock for record {record_id}: the lock is not held by this worker"
            )))
        }
    }

    /// Release the lock, logging instead of failing.
    ///
    /// For cleanup paths that cannot handle a release failure themselves.
    pub fn unlock_log_failure(&self, record_id: &RecordId) {
        if let Err(e) = self.unlock(record_id) {
            tracing::error!(record = %record_id, error = %e, "error releasing index lock");
        }
    }

    /// Non-blocking check whether this handle currently holds the lock.
    pub fn has_lock(&self, record_id: &RecordId) -> Result<bool> {
        if !self.config.enabled {
            return Ok(true);
        }
        self.check_not_event_thread()?;

        let path = self.path(record_id);
        self.owns_node(&path)
            .map_err(|e| coordination_error(record_id, e))
    }

    fn path(&self, record_id: &RecordId) -> String {
        format!("{LOCK_PATH}/{record_id}")
    }

    fn matches(&self, data: &[u8], owner_session: u64) -> bool {
        owner_session == self.coordinator.session_id()
            && data == self.token.as_bytes().as_slice()
    }

    fn owns_node(&self, path: &str) -> std::result::Result<bool, CoordinatorError> {
        retry_operation(|| {
            Ok(match self.coordinator.get_data(path)? {
                Some((data, meta)) => self.matches(&data, meta.owner_session),
                None => false,
            })
        })
    }

    /// Blocking on the lock from the coordination event thread would
    /// deadlock the session; fail fast instead.
    fn check_not_event_thread(&self) -> Result<()> {
        if self.coordinator.is_event_thread() {
            return Err(TernError::lock(
                "The record lock must not be used from the coordination event thread",
            ));
        }
        Ok(())
    }
}

fn coordination_error(record_id: &RecordId, e: CoordinatorError) -> TernError {
    TernError::coordination(format!("index lock operation on record {record_id}: {e}"))
}
