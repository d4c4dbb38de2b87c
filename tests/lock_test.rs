use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tern::error::{Result, TernError};
use tern::lock::{MemoryCoordinator, RecordLock, RecordLockConfig};
use tern::record::RecordId;

fn patient_config() -> RecordLockConfig {
    RecordLockConfig {
        wait_between_tries: Duration::from_millis(5),
        max_wait_time: Duration::from_secs(5),
        enabled: true,
    }
}

#[test]
fn test_contending_worker_blocks_until_release() -> Result<()> {
    // 1. Two workers on distinct sessions over one coordination service.
    let coordinator = MemoryCoordinator::new();
    let holder = RecordLock::new(Arc::new(coordinator.clone()));
    let contender = RecordLock::with_config(Arc::new(coordinator.new_session()), patient_config());
    let id = RecordId::new("book1");

    // 2. The holder takes the lock, then a second thread contends for it.
    holder.lock(&id)?;
    let hold_time = Duration::from_millis(60);
    let contending = thread::spawn(move || {
        let start = Instant::now();
        contender.lock(&id)?;
        let waited = start.elapsed();
        contender.unlock(&id)?;
        Ok::<Duration, TernError>(waited)
    });

    // 3. Release after a while; the contender acquires only then.
    thread::sleep(hold_time);
    holder.unlock(&RecordId::new("book1"))?;
    let waited = contending.join().expect("contending thread panicked")?;
    assert!(
        waited >= hold_time - Duration::from_millis(10),
        "contender acquired after {waited:?}, before the holder released"
    );
    Ok(())
}

#[test]
fn test_lock_is_reentrant_within_one_worker() -> Result<()> {
    let lock = RecordLock::new(Arc::new(MemoryCoordinator::new()));
    let id = RecordId::new("book1");

    lock.lock(&id)?;
    // Same handle, second acquisition: returns immediately.
    let start = Instant::now();
    lock.lock(&id)?;
    assert!(start.elapsed() < Duration::from_millis(50));
    assert!(lock.has_lock(&id)?);

    lock.unlock(&id)?;
    assert!(!lock.has_lock(&id)?);
    Ok(())
}

#[test]
fn test_acquisition_gives_up_after_max_wait_time() -> Result<()> {
    let coordinator = MemoryCoordinator::new();
    let holder = RecordLock::new(Arc::new(coordinator.clone()));
    let contender = RecordLock::with_config(
        Arc::new(coordinator.new_session()),
        RecordLockConfig {
            wait_between_tries: Duration::from_millis(5),
            max_wait_time: Duration::from_millis(100),
            enabled: true,
        },
    );
    let id = RecordId::new("book1");

    holder.lock(&id)?;
    let start = Instant::now();
    let err = contender.lock(&id).unwrap_err();
    assert!(matches!(err, TernError::LockTimeout(_)));
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert!(start.elapsed() < Duration::from_millis(1000));
    Ok(())
}

#[test]
fn test_foreign_unlock_does_not_steal_the_lock() -> Result<()> {
    let coordinator = MemoryCoordinator::new();
    let holder = RecordLock::new(Arc::new(coordinator.clone()));
    let other = RecordLock::new(Arc::new(coordinator.new_session()));
    let id = RecordId::new("book1");

    holder.lock(&id)?;
    let err = other.unlock(&id).unwrap_err();
    assert!(matches!(err, TernError::Lock(_)));
    assert!(holder.has_lock(&id)?);

    holder.unlock(&id)?;
    Ok(())
}

#[test]
fn test_session_expiry_frees_the_lock() -> Result<()> {
    let coordinator = MemoryCoordinator::new();
    let holder = RecordLock::new(Arc::new(coordinator.clone()));
    let contender = RecordLock::with_config(Arc::new(coordinator.new_session()), patient_config());
    let id = RecordId::new("book1");

    holder.lock(&id)?;
    // The holder's session dies; its ephemeral lock node goes with it and
    // the contender acquires without waiting for an explicit unlock.
    coordinator.expire_session();
    contender.lock(&id)?;
    assert!(contender.has_lock(&id)?);
    Ok(())
}

#[test]
fn test_disabled_lock_never_blocks() -> Result<()> {
    let coordinator = MemoryCoordinator::new();
    let holder = RecordLock::new(Arc::new(coordinator.clone()));
    let disabled = RecordLock::with_config(
        Arc::new(coordinator.new_session()),
        RecordLockConfig {
            enabled: false,
            ..RecordLockConfig::default()
        },
    );
    let id = RecordId::new("book1");

    holder.lock(&id)?;
    let start = Instant::now();
    disabled.lock(&id)?;
    disabled.unlock(&id)?;
    assert!(start.elapsed() < Duration::from_millis(50));
    // The real lock was never touched.
    assert!(holder.has_lock(&id)?);
    Ok(())
}
