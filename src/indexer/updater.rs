//! The index updater: orchestration around one change event.
//!
//! On each event the updater takes the record lock, derives the index entry
//! with the dependency walker, hands it to the search sink and releases the
//! lock. Reindexing of denormalized dependents is not done here; the
//! change-delivery layer re-enqueues synthetic events for them.

use std::sync::Arc;

use crate::error::Result;
use crate::indexer::registry::{ChangeEvent, ChangeListener};
use crate::lock::RecordLock;
use crate::mapping::MappingModel;
use crate::record::{RecordId, RecordReader, VTag};
use crate::walker::{IndexEntry, build_index_entry};

/// Receiver of finished index documents.
///
/// The sink is an external collaborator; the engine does not define its
/// wire protocol, only the hand-off.
pub trait SearchSink: Send + Sync {
    /// Index (or reindex) the entry for a record at a vtag.
    fn index(&self, record_id: &RecordId, vtag: &VTag, entry: IndexEntry) -> Result<()>;

    /// Delete the entry for a record at a vtag.
    fn delete(&self, record_id: &RecordId, vtag: &VTag) -> Result<()>;
}

/// Processes change events into index updates.
pub struct IndexUpdater {
    model: Arc<MappingModel>,
    reader: Arc<dyn RecordReader>,
    lock: RecordLock,
    sink: Arc<dyn SearchSink>,
}

impl IndexUpdater {
    /// Create an updater over a compiled model.
    pub fn new(
        model: Arc<MappingModel>,
        reader: Arc<dyn RecordReader>,
        lock: RecordLock,
        sink: Arc<dyn SearchSink>,
    ) -> Self {
        IndexUpdater {
            model,
            reader,
            lock,
            sink,
        }
    }

    /// Handle one change event: lock, walk, emit, unlock.
    pub fn process(&self, event: &ChangeEvent) -> Result<()> {
        let record_id = event.record_id();
        self.lock.lock(record_id)?;
        let result = self.update(event);
        // Release on every path; failures to release are logged, the
        // event's own outcome takes precedence.
        self.lock.unlock_log_failure(record_id);
        result
    }

    fn update(&self, event: &ChangeEvent) -> Result<()> {
        let record_id = event.record_id();
        let vtag = event.vtag();

        match self.reader.read(record_id, vtag) {
            Ok(record) => {
                let entry = build_index_entry(&record, vtag, &self.model, self.reader.as_ref())?;
                tracing::debug!(
                    record = %record_id,
                    vtag = %vtag,
                    fields = entry.document().len(),
                    deps = entry.dependencies().len(),
                    "indexing record"
                );
                self.sink.index(record_id, vtag, entry)
            }
            Err(e) if e.is_absent_record() => {
                tracing::debug!(record = %record_id, vtag = %vtag, "record gone, deleting entry");
                self.sink.delete(record_id, vtag)
            }
            Err(e) => Err(e),
        }
    }
}

impl ChangeListener for IndexUpdater {
    fn on_change(&self, event: &ChangeEvent) -> Result<()> {
        self.process(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::lock::MemoryCoordinator;
    use crate::mapping::compile;
    use crate::record::{FieldValue, MemoryRecordStore};

    #[derive(Default)]
    struct RecordingSink {
        indexed: Mutex<Vec<(RecordId, IndexEntry)>>,
        deleted: Mutex<Vec<RecordId>>,
    }

    impl SearchSink for RecordingSink {
        fn index(&self, record_id: &RecordId, _vtag: &VTag, entry: IndexEntry) -> Result<()> {
            self.indexed.lock().push((record_id.clone(), entry));
            Ok(())
        }

        fn delete(&self, record_id: &RecordId, _vtag: &VTag) -> Result<()> {
            self.deleted.lock().push(record_id.clone());
            Ok(())
        }
    }

    fn updater(store: Arc<MemoryRecordStore>, sink: Arc<RecordingSink>) -> IndexUpdater {
        let model = compile(
            r#"{
            "field_types": [{ "name": "string", "class": "tern.StringIndexFieldType" }],
            "non_versioned_mappings": [{
                "record_type": "Book",
                "fields": [{ "name": "manager", "type": "string", "value": { "field": "manager" } }]
            }]
        }"#,
        )
        .unwrap();
        IndexUpdater::new(
            Arc::new(model),
            store,
            RecordLock::new(Arc::new(MemoryCoordinator::new())),
            sink,
        )
    }

    #[test]
    fn test_event_produces_sink_document() {
        let store = Arc::new(MemoryRecordStore::new());
        let id = RecordId::new("book1");
        store.create(id.clone(), "Book").unwrap();
        store
            .set_field(&id, "manager", FieldValue::Text("Alice".to_string()))
            .unwrap();

        let sink = Arc::new(RecordingSink::default());
        let updater = updater(store, sink.clone());
        updater
            .process(&ChangeEvent::new(id.clone(), VTag::last()))
            .unwrap();

        let indexed = sink.indexed.lock();
        assert_eq!(indexed.len(), 1);
        assert_eq!(indexed[0].0, id);
        assert_eq!(
            indexed[0].1.document().value("Book.manager").and_then(|v| v.as_text()),
            Some("Alice")
        );
    }

    #[test]
    fn test_missing_record_turns_into_deletion() {
        let store = Arc::new(MemoryRecordStore::new());
        let sink = Arc::new(RecordingSink::default());
        let updater = updater(store, sink.clone());

        let id = RecordId::new("gone");
        updater
            .process(&ChangeEvent::new(id.clone(), VTag::last()))
            .unwrap();
        assert_eq!(sink.deleted.lock().as_slice(), &[id]);
        assert!(sink.indexed.lock().is_empty());
    }

    #[test]
    fn test_lock_released_after_processing() {
        let store = Arc::new(MemoryRecordStore::new());
        let sink = Arc::new(RecordingSink::default());
        let updater = updater(store, sink);

        let id = RecordId::new("book1");
        updater
            .process(&ChangeEvent::new(id.clone(), VTag::last()))
            .unwrap();
        assert!(!updater.lock.has_lock(&id).unwrap());
    }
}
