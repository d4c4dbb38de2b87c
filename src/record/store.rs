//! Record store access.
//!
//! The record store itself is an external collaborator; the engine only
//! needs the [`RecordReader`] capability to read a record at a vtag. The
//! [`MemoryRecordStore`] is an in-process implementation used in tests and
//! embedded scenarios.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Result, TernError};
use crate::record::id::RecordId;
use crate::record::record::{FieldValue, Record, VTag};

/// Read access to the record store.
///
/// This is the record-access capability the dependency walker consumes:
/// every traversal hop performs one `read` of the linked record at the
/// walk's vtag.
pub trait RecordReader: Send + Sync {
    /// Read the record with the given id at the version the vtag resolves
    /// to.
    ///
    /// Fails with [`TernError::RecordNotFound`] if the record does not
    /// exist, and with [`TernError::VersionNotFound`] if it exists but the
    /// vtag does not resolve to a version of it.
    fn read(&self, id: &RecordId, vtag: &VTag) -> Result<Record>;
}

/// Versioned record state held by the memory store.
#[derive(Debug, Default)]
struct StoredRecord {
    record_type: String,
    /// Fields outside the versioning scope; visible at every vtag.
    non_versioned: HashMap<String, FieldValue>,
    /// Versioned field sets; version numbers are 1-based indices.
    versions: Vec<HashMap<String, FieldValue>>,
    /// Version tag table: tag name to version number.
    vtags: HashMap<String, u64>,
}

/// An in-process record store.
///
/// Holds non-versioned fields, appendable versions and a vtag table per
/// record. The well-known `last` vtag resolves to the newest version.
///
/// # Examples
///
/// ```
/// use tern::record::{FieldValue, MemoryRecordStore, RecordId, RecordReader, VTag};
///
/// let store = MemoryRecordStore::new();
/// let id = RecordId::new("book1");
/// store.create(id.clone(), "Book").unwrap();
/// store.set_field(&id, "manager", FieldValue::Text("Alice".to_string())).unwrap();
///
/// let record = store.read(&id, &VTag::last()).unwrap();
/// assert_eq!(record.field("manager").and_then(|v| v.as_text()), Some("Alice"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<RecordId, StoredRecord>>,
}

impl MemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        MemoryRecordStore {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Create a record with no fields yet.
    pub fn create<S: Into<String>>(&self, id: RecordId, record_type: S) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&id) {
            return Err(TernError::other(format!("Record {id} already exists")));
        }
        records.insert(
            id,
            StoredRecord {
                record_type: record_type.into(),
                ..StoredRecord::default()
            },
        );
        Ok(())
    }

    /// Set a non-versioned field on a record.
    pub fn set_field<S: Into<String>>(
        &self,
        id: &RecordId,
        name: S,
        value: FieldValue,
    ) -> Result<()> {
        let mut records = self.records.write();
        let stored = records
            .get_mut(id)
            .ok_or_else(|| TernError::record_not_found(id.to_string()))?;
        stored.non_versioned.insert(name.into(), value);
        Ok(())
    }

    /// Append a new version with the given versioned fields, returning its
    /// 1-based version number.
    pub fn add_version(
        &self,
        id: &RecordId,
        fields: HashMap<String, FieldValue>,
    ) -> Result<u64> {
        let mut records = self.records.write();
        let stored = records
            .get_mut(id)
            .ok_or_else(|| TernError::record_not_found(id.to_string()))?;
        stored.versions.push(fields);
        Ok(stored.versions.len() as u64)
    }

    /// Point a version tag at an existing version of a record.
    pub fn set_vtag<S: Into<String>>(&self, id: &RecordId, tag: S, version: u64) -> Result<()> {
        let mut records = self.records.write();
        let stored = records
            .get_mut(id)
            .ok_or_else(|| TernError::record_not_found(id.to_string()))?;
        if version == 0 || version > stored.versions.len() as u64 {
            return Err(TernError::version_not_found(format!(
                "Record {id} has no version {version}"
            )));
        }
        stored.vtags.insert(tag.into(), version);
        Ok(())
    }

    /// Delete a record, if present.
    pub fn delete(&self, id: &RecordId) {
        self.records.write().remove(id);
    }
}

impl RecordReader for MemoryRecordStore {
    fn read(&self, id: &RecordId, vtag: &VTag) -> Result<Record> {
        let records = self.records.read();
        let stored = records
            .get(id)
            .ok_or_else(|| TernError::record_not_found(id.to_string()))?;

        // A record with no versions at all only has non-versioned content
        // and is readable at any vtag.
        let version = if stored.versions.is_empty() {
            None
        } else if vtag.is_last() {
            Some(stored.versions.len() as u64)
        } else {
            match stored.vtags.get(vtag.name()) {
                Some(version) => Some(*version),
                None => {
                    return Err(TernError::version_not_found(format!(
                        "Record {id} has no version tagged {vtag}"
                    )));
                }
            }
        };

        let mut record = Record::new(id.clone(), stored.record_type.clone());
        for (name, value) in &stored.non_versioned {
            record.set_field(name.clone(), value.clone());
        }
        if let Some(version) = version {
            for (name, value) in &stored.versions[(version - 1) as usize] {
                record.set_field(name.clone(), value.clone());
            }
            record.set_version(version);
        }
        Ok(record)
    }
}
