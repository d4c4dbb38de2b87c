//! Record model and record store access.

pub mod id;
pub mod record;
pub mod store;

pub use id::{Link, RecordId};
pub use record::{FieldValue, Record, RecordBuilder, VTag, is_system_field};
pub use store::{MemoryRecordStore, RecordReader};
