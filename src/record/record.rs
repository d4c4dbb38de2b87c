//! Records, field values and version tags.
//!
//! This module defines:
//! - [`FieldValue`] - The value stored in a record field (Text, Link, etc.)
//! - [`VTag`] - A named pointer to the version of a record that matters
//! - [`Record`] - A record as returned by the record store, with the
//!   non-versioned fields and the fields of the resolved version merged
//!
//! # Supported Types
//!
//! - **Text** - String data
//! - **Integer** - 64-bit signed integers
//! - **Float** - 64-bit floating-point numbers
//! - **Boolean** - true/false values
//! - **DateTime** - UTC timestamps with timezone
//! - **Link** - A reference to another record
//! - **List** - A multi-valued field
//! - **Null** - Explicit null values
//!
//! # Type Conversion
//!
//! The `FieldValue` enum provides conversion methods for extracting typed
//! values:
//!
//! ```
//! use tern::record::FieldValue;
//!
//! let text_value = FieldValue::Text("hello".to_string());
//! assert_eq!(text_value.as_text(), Some("hello"));
//!
//! let int_value = FieldValue::Integer(42);
//! assert_eq!(int_value.as_numeric(), Some("42".to_string()));
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::id::{Link, RecordId};

/// Field-name prefix reserved for system fields (`sys:id`, `sys:version`,
/// `sys:record-type`).
pub const SYSTEM_FIELD_PREFIX: &str = "sys:";

/// Field-name prefix reserved for version tag fields (`vtag:live`, ...).
pub const VTAG_FIELD_PREFIX: &str = "vtag:";

/// Whether a field name belongs to the reserved system namespace.
///
/// System fields are maintained by the record store itself and never need
/// denormalized invalidation tracking, so the dependency walker skips them
/// when registering dependencies.
pub fn is_system_field(name: &str) -> bool {
    name.starts_with(SYSTEM_FIELD_PREFIX) || name.starts_with(VTAG_FIELD_PREFIX)
}

/// A named pointer to "the version of a record that matters for the index".
///
/// Resolved against a record by the record store to obtain a concrete
/// version number. The name `last` is well-known and always resolves to the
/// newest version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VTag(String);

impl VTag {
    /// The well-known vtag resolving to the newest version of a record.
    pub const LAST: &'static str = "last";

    /// Create a vtag with the given name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        VTag(name.into())
    }

    /// The well-known `last` vtag.
    pub fn last() -> Self {
        VTag(Self::LAST.to_string())
    }

    /// The vtag name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this is the well-known `last` vtag.
    pub fn is_last(&self) -> bool {
        self.0 == Self::LAST
    }
}

impl fmt::Display for VTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a value for a field in a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// DateTime value
    DateTime(chrono::DateTime<chrono::Utc>),
    /// A link to another record
    Link(Link),
    /// A multi-valued field
    List(Vec<FieldValue>),
    /// Null value
    Null,
}

impl FieldValue {
    /// Convert to text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to numeric string representation.
    pub fn as_numeric(&self) -> Option<String> {
        match self {
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }

    /// Convert to boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            FieldValue::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Convert to a link if this is a link value.
    pub fn as_link(&self) -> Option<&Link> {
        match self {
            FieldValue::Link(link) => Some(link),
            _ => None,
        }
    }

    /// Flatten this value into its link values.
    ///
    /// A link field may hold a single link or a list of links; the walker
    /// fans out over every one of them. Non-link values yield nothing.
    pub fn links(&self) -> Vec<&Link> {
        match self {
            FieldValue::Link(link) => vec![link],
            FieldValue::List(values) => values
                .iter()
                .flat_map(|value| value.links())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A record as returned by the record store.
///
/// The store merges the non-versioned fields with the fields of the version
/// the requested vtag resolved to, so a `Record` exposes one flat field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The record identity.
    id: RecordId,
    /// The record type name.
    record_type: String,
    /// The version the vtag resolved to; `None` for a record that only has
    /// non-versioned fields.
    version: Option<u64>,
    /// The merged field values, keyed by field name.
    fields: HashMap<String, FieldValue>,
}

impl Record {
    /// Create a new record with no fields.
    pub fn new<S: Into<String>>(id: RecordId, record_type: S) -> Self {
        Record {
            id,
            record_type: record_type.into(),
            version: None,
            fields: HashMap::new(),
        }
    }

    /// The record identity.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// The record type name.
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// The resolved version number, if any.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Set the resolved version number.
    pub fn set_version(&mut self, version: u64) {
        self.version = Some(version);
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Check if the record has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Set a field value.
    pub fn set_field<S: Into<String>>(&mut self, name: S, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// All field values, keyed by field name.
    pub fn fields(&self) -> &HashMap<String, FieldValue> {
        &self.fields
    }

    /// Create a builder for constructing records.
    pub fn builder<S: Into<String>>(id: RecordId, record_type: S) -> RecordBuilder {
        RecordBuilder {
            record: Record::new(id, record_type),
        }
    }
}

/// A builder for constructing records in a fluent manner.
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Add a text field.
    pub fn text<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.record
            .set_field(name, FieldValue::Text(value.into()));
        self
    }

    /// Add an integer field.
    pub fn integer<S: Into<String>>(mut self, name: S, value: i64) -> Self {
        self.record.set_field(name, FieldValue::Integer(value));
        self
    }

    /// Add a link field.
    pub fn link<S: Into<String>>(mut self, name: S, link: Link) -> Self {
        self.record.set_field(name, FieldValue::Link(link));
        self
    }

    /// Add a multi-valued link field.
    pub fn links<S: Into<String>>(mut self, name: S, links: Vec<Link>) -> Self {
        self.record.set_field(
            name,
            FieldValue::List(links.into_iter().map(FieldValue::Link).collect()),
        );
        self
    }

    /// Add a field with a generic value.
    pub fn field<S: Into<String>>(mut self, name: S, value: FieldValue) -> Self {
        self.record.set_field(name, value);
        self
    }

    /// Set the resolved version number.
    pub fn version(mut self, version: u64) -> Self {
        self.record.set_version(version);
        self
    }

    /// Build the final record.
    pub fn build(self) -> Record {
        self.record
    }
}
