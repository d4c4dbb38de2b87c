//! Raw indexer configuration as parsed from JSON.
//!
//! These structs mirror the configuration document one-to-one and carry no
//! validation beyond structural deserialization; the
//! [compiler](crate::mapping::compiler) turns them into a checked
//! [`MappingModel`](crate::mapping::model::MappingModel).
//!
//! # Example document
//!
//! ```json
//! {
//!   "field_types": [
//!     { "name": "string", "class": "tern.StringIndexFieldType" }
//!   ],
//!   "global_fields": [
//!     { "name": "manager", "type": "string" }
//!   ],
//!   "versioned_mappings": [
//!     {
//!       "record_type": "Book",
//!       "version_tags": "live, last",
//!       "fields": [
//!         { "name": "title", "type": "string", "value": { "field": "title" } },
//!         {
//!           "name": "author_name", "type": "string",
//!           "value": { "deref": { "follow": ["author"], "field": "name" } }
//!         }
//!       ]
//!     }
//!   ],
//!   "non_versioned_mappings": [
//!     {
//!       "record_type": "Book",
//!       "fields": [ { "ref": "manager", "value": { "field": "manager" } } ]
//!     }
//!   ],
//!   "default_search_field": "title"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Follow token naming the master hop instead of a link field.
pub const MASTER_FOLLOW: &str = "@master";

/// The root of the configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Field type declarations.
    #[serde(default)]
    pub field_types: Vec<FieldTypeConfig>,
    /// Index fields declared outside any record-type mapping.
    #[serde(default)]
    pub global_fields: Vec<IndexFieldConfig>,
    /// Versioned content mapping cases.
    #[serde(default)]
    pub versioned_mappings: Vec<MappingCaseConfig>,
    /// Non-versioned content mapping cases.
    #[serde(default)]
    pub non_versioned_mappings: Vec<MappingCaseConfig>,
    /// Optional default search field name.
    #[serde(default)]
    pub default_search_field: Option<String>,
}

impl IndexerConfig {
    /// Parse a configuration document from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A field type declaration: a name and the backing implementation
/// reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldTypeConfig {
    pub name: String,
    pub class: String,
}

/// An index field declaration or binding.
///
/// Globally declared fields carry `name` and `type`. Inside a mapping case,
/// an entry either declares a new field (`name` + `type`, qualified by the
/// case's record type) or references an existing one (`ref`), and always
/// carries a `value`. Which combinations are legal where is enforced by the
/// compiler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexFieldConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    #[serde(default = "default_true")]
    pub indexed: bool,
    #[serde(default = "default_true")]
    pub stored: bool,
    #[serde(default)]
    pub multi_value: bool,
    #[serde(default)]
    pub value: Option<ValueConfig>,
}

fn default_true() -> bool {
    true
}

/// One content mapping case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingCaseConfig {
    pub record_type: String,
    /// Comma-separated version tag names; only present on versioned cases.
    #[serde(default)]
    pub version_tags: Option<String>,
    #[serde(default)]
    pub fields: Vec<IndexFieldConfig>,
}

/// The value descriptor of a binding: exactly one of `field` or `deref`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueConfig {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub deref: Option<DerefConfig>,
}

/// A dereferencing value: follow the chain, then read `field` on each
/// record it reaches.
///
/// Each follow entry is a link field name, or the [`MASTER_FOLLOW`] token
/// for the hop from a variant record to its master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerefConfig {
    pub follow: Vec<String>,
    pub field: String,
}
