//! Index document produced by the dependency walker.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::FieldValue;

/// The field values of one search-index document.
///
/// Index fields are multi-valued: a dereferencing binding that fans out over
/// a multi-valued link field contributes one value per reachable record.
/// Field insertion order is preserved for consistent output to the sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Values per index field name.
    values: HashMap<String, Vec<FieldValue>>,
    /// Field names in first-insertion order.
    field_names: Vec<String>,
}

impl IndexDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        IndexDocument {
            values: HashMap::new(),
            field_names: Vec::new(),
        }
    }

    /// Append a value to an index field.
    pub fn add_value<S: Into<String>>(&mut self, name: S, value: FieldValue) {
        let name = name.into();
        if !self.values.contains_key(&name) {
            self.field_names.push(name.clone());
        }
        self.values.entry(name).or_default().push(value);
    }

    /// The values of an index field, if it received any.
    pub fn values(&self, name: &str) -> Option<&[FieldValue]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    /// The single value of an index field, if it received exactly one.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        match self.values.get(name) {
            Some(values) if values.len() == 1 => values.first(),
            _ => None,
        }
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// All field names in first-insertion order.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.field_names.len()
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.field_names.is_empty()
    }
}
