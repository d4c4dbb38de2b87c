//! The compiled mapping model.
//!
//! This is the immutable, queryable form of the indexer configuration,
//! built once by the [compiler](crate::mapping::compiler) and shared
//! read-only with any number of workers. A configuration change produces an
//! entirely new model; there is no partial mutation.
//!
//! Terminology: the word "field" is usually used for a field of a record in
//! the store, while "index field" means a field of the output document,
//! though sometimes both are just called field.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Versioning scope of a record field.
///
/// Partitions which fields of a record a version tag applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Fields outside the versioning scope; visible at every vtag.
    NonVersioned,
    /// Fields frozen per version.
    Versioned,
    /// Fields versioned but mutable after the fact.
    VersionedMutable,
}

/// A named, typed primitive used for encoding an index field's value.
///
/// The `class_ref` names the backing encoder implementation in the search
/// sink; the engine treats it as an opaque reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFieldType {
    name: String,
    class_ref: String,
}

impl IndexFieldType {
    /// Create a new index field type.
    pub fn new<S: Into<String>, C: Into<String>>(name: S, class_ref: C) -> Self {
        IndexFieldType {
            name: name.into(),
            class_ref: class_ref.into(),
        }
    }

    /// The type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backing implementation reference.
    pub fn class_ref(&self) -> &str {
        &self.class_ref
    }
}

/// A named slot in the output document.
///
/// Names are unique within a model; a field declared inside a record-type
/// mapping case carries its qualified `<recordType>.<name>` form here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    name: String,
    field_type: Arc<IndexFieldType>,
    indexed: bool,
    stored: bool,
    multi_value: bool,
}

impl IndexField {
    /// Create a new index field with the given indexing attributes.
    pub fn new<S: Into<String>>(
        name: S,
        field_type: Arc<IndexFieldType>,
        indexed: bool,
        stored: bool,
        multi_value: bool,
    ) -> Self {
        IndexField {
            name: name.into(),
            field_type,
            indexed,
            stored,
            multi_value,
        }
    }

    /// The (possibly qualified) index field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field type backing this field.
    pub fn field_type(&self) -> &Arc<IndexFieldType> {
        &self.field_type
    }

    /// Whether the field is indexed.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Whether the field value is stored.
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// Whether the field accepts multiple values.
    pub fn is_multi_value(&self) -> bool {
        self.multi_value
    }
}

/// A single traversal hop through the linked-record graph.
///
/// Follows are compiled into the model as part of dereferencing value
/// sources; the traversal behavior itself lives in
/// [`crate::walker::follow`]. Each hop carries the field it traverses and
/// the owner field: from the index's point of view a chained hop still
/// belongs to the chain's top-level field, and the owner keeps that
/// attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Follow {
    /// Dereference a link-typed field of the in-scope record.
    LinkField(LinkFieldFollow),
    /// Hop from a variant record to its master record.
    Master(MasterFollow),
}

impl Follow {
    /// The field this hop's dependency is attributed to.
    pub fn owner_field(&self) -> &str {
        match self {
            Follow::LinkField(follow) => &follow.owner_field,
            Follow::Master(follow) => &follow.owner_field,
        }
    }

    /// Re-attribute this hop to the given owner field.
    pub fn set_owner_field<S: Into<String>>(&mut self, owner_field: S) {
        match self {
            Follow::LinkField(follow) => follow.owner_field = owner_field.into(),
            Follow::Master(follow) => follow.owner_field = owner_field.into(),
        }
    }
}

/// A hop dereferencing a link-typed record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFieldFollow {
    pub(crate) field: String,
    /// If this hop comes after other hops in a chain, then from the point
    /// of view of the index the link belongs to the top-level record field.
    /// That field is kept here.
    pub(crate) owner_field: String,
}

impl LinkFieldFollow {
    /// Create a follow over the given link field, initially owning itself.
    pub fn new<S: Into<String>>(field: S) -> Self {
        let field = field.into();
        LinkFieldFollow {
            owner_field: field.clone(),
            field,
        }
    }

    /// The link field this hop dereferences.
    pub fn field(&self) -> &str {
        &self.field
    }
}

/// A hop from a variant record to its master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterFollow {
    pub(crate) owner_field: String,
}

impl MasterFollow {
    /// Create a master follow attributed to the given owner field.
    pub fn new<S: Into<String>>(owner_field: S) -> Self {
        MasterFollow {
            owner_field: owner_field.into(),
        }
    }
}

/// The source of an index field's value: a record field read, either direct
/// or at the end of a chain of follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSource {
    /// Read a field of the record being indexed.
    Field {
        /// The record field to read.
        field: String,
        /// The versioning scope the read is interpreted under.
        scope: Scope,
    },
    /// Follow a chain of hops, then read a field of each reached record.
    Deref {
        /// The traversal chain; never empty.
        follows: Vec<Follow>,
        /// The record field to read on the records the chain reaches.
        field: String,
        /// The versioning scope the read is interpreted under.
        scope: Scope,
    },
}

impl ValueSource {
    /// The record field this source ultimately reads.
    pub fn field(&self) -> &str {
        match self {
            ValueSource::Field { field, .. } => field,
            ValueSource::Deref { field, .. } => field,
        }
    }

    /// The versioning scope the read is interpreted under.
    pub fn scope(&self) -> Scope {
        match self {
            ValueSource::Field { scope, .. } => *scope,
            ValueSource::Deref { scope, .. } => *scope,
        }
    }
}

/// Pairs an index field with the source of its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFieldBinding {
    field: Arc<IndexField>,
    value: ValueSource,
}

impl IndexFieldBinding {
    /// Create a new binding.
    pub fn new(field: Arc<IndexField>, value: ValueSource) -> Self {
        IndexFieldBinding { field, value }
    }

    /// The bound index field.
    pub fn field(&self) -> &Arc<IndexField> {
        &self.field
    }

    /// The value source.
    pub fn value(&self) -> &ValueSource {
        &self.value
    }
}

/// The content mapping for one record type.
///
/// A versioned mapping is keyed by the set of version tags it applies to; a
/// non-versioned mapping has an empty tag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTypeMapping {
    record_type: String,
    version_tags: BTreeSet<String>,
    bindings: Vec<IndexFieldBinding>,
}

impl RecordTypeMapping {
    /// Create a new mapping for the given record type and version tag set.
    pub fn new<S: Into<String>>(record_type: S, version_tags: BTreeSet<String>) -> Self {
        RecordTypeMapping {
            record_type: record_type.into(),
            version_tags,
            bindings: Vec::new(),
        }
    }

    /// The record type this mapping applies to.
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// The version tags this mapping applies to; empty for a non-versioned
    /// mapping.
    pub fn version_tags(&self) -> &BTreeSet<String> {
        &self.version_tags
    }

    /// Append a binding. Binding order is preserved.
    pub fn add_binding(&mut self, binding: IndexFieldBinding) {
        self.bindings.push(binding);
    }

    /// The ordered field bindings.
    pub fn bindings(&self) -> &[IndexFieldBinding] {
        &self.bindings
    }
}

/// The compiled, immutable form of the indexer configuration.
///
/// Safe for unsynchronized concurrent reads; share it behind an `Arc` and
/// rebuild it wholesale when the configuration changes.
#[derive(Debug, Clone, Default)]
pub struct MappingModel {
    field_types: HashMap<String, Arc<IndexFieldType>>,
    fields: HashMap<String, Arc<IndexField>>,
    versioned: HashMap<(String, String), Arc<RecordTypeMapping>>,
    non_versioned: HashMap<String, Arc<RecordTypeMapping>>,
    default_search_field: Option<String>,
}

impl MappingModel {
    /// Create a new empty model. Only the compiler populates it.
    pub(crate) fn new() -> Self {
        MappingModel::default()
    }

    /// Look up a field type by name.
    pub fn field_type(&self, name: &str) -> Option<&Arc<IndexFieldType>> {
        self.field_types.get(name)
    }

    /// Look up an index field by its (qualified) name.
    pub fn field(&self, name: &str) -> Option<&Arc<IndexField>> {
        self.fields.get(name)
    }

    /// The versioned content mapping claiming the given record type and
    /// version tag, if any.
    pub fn versioned_mapping(
        &self,
        record_type: &str,
        version_tag: &str,
    ) -> Option<&Arc<RecordTypeMapping>> {
        self.versioned
            .get(&(record_type.to_string(), version_tag.to_string()))
    }

    /// The non-versioned content mapping for the given record type, if any.
    pub fn non_versioned_mapping(&self, record_type: &str) -> Option<&Arc<RecordTypeMapping>> {
        self.non_versioned.get(record_type)
    }

    /// The default search field name, if configured.
    pub fn default_search_field(&self) -> Option<&str> {
        self.default_search_field.as_deref()
    }

    /// The number of declared index fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn insert_field_type(&mut self, field_type: Arc<IndexFieldType>) {
        self.field_types
            .insert(field_type.name().to_string(), field_type);
    }

    pub(crate) fn insert_field(&mut self, field: Arc<IndexField>) {
        self.fields.insert(field.name().to_string(), field);
    }

    pub(crate) fn insert_versioned_mapping(
        &mut self,
        record_type: &str,
        version_tag: &str,
        mapping: Arc<RecordTypeMapping>,
    ) {
        self.versioned.insert(
            (record_type.to_string(), version_tag.to_string()),
            mapping,
        );
    }

    pub(crate) fn insert_non_versioned_mapping(
        &mut self,
        record_type: &str,
        mapping: Arc<RecordTypeMapping>,
    ) {
        self.non_versioned.insert(record_type.to_string(), mapping);
    }

    pub(crate) fn set_default_search_field<S: Into<String>>(&mut self, name: S) {
        self.default_search_field = Some(name.into());
    }
}
