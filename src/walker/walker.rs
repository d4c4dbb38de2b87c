//! Building index entries by walking the dependency graph.
//!
//! Given a record, a compiled mapping model and record store access, the
//! walker evaluates every field binding that applies to the record at the
//! given vtag, following configured link relationships where a binding
//! dereferences them. Traversal is strictly sequential depth-first, one
//! link value at a time.

use std::sync::Arc;

use crate::document::IndexDocument;
use crate::error::Result;
use crate::mapping::model::{Follow, IndexField, IndexFieldBinding, MappingModel, ValueSource};
use crate::record::{FieldValue, Record, RecordReader, VTag};
use crate::walker::context::{Dep, WalkContext};

/// The outcome of one dependency walk: the document fields to send to the
/// search sink and the dependency set to hand to the dependency index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    document: IndexDocument,
    dependencies: Vec<Dep>,
}

impl IndexEntry {
    /// The document fields.
    pub fn document(&self) -> &IndexDocument {
        &self.document
    }

    /// The accumulated dependencies.
    pub fn dependencies(&self) -> &[Dep] {
        &self.dependencies
    }

    /// Split the entry into document and dependencies.
    pub fn into_parts(self) -> (IndexDocument, Vec<Dep>) {
        (self.document, self.dependencies)
    }
}

/// Derive the index entry for a record at a vtag.
///
/// Both the non-versioned mapping for the record type and the versioned
/// mapping claiming (record type, vtag) contribute bindings; either may be
/// absent. The mapping model is never mutated. Missing linked records do
/// not fail the walk; they contribute no value but still leave a
/// dependency, since their later creation must trigger reindexing.
pub fn build_index_entry(
    record: &Record,
    vtag: &VTag,
    model: &MappingModel,
    reader: &dyn RecordReader,
) -> Result<IndexEntry> {
    let mut bindings: Vec<&IndexFieldBinding> = Vec::new();
    if let Some(mapping) = model.non_versioned_mapping(record.record_type()) {
        bindings.extend(mapping.bindings());
    }
    if let Some(mapping) = model.versioned_mapping(record.record_type(), vtag.name()) {
        bindings.extend(mapping.bindings());
    }

    let mut ctx = WalkContext::new(record.clone(), vtag.clone());
    let mut document = IndexDocument::new();

    for binding in bindings {
        evaluate_binding(binding, &mut ctx, reader, &mut document)?;
    }

    Ok(IndexEntry {
        document,
        dependencies: ctx.into_deps(),
    })
}

fn evaluate_binding(
    binding: &IndexFieldBinding,
    ctx: &mut WalkContext,
    reader: &dyn RecordReader,
    document: &mut IndexDocument,
) -> Result<()> {
    match binding.value() {
        ValueSource::Field { field, .. } => {
            read_field(field, binding.field(), ctx, document);
            Ok(())
        }
        ValueSource::Deref { follows, field, .. } => {
            evaluate_chain(follows, field, binding.field(), ctx, reader, document)
        }
    }
}

/// Walk the remaining hops of a chain; at the end of the chain, read the
/// target field in whatever frame the chain reached.
fn evaluate_chain(
    follows: &[Follow],
    field: &str,
    index_field: &Arc<IndexField>,
    ctx: &mut WalkContext,
    reader: &dyn RecordReader,
    document: &mut IndexDocument,
) -> Result<()> {
    match follows.split_first() {
        Some((head, rest)) => head.traverse(ctx, reader, &mut |ctx| {
            evaluate_chain(rest, field, index_field, ctx, reader, document)
        }),
        None => {
            read_field(field, index_field, ctx, document);
            Ok(())
        }
    }
}

/// Read a record field in the current frame into the document. The
/// dependency is registered whether or not the field holds a value; frames
/// whose record could not be resolved keep their existence-only dependency.
fn read_field(
    field: &str,
    index_field: &Arc<IndexField>,
    ctx: &mut WalkContext,
    document: &mut IndexDocument,
) {
    ctx.add_dependency(field);
    let value = ctx
        .current_record()
        .and_then(|record| record.field(field))
        .cloned();
    if let Some(value) = value {
        add_value(document, index_field, value);
    }
}

fn add_value(document: &mut IndexDocument, index_field: &Arc<IndexField>, value: FieldValue) {
    match value {
        // Multi-valued record fields contribute one document value each.
        FieldValue::List(values) => {
            for value in values {
                add_value(document, index_field, value);
            }
        }
        FieldValue::Null => {}
        value => document.add_value(index_field.name(), value),
    }
}
