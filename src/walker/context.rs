//! Traversal context for the dependency walker.
//!
//! A walk maintains an explicit stack of frames, one per traversal hop,
//! plus the accumulated dependency set of the whole walk. The stack is
//! never shared between walks; concurrent or reentrant walks each own
//! their context.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::record::{Record, RecordId, VTag, is_system_field};

/// A dependency of the index entry under construction: the named fields of
/// the given record. An empty field set means the entry depends on the
/// record's existence only.
///
/// Dependencies are accumulated transiently during one walk and persisted
/// by the external dependency index afterwards, so that a later change to
/// one of these fields triggers reindexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dep {
    record_id: RecordId,
    fields: BTreeSet<String>,
}

impl Dep {
    /// Create a dependency on the named fields of a record.
    pub fn new(record_id: RecordId, fields: BTreeSet<String>) -> Self {
        Dep { record_id, fields }
    }

    /// Create a dependency on a record's existence only.
    pub fn existence(record_id: RecordId) -> Self {
        Dep {
            record_id,
            fields: BTreeSet::new(),
        }
    }

    /// The record depended upon.
    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    /// The fields depended upon; empty for an existence-only dependency.
    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    fn add_field(&mut self, field: &str) {
        self.fields.insert(field.to_string());
    }
}

/// One traversal frame: the record in scope (absent when the hop's target
/// could not be read) and its dependency entry.
#[derive(Debug)]
struct Frame {
    record: Option<Record>,
    /// Index of this frame's dependency in the walk-wide accumulator. The
    /// dependency outlives the frame, so it is stored there, not here.
    dep_index: usize,
}

/// The state of one dependency walk.
///
/// Holds the frame stack, the fixed top-level identity (needed to resolve
/// relative links anywhere in the walk) and the accumulated dependencies.
/// Every `push` must be paired with a `pop` on all exit paths, including
/// continuation failure.
#[derive(Debug)]
pub struct WalkContext {
    top_level_id: RecordId,
    vtag: VTag,
    frames: Vec<Frame>,
    deps: Vec<Dep>,
}

impl WalkContext {
    /// Start a walk rooted at the given record.
    ///
    /// The root frame is seeded with an existence dependency on the record
    /// itself; field reads refine it.
    pub fn new(record: Record, vtag: VTag) -> Self {
        let top_level_id = record.id().clone();
        WalkContext {
            deps: vec![Dep::existence(top_level_id.clone())],
            frames: vec![Frame {
                record: Some(record),
                dep_index: 0,
            }],
            top_level_id,
            vtag,
        }
    }

    /// The record the walk started from.
    pub fn top_level_id(&self) -> &RecordId {
        &self.top_level_id
    }

    /// The vtag every record in this walk is read at.
    pub fn vtag(&self) -> &VTag {
        &self.vtag
    }

    /// The record currently in scope; absent in frames pushed for
    /// unresolvable hops.
    pub fn current_record(&self) -> Option<&Record> {
        self.frames.last().and_then(|frame| frame.record.as_ref())
    }

    /// The current traversal depth (1 = top-level record).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Record that the index entry depends on the named field of the record
    /// in scope. System fields are maintained by the store itself and are
    /// never registered. An absent frame keeps its existence-only
    /// dependency: no record was read, so no field of it was depended on.
    pub fn add_dependency(&mut self, field: &str) {
        if is_system_field(field) {
            return;
        }
        if let Some(frame) = self.frames.last()
            && frame.record.is_some()
        {
            self.deps[frame.dep_index].add_field(field);
        }
    }

    /// Enter a new frame for a traversal hop.
    ///
    /// `record` is absent when the hop's target could not be read; the
    /// dependency is recorded regardless, so the target's later creation is
    /// observable.
    pub fn push(&mut self, record: Option<Record>, dep: Dep) {
        self.deps.push(dep);
        self.frames.push(Frame {
            record,
            dep_index: self.deps.len() - 1,
        });
    }

    /// Leave the current frame. The frame's dependency stays accumulated.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Finish the walk and hand over the accumulated dependencies.
    pub fn into_deps(self) -> Vec<Dep> {
        self.deps
    }
}
