//! Traversal behavior of the compiled [`Follow`] hops.
//!
//! A follow, given the walk context, invokes a continuation once per
//! reachable related record, with dependency bookkeeping. The hop variants
//! are a closed enum; dispatch is an explicit match, not a class hierarchy.

use crate::error::Result;
use crate::mapping::model::{Follow, LinkFieldFollow, MasterFollow};
use crate::record::{Link, Record, RecordId, RecordReader};
use crate::walker::context::{Dep, WalkContext};

/// The continuation a follow invokes once per reached record.
pub type FollowCallback<'a> = dyn FnMut(&mut WalkContext) -> Result<()> + 'a;

impl Follow {
    /// Traverse this hop from the record in scope.
    ///
    /// Missing targets (`RecordNotFound`, `VersionNotFound`) degrade to an
    /// absent value: the frame is pushed with no record so the continuation
    /// still runs and the dependency is still recorded. Any other read
    /// error aborts the walk.
    pub fn traverse(
        &self,
        ctx: &mut WalkContext,
        reader: &dyn RecordReader,
        callback: &mut FollowCallback<'_>,
    ) -> Result<()> {
        match self {
            Follow::LinkField(follow) => traverse_link_field(follow, ctx, reader, callback),
            Follow::Master(follow) => traverse_master(follow, ctx, reader, callback),
        }
    }
}

fn traverse_link_field(
    follow: &LinkFieldFollow,
    ctx: &mut WalkContext,
    reader: &dyn RecordReader,
    callback: &mut FollowCallback<'_>,
) -> Result<()> {
    // The dependency names the link field of the record in scope: changing
    // that link must reindex the entry, whichever hop of a chain it sits on.
    ctx.add_dependency(follow.field());

    // A link field may be multi-valued; fan out over every link value and
    // treat each independently.
    let links: Vec<Link> = match ctx.current_record() {
        Some(record) => record
            .field(follow.field())
            .map(|value| value.links().into_iter().cloned().collect())
            .unwrap_or_default(),
        None => return Ok(()),
    };

    for link in links {
        let target = link.resolve(ctx.top_level_id());
        enter(ctx, reader, target, callback)?;
    }
    Ok(())
}

fn traverse_master(
    _follow: &MasterFollow,
    ctx: &mut WalkContext,
    reader: &dyn RecordReader,
    callback: &mut FollowCallback<'_>,
) -> Result<()> {
    let target = match ctx.current_record() {
        // From a master record this hop reaches nothing.
        Some(record) if record.id().is_variant() => record.id().master(),
        _ => return Ok(()),
    };
    enter(ctx, reader, target, callback)
}

/// Read the target at the walk's vtag, run the continuation in a fresh
/// frame, and pop the frame on every exit path.
fn enter(
    ctx: &mut WalkContext,
    reader: &dyn RecordReader,
    target: RecordId,
    callback: &mut FollowCallback<'_>,
) -> Result<()> {
    let linked: Option<Record> = match reader.read(&target, ctx.vtag()) {
        Ok(record) => Some(record),
        Err(e) if e.is_absent_record() => None,
        Err(e) => return Err(e),
    };

    ctx.push(linked, Dep::existence(target));
    let result = callback(ctx);
    ctx.pop();
    result
}
