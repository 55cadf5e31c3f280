//! Empty Elements Phase
//!
//! Replaces sequences of mergeable instructions (e.g. `ElementStart` and `ElementEnd`) with a
//! consolidated instruction (e.g. `Element`).

use crate::error::Result;
use crate::template::pipeline::ir::{CreateOp, Op, OpKind, OpList};
use crate::template::pipeline::src::compilation::CompilationJob;

/// Op kinds that don't prevent a start op from merging with its end op.
const IGNORED_OP_KINDS: &[OpKind] = &[OpKind::Pipe];

pub fn collapse_empty_instructions(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        collapse_in_list(&mut unit.create)?;
    }
    Ok(())
}

fn collapse_in_list(ops: &mut OpList<CreateOp>) -> Result<()> {
    for id in ops.ids() {
        let Some(end) = ops.get(id) else { continue };
        let start_kind = match end.kind() {
            OpKind::ElementEnd => OpKind::ElementStart,
            OpKind::ContainerEnd => OpKind::ContainerStart,
            _ => continue,
        };
        let end_xref = end.xref();

        let mut prev = ops.prev_of(id);
        while let Some(prev_id) = prev {
            match ops.kind_at(prev_id) {
                Some(kind) if IGNORED_OP_KINDS.contains(&kind) => prev = ops.prev_of(prev_id),
                _ => break,
            }
        }
        let Some(start_id) = prev else { continue };
        let Some(start) = ops.get(start_id) else { continue };
        if start.kind() != start_kind || start.xref() != end_xref {
            continue;
        }

        // The start op keeps its position and becomes the collapsed op.
        let merged = match ops.get(start_id) {
            Some(CreateOp::ElementStart(el)) => CreateOp::Element(el.clone()),
            Some(CreateOp::ContainerStart(container)) => CreateOp::Container(container.clone()),
            _ => continue,
        };
        ops.replace(start_id, merged)?;
        ops.remove(id)?;
    }
    Ok(())
}
