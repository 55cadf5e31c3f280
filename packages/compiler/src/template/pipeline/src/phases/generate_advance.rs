//! Generate Advance Phase
//!
//! Generates `Advance` ops in between update ops that ensure the runtime's implicit slot
//! context will be advanced correctly, then merges runs of consecutive advances.

use indexmap::IndexMap;

use crate::error::{invariant, CompilerError, Result};
use crate::template::pipeline::ir::{create_advance_op, AdvanceOp, OpId, OpList, UpdateOp, XrefId};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn generate_advance(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        // Slot of every op in this view that consumes one.
        let slot_map: IndexMap<XrefId, usize> = unit
            .create
            .iter()
            .filter_map(|op| op.handle())
            .map(|handle| handle.get().map(|slot| (handle.target, slot)))
            .collect::<Result<_>>()?;

        // The runtime starts each update pass at slot 0.
        let mut slot_context = 0;
        for id in unit.update.ids() {
            let Some(op) = unit.update.get(id) else { continue };
            let Some(target) = op.depends_on_slot_context() else { continue };
            let slot = *slot_map.get(&target).ok_or(CompilerError::UnresolvedSlot(target))?;
            if slot == slot_context {
                continue;
            }
            if slot < slot_context {
                return invariant(format!(
                    "slot counter should never need to move backwards (from {slot_context} to {slot})"
                ));
            }
            let source_span = op.source_span().cloned();
            unit.update.insert_before(id, create_advance_op(slot - slot_context, source_span))?;
            slot_context = slot;
        }
    }
    Ok(())
}

/// Collapses consecutive `Advance` ops into a single op advancing by their sum.
pub fn merge_advances(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        merge_advances_in_list(&mut unit.update)?;
    }
    Ok(())
}

fn merge_advances_in_list(ops: &mut OpList<UpdateOp>) -> Result<()> {
    let mut previous: Option<OpId> = None;
    for id in ops.ids() {
        let delta = match ops.get(id) {
            Some(UpdateOp::Advance(AdvanceOp { delta, .. })) => *delta,
            _ => {
                previous = None;
                continue;
            }
        };
        match previous.and_then(|prev| ops.get_mut(prev)) {
            Some(UpdateOp::Advance(first)) => {
                first.delta += delta;
                ops.remove(id)?;
            }
            _ => previous = Some(id),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::output::output_ast as o;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{create_interpolate_text_op, create_text_op, Interpolation, Op, OpKind};
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("{{a}}{{b}}{{c}}", "test.html"));
        ParseSourceSpan::from_offsets(&file, 0, 5)
    }

    fn interpolate(target: XrefId) -> UpdateOp {
        create_interpolate_text_op(
            target,
            Interpolation::new(vec![String::new(), String::new()], vec![o::variable("a")], Vec::new()),
            span(),
        )
    }

    fn deltas(job: &CompilationJob) -> Vec<usize> {
        job.root_unit()
            .update
            .iter()
            .filter_map(|op| match op {
                UpdateOp::Advance(advance) => Some(advance.delta),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn advances_are_inserted_when_the_slot_changes() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let texts: Vec<XrefId> = (0..3).map(|_| job.allocate_xref_id()).collect();
        let unit = job.root_unit_mut();
        for (slot, &text) in texts.iter().enumerate() {
            let mut op = create_text_op(text, "", None);
            if let Some(handle) = op.handle_mut() {
                handle.slot = Some(slot);
            }
            unit.create.push(op);
        }
        unit.update.push(interpolate(texts[0]));
        unit.update.push(interpolate(texts[2]));

        generate_advance(&mut job).unwrap();

        let kinds: Vec<OpKind> = job.root_unit().update.iter().map(|op| op.kind()).collect();
        assert_eq!(kinds, vec![OpKind::InterpolateText, OpKind::Advance, OpKind::InterpolateText]);
        assert_eq!(deltas(&job), vec![2]);
    }

    #[test]
    fn unallocated_slots_are_an_internal_error() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let text = job.allocate_xref_id();
        job.root_unit_mut().create.push(create_text_op(text, "", None));
        assert_eq!(generate_advance(&mut job), Err(CompilerError::UnresolvedSlot(text)));
    }

    #[test]
    fn consecutive_advances_merge() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let text = job.allocate_xref_id();
        let unit = job.root_unit_mut();
        for _ in 0..3 {
            unit.update.push(create_advance_op(1, None));
        }
        unit.update.push(interpolate(text));
        unit.update.push(create_advance_op(1, None));

        merge_advances(&mut job).unwrap();

        assert_eq!(deltas(&job), vec![3, 1]);
    }
}
