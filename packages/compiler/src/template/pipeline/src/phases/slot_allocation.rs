//! Slot Allocation Phase
//!
//! Assigns data slots to every create op that consumes them, then propagates the assigned slots
//! to every op and expression which references them through a `SlotHandle`.
//!
//! This phase is also responsible for counting the number of slots used for each view (its
//! `decls`) and propagating that number into the `Template` operations which declare embedded
//! views.

use indexmap::IndexMap;

use crate::error::{CompilerError, Result};
use crate::output::output_ast::Expression;
use crate::template::pipeline::ir::{
    CreateOp, SlotHandle, TransformExpressions, UpdateOp, VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn allocate_slots(job: &mut CompilationJob) -> Result<()> {
    // Slots of every op across the job. Xrefs are unique per job, so one map serves all views.
    let mut slot_map: IndexMap<XrefId, usize> = IndexMap::new();

    for unit in job.units_mut() {
        let mut slot_count = 0;
        for op in unit.create.iter_mut() {
            let used = op.num_slots_used();
            let Some(handle) = op.handle_mut() else { continue };
            handle.slot = Some(slot_count);
            slot_map.insert(handle.target, slot_count);
            slot_count += used;
        }
        unit.decls = Some(slot_count);
    }

    let decls: IndexMap<XrefId, usize> = job.units().map(|unit| (unit.xref, unit.decls.unwrap_or(0))).collect();
    let view_decls = |view: XrefId| -> Result<usize> {
        decls.get(&view).copied().ok_or(CompilerError::UnknownView(view))
    };

    for unit in job.units_mut() {
        for op in unit.create.iter_mut() {
            match op {
                CreateOp::Template(t) | CreateOp::ConditionalCreate(t) | CreateOp::ConditionalBranchCreate(t) => {
                    t.decls = Some(view_decls(t.xref)?);
                }
                CreateOp::RepeaterCreate(repeater) => {
                    repeater.decls = Some(view_decls(repeater.xref)?);
                    if let Some(empty) = repeater.empty_view {
                        repeater.empty_decls = Some(view_decls(empty)?);
                    }
                }
                CreateOp::Projection(projection) => {
                    if let Some(fallback) = projection.fallback_view {
                        projection.fallback_decls = Some(view_decls(fallback)?);
                    }
                }
                _ => {}
            }
        }
    }

    let mut failure: Option<CompilerError> = None;
    for unit in job.units_mut() {
        for op in unit.create.iter_mut() {
            if let Err(err) = resolve_create_op(op, &slot_map) {
                failure.get_or_insert(err);
            }
            resolve_expressions(op, &slot_map, &mut failure);
        }
        for op in unit.update.iter_mut() {
            if let Err(err) = resolve_update_op(op, &slot_map) {
                failure.get_or_insert(err);
            }
            resolve_expressions(op, &slot_map, &mut failure);
        }
    }
    failure.map_or(Ok(()), Err)
}

fn resolve(handle: &mut SlotHandle, slot_map: &IndexMap<XrefId, usize>) -> Result<()> {
    let slot = slot_map.get(&handle.target).ok_or(CompilerError::UnresolvedSlot(handle.target))?;
    handle.slot = Some(*slot);
    Ok(())
}

fn resolve_create_op(op: &mut CreateOp, slot_map: &IndexMap<XrefId, usize>) -> Result<()> {
    match op {
        CreateOp::Listener(listener) | CreateOp::TwoWayListener(listener) => {
            if !listener.host_listener {
                resolve(&mut listener.target_slot, slot_map)?;
            }
            for handler_op in listener.handler_ops.iter_mut() {
                resolve_update_op(handler_op, slot_map)?;
            }
        }
        CreateOp::Defer(defer) => {
            resolve(&mut defer.main_slot, slot_map)?;
            for handle in [&mut defer.loading_slot, &mut defer.placeholder_slot, &mut defer.error_slot]
                .into_iter()
                .flatten()
            {
                resolve(handle, slot_map)?;
            }
        }
        CreateOp::DeferOn(defer_on) => {
            if let Some(handle) = defer_on.trigger.target_mut().and_then(|t| t.target_slot.as_mut()) {
                resolve(handle, slot_map)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn resolve_update_op(op: &mut UpdateOp, slot_map: &IndexMap<XrefId, usize>) -> Result<()> {
    match op {
        UpdateOp::Repeater(repeater) => resolve(&mut repeater.target_slot, slot_map),
        UpdateOp::I18nApply(apply) => resolve(&mut apply.handle, slot_map),
        _ => Ok(()),
    }
}

/// Fills every expression-level handle of `op`, including those inside listener handlers.
fn resolve_expressions(
    op: &mut dyn TransformExpressions,
    slot_map: &IndexMap<XrefId, usize>,
    failure: &mut Option<CompilerError>,
) {
    op.transform_expressions(
        &mut |mut expr, _| {
            let handle = match &mut expr {
                Expression::Reference(e) => Some(&mut e.target_slot),
                Expression::PipeBinding(e) => Some(&mut e.target_slot),
                Expression::PipeBindingVariadic(e) => Some(&mut e.target_slot),
                Expression::SlotLiteral(e) => Some(&mut e.slot),
                Expression::ConditionalCase(e) => Some(&mut e.target_slot),
                Expression::ContextLetReference(e) => Some(&mut e.target_slot),
                _ => None,
            };
            if let Some(handle) = handle {
                if let Err(err) = resolve(handle, slot_map) {
                    failure.get_or_insert(err);
                }
            }
            expr
        },
        VisitorContextFlag::NONE,
    );
}
