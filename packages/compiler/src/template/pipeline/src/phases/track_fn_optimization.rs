//! Track Fn Optimization Phase
//!
//! `track` functions of `@for` repeaters can sometimes be replaced by a direct reference
//! instead of a generated function: tracking by `$index` or by the item itself uses a runtime
//! built-in, and a component method called as `fn($index, $item)` is passed in directly.
//! Remaining track expressions read the component through `TrackContextExpr`; reification
//! turns them into shared functions.

use crate::error::{CompilerError, Result};
use crate::output::output_ast::{self as o, Expression};
use crate::render3::r3_identifiers::Identifiers;
use crate::template::pipeline::ir::{
    transform_expressions_in_expression, ContextExpr, CreateOp, RepeaterCreateOp, TrackContextExpr,
    VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::CompilationJob;
use crate::template::pipeline::src::instruction as ng;

pub fn optimize_track_fns(job: &mut CompilationJob) -> Result<()> {
    let root = job.root;
    for unit in job.units_mut() {
        let view = unit.xref;
        for op in unit.create.iter_mut() {
            if let CreateOp::RepeaterCreate(repeater) = op {
                optimize_track_fn(repeater, root, view)?;
            }
        }
    }
    Ok(())
}

fn optimize_track_fn(repeater: &mut RepeaterCreateOp, root: XrefId, view: XrefId) -> Result<()> {
    match &*repeater.track {
        Expression::ReadVar(read) if read.name == "$index" => {
            repeater.track_by_fn = Some(o::import_ref(Identifiers::repeater_track_by_index()));
            return Ok(());
        }
        Expression::ReadVar(read) if read.name == "$item" => {
            repeater.track_by_fn = Some(o::import_ref(Identifiers::repeater_track_by_identity()));
            return Ok(());
        }
        _ => {}
    }

    if let Some((context_view, method)) = track_by_method_call(&repeater.track, root) {
        // The method might use `this` internally.
        repeater.uses_component_instance = true;
        if context_view == view {
            let receiver = Expression::Context(ContextExpr::new(context_view));
            repeater.track_by_fn = Some(receiver.prop(method));
        } else {
            // Outside the root view the context isn't the component, so the method is read
            // from the component instance. The original track expression is no longer used.
            let track_by = ng::component_instance().prop(method);
            *repeater.track = track_by.clone();
            repeater.track_by_fn = Some(track_by);
        }
        return Ok(());
    }

    let mut failure: Option<CompilerError> = None;
    let mut uses_component_instance = false;
    let track = std::mem::replace(&mut *repeater.track, o::null_expr());
    *repeater.track = transform_expressions_in_expression(
        track,
        &mut |expr, _| match expr {
            Expression::PipeBinding(_) | Expression::PipeBindingVariadic(_) => {
                failure.get_or_insert_with(|| {
                    CompilerError::Invariant("pipes are not allowed in track expressions".to_string())
                });
                expr
            }
            Expression::Context(context) => {
                uses_component_instance = true;
                Expression::TrackContext(TrackContextExpr { view: context.view })
            }
            other => other,
        },
        VisitorContextFlag::NONE,
    );
    repeater.uses_component_instance |= uses_component_instance;
    failure.map_or(Ok(()), Err)
}

/// Matches `ctx.method($index)` or `ctx.method($index, $item)` on the root context, returning
/// the context's view and the method name.
fn track_by_method_call(expr: &Expression, root: XrefId) -> Option<(XrefId, String)> {
    let Expression::InvokeFn(call) = expr else { return None };
    let Expression::ReadProp(read) = &*call.fn_ else { return None };
    let Expression::Context(context) = &*read.receiver else { return None };
    if context.view != root {
        return None;
    }
    let is_var = |arg: &Expression, name: &str| matches!(arg, Expression::ReadVar(v) if v.name == name);
    let matches = match call.args.as_slice() {
        [index] => is_var(index, "$index"),
        [index, item] => is_var(index, "$index") && is_var(item, "$item"),
        _ => false,
    };
    matches.then(|| (context.view, read.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::pipeline::ir::{RepeaterVarNames, SlotHandle};
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use std::sync::Arc;

    fn repeater(track: Expression) -> RepeaterCreateOp {
        let file = Arc::new(ParseSourceFile::new("@for (item of items; track item) {}", "test.html"));
        let span = ParseSourceSpan::from_offsets(&file, 0, 4);
        RepeaterCreateOp {
            xref: XrefId(1),
            handle: SlotHandle::new(XrefId(1)),
            empty_view: None,
            track: Box::new(track),
            track_by_fn: None,
            uses_component_instance: false,
            var_names: RepeaterVarNames::default(),
            tag: None,
            attributes: None,
            empty_tag: None,
            empty_attributes: None,
            decls: None,
            vars: None,
            empty_decls: None,
            empty_vars: None,
            start_source_span: span.clone(),
            whole_source_span: span,
        }
    }

    #[test]
    fn index_tracking_uses_builtin() {
        let mut op = repeater(o::variable("$index"));
        optimize_track_fn(&mut op, XrefId(0), XrefId(0)).unwrap();
        let expected = o::import_ref(Identifiers::repeater_track_by_index());
        assert!(op.track_by_fn.unwrap().is_equivalent(&expected));
        assert!(!op.uses_component_instance);
    }

    #[test]
    fn method_call_in_root_view_is_passed_directly() {
        let method = Expression::Context(ContextExpr::new(XrefId(0))).prop("trackById");
        let mut op = repeater(method.clone().call_fn(vec![o::variable("$index"), o::variable("$item")], None));
        optimize_track_fn(&mut op, XrefId(0), XrefId(0)).unwrap();
        assert!(op.track_by_fn.unwrap().is_equivalent(&method));
        assert!(op.uses_component_instance);
    }

    #[test]
    fn other_expressions_read_the_track_context() {
        let track = Expression::Context(ContextExpr::new(XrefId(0))).prop("prefix");
        let mut op = repeater(track);
        optimize_track_fn(&mut op, XrefId(0), XrefId(2)).unwrap();
        assert!(op.track_by_fn.is_none());
        assert!(op.uses_component_instance);
        assert!(matches!(&*op.track, Expression::ReadProp(read) if matches!(*read.receiver, Expression::TrackContext(_))));
    }
}
