//! Save Restore View Phase
//!
//! When inside of a listener, we may need access to one or more enclosing views. Therefore,
//! each view saves the current view, and each listener that needs it restores that view. Save
//! variables are generated eagerly; unused ones are optimized away later.

use crate::error::Result;
use crate::output::output_ast::{Expression, Statement};
use crate::template::pipeline::ir::{
    create_variable_op, CreateOp, EmptyExpr, GetCurrentViewExpr, ListenerOp, ResetViewExpr, RestoreViewExpr, SemanticVariable,
    TransformExpressions, UpdateOp, VariableFlags, VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::{CompilationJob, XrefAllocator};

pub fn save_and_restore_view(job: &mut CompilationJob) -> Result<()> {
    let root = job.root;
    let parts = job.parts_mut();
    for unit in parts.units {
        let view = unit.xref;
        unit.create.prepend([CreateOp::Variable(create_variable_op(
            parts.ids.allocate(),
            SemanticVariable::saved_view(view),
            Expression::GetCurrentView(GetCurrentViewExpr),
            VariableFlags::NONE,
        ))]);

        for op in unit.create.iter_mut() {
            let needs_restore = match op {
                // Embedded views always need the save/restore view operations.
                CreateOp::Listener(_) | CreateOp::TwoWayListener(_) if view != root => true,
                CreateOp::Listener(_) | CreateOp::TwoWayListener(_) => reads_view_state(op),
                _ => false,
            };
            if needs_restore {
                if let Some(listener) = op.as_listener_mut() {
                    add_save_restore_view_operation(listener, view, parts.ids);
                }
            }
        }
    }
    Ok(())
}

/// Whether a root view listener reads local references or `@let` values, which live in the
/// view's state.
fn reads_view_state(op: &mut CreateOp) -> bool {
    let mut found = false;
    op.transform_expressions(
        &mut |expr, _| {
            if matches!(expr, Expression::Reference(_) | Expression::ContextLetReference(_)) {
                found = true;
            }
            expr
        },
        VisitorContextFlag::NONE,
    );
    found
}

fn add_save_restore_view_operation(listener: &mut ListenerOp, view: XrefId, ids: &mut XrefAllocator) {
    listener.handler_ops.prepend([UpdateOp::Variable(create_variable_op(
        ids.allocate(),
        SemanticVariable::context(view),
        Expression::RestoreView(RestoreViewExpr::new(view)),
        VariableFlags::NONE,
    ))]);

    // Every `return` of the handler resets the view before leaving the listener.
    for op in listener.handler_ops.iter_mut() {
        if let UpdateOp::Statement(statement) = op {
            if let Statement::Return(ret) = &mut statement.statement {
                let value = std::mem::replace(&mut *ret.value, Expression::Empty(EmptyExpr::default()));
                *ret.value = Expression::ResetView(ResetViewExpr::new(value));
            }
        }
    }
}
