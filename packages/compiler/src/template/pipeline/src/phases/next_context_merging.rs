//! Next Context Merging Phase
//!
//! Merges logically sequential `NextContextExpr` operations.
//!
//! `NextContextExpr` can be referenced repeatedly, "popping" the runtime's context stack each
//! time. When two such expressions appear back-to-back, it's possible to merge them together
//! into a single `NextContextExpr` that steps multiple contexts. This merging is possible if all
//! conditions are met:
//!
//!   * The result of the `NextContextExpr` that's folded into the subsequent one is not stored
//!     (that is, the call is purely side-effectful).
//!   * No operations in between them uses the implicit context.

use crate::error::Result;
use crate::output::output_ast::{Expression, Statement};
use crate::template::pipeline::ir::{OpList, TransformExpressions, UpdateOp, VisitorContextFlag};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn merge_next_context_expressions(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        for op in unit.create.iter_mut() {
            if let Some(listener) = op.as_listener_mut() {
                merge_next_contexts_in_ops(&mut listener.handler_ops)?;
            }
        }
        merge_next_contexts_in_ops(&mut unit.update)?;
    }
    Ok(())
}

/// The steps of a statement that only advances the context, e.g. `nextContext(2);`.
fn standalone_next_context_steps(op: &UpdateOp) -> Option<usize> {
    let UpdateOp::Statement(statement) = op else { return None };
    match &statement.statement {
        Statement::Expression(stmt) => match &*stmt.expr {
            Expression::NextContext(next) => Some(next.steps),
            _ => None,
        },
        _ => None,
    }
}

fn merge_next_contexts_in_ops(ops: &mut OpList<UpdateOp>) -> Result<()> {
    for id in ops.ids() {
        let Some(merge_steps) = ops.get(id).and_then(standalone_next_context_steps) else { continue };

        let mut merged = false;
        let mut try_to_merge = true;
        let mut cursor = ops.next_of(id);
        while let Some(candidate_id) = cursor {
            if !try_to_merge {
                break;
            }
            let Some(candidate) = ops.get_mut(candidate_id) else { break };
            candidate.transform_expressions(
                &mut |expr, flags| {
                    if !try_to_merge || flags.contains(VisitorContextFlag::IN_CHILD_OPERATION) {
                        return expr;
                    }
                    match expr {
                        Expression::NextContext(mut next) => {
                            next.steps += merge_steps;
                            merged = true;
                            try_to_merge = false;
                            Expression::NextContext(next)
                        }
                        // These read the implicit context, so it must not move past them.
                        e @ (Expression::GetCurrentView(_)
                        | Expression::Reference(_)
                        | Expression::ContextLetReference(_)) => {
                            try_to_merge = false;
                            e
                        }
                        other => other,
                    }
                },
                VisitorContextFlag::NONE,
            );
            cursor = ops.next_of(candidate_id);
        }
        if merged {
            ops.remove(id)?;
        }
    }
    Ok(())
}
