//! Transform Two Way Binding Set Phase
//!
//! Transforms a `TwoWayBindingSet` expression into an expression that either sets a value
//! through the `twoWayBindingSet` instruction or falls back to setting the value directly:
//! `ɵɵtwoWayBindingSet(target, value) || (target = value)`.

use crate::error::{CompilerError, Result};
use crate::output::output_ast::Expression;
use crate::template::pipeline::ir::{CreateOp, TransformExpressions, VisitorContextFlag};
use crate::template::pipeline::src::compilation::CompilationJob;
use crate::template::pipeline::src::instruction as ng;

pub fn transform_two_way_binding_set(job: &mut CompilationJob) -> Result<()> {
    let mut failure: Option<CompilerError> = None;
    for unit in job.units_mut() {
        for op in unit.create.iter_mut() {
            if !matches!(op, CreateOp::TwoWayListener(_)) {
                continue;
            }
            op.transform_expressions(
                &mut |expr, flags| {
                    if !flags.contains(VisitorContextFlag::IN_CHILD_OPERATION) {
                        return expr;
                    }
                    let Expression::TwoWayBindingSet(set) = expr else {
                        return expr;
                    };
                    let (target, value) = (*set.target, *set.value);
                    match target {
                        Expression::ReadProp(_) | Expression::ReadKey(_) => {
                            let call = ng::two_way_binding_set(target.clone(), value.clone());
                            match target.set(value) {
                                Some(assignment) => call.or(assignment),
                                None => call,
                            }
                        }
                        // A local template variable can't be assigned, so only the instruction
                        // is emitted. Invalid usages are flagged by template type checking.
                        Expression::ReadVariable(_) => ng::two_way_binding_set(target, value),
                        other => {
                            failure.get_or_insert_with(|| {
                                CompilerError::Invariant(format!(
                                    "unsupported expression in two-way action binding: {:?}",
                                    other
                                ))
                            });
                            other
                        }
                    }
                },
                VisitorContextFlag::NONE,
            );
        }
    }
    failure.map_or(Ok(()), Err)
}
