//! Expand Safe Reads Phase
//!
//! Finds all unresolved safe read expressions and converts them into plain reads guarded by
//! null checks: `a?.b` becomes `(a == null ? null : a.b)`. Safe reads in templates default to
//! `null` instead of `undefined`. Temporaries are introduced where a guard would otherwise be
//! evaluated twice.

use indexmap::IndexSet;

use crate::error::Result;
use crate::output::output_ast::{self as o, Expression};
use crate::template::pipeline::ir::{
    transform_expressions_in_expression, AssignTemporaryExpr, CompatibilityMode, ReadTemporaryExpr,
    SafeTernaryExpr, TransformExpressions, VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::{CompilationJob, XrefAllocator};

struct SafeTransformContext<'a> {
    ids: &'a mut XrefAllocator,
    compatibility: CompatibilityMode,
}

pub fn expand_safe_reads(job: &mut CompilationJob) -> Result<()> {
    let compatibility = job.compatibility;
    let parts = job.parts_mut();
    let mut ctx = SafeTransformContext {
        ids: parts.ids,
        compatibility,
    };
    for unit in parts.units {
        for op in unit.create.iter_mut() {
            expand_in_op(op, &mut ctx);
        }
        for op in unit.update.iter_mut() {
            expand_in_op(op, &mut ctx);
        }
    }
    Ok(())
}

fn expand_in_op(op: &mut dyn TransformExpressions, ctx: &mut SafeTransformContext<'_>) {
    op.transform_expressions(&mut |expr, _| safe_transform(expr, ctx), VisitorContextFlag::NONE);
    op.transform_expressions(&mut |expr, _| ternary_transform(expr), VisitorContextFlag::NONE);
}

/// Whether evaluating `expr` twice could observe side effects or be costly.
fn needs_temporary_in_safe_access(expr: &Expression) -> bool {
    match expr {
        Expression::Unary(unary) => needs_temporary_in_safe_access(&unary.expr),
        Expression::BinaryOp(binary) => {
            needs_temporary_in_safe_access(&binary.lhs) || needs_temporary_in_safe_access(&binary.rhs)
        }
        Expression::Conditional(cond) => {
            cond.false_case.as_deref().is_some_and(needs_temporary_in_safe_access)
                || needs_temporary_in_safe_access(&cond.condition)
                || needs_temporary_in_safe_access(&cond.true_case)
        }
        Expression::NotExpr(not) => needs_temporary_in_safe_access(&not.condition),
        Expression::AssignTemporary(assign) => needs_temporary_in_safe_access(&assign.expr),
        Expression::ReadProp(read) => needs_temporary_in_safe_access(&read.receiver),
        Expression::ReadKey(read) => {
            needs_temporary_in_safe_access(&read.receiver) || needs_temporary_in_safe_access(&read.index)
        }
        Expression::Parens(parens) => needs_temporary_in_safe_access(&parens.expr),
        Expression::InvokeFn(_)
        | Expression::LiteralArray(_)
        | Expression::LiteralMap(_)
        | Expression::SafeInvokeFunction(_)
        | Expression::PipeBinding(_) => true,
        _ => false,
    }
}

fn temporaries_in(expr: &Expression) -> IndexSet<XrefId> {
    let mut temporaries = IndexSet::new();
    transform_expressions_in_expression(
        expr.clone(),
        &mut |e, _| {
            if let Expression::AssignTemporary(assign) = &e {
                temporaries.insert(assign.xref);
            }
            e
        },
        VisitorContextFlag::NONE,
    );
    temporaries
}

/// Turns assignments of the given temporaries into reads.
fn eliminate_temporary_assignments(
    expr: Expression,
    temporaries: &IndexSet<XrefId>,
    compatibility: CompatibilityMode,
) -> Expression {
    transform_expressions_in_expression(
        expr,
        &mut |e, _| match e {
            Expression::AssignTemporary(assign) if temporaries.contains(&assign.xref) => {
                let read = Expression::ReadTemporary(ReadTemporaryExpr::new(assign.xref));
                // Compatibility output assigns the temporary to itself.
                if compatibility == CompatibilityMode::TemplateDefinitionBuilder {
                    Expression::AssignTemporary(AssignTemporaryExpr::new(read, assign.xref))
                } else {
                    read
                }
            }
            other => other,
        },
        VisitorContextFlag::NONE,
    )
}

/// A safe ternary guarded by `guard`, with a body built from a second copy of the guard. The
/// guard is stored in a temporary when it must not be evaluated twice.
fn safe_ternary_with_temporary(
    guard: Expression,
    body: impl FnOnce(Expression) -> Expression,
    ctx: &mut SafeTransformContext<'_>,
) -> SafeTernaryExpr {
    let (guard, receiver) = if needs_temporary_in_safe_access(&guard) {
        let xref = ctx.ids.allocate();
        (
            Expression::AssignTemporary(AssignTemporaryExpr::new(guard, xref)),
            Expression::ReadTemporary(ReadTemporaryExpr::new(xref)),
        )
    } else {
        // In `a?.[b?.c()]?.d` the key's temporary assignment would be duplicated into both
        // sides, so the body side reads it instead.
        let temporaries = temporaries_in(&guard);
        let receiver = eliminate_temporary_assignments(guard.clone(), &temporaries, ctx.compatibility);
        (guard, receiver)
    };
    SafeTernaryExpr {
        guard: Box::new(guard),
        expr: Box::new(body(receiver)),
    }
}

/// An access expression split into its receiver and a way to rebuild it on a new receiver.
enum Access {
    Safe(Expression, Box<dyn FnOnce(Expression) -> Expression>),
    Unsafe(Expression, Box<dyn FnOnce(Expression) -> Expression>),
}

fn split_access(expr: Expression) -> Result<Access, Expression> {
    Ok(match expr {
        Expression::SafePropertyRead(read) => {
            let name = read.name;
            Access::Safe(*read.receiver, Box::new(move |r| r.prop(name)))
        }
        Expression::SafeKeyedRead(read) => {
            let index = *read.index;
            Access::Safe(*read.receiver, Box::new(move |r| r.key(index)))
        }
        Expression::SafeInvokeFunction(call) => {
            let args = call.args;
            Access::Safe(*call.receiver, Box::new(move |r| r.call_fn(args, None)))
        }
        Expression::ReadProp(read) => {
            let name = read.name;
            Access::Unsafe(*read.receiver, Box::new(move |r| r.prop(name)))
        }
        Expression::ReadKey(read) => {
            let index = *read.index;
            Access::Unsafe(*read.receiver, Box::new(move |r| r.key(index)))
        }
        Expression::InvokeFn(call) => {
            let (args, source_span, pure) = (call.args, call.source_span, call.pure);
            Access::Unsafe(
                *call.fn_,
                Box::new(move |r| {
                    Expression::InvokeFn(o::InvokeFunctionExpr {
                        fn_: Box::new(r),
                        args,
                        source_span,
                        pure,
                    })
                }),
            )
        }
        other => return Err(other),
    })
}

/// Applies `f` to the body of the innermost safe ternary of a chain.
fn rebuild_deepest(
    ternary: SafeTernaryExpr,
    f: impl FnOnce(Expression) -> SafeTernaryOrExpr,
) -> SafeTernaryExpr {
    let expr = match *ternary.expr {
        Expression::SafeTernary(inner) => Expression::SafeTernary(rebuild_deepest(inner, f)),
        body => f(body).into_expression(),
    };
    SafeTernaryExpr {
        guard: ternary.guard,
        expr: Box::new(expr),
    }
}

enum SafeTernaryOrExpr {
    Ternary(SafeTernaryExpr),
    Expr(Expression),
}

impl SafeTernaryOrExpr {
    fn into_expression(self) -> Expression {
        match self {
            SafeTernaryOrExpr::Ternary(ternary) => Expression::SafeTernary(ternary),
            SafeTernaryOrExpr::Expr(expr) => expr,
        }
    }
}

fn safe_transform(expr: Expression, ctx: &mut SafeTransformContext<'_>) -> Expression {
    let receiver = match &expr {
        Expression::ReadProp(read) => Some(&*read.receiver),
        Expression::ReadKey(read) => Some(&*read.receiver),
        Expression::InvokeFn(call) => Some(&*call.fn_),
        _ => None,
    };
    // Plain accesses only change when they continue an expanded safe chain.
    if receiver.is_some_and(|r| !matches!(r, Expression::SafeTernary(_))) {
        return expr;
    }
    let access = match split_access(expr) {
        Ok(access) => access,
        Err(other) => return other,
    };
    match access {
        // The receiver was already expanded: the access continues the innermost ternary's body.
        Access::Unsafe(Expression::SafeTernary(ternary), rebuild) => {
            Expression::SafeTernary(rebuild_deepest(ternary, |body| SafeTernaryOrExpr::Expr(rebuild(body))))
        }
        Access::Safe(Expression::SafeTernary(ternary), rebuild) => {
            Expression::SafeTernary(rebuild_deepest(ternary, |body| {
                SafeTernaryOrExpr::Ternary(safe_ternary_with_temporary(body, rebuild, ctx))
            }))
        }
        Access::Safe(receiver, rebuild) => Expression::SafeTernary(safe_ternary_with_temporary(receiver, rebuild, ctx)),
        Access::Unsafe(receiver, rebuild) => rebuild(receiver),
    }
}

fn ternary_transform(expr: Expression) -> Expression {
    match expr {
        Expression::SafeTernary(ternary) => Expression::Parens(o::ParenthesizedExpr {
            expr: Box::new(ternary.guard.equals(o::null_expr()).conditional(o::null_expr(), Some(*ternary.expr))),
            source_span: None,
        }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::pipeline::ir::SafePropertyReadExpr;

    fn ctx_for(ids: &mut XrefAllocator) -> SafeTransformContext<'_> {
        SafeTransformContext {
            ids,
            compatibility: CompatibilityMode::Full,
        }
    }

    fn safe_prop(receiver: Expression, name: &str) -> Expression {
        Expression::SafePropertyRead(SafePropertyReadExpr {
            receiver: Box::new(receiver),
            name: name.to_string(),
        })
    }

    fn expand(expr: Expression) -> Expression {
        let mut job = CompilationJob::component(
            "Cmp",
            crate::constant_pool::ConstantPool::new(),
            crate::config::PipelineConfig::default(),
        );
        let parts = job.parts_mut();
        let mut ctx = ctx_for(parts.ids);
        let expanded = transform_expressions_in_expression(expr, &mut |e, _| safe_transform(e, &mut ctx), VisitorContextFlag::NONE);
        transform_expressions_in_expression(expanded, &mut |e, _| ternary_transform(e), VisitorContextFlag::NONE)
    }

    fn guarded(guard: Expression, body: Expression) -> Expression {
        Expression::Parens(o::ParenthesizedExpr {
            expr: Box::new(guard.equals(o::null_expr()).conditional(o::null_expr(), Some(body))),
            source_span: None,
        })
    }

    #[test]
    fn safe_property_read_becomes_null_guard() {
        let out = expand(safe_prop(o::variable("a"), "b"));
        assert!(out.is_equivalent(&guarded(o::variable("a"), o::variable("a").prop("b"))));
    }

    #[test]
    fn trailing_plain_reads_join_the_guarded_body() {
        let out = expand(safe_prop(o::variable("a"), "b").prop("c"));
        assert!(out.is_equivalent(&guarded(o::variable("a"), o::variable("a").prop("b").prop("c"))));
    }

    #[test]
    fn calls_in_the_guard_use_a_temporary() {
        let out = expand(safe_prop(o::variable("f").call_fn(vec![], None), "b"));
        let Expression::Parens(parens) = out else { panic!("expected parens") };
        let Expression::Conditional(cond) = *parens.expr else { panic!("expected a conditional") };
        let Expression::BinaryOp(check) = *cond.condition else { panic!("expected a null check") };
        assert!(matches!(*check.lhs, Expression::AssignTemporary(_)));
        assert!(matches!(cond.false_case.as_deref(), Some(Expression::ReadProp(read)) if matches!(*read.receiver, Expression::ReadTemporary(_))));
    }
}
