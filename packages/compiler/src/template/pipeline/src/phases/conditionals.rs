//! Conditionals Phase
//!
//! Collapse the various conditions of conditional ops (if, switch) into a single test
//! expression: a chain of ternaries that yields the slot of the branch to display, or `-1`
//! when no branch matches.

use crate::error::Result;
use crate::output::output_ast::{self as o, Expression};
use crate::template::pipeline::ir::{
    AssignTemporaryExpr, ConditionalOp, ReadTemporaryExpr, SlotLiteralExpr, UpdateOp, XrefId,
};
use crate::template::pipeline::src::compilation::{CompilationJob, XrefAllocator};

pub fn generate_conditional_expressions(job: &mut CompilationJob) -> Result<()> {
    let parts = job.parts_mut();
    for unit in parts.units {
        for op in unit.update.iter_mut() {
            if let UpdateOp::Conditional(conditional) = op {
                process_conditional(conditional, parts.ids);
            }
        }
    }
    Ok(())
}

fn process_conditional(op: &mut ConditionalOp, ids: &mut XrefAllocator) {
    let mut conditions = std::mem::take(&mut op.conditions);

    // Any case with a `None` condition is `default`. If one exists, default to it instead.
    let mut test = match conditions.iter().position(|case| case.expr.is_none()) {
        Some(index) => {
            let default_case = conditions.remove(index);
            slot_literal(default_case.target)
        }
        None => o::literal(-1.0),
    };

    // Switch expressions assign their main test to a temporary, to avoid re-executing it.
    let mut switch_subject = op.test.take();
    let switch_tmp = switch_subject.as_ref().map(|_| ids.allocate());
    let mut alias_tmp: Option<XrefId> = None;

    for (index, case) in conditions.into_iter().enumerate().rev() {
        let Some(case_expr) = case.expr.map(|expr| *expr) else {
            continue;
        };
        let condition = match switch_tmp {
            Some(xref) => {
                // The first case tested (the last one folded) performs the assignment.
                let subject = match (index, switch_subject.take()) {
                    (0, Some(subject)) => Expression::AssignTemporary(AssignTemporaryExpr::new(subject, xref)),
                    _ => Expression::ReadTemporary(ReadTemporaryExpr::new(xref)),
                };
                subject.identical(case_expr)
            }
            None if case.alias.is_some() => {
                // Only one value can be passed into the conditional instruction, so every
                // aliased case stores its result in the same temporary.
                let xref = *alias_tmp.get_or_insert_with(|| ids.allocate());
                op.context_value = Some(Expression::ReadTemporary(ReadTemporaryExpr::new(xref)));
                Expression::AssignTemporary(AssignTemporaryExpr::new(case_expr, xref))
            }
            None => case_expr,
        };
        test = condition.conditional(slot_literal(case.target), Some(test));
    }

    op.processed = Some(test);
}

fn slot_literal(target: XrefId) -> Expression {
    Expression::SlotLiteral(SlotLiteralExpr::new(target))
}
