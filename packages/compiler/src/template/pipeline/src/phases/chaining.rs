//! Chaining Phase
//!
//! Post-processes reified views, turning runs of calls to the same chainable instruction into a
//! single chained call. Two element starts in sequence:
//!
//! ```text
//! ɵɵelementStart(0, 'div');
//! ɵɵelementStart(1, 'span');
//! ```
//!
//! become `ɵɵelementStart(0, 'div')(1, 'span');`.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{invariant, Result};
use crate::output::output_ast::{self as o, Expression, ExternalReference, InvokeFunctionExpr, Statement};
use crate::render3::r3_identifiers::Identifiers;
use crate::template::pipeline::ir::{OpId, OpList, SharedOps};
use crate::template::pipeline::src::compilation::CompilationJob;

/// Chains deeper than this risk overflowing the stack of whatever evaluates them.
const MAX_CHAIN_LENGTH: usize = 256;

/// Chainable instructions, mapped to the instruction a chain of them may continue with.
static CHAIN_COMPATIBILITY: Lazy<HashMap<ExternalReference, ExternalReference>> = Lazy::new(|| {
    let mut map: HashMap<_, _> = [
        Identifiers::attribute(),
        Identifiers::class_prop(),
        Identifiers::element(),
        Identifiers::element_container(),
        Identifiers::element_container_end(),
        Identifiers::element_container_start(),
        Identifiers::element_end(),
        Identifiers::element_start(),
        Identifiers::dom_property(),
        Identifiers::i18n_exp(),
        Identifiers::listener(),
        Identifiers::property(),
        Identifiers::style_prop(),
        Identifiers::template_create(),
        Identifiers::two_way_property(),
        Identifiers::two_way_listener(),
        Identifiers::declare_let(),
        Identifiers::conditional_branch_create(),
        Identifiers::dom_element(),
        Identifiers::dom_element_start(),
        Identifiers::dom_element_end(),
        Identifiers::dom_element_container(),
        Identifiers::dom_element_container_start(),
        Identifiers::dom_element_container_end(),
        Identifiers::dom_listener(),
        Identifiers::dom_template(),
    ]
    .into_iter()
    .map(|instruction| (instruction.clone(), instruction))
    .collect();
    // The branches of an `@if` or `@switch` follow its first template.
    map.insert(Identifiers::conditional_create(), Identifiers::conditional_branch_create());
    map
});

struct Chain {
    /// The statement holding the whole chain.
    head: OpId,
    /// What a call must chain as to join this chain.
    continues_as: &'static ExternalReference,
    length: usize,
}

pub fn chain(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        chain_operations_in_list(&mut unit.create)?;
        chain_operations_in_list(&mut unit.update)?;
    }
    Ok(())
}

/// The call of an expression statement whose callee is a chainable instruction, with that
/// instruction and the instruction a chain started by it continues with.
fn chainable_call(
    stmt: &Statement,
) -> Option<(&'static ExternalReference, &'static ExternalReference, &InvokeFunctionExpr)> {
    let Statement::Expression(stmt) = stmt else { return None };
    let Expression::InvokeFn(call) = &*stmt.expr else { return None };
    let Expression::External(callee) = &*call.fn_ else { return None };
    let (instruction, continues_as) = CHAIN_COMPATIBILITY.get_key_value(&callee.value)?;
    Some((instruction, continues_as, call))
}

fn chain_operations_in_list<T: SharedOps>(ops: &mut OpList<T>) -> Result<()> {
    let mut current: Option<Chain> = None;

    for id in ops.ids() {
        let link = ops
            .get(id)
            .and_then(SharedOps::as_statement)
            .and_then(|op| chainable_call(&op.statement))
            .map(|(instruction, continues_as, call)| {
                (instruction, continues_as, call.args.clone(), call.source_span.clone(), call.pure)
            });
        let Some((instruction, continues_as, args, source_span, pure)) = link else {
            current = None;
            continue;
        };

        match current.as_mut() {
            Some(chain) if chain.continues_as == instruction && chain.length < MAX_CHAIN_LENGTH => {
                let Some(Statement::Expression(head)) =
                    ops.get_mut(chain.head).and_then(SharedOps::as_statement_mut).map(|op| &mut op.statement)
                else {
                    return invariant("chain head is no longer an expression statement");
                };
                let callee = std::mem::replace(&mut *head.expr, o::null_expr());
                *head.expr = Expression::InvokeFn(InvokeFunctionExpr {
                    fn_: Box::new(callee),
                    args,
                    source_span,
                    pure,
                });
                chain.length += 1;
                ops.remove(id)?;
            }
            _ => {
                current = Some(Chain {
                    head: id,
                    continues_as,
                    length: 1,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::template::pipeline::ir::{create_statement_op, CreateOp, UpdateOp};

    fn call(instruction: ExternalReference, slot: usize) -> Statement {
        o::import_ref(instruction).call_fn(vec![o::literal(slot)], None).to_stmt()
    }

    /// Every link of each statement as `(instruction, first argument)`, innermost first.
    fn links<T: SharedOps>(ops: &OpList<T>) -> Vec<Vec<(String, String)>> {
        ops.iter()
            .filter_map(SharedOps::as_statement)
            .map(|op| {
                let Statement::Expression(stmt) = &op.statement else { panic!("expected an expression statement") };
                let mut links = Vec::new();
                let mut expr = &*stmt.expr;
                while let Expression::InvokeFn(call) = expr {
                    links.push(format!("{:?}", call.args[0]));
                    expr = &call.fn_;
                }
                let Expression::External(callee) = expr else { panic!("expected an instruction") };
                let name = callee.value.name.clone().unwrap_or_default();
                links.into_iter().rev().map(|arg| (name.clone(), arg)).collect()
            })
            .collect()
    }

    fn names<T: SharedOps>(ops: &OpList<T>) -> Vec<Vec<String>> {
        links(ops).into_iter().map(|stmt| stmt.into_iter().map(|(name, _)| name).collect()).collect()
    }

    fn job_with(create: Vec<Statement>, update: Vec<Statement>) -> CompilationJob {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let unit = job.root_unit_mut();
        for stmt in create {
            unit.create.push(CreateOp::Statement(create_statement_op(stmt)));
        }
        for stmt in update {
            unit.update.push(UpdateOp::Statement(create_statement_op(stmt)));
        }
        job
    }

    #[test]
    fn consecutive_calls_to_one_instruction_are_chained_in_order() {
        let mut job = job_with(
            vec![
                call(Identifiers::element_start(), 0),
                call(Identifiers::element_start(), 1),
                call(Identifiers::element_end(), 0),
                call(Identifiers::element_end(), 0),
            ],
            vec![call(Identifiers::property(), 0), call(Identifiers::property(), 1)],
        );

        chain(&mut job).unwrap();

        let unit = job.root_unit();
        assert_eq!(
            names(&unit.create),
            vec![vec!["ɵɵelementStart", "ɵɵelementStart"], vec!["ɵɵelementEnd", "ɵɵelementEnd"]]
        );
        let args: Vec<String> = links(&unit.create)[0].iter().map(|(_, arg)| arg.clone()).collect();
        assert_eq!(args, vec![format!("{:?}", o::literal(0usize)), format!("{:?}", o::literal(1usize))]);
        assert_eq!(names(&unit.update), vec![vec!["ɵɵproperty", "ɵɵproperty"]]);
    }

    #[test]
    fn unchainable_calls_break_a_chain() {
        let mut job = job_with(
            vec![],
            vec![
                call(Identifiers::property(), 0),
                call(Identifiers::advance(), 1),
                call(Identifiers::property(), 1),
                call(Identifiers::text_interpolate_n(0), 2),
                call(Identifiers::text_interpolate_n(0), 3),
            ],
        );

        chain(&mut job).unwrap();

        assert_eq!(
            names(&job.root_unit().update),
            vec![
                vec!["ɵɵproperty"],
                vec!["ɵɵadvance"],
                vec!["ɵɵproperty"],
                vec!["ɵɵtextInterpolate"],
                vec!["ɵɵtextInterpolate"],
            ]
        );
    }

    #[test]
    fn conditional_branches_continue_the_first_template() {
        let mut job = job_with(
            vec![
                call(Identifiers::conditional_create(), 0),
                call(Identifiers::conditional_branch_create(), 1),
                call(Identifiers::conditional_branch_create(), 2),
                call(Identifiers::conditional_create(), 3),
            ],
            vec![],
        );

        chain(&mut job).unwrap();

        assert_eq!(
            names(&job.root_unit().create),
            vec![
                vec!["ɵɵconditionalCreate", "ɵɵconditionalCreate", "ɵɵconditionalCreate"],
                vec!["ɵɵconditionalCreate"],
            ]
        );
    }

    #[test]
    fn long_runs_split_at_the_maximum_length() {
        let run = (0..MAX_CHAIN_LENGTH + 1).map(|slot| call(Identifiers::text(), slot)).collect();
        let mut job = job_with(run, vec![]);

        chain(&mut job).unwrap();

        let lengths: Vec<usize> = links(&job.root_unit().create).iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![1; MAX_CHAIN_LENGTH + 1]);

        let run = (0..MAX_CHAIN_LENGTH + 1).map(|slot| call(Identifiers::element(), slot)).collect();
        let mut job = job_with(run, vec![]);

        chain(&mut job).unwrap();

        let lengths: Vec<usize> = links(&job.root_unit().create).iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![MAX_CHAIN_LENGTH, 1]);
    }
}
