//! Pipe Variadic Phase
//!
//! Pipes that accept more than 4 arguments are variadic, and are handled with a different
//! runtime instruction taking all arguments as one array.

use crate::error::Result;
use crate::output::output_ast::{self as o, Expression};
use crate::template::pipeline::ir::{transform_expressions_in_op, PipeBindingVariadicExpr, VisitorContextFlag};
use crate::template::pipeline::src::compilation::CompilationJob;

/// Largest argument count with a dedicated `pipeBindN` instruction.
const MAX_FIXED_PIPE_ARGS: usize = 4;

pub fn create_variadic_pipes(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        for op in unit.update.iter_mut() {
            transform_expressions_in_op(op, &mut to_variadic, VisitorContextFlag::NONE);
        }
    }
    Ok(())
}

fn to_variadic(expr: Expression, _flags: VisitorContextFlag) -> Expression {
    match expr {
        Expression::PipeBinding(pipe) if pipe.args.len() > MAX_FIXED_PIPE_ARGS => {
            let num_args = pipe.args.len();
            Expression::PipeBindingVariadic(PipeBindingVariadicExpr {
                target: pipe.target,
                target_slot: pipe.target_slot,
                name: pipe.name,
                args: Box::new(o::literal_arr(pipe.args)),
                num_args,
                var_offset: pipe.var_offset,
            })
        }
        other => other,
    }
}
