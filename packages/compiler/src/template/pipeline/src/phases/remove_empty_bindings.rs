//! Remove Empty Bindings Phase
//!
//! Bindings with no content (`[attr.foo]=""` parses to an empty expression) can be safely
//! deleted.

use crate::error::Result;
use crate::output::output_ast::Expression;
use crate::template::pipeline::ir::UpdateOp;
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn remove_empty_bindings(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        unit.update.retain(|op| !is_empty_binding(op));
    }
    Ok(())
}

fn is_empty_binding(op: &UpdateOp) -> bool {
    match op {
        UpdateOp::Binding(op) => op.expression.is_empty_expression(),
        UpdateOp::Property(op) => op.expression.is_empty_expression(),
        UpdateOp::Attribute(op) => op.expression.is_empty_expression(),
        UpdateOp::StyleProp(op) => op.expression.is_empty_expression(),
        UpdateOp::StyleMap(op) | UpdateOp::ClassMap(op) => op.expression.is_empty_expression(),
        UpdateOp::ClassProp(op) => matches!(op.expression, Expression::Empty(_)),
        _ => false,
    }
}
