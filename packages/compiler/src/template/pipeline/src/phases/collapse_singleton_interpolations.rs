//! Collapse Singleton Interpolations Phase
//!
//! Attribute, style and class interpolations of the form `"{{x}}"` (one expression with
//! empty strings around it) are bound as the plain expression instead.

use crate::error::Result;
use crate::template::pipeline::ir::{BindingExpression, UpdateOp};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn collapse_singleton_interpolations(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        for op in unit.update.iter_mut() {
            let expression = match op {
                UpdateOp::Attribute(op) => &mut op.expression,
                UpdateOp::StyleProp(op) => &mut op.expression,
                UpdateOp::StyleMap(op) | UpdateOp::ClassMap(op) => &mut op.expression,
                _ => continue,
            };
            collapse(expression);
        }
    }
    Ok(())
}

fn collapse(expression: &mut BindingExpression) {
    let BindingExpression::Interpolation(interpolation) = expression else {
        return;
    };
    if !interpolation.is_singleton() {
        return;
    }
    if let Some(single) = interpolation.expressions.pop() {
        *expression = BindingExpression::Expression(single);
    }
}
