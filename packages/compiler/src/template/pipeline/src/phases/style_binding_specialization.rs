//! Style Binding Specialization Phase
//!
//! Transforms special-case bindings with 'style' or 'class' in their names. Must run before the
//! main binding specialization pass.

use crate::error::{invariant, Result};
use crate::template::pipeline::ir::{
    BindingExpression, BindingKind, BindingOp, ClassPropOp, MapBindingOp, StylePropOp, UpdateOp,
};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn specialize_style_bindings(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        let ops = unit.update.take_all();
        let mut specialized = Vec::with_capacity(ops.len());
        for op in ops {
            specialized.push(match op {
                UpdateOp::Binding(binding) => specialize(binding)?,
                other => other,
            });
        }
        unit.update.push_all(specialized);
    }
    Ok(())
}

fn specialize(op: BindingOp) -> Result<UpdateOp> {
    let specialized = match op.kind {
        BindingKind::ClassName => {
            let BindingExpression::Expression(expression) = op.expression else {
                return invariant("Unexpected interpolation in ClassName binding");
            };
            UpdateOp::ClassProp(ClassPropOp {
                target: op.target,
                name: op.name,
                expression,
                source_span: op.source_span,
            })
        }
        BindingKind::StyleProperty => UpdateOp::StyleProp(StylePropOp {
            target: op.target,
            name: op.name,
            expression: op.expression,
            unit: op.unit,
            source_span: op.source_span,
        }),
        BindingKind::Property | BindingKind::Template if op.name == "style" => UpdateOp::StyleMap(MapBindingOp {
            target: op.target,
            expression: op.expression,
            source_span: op.source_span,
        }),
        BindingKind::Property | BindingKind::Template if op.name == "class" => UpdateOp::ClassMap(MapBindingOp {
            target: op.target,
            expression: op.expression,
            source_span: op.source_span,
        }),
        _ => UpdateOp::Binding(op),
    };
    Ok(specialized)
}
