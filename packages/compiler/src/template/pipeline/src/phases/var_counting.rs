//! Var Counting Phase
//!
//! Counts the number of variable slots used within each view, and stores that on the view itself,
//! as well as propagates it to the `Template` ops for embedded views.
//!
//! Expressions needing their position in the variable table (pure functions and pipe bindings)
//! receive their offset here.

use indexmap::IndexMap;

use crate::error::Result;
use crate::output::output_ast::Expression;
use crate::template::pipeline::ir::{
    BindingExpression, CompatibilityMode, CreateOp, TransformExpressions, UpdateOp, VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn count_variables(job: &mut CompilationJob) -> Result<()> {
    let compatibility = job.compatibility;
    for unit in job.units_mut() {
        let mut var_count = 0;

        // Top-level binding slots come first.
        var_count += unit.create.iter().map(vars_used_by_create_op).sum::<usize>();
        var_count += unit.update.iter().map(vars_used_by_update_op).sum::<usize>();

        // Expressions inside ops are counted afterwards, since some of them are conditional
        // (a pipe inside a ternary) and must not shift the indices of top-level bindings.
        // Compatibility output assigns pure function offsets only after everything else.
        let phases: &[bool] = match compatibility {
            CompatibilityMode::TemplateDefinitionBuilder => &[false, true],
            CompatibilityMode::Full => &[true],
        };
        for &include_pure_functions in phases {
            let only_pure_functions = compatibility == CompatibilityMode::TemplateDefinitionBuilder && include_pure_functions;
            let mut assign = |expr: Expression, _: VisitorContextFlag| {
                assign_var_offset(expr, &mut var_count, include_pure_functions, only_pure_functions)
            };
            for op in unit.create.iter_mut() {
                op.transform_expressions(&mut assign, VisitorContextFlag::NONE);
            }
            for op in unit.update.iter_mut() {
                op.transform_expressions(&mut assign, VisitorContextFlag::NONE);
            }
        }

        unit.vars = Some(var_count);
    }

    let vars: IndexMap<XrefId, Option<usize>> = job.units().map(|unit| (unit.xref, unit.vars)).collect();
    let view_vars = |view: XrefId| vars.get(&view).copied().flatten();
    for unit in job.units_mut() {
        for op in unit.create.iter_mut() {
            match op {
                CreateOp::Template(t) | CreateOp::ConditionalCreate(t) | CreateOp::ConditionalBranchCreate(t) => {
                    t.vars = view_vars(t.xref);
                }
                CreateOp::RepeaterCreate(repeater) => {
                    repeater.vars = view_vars(repeater.xref);
                    repeater.empty_vars = repeater.empty_view.and_then(view_vars);
                }
                CreateOp::Projection(projection) => {
                    projection.fallback_vars = projection.fallback_view.and_then(view_vars);
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn assign_var_offset(
    mut expr: Expression,
    var_count: &mut usize,
    include_pure_functions: bool,
    only_pure_functions: bool,
) -> Expression {
    let is_pure_function = matches!(expr, Expression::PureFunction(_));
    if (is_pure_function && !include_pure_functions) || (!is_pure_function && only_pure_functions) {
        return expr;
    }
    let (offset, used) = match &mut expr {
        Expression::PureFunction(pure) => (&mut pure.var_offset, 1 + pure.args.len()),
        Expression::PipeBinding(pipe) => (&mut pipe.var_offset, 1 + pipe.args.len()),
        Expression::PipeBindingVariadic(pipe) => (&mut pipe.var_offset, 1 + pipe.num_args),
        _ => return expr,
    };
    *offset = Some(*var_count);
    *var_count += used;
    expr
}

fn vars_used_by_create_op(op: &CreateOp) -> usize {
    match op {
        // The empty view of a `@for` block is toggled through a binding slot.
        CreateOp::RepeaterCreate(repeater) if repeater.empty_view.is_some() => 1,
        _ => 0,
    }
}

fn interpolated_expressions(expression: &BindingExpression) -> usize {
    match expression {
        BindingExpression::Interpolation(interpolation) => interpolation.expressions.len(),
        BindingExpression::Expression(_) => 0,
    }
}

/// The variable slots an update op's instruction uses, beyond those of its nested expressions.
fn vars_used_by_update_op(op: &UpdateOp) -> usize {
    match op {
        UpdateOp::Attribute(attr) => match &attr.expression {
            BindingExpression::Interpolation(interpolation) if !interpolation.is_singleton() => {
                1 + interpolation.expressions.len()
            }
            _ => 1,
        },
        // Singleton property interpolations still store both the raw and the stringified value.
        UpdateOp::Property(prop) | UpdateOp::DomProperty(prop) => 1 + interpolated_expressions(&prop.expression),
        UpdateOp::TwoWayProperty(_) => 1,
        UpdateOp::StyleProp(style) => 2 + interpolated_expressions(&style.expression),
        UpdateOp::ClassProp(_) => 2,
        UpdateOp::StyleMap(map) | UpdateOp::ClassMap(map) => 2 + interpolated_expressions(&map.expression),
        UpdateOp::InterpolateText(text) => text.interpolation.expressions.len(),
        UpdateOp::I18nExpression(_) | UpdateOp::Conditional(_) | UpdateOp::DeferWhen(_) | UpdateOp::StoreLet(_) => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::output::output_ast as o;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{create_interpolate_text_op, ClassPropOp, Interpolation, PipeBindingExpr};
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("{{a}} {{b | p}}", "test.html"));
        ParseSourceSpan::from_offsets(&file, 0, 5)
    }

    #[test]
    fn binding_slots_precede_expression_offsets() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let text = job.allocate_xref_id();
        let pipe = job.allocate_xref_id();
        let div = job.allocate_xref_id();
        let piped = Expression::PipeBinding(PipeBindingExpr::new(pipe, "p", vec![o::variable("b")]));
        let unit = job.root_unit_mut();
        unit.update.push(create_interpolate_text_op(
            text,
            Interpolation::new(
                vec![String::new(), " ".to_string(), String::new()],
                vec![o::variable("a"), piped],
                Vec::new(),
            ),
            span(),
        ));
        unit.update.push(UpdateOp::ClassProp(ClassPropOp {
            target: div,
            name: "c".to_string(),
            expression: o::variable("c"),
            source_span: span(),
        }));

        count_variables(&mut job).unwrap();

        assert_eq!(job.root_unit().vars, Some(2 + 2 + 2));
        let mut offsets = Vec::new();
        for op in job.root_unit_mut().update.iter_mut() {
            op.transform_expressions(
                &mut |expr, _| {
                    if let Expression::PipeBinding(pipe) = &expr {
                        offsets.push(pipe.var_offset);
                    }
                    expr
                },
                VisitorContextFlag::NONE,
            );
        }
        assert_eq!(offsets, vec![Some(4)]);
    }
}
