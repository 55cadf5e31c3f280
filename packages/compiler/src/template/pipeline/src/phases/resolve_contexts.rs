//! Resolve Contexts Phase
//!
//! Resolves `ContextExpr` expressions (which represent embedded view or component contexts) to
//! either the `ctx` parameter of the view function (for the current view context) or to the
//! variables that store those contexts (for contexts reached through `nextContext()`).

use indexmap::IndexMap;

use crate::error::{CompilerError, Result};
use crate::output::output_ast::{self as o, Expression};
use crate::template::pipeline::ir::{
    CreateOp, Op, OpList, ReadVariableExpr, SemanticVariable, TransformExpressions, UpdateOp, VariableOp,
    VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::CompilationJob;

/// Ops that can open a context variable or a nested handler scope.
trait ContextScope: Op + TransformExpressions {
    fn variable(&self) -> Option<&VariableOp>;
    fn handler_ops_mut(&mut self) -> Option<&mut OpList<UpdateOp>>;
}

impl ContextScope for CreateOp {
    fn variable(&self) -> Option<&VariableOp> {
        match self {
            CreateOp::Variable(op) => Some(op),
            _ => None,
        }
    }

    fn handler_ops_mut(&mut self) -> Option<&mut OpList<UpdateOp>> {
        self.as_listener_mut().map(|listener| &mut listener.handler_ops)
    }
}

impl ContextScope for UpdateOp {
    fn variable(&self) -> Option<&VariableOp> {
        match self {
            UpdateOp::Variable(op) => Some(op),
            _ => None,
        }
    }

    fn handler_ops_mut(&mut self) -> Option<&mut OpList<UpdateOp>> {
        None
    }
}

pub fn resolve_contexts(job: &mut CompilationJob) -> Result<()> {
    let root = job.root;
    for unit in job.units_mut() {
        let view = unit.xref;
        process_lexical_scope(&mut unit.create, view, view == root)?;
        process_lexical_scope(&mut unit.update, view, view == root)?;
    }
    Ok(())
}

fn process_lexical_scope<T: ContextScope>(ops: &mut OpList<T>, view: XrefId, is_root: bool) -> Result<()> {
    // Expressions reaching each available context, by view.
    let mut scope: IndexMap<XrefId, Expression> = IndexMap::new();
    scope.insert(view, o::variable("ctx"));

    for op in ops.iter_mut() {
        if let Some(variable) = op.variable() {
            if let SemanticVariable::Context(context) = &variable.variable {
                scope.insert(context.view, Expression::ReadVariable(ReadVariableExpr::new(variable.xref)));
            }
        } else if let Some(handler_ops) = op.handler_ops_mut() {
            process_lexical_scope(handler_ops, view, is_root)?;
        }
    }

    if is_root {
        // Prefer `ctx` of the root view to any variables which happen to contain the root context.
        scope.insert(view, o::variable("ctx"));
    }

    let mut failure: Option<CompilerError> = None;
    for op in ops.iter_mut() {
        op.transform_expressions(
            &mut |expr, _| match expr {
                Expression::Context(context) => match scope.get(&context.view) {
                    Some(resolved) => resolved.clone(),
                    None => {
                        failure.get_or_insert_with(|| {
                            CompilerError::Invariant(format!(
                                "no context found for reference to view {:?} from view {:?}",
                                context.view, view
                            ))
                        });
                        Expression::Context(context)
                    }
                },
                other => other,
            },
            VisitorContextFlag::NONE,
        );
    }
    failure.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::template::pipeline::ir::{create_statement_op, create_variable_op, ContextExpr, NextContextExpr, VariableFlags};

    #[test]
    fn own_context_is_ctx_and_parent_context_is_its_variable() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let root = job.root;
        let child = job.allocate_view(root);
        let var = job.allocate_xref_id();
        let unit = job.view_mut(child).unwrap();
        unit.update.push(UpdateOp::Variable(create_variable_op(
            var,
            SemanticVariable::context(root),
            Expression::NextContext(NextContextExpr::default()),
            VariableFlags::NONE,
        )));
        unit.update.push(UpdateOp::Statement(create_statement_op(
            Expression::Context(ContextExpr::new(child))
                .prop("a")
                .identical(Expression::Context(ContextExpr::new(root)).prop("b"))
                .to_stmt(),
        )));

        resolve_contexts(&mut job).unwrap();

        let expected = o::variable("ctx")
            .prop("a")
            .identical(Expression::ReadVariable(ReadVariableExpr::new(var)).prop("b"));
        let Some(UpdateOp::Statement(stmt)) = job.view(child).unwrap().update.iter().nth(1) else {
            panic!("expected a statement");
        };
        assert!(matches!(&stmt.statement, o::Statement::Expression(s) if s.expr.is_equivalent(&expected)));
    }

    #[test]
    fn unreachable_context_is_an_internal_error() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let child = job.allocate_view(job.root);
        job.root_unit_mut().update.push(UpdateOp::Statement(create_statement_op(
            Expression::Context(ContextExpr::new(child)).to_stmt(),
        )));
        assert!(matches!(resolve_contexts(&mut job), Err(CompilerError::Invariant(_))));
    }
}
