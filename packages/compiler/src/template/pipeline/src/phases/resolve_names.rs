//! Resolve Names Phase
//!
//! Resolves lexical references in views (`LexicalReadExpr`) to either a target variable or to
//! property reads on the top-level component context.
//!
//! Also matches `RestoreViewExpr` expressions with the variables of their corresponding saved
//! views, and rewrites the names ambiently available inside `@for` track expressions.

use indexmap::IndexMap;

use crate::error::{invariant, CompilerError, Result};
use crate::output::output_ast::{self as o, Expression};
use crate::template::pipeline::ir::{
    ContextExpr, CreateOp, EitherXrefIdOrExpression, ExpressionTransform, OpList, ReadVariableExpr,
    RepeaterCreateOp, SemanticVariable, TransformExpressions, UpdateOp, VariableOp, VisitorContextFlag, XrefId,
    transform_expressions_in_expression,
};
use crate::template::pipeline::src::compilation::CompilationJob;

/// A saved view variable: the view it snapshots and the variable holding the snapshot.
#[derive(Debug, Clone, Copy)]
struct SavedView {
    view: XrefId,
    variable: XrefId,
}

/// Names declared by the variable ops of one op list.
#[derive(Debug, Default)]
struct LexicalScope {
    scope: IndexMap<String, XrefId>,
    /// Symbols defined within the current view. They take precedence over inherited ones.
    local_definitions: IndexMap<String, XrefId>,
}

impl LexicalScope {
    fn declare(&mut self, op: &VariableOp, saved_view: &mut Option<SavedView>) {
        match &op.variable {
            SemanticVariable::Identifier(identifier) => {
                if identifier.local {
                    if self.local_definitions.contains_key(&identifier.identifier) {
                        return;
                    }
                    self.local_definitions.insert(identifier.identifier.clone(), op.xref);
                } else if self.scope.contains_key(&identifier.identifier) {
                    return;
                }
                self.scope.insert(identifier.identifier.clone(), op.xref);
            }
            SemanticVariable::Alias(alias) => {
                self.scope.entry(alias.identifier.clone()).or_insert(op.xref);
            }
            SemanticVariable::SavedView(saved) => {
                *saved_view = Some(SavedView {
                    view: saved.view,
                    variable: op.xref,
                });
            }
            SemanticVariable::Context(_) => {}
        }
    }

    fn lookup(&self, name: &str) -> Option<XrefId> {
        self.local_definitions.get(name).or_else(|| self.scope.get(name)).copied()
    }
}

pub fn resolve_names(job: &mut CompilationJob) -> Result<()> {
    let root = job.root;
    for unit in job.units_mut() {
        let view = unit.xref;
        process_create_scope(&mut unit.create, view, root)?;
        process_update_scope(&mut unit.update, view, root, None)?;
    }
    verify_no_lexical_reads(job)
}

fn process_create_scope(ops: &mut OpList<CreateOp>, view: XrefId, root: XrefId) -> Result<()> {
    let mut scope = LexicalScope::default();
    let mut saved_view = None;
    for op in ops.iter() {
        if let CreateOp::Variable(variable) = op {
            scope.declare(variable, &mut saved_view);
        }
    }

    for op in ops.iter_mut() {
        // Listener functions have separate variable declarations, so they are a separate
        // lexical scope.
        if let Some(listener) = op.as_listener_mut() {
            process_update_scope(&mut listener.handler_ops, view, root, saved_view)?;
            continue;
        }
        if let CreateOp::RepeaterCreate(repeater) = op {
            rewrite_track_variables(repeater);
        }
        resolve_in_op(op, &scope, saved_view, view, root)?;
    }
    Ok(())
}

fn process_update_scope(
    ops: &mut OpList<UpdateOp>,
    view: XrefId,
    root: XrefId,
    inherited_saved_view: Option<SavedView>,
) -> Result<()> {
    let mut scope = LexicalScope::default();
    let mut saved_view = inherited_saved_view;
    for op in ops.iter() {
        if let UpdateOp::Variable(variable) = op {
            scope.declare(variable, &mut saved_view);
        }
    }
    for op in ops.iter_mut() {
        resolve_in_op(op, &scope, saved_view, view, root)?;
    }
    Ok(())
}

fn resolve_in_op(
    op: &mut dyn TransformExpressions,
    scope: &LexicalScope,
    saved_view: Option<SavedView>,
    view: XrefId,
    root: XrefId,
) -> Result<()> {
    let mut failure: Option<CompilerError> = None;
    let transform: &mut ExpressionTransform<'_> = &mut |expr, _| match expr {
        Expression::LexicalRead(read) => match scope.lookup(&read.name) {
            Some(xref) => Expression::ReadVariable(ReadVariableExpr::new(xref)),
            // Anything not declared in the view is a property of the component.
            None => Expression::Context(ContextExpr::new(root)).prop(read.name),
        },
        Expression::RestoreView(mut restore) => {
            if let EitherXrefIdOrExpression::XrefId(target) = restore.view {
                match saved_view {
                    Some(saved) if saved.view == target => {
                        restore.view = EitherXrefIdOrExpression::Expression(Box::new(Expression::ReadVariable(
                            ReadVariableExpr::new(saved.variable),
                        )));
                    }
                    _ => {
                        failure.get_or_insert(CompilerError::Invariant(format!(
                            "no saved view {:?} from view {:?}",
                            target, view
                        )));
                    }
                }
            }
            Expression::RestoreView(restore)
        }
        other => other,
    };
    op.transform_expressions(transform, VisitorContextFlag::NONE);
    failure.map_or(Ok(()), Err)
}

/// Inside a track expression the loop item and `$index` are the track function's parameters.
fn rewrite_track_variables(repeater: &mut RepeaterCreateOp) {
    let names = &repeater.var_names;
    let track = std::mem::replace(&mut *repeater.track, o::null_expr());
    *repeater.track = transform_expressions_in_expression(
        track,
        &mut |expr, _| match expr {
            Expression::LexicalRead(read) if read.name == "$index" || names.dollar_index.contains(&read.name) => {
                o::variable("$index")
            }
            Expression::LexicalRead(read) if read.name == names.dollar_implicit => o::variable("$item"),
            other => other,
        },
        VisitorContextFlag::NONE,
    );
}

/// Fails if any lexical read survived resolution.
fn verify_no_lexical_reads(job: &mut CompilationJob) -> Result<()> {
    let mut remaining: Option<String> = None;
    for unit in job.units_mut() {
        unit.visit_expressions(&mut |expr, _| {
            if let Expression::LexicalRead(read) = expr {
                remaining.get_or_insert_with(|| read.name.clone());
            }
        });
    }
    match remaining {
        Some(name) => invariant(format!("no lexical reads should remain, but found read of {}", name)),
        None => Ok(()),
    }
}
