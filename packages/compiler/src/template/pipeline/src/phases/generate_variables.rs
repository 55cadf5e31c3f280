//! Generate Variables Phase
//!
//! Generate a preamble sequence for each view's update block and listener function which
//! declares any variables that may be referenced in other operations in the block.
//!
//! Variables generated include:
//!   * the context of parent views, reached with `nextContext()`.
//!   * context variables from the current view as well as all parent views.
//!   * computed aliases (`$first`, `$odd`, ...) of `@for` views.
//!   * local references from elements within the current view and any lexical parents.
//!   * `@let` declarations of parent views, and of the current view inside listeners.
//!
//! Variables are generated here unconditionally, and may be optimized away later if it turns
//! out their values (and any side effects) are unused.

use indexmap::IndexMap;

use crate::error::Result;
use crate::output::output_ast::Expression;
use crate::template::pipeline::ir::{
    create_variable_op, AliasVariable, ContextExpr, ContextLetReferenceExpr, CreateOp, NextContextExpr, OpId,
    ReferenceExpr, SemanticVariable, UpdateOp, VariableFlags, VariableOp, XrefId, CTX_REF,
};
use crate::template::pipeline::src::compilation::{CompilationJob, ViewCompilationUnit, XrefAllocator};

/// A local reference collected from an element within a view.
#[derive(Debug, Clone)]
struct Reference {
    /// Name given to the local reference variable within the template.
    name: String,
    /// The element-like op which the reference targets.
    target: XrefId,
    /// Offset of this reference among all the references on its target.
    offset: usize,
}

/// A `@let` declaration collected from a view.
#[derive(Debug, Clone)]
struct LetDeclaration {
    name: String,
    target: XrefId,
}

/// The names a view makes available to itself and its descendants.
#[derive(Debug, Clone)]
struct Scope {
    view: XrefId,
    parent: Option<XrefId>,
    context_variables: IndexMap<String, String>,
    aliases: Vec<AliasVariable>,
    references: Vec<Reference>,
    let_declarations: Vec<LetDeclaration>,
}

impl Scope {
    fn of(unit: &ViewCompilationUnit) -> Self {
        let mut references = Vec::new();
        let mut let_declarations = Vec::new();
        for op in unit.create.iter() {
            match op {
                CreateOp::ElementStart(_)
                | CreateOp::ContainerStart(_)
                | CreateOp::Template(_)
                | CreateOp::ConditionalCreate(_)
                | CreateOp::ConditionalBranchCreate(_) => {
                    let Some(target) = op.xref() else { continue };
                    for (offset, local_ref) in op.local_refs().iter().enumerate() {
                        references.push(Reference {
                            name: local_ref.name.clone(),
                            target,
                            offset,
                        });
                    }
                }
                CreateOp::DeclareLet(declare) => let_declarations.push(LetDeclaration {
                    name: declare.declared_name.clone(),
                    target: declare.xref,
                }),
                _ => {}
            }
        }
        Scope {
            view: unit.xref,
            parent: unit.parent,
            context_variables: unit.context_variables.clone(),
            aliases: unit.aliases.clone(),
            references,
            let_declarations,
        }
    }
}

pub fn generate_variables(job: &mut CompilationJob) -> Result<()> {
    let scopes: IndexMap<XrefId, Scope> = job.units().map(|unit| (unit.xref, Scope::of(unit))).collect();

    let parts = job.parts_mut();
    for unit in parts.units {
        let view = unit.xref;

        for op in unit.create.iter_mut() {
            if let Some(listener) = op.as_listener_mut() {
                let preamble = generate_variables_in_scope_for_view(view, &scopes, true, parts.ids);
                listener.handler_ops.prepend(preamble.into_iter().map(UpdateOp::Variable));
            }
        }

        let preamble = generate_variables_in_scope_for_view(view, &scopes, false, parts.ids);
        unit.update.prepend(preamble.into_iter().map(UpdateOp::Variable));

        declare_local_let_values(unit, parts.ids)?;
    }
    Ok(())
}

/// Generates declarations for all variables that are in scope for a given view. Views inherit
/// the variables of every lexical ancestor, which are reached by stepping up the context chain.
fn generate_variables_in_scope_for_view(
    view: XrefId,
    scopes: &IndexMap<XrefId, Scope>,
    is_callback: bool,
    ids: &mut XrefAllocator,
) -> Vec<VariableOp> {
    let mut ops = Vec::new();
    let mut current = scopes.get(&view);

    while let Some(scope) = current {
        if scope.view != view {
            // Switching to the parent's context declares a variable of its own, because the
            // context of that view may be referenced directly.
            ops.push(create_variable_op(
                ids.allocate(),
                SemanticVariable::context(scope.view),
                Expression::NextContext(NextContextExpr::default()),
                VariableFlags::NONE,
            ));
        }

        for (name, value) in &scope.context_variables {
            let context = Expression::Context(ContextExpr::new(scope.view));
            // Either read a property of the context, or use the context itself for `CTX_REF`.
            let initializer = if value == CTX_REF { context } else { context.prop(value.as_str()) };
            ops.push(create_variable_op(
                ids.allocate(),
                SemanticVariable::identifier(name.as_str(), false),
                initializer,
                VariableFlags::NONE,
            ));
        }

        for alias in &scope.aliases {
            ops.push(create_variable_op(
                ids.allocate(),
                SemanticVariable::Alias(AliasVariable { name: None, ..alias.clone() }),
                alias.expression.clone(),
                VariableFlags::ALWAYS_INLINE,
            ));
        }

        for reference in &scope.references {
            ops.push(create_variable_op(
                ids.allocate(),
                SemanticVariable::identifier(reference.name.as_str(), false),
                Expression::Reference(ReferenceExpr::new(reference.target, reference.offset)),
                VariableFlags::NONE,
            ));
        }

        if scope.view != view || is_callback {
            for declaration in &scope.let_declarations {
                ops.push(create_variable_op(
                    ids.allocate(),
                    SemanticVariable::identifier(declaration.name.as_str(), false),
                    Expression::ContextLetReference(ContextLetReferenceExpr::new(declaration.target)),
                    VariableFlags::NONE,
                ));
            }
        }

        current = scope.parent.and_then(|parent| scopes.get(&parent));
    }
    ops
}

/// Reads of a `@let` in its own view see the value stored by the preceding `StoreLet` op, so
/// the local variable is declared right after the store.
fn declare_local_let_values(unit: &mut ViewCompilationUnit, ids: &mut XrefAllocator) -> Result<()> {
    let stores: Vec<(OpId, XrefId, String)> = unit
        .update
        .iter_with_ids()
        .filter_map(|(id, op)| match op {
            UpdateOp::StoreLet(store) => Some((id, store.target, store.declared_name.clone())),
            _ => None,
        })
        .collect();

    for (id, target, name) in stores {
        let variable = create_variable_op(
            ids.allocate(),
            SemanticVariable::identifier(name, true),
            Expression::ContextLetReference(ContextLetReferenceExpr::new(target)),
            VariableFlags::NONE,
        );
        unit.update.insert_after(id, UpdateOp::Variable(variable))?;
    }
    Ok(())
}
