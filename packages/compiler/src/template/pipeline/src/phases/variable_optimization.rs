//! Variable Optimization Phase
//!
//! Optimizes variables declared and used in the IR.
//!
//! Variables are eagerly generated by earlier passes for every context, local reference and
//! alias that might be read. This pass:
//!
//!  * inlines `ALWAYS_INLINE` variables at every use,
//!  * removes variables that are never read, keeping initializers with side effects as
//!    statements,
//!  * inlines variables read exactly once when no fence between declaration and use forbids it.
//!
//! Reads and writes of the view context act as fences: an initializer depending on the current
//! view can't move across an operation that switches views, and vice versa.

use bitflags::bitflags;
use indexmap::{IndexMap, IndexSet};

use crate::error::{invariant, Result};
use crate::output::output_ast::Expression;
use crate::template::pipeline::ir::{
    create_statement_op, transform_expressions_in_expression, CompatibilityMode, OpId, OpKind, OpList, SemanticVariable, SharedOps,
    VariableFlags, VariableOp, VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::CompilationJob;

bitflags! {
    /// Ordering constraints an operation's expressions impose on moving code past them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Fence: u8 {
        /// Reads the current view context (`nextContext()` state, references, `@let` values).
        const VIEW_CONTEXT_READ = 0b001;
        /// Changes the current view context.
        const VIEW_CONTEXT_WRITE = 0b010;
        /// Must run even if its result is unused.
        const SIDE_EFFECTFUL = 0b100;
    }
}

fn fences_for_expression(expr: &Expression) -> Fence {
    match expr {
        Expression::NextContext(_) => Fence::VIEW_CONTEXT_READ | Fence::VIEW_CONTEXT_WRITE,
        Expression::RestoreView(_) => Fence::VIEW_CONTEXT_READ | Fence::VIEW_CONTEXT_WRITE | Fence::SIDE_EFFECTFUL,
        Expression::Reference(_) | Expression::ContextLetReference(_) => Fence::VIEW_CONTEXT_READ,
        _ => Fence::empty(),
    }
}

#[derive(Debug, Default, Clone)]
struct OpInfo {
    fences: Fence,
    variables_used: IndexSet<XrefId>,
}

pub fn optimize_variables(job: &mut CompilationJob) -> Result<()> {
    let compatibility = job.compatibility;
    for unit in job.units_mut() {
        inline_always_inline_variables(&mut unit.create)?;
        inline_always_inline_variables(&mut unit.update)?;
        for op in unit.create.iter_mut() {
            if let Some(listener) = op.as_listener_mut() {
                inline_always_inline_variables(&mut listener.handler_ops)?;
            }
        }

        optimize_variables_in_op_list(&mut unit.create, compatibility)?;
        optimize_variables_in_op_list(&mut unit.update, compatibility)?;
        for op in unit.create.iter_mut() {
            if let Some(listener) = op.as_listener_mut() {
                optimize_variables_in_op_list(&mut listener.handler_ops, compatibility)?;
            }
        }
    }
    Ok(())
}

fn inline_always_inline_variables<T: SharedOps>(ops: &mut OpList<T>) -> Result<()> {
    let mut vars: IndexMap<XrefId, (OpId, Expression)> = IndexMap::new();
    for (id, op) in ops.iter_mut_with_ids() {
        if let Some(variable) = op.as_variable() {
            if variable.flags.contains(VariableFlags::ALWAYS_INLINE) {
                let mut context_sensitive = false;
                transform_expressions_in_expression(
                    (*variable.initializer).clone(),
                    &mut |expr, _| {
                        context_sensitive |= !fences_for_expression(&expr).is_empty();
                        expr
                    },
                    VisitorContextFlag::NONE,
                );
                if context_sensitive {
                    return invariant("a context-sensitive variable was marked always-inline");
                }
                vars.insert(variable.xref, (id, (*variable.initializer).clone()));
            }
        }
        op.transform_expressions(
            &mut |expr, _| match expr {
                Expression::ReadVariable(read) => match vars.get(&read.xref) {
                    Some((_, initializer)) => initializer.clone(),
                    None => Expression::ReadVariable(read),
                },
                other => other,
            },
            VisitorContextFlag::NONE,
        );
    }
    for (_, (id, _)) in vars {
        ops.remove(id)?;
    }
    Ok(())
}

fn collect_op_info<T: SharedOps>(op: &mut T) -> OpInfo {
    let mut info = OpInfo::default();
    op.transform_expressions(
        &mut |expr, _| {
            match &expr {
                Expression::ReadVariable(read) => {
                    info.variables_used.insert(read.xref);
                }
                other => info.fences |= fences_for_expression(other),
            }
            expr
        },
        VisitorContextFlag::NONE,
    );
    info
}

/// Counts reads of variables declared in this list, noting reads from nested handlers.
fn count_variable_usages<T: SharedOps>(
    op: &mut T,
    usages: &mut IndexMap<XrefId, usize>,
    remote_usages: &mut IndexSet<XrefId>,
) {
    op.transform_expressions(
        &mut |expr, flags| {
            if let Expression::ReadVariable(read) = &expr {
                // Variables declared outside this list are not optimized here.
                if let Some(count) = usages.get_mut(&read.xref) {
                    *count += 1;
                    if flags.contains(VisitorContextFlag::IN_CHILD_OPERATION) {
                        remote_usages.insert(read.xref);
                    }
                }
            }
            expr
        },
        VisitorContextFlag::NONE,
    );
}

fn uncount_variable_usages(initializer: &Expression, usages: &mut IndexMap<XrefId, usize>) {
    transform_expressions_in_expression(
        initializer.clone(),
        &mut |expr, _| {
            if let Expression::ReadVariable(read) = &expr {
                if let Some(count) = usages.get_mut(&read.xref) {
                    *count = count.saturating_sub(1);
                }
            }
            expr
        },
        VisitorContextFlag::NONE,
    );
}

fn optimize_variables_in_op_list<T: SharedOps>(ops: &mut OpList<T>, compatibility: CompatibilityMode) -> Result<()> {
    let mut var_decls: IndexMap<XrefId, OpId> = IndexMap::new();
    let mut var_usages: IndexMap<XrefId, usize> = IndexMap::new();
    let mut var_remote_usages: IndexSet<XrefId> = IndexSet::new();
    let mut op_map: IndexMap<OpId, OpInfo> = IndexMap::new();

    for id in ops.ids() {
        let Some(op) = ops.get_mut(id) else { continue };
        if let Some(variable) = op.as_variable() {
            if var_decls.contains_key(&variable.xref) {
                return invariant(format!("duplicate declaration of variable {:?}", variable.xref));
            }
            var_decls.insert(variable.xref, id);
            var_usages.insert(variable.xref, 0);
        }
        op_map.insert(id, collect_op_info(op));
        count_variable_usages(op, &mut var_usages, &mut var_remote_usages);
    }

    // Iterating in reverse processes every read of a variable before its declaration, so
    // removing a variable can make earlier variables unused in the same sweep.
    let mut context_is_used = false;
    for id in ops.ids().into_iter().rev() {
        let info = op_map.get(&id).cloned().unwrap_or_default();
        let unused = match ops.get(id).and_then(SharedOps::as_variable) {
            Some(variable) => var_usages.get(&variable.xref) == Some(&0),
            None => false,
        };
        if unused {
            let op = ops.get(id).and_then(SharedOps::as_variable).cloned();
            let Some(variable) = op else { continue };
            let keeps_side_effect = (context_is_used && info.fences.contains(Fence::VIEW_CONTEXT_WRITE))
                || info.fences.contains(Fence::SIDE_EFFECTFUL);
            if keeps_side_effect {
                // The declaration goes, but its initializer still has to run.
                let statement = T::from_statement(create_statement_op(variable.initializer.to_stmt()));
                ops.replace(id, statement)?;
            } else {
                uncount_variable_usages(&variable.initializer, &mut var_usages);
                ops.remove(id)?;
                op_map.shift_remove(&id);
            }
            var_decls.shift_remove(&variable.xref);
            continue;
        }
        if info.fences.contains(Fence::VIEW_CONTEXT_READ) {
            context_is_used = true;
        }
    }

    // Inline the remaining variables with exactly one local usage.
    let mut to_inline: Vec<XrefId> = var_usages
        .iter()
        .filter(|&(xref, &count)| {
            count == 1
                && !var_remote_usages.contains(xref)
                && var_decls.get(xref).and_then(|id| ops.get(*id)).and_then(SharedOps::as_variable).is_some_and(
                    |variable| !variable.flags.contains(VariableFlags::ALWAYS_INLINE),
                )
        })
        .map(|(xref, _)| *xref)
        .collect();

    while let Some(candidate) = to_inline.pop() {
        let Some(&decl_id) = var_decls.get(&candidate) else { continue };
        let Some(decl) = ops.get(decl_id).and_then(SharedOps::as_variable).cloned() else { continue };
        let decl_info = op_map.get(&decl_id).cloned().unwrap_or_default();

        let mut cursor = ops.next_of(decl_id);
        while let Some(target_id) = cursor {
            let target_info = op_map.get(&target_id).cloned().unwrap_or_default();
            if target_info.variables_used.contains(&candidate) {
                let target_kind = ops.get(target_id).map(|op| op.kind());
                if compatibility == CompatibilityMode::TemplateDefinitionBuilder
                    && !allow_conservative_inlining(&decl, target_kind)
                {
                    break;
                }
                let inlined = match ops.get_mut(target_id) {
                    Some(target) => try_inline_variable_initializer(candidate, &decl.initializer, target, decl_info.fences),
                    None => false,
                };
                if inlined {
                    if let Some(info) = op_map.get_mut(&target_id) {
                        info.variables_used.shift_remove(&candidate);
                        info.variables_used.extend(decl_info.variables_used.iter().copied());
                        info.fences |= decl_info.fences;
                    }
                    var_decls.shift_remove(&candidate);
                    op_map.shift_remove(&decl_id);
                    ops.remove(decl_id)?;
                }
                break;
            }
            if !safe_to_inline_past_fences(target_info.fences, decl_info.fences) {
                break;
            }
            cursor = ops.next_of(target_id);
        }
    }
    Ok(())
}

/// Compatibility output only inlines contexts into other variables and identifiers holding
/// `ctx` itself.
fn allow_conservative_inlining(decl: &VariableOp, target_kind: Option<OpKind>) -> bool {
    match &decl.variable {
        SemanticVariable::Identifier(_) => {
            matches!(&*decl.initializer, Expression::ReadVar(read) if read.name == "ctx")
        }
        SemanticVariable::Context(_) => target_kind == Some(OpKind::Variable),
        _ => true,
    }
}

fn safe_to_inline_past_fences(fences: Fence, decl_fences: Fence) -> bool {
    if fences.contains(Fence::VIEW_CONTEXT_WRITE) {
        !decl_fences.contains(Fence::VIEW_CONTEXT_READ)
    } else if fences.contains(Fence::VIEW_CONTEXT_READ) {
        !decl_fences.contains(Fence::VIEW_CONTEXT_WRITE)
    } else {
        true
    }
}

/// Replaces the read of `xref` in `target` with `initializer`, unless a fence is crossed
/// before reaching it.
fn try_inline_variable_initializer<T: SharedOps>(
    xref: XrefId,
    initializer: &Expression,
    target: &mut T,
    decl_fences: Fence,
) -> bool {
    let mut inlined = false;
    let mut inlining_allowed = true;
    target.transform_expressions(
        &mut |expr, flags| {
            if inlined || !inlining_allowed {
                return expr;
            }
            // Context-sensitive initializers can't move into another operation's scope.
            if flags.contains(VisitorContextFlag::IN_CHILD_OPERATION) && decl_fences.contains(Fence::VIEW_CONTEXT_READ) {
                return expr;
            }
            match expr {
                Expression::ReadVariable(read) if read.xref == xref => {
                    inlined = true;
                    initializer.clone()
                }
                other => {
                    inlining_allowed = safe_to_inline_past_fences(fences_for_expression(&other), decl_fences);
                    other
                }
            }
        },
        VisitorContextFlag::NONE,
    );
    inlined
}
