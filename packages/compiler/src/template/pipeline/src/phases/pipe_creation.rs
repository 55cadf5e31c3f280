//! Pipe Creation Phase
//!
//! Declares every pipe used by an update op with a `Pipe` create op. The declaration goes right
//! after the op whose slot the binding depends on, past any pipes already declared there, so
//! pipe slots follow their element's slot.

use crate::error::{invariant, Result};
use crate::output::output_ast::Expression;
use crate::template::pipeline::ir::{create_pipe_op, visit_expressions_in_op, CreateOp, OpId, VisitorContextFlag, XrefId};
use crate::template::pipeline::src::compilation::{CompilationJob, ViewCompilationUnit};

struct PipeDecl {
    /// The op the using update op depends on, if any.
    anchor: Option<XrefId>,
    xref: XrefId,
    name: String,
}

pub fn create_pipes(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        process_pipe_bindings_in_view(unit)?;
    }
    Ok(())
}

fn process_pipe_bindings_in_view(unit: &mut ViewCompilationUnit) -> Result<()> {
    let mut pipes: Vec<PipeDecl> = Vec::new();
    let mut nested: Option<String> = None;

    for op in unit.update.iter_mut() {
        let anchor = op.depends_on_slot_context();
        visit_expressions_in_op(op, &mut |expr, flags| {
            let (xref, name) = match expr {
                Expression::PipeBinding(pipe) => (pipe.target, &pipe.name),
                Expression::PipeBindingVariadic(pipe) => (pipe.target, &pipe.name),
                _ => return,
            };
            if flags.contains(VisitorContextFlag::IN_CHILD_OPERATION) {
                nested.get_or_insert_with(|| name.clone());
                return;
            }
            pipes.push(PipeDecl {
                anchor,
                xref,
                name: name.clone(),
            });
        });
    }

    if let Some(name) = nested {
        return invariant(format!("pipe {} found in a nested operation", name));
    }

    for pipe in pipes {
        add_pipe_to_creation_block(unit, pipe)?;
    }
    Ok(())
}

fn add_pipe_to_creation_block(unit: &mut ViewCompilationUnit, pipe: PipeDecl) -> Result<()> {
    let Some(anchor) = pipe.anchor else {
        unit.create.push(create_pipe_op(pipe.xref, pipe.name));
        return Ok(());
    };

    let Some(mut after) = find_slot_owner(unit, anchor) else {
        return invariant(format!("unable to find insertion point for pipe {}", pipe.name));
    };
    while let Some(next) = unit.create.next_of(after) {
        if !matches!(unit.create.get(next), Some(CreateOp::Pipe(_))) {
            break;
        }
        after = next;
    }
    unit.create.insert_after(after, create_pipe_op(pipe.xref, pipe.name))?;
    Ok(())
}

/// The create op which owns the slot named by `xref`.
fn find_slot_owner(unit: &ViewCompilationUnit, xref: XrefId) -> Option<OpId> {
    unit.create
        .iter_with_ids()
        .find(|(_, op)| op.handle().is_some() && op.xref() == Some(xref))
        .map(|(id, _)| id)
}
