//! Temporary Variables Phase
//!
//! Finds all assignments and usages of temporary variables, which are linked to each other
//! with cross references. Generates names for each cross reference, and declares them at the
//! beginning of the enclosing op list.
//!
//! A name is reused once the temporary holding it has been read for the final time. Names of
//! temporaries in `@for` track expressions are declared by the generated track function.

use indexmap::{IndexMap, IndexSet};

use crate::error::{CompilerError, Result};
use crate::output::output_ast::{DeclareVarStmt, Expression, Statement, StmtModifier};
use crate::template::pipeline::ir::{
    create_statement_op, CreateOp, OpList, TransformExpressions, UpdateOp, VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn generate_temporary_variables(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        let create_temporaries = generate_create_temporaries(&mut unit.create)?;
        unit.create
            .prepend(create_temporaries.into_iter().map(|stmt| CreateOp::Statement(create_statement_op(stmt))));
        let update_temporaries = generate_update_temporaries(&mut unit.update)?;
        unit.update
            .prepend(update_temporaries.into_iter().map(|stmt| UpdateOp::Statement(create_statement_op(stmt))));
    }
    Ok(())
}

fn generate_create_temporaries(ops: &mut OpList<CreateOp>) -> Result<Vec<Statement>> {
    let mut declared = IndexSet::new();
    for (op_index, op) in ops.iter_mut().enumerate() {
        let names = name_temporaries_in_op(op, op_index)?;
        if let Some(listener) = op.as_listener_mut() {
            let handler_temporaries = generate_update_temporaries(&mut listener.handler_ops)?;
            listener.handler_ops.prepend(
                handler_temporaries
                    .into_iter()
                    .map(|stmt| UpdateOp::Statement(create_statement_op(stmt))),
            );
        }
        if !matches!(op, CreateOp::RepeaterCreate(_)) {
            declared.extend(names);
        }
    }
    Ok(declared.into_iter().map(declare_temporary).collect())
}

fn generate_update_temporaries(ops: &mut OpList<UpdateOp>) -> Result<Vec<Statement>> {
    let mut declared = IndexSet::new();
    for (op_index, op) in ops.iter_mut().enumerate() {
        declared.extend(name_temporaries_in_op(op, op_index)?);
    }
    Ok(declared.into_iter().map(declare_temporary).collect())
}

fn declare_temporary(name: String) -> Statement {
    Statement::DeclareVar(DeclareVarStmt {
        name,
        value: None,
        modifiers: StmtModifier::None,
        source_span: None,
    })
}

/// Names every temporary of one op (ignoring nested handler ops), returning the distinct names.
fn name_temporaries_in_op(op: &mut dyn TransformExpressions, op_index: usize) -> Result<Vec<String>> {
    let mut total_reads: IndexMap<XrefId, usize> = IndexMap::new();
    op.transform_expressions(
        &mut |expr, flags| {
            if !flags.contains(VisitorContextFlag::IN_CHILD_OPERATION) {
                if let Expression::ReadTemporary(read) = &expr {
                    *total_reads.entry(read.xref).or_default() += 1;
                }
            }
            expr
        },
        VisitorContextFlag::NONE,
    );

    let mut count: isize = 0;
    let mut seen_reads: IndexMap<XrefId, usize> = IndexMap::new();
    let mut defs: IndexMap<XrefId, String> = IndexMap::new();
    let mut failure: Option<CompilerError> = None;
    op.transform_expressions(
        &mut |expr, flags| {
            if flags.contains(VisitorContextFlag::IN_CHILD_OPERATION) {
                return expr;
            }
            match expr {
                Expression::AssignTemporary(mut assign) => {
                    let name = defs.entry(assign.xref).or_insert_with(|| {
                        let name = format!("tmp_{}_{}", op_index, count);
                        count += 1;
                        name
                    });
                    assign.name = Some(name.clone());
                    Expression::AssignTemporary(assign)
                }
                Expression::ReadTemporary(mut read) => {
                    let seen = seen_reads.entry(read.xref).or_default();
                    *seen += 1;
                    // After its final read, the temporary's name is free again.
                    if Some(&*seen) == total_reads.get(&read.xref) {
                        count -= 1;
                    }
                    match defs.get(&read.xref) {
                        Some(name) => read.name = Some(name.clone()),
                        None => {
                            failure.get_or_insert(CompilerError::Invariant(format!(
                                "found temporary {:?} read before assignment",
                                read.xref
                            )));
                        }
                    }
                    Expression::ReadTemporary(read)
                }
                other => other,
            }
        },
        VisitorContextFlag::NONE,
    );
    if let Some(error) = failure {
        return Err(error);
    }

    let mut names: Vec<String> = Vec::new();
    for name in defs.into_values() {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}
