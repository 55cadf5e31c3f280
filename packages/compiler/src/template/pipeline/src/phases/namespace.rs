//! Namespace Phase
//!
//! Change namespaces between HTML, SVG and MathML, depending on the next element.

use crate::error::Result;
use crate::template::pipeline::ir::{create_namespace_op, CreateOp, Namespace, OpId};
use crate::template::pipeline::src::compilation::{CompilationJob, ViewCompilationUnit};

pub fn emit_namespace_changes(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        process_unit(unit)?;
    }
    Ok(())
}

fn process_unit(unit: &mut ViewCompilationUnit) -> Result<()> {
    let mut active_namespace = Namespace::HTML;
    let mut insertions: Vec<(OpId, Namespace)> = Vec::new();

    for (id, op) in unit.create.iter_with_ids() {
        if let CreateOp::ElementStart(element) = op {
            if element.namespace != active_namespace {
                insertions.push((id, element.namespace));
                active_namespace = element.namespace;
            }
        }
    }

    for (anchor, namespace) in insertions {
        unit.create.insert_before(anchor, create_namespace_op(namespace))?;
    }
    Ok(())
}
