//! Remove Content Selectors Phase
//!
//! The `select` attribute of an `<ng-content>` decides which content is projected into it. It
//! is carried by the projection op itself, so the attribute binding ingested for it is dropped.

use crate::error::Result;
use crate::template::pipeline::ir::{CreateOp, UpdateOp};
use crate::template::pipeline::src::compilation::CompilationJob;
use crate::template::pipeline::src::util::elements::{create_op_xref_map, lookup_element};

pub fn remove_content_selectors(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        let elements = create_op_xref_map(&unit.create);
        let mut selectors = Vec::new();
        for (id, op) in unit.update.iter_with_ids() {
            let UpdateOp::Binding(binding) = op else { continue };
            if !is_select_attribute(&binding.name) {
                continue;
            }
            let target = lookup_element(&elements, binding.target)?;
            if matches!(unit.create.get(target), Some(CreateOp::Projection(_))) {
                selectors.push(id);
            }
        }
        for id in selectors {
            unit.update.remove(id)?;
        }
    }
    Ok(())
}

fn is_select_attribute(name: &str) -> bool {
    name == "select" || name == "SELECT"
}
