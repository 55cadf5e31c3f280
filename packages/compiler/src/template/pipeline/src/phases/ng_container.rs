//! Ng Container Phase
//!
//! Replaces an `ElementStart`/`ElementEnd` pair whose tag is `ng-container` with container ops.

use indexmap::IndexSet;

use crate::error::Result;
use crate::template::pipeline::ir::{ContainerStartOp, CreateOp, ElementStartOp};
use crate::template::pipeline::src::compilation::CompilationJob;

const CONTAINER_TAG: &str = "ng-container";

pub fn generate_ng_container_ops(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        let mut updated_element_xrefs = IndexSet::new();
        for id in unit.create.ids() {
            let replacement = match unit.create.get(id) {
                Some(CreateOp::ElementStart(el)) if el.tag == CONTAINER_TAG => {
                    updated_element_xrefs.insert(el.xref);
                    CreateOp::ContainerStart(into_container(el.clone()))
                }
                Some(CreateOp::ElementEnd(end)) if updated_element_xrefs.contains(&end.xref) => {
                    CreateOp::ContainerEnd(end.clone())
                }
                _ => continue,
            };
            unit.create.replace(id, replacement)?;
        }
    }
    Ok(())
}

fn into_container(el: ElementStartOp) -> ContainerStartOp {
    ContainerStartOp {
        xref: el.xref,
        handle: el.handle,
        attributes: el.attributes,
        local_refs: el.local_refs,
        local_refs_index: el.local_refs_index,
        non_bindable: el.non_bindable,
        start_source_span: el.start_source_span,
        whole_source_span: el.whole_source_span,
    }
}
