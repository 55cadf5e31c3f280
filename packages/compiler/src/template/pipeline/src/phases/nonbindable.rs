//! Nonbindable Phase
//!
//! `ngNonBindable` applies to every descendant of the element carrying it, so the element's
//! contents are wrapped in `ɵɵdisableBindings()` and `ɵɵenableBindings()`.

use indexmap::IndexSet;

use crate::error::Result;
use crate::template::pipeline::ir::{create_disable_bindings_op, create_enable_bindings_op, CreateOp, OpId, XrefId};
use crate::template::pipeline::src::compilation::CompilationJob;

enum Toggle {
    DisableAfter(OpId, XrefId),
    EnableBefore(OpId, XrefId),
}

pub fn disable_bindings(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        let mut open: IndexSet<XrefId> = IndexSet::new();
        let mut toggles = Vec::new();
        for (id, op) in unit.create.iter_with_ids() {
            match op {
                CreateOp::ElementStart(el) if el.non_bindable => {
                    open.insert(el.xref);
                    toggles.push(Toggle::DisableAfter(id, el.xref));
                }
                CreateOp::ContainerStart(container) if container.non_bindable => {
                    open.insert(container.xref);
                    toggles.push(Toggle::DisableAfter(id, container.xref));
                }
                CreateOp::ElementEnd(end) | CreateOp::ContainerEnd(end) if open.contains(&end.xref) => {
                    toggles.push(Toggle::EnableBefore(id, end.xref));
                }
                _ => {}
            }
        }
        for toggle in toggles {
            match toggle {
                Toggle::DisableAfter(anchor, xref) => unit.create.insert_after(anchor, create_disable_bindings_op(xref))?,
                Toggle::EnableBefore(anchor, xref) => unit.create.insert_before(anchor, create_enable_bindings_op(xref))?,
            };
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{
        create_element_end_op, create_element_start_op, create_text_op, Namespace, Op, OpKind,
    };
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("<div ngNonBindable>{{ a }}<p></p></div>", "test.html"));
        ParseSourceSpan::from_offsets(&file, 0, 19)
    }

    #[test]
    fn non_bindable_contents_are_wrapped() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let (div, text, p) = (job.allocate_xref_id(), job.allocate_xref_id(), job.allocate_xref_id());
        let mut start = create_element_start_op("div", div, Namespace::HTML, span(), span());
        start.non_bindable = true;
        let unit = job.root_unit_mut();
        unit.create.push(CreateOp::ElementStart(start));
        unit.create.push(create_text_op(text, "{{ a }}", None));
        unit.create.push(CreateOp::ElementStart(create_element_start_op("p", p, Namespace::HTML, span(), span())));
        unit.create.push(CreateOp::ElementEnd(create_element_end_op(p, None)));
        unit.create.push(CreateOp::ElementEnd(create_element_end_op(div, None)));

        disable_bindings(&mut job).unwrap();

        let kinds: Vec<OpKind> = job.root_unit().create.iter().map(Op::kind).collect();
        assert_eq!(
            kinds,
            vec![
                OpKind::ElementStart,
                OpKind::DisableBindings,
                OpKind::Text,
                OpKind::ElementStart,
                OpKind::ElementEnd,
                OpKind::EnableBindings,
                OpKind::ElementEnd,
            ]
        );
    }

    #[test]
    fn bindable_elements_are_untouched() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let div = job.allocate_xref_id();
        let unit = job.root_unit_mut();
        unit.create.push(CreateOp::ElementStart(create_element_start_op("div", div, Namespace::HTML, span(), span())));
        unit.create.push(CreateOp::ElementEnd(create_element_end_op(div, None)));

        disable_bindings(&mut job).unwrap();

        assert_eq!(job.root_unit().create.len(), 2);
    }
}
