//! Binding Specialization Phase
//!
//! Specializes the remaining generic `Binding` ops into attribute, property, DOM property
//! and two-way property ops. An `ngNonBindable` attribute is consumed here and marks its
//! element instead.

use crate::error::{invariant, Result};
use crate::template::pipeline::ir::{
    AttributeOp, BindingExpression, BindingKind, BindingOp, CompilationJobKind, CreateOp, PropertyOp, UpdateOp,
};
use crate::template::pipeline::src::compilation::{CompilationJob, TemplateCompilationMode};
use crate::template::pipeline::src::conversion::split_ns_name;
use crate::template::pipeline::src::util::elements::{create_op_xref_map, lookup_element};

const ARIA_PREFIX: &str = "aria-";
const NON_BINDABLE_ATTR: &str = "ngNonBindable";

/// Whether `name` is an ARIA attribute: it begins with, and is longer than, `aria-`.
fn is_aria_attribute(name: &str) -> bool {
    name.starts_with(ARIA_PREFIX) && name.len() > ARIA_PREFIX.len()
}

pub fn specialize_bindings(job: &mut CompilationJob) -> Result<()> {
    let kind = job.kind;
    let mode = job.mode;
    for unit in job.units_mut() {
        let ops = unit.update.take_all();
        let mut specialized = Vec::with_capacity(ops.len());
        let mut non_bindable = Vec::new();
        for op in ops {
            specialized.push(match op {
                UpdateOp::Binding(binding) if is_non_bindable_marker(&binding) => {
                    non_bindable.push(binding.target);
                    continue;
                }
                UpdateOp::Binding(binding) => specialize(binding, kind, mode)?,
                other => other,
            });
        }
        unit.update.push_all(specialized);

        if non_bindable.is_empty() {
            continue;
        }
        let elements = create_op_xref_map(&unit.create);
        for target in non_bindable {
            let id = lookup_element(&elements, target)?;
            match unit.create.get_mut(id) {
                Some(CreateOp::ElementStart(el) | CreateOp::Element(el)) => el.non_bindable = true,
                Some(CreateOp::ContainerStart(container) | CreateOp::Container(container)) => {
                    container.non_bindable = true
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// The `ngNonBindable` attribute only marks its element and is never emitted.
fn is_non_bindable_marker(op: &BindingOp) -> bool {
    op.kind == BindingKind::Attribute && op.name == NON_BINDABLE_ATTR
}

fn attribute_op(op: BindingOp, namespace: Option<String>, name: String) -> UpdateOp {
    UpdateOp::Attribute(AttributeOp {
        target: op.target,
        namespace,
        name,
        expression: op.expression,
        security_context: op.security_context,
        sanitizer: None,
        is_text_attribute: op.is_text_attribute,
        is_structural_template_attribute: op.is_structural_template_attribute,
        template_kind: op.template_kind,
        source_span: op.source_span,
    })
}

fn property_op(op: BindingOp, binding_kind: BindingKind) -> PropertyOp {
    PropertyOp {
        target: op.target,
        name: op.name,
        expression: op.expression,
        binding_kind,
        security_context: op.security_context,
        sanitizer: None,
        is_structural_template_attribute: op.is_structural_template_attribute,
        template_kind: op.template_kind,
        source_span: op.source_span,
    }
}

fn specialize(op: BindingOp, job_kind: CompilationJobKind, mode: TemplateCompilationMode) -> Result<UpdateOp> {
    match op.kind {
        BindingKind::Attribute => {
            let (namespace, name) = split_ns_name(&op.name)?;
            let (namespace, name) = (namespace.map(str::to_string), name.to_string());
            Ok(attribute_op(op, namespace, name))
        }
        BindingKind::Property | BindingKind::Animation | BindingKind::Template => {
            // A DOM-only template has no inputs an ARIA property could target.
            if mode == TemplateCompilationMode::DomOnly && job_kind == CompilationJobKind::Tmpl && is_aria_attribute(&op.name) {
                let name = op.name.clone();
                return Ok(attribute_op(op, None, name));
            }
            let binding_kind = op.kind;
            if job_kind == CompilationJobKind::Host {
                Ok(UpdateOp::DomProperty(property_op(op, binding_kind)))
            } else {
                Ok(UpdateOp::Property(property_op(op, binding_kind)))
            }
        }
        BindingKind::TwoWayProperty => {
            if !matches!(op.expression, BindingExpression::Expression(_)) {
                return invariant(format!(
                    "Expected value of two-way property binding \"{}\" to be an expression",
                    op.name
                ));
            }
            Ok(UpdateOp::TwoWayProperty(property_op(op, BindingKind::TwoWayProperty)))
        }
        BindingKind::I18n | BindingKind::ClassName | BindingKind::StyleProperty => {
            invariant(format!("Unhandled binding of kind {:?}", op.kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::core::SecurityContext;
    use crate::output::output_ast as o;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{create_binding_op, create_element_start_op, Namespace, Op, OpKind, XrefId};
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("<div ngNonBindable title=\"t\"></div>", "test.html"));
        ParseSourceSpan::from_offsets(&file, 0, 4)
    }

    fn text_attribute(target: XrefId, name: &str) -> UpdateOp {
        create_binding_op(
            target,
            BindingKind::Attribute,
            name,
            BindingExpression::Expression(o::literal("")),
            None,
            SecurityContext::NONE,
            true,
            false,
            None,
            span(),
        )
    }

    #[test]
    fn aria_names_need_a_suffix() {
        assert!(is_aria_attribute("aria-label"));
        assert!(!is_aria_attribute("aria-"));
        assert!(!is_aria_attribute("label"));
    }

    #[test]
    fn non_bindable_attribute_marks_its_element() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let div = job.allocate_xref_id();
        let unit = job.root_unit_mut();
        unit.create.push(CreateOp::ElementStart(create_element_start_op("div", div, Namespace::HTML, span(), span())));
        unit.update.push(text_attribute(div, NON_BINDABLE_ATTR));
        unit.update.push(text_attribute(div, "title"));

        specialize_bindings(&mut job).unwrap();

        let unit = job.root_unit();
        let kinds: Vec<OpKind> = unit.update.iter().map(Op::kind).collect();
        assert_eq!(kinds, vec![OpKind::Attribute]);
        match unit.create.iter().next() {
            Some(CreateOp::ElementStart(el)) => assert!(el.non_bindable),
            other => panic!("expected the element start, got {other:?}"),
        };
    }
}
