//! Resolve Sanitizers Phase
//!
//! Resolves the sanitization function of every property and attribute binding from its
//! security context. Bindings of security-sensitive `<iframe>` attributes without a sanitizer
//! get a runtime validation function instead.

use crate::core::SecurityContext;
use crate::error::Result;
use crate::output::output_ast::{self as o, ExternalReference};
use crate::render3::r3_identifiers::Identifiers;
use crate::schema::dom_security_schema::is_iframe_security_sensitive_attr;
use crate::template::pipeline::ir::{CompilationJobKind, CreateOp, UpdateOp};
use crate::template::pipeline::src::compilation::CompilationJob;
use crate::template::pipeline::src::util::elements::{create_op_xref_map, lookup_element};

fn sanitizer_fn(security_context: SecurityContext) -> Option<ExternalReference> {
    match security_context {
        SecurityContext::HTML => Some(Identifiers::sanitize_html()),
        SecurityContext::ResourceUrl => Some(Identifiers::sanitize_resource_url()),
        SecurityContext::SCRIPT => Some(Identifiers::sanitize_script()),
        SecurityContext::STYLE => Some(Identifiers::sanitize_style()),
        SecurityContext::URL => Some(Identifiers::sanitize_url()),
        SecurityContext::NONE => None,
    }
}

pub fn resolve_sanitizers(job: &mut CompilationJob) -> Result<()> {
    let is_host = job.kind == CompilationJobKind::Host;
    for unit in job.units_mut() {
        let elements = create_op_xref_map(&unit.create);
        for op in unit.update.iter_mut() {
            let (target, name, security_context, sanitizer, is_dom_property) = match op {
                UpdateOp::Property(prop) | UpdateOp::TwoWayProperty(prop) => {
                    (prop.target, prop.name.as_str(), prop.security_context, &mut prop.sanitizer, false)
                }
                UpdateOp::DomProperty(prop) => {
                    (prop.target, prop.name.as_str(), prop.security_context, &mut prop.sanitizer, true)
                }
                UpdateOp::Attribute(attr) => {
                    (attr.target, attr.name.as_str(), attr.security_context, &mut attr.sanitizer, false)
                }
                _ => continue,
            };

            if let Some(sanitizer_ref) = sanitizer_fn(security_context) {
                *sanitizer = Some(o::import_ref(sanitizer_ref));
                continue;
            }
            *sanitizer = None;

            // For host bindings the matched element is unknown, so it is assumed to be an
            // `<iframe>` and checked at runtime.
            let is_iframe = if is_host || is_dom_property {
                true
            } else {
                let owner = lookup_element(&elements, target)?;
                matches!(
                    unit.create.get(owner),
                    Some(CreateOp::ElementStart(el) | CreateOp::Element(el)) if el.tag.eq_ignore_ascii_case("iframe")
                )
            };
            if is_iframe && is_iframe_security_sensitive_attr(name) {
                *sanitizer = Some(o::import_ref(Identifiers::validate_iframe_attribute()));
            }
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
        create_element_start_op, BindingExpression, BindingKind, Namespace, PropertyOp, XrefId,
    };
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("<iframe [src]=\"u\">", "test.html"));
        ParseSourceSpan::from_offsets(&file, 0, 7)
    }

    fn property(target: XrefId, name: &str, security_context: SecurityContext) -> UpdateOp {
        UpdateOp::Property(PropertyOp {
            target,
            name: name.to_string(),
            expression: BindingExpression::Expression(o::variable("u")),
            binding_kind: BindingKind::Property,
            security_context,
            sanitizer: None,
            is_structural_template_attribute: false,
            template_kind: None,
            source_span: span(),
        })
    }

    fn sanitizers(job: &CompilationJob) -> Vec<Option<o::Expression>> {
        job.root_unit()
            .update
            .iter()
            .map(|op| match op {
                UpdateOp::Property(prop) => prop.sanitizer.clone(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn security_context_selects_sanitizer_and_iframe_attrs_are_validated() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let iframe = job.allocate_xref_id();
        let unit = job.root_unit_mut();
        unit.create.push(CreateOp::ElementStart(create_element_start_op(
            "iframe",
            iframe,
            Namespace::HTML,
            span(),
            span(),
        )));
        unit.update.push(property(iframe, "src", SecurityContext::ResourceUrl));
        unit.update.push(property(iframe, "sandbox", SecurityContext::NONE));
        unit.update.push(property(iframe, "title", SecurityContext::NONE));

        resolve_sanitizers(&mut job).unwrap();

        let found = sanitizers(&job);
        assert!(found[0]
            .as_ref()
            .is_some_and(|s| s.is_equivalent(&o::import_ref(Identifiers::sanitize_resource_url()))));
        assert!(found[1]
            .as_ref()
            .is_some_and(|s| s.is_equivalent(&o::import_ref(Identifiers::validate_iframe_attribute()))));
        assert!(found[2].is_none());
    }
}
