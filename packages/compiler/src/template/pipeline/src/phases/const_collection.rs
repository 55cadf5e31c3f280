//! Const Collection Phase
//!
//! Converts the semantic attributes of element-like operations (`ExtractedAttribute` ops) into
//! constant array expressions, and lifts them into the overall component `consts`. Local
//! reference lists and i18n messages are registered as consts as well.

use indexmap::{IndexMap, IndexSet};

use crate::core::AttributeMarker;
use crate::directive_matching::{parse_selector_to_r3_selector, r3_selector_literal};
use crate::error::{invariant, CompilerError, Result};
use crate::output::output_ast::{self as o, Expression, LiteralExpr, LiteralValue};
use crate::template::pipeline::ir::{
    BindingKind, CompatibilityMode, CompilationJobKind, ConstIndex, CreateOp, LocalRef, XrefId,
};
use crate::template::pipeline::src::compilation::CompilationJob;

/// Container for all of the various kinds of attributes which are applied on an element.
#[derive(Debug, Default)]
struct ElementAttributes {
    known: IndexMap<BindingKind, IndexSet<String>>,
    attributes: Vec<Expression>,
    classes: Vec<Expression>,
    styles: Vec<Expression>,
    bindings: Vec<Expression>,
    template: Vec<Expression>,
    i18n: Vec<Expression>,
    project_as: Option<String>,
}

impl ElementAttributes {
    fn is_known(&mut self, kind: BindingKind, name: &str) -> bool {
        !self.known.entry(kind).or_default().insert(name.to_string())
    }

    fn add(
        &mut self,
        kind: BindingKind,
        name: &str,
        value: Option<&Expression>,
        namespace: Option<&str>,
        compatibility: CompatibilityMode,
    ) -> Result<()> {
        // Compatibility output repeats duplicate static attributes, classes and styles.
        let allow_duplicates = compatibility == CompatibilityMode::TemplateDefinitionBuilder
            && matches!(kind, BindingKind::Attribute | BindingKind::ClassName | BindingKind::StyleProperty);
        if !allow_duplicates && self.is_known(kind, name) {
            return Ok(());
        }

        if name == "ngProjectAs" {
            return match value {
                Some(Expression::Literal(LiteralExpr {
                    value: LiteralValue::String(selector),
                    ..
                })) => {
                    self.project_as = Some(selector.clone());
                    Ok(())
                }
                _ => invariant("ngProjectAs must have a string literal value"),
            };
        }

        let array = match kind {
            BindingKind::Property | BindingKind::TwoWayProperty | BindingKind::Animation => &mut self.bindings,
            BindingKind::Attribute => &mut self.attributes,
            BindingKind::ClassName => &mut self.classes,
            BindingKind::StyleProperty => &mut self.styles,
            BindingKind::Template => &mut self.template,
            BindingKind::I18n => &mut self.i18n,
        };
        if let Some(namespace) = namespace {
            array.push(o::literal(AttributeMarker::NamespaceURI as usize));
            array.push(o::literal(namespace));
        }
        array.push(o::literal(name));
        if matches!(kind, BindingKind::Attribute | BindingKind::StyleProperty) {
            match value {
                Some(value) => array.push(value.clone()),
                None => return invariant(format!("attribute `{name}` was extracted without a value")),
            }
        }
        Ok(())
    }

    fn serialize(self) -> Result<Vec<Expression>> {
        let mut array = self.attributes;
        if let Some(selector) = self.project_as {
            // Only the first selector of the list is used for projection.
            let parsed = parse_selector_to_r3_selector(&selector).map_err(CompilerError::Invariant)?;
            if let Some(first) = parsed.into_iter().next() {
                array.push(o::literal(AttributeMarker::ProjectAs as usize));
                let Expression::LiteralArray(mut list) = r3_selector_literal(&[first]) else {
                    return invariant("selector literal is not an array");
                };
                array.extend(list.entries.pop());
            }
        }
        for (marker, entries) in [
            (AttributeMarker::Classes, self.classes),
            (AttributeMarker::Styles, self.styles),
            (AttributeMarker::Bindings, self.bindings),
            (AttributeMarker::Template, self.template),
            (AttributeMarker::I18n, self.i18n),
        ] {
            if !entries.is_empty() {
                array.push(o::literal(marker as usize));
                array.extend(entries);
            }
        }
        Ok(array)
    }
}

pub fn collect_element_consts(job: &mut CompilationJob) -> Result<()> {
    let compatibility = job.compatibility;

    // Gather the extracted attributes of every element and drop the ops.
    let mut all_attributes: IndexMap<XrefId, ElementAttributes> = IndexMap::new();
    for unit in job.units_mut() {
        let mut failure: Option<CompilerError> = None;
        unit.create.retain(|op| {
            let CreateOp::ExtractedAttribute(attr) = op else { return true };
            let entry = all_attributes.entry(attr.target).or_default();
            if let Err(err) = entry.add(
                attr.binding_kind,
                &attr.name,
                attr.expression.as_ref(),
                attr.namespace.as_deref(),
                compatibility,
            ) {
                failure.get_or_insert(err);
            }
            false
        });
        if let Some(err) = failure {
            return Err(err);
        }
    }

    let mut serialized: IndexMap<XrefId, Vec<Expression>> = IndexMap::new();
    for (xref, attributes) in all_attributes {
        let array = attributes.serialize()?;
        if !array.is_empty() {
            serialized.insert(xref, array);
        }
    }

    if job.kind == CompilationJobKind::Host {
        let root = job.root;
        for (xref, array) in serialized {
            if xref != root {
                return invariant("host attributes must belong to the host binding's root xref");
            }
            job.host_attributes = Some(o::literal_arr(array));
        }
        return Ok(());
    }

    for view in job.view_xrefs() {
        let ids = job.view(view)?.create.ids();
        for id in ids {
            let Some(op) = job.view(view)?.create.get(id) else { continue };
            let xref = op.xref();
            let empty_view = match op {
                CreateOp::RepeaterCreate(repeater) => repeater.empty_view,
                _ => None,
            };
            let is_element = op.is_element_or_container() && !matches!(op, CreateOp::Projection(_));
            let local_refs = serialize_local_refs(op.local_refs());
            let message = match op {
                CreateOp::I18nStart(start) => Some(start.message.clone()),
                _ => None,
            };

            let attributes = match xref.filter(|_| is_element).and_then(|x| serialized.get(&x)) {
                Some(array) => Some(job.add_const(o::literal_arr(array.clone()), Vec::new())),
                None => None,
            };
            let empty_attributes = match empty_view.and_then(|x| serialized.get(&x)) {
                Some(array) => Some(job.add_const(o::literal_arr(array.clone()), Vec::new())),
                None => None,
            };
            let local_refs_index = local_refs.map(|refs| job.add_const(refs, Vec::new()));
            let message_index = message.map(|message| job.add_const(o::literal(message), Vec::new()));

            let Some(op) = job.view_mut(view)?.create.get_mut(id) else { continue };
            if let CreateOp::Projection(projection) = op {
                projection.attributes = serialized.get(&projection.xref).cloned().map(o::literal_arr);
                continue;
            }
            apply_consts(op, attributes, empty_attributes, local_refs_index, message_index);
        }
    }
    Ok(())
}

fn apply_consts(
    op: &mut CreateOp,
    attributes: Option<ConstIndex>,
    empty_attributes: Option<ConstIndex>,
    local_refs_index: Option<ConstIndex>,
    message_index: Option<ConstIndex>,
) {
    match op {
        CreateOp::ElementStart(el) | CreateOp::Element(el) => {
            el.attributes = attributes;
            el.local_refs_index = local_refs_index;
        }
        CreateOp::ContainerStart(container) | CreateOp::Container(container) => {
            container.attributes = attributes;
            container.local_refs_index = local_refs_index;
        }
        CreateOp::Template(t) | CreateOp::ConditionalCreate(t) | CreateOp::ConditionalBranchCreate(t) => {
            t.attributes = attributes;
            t.local_refs_index = local_refs_index;
        }
        CreateOp::RepeaterCreate(repeater) => {
            repeater.attributes = attributes;
            repeater.empty_attributes = empty_attributes;
        }
        CreateOp::I18nStart(start) => start.message_index = message_index,
        _ => {}
    }
}

/// `[name, target, name, target, ...]`, or `None` for ops without local refs.
fn serialize_local_refs(refs: &[LocalRef]) -> Option<Expression> {
    if refs.is_empty() {
        return None;
    }
    Some(o::literal_arr(
        refs.iter()
            .flat_map(|r| [o::literal(r.name.as_str()), o::literal(r.target.as_str())])
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::core::SecurityContext;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{create_element_start_op, create_extracted_attribute_op, Namespace};
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("<div a=\"b\" class=\"c\" #r></div>", "test.html"));
        ParseSourceSpan::from_offsets(&file, 0, 4)
    }

    #[test]
    fn extracted_attributes_become_one_const_with_markers() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let div = job.allocate_xref_id();
        let unit = job.root_unit_mut();
        unit.create.push(create_extracted_attribute_op(
            div,
            BindingKind::Attribute,
            None,
            "a",
            Some(o::literal("b")),
            SecurityContext::NONE,
        ));
        unit.create.push(create_extracted_attribute_op(div, BindingKind::ClassName, None, "c", None, SecurityContext::NONE));
        unit.create.push(create_extracted_attribute_op(div, BindingKind::Property, None, "p", None, SecurityContext::NONE));
        let mut start = create_element_start_op("div", div, Namespace::HTML, span(), span());
        start.local_refs.push(LocalRef {
            name: "r".to_string(),
            target: String::new(),
        });
        unit.create.push(CreateOp::ElementStart(start));

        collect_element_consts(&mut job).unwrap();

        let unit = job.root_unit();
        assert_eq!(unit.create.len(), 1);
        let Some(CreateOp::ElementStart(el)) = unit.create.iter().next() else { panic!("expected the element") };
        assert_eq!(el.attributes, Some(ConstIndex::new(0)));
        assert_eq!(el.local_refs_index, Some(ConstIndex::new(1)));
        let expected = o::literal_arr(vec![
            o::literal("a"),
            o::literal("b"),
            o::literal(AttributeMarker::Classes as usize),
            o::literal("c"),
            o::literal(AttributeMarker::Bindings as usize),
            o::literal("p"),
        ]);
        assert!(job.consts[0].is_equivalent(&expected));
        assert!(job.consts[1].is_equivalent(&o::literal_arr(vec![o::literal("r"), o::literal("")])));
    }

    #[test]
    fn duplicate_binding_names_are_registered_once() {
        let mut attrs = ElementAttributes::default();
        attrs.add(BindingKind::Property, "p", None, None, CompatibilityMode::Full).unwrap();
        attrs.add(BindingKind::Property, "p", None, None, CompatibilityMode::Full).unwrap();
        let array = attrs.serialize().unwrap();
        assert_eq!(array.len(), 2);
    }

    #[test]
    fn host_attributes_land_on_the_job() {
        let mut job = CompilationJob::host_binding("Cmp", ConstantPool::new(), PipelineConfig::default());
        let root = job.root;
        job.root_unit_mut().create.push(create_extracted_attribute_op(
            root,
            BindingKind::Attribute,
            None,
            "role",
            Some(o::literal("button")),
            SecurityContext::NONE,
        ));

        collect_element_consts(&mut job).unwrap();

        let expected = o::literal_arr(vec![o::literal("role"), o::literal("button")]);
        assert!(job.host_attributes.as_ref().is_some_and(|attrs| attrs.is_equivalent(&expected)));
        assert!(job.consts.is_empty());
    }
}
