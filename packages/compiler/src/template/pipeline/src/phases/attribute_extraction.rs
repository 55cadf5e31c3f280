//! Attribute Extraction Phase
//!
//! Find all extractable attribute and binding ops, and create `ExtractedAttribute` ops for
//! them. Static attributes move out of the update list entirely; bindings and listeners
//! leave a name-only marker behind so the runtime can match directives against them.

use crate::core::SecurityContext;
use crate::error::Result;
use crate::output::output_ast::Expression;
use crate::template::pipeline::ir::{
    create_extracted_attribute_op, BindingExpression, BindingKind, CompatibilityMode, CompilationJobKind, CreateOp,
    OpId, UpdateOp, XrefId,
};
use crate::template::pipeline::src::compilation::{CompilationJob, ViewCompilationUnit};
use crate::template::pipeline::src::util::elements::{create_op_xref_map, lookup_element};

pub fn extract_attributes(job: &mut CompilationJob) -> Result<()> {
    let kind = job.kind;
    let compatibility = job.compatibility;
    for unit in job.units_mut() {
        process_unit(unit, kind, compatibility)?;
    }
    Ok(())
}

/// Where an extracted attribute lands: before its element, or (host jobs) at the end.
enum Placement {
    BeforeElement(XrefId),
    Append,
}

fn process_unit(unit: &mut ViewCompilationUnit, kind: CompilationJobKind, compatibility: CompatibilityMode) -> Result<()> {
    let elements = create_op_xref_map(&unit.create);
    let is_host = kind == CompilationJobKind::Host;
    let mut extracted: Vec<(Placement, CreateOp)> = Vec::new();

    for op in unit.create.iter() {
        match op {
            CreateOp::Listener(listener) => {
                // Global targets (`window:resize`) never match directives.
                if listener.event_target.is_some() {
                    continue;
                }
                let attr = create_extracted_attribute_op(
                    listener.target,
                    BindingKind::Property,
                    None,
                    listener.name.clone(),
                    None,
                    SecurityContext::NONE,
                );
                if is_host {
                    if compatibility == CompatibilityMode::TemplateDefinitionBuilder {
                        continue;
                    }
                    extracted.push((Placement::Append, attr));
                } else {
                    extracted.push((Placement::BeforeElement(listener.target), attr));
                }
            }
            // Two-way listeners aren't supported in host bindings.
            CreateOp::TwoWayListener(listener) if !is_host => {
                extracted.push((
                    Placement::BeforeElement(listener.target),
                    create_extracted_attribute_op(
                        listener.target,
                        BindingKind::Property,
                        None,
                        listener.name.clone(),
                        None,
                        SecurityContext::NONE,
                    ),
                ));
            }
            _ => {}
        }
    }

    let mut removed: Vec<OpId> = Vec::new();
    for (id, op) in unit.update.iter_with_ids() {
        match op {
            UpdateOp::Attribute(attr) => {
                let BindingExpression::Expression(expression) = &attr.expression else {
                    continue;
                };
                let mut extractable = attr.is_text_attribute || expression.is_constant();
                if compatibility == CompatibilityMode::TemplateDefinitionBuilder {
                    // The legacy builder only extracted text attributes.
                    extractable = extractable && attr.is_text_attribute;
                }
                if !extractable {
                    continue;
                }
                let binding_kind = if attr.is_structural_template_attribute {
                    BindingKind::Template
                } else {
                    BindingKind::Attribute
                };
                let extracted_op = create_extracted_attribute_op(
                    attr.target,
                    binding_kind,
                    attr.namespace.clone(),
                    attr.name.clone(),
                    Some(expression.clone()),
                    attr.security_context,
                );
                let placement = if is_host {
                    Placement::Append
                } else {
                    Placement::BeforeElement(attr.target)
                };
                extracted.push((placement, extracted_op));
                removed.push(id);
            }
            UpdateOp::Property(prop) if prop.binding_kind != BindingKind::Animation => {
                let binding_kind = if prop.is_structural_template_attribute {
                    BindingKind::Template
                } else {
                    BindingKind::Property
                };
                extracted.push((
                    Placement::BeforeElement(prop.target),
                    create_extracted_attribute_op(
                        prop.target,
                        binding_kind,
                        None,
                        prop.name.clone(),
                        None,
                        prop.security_context,
                    ),
                ));
            }
            UpdateOp::TwoWayProperty(prop) => {
                extracted.push((
                    Placement::BeforeElement(prop.target),
                    create_extracted_attribute_op(
                        prop.target,
                        BindingKind::TwoWayProperty,
                        None,
                        prop.name.clone(),
                        None,
                        prop.security_context,
                    ),
                ));
            }
            UpdateOp::StyleProp(style) if compatibility == CompatibilityMode::TemplateDefinitionBuilder => {
                if style.expression.is_empty_expression() {
                    extracted.push(empty_style_binding(style.target, &style.name));
                }
            }
            UpdateOp::ClassProp(class) if compatibility == CompatibilityMode::TemplateDefinitionBuilder => {
                if matches!(class.expression, Expression::Empty(_)) {
                    extracted.push(empty_style_binding(class.target, &class.name));
                }
            }
            _ => {}
        }
    }

    for id in removed {
        unit.update.remove(id)?;
    }

    for (placement, op) in extracted {
        match placement {
            Placement::Append => {
                unit.create.push(op);
            }
            Placement::BeforeElement(target) => {
                let anchor = lookup_element(&elements, target)?;
                unit.create.insert_before(anchor, op)?;
            }
        }
    }
    Ok(())
}

/// The legacy builder registered `[style.x]`/`[class.x]` bindings with an empty value as
/// property bindings, for directive matching.
fn empty_style_binding(target: XrefId, name: &str) -> (Placement, CreateOp) {
    (
        Placement::BeforeElement(target),
        create_extracted_attribute_op(target, BindingKind::Property, None, name, None, SecurityContext::STYLE),
    )
}
