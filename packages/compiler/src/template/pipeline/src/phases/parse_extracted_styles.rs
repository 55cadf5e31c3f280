//! Parse Extracted Styles Phase
//!
//! Parses extracted `style` and `class` attributes into separate `ExtractedAttribute` ops per
//! style or class property.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::SecurityContext;
use crate::error::Result;
use crate::output::output_ast::{self as o, Expression, LiteralValue};
use crate::template::pipeline::ir::{
    create_extracted_attribute_op, BindingKind, CreateOp, ExtractedAttributeOp, OpId, TemplateKind, XrefId,
};
use crate::template::pipeline::src::compilation::CompilationJob;

static CAMEL_CASE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid camel case pattern"));

/// Parses the string representation of a style (`color: red; height: auto`) into
/// property name and value pairs, in source order.
///
/// Semicolons and colons inside parentheses or quotes don't split declarations.
pub fn parse_style(value: &str) -> Vec<(String, String)> {
    let bytes = value.as_bytes();
    let mut styles = Vec::new();

    let mut paren_depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut value_start = 0usize;
    let mut prop_start = 0usize;
    let mut current_prop: Option<String> = None;

    for (i, &token) in bytes.iter().enumerate() {
        match token {
            b'(' => paren_depth += 1,
            b')' => paren_depth -= 1,
            b'\'' | b'"' => match quote {
                None => quote = Some(token),
                Some(open) if open == token && (i == 0 || bytes[i - 1] != b'\\') => quote = None,
                _ => {}
            },
            b':' if current_prop.is_none() && paren_depth == 0 && quote.is_none() => {
                current_prop = Some(hyphenate(value[prop_start..i].trim()));
                value_start = i + 1;
            }
            b';' if value_start > 0 && paren_depth == 0 && quote.is_none() => {
                if let Some(prop) = current_prop.take() {
                    styles.push((prop, value[value_start..i].trim().to_string()));
                    prop_start = i + 1;
                    value_start = 0;
                }
            }
            _ => {}
        }
    }

    if let Some(prop) = current_prop {
        if value_start > 0 {
            styles.push((prop, value[value_start..].trim().to_string()));
        }
    }
    styles
}

/// `backgroundColor` → `background-color`.
pub fn hyphenate(value: &str) -> String {
    CAMEL_CASE_BOUNDARY.replace_all(value, "$1-$2").to_lowercase()
}

pub fn parse_extracted_styles(job: &mut CompilationJob) -> Result<()> {
    // Structural templates keep `class` and `style` as plain attributes, like the legacy builder.
    let mut structural: IndexMap<XrefId, bool> = IndexMap::new();
    for unit in job.units() {
        for op in unit.create.iter() {
            if !op.is_element_or_container() {
                continue;
            }
            if let Some(xref) = op.xref() {
                let is_structural = op
                    .as_template()
                    .map_or(false, |t| t.template_kind == TemplateKind::Structural);
                structural.insert(xref, is_structural);
            }
        }
    }

    for unit in job.units_mut() {
        let mut rewrites: Vec<(OpId, Vec<CreateOp>)> = Vec::new();
        for (id, op) in unit.create.iter_with_ids() {
            let CreateOp::ExtractedAttribute(attr) = op else {
                continue;
            };
            if attr.binding_kind != BindingKind::Attribute {
                continue;
            }
            if structural.get(&attr.target).copied().unwrap_or(false) {
                continue;
            }
            let Some(Expression::Literal(o::LiteralExpr {
                value: LiteralValue::String(text),
                ..
            })) = &attr.expression
            else {
                continue;
            };
            match attr.name.as_str() {
                "style" => rewrites.push((id, split_styles(attr, text))),
                "class" => rewrites.push((id, split_classes(attr, text))),
                _ => {}
            }
        }
        for (id, ops) in rewrites {
            unit.create.replace_with_many(id, ops)?;
        }
    }
    Ok(())
}

fn split_styles(attr: &ExtractedAttributeOp, text: &str) -> Vec<CreateOp> {
    parse_style(text)
        .into_iter()
        .map(|(name, value)| {
            create_extracted_attribute_op(
                attr.target,
                BindingKind::StyleProperty,
                None,
                name,
                Some(o::literal(value)),
                SecurityContext::STYLE,
            )
        })
        .collect()
}

fn split_classes(attr: &ExtractedAttributeOp, text: &str) -> Vec<CreateOp> {
    text.split_whitespace()
        .map(|class| {
            create_extracted_attribute_op(
                attr.target,
                BindingKind::ClassName,
                None,
                class,
                None,
                SecurityContext::NONE,
            )
        })
        .collect()
}
