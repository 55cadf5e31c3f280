//! Host Style Property Parsing Phase
//!
//! Host bindings arrive as plain property bindings named `style.width.px`, `class.active`,
//! `style!` and so on. This pass turns them into style and class bindings, the way template
//! bindings already are when parsed.

use crate::error::Result;
use crate::template::pipeline::ir::{BindingKind, UpdateOp};
use crate::template::pipeline::src::compilation::CompilationJob;

use super::parse_extracted_styles::hyphenate;

const STYLE_DOT: &str = "style.";
const CLASS_DOT: &str = "class.";
const STYLE_BANG: &str = "style!";
const CLASS_BANG: &str = "class!";
const BANG_IMPORTANT: &str = "!important";

pub fn parse_host_style_properties(job: &mut CompilationJob) -> Result<()> {
    for op in job.root_unit_mut().update.iter_mut() {
        let UpdateOp::Binding(binding) = op else { continue };
        if binding.kind != BindingKind::Property {
            continue;
        }

        if let Some(name) = binding.name.strip_suffix(BANG_IMPORTANT) {
            binding.name = name.to_string();
        }

        if let Some(style) = binding.name.strip_prefix(STYLE_DOT) {
            let style = if is_css_custom_property(style) {
                style.to_string()
            } else {
                hyphenate(style)
            };
            let (property, unit) = parse_property(&style);
            binding.kind = BindingKind::StyleProperty;
            binding.name = property;
            if unit.is_some() {
                binding.unit = unit;
            }
        } else if binding.name.starts_with(STYLE_BANG) {
            binding.kind = BindingKind::StyleProperty;
            binding.name = "style".to_string();
        } else if let Some(class) = binding
            .name
            .strip_prefix(CLASS_DOT)
            .or_else(|| binding.name.strip_prefix(CLASS_BANG))
        {
            let (property, _) = parse_property(class);
            binding.kind = BindingKind::ClassName;
            binding.name = property;
        }
    }
    Ok(())
}

/// Custom properties (`--brand-color`) keep their exact spelling.
fn is_css_custom_property(name: &str) -> bool {
    name.starts_with("--")
}

/// Splits `width.px` into the property and its unit, dropping any `!important` override.
fn parse_property(name: &str) -> (String, Option<String>) {
    let name = match name.find(BANG_IMPORTANT) {
        Some(index) => &name[..index],
        None => name,
    };
    match name.rfind('.') {
        Some(index) if index > 0 => (name[..index].to_string(), Some(name[index + 1..].to_string())),
        _ => (name.to_string(), None),
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
    use crate::template::pipeline::ir::{create_binding_op, BindingExpression};
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("[style.width.px]=\"w\"", "host"));
        ParseSourceSpan::from_offsets(&file, 0, 16)
    }

    fn parsed(kind: BindingKind, name: &str) -> (BindingKind, String, Option<String>) {
        let mut job = CompilationJob::host_binding("Cmp", ConstantPool::new(), PipelineConfig::default());
        let root = job.root;
        job.root_unit_mut().update.push(create_binding_op(
            root,
            kind,
            name,
            BindingExpression::Expression(o::variable("ctx").prop("value")),
            None,
            SecurityContext::NONE,
            false,
            false,
            None,
            span(),
        ));

        parse_host_style_properties(&mut job).unwrap();

        let result = match job.root_unit().update.iter().next() {
            Some(UpdateOp::Binding(binding)) => (binding.kind, binding.name.clone(), binding.unit.clone()),
            other => panic!("expected a binding, got {other:?}"),
        };
        result
    }

    #[test]
    fn style_properties_are_hyphenated_and_split_from_their_unit() {
        assert_eq!(
            parsed(BindingKind::Property, "style.fontSize.px"),
            (BindingKind::StyleProperty, "font-size".to_string(), Some("px".to_string()))
        );
        assert_eq!(
            parsed(BindingKind::Property, "style.--brandColor"),
            (BindingKind::StyleProperty, "--brandColor".to_string(), None)
        );
        assert_eq!(
            parsed(BindingKind::Property, "style.color!important"),
            (BindingKind::StyleProperty, "color".to_string(), None)
        );
        assert_eq!(parsed(BindingKind::Property, "style!"), (BindingKind::StyleProperty, "style".to_string(), None));
    }

    #[test]
    fn class_bindings_become_class_names() {
        assert_eq!(parsed(BindingKind::Property, "class.active"), (BindingKind::ClassName, "active".to_string(), None));
        assert_eq!(parsed(BindingKind::Property, "class!open"), (BindingKind::ClassName, "open".to_string(), None));
    }

    #[test]
    fn other_bindings_are_left_alone() {
        assert_eq!(parsed(BindingKind::Property, "title"), (BindingKind::Property, "title".to_string(), None));
        assert_eq!(
            parsed(BindingKind::Attribute, "style.color"),
            (BindingKind::Attribute, "style.color".to_string(), None)
        );
    }
}
