//! Deduplicate Text Bindings Phase
//!
//! An element may repeat a static attribute, e.g. `<div class="a" class="b">`. Most repeats
//! are listed in the consts in order, but a repeated `class` or `style` keeps only its last
//! value in compatibility mode.

use indexmap::{IndexMap, IndexSet};

use crate::error::Result;
use crate::template::pipeline::ir::{CompatibilityMode, UpdateOp, XrefId};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn deduplicate_text_bindings(job: &mut CompilationJob) -> Result<()> {
    if job.compatibility != CompatibilityMode::TemplateDefinitionBuilder {
        return Ok(());
    }
    for unit in job.units_mut() {
        let mut seen: IndexMap<XrefId, IndexSet<String>> = IndexMap::new();
        let mut shadowed = Vec::new();
        for id in unit.update.ids().into_iter().rev() {
            let Some(UpdateOp::Binding(binding)) = unit.update.get(id) else { continue };
            if !binding.is_text_attribute {
                continue;
            }
            let first_seen = seen.entry(binding.target).or_default().insert(binding.name.clone());
            if !first_seen && (binding.name == "class" || binding.name == "style") {
                shadowed.push(id);
            }
        }
        for id in shadowed {
            unit.update.remove(id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::core::SecurityContext;
    use crate::output::output_ast as o;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{create_binding_op, BindingExpression, BindingKind};
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("<div class=\"a\" class=\"b\"></div>", "test.html"));
        ParseSourceSpan::from_offsets(&file, 5, 14)
    }

    fn text_attribute(target: XrefId, name: &str, value: &str) -> UpdateOp {
        create_binding_op(
            target,
            BindingKind::Attribute,
            name,
            BindingExpression::Expression(o::literal(value)),
            None,
            SecurityContext::NONE,
            true,
            false,
            None,
            span(),
        )
    }

    fn job_with(config: PipelineConfig, ops: impl FnOnce(XrefId, XrefId) -> Vec<UpdateOp>) -> CompilationJob {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), config);
        let (first, second) = (job.allocate_xref_id(), job.allocate_xref_id());
        let ops = ops(first, second);
        job.root_unit_mut().update.push_all(ops);
        job
    }

    fn values(job: &CompilationJob) -> Vec<(String, String)> {
        job.root_unit()
            .update
            .iter()
            .filter_map(|op| match op {
                UpdateOp::Binding(binding) => match &binding.expression {
                    BindingExpression::Expression(o::Expression::Literal(lit)) => {
                        Some((binding.name.clone(), format!("{:?}", lit.value)))
                    }
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }

    #[test]
    fn last_class_and_style_win_per_element() {
        let mut job = job_with(PipelineConfig::default(), |div, other| {
            vec![
                text_attribute(div, "class", "a"),
                text_attribute(div, "title", "x"),
                text_attribute(div, "class", "b"),
                text_attribute(div, "title", "y"),
                text_attribute(div, "style", "color: red"),
                text_attribute(div, "style", "color: blue"),
                text_attribute(other, "class", "c"),
            ]
        });

        deduplicate_text_bindings(&mut job).unwrap();

        let names: Vec<String> = values(&job).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["title", "class", "title", "style", "class"]);
        let kept = values(&job);
        assert!(kept[1].1.contains('b'));
        assert!(kept[3].1.contains("blue"));
    }

    #[test]
    fn full_compatibility_keeps_every_repeat() {
        let config = PipelineConfig {
            compatibility_mode: CompatibilityMode::Full,
            ..PipelineConfig::default()
        };
        let mut job = job_with(config, |div, _| vec![text_attribute(div, "class", "a"), text_attribute(div, "class", "b")]);

        deduplicate_text_bindings(&mut job).unwrap();

        assert_eq!(values(&job).len(), 2);
    }
}
