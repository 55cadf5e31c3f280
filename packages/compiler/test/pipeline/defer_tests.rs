/**
 * Defer Block Tests
 *
 * `@defer` blocks compiled end to end: trigger validation, implicit triggers, target
 * resolution and timing configs.
 */

#[path = "util.rs"]
mod util;

#[cfg(test)]
mod tests {
    use super::util::*;
    use template_pipeline::expression_parser::AST;
    use template_pipeline::output::output_ast::{self as o, Statement};
    use template_pipeline::render3::r3_ast as t;
    use template_pipeline::template::pipeline::src::DeferMetadata;
    use template_pipeline::{compile_component_template, CompiledTemplate, PipelineConfig};

    fn compile(nodes: Vec<t::R3Node>) -> CompiledTemplate {
        init_logging();
        compile_component_template("Cmp", &nodes, PipelineConfig::default(), DeferMetadata::None).unwrap()
    }

    fn defer_block(configure: impl FnOnce(&mut t::DeferredBlock)) -> t::R3Node {
        let mut deferred = t::DeferredBlock::new(vec![node(element("span", vec![]))], span());
        configure(&mut deferred);
        t::R3Node::DeferredBlock(deferred)
    }

    fn find_call<'a>(statements: &'a [Statement], name: &str) -> &'a [o::Expression] {
        calls_to(statements, name).into_iter().next().unwrap_or_else(|| panic!("no call to {name}"))
    }

    #[test]
    fn defer_block_creates_template_defer_and_trigger() {
        let compiled = compile(vec![defer_block(|d| d.triggers = vec![on("idle", &[])])]);

        assert!(compiled.errors.is_empty());
        let root_fn = compiled.function.as_ref().unwrap();
        assert_eq!(
            create_instructions(root_fn),
            vec!["ɵɵdomTemplate", "ɵɵdefer", "ɵɵdeferOnIdle"]
        );
        assert!(guarded(root_fn, 2.0).is_none());

        let declared: Vec<&str> = compiled
            .statements
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::DeclareFn(decl) => Some(decl.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(declared.len(), 1);
        assert!(declared[0].starts_with("Cmp_Defer"));
    }

    #[test]
    fn untriggered_blocks_default_to_idle() {
        let compiled = compile(vec![defer_block(|_| {})]);
        let root_fn = compiled.function.as_ref().unwrap();
        assert!(create_instructions(root_fn).contains(&"ɵɵdeferOnIdle"));
    }

    #[test]
    fn prefetch_only_blocks_also_trigger_on_idle() {
        let compiled = compile(vec![defer_block(|d| d.prefetch_triggers = vec![on("idle", &[])])]);
        let root_fn = compiled.function.as_ref().unwrap();
        assert_eq!(
            create_instructions(root_fn),
            vec!["ɵɵdomTemplate", "ɵɵdefer", "ɵɵdeferPrefetchOnIdle", "ɵɵdeferOnIdle"]
        );
    }

    #[test]
    fn duplicate_triggers_compile_once_with_an_error() {
        let compiled = compile(vec![defer_block(|d| d.triggers = vec![on("idle", &[]), on("idle", &[])])]);

        assert_eq!(compiled.errors.len(), 1);
        let root_fn = compiled.function.as_ref().unwrap();
        let idles = create_instructions(root_fn)
            .into_iter()
            .filter(|name| *name == "ɵɵdeferOnIdle")
            .count();
        assert_eq!(idles, 1);
    }

    #[test]
    fn timer_delay_is_parsed_into_milliseconds() {
        let compiled = compile(vec![defer_block(|d| d.triggers = vec![on("timer", &["2s"])])]);
        let root_fn = compiled.function.as_ref().unwrap();
        let args = find_call(guarded(root_fn, 1.0).unwrap(), "ɵɵdeferOnTimer");
        assert_eq!(args.len(), 1);
        assert!(args[0].is_equivalent(&o::literal(2000usize)));
    }

    #[test]
    fn when_triggers_run_in_the_update_block() {
        let compiled = compile(vec![defer_block(|d| {
            d.triggers = vec![t::DeferredTriggerSyntax::when(AST::read("ready"), span())]
        })]);
        let root_fn = compiled.function.as_ref().unwrap();
        assert_eq!(update_instructions(root_fn), vec!["ɵɵadvance", "ɵɵdeferWhen"]);
        assert!(!create_instructions(root_fn).contains(&"ɵɵdeferOnIdle"));
    }

    #[test]
    fn interaction_targets_resolve_to_sibling_slots() {
        let mut button = element("button", vec![]);
        button.references.push(t::Reference::new("btn", "", span()));
        let compiled = compile(vec![
            node(button),
            defer_block(|d| d.triggers = vec![on("interaction", &["btn"])]),
        ]);

        assert!(compiled.errors.is_empty());
        let root_fn = compiled.function.as_ref().unwrap();
        let args = find_call(guarded(root_fn, 1.0).unwrap(), "ɵɵdeferOnInteraction");
        assert_eq!(args.len(), 1);
        assert!(args[0].is_equivalent(&o::literal(0usize)));
    }

    #[test]
    fn unknown_trigger_targets_are_reported_and_dropped() {
        let compiled = compile(vec![defer_block(|d| d.triggers = vec![on("interaction", &["missing"])])]);

        assert_eq!(compiled.errors.len(), 1);
        let root_fn = compiled.function.as_ref().unwrap();
        assert!(!create_instructions(root_fn).contains(&"ɵɵdeferOnInteraction"));
    }

    #[test]
    fn placeholder_minimum_time_becomes_a_const() {
        let compiled = compile(vec![defer_block(|d| {
            d.placeholder = Some(Box::new(t::DeferredBlockPlaceholder {
                children: vec![text("loading")],
                minimum_time: Some(500),
                block: t::BlockNode::new(span()),
                i18n: None,
            }))
        })]);

        let expected = o::literal_arr(vec![o::literal(500usize)]);
        assert!(compiled.consts.iter().any(|c| c.is_equivalent(&expected)));
        let root_fn = compiled.function.as_ref().unwrap();
        assert_eq!(
            create_instructions(root_fn),
            vec!["ɵɵdomTemplate", "ɵɵdomTemplate", "ɵɵdefer", "ɵɵdeferOnIdle"]
        );
    }
}
