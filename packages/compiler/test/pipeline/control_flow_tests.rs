/**
 * Control Flow Argument Tests
 *
 * The exact arguments of the instructions generated for `@if`, `@for`, `@defer` and pipes:
 * slots, view function names, decls and vars counts, const indices and variable offsets.
 */

#[path = "util.rs"]
mod util;

#[cfg(test)]
mod tests {
    use super::util::*;
    use template_pipeline::expression_parser::AST;
    use template_pipeline::output::output_ast::{self as o, FunctionExpr};
    use template_pipeline::render3::r3_ast as t;
    use template_pipeline::render3::Identifiers;
    use template_pipeline::template::pipeline::src::DeferMetadata;
    use template_pipeline::{compile_component_template, CompiledTemplate, PipelineConfig};

    fn compile(nodes: Vec<t::R3Node>) -> CompiledTemplate {
        init_logging();
        compile_component_template("Cmp", &nodes, PipelineConfig::default(), DeferMetadata::None).unwrap()
    }

    fn root_fn(compiled: &CompiledTemplate) -> &FunctionExpr {
        compiled.function.as_ref().expect("a template function")
    }

    fn branch(condition: Option<&str>, children: Vec<t::R3Node>) -> t::IfBlockBranch {
        t::IfBlockBranch {
            expression: condition.map(AST::read),
            children,
            expression_alias: None,
            block: t::BlockNode::new(span()),
            i18n: None,
        }
    }

    fn num(value: usize) -> o::Expression {
        o::literal(value)
    }

    fn ctx(name: &str) -> o::Expression {
        o::variable("ctx").prop(name)
    }

    #[test]
    fn if_else_branches_chain_into_one_statement() {
        let compiled = compile(vec![t::R3Node::IfBlock(t::IfBlock {
            branches: vec![
                branch(Some("a"), vec![node(element("span", vec![]))]),
                branch(None, vec![node(element("p", vec![]))]),
            ],
            block: t::BlockNode::new(span()),
        })]);

        let template_fn = root_fn(&compiled);
        let create = guarded(template_fn, 1.0).unwrap();
        assert_eq!(create.len(), 1);
        let branches = calls_to(create, "ɵɵconditionalCreate");
        assert_eq!(branches.len(), 2);
        assert_args(
            branches[0],
            &[num(0), o::variable("Cmp_Conditional_0_Template"), num(1), num(0), o::literal("span")],
        );
        assert_args(
            branches[1],
            &[num(1), o::variable("Cmp_Conditional_1_Template"), num(1), num(0), o::literal("p")],
        );

        let update = guarded(template_fn, 2.0).unwrap();
        let conditional = calls_to(update, "ɵɵconditional");
        assert_eq!(conditional.len(), 1);
        assert_args(conditional[0], &[ctx("a").conditional(num(0), Some(num(1)))]);
        assert_eq!((compiled.decls, compiled.vars), (2, 1));
    }

    #[test]
    fn if_without_else_falls_back_to_no_branch() {
        let compiled = compile(vec![t::R3Node::IfBlock(t::IfBlock {
            branches: vec![branch(Some("visible"), vec![text("shown")])],
            block: t::BlockNode::new(span()),
        })]);

        let template_fn = root_fn(&compiled);
        let create = calls_to(guarded(template_fn, 1.0).unwrap(), "ɵɵconditionalCreate");
        // A text root has no tag, so the trailing arguments are dropped.
        assert_args(create[0], &[num(0), o::variable("Cmp_Conditional_0_Template"), num(1), num(0)]);
        let update = calls_to(guarded(template_fn, 2.0).unwrap(), "ɵɵconditional");
        assert_args(update[0], &[ctx("visible").conditional(num(0), Some(o::literal(-1.0)))]);
    }

    #[test]
    fn for_with_empty_passes_both_views_and_a_pooled_track_fn() {
        let compiled = compile(vec![t::R3Node::ForLoopBlock(t::ForLoopBlock {
            item: t::Variable::new("item", "$implicit", span()),
            expression: AST::read("items"),
            track_by: AST::read("item").prop("id"),
            context_variables: vec![],
            children: vec![interpolated_read("item")],
            empty: Some(Box::new(t::ForLoopBlockEmpty {
                children: vec![node(element("p", vec![]))],
                block: t::BlockNode::new(span()),
                i18n: None,
            })),
            block: t::BlockNode::new(span()),
            main_block_span: span(),
            i18n: None,
        })]);

        let template_fn = root_fn(&compiled);
        let create = calls_to(guarded(template_fn, 1.0).unwrap(), "ɵɵrepeaterCreate");
        assert_eq!(create.len(), 1);
        assert_args(
            create[0],
            &[
                num(0),
                o::variable("Cmp_For_1_Template"),
                num(1),
                num(1),
                o::null_expr(),
                o::null_expr(),
                o::variable("_forTrack0"),
                o::literal(false),
                o::variable("Cmp_ForEmpty_2_Template"),
                num(1),
                num(0),
                o::literal("p"),
            ],
        );
        let update = calls_to(guarded(template_fn, 2.0).unwrap(), "ɵɵrepeater");
        assert_args(update[0], &[ctx("items")]);
        // The repeater's own slot, its view and its empty view; the empty view is toggled
        // through one binding slot.
        assert_eq!((compiled.decls, compiled.vars), (3, 1));
    }

    #[test]
    fn for_tracking_by_index_uses_the_runtime_helper() {
        let compiled = compile(vec![t::R3Node::ForLoopBlock(t::ForLoopBlock {
            item: t::Variable::new("item", "$implicit", span()),
            expression: AST::read("items"),
            track_by: AST::read("$index"),
            context_variables: vec![t::Variable::new("$index", "$index", span())],
            children: vec![node(element("li", vec![]))],
            empty: None,
            block: t::BlockNode::new(span()),
            main_block_span: span(),
            i18n: None,
        })]);

        let create = calls_to(guarded(root_fn(&compiled), 1.0).unwrap(), "ɵɵrepeaterCreate");
        assert_args(
            create[0],
            &[
                num(0),
                o::variable("Cmp_For_1_Template"),
                num(1),
                num(0),
                o::literal("li"),
                o::null_expr(),
                o::import_ref(Identifiers::repeater_track_by_index()),
            ],
        );
        assert_eq!((compiled.decls, compiled.vars), (2, 0));
    }

    #[test]
    fn defer_passes_secondary_slots_and_the_placeholder_config_index() {
        let mut deferred = t::DeferredBlock::new(vec![node(element("span", vec![]))], span());
        deferred.placeholder = Some(Box::new(t::DeferredBlockPlaceholder {
            children: vec![node(element("p", vec![]))],
            minimum_time: Some(500),
            block: t::BlockNode::new(span()),
            i18n: None,
        }));
        let compiled = compile(vec![t::R3Node::DeferredBlock(deferred)]);

        assert_eq!(compiled.consts.len(), 1);
        assert!(compiled.consts[0].is_equivalent(&o::literal_arr(vec![num(500)])));

        let create = guarded(root_fn(&compiled), 1.0).unwrap();
        assert_eq!(
            instruction_names(create),
            vec!["ɵɵdomTemplate", "ɵɵdomTemplate", "ɵɵdefer", "ɵɵdeferOnIdle"]
        );
        let templates = calls_to(create, "ɵɵdomTemplate");
        assert_args(templates[0], &[num(0), o::variable("Cmp_Defer_0_Template"), num(1), num(0)]);
        assert_args(templates[1], &[num(1), o::variable("Cmp_DeferPlaceholder_1_Template"), num(1), num(0)]);

        let defer = calls_to(create, "ɵɵdefer");
        assert_args(
            defer[0],
            &[
                num(2),
                num(0),
                o::null_expr(),
                o::null_expr(),
                num(1),
                o::null_expr(),
                o::null_expr(),
                num(0),
                o::import_ref(Identifiers::defer_enable_timer_scheduling()),
            ],
        );
        assert!(calls_to(create, "ɵɵdeferOnIdle")[0].is_empty());
        // Two template slots, then the defer block's two.
        assert_eq!(compiled.decls, 4);
    }

    #[test]
    fn pipe_bindings_follow_their_element_and_offset_past_binding_slots() {
        let piped = |receiver: &str, pipe: &str, args: Vec<AST>| {
            let mut div = element("div", vec![]);
            div.inputs.push(bound("title", t::BindingType::Property, AST::read(receiver).pipe(pipe, args)));
            node(div)
        };
        let compiled = compile(vec![
            piped("a", "upper", vec![]),
            piped("b", "fmt", vec![AST::read("c")]),
        ]);

        let template_fn = root_fn(&compiled);
        let create = guarded(template_fn, 1.0).unwrap();
        assert_eq!(
            instruction_names(create),
            vec!["ɵɵelementStart", "ɵɵpipe", "ɵɵelementEnd", "ɵɵelementStart", "ɵɵpipe", "ɵɵelementEnd"]
        );
        let pipes = calls_to(create, "ɵɵpipe");
        assert_args(pipes[0], &[num(1), o::literal("upper")]);
        assert_args(pipes[1], &[num(3), o::literal("fmt")]);

        let update = guarded(template_fn, 2.0).unwrap();
        assert_eq!(instruction_names(update), vec!["ɵɵproperty", "ɵɵadvance", "ɵɵproperty"]);
        let properties = calls_to(update, "ɵɵproperty");
        // Both property bindings claim their slots before either pipe does.
        let bind1 = o::import_ref(Identifiers::pipe_bind_n(1)).call_fn(vec![num(1), num(2), ctx("a")], None);
        let bind2 =
            o::import_ref(Identifiers::pipe_bind_n(2)).call_fn(vec![num(3), num(4), ctx("b"), ctx("c")], None);
        assert_args(properties[0], &[o::literal("title"), bind1]);
        assert_args(properties[1], &[o::literal("title"), bind2]);
        assert_args(calls_to(update, "ɵɵadvance")[0], &[num(2)]);
        assert_eq!((compiled.decls, compiled.vars), (4, 7));
    }
}
