/**
 * Emission Tests
 *
 * End-to-end compilation of small templates into view functions.
 */

#[path = "util.rs"]
mod util;

#[cfg(test)]
mod tests {
    use super::util::*;
    use indexmap::IndexMap;
    use template_pipeline::expression_parser::AST;
    use template_pipeline::output::output_ast::{self as o, Statement};
    use template_pipeline::render3::r3_ast as t;
    use template_pipeline::template::pipeline::src::{DeferMetadata, HostBindingInput};
    use template_pipeline::{compile_component_template, compile_host_bindings, CompiledTemplate, PipelineConfig};

    fn compile(nodes: Vec<t::R3Node>) -> CompiledTemplate {
        init_logging();
        compile_component_template("Cmp", &nodes, PipelineConfig::default(), DeferMetadata::None).unwrap()
    }

    fn if_block(condition: &str, children: Vec<t::R3Node>) -> t::R3Node {
        t::R3Node::IfBlock(t::IfBlock {
            branches: vec![t::IfBlockBranch {
                expression: Some(AST::read(condition)),
                children,
                expression_alias: None,
                block: t::BlockNode::new(span()),
                i18n: None,
            }],
            block: t::BlockNode::new(span()),
        })
    }

    fn declared_functions(compiled: &CompiledTemplate) -> Vec<&str> {
        compiled
            .statements
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::DeclareFn(decl) => Some(decl.name.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn class_binding_and_interpolation_end_to_end() {
        let mut div = element("div", vec![interpolated_read("y")]);
        div.inputs.push(bound("a", t::BindingType::Class, AST::read("x")));
        let compiled = compile(vec![node(div)]);

        assert!(compiled.errors.is_empty());
        let template_fn = compiled.function.as_ref().unwrap();
        assert_eq!(template_fn.name.as_deref(), Some("Cmp_Template"));
        let params: Vec<&str> = template_fn.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["rf", "ctx"]);
        assert_eq!(template_fn.statements.len(), 2);

        assert_eq!(
            create_instructions(template_fn),
            vec!["ɵɵelementStart", "ɵɵtext", "ɵɵelementEnd"]
        );
        assert_eq!(
            update_instructions(template_fn),
            vec!["ɵɵclassProp", "ɵɵadvance", "ɵɵtextInterpolate"]
        );
        assert_eq!(compiled.decls, 2);
    }

    #[test]
    fn static_templates_have_only_a_create_guard() {
        let compiled = compile(vec![node(element("div", vec![text("hi")]))]);
        let template_fn = compiled.function.as_ref().unwrap();
        assert_eq!(template_fn.statements.len(), 1);
        assert!(guarded(template_fn, 1.0).is_some());
        assert!(guarded(template_fn, 2.0).is_none());
    }

    #[test]
    fn empty_templates_have_no_guards() {
        let compiled = compile(vec![]);
        assert!(compiled.function.as_ref().unwrap().statements.is_empty());
        assert_eq!(compiled.decls, 0);
    }

    #[test]
    fn nested_views_are_declared_deepest_first() {
        let compiled = compile(vec![if_block("a", vec![if_block("b", vec![interpolated_read("c")])])]);

        let declared = declared_functions(&compiled);
        assert_eq!(declared.len(), 2);
        let (grandchild, child) = (declared[0], declared[1]);
        assert!(grandchild.starts_with(child.trim_end_matches("_Template")));
        assert!(grandchild.len() > child.len());
        assert!(child.starts_with("Cmp_"));

        let root_fn = compiled.function.as_ref().unwrap();
        assert_eq!(create_instructions(root_fn), vec!["ɵɵconditionalCreate"]);
        assert_eq!(update_instructions(root_fn), vec!["ɵɵconditional"]);
    }

    #[test]
    fn view_names_can_omit_the_component() {
        let config = PipelineConfig {
            component_name_in_fn: false,
            ..PipelineConfig::default()
        };
        let nodes = vec![if_block("a", vec![text("x")])];
        let compiled = compile_component_template("Cmp", &nodes, config, DeferMetadata::None).unwrap();

        assert_eq!(compiled.function.as_ref().unwrap().name.as_deref(), Some("Template"));
        let declared = declared_functions(&compiled);
        assert_eq!(declared.len(), 1);
        assert!(declared[0].starts_with("Template_"));
    }

    #[test]
    fn host_bindings_without_work_emit_no_function() {
        let mut attributes = IndexMap::new();
        attributes.insert("role".to_string(), o::literal("button"));
        let input = HostBindingInput {
            component_name: "Dir".to_string(),
            properties: vec![],
            attributes,
            events: vec![],
            source_span: span(),
        };
        let compiled = compile_host_bindings(&input, PipelineConfig::default()).unwrap();

        assert!(compiled.function.is_none());
        let expected = o::literal_arr(vec![o::literal("role"), o::literal("button")]);
        assert!(compiled.host_attributes.as_ref().is_some_and(|attrs| attrs.is_equivalent(&expected)));
    }

    #[test]
    fn host_bindings_with_properties_emit_an_update_block() {
        let input = HostBindingInput {
            component_name: "Dir".to_string(),
            properties: vec![bound("class.active", t::BindingType::Property, AST::read("isActive"))],
            attributes: IndexMap::new(),
            events: vec![],
            source_span: span(),
        };
        let compiled = compile_host_bindings(&input, PipelineConfig::default()).unwrap();

        let host_fn = compiled.function.as_ref().unwrap();
        assert_eq!(host_fn.name.as_deref(), Some("Dir_HostBindings"));
        assert!(guarded(host_fn, 1.0).is_none());
        assert_eq!(update_instructions(host_fn), vec!["ɵɵclassProp"]);
        assert_eq!(compiled.vars, 2);
    }

    #[test]
    fn host_style_names_are_parsed_into_style_and_class_bindings() {
        let input = HostBindingInput {
            component_name: "Dir".to_string(),
            properties: vec![
                bound("style.fontSize.px", t::BindingType::Property, AST::read("size")),
                bound("class.open!important", t::BindingType::Property, AST::read("isOpen")),
            ],
            attributes: IndexMap::new(),
            events: vec![],
            source_span: span(),
        };
        let compiled = compile_host_bindings(&input, PipelineConfig::default()).unwrap();

        let update = guarded(compiled.function.as_ref().unwrap(), 2.0).unwrap();
        assert_eq!(instruction_names(update), vec!["ɵɵstyleProp", "ɵɵclassProp"]);
        let ctx = |name: &str| o::variable("ctx").prop(name);
        assert_args(
            calls_to(update, "ɵɵstyleProp")[0],
            &[o::literal("font-size"), ctx("size"), o::literal("px")],
        );
        assert_args(calls_to(update, "ɵɵclassProp")[0], &[o::literal("open"), ctx("isOpen")]);
    }

    #[test]
    fn non_bindable_elements_disable_bindings_for_their_contents() {
        let mut div = element("div", vec![node(element("span", vec![]))]);
        div.attributes.push(t::TextAttribute::new("ngNonBindable", "", span()));
        let compiled = compile(vec![node(div)]);

        let create = guarded(compiled.function.as_ref().unwrap(), 1.0).unwrap();
        assert_eq!(
            instruction_names(create),
            vec!["ɵɵelementStart", "ɵɵdisableBindings", "ɵɵelement", "ɵɵenableBindings", "ɵɵelementEnd"]
        );
        assert_args(calls_to(create, "ɵɵelementStart")[0], &[o::literal(0usize), o::literal("div")]);
        assert!(compiled.consts.is_empty());
    }

    #[test]
    fn content_selector_is_not_a_projection_attribute() {
        let content = t::R3Node::Content(t::Content {
            selector: "*".to_string(),
            attributes: vec![
                t::TextAttribute::new("select", "*", span()),
                t::TextAttribute::new("title", "slot", span()),
            ],
            children: vec![],
            source_span: span(),
            i18n: None,
        });
        let compiled = compile(vec![content]);

        let create = guarded(compiled.function.as_ref().unwrap(), 1.0).unwrap();
        assert_eq!(instruction_names(create), vec!["ɵɵprojectionDef", "ɵɵprojection"]);
        let attributes = o::literal_arr(vec![o::literal("title"), o::literal("slot")]);
        assert_args(calls_to(create, "ɵɵprojection")[0], &[o::literal(0usize), o::literal(0usize), attributes]);
        assert!(compiled.consts.is_empty());
    }

    #[test]
    fn repeated_class_attribute_keeps_the_last_value() {
        let mut div = element("div", vec![]);
        div.attributes.push(t::TextAttribute::new("class", "first", span()));
        div.attributes.push(t::TextAttribute::new("class", "second", span()));
        let compiled = compile(vec![node(div)]);

        assert_eq!(compiled.consts.len(), 1);
        let expected = o::literal_arr(vec![o::literal(1usize), o::literal("second")]);
        assert!(compiled.consts[0].is_equivalent(&expected));
    }

    #[test]
    fn compilation_is_deterministic() {
        let template = || {
            let mut div = element("div", vec![interpolated_read("y")]);
            div.inputs.push(bound("title", t::BindingType::Property, AST::array(vec![AST::read("x")])));
            vec![node(div), if_block("cond", vec![text("shown")])]
        };
        let first = compile(template());
        let second = compile(template());
        assert_eq!(format!("{:?}", first.function), format!("{:?}", second.function));
        assert_eq!(format!("{:?}", first.statements), format!("{:?}", second.statements));
        assert_eq!(format!("{:?}", first.consts), format!("{:?}", second.consts));
    }
}
