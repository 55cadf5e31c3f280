/**
 * Transformation Tests
 *
 * The full pass list run over ingested jobs, checked on the reified op lists.
 */

#[path = "util.rs"]
mod util;

#[cfg(test)]
mod tests {
    use super::util::*;
    use indexmap::IndexMap;
    use template_pipeline::config::PipelineConfig;
    use template_pipeline::constant_pool::ConstantPool;
    use template_pipeline::expression_parser::AST;
    use template_pipeline::output::output_ast::{self as o, Statement};
    use template_pipeline::render3::r3_ast as t;
    use template_pipeline::template::pipeline::ir::{CreateOp, UpdateOp};
    use template_pipeline::template::pipeline::src::{
        ingest_component, ingest_host_binding, transform, CompilationJob, DeferMetadata, HostBindingInput,
    };

    fn compile(nodes: Vec<t::R3Node>) -> CompilationJob {
        init_logging();
        let mut job =
            ingest_component("Cmp", &nodes, ConstantPool::new(), PipelineConfig::default(), DeferMetadata::None)
                .unwrap();
        transform(&mut job).unwrap();
        job
    }

    fn create_statements(job: &CompilationJob) -> Vec<Statement> {
        job.root_unit()
            .create
            .iter()
            .map(|op| match op {
                CreateOp::Statement(stmt) => stmt.statement.clone(),
                other => panic!("unreified create op {other:?}"),
            })
            .collect()
    }

    fn update_statements(job: &CompilationJob) -> Vec<Statement> {
        job.root_unit()
            .update
            .iter()
            .map(|op| match op {
                UpdateOp::Statement(stmt) => stmt.statement.clone(),
                other => panic!("unreified update op {other:?}"),
            })
            .collect()
    }

    fn titled(name: &str, value: AST) -> t::R3Node {
        let mut el = element(name, vec![]);
        el.inputs.push(bound("title", t::BindingType::Property, value));
        node(el)
    }

    fn call_args(stmt: &Statement) -> &[o::Expression] {
        let Statement::Expression(stmt) = stmt else { panic!("expected an expression statement") };
        let o::Expression::InvokeFn(call) = &*stmt.expr else { panic!("expected a call") };
        &call.args
    }

    #[test]
    fn only_statements_remain_after_transform() {
        let for_loop = t::ForLoopBlock {
            item: t::Variable::new("item", "$implicit", span()),
            expression: AST::read("items"),
            track_by: AST::read("item").prop("id"),
            context_variables: vec![t::Variable::new("$index", "$index", span())],
            children: vec![interpolated_read("item")],
            empty: None,
            block: t::BlockNode::new(span()),
            main_block_span: span(),
            i18n: None,
        };
        let mut button = element("button", vec![text("go")]);
        button.outputs.push(t::BoundEvent::new(
            "click",
            t::ParsedEventType::Regular,
            AST::read("save").call(vec![]),
            span(),
        ));
        let if_block = t::IfBlock {
            branches: vec![t::IfBlockBranch {
                expression: Some(AST::read("visible")),
                children: vec![interpolated_read("label")],
                expression_alias: None,
                block: t::BlockNode::new(span()),
                i18n: None,
            }],
            block: t::BlockNode::new(span()),
        };
        let job = compile(vec![
            titled("div", AST::read("a")),
            node(button),
            t::R3Node::IfBlock(if_block),
            t::R3Node::ForLoopBlock(for_loop),
        ]);

        for unit in job.units() {
            assert!(unit.fn_name.is_some());
            assert!(unit.create.iter().all(|op| matches!(op, CreateOp::Statement(_))));
            assert!(unit.update.iter().all(|op| matches!(op, UpdateOp::Statement(_))));
        }
        let create = create_statements(&job);
        let names = instruction_names(&create);
        assert!(names.contains(&"ɵɵlistener"));
        assert!(names.contains(&"ɵɵconditionalCreate"));
        assert!(names.contains(&"ɵɵrepeaterCreate"));
        let update = update_statements(&job);
        let names = instruction_names(&update);
        assert!(names.contains(&"ɵɵconditional"));
        assert!(names.contains(&"ɵɵrepeater"));
    }

    #[test]
    fn advances_skip_to_the_bound_slot() {
        let job = compile(vec![
            titled("div", AST::read("a")),
            titled("div", AST::read("b")),
            node(element("div", vec![])),
            node(element("div", vec![])),
            titled("div", AST::read("c")),
        ]);

        let update = update_statements(&job);
        assert_eq!(
            instruction_names(&update),
            vec!["ɵɵproperty", "ɵɵadvance", "ɵɵproperty", "ɵɵadvance", "ɵɵproperty"]
        );
        assert!(call_args(&update[1]).is_empty());
        let delta = call_args(&update[3]);
        assert_eq!(delta.len(), 1);
        assert!(delta[0].is_equivalent(&o::literal(3usize)));
    }

    #[test]
    fn equal_literal_shapes_share_a_pure_function() {
        let job = compile(vec![
            titled("div", AST::array(vec![AST::read("a")])),
            titled("div", AST::array(vec![AST::read("b")])),
        ]);

        let update = update_statements(&job);
        assert_eq!(instruction_names(&update), vec!["ɵɵproperty", "ɵɵadvance", "ɵɵproperty"]);
        let declarations: Vec<_> = job
            .pool
            .statements()
            .into_iter()
            .filter(|stmt| matches!(stmt, Statement::DeclareVar(_)))
            .collect();
        assert_eq!(declarations.len(), 1);
    }

    #[test]
    fn root_view_is_named_after_the_component() {
        let job = compile(vec![node(element("div", vec![]))]);
        assert_eq!(job.root_unit().fn_name.as_deref(), Some("Cmp_Template"));
        assert_eq!(job.root_unit().decls, Some(1));
        assert_eq!(job.root_unit().vars, Some(0));
    }

    #[test]
    fn host_bindings_reify_to_dom_instructions() {
        let input = HostBindingInput {
            component_name: "Dir".to_string(),
            properties: vec![bound("id", t::BindingType::Property, AST::read("hostId"))],
            attributes: IndexMap::new(),
            events: vec![t::BoundEvent::new(
                "click",
                t::ParsedEventType::Regular,
                AST::read("onClick").call(vec![]),
                span(),
            )],
            source_span: span(),
        };
        let mut job = ingest_host_binding(&input, ConstantPool::new(), PipelineConfig::default()).unwrap();
        transform(&mut job).unwrap();

        assert_eq!(job.root_unit().fn_name.as_deref(), Some("Dir_HostBindings"));
        assert_eq!(instruction_names(&create_statements(&job)), vec!["ɵɵlistener"]);
        assert_eq!(instruction_names(&update_statements(&job)), vec!["ɵɵdomProperty"]);
    }

    #[test]
    fn transform_is_deterministic() {
        let template = || {
            vec![
                titled("div", AST::array(vec![AST::read("a")])),
                node(element("span", vec![interpolated_read("b")])),
            ]
        };
        let first = compile(template());
        let second = compile(template());
        assert_eq!(format!("{:?}", create_statements(&first)), format!("{:?}", create_statements(&second)));
        assert_eq!(format!("{:?}", update_statements(&first)), format!("{:?}", update_statements(&second)));
        assert_eq!(format!("{:?}", first.pool.statements()), format!("{:?}", second.pool.statements()));
    }
}
