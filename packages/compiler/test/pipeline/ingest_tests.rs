/**
 * Ingestion Tests
 *
 * Template ASTs lowered into create and update op lists.
 */

#[path = "util.rs"]
mod util;

#[cfg(test)]
mod tests {
    use super::util::*;
    use template_pipeline::config::PipelineConfig;
    use template_pipeline::constant_pool::ConstantPool;
    use template_pipeline::expression_parser::AST;
    use template_pipeline::render3::r3_ast as t;
    use template_pipeline::template::pipeline::ir::{
        BindingKind, CreateOp, DeferOpModifierKind, Op, OpKind, UpdateOp, XrefId,
    };
    use template_pipeline::template::pipeline::src::{ingest_component, CompilationJob, DeferMetadata};

    fn ingest(nodes: Vec<t::R3Node>) -> CompilationJob {
        init_logging();
        ingest_component("Cmp", &nodes, ConstantPool::new(), PipelineConfig::default(), DeferMetadata::None)
            .expect("ingestion succeeds")
    }

    fn create_kinds(job: &CompilationJob, view: XrefId) -> Vec<OpKind> {
        job.view(view).unwrap().create.iter().map(|op| op.kind()).collect()
    }

    fn update_kinds(job: &CompilationJob, view: XrefId) -> Vec<OpKind> {
        job.view(view).unwrap().update.iter().map(|op| op.kind()).collect()
    }

    #[test]
    fn element_with_class_binding_and_interpolation() {
        let mut div = element("div", vec![interpolated_read("y")]);
        div.inputs.push(bound("a", t::BindingType::Class, AST::read("x")));
        let job = ingest(vec![node(div)]);

        assert_eq!(
            create_kinds(&job, job.root),
            vec![OpKind::ElementStart, OpKind::Text, OpKind::ElementEnd]
        );
        assert_eq!(update_kinds(&job, job.root), vec![OpKind::Binding, OpKind::InterpolateText]);

        let root = job.root_unit();
        let Some(CreateOp::ElementStart(start)) = root.create.iter().next() else {
            panic!("expected the element to open first")
        };
        assert_eq!(start.tag, "div");
        let Some(UpdateOp::Binding(binding)) = root.update.iter().next() else {
            panic!("expected the class binding first")
        };
        assert_eq!(binding.kind, BindingKind::ClassName);
        assert_eq!(binding.name, "a");
        assert_eq!(binding.target, start.xref);
    }

    #[test]
    fn static_text_needs_no_update() {
        let job = ingest(vec![node(element("p", vec![text("hello")]))]);
        let root = job.root_unit();
        assert!(root.update.is_empty());
        let texts: Vec<&str> = root
            .create
            .iter()
            .filter_map(|op| match op {
                CreateOp::Text(text) => Some(text.initial_value.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["hello"]);
    }

    #[test]
    fn if_blocks_create_one_view_per_branch() {
        let branch = |expression: Option<AST>| t::IfBlockBranch {
            expression,
            children: vec![text("branch")],
            expression_alias: None,
            block: t::BlockNode::new(span()),
            i18n: None,
        };
        let if_block = t::IfBlock {
            branches: vec![branch(Some(AST::read("cond"))), branch(None)],
            block: t::BlockNode::new(span()),
        };
        let job = ingest(vec![t::R3Node::IfBlock(if_block)]);

        assert_eq!(job.view_xrefs().len(), 3);
        assert_eq!(
            create_kinds(&job, job.root),
            vec![OpKind::ConditionalCreate, OpKind::ConditionalBranchCreate]
        );
        assert_eq!(update_kinds(&job, job.root), vec![OpKind::Conditional]);
        for xref in job.view_xrefs().into_iter().skip(1) {
            assert_eq!(job.view(xref).unwrap().parent, Some(job.root));
            assert_eq!(create_kinds(&job, xref), vec![OpKind::Text]);
        }
    }

    #[test]
    fn duplicate_triggers_report_once_and_keep_one() {
        let mut deferred = t::DeferredBlock::new(vec![], span());
        deferred.triggers = vec![on("idle", &[]), on("idle", &[])];
        let job = ingest(vec![t::R3Node::DeferredBlock(deferred)]);

        assert_eq!(job.errors.len(), 1);
        assert!(job.errors[0].msg.contains("Duplicate \"idle\" trigger"));
        let defer_ons = job
            .root_unit()
            .create
            .iter()
            .filter(|op| op.kind() == OpKind::DeferOn)
            .count();
        assert_eq!(defer_ons, 1);
    }

    #[test]
    fn prefetch_only_blocks_get_an_implicit_idle_trigger() {
        let mut deferred = t::DeferredBlock::new(vec![], span());
        deferred.prefetch_triggers = vec![on("idle", &[])];
        let job = ingest(vec![t::R3Node::DeferredBlock(deferred)]);

        assert!(job.errors.is_empty());
        let modifiers: Vec<_> = job
            .root_unit()
            .create
            .iter()
            .filter_map(|op| match op {
                CreateOp::DeferOn(on) => Some(on.modifier),
                _ => None,
            })
            .collect();
        assert_eq!(modifiers.len(), 2);
        assert!(modifiers.contains(&DeferOpModifierKind::Prefetch));
        assert!(modifiers.contains(&DeferOpModifierKind::None));
    }

    #[test]
    fn let_declarations_declare_and_store() {
        let decl = t::LetDeclaration {
            name: "total".to_string(),
            value: AST::binary("+", AST::read("a"), AST::read("b")),
            source_span: span(),
            name_span: span(),
            value_span: span(),
        };
        let job = ingest(vec![t::R3Node::LetDeclaration(decl)]);
        assert_eq!(create_kinds(&job, job.root), vec![OpKind::DeclareLet]);
        assert_eq!(update_kinds(&job, job.root), vec![OpKind::StoreLet]);
    }

    #[test]
    fn ingestion_is_deterministic() {
        let template = || {
            let mut div = element("div", vec![interpolated_read("y")]);
            div.inputs.push(bound("title", t::BindingType::Property, AST::read("x")));
            vec![node(div), node(element("span", vec![text("z")]))]
        };
        let first = ingest(template());
        let second = ingest(template());

        let ops = |job: &CompilationJob| {
            let root = job.root_unit();
            let create: Vec<String> = root.create.iter().map(|op| format!("{op:?}")).collect();
            let update: Vec<String> = root.update.iter().map(|op| format!("{op:?}")).collect();
            (create, update)
        };
        let (create, update) = ops(&first);
        assert_eq!(create.len(), 6);
        assert_eq!(update.len(), 2);
        assert_eq!(ops(&first), ops(&second));
        assert_eq!(format!("{:?}", first.root_unit()), format!("{:?}", second.root_unit()));
    }
}
