//! Ingest Module
//!
//! Converts R3 AST nodes into IR operations. Every node appends ops to the view it is
//! ingested into; nodes that introduce a new scope allocate a child view first and ingest
//! their children there.

use indexmap::IndexMap;
use log::debug;

use crate::config::PipelineConfig;
use crate::constant_pool::ConstantPool;
use crate::core::SecurityContext;
use crate::error::{invariant, CompilerError, Result};
use crate::expression_parser::ast::AST;
use crate::output::output_ast as o;
use crate::parse_util::{ParseError, ParseSourceSpan};
use crate::render3::r3_ast as t;
use crate::render3::r3_deferred_triggers::{resolve_triggers, DeferredBlockTriggers, DeferredTrigger};
use crate::schema::{DomElementSchemaRegistry, ElementSchemaRegistry};
use crate::template::pipeline::ir::{
    self, BindingExpression, BindingKind, ConditionalCaseExpr, CreateOp, DeferOpModifierKind,
    DeferTrigger, DeferTriggerTarget, Interpolation, LexicalReadExpr, LocalRef, Namespace,
    SlotHandle, TemplateKind, TwoWayBindingSetExpr, UpdateOp, XrefId,
};
use crate::template::pipeline::src::compilation::{CompilationJob, DeferMetadata};
use crate::template::pipeline::src::conversion::{
    convert_ast, convert_source_span, namespace_for_key, prefix_with_namespace, split_ns_name,
};

const DOM_SCHEMA: DomElementSchemaRegistry = DomElementSchemaRegistry;

/// Tag name of the `ng-template` element.
const NG_TEMPLATE_TAG_NAME: &str = "ng-template";
const NG_CONTENT_TAG: &str = "ng-content";

/// Where nodes are being ingested: the view, and the i18n block enclosing them (if any).
#[derive(Debug, Clone, Copy)]
struct Scope {
    view: XrefId,
    i18n_block: Option<XrefId>,
}

impl Scope {
    fn child(view: XrefId) -> Self {
        Scope {
            view,
            i18n_block: None,
        }
    }
}

/// Metadata of a directive's host bindings.
#[derive(Debug, Clone)]
pub struct HostBindingInput {
    pub component_name: String,
    /// `[prop]`, `[attr.x]`, `[class.x]` and `[style.x]` host bindings.
    pub properties: Vec<t::BoundAttribute>,
    /// Static host attributes.
    pub attributes: IndexMap<String, o::Expression>,
    pub events: Vec<t::BoundEvent>,
    /// Span of the host metadata, used for ops that have no better location.
    pub source_span: ParseSourceSpan,
}

/// Process a template AST and convert it into a `CompilationJob` in the intermediate
/// representation.
pub fn ingest_component(
    component_name: &str,
    template: &[t::R3Node],
    constant_pool: ConstantPool,
    config: PipelineConfig,
    defer_meta: DeferMetadata,
) -> Result<CompilationJob> {
    let mut job = CompilationJob::component(component_name, constant_pool, config);
    job.defer_meta = defer_meta;
    let root = Scope::child(job.root);
    ingest_nodes(&mut job, root, template)?;
    debug!(
        "ingested template of {} into {} views",
        component_name,
        job.view_xrefs().len()
    );
    Ok(job)
}

/// Process a host binding AST and convert it into a `CompilationJob` of kind `Host`.
pub fn ingest_host_binding(
    input: &HostBindingInput,
    constant_pool: ConstantPool,
    config: PipelineConfig,
) -> Result<CompilationJob> {
    let mut job = CompilationJob::host_binding(input.component_name.clone(), constant_pool, config);
    for property in &input.properties {
        ingest_dom_property(&mut job, property)?;
    }
    for (name, expr) in &input.attributes {
        ingest_host_attribute(&mut job, name, expr.clone(), &input.source_span);
    }
    for event in &input.events {
        ingest_host_event(&mut job, event)?;
    }
    Ok(job)
}

fn ingest_dom_property(job: &mut CompilationJob, property: &t::BoundAttribute) -> Result<()> {
    let (kind, name, unit) = match property.type_ {
        t::BindingType::Property => host_property_kind(&property.name),
        other => (binding_kind_for(other), property.name.clone(), property.unit.clone()),
    };
    let security_context = match kind {
        BindingKind::Property | BindingKind::Attribute => {
            DOM_SCHEMA.security_context("*", &name, kind == BindingKind::Attribute)
        }
        _ => SecurityContext::NONE,
    };
    let expression = convert_ast_with_interpolation(job, &property.value, None)?;
    let root = job.root;
    job.root_unit_mut().update.push(ir::create_binding_op(
        root,
        kind,
        name,
        expression,
        unit.or_else(|| property.unit.clone()),
        security_context,
        false,
        false,
        None,
        property.source_span.clone(),
    ));
    Ok(())
}

/// Host attribute and animation bindings carry their kind as a prefix. `class.` and `style.`
/// names stay properties until `parse_host_style_properties`.
fn host_property_kind(name: &str) -> (BindingKind, String, Option<String>) {
    if let Some(attr) = name.strip_prefix("attr.") {
        return (BindingKind::Attribute, attr.to_string(), None);
    }
    if name.starts_with('@') {
        return (BindingKind::Animation, name.to_string(), None);
    }
    (BindingKind::Property, name.to_string(), None)
}

fn ingest_host_attribute(job: &mut CompilationJob, name: &str, value: o::Expression, fallback_span: &ParseSourceSpan) {
    let security_context = DOM_SCHEMA.security_context("*", name, true);
    let source_span = value.source_span().cloned().unwrap_or_else(|| fallback_span.clone());
    let root = job.root;
    job.root_unit_mut().update.push(ir::create_binding_op(
        root,
        BindingKind::Attribute,
        name,
        BindingExpression::Expression(value),
        None,
        security_context,
        true,
        false,
        None,
        source_span,
    ));
}

fn ingest_host_event(job: &mut CompilationJob, event: &t::BoundEvent) -> Result<()> {
    let handler_ops = make_listener_handler_ops(job, &event.handler, &event.handler_span)?;
    let root = job.root;
    let listener = ir::create_listener_op(
        root,
        event.name.clone(),
        None,
        handler_ops,
        true,
        event.target.clone(),
        event.source_span.clone(),
    );
    job.root_unit_mut().create.push(CreateOp::Listener(listener));
    Ok(())
}

/// Ingest the nodes of a template AST into the given view.
fn ingest_nodes(job: &mut CompilationJob, scope: Scope, template: &[t::R3Node]) -> Result<()> {
    for node in template {
        match node {
            t::R3Node::Element(el) => ingest_element(job, scope, el)?,
            t::R3Node::Template(tmpl) => ingest_template(job, scope, tmpl)?,
            t::R3Node::Content(content) => ingest_content(job, scope, content)?,
            t::R3Node::Text(text) => ingest_text(job, scope, text)?,
            t::R3Node::BoundText(text) => ingest_bound_text(job, scope, text)?,
            t::R3Node::IfBlock(block) => ingest_if_block(job, scope, block)?,
            t::R3Node::SwitchBlock(block) => ingest_switch_block(job, scope, block)?,
            t::R3Node::DeferredBlock(block) => ingest_defer_block(job, scope, block)?,
            t::R3Node::Icu(icu) => ingest_icu(job, scope, icu)?,
            t::R3Node::ForLoopBlock(block) => ingest_for_block(job, scope, block)?,
            t::R3Node::LetDeclaration(decl) => ingest_let_declaration(job, scope, decl)?,
            t::R3Node::Comment(_) | t::R3Node::UnknownBlock(_) | t::R3Node::Component(_) => {
                return Err(CompilerError::UnsupportedNode(node.kind_name().to_string()));
            }
        }
    }
    Ok(())
}

fn push_create(job: &mut CompilationJob, view: XrefId, op: CreateOp) -> Result<()> {
    job.view_mut(view)?.create.push(op);
    Ok(())
}

fn push_update(job: &mut CompilationJob, view: XrefId, op: UpdateOp) -> Result<()> {
    job.view_mut(view)?.update.push(op);
    Ok(())
}

/// Ingest an element AST from the template into the given view.
fn ingest_element(job: &mut CompilationJob, scope: Scope, element: &t::Element) -> Result<()> {
    let id = job.allocate_xref_id();
    let (namespace_key, element_name) = split_ns_name(&element.name)?;

    let mut start_op = ir::create_element_start_op(
        element_name,
        id,
        namespace_for_key(namespace_key),
        element.start_source_span.clone(),
        element.source_span.clone(),
    );
    start_op.local_refs = local_refs(&element.references);
    push_create(job, scope.view, CreateOp::ElementStart(start_op))?;

    ingest_element_bindings(job, scope.view, id, element_name, element)?;
    ingest_element_events(job, scope.view, id, element_name, &element.outputs)?;

    // Translated elements wrap their children in an i18n block.
    let mut child_scope = scope;
    let i18n_block = match &element.i18n {
        Some(meta) => {
            let block = job.allocate_xref_id();
            push_create(
                job,
                scope.view,
                CreateOp::I18nStart(ir::I18nStartOp {
                    xref: block,
                    handle: SlotHandle::new(block),
                    root: block,
                    message: meta.message.clone(),
                    message_index: None,
                    source_span: element.start_source_span.clone(),
                }),
            )?;
            child_scope.i18n_block = Some(block);
            Some(block)
        }
        None => None,
    };

    ingest_nodes(job, child_scope, &element.children)?;

    if let Some(block) = i18n_block {
        push_create(
            job,
            scope.view,
            CreateOp::I18nEnd(ir::I18nEndOp {
                xref: block,
                source_span: element.end_source_span.clone(),
            }),
        )?;
        apply_i18n_expressions(job, scope.view, block, &element.source_span)?;
    }

    // Void elements have no end tag, so the end op reuses the start tag's location.
    let end_span = element
        .end_source_span
        .clone()
        .unwrap_or_else(|| element.start_source_span.clone());
    push_create(job, scope.view, CreateOp::ElementEnd(ir::create_element_end_op(id, Some(end_span))))
}

/// Expressions collected inside an i18n block are applied once, after the block closes.
fn apply_i18n_expressions(job: &mut CompilationJob, view: XrefId, block: XrefId, span: &ParseSourceSpan) -> Result<()> {
    let has_expressions = job
        .view(view)?
        .update
        .iter()
        .any(|op| matches!(op, UpdateOp::I18nExpression(expr) if expr.target == block));
    if has_expressions {
        push_update(job, view, ir::create_i18n_apply_op(block, span.clone()))?;
    }
    Ok(())
}

fn local_refs(references: &[t::Reference]) -> Vec<LocalRef> {
    references
        .iter()
        .map(|r| LocalRef {
            name: r.name.clone(),
            target: r.value.clone(),
        })
        .collect()
}

/// Ingest an `ng-template` node from the AST into the given view.
fn ingest_template(job: &mut CompilationJob, scope: Scope, tmpl: &t::Template) -> Result<()> {
    let child_view = job.allocate_view(scope.view);

    let tag_name = tmpl.tag_name.as_deref().unwrap_or(NG_TEMPLATE_TAG_NAME);
    let (namespace_prefix, tag_name_without_namespace) = split_ns_name(tag_name)?;
    let namespace = namespace_for_key(namespace_prefix);
    let fn_name_suffix = prefix_with_namespace(tag_name_without_namespace, namespace);
    let template_kind = if tag_name_without_namespace == NG_TEMPLATE_TAG_NAME {
        TemplateKind::NgTemplate
    } else {
        TemplateKind::Structural
    };

    let mut template_op = ir::create_template_op(
        child_view,
        template_kind,
        Some(tag_name_without_namespace.to_string()),
        fn_name_suffix,
        namespace,
        tmpl.start_source_span.clone(),
        tmpl.source_span.clone(),
    );
    template_op.local_refs = local_refs(&tmpl.references);
    push_create(job, scope.view, CreateOp::Template(template_op))?;

    ingest_template_bindings(job, scope.view, child_view, tag_name_without_namespace, tmpl, template_kind)?;
    ingest_nodes(job, Scope::child(child_view), &tmpl.children)?;

    let unit = job.view_mut(child_view)?;
    for variable in &tmpl.variables {
        let value = if variable.value.is_empty() {
            "$implicit".to_string()
        } else {
            variable.value.clone()
        };
        unit.context_variables.insert(variable.name.clone(), value);
    }
    Ok(())
}

/// Ingest a content node (`<ng-content>`) from the AST into the given view.
fn ingest_content(job: &mut CompilationJob, scope: Scope, content: &t::Content) -> Result<()> {
    let has_fallback = content.children.iter().any(|child| match child {
        t::R3Node::Comment(_) => false,
        t::R3Node::Text(text) => !text.value.trim().is_empty(),
        _ => true,
    });
    let fallback_view = if has_fallback {
        let view = job.allocate_view(scope.view);
        ingest_nodes(job, Scope::child(view), &content.children)?;
        Some(view)
    } else {
        None
    };

    let id = job.allocate_xref_id();
    let op = ir::ProjectionOp {
        xref: id,
        handle: SlotHandle::new(id),
        projection_slot_index: 0,
        attributes: None,
        selector: content.selector.clone(),
        fallback_view,
        fallback_decls: None,
        fallback_vars: None,
        source_span: content.source_span.clone(),
    };
    push_create(job, scope.view, CreateOp::Projection(op))?;

    let bindings: Vec<UpdateOp> = content
        .attributes
        .iter()
        .map(|attr| {
            ir::create_binding_op(
                id,
                BindingKind::Attribute,
                attr.name.clone(),
                BindingExpression::Expression(o::literal(attr.value.clone())),
                None,
                DOM_SCHEMA.security_context(NG_CONTENT_TAG, &attr.name, true),
                true,
                false,
                None,
                attr.source_span.clone(),
            )
        })
        .collect();
    job.view_mut(scope.view)?.update.push_all(bindings);
    Ok(())
}

/// Ingest a literal text node from the AST into the given view.
fn ingest_text(job: &mut CompilationJob, scope: Scope, text: &t::Text) -> Result<()> {
    let xref = job.allocate_xref_id();
    push_create(
        job,
        scope.view,
        ir::create_text_op(xref, text.value.clone(), Some(text.source_span.clone())),
    )
}

/// Ingest an interpolated text node from the AST into the given view.
fn ingest_bound_text(job: &mut CompilationJob, scope: Scope, text: &t::BoundText) -> Result<()> {
    let (strings, expressions) = match &text.value {
        AST::Interpolation(interp) => (interp.strings.clone(), interp.expressions.clone()),
        other => (vec![String::new(), String::new()], vec![other.clone()]),
    };

    let mut i18n_placeholders = text.i18n_placeholders.clone();
    if !i18n_placeholders.is_empty() && i18n_placeholders.len() != expressions.len() {
        job.report(ParseError::new(
            text.source_span.clone(),
            format!(
                "Unexpected number of i18n placeholders ({}) for BoundText with {} expressions",
                i18n_placeholders.len(),
                expressions.len()
            ),
        ));
        i18n_placeholders.clear();
    }

    let text_xref = job.allocate_xref_id();
    push_create(job, scope.view, ir::create_text_op(text_xref, "", Some(text.source_span.clone())))?;

    let base_source_span = match job.compatibility {
        ir::CompatibilityMode::TemplateDefinitionBuilder => None,
        ir::CompatibilityMode::Full => Some(&text.source_span),
    };
    let converted = expressions
        .iter()
        .map(|expr| convert_ast(expr, job, base_source_span))
        .collect::<Result<Vec<_>>>()?;
    push_update(
        job,
        scope.view,
        ir::create_interpolate_text_op(
            text_xref,
            Interpolation::new(strings, converted, i18n_placeholders),
            text.source_span.clone(),
        ),
    )
}

/// Ingest an `@if` block into the given view.
fn ingest_if_block(job: &mut CompilationJob, scope: Scope, if_block: &t::IfBlock) -> Result<()> {
    let mut first_xref = None;
    let mut conditions = Vec::with_capacity(if_block.branches.len());

    for branch in &if_block.branches {
        let c_view = job.allocate_view(scope.view);
        let tag_name = ingest_control_flow_insertion_point(job, scope.view, c_view, &branch.children)?;

        if let Some(alias) = &branch.expression_alias {
            job.view_mut(c_view)?
                .context_variables
                .insert(alias.name.clone(), ir::CTX_REF.to_string());
        }

        let template_op = ir::create_template_op(
            c_view,
            TemplateKind::Block,
            tag_name,
            "Conditional",
            Namespace::HTML,
            branch.block.start_source_span.clone(),
            branch.block.source_span.clone(),
        );
        let op = if first_xref.is_none() {
            first_xref = Some(c_view);
            CreateOp::ConditionalCreate(template_op)
        } else {
            CreateOp::ConditionalBranchCreate(template_op)
        };
        push_create(job, scope.view, op)?;

        let case_expr = branch
            .expression
            .as_ref()
            .map(|expr| convert_ast(expr, job, None))
            .transpose()?;
        conditions.push(ConditionalCaseExpr::new(
            case_expr,
            c_view,
            branch.expression_alias.as_ref().map(|alias| alias.name.clone()),
        ));

        ingest_nodes(job, Scope::child(c_view), &branch.children)?;
    }

    let Some(first_xref) = first_xref else {
        return Ok(());
    };
    push_update(
        job,
        scope.view,
        ir::create_conditional_op(first_xref, None, conditions, if_block.block.source_span.clone()),
    )
}

/// Ingest a `@switch` block into the given view.
fn ingest_switch_block(job: &mut CompilationJob, scope: Scope, switch_block: &t::SwitchBlock) -> Result<()> {
    // Don't ingest empty switches since they won't render anything.
    if switch_block.cases.is_empty() {
        return Ok(());
    }

    let mut first_xref = None;
    let mut conditions = Vec::with_capacity(switch_block.cases.len());
    for case in &switch_block.cases {
        let c_view = job.allocate_view(scope.view);
        let tag_name = ingest_control_flow_insertion_point(job, scope.view, c_view, &case.children)?;

        let template_op = ir::create_template_op(
            c_view,
            TemplateKind::Block,
            tag_name,
            "Case",
            Namespace::HTML,
            case.block.start_source_span.clone(),
            case.block.source_span.clone(),
        );
        let op = if first_xref.is_none() {
            first_xref = Some(c_view);
            CreateOp::ConditionalCreate(template_op)
        } else {
            CreateOp::ConditionalBranchCreate(template_op)
        };
        push_create(job, scope.view, op)?;

        let case_expr = case
            .expression
            .as_ref()
            .map(|expr| convert_ast(expr, job, Some(&switch_block.block.start_source_span)))
            .transpose()?;
        conditions.push(ConditionalCaseExpr::new(case_expr, c_view, None));

        ingest_nodes(job, Scope::child(c_view), &case.children)?;
    }

    let test = convert_ast(&switch_block.expression, job, None)?;
    let first_xref = match first_xref {
        Some(xref) => xref,
        None => return invariant("switch block with cases produced no views"),
    };
    push_update(
        job,
        scope.view,
        ir::create_conditional_op(first_xref, Some(test), conditions, switch_block.block.source_span.clone()),
    )
}

/// Ingests one secondary view of a `@defer` block and declares it with a `Block` template.
fn ingest_defer_view(
    job: &mut CompilationJob,
    scope: Scope,
    suffix: &str,
    children: &[t::R3Node],
    source_span: &ParseSourceSpan,
) -> Result<XrefId> {
    let secondary_view = job.allocate_view(scope.view);
    ingest_nodes(job, Scope::child(secondary_view), children)?;
    let template_op = ir::create_template_op(
        secondary_view,
        TemplateKind::Block,
        None,
        format!("Defer{}", suffix),
        Namespace::HTML,
        source_span.clone(),
        source_span.clone(),
    );
    push_create(job, scope.view, CreateOp::Template(template_op))?;
    Ok(secondary_view)
}

/// Ingest a `@defer` block, its secondary views and all of its triggers.
fn ingest_defer_block(job: &mut CompilationJob, scope: Scope, deferred: &t::DeferredBlock) -> Result<()> {
    let main = ingest_defer_view(job, scope, "", &deferred.children, &deferred.block.source_span)?;
    let loading = deferred
        .loading
        .as_ref()
        .map(|l| ingest_defer_view(job, scope, "Loading", &l.children, &l.block.source_span))
        .transpose()?;
    let placeholder = deferred
        .placeholder
        .as_ref()
        .map(|p| ingest_defer_view(job, scope, "Placeholder", &p.children, &p.block.source_span))
        .transpose()?;
    let error = deferred
        .error
        .as_ref()
        .map(|e| ingest_defer_view(job, scope, "Error", &e.children, &e.block.source_span))
        .transpose()?;

    let mut errors = Vec::new();
    let triggers = resolve_triggers(&deferred.triggers, false, &mut errors);
    let prefetch_triggers = resolve_triggers(&deferred.prefetch_triggers, false, &mut errors);
    let hydrate_triggers = resolve_triggers(&deferred.hydrate_triggers, true, &mut errors);
    for error in errors {
        job.report(error);
    }

    let defer_xref = job.allocate_xref_id();
    let defer_op = ir::DeferOp {
        xref: defer_xref,
        handle: SlotHandle::new(defer_xref),
        main_view: main,
        main_slot: SlotHandle::new(main),
        loading_view: loading,
        loading_slot: loading.map(SlotHandle::new),
        placeholder_view: placeholder,
        placeholder_slot: placeholder.map(SlotHandle::new),
        error_view: error,
        error_slot: error.map(SlotHandle::new),
        loading_minimum_time: deferred.loading.as_ref().and_then(|l| l.minimum_time),
        loading_after_time: deferred.loading.as_ref().and_then(|l| l.after_time),
        placeholder_minimum_time: deferred.placeholder.as_ref().and_then(|p| p.minimum_time),
        loading_config: None,
        placeholder_config: None,
        resolver_fn: job.defer_deps_fn(deferred.block.source_span.start.offset),
        flags: if hydrate_triggers.is_empty() {
            crate::core::TDeferDetailsFlags::Default
        } else {
            crate::core::TDeferDetailsFlags::HasHydrateTriggers
        },
        source_span: deferred.block.source_span.clone(),
    };
    push_create(job, scope.view, CreateOp::Defer(defer_op))?;

    let mut on_ops = Vec::new();
    let mut when_ops = Vec::new();
    // Hydrate triggers go first: during hydration they schedule the others.
    for (modifier, group) in [
        (DeferOpModifierKind::Hydrate, &hydrate_triggers),
        (DeferOpModifierKind::None, &triggers),
        (DeferOpModifierKind::Prefetch, &prefetch_triggers),
    ] {
        ingest_defer_triggers(job, modifier, group, defer_xref, &mut on_ops, &mut when_ops)?;
    }

    let has_concrete_trigger = on_ops
        .iter()
        .any(|op| matches!(op, CreateOp::DeferOn(on) if on.modifier == DeferOpModifierKind::None))
        || when_ops
            .iter()
            .any(|op| matches!(op, UpdateOp::DeferWhen(when) if when.modifier == DeferOpModifierKind::None));
    if !has_concrete_trigger {
        on_ops.push(ir::create_defer_on_op(
            defer_xref,
            DeferTrigger::Idle,
            DeferOpModifierKind::None,
            deferred.block.source_span.clone(),
        ));
    }

    let unit = job.view_mut(scope.view)?;
    unit.create.push_all(on_ops);
    unit.update.push_all(when_ops);
    Ok(())
}

fn ingest_defer_triggers(
    job: &mut CompilationJob,
    modifier: DeferOpModifierKind,
    triggers: &DeferredBlockTriggers,
    defer_xref: XrefId,
    on_ops: &mut Vec<CreateOp>,
    when_ops: &mut Vec<UpdateOp>,
) -> Result<()> {
    for tracked in triggers.in_order() {
        let span = tracked.source_span.clone();
        let trigger = match &tracked.trigger {
            DeferredTrigger::When { value } => {
                let expr = convert_ast(value, job, Some(&span))?;
                when_ops.push(ir::create_defer_when_op(defer_xref, expr, modifier, span));
                continue;
            }
            DeferredTrigger::Idle => DeferTrigger::Idle,
            DeferredTrigger::Immediate => DeferTrigger::Immediate,
            DeferredTrigger::Never => DeferTrigger::Never,
            DeferredTrigger::Timer { delay } => DeferTrigger::Timer { delay: *delay },
            DeferredTrigger::Hover { reference } => DeferTrigger::Hover(DeferTriggerTarget::named(reference.clone())),
            DeferredTrigger::Interaction { reference } => {
                DeferTrigger::Interaction(DeferTriggerTarget::named(reference.clone()))
            }
            DeferredTrigger::Viewport { reference, options } => DeferTrigger::Viewport {
                target: DeferTriggerTarget::named(reference.clone()),
                options: options
                    .as_ref()
                    .map(|map| convert_ast(&AST::LiteralMap(map.clone()), job, Some(&span)))
                    .transpose()?,
            },
        };
        on_ops.push(ir::create_defer_on_op(defer_xref, trigger, modifier, span));
    }
    Ok(())
}

/// Ingest an ICU expression. Its variables and placeholders become expressions of the
/// enclosing i18n block.
fn ingest_icu(job: &mut CompilationJob, scope: Scope, icu: &t::Icu) -> Result<()> {
    let Some(block) = scope.i18n_block else {
        job.report(ParseError::new(
            icu.source_span.clone(),
            "ICU expressions are only supported inside an i18n block",
        ));
        return Ok(());
    };

    let xref = job.allocate_xref_id();
    push_create(
        job,
        scope.view,
        CreateOp::IcuStart(ir::IcuStartOp {
            xref,
            context: block,
            message_placeholder: icu.i18n.as_ref().map(|m| m.id.clone()).unwrap_or_default(),
            source_span: icu.source_span.clone(),
        }),
    )?;

    let bound = icu.vars.iter().chain(icu.placeholders.iter().filter_map(|(name, placeholder)| {
        match placeholder {
            t::IcuPlaceholder::BoundText(text) => Some((name, text)),
            t::IcuPlaceholder::Text(_) => None,
        }
    }));
    let mut ops = Vec::new();
    for (placeholder, text) in bound {
        let expressions: Vec<&AST> = match &text.value {
            AST::Interpolation(interp) => interp.expressions.iter().collect(),
            other => vec![other],
        };
        for expr in expressions {
            let converted = convert_ast(expr, job, None)?;
            ops.push(ir::create_i18n_expression_op(
                block,
                converted,
                placeholder.clone(),
                text.source_span.clone(),
            ));
        }
    }
    job.view_mut(scope.view)?.update.push_all(ops);
    push_create(job, scope.view, CreateOp::IcuEnd(ir::IcuEndOp { xref }))
}

/// The expression a derived `@for` variable (`$first`, `$odd`, ...) stands for.
fn get_computed_for_loop_variable_expression(
    variable: &t::Variable,
    index_name: &str,
    count_name: &str,
) -> Result<o::Expression> {
    let read = |name: &str| {
        o::Expression::LexicalRead(LexicalReadExpr {
            name: name.to_string(),
            source_span: None,
        })
    };
    let expr = match variable.value.as_str() {
        "$index" => read(index_name),
        "$count" => read(count_name),
        "$first" => read(index_name).identical(o::literal(0.0)),
        "$last" => read(index_name).identical(read(count_name).minus(o::literal(1.0))),
        "$even" => read(index_name).modulo(o::literal(2.0)).identical(o::literal(0.0)),
        "$odd" => read(index_name).modulo(o::literal(2.0)).not_identical(o::literal(0.0)),
        other => return invariant(format!("unknown @for loop variable {}", other)),
    };
    Ok(expr)
}

/// Picks the tag of the single root element of a control flow view, for content projection,
/// and copies its static attributes onto the view's template op.
fn ingest_control_flow_insertion_point(
    job: &mut CompilationJob,
    parent: XrefId,
    xref: XrefId,
    children: &[t::R3Node],
) -> Result<Option<String>> {
    let mut root = None;
    for child in children {
        match child {
            t::R3Node::Comment(_) | t::R3Node::LetDeclaration(_) => continue,
            _ if root.is_some() => return Ok(None),
            t::R3Node::Element(el) => root = Some((el.name.clone(), &el.attributes, &el.inputs)),
            t::R3Node::Template(tmpl) => match &tmpl.tag_name {
                Some(tag) => root = Some((tag.clone(), &tmpl.attributes, &tmpl.inputs)),
                None => return Ok(None),
            },
            _ => return Ok(None),
        }
    }
    let Some((tag_name, attributes, inputs)) = root else {
        return Ok(None);
    };

    for attr in attributes {
        let security_context = DOM_SCHEMA.security_context(NG_TEMPLATE_TAG_NAME, &attr.name, true);
        push_update(
            job,
            parent,
            ir::create_binding_op(
                xref,
                BindingKind::Attribute,
                attr.name.clone(),
                BindingExpression::Expression(o::literal(attr.value.clone())),
                None,
                security_context,
                true,
                false,
                None,
                attr.source_span.clone(),
            ),
        )?;
    }
    for input in inputs {
        if !matches!(input.type_, t::BindingType::Animation | t::BindingType::Attribute) {
            let security_context = DOM_SCHEMA.security_context(NG_TEMPLATE_TAG_NAME, &input.name, true);
            push_create(
                job,
                parent,
                ir::create_extracted_attribute_op(
                    xref,
                    BindingKind::Property,
                    None,
                    input.name.clone(),
                    None,
                    security_context,
                ),
            )?;
        }
    }

    Ok(if tag_name == NG_TEMPLATE_TAG_NAME {
        None
    } else {
        Some(tag_name)
    })
}

/// Ingest a `@for` block into the given view.
fn ingest_for_block(job: &mut CompilationJob, scope: Scope, for_block: &t::ForLoopBlock) -> Result<()> {
    let repeater_view = job.allocate_view(scope.view);

    // `$index` and `$count` are suffixed with the view's xref so that nested loops don't
    // shadow each other's values.
    let index_name = format!("ɵ$index_{}", repeater_view.as_usize());
    let count_name = format!("ɵ$count_{}", repeater_view.as_usize());
    let mut var_names = ir::RepeaterVarNames {
        dollar_index: Vec::new(),
        dollar_count: Vec::new(),
        dollar_implicit: for_block.item.name.clone(),
    };

    {
        let item_value = if for_block.item.value.is_empty() {
            "$implicit".to_string()
        } else {
            for_block.item.value.clone()
        };
        let mut aliases = Vec::new();
        for variable in &for_block.context_variables {
            match variable.value.as_str() {
                "$index" => var_names.dollar_index.push(variable.name.clone()),
                "$count" => var_names.dollar_count.push(variable.name.clone()),
                _ => {}
            }
            if variable.name != "$index" && variable.name != "$count" {
                aliases.push(ir::AliasVariable {
                    identifier: variable.name.clone(),
                    expression: get_computed_for_loop_variable_expression(variable, &index_name, &count_name)?,
                    name: None,
                });
            }
        }

        let unit = job.view_mut(repeater_view)?;
        unit.context_variables.insert(for_block.item.name.clone(), item_value);
        for variable in &for_block.context_variables {
            if variable.name == "$index" {
                unit.context_variables.insert("$index".to_string(), variable.value.clone());
                unit.context_variables.insert(index_name.clone(), variable.value.clone());
            } else if variable.name == "$count" {
                unit.context_variables.insert("$count".to_string(), variable.value.clone());
                unit.context_variables.insert(count_name.clone(), variable.value.clone());
            }
        }
        unit.aliases.extend(aliases);
    }

    let track_span = convert_source_span(for_block.track_by.source_span(), Some(&for_block.block.source_span));
    let track = convert_ast(&for_block.track_by, job, track_span.as_ref())?;

    ingest_nodes(job, Scope::child(repeater_view), &for_block.children)?;

    let (empty_view, empty_tag) = match &for_block.empty {
        Some(empty) => {
            let view = job.allocate_view(scope.view);
            ingest_nodes(job, Scope::child(view), &empty.children)?;
            let tag = ingest_control_flow_insertion_point(job, scope.view, view, &empty.children)?;
            (Some(view), tag)
        }
        None => (None, None),
    };

    let tag = ingest_control_flow_insertion_point(job, scope.view, repeater_view, &for_block.children)?;
    let repeater_create = ir::RepeaterCreateOp {
        xref: repeater_view,
        handle: SlotHandle::new(repeater_view),
        empty_view,
        track: Box::new(track),
        track_by_fn: None,
        uses_component_instance: false,
        var_names,
        tag,
        attributes: None,
        empty_tag,
        empty_attributes: None,
        decls: None,
        vars: None,
        empty_decls: None,
        empty_vars: None,
        start_source_span: for_block.block.start_source_span.clone(),
        whole_source_span: for_block.block.source_span.clone(),
    };
    push_create(job, scope.view, CreateOp::RepeaterCreate(repeater_create))?;

    let expression_span = convert_source_span(for_block.expression.source_span(), Some(&for_block.block.source_span));
    let collection = convert_ast(&for_block.expression, job, expression_span.as_ref())?;
    push_update(
        job,
        scope.view,
        ir::create_repeater_op(repeater_view, collection, for_block.block.source_span.clone()),
    )
}

/// Ingest a `@let` declaration into the given view.
fn ingest_let_declaration(job: &mut CompilationJob, scope: Scope, decl: &t::LetDeclaration) -> Result<()> {
    let target = job.allocate_xref_id();
    push_create(
        job,
        scope.view,
        ir::create_declare_let_op(target, decl.name.clone(), decl.source_span.clone()),
    )?;
    let value = convert_ast(&decl.value, job, Some(&decl.value_span))?;
    push_update(
        job,
        scope.view,
        ir::create_store_let_op(target, decl.name.clone(), value, decl.source_span.clone()),
    )
}

fn binding_kind_for(binding_type: t::BindingType) -> BindingKind {
    match binding_type {
        t::BindingType::Property => BindingKind::Property,
        t::BindingType::TwoWay => BindingKind::TwoWayProperty,
        t::BindingType::Attribute => BindingKind::Attribute,
        t::BindingType::Class => BindingKind::ClassName,
        t::BindingType::Style => BindingKind::StyleProperty,
        t::BindingType::Animation => BindingKind::Animation,
    }
}

/// The security context of a bound input, looked up in the schema unless the parser
/// already assigned one.
fn input_security_context(tag: &str, input: &t::BoundAttribute) -> SecurityContext {
    if input.security_context != SecurityContext::NONE {
        return input.security_context;
    }
    match input.type_ {
        t::BindingType::Property | t::BindingType::TwoWay => DOM_SCHEMA.security_context(tag, &input.name, false),
        t::BindingType::Attribute => DOM_SCHEMA.security_context(tag, &input.name, true),
        t::BindingType::Style => SecurityContext::STYLE,
        t::BindingType::Class | t::BindingType::Animation => SecurityContext::NONE,
    }
}

fn convert_ast_with_interpolation(
    job: &mut CompilationJob,
    value: &AST,
    base: Option<&ParseSourceSpan>,
) -> Result<BindingExpression> {
    match value {
        AST::Interpolation(interp) => {
            let expressions = interp
                .expressions
                .iter()
                .map(|expr| convert_ast(expr, job, base))
                .collect::<Result<Vec<_>>>()?;
            Ok(BindingExpression::Interpolation(Interpolation::new(
                interp.strings.clone(),
                expressions,
                Vec::new(),
            )))
        }
        other => Ok(BindingExpression::Expression(convert_ast(other, job, base)?)),
    }
}

/// Lowers static attributes and bound inputs of an element into `Binding` update ops.
fn ingest_element_bindings(
    job: &mut CompilationJob,
    view: XrefId,
    xref: XrefId,
    tag: &str,
    element: &t::Element,
) -> Result<()> {
    let mut bindings = Vec::with_capacity(element.attributes.len() + element.inputs.len());
    for attr in &element.attributes {
        let security_context = DOM_SCHEMA.security_context(tag, &attr.name, true);
        bindings.push(ir::create_binding_op(
            xref,
            BindingKind::Attribute,
            attr.name.clone(),
            BindingExpression::Expression(o::literal(attr.value.clone())),
            None,
            security_context,
            true,
            false,
            None,
            attr.source_span.clone(),
        ));
    }
    for input in &element.inputs {
        let expression = convert_ast_with_interpolation(job, &input.value, None)?;
        bindings.push(ir::create_binding_op(
            xref,
            binding_kind_for(input.type_),
            input.name.clone(),
            expression,
            input.unit.clone(),
            input_security_context(tag, input),
            false,
            false,
            None,
            input.source_span.clone(),
        ));
    }
    job.view_mut(view)?.update.push_all(bindings);
    Ok(())
}

/// Lowers the outputs of an element or `ng-template` into listener create ops.
fn ingest_element_events(
    job: &mut CompilationJob,
    view: XrefId,
    xref: XrefId,
    tag: &str,
    outputs: &[t::BoundEvent],
) -> Result<()> {
    for output in outputs {
        let op = if output.type_ == t::ParsedEventType::TwoWay {
            let handler_ops = make_two_way_listener_handler_ops(job, &output.handler, &output.handler_span)?;
            CreateOp::TwoWayListener(ir::create_listener_op(
                xref,
                output.name.clone(),
                Some(tag.to_string()),
                handler_ops,
                false,
                None,
                output.source_span.clone(),
            ))
        } else {
            let handler_ops = make_listener_handler_ops(job, &output.handler, &output.handler_span)?;
            CreateOp::Listener(ir::create_listener_op(
                xref,
                output.name.clone(),
                Some(tag.to_string()),
                handler_ops,
                false,
                output.target.clone(),
                output.source_span.clone(),
            ))
        };
        push_create(job, view, op)?;
    }
    Ok(())
}

/// Splits a handler on top-level `;` into statements, returning the value of the last one.
fn make_listener_handler_ops(
    job: &mut CompilationJob,
    handler: &AST,
    handler_span: &ParseSourceSpan,
) -> Result<ir::OpList<UpdateOp>> {
    let handler_exprs: Vec<&AST> = match handler {
        AST::Chain(chain) => chain.expressions.iter().collect(),
        other => vec![other],
    };
    let mut expressions = handler_exprs
        .into_iter()
        .map(|expr| convert_ast(expr, job, Some(handler_span)))
        .collect::<Result<Vec<_>>>()?;
    let Some(return_expr) = expressions.pop() else {
        return invariant("Expected listener to have non-empty expression list.");
    };

    let mut handler_ops = ir::OpList::new();
    for expr in expressions {
        handler_ops.push(UpdateOp::Statement(ir::create_statement_op(expr.to_stmt())));
    }
    handler_ops.push(UpdateOp::Statement(ir::create_statement_op(o::return_stmt(return_expr))));
    Ok(handler_ops)
}

/// `target = $event; return $event;`
fn make_two_way_listener_handler_ops(
    job: &mut CompilationJob,
    handler: &AST,
    handler_span: &ParseSourceSpan,
) -> Result<ir::OpList<UpdateOp>> {
    let handler = match handler {
        AST::Chain(chain) if chain.expressions.len() == 1 => &chain.expressions[0],
        AST::Chain(_) => return invariant("Expected two-way listener to have a single expression."),
        other => other,
    };
    let handler_expr = convert_ast(handler, job, Some(handler_span))?;
    let event_reference = || {
        o::Expression::LexicalRead(LexicalReadExpr {
            name: "$event".to_string(),
            source_span: None,
        })
    };
    let two_way_set = o::Expression::TwoWayBindingSet(TwoWayBindingSetExpr {
        target: Box::new(handler_expr),
        value: Box::new(event_reference()),
    });

    let mut handler_ops = ir::OpList::new();
    handler_ops.push(UpdateOp::Statement(ir::create_statement_op(two_way_set.to_stmt())));
    handler_ops.push(UpdateOp::Statement(ir::create_statement_op(o::return_stmt(event_reference()))));
    Ok(handler_ops)
}

/// The value of a template binding: static text or a parsed expression.
enum TemplateBindingValue<'a> {
    Text(&'a str),
    Ast(&'a AST),
}

enum TemplateBinding {
    Extracted(CreateOp),
    Binding(UpdateOp),
}

#[allow(clippy::too_many_arguments)]
fn create_template_binding(
    job: &mut CompilationJob,
    xref: XrefId,
    binding_type: t::BindingType,
    name: &str,
    value: TemplateBindingValue<'_>,
    unit: Option<String>,
    security_context: SecurityContext,
    is_structural_template_attribute: bool,
    template_kind: TemplateKind,
    source_span: &ParseSourceSpan,
) -> Result<Option<TemplateBinding>> {
    let is_text_binding = matches!(value, TemplateBindingValue::Text(_));
    if template_kind == TemplateKind::Structural {
        if !is_structural_template_attribute {
            // Bindings of the element under a structural directive only matter for
            // directive matching on the template.
            let extracted_kind = match binding_type {
                t::BindingType::Property | t::BindingType::Class | t::BindingType::Style => {
                    Some(BindingKind::Property)
                }
                t::BindingType::TwoWay => Some(BindingKind::TwoWayProperty),
                _ => None,
            };
            if let Some(kind) = extracted_kind {
                return Ok(Some(TemplateBinding::Extracted(ir::create_extracted_attribute_op(
                    xref,
                    kind,
                    None,
                    name,
                    None,
                    security_context,
                ))));
            }
        }
        if !is_text_binding && matches!(binding_type, t::BindingType::Attribute | t::BindingType::Animation) {
            return Ok(None);
        }
    }

    let mut kind = binding_kind_for(binding_type);
    if template_kind == TemplateKind::NgTemplate
        && (matches!(binding_type, t::BindingType::Class | t::BindingType::Style)
            || (binding_type == t::BindingType::Attribute && !is_text_binding))
    {
        // Directives on an `ng-template` only see properties.
        kind = BindingKind::Property;
    }

    let expression = match value {
        TemplateBindingValue::Text(text) => BindingExpression::Expression(o::literal(text.to_string())),
        TemplateBindingValue::Ast(ast) => convert_ast_with_interpolation(job, ast, None)?,
    };
    Ok(Some(TemplateBinding::Binding(ir::create_binding_op(
        xref,
        kind,
        name,
        expression,
        unit,
        security_context,
        is_text_binding,
        is_structural_template_attribute,
        Some(template_kind),
        source_span.clone(),
    ))))
}

fn ingest_template_bindings(
    job: &mut CompilationJob,
    view: XrefId,
    xref: XrefId,
    tag: &str,
    template: &t::Template,
    template_kind: TemplateKind,
) -> Result<()> {
    let mut bindings = Vec::new();

    for attr in &template.template_attrs {
        let binding = match attr {
            t::TemplateAttr::Text(text) => create_template_binding(
                job,
                xref,
                t::BindingType::Attribute,
                &text.name,
                TemplateBindingValue::Text(&text.value),
                None,
                DOM_SCHEMA.security_context(NG_TEMPLATE_TAG_NAME, &text.name, true),
                true,
                template_kind,
                &text.source_span,
            )?,
            t::TemplateAttr::Bound(bound) => create_template_binding(
                job,
                xref,
                bound.type_,
                &bound.name,
                TemplateBindingValue::Ast(&bound.value),
                bound.unit.clone(),
                input_security_context(NG_TEMPLATE_TAG_NAME, bound),
                true,
                template_kind,
                &bound.source_span,
            )?,
        };
        bindings.extend(binding);
    }

    for attr in &template.attributes {
        bindings.extend(create_template_binding(
            job,
            xref,
            t::BindingType::Attribute,
            &attr.name,
            TemplateBindingValue::Text(&attr.value),
            None,
            DOM_SCHEMA.security_context(NG_TEMPLATE_TAG_NAME, &attr.name, true),
            false,
            template_kind,
            &attr.source_span,
        )?);
    }

    for input in &template.inputs {
        bindings.extend(create_template_binding(
            job,
            xref,
            input.type_,
            &input.name,
            TemplateBindingValue::Ast(&input.value),
            input.unit.clone(),
            input_security_context(tag, input),
            false,
            template_kind,
            &input.source_span,
        )?);
    }

    let mut create_ops = Vec::new();
    let mut update_ops = Vec::new();
    for binding in bindings {
        match binding {
            TemplateBinding::Extracted(op) => create_ops.push(op),
            TemplateBinding::Binding(op) => update_ops.push(op),
        }
    }

    match template_kind {
        TemplateKind::NgTemplate => {
            let unit = job.view_mut(view)?;
            unit.create.push_all(create_ops);
            unit.update.push_all(update_ops);
            ingest_element_events(job, view, xref, NG_TEMPLATE_TAG_NAME, &template.outputs)?;
        }
        _ => {
            for output in &template.outputs {
                if output.type_ != t::ParsedEventType::Animation {
                    let security_context = DOM_SCHEMA.security_context(NG_TEMPLATE_TAG_NAME, &output.name, false);
                    create_ops.push(ir::create_extracted_attribute_op(
                        xref,
                        BindingKind::Property,
                        None,
                        output.name.clone(),
                        None,
                        security_context,
                    ));
                }
            }
            let unit = job.view_mut(view)?;
            unit.create.push_all(create_ops);
            unit.update.push_all(update_ops);
        }
    }
    Ok(())
}
