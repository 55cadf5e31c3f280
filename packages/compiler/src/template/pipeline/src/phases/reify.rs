//! Reify Phase
//!
//! Compiles semantic operations across all views into runtime instruction calls. Each create
//! and update op becomes a `Statement` op, and every logical IR expression is replaced by the
//! output expression which implements it at runtime.

use indexmap::IndexMap;

use crate::constant_pool::ConstantPool;
use crate::error::{invariant, CompilerError, Result};
use crate::output::output_ast::{self as o, Expression, Statement};
use crate::template::pipeline::ir::{
    create_statement_op, is_ir_expression, BindingExpression, BindingKind, CreateOp, DeferOnOp, DeferOpModifierKind,
    DeferTrigger, DeferTriggerTarget, EitherXrefIdOrExpression, ListenerOp, Namespace, Op, OpKind, OpList,
    RepeaterCreateOp, TemplateKind, TransformExpressions, UpdateOp, VisitorContextFlag, XrefId,
};
use crate::template::pipeline::src::compilation::{CompilationJob, TemplateCompilationMode};
use crate::template::pipeline::src::instruction::{self as ng, DeferArgs, ProjectionFallback, RepeaterEmpty, TemplateArgs};

/// Job-wide facts needed while reifying a single unit.
struct ReifyContext<'a> {
    dom_only: bool,
    fn_names: &'a IndexMap<XrefId, Option<String>>,
}

impl ReifyContext<'_> {
    fn view_fn_name(&self, view: XrefId) -> Result<String> {
        match self.fn_names.get(&view) {
            Some(Some(name)) => Ok(name.clone()),
            Some(None) => Err(CompilerError::UnnamedView(view)),
            None => Err(CompilerError::UnknownView(view)),
        }
    }
}

pub fn reify(job: &mut CompilationJob) -> Result<()> {
    let fn_names: IndexMap<XrefId, Option<String>> = job.units().map(|unit| (unit.xref, unit.fn_name.clone())).collect();
    let ctx = ReifyContext {
        dom_only: job.mode == TemplateCompilationMode::DomOnly,
        fn_names: &fn_names,
    };
    let parts = job.parts_mut();
    for unit in parts.units {
        reify_create_operations(&ctx, parts.pool, &mut unit.create)?;
        reify_update_operations(&ctx, &mut unit.update)?;
    }
    Ok(())
}

/// Ensures every op of every unit was compiled into a statement.
pub fn verify_reification(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units() {
        if let Some(op) = unit.create.iter().find(|op| !matches!(op, CreateOp::Statement(_))) {
            return Err(CompilerError::UnreifiedOp { list: "create", kind: op.kind() });
        }
        if let Some(op) = unit.update.iter().find(|op| !matches!(op, UpdateOp::Statement(_))) {
            return Err(CompilerError::UnreifiedOp { list: "update", kind: op.kind() });
        }
    }
    Ok(())
}

fn reify_expressions<T: TransformExpressions>(op: &mut T) -> Result<()> {
    let mut failure: Option<CompilerError> = None;
    op.transform_expressions(
        &mut |expr, _| {
            if failure.is_some() {
                return expr;
            }
            match reify_ir_expression(expr) {
                Ok(reified) => reified,
                Err(err) => {
                    failure = Some(err);
                    Expression::Empty(Default::default())
                }
            }
        },
        VisitorContextFlag::NONE,
    );
    failure.map_or(Ok(()), Err)
}

fn reify_create_operations(ctx: &ReifyContext<'_>, pool: &mut ConstantPool, ops: &mut OpList<CreateOp>) -> Result<()> {
    // ICU boundaries only delimit the message and emit nothing at runtime.
    ops.retain(|op| !matches!(op, CreateOp::IcuStart(_) | CreateOp::IcuEnd(_)));

    for op in ops.iter_mut() {
        reify_expressions(op)?;
        let kind = op.kind();
        let statement = match op {
            CreateOp::Statement(_) => continue,
            CreateOp::Variable(variable) => declare_variable(variable.variable.name(), variable.xref, &variable.initializer)?,
            CreateOp::Text(text) => ng::text(text.handle.get()?, &text.initial_value, text.source_span.clone()),
            CreateOp::ElementStart(el) => ng::element_start(
                el.handle.get()?,
                &el.tag,
                el.attributes.map(|i| i.as_usize()),
                el.local_refs_index.map(|i| i.as_usize()),
                ctx.dom_only,
                Some(el.start_source_span.clone()),
            ),
            CreateOp::Element(el) => ng::element(
                el.handle.get()?,
                &el.tag,
                el.attributes.map(|i| i.as_usize()),
                el.local_refs_index.map(|i| i.as_usize()),
                ctx.dom_only,
                Some(el.whole_source_span.clone()),
            ),
            CreateOp::ElementEnd(end) => ng::element_end(ctx.dom_only, end.source_span.clone()),
            CreateOp::ContainerStart(container) => ng::element_container_start(
                container.handle.get()?,
                container.attributes.map(|i| i.as_usize()),
                container.local_refs_index.map(|i| i.as_usize()),
                ctx.dom_only,
                Some(container.start_source_span.clone()),
            ),
            CreateOp::Container(container) => ng::element_container(
                container.handle.get()?,
                container.attributes.map(|i| i.as_usize()),
                container.local_refs_index.map(|i| i.as_usize()),
                ctx.dom_only,
                Some(container.whole_source_span.clone()),
            ),
            CreateOp::ContainerEnd(_) => ng::element_container_end(ctx.dom_only),
            CreateOp::Template(t) | CreateOp::ConditionalCreate(t) | CreateOp::ConditionalBranchCreate(t) => {
                let args = TemplateArgs {
                    slot: t.handle.get()?,
                    fn_name: ctx.view_fn_name(t.xref)?,
                    decls: counted(t.decls, "decls", t.xref)?,
                    vars: counted(t.vars, "vars", t.xref)?,
                    tag: t.tag.clone(),
                    const_index: t.attributes.map(|i| i.as_usize()),
                    local_ref_index: t.local_refs_index.map(|i| i.as_usize()),
                };
                let span = Some(t.start_source_span.clone());
                match kind {
                    OpKind::ConditionalCreate => ng::conditional_create(args, span),
                    OpKind::ConditionalBranchCreate => ng::conditional_branch_create(args, span),
                    // Block templates can't carry directives.
                    _ => ng::template(args, t.template_kind == TemplateKind::Block || ctx.dom_only, span),
                }
            }
            CreateOp::RepeaterCreate(repeater) => reify_repeater_create(ctx, pool, repeater)?,
            CreateOp::Listener(listener) => {
                let consumes_dollar_event = listener.consumes_dollar_event;
                let handler = reify_listener_handler(ctx, listener, consumes_dollar_event)?;
                let resolver = match &listener.event_target {
                    Some(target) => match ng::event_target_resolver(target) {
                        Some(resolver) => Some(resolver),
                        None => {
                            return invariant(format!(
                                "unexpected global target '{}' defined for '{}' event; supported targets are window, document and body",
                                target, listener.name
                            ))
                        }
                    },
                    None => None,
                };
                let dom_only = ctx.dom_only && !listener.host_listener;
                ng::listener(&listener.name, handler, resolver, dom_only, Some(listener.source_span.clone()))
            }
            CreateOp::TwoWayListener(listener) => {
                let handler = reify_listener_handler(ctx, listener, true)?;
                ng::two_way_listener(&listener.name, handler, Some(listener.source_span.clone()))
            }
            CreateOp::Pipe(pipe) => ng::pipe(pipe.handle.get()?, &pipe.name),
            CreateOp::Namespace(namespace) => match namespace.active {
                Namespace::HTML => ng::namespace_html(),
                Namespace::SVG => ng::namespace_svg(),
                Namespace::Math => ng::namespace_math(),
            },
            CreateOp::ProjectionDef(def) => ng::projection_def(def.def.clone()),
            CreateOp::Projection(projection) => {
                let fallback = match projection.fallback_view {
                    Some(view) => Some(ProjectionFallback {
                        fn_name: ctx.view_fn_name(view)?,
                        decls: counted(projection.fallback_decls, "decls", view)?,
                        vars: counted(projection.fallback_vars, "vars", view)?,
                    }),
                    None => None,
                };
                ng::projection(
                    projection.handle.get()?,
                    projection.projection_slot_index,
                    projection.attributes.clone(),
                    fallback,
                    Some(projection.source_span.clone()),
                )
            }
            CreateOp::Defer(defer) => {
                let args = DeferArgs {
                    slot: defer.handle.get()?,
                    primary_slot: defer.main_slot.get()?,
                    resolver_fn: defer.resolver_fn.clone(),
                    loading_slot: defer.loading_slot.as_ref().map(|h| h.get()).transpose()?,
                    placeholder_slot: defer.placeholder_slot.as_ref().map(|h| h.get()).transpose()?,
                    error_slot: defer.error_slot.as_ref().map(|h| h.get()).transpose()?,
                    loading_config: defer.loading_config.clone(),
                    placeholder_config: defer.placeholder_config.clone(),
                    enable_timer_scheduling: defer.loading_minimum_time.is_some()
                        || defer.loading_after_time.is_some()
                        || defer.placeholder_minimum_time.is_some(),
                    flags: defer.flags,
                };
                ng::defer(args, Some(defer.source_span.clone()))
            }
            CreateOp::DeferOn(defer_on) => {
                ng::defer_on(defer_on.trigger.kind(), defer_on_args(defer_on), defer_on.modifier, Some(defer_on.source_span.clone()))
            }
            CreateOp::I18nStart(i18n) => {
                let Some(message_index) = i18n.message_index else {
                    return invariant(format!("i18n block {:?} has no message const", i18n.xref));
                };
                ng::i18n_start(i18n.handle.get()?, message_index.as_usize(), Some(i18n.source_span.clone()))
            }
            CreateOp::I18nEnd(end) => ng::i18n_end(end.source_span.clone()),
            CreateOp::DeclareLet(declare) => ng::declare_let(declare.handle.get()?, Some(declare.source_span.clone())),
            CreateOp::DisableBindings(_) => ng::disable_bindings(),
            CreateOp::EnableBindings(_) => ng::enable_bindings(),
            // Ops that earlier phases should have consumed stay put and fail verification.
            CreateOp::ExtractedAttribute(_) | CreateOp::IcuStart(_) | CreateOp::IcuEnd(_) => continue,
        };
        *op = CreateOp::Statement(create_statement_op(statement));
    }
    Ok(())
}

fn reify_update_operations(ctx: &ReifyContext<'_>, ops: &mut OpList<UpdateOp>) -> Result<()> {
    for op in ops.iter_mut() {
        reify_expressions(op)?;
        let statement = match op {
            UpdateOp::Statement(_) => continue,
            UpdateOp::Variable(variable) => declare_variable(variable.variable.name(), variable.xref, &variable.initializer)?,
            UpdateOp::Advance(advance) => ng::advance(advance.delta, advance.source_span.clone()),
            UpdateOp::Property(prop) => {
                let span = Some(prop.source_span.clone());
                match &prop.expression {
                    BindingExpression::Expression(expr) if ctx.dom_only && prop.binding_kind != BindingKind::Animation => {
                        ng::dom_property(remap_dom_property(&prop.name), expr.clone(), prop.sanitizer.clone(), span)
                    }
                    BindingExpression::Expression(expr) => ng::property(&prop.name, expr.clone(), prop.sanitizer.clone(), span),
                    BindingExpression::Interpolation(interp) => {
                        ng::property_interpolate(&prop.name, interp.clone(), prop.sanitizer.clone(), span)?
                    }
                }
            }
            UpdateOp::DomProperty(prop) => match &prop.expression {
                BindingExpression::Expression(expr) => ng::dom_property(
                    remap_dom_property(&prop.name),
                    expr.clone(),
                    prop.sanitizer.clone(),
                    Some(prop.source_span.clone()),
                ),
                BindingExpression::Interpolation(_) => {
                    return invariant(format!("interpolated DOM property binding \"{}\"", prop.name))
                }
            },
            UpdateOp::TwoWayProperty(prop) => match &prop.expression {
                BindingExpression::Expression(expr) => {
                    ng::two_way_property(&prop.name, expr.clone(), prop.sanitizer.clone(), Some(prop.source_span.clone()))
                }
                BindingExpression::Interpolation(_) => {
                    return invariant(format!("interpolated two-way property binding \"{}\"", prop.name))
                }
            },
            UpdateOp::Attribute(attr) => {
                let span = Some(attr.source_span.clone());
                match &attr.expression {
                    BindingExpression::Expression(expr) => {
                        ng::attribute(&attr.name, expr.clone(), attr.sanitizer.clone(), attr.namespace.as_deref(), span)
                    }
                    BindingExpression::Interpolation(interp) => ng::attribute_interpolate(
                        &attr.name,
                        interp.clone(),
                        attr.sanitizer.clone(),
                        attr.namespace.as_deref(),
                        span,
                    )?,
                }
            }
            UpdateOp::StyleProp(style) => {
                let span = Some(style.source_span.clone());
                match &style.expression {
                    BindingExpression::Expression(expr) => ng::style_prop(&style.name, expr.clone(), style.unit.as_deref(), span),
                    BindingExpression::Interpolation(interp) => {
                        ng::style_prop_interpolate(&style.name, interp.clone(), style.unit.as_deref(), span)?
                    }
                }
            }
            UpdateOp::ClassProp(class) => ng::class_prop(&class.name, class.expression.clone(), Some(class.source_span.clone())),
            UpdateOp::StyleMap(map) => match &map.expression {
                BindingExpression::Expression(expr) => ng::style_map(expr.clone(), Some(map.source_span.clone())),
                BindingExpression::Interpolation(interp) => {
                    ng::style_map_interpolate(interp.clone(), Some(map.source_span.clone()))?
                }
            },
            UpdateOp::ClassMap(map) => match &map.expression {
                BindingExpression::Expression(expr) => ng::class_map(expr.clone(), Some(map.source_span.clone())),
                BindingExpression::Interpolation(interp) => {
                    ng::class_map_interpolate(interp.clone(), Some(map.source_span.clone()))?
                }
            },
            UpdateOp::InterpolateText(text) => {
                ng::text_interpolate(text.interpolation.clone(), Some(text.source_span.clone()))?
            }
            UpdateOp::Conditional(conditional) => {
                let Some(processed) = &conditional.processed else {
                    return invariant("conditional test was not set");
                };
                ng::conditional(
                    processed.clone(),
                    conditional.context_value.clone(),
                    Some(conditional.source_span.clone()),
                )
            }
            UpdateOp::Repeater(repeater) => ng::repeater(repeater.collection.clone(), Some(repeater.source_span.clone())),
            UpdateOp::DeferWhen(when) => ng::defer_when(when.modifier, when.expr.clone(), Some(when.source_span.clone())),
            UpdateOp::I18nExpression(i18n) => ng::i18n_exp(i18n.expression.clone(), Some(i18n.source_span.clone())),
            UpdateOp::I18nApply(apply) => ng::i18n_apply(apply.handle.get()?, Some(apply.source_span.clone())),
            UpdateOp::StoreLet(store) => ng::store_let(store.value.clone(), Some(store.source_span.clone())).to_stmt(),
            // Unspecialized bindings stay put and fail verification.
            UpdateOp::Binding(_) => continue,
        };
        *op = UpdateOp::Statement(create_statement_op(statement));
    }
    Ok(())
}

fn declare_variable(name: Option<&str>, xref: XrefId, initializer: &Expression) -> Result<Statement> {
    let Some(name) = name else {
        return invariant(format!("unnamed variable {xref:?}"));
    };
    Ok(Statement::DeclareVar(o::DeclareVarStmt {
        name: name.to_string(),
        value: Some(Box::new(initializer.clone())),
        modifiers: o::StmtModifier::Final,
        source_span: None,
    }))
}

fn counted(value: Option<usize>, what: &str, view: XrefId) -> Result<usize> {
    match value {
        Some(value) => Ok(value),
        None => invariant(format!("{what} of view {view:?} were not counted")),
    }
}

/// Compiles the handler ops of a listener into a named function expression.
fn reify_listener_handler(ctx: &ReifyContext<'_>, listener: &mut ListenerOp, consumes_dollar_event: bool) -> Result<Expression> {
    let Some(name) = listener.handler_fn_name.clone() else {
        return invariant(format!("listener '{}' has not been named", listener.name));
    };
    reify_update_operations(ctx, &mut listener.handler_ops)?;

    let mut statements = Vec::with_capacity(listener.handler_ops.len());
    for op in listener.handler_ops.iter() {
        match op {
            UpdateOp::Statement(stmt) => statements.push(stmt.statement.clone()),
            other => {
                return Err(CompilerError::UnreifiedOp {
                    list: "listener handler",
                    kind: other.kind(),
                })
            }
        }
    }

    let params = if consumes_dollar_event {
        vec![o::FnParam::new("$event")]
    } else {
        Vec::new()
    };
    Ok(o::fn_expr(params, statements, Some(name)))
}

fn reify_repeater_create(ctx: &ReifyContext<'_>, pool: &mut ConstantPool, repeater: &RepeaterCreateOp) -> Result<Statement> {
    let empty = match repeater.empty_view {
        Some(view) => Some(RepeaterEmpty {
            fn_name: ctx.view_fn_name(view)?,
            decls: counted(repeater.empty_decls, "decls", view)?,
            vars: counted(repeater.empty_vars, "vars", view)?,
            tag: repeater.empty_tag.clone(),
            const_index: repeater.empty_attributes.map(|i| i.as_usize()),
        }),
        None => None,
    };
    Ok(ng::repeater_create(
        repeater.handle.get()?,
        ctx.view_fn_name(repeater.xref)?,
        counted(repeater.decls, "decls", repeater.xref)?,
        counted(repeater.vars, "vars", repeater.xref)?,
        repeater.tag.clone(),
        repeater.attributes.map(|i| i.as_usize()),
        reify_track_by(pool, repeater),
        repeater.uses_component_instance,
        empty,
        Some(repeater.whole_source_span.clone()),
    ))
}

/// The tracking function of a repeater: the optimized reference if one was found, otherwise
/// a shared function returning the track expression for `($index, $item)`.
fn reify_track_by(pool: &mut ConstantPool, repeater: &RepeaterCreateOp) -> Expression {
    if let Some(track_by) = &repeater.track_by_fn {
        return track_by.clone();
    }
    let params = vec![o::FnParam::new("$index"), o::FnParam::new("$item")];
    let track = (*repeater.track).clone();
    // `this` is only bound inside a regular function.
    let fn_ = if repeater.uses_component_instance {
        o::fn_expr(params, vec![o::return_stmt(track)], None)
    } else {
        o::arrow_fn(params, o::ArrowFunctionBody::Expression(Box::new(track)))
    };
    pool.get_shared_function_reference(fn_, "_forTrack", true)
}

fn defer_on_args(op: &DeferOnOp) -> Vec<Expression> {
    let hydrate = op.modifier == DeferOpModifierKind::Hydrate;
    match &op.trigger {
        DeferTrigger::Idle | DeferTrigger::Immediate | DeferTrigger::Never => Vec::new(),
        DeferTrigger::Timer { delay } => vec![o::literal(*delay)],
        // `hydrate` triggers don't support targets.
        DeferTrigger::Hover(_) | DeferTrigger::Interaction(_) if hydrate => Vec::new(),
        DeferTrigger::Hover(target) | DeferTrigger::Interaction(target) => {
            let mut args = vec![target_slot_literal(target)];
            if let Some(steps) = target.target_slot_view_steps.filter(|steps| *steps != 0) {
                args.push(o::literal(steps as i64));
            }
            args
        }
        DeferTrigger::Viewport { options, .. } if hydrate => options.iter().cloned().collect(),
        DeferTrigger::Viewport { target, options } => {
            let mut args = vec![target_slot_literal(target)];
            match target.target_slot_view_steps.filter(|steps| *steps != 0) {
                Some(steps) => args.push(o::literal(steps as i64)),
                None if options.is_some() => args.push(o::null_expr()),
                None => {}
            }
            args.extend(options.iter().cloned());
            args
        }
    }
}

/// Unresolved targets are caught by type checking, so they are passed as `null`.
fn target_slot_literal(target: &DeferTriggerTarget) -> Expression {
    match target.target_slot.as_ref().and_then(|handle| handle.slot) {
        Some(slot) => o::literal(slot),
        None => o::null_expr(),
    }
}

/// DOM properties whose name differs from the attribute they are bound through.
fn remap_dom_property(name: &str) -> &str {
    match name {
        "class" => "className",
        "for" => "htmlFor",
        "formaction" => "formAction",
        "innerHtml" => "innerHTML",
        "readonly" => "readOnly",
        "tabindex" => "tabIndex",
        other => other,
    }
}

fn reify_ir_expression(expr: Expression) -> Result<Expression> {
    if !is_ir_expression(&expr) && !matches!(expr, Expression::TrackContext(_)) {
        return Ok(expr);
    }
    let reified = match expr {
        Expression::NextContext(next) => ng::next_context(next.steps),
        // Local refs occupy the slots right after their target.
        Expression::Reference(reference) => ng::reference(reference.target_slot.get()? + 1 + reference.offset),
        Expression::LexicalRead(read) => return Err(CompilerError::UnresolvedName(read.name)),
        Expression::TwoWayBindingSet(_) => return invariant("unresolved TwoWayBindingSet"),
        Expression::RestoreView(restore) => match restore.view {
            EitherXrefIdOrExpression::Expression(view) => ng::restore_view(*view),
            EitherXrefIdOrExpression::XrefId(view) => return invariant(format!("unresolved RestoreView of {view:?}")),
        },
        Expression::ResetView(reset) => ng::reset_view(*reset.expr),
        Expression::GetCurrentView(_) => ng::get_current_view(),
        Expression::ReadVariable(read) => match read.name {
            Some(name) => o::variable(name),
            None => return invariant(format!("read of unnamed variable {:?}", read.xref)),
        },
        Expression::ReadTemporary(read) => match read.name {
            Some(name) => o::variable(name),
            None => return invariant(format!("read of unnamed temporary {:?}", read.xref)),
        },
        Expression::AssignTemporary(assign) => {
            let Some(name) = assign.name else {
                return invariant(format!("assignment of unnamed temporary {:?}", assign.xref));
            };
            match o::variable(name).set(*assign.expr) {
                Some(write) => write,
                None => return invariant("temporary is not assignable"),
            }
        }
        Expression::PureFunction(pure) => {
            let Some(fn_) = pure.fn_ else {
                return invariant("expected pure functions to have been extracted");
            };
            let Some(var_offset) = pure.var_offset else {
                return invariant("expected pure function var offset to have been counted");
            };
            ng::pure_function(var_offset, *fn_, pure.args)?
        }
        Expression::PureFunctionParameter(_) => {
            return invariant("expected pure function parameters to have been extracted")
        }
        Expression::PipeBinding(pipe) => {
            let Some(var_offset) = pipe.var_offset else {
                return invariant(format!("var offset of pipe '{}' was not counted", pipe.name));
            };
            ng::pipe_bind(pipe.target_slot.get()?, var_offset, pipe.args)?
        }
        Expression::PipeBindingVariadic(pipe) => {
            let Some(var_offset) = pipe.var_offset else {
                return invariant(format!("var offset of pipe '{}' was not counted", pipe.name));
            };
            ng::pipe_bind_v(pipe.target_slot.get()?, var_offset, *pipe.args)
        }
        Expression::SlotLiteral(literal) => o::literal(literal.slot.get()?),
        Expression::ContextLetReference(reference) => ng::read_context_let(reference.target_slot.get()?),
        Expression::TrackContext(_) => o::variable("this"),
        other => return invariant(format!("unsupported reification of {other:?}")),
    };
    Ok(reified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{
        create_advance_op, create_element_end_op, create_element_start_op, create_interpolate_text_op,
        create_text_op, Interpolation, LexicalReadExpr, ReferenceExpr, SlotHandle,
    };
    use std::sync::Arc;

    fn span() -> ParseSourceSpan {
        let file = Arc::new(ParseSourceFile::new("<div>{{y}}</div>", "test.html"));
        ParseSourceSpan::from_offsets(&file, 0, 5)
    }

    /// The runtime instruction called by an expression statement.
    fn instruction(statement: &Statement) -> Option<String> {
        let Statement::Expression(stmt) = statement else { return None };
        let Expression::InvokeFn(call) = &*stmt.expr else { return None };
        let Expression::External(ext) = &*call.fn_ else { return None };
        ext.value.name.clone()
    }

    fn create_instructions(job: &CompilationJob) -> Vec<Option<String>> {
        job.root_unit()
            .create
            .iter()
            .map(|op| match op {
                CreateOp::Statement(stmt) => instruction(&stmt.statement),
                _ => None,
            })
            .collect()
    }

    fn update_instructions(job: &CompilationJob) -> Vec<Option<String>> {
        job.root_unit()
            .update
            .iter()
            .map(|op| match op {
                UpdateOp::Statement(stmt) => instruction(&stmt.statement),
                _ => None,
            })
            .collect()
    }

    fn some(names: &[&str]) -> Vec<Option<String>> {
        names.iter().map(|name| Some(name.to_string())).collect()
    }

    #[test]
    fn element_and_text_ops_become_instruction_calls() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let div = job.allocate_xref_id();
        let text = job.allocate_xref_id();
        let unit = job.root_unit_mut();
        let mut start = create_element_start_op("div", div, Namespace::HTML, span(), span());
        start.handle.slot = Some(0);
        unit.create.push(CreateOp::ElementStart(start));
        let mut text_op = create_text_op(text, "", None);
        if let Some(handle) = text_op.handle_mut() {
            handle.slot = Some(1);
        }
        unit.create.push(text_op);
        unit.create.push(CreateOp::ElementEnd(create_element_end_op(div, None)));
        unit.update.push(create_advance_op(1, None));
        unit.update.push(create_interpolate_text_op(
            text,
            Interpolation::new(vec![String::new(), String::new()], vec![o::variable("y")], Vec::new()),
            span(),
        ));

        reify(&mut job).unwrap();
        verify_reification(&mut job).unwrap();

        assert_eq!(create_instructions(&job), some(&["ɵɵelementStart", "ɵɵtext", "ɵɵelementEnd"]));
        assert_eq!(update_instructions(&job), some(&["ɵɵadvance", "ɵɵtextInterpolate"]));
    }

    #[test]
    fn references_skip_past_their_target_slot() {
        let target = XrefId(3);
        let mut target_slot = SlotHandle::new(target);
        target_slot.slot = Some(4);
        let expr = Expression::Reference(ReferenceExpr {
            target,
            target_slot,
            offset: 1,
        });
        let reified = reify_ir_expression(expr).unwrap();
        assert!(reified.is_equivalent(&ng::reference(6)));
    }

    #[test]
    fn unresolved_names_fail_reification() {
        let read = Expression::LexicalRead(LexicalReadExpr {
            name: "foo".to_string(),
            source_span: None,
        });
        match reify_ir_expression(read) {
            Err(CompilerError::UnresolvedName(name)) => assert_eq!(name, "foo"),
            other => panic!("expected an unresolved name, got {other:?}"),
        }
    }

    #[test]
    fn leftover_ops_fail_verification() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        job.root_unit_mut().update.push(create_advance_op(2, None));
        assert_eq!(
            verify_reification(&mut job),
            Err(CompilerError::UnreifiedOp {
                list: "update",
                kind: OpKind::Advance
            })
        );
    }

    #[test]
    fn dom_properties_are_remapped() {
        assert_eq!(remap_dom_property("tabindex"), "tabIndex");
        assert_eq!(remap_dom_property("title"), "title");
    }
}
