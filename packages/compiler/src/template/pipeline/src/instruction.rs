//! Helpers for generating calls to runtime instructions.

use crate::core::TDeferDetailsFlags;
use crate::error::{invariant, Result};
use crate::output::output_ast as o;
use crate::parse_util::ParseSourceSpan;
use crate::render3::r3_identifiers::Identifiers;
use crate::template::pipeline::ir::{DeferOpModifierKind, DeferTriggerKind, Interpolation};
use o::ExternalReference;

pub fn call(fn_: ExternalReference, args: Vec<o::Expression>, source_span: Option<ParseSourceSpan>) -> o::Statement {
    let expr = o::import_ref(fn_).call_fn(args, source_span.clone());
    o::Statement::Expression(o::ExpressionStatement {
        expr: Box::new(expr),
        source_span,
    })
}

fn call_expr(fn_: ExternalReference, args: Vec<o::Expression>) -> o::Expression {
    o::import_ref(fn_).call_fn(args, None)
}

fn opt_literal(value: Option<usize>) -> o::Expression {
    value.map(o::literal).unwrap_or_else(o::null_expr)
}

fn trim_trailing_nulls(args: &mut Vec<o::Expression>) {
    while matches!(args.last(), Some(o::Expression::Literal(lit)) if lit.value == o::LiteralValue::Null) {
        args.pop();
    }
}

fn element_or_container_base(
    instruction: ExternalReference,
    slot: usize,
    tag: Option<&str>,
    const_index: Option<usize>,
    local_ref_index: Option<usize>,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![o::literal(slot)];
    if let Some(tag) = tag {
        args.push(o::literal(tag));
    }
    if let Some(local_ref_index) = local_ref_index {
        args.push(opt_literal(const_index));
        args.push(o::literal(local_ref_index));
    } else if let Some(const_index) = const_index {
        args.push(o::literal(const_index));
    }
    call(instruction, args, source_span)
}

pub fn element_start(
    slot: usize,
    tag: &str,
    const_index: Option<usize>,
    local_ref_index: Option<usize>,
    dom_only: bool,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let instruction = if dom_only {
        Identifiers::dom_element_start()
    } else {
        Identifiers::element_start()
    };
    element_or_container_base(instruction, slot, Some(tag), const_index, local_ref_index, source_span)
}

pub fn element(
    slot: usize,
    tag: &str,
    const_index: Option<usize>,
    local_ref_index: Option<usize>,
    dom_only: bool,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let instruction = if dom_only {
        Identifiers::dom_element()
    } else {
        Identifiers::element()
    };
    element_or_container_base(instruction, slot, Some(tag), const_index, local_ref_index, source_span)
}

pub fn element_end(dom_only: bool, source_span: Option<ParseSourceSpan>) -> o::Statement {
    let instruction = if dom_only {
        Identifiers::dom_element_end()
    } else {
        Identifiers::element_end()
    };
    call(instruction, vec![], source_span)
}

pub fn element_container_start(
    slot: usize,
    const_index: Option<usize>,
    local_ref_index: Option<usize>,
    dom_only: bool,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let instruction = if dom_only {
        Identifiers::dom_element_container_start()
    } else {
        Identifiers::element_container_start()
    };
    element_or_container_base(instruction, slot, None, const_index, local_ref_index, source_span)
}

pub fn element_container(
    slot: usize,
    const_index: Option<usize>,
    local_ref_index: Option<usize>,
    dom_only: bool,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let instruction = if dom_only {
        Identifiers::dom_element_container()
    } else {
        Identifiers::element_container()
    };
    element_or_container_base(instruction, slot, None, const_index, local_ref_index, source_span)
}

pub fn element_container_end(dom_only: bool) -> o::Statement {
    let instruction = if dom_only {
        Identifiers::dom_element_container_end()
    } else {
        Identifiers::element_container_end()
    };
    call(instruction, vec![], None)
}

/// Arguments shared by every instruction that declares an embedded view.
#[derive(Debug, Clone)]
pub struct TemplateArgs {
    pub slot: usize,
    pub fn_name: String,
    pub decls: usize,
    pub vars: usize,
    pub tag: Option<String>,
    pub const_index: Option<usize>,
    pub local_ref_index: Option<usize>,
}

fn template_base(instruction: ExternalReference, t: TemplateArgs, source_span: Option<ParseSourceSpan>) -> o::Statement {
    let mut args = vec![
        o::literal(t.slot),
        o::variable(t.fn_name),
        o::literal(t.decls),
        o::literal(t.vars),
        t.tag.map(o::literal).unwrap_or_else(o::null_expr),
        opt_literal(t.const_index),
    ];
    if let Some(local_refs) = t.local_ref_index {
        args.push(o::literal(local_refs));
        args.push(o::import_ref(Identifiers::template_ref_extractor()));
    }
    trim_trailing_nulls(&mut args);
    call(instruction, args, source_span)
}

pub fn template(t: TemplateArgs, dom_only: bool, source_span: Option<ParseSourceSpan>) -> o::Statement {
    let instruction = if dom_only {
        Identifiers::dom_template()
    } else {
        Identifiers::template_create()
    };
    template_base(instruction, t, source_span)
}

pub fn conditional_create(t: TemplateArgs, source_span: Option<ParseSourceSpan>) -> o::Statement {
    template_base(Identifiers::conditional_create(), t, source_span)
}

pub fn conditional_branch_create(t: TemplateArgs, source_span: Option<ParseSourceSpan>) -> o::Statement {
    template_base(Identifiers::conditional_branch_create(), t, source_span)
}

pub fn text(slot: usize, initial_value: &str, source_span: Option<ParseSourceSpan>) -> o::Statement {
    let mut args = vec![o::literal(slot)];
    if !initial_value.is_empty() {
        args.push(o::literal(initial_value));
    }
    call(Identifiers::text(), args, source_span)
}

pub fn listener(
    name: &str,
    handler_fn: o::Expression,
    event_target_resolver: Option<ExternalReference>,
    dom_only: bool,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![o::literal(name), handler_fn];
    if let Some(resolver) = event_target_resolver {
        args.push(o::import_ref(resolver));
    }
    let instruction = if dom_only {
        Identifiers::dom_listener()
    } else {
        Identifiers::listener()
    };
    call(instruction, args, source_span)
}

pub fn two_way_listener(name: &str, handler_fn: o::Expression, source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::two_way_listener(), vec![o::literal(name), handler_fn], source_span)
}

/// The resolver function for a global event target.
pub fn event_target_resolver(target: &str) -> Option<ExternalReference> {
    match target {
        "window" => Some(Identifiers::resolve_window()),
        "document" => Some(Identifiers::resolve_document()),
        "body" => Some(Identifiers::resolve_body()),
        _ => None,
    }
}

pub fn pipe(slot: usize, name: &str) -> o::Statement {
    call(Identifiers::pipe(), vec![o::literal(slot), o::literal(name)], None)
}

pub fn namespace_html() -> o::Statement {
    call(Identifiers::namespace_html(), vec![], None)
}

pub fn namespace_svg() -> o::Statement {
    call(Identifiers::namespace_svg(), vec![], None)
}

pub fn namespace_math() -> o::Statement {
    call(Identifiers::namespace_math_ml(), vec![], None)
}

pub fn disable_bindings() -> o::Statement {
    call(Identifiers::disable_bindings(), vec![], None)
}

pub fn enable_bindings() -> o::Statement {
    call(Identifiers::enable_bindings(), vec![], None)
}

pub fn advance(delta: usize, source_span: Option<ParseSourceSpan>) -> o::Statement {
    let args = if delta > 1 { vec![o::literal(delta)] } else { vec![] };
    call(Identifiers::advance(), args, source_span)
}

pub fn reference(slot: usize) -> o::Expression {
    call_expr(Identifiers::reference(), vec![o::literal(slot)])
}

pub fn next_context(steps: usize) -> o::Expression {
    let args = if steps == 1 { vec![] } else { vec![o::literal(steps)] };
    call_expr(Identifiers::next_context(), args)
}

pub fn get_current_view() -> o::Expression {
    call_expr(Identifiers::get_current_view(), vec![])
}

pub fn restore_view(saved_view: o::Expression) -> o::Expression {
    call_expr(Identifiers::restore_view(), vec![saved_view])
}

pub fn reset_view(return_value: o::Expression) -> o::Expression {
    call_expr(Identifiers::reset_view(), vec![return_value])
}

pub fn component_instance() -> o::Expression {
    call_expr(Identifiers::component_instance(), vec![])
}

pub fn two_way_binding_set(target: o::Expression, value: o::Expression) -> o::Expression {
    call_expr(Identifiers::two_way_binding_set(), vec![target, value])
}

pub fn declare_let(slot: usize, source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::declare_let(), vec![o::literal(slot)], source_span)
}

pub fn store_let(value: o::Expression, source_span: Option<ParseSourceSpan>) -> o::Expression {
    o::import_ref(Identifiers::store_let()).call_fn(vec![value], source_span)
}

pub fn read_context_let(slot: usize) -> o::Expression {
    call_expr(Identifiers::read_context_let(), vec![o::literal(slot)])
}

pub fn projection_def(def: Option<o::Expression>) -> o::Statement {
    call(Identifiers::projection_def(), def.into_iter().collect(), None)
}

/// The fallback view of a projection: function name, decls and vars.
#[derive(Debug, Clone)]
pub struct ProjectionFallback {
    pub fn_name: String,
    pub decls: usize,
    pub vars: usize,
}

pub fn projection(
    slot: usize,
    projection_slot_index: usize,
    attributes: Option<o::Expression>,
    fallback: Option<ProjectionFallback>,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![o::literal(slot)];
    if projection_slot_index != 0 || attributes.is_some() || fallback.is_some() {
        args.push(o::literal(projection_slot_index));
        let has_attributes = attributes.is_some();
        if let Some(attributes) = attributes {
            args.push(attributes);
        }
        if let Some(fallback) = fallback {
            if !has_attributes {
                args.push(o::null_expr());
            }
            args.push(o::variable(fallback.fn_name));
            args.push(o::literal(fallback.decls));
            args.push(o::literal(fallback.vars));
        }
    }
    call(Identifiers::projection(), args, source_span)
}

/// Arguments of the `ɵɵdefer` instruction.
#[derive(Debug, Clone)]
pub struct DeferArgs {
    pub slot: usize,
    pub primary_slot: usize,
    pub resolver_fn: Option<o::Expression>,
    pub loading_slot: Option<usize>,
    pub placeholder_slot: Option<usize>,
    pub error_slot: Option<usize>,
    pub loading_config: Option<o::Expression>,
    pub placeholder_config: Option<o::Expression>,
    pub enable_timer_scheduling: bool,
    pub flags: TDeferDetailsFlags,
}

pub fn defer(d: DeferArgs, source_span: Option<ParseSourceSpan>) -> o::Statement {
    let mut args = vec![
        o::literal(d.slot),
        o::literal(d.primary_slot),
        d.resolver_fn.unwrap_or_else(o::null_expr),
        opt_literal(d.loading_slot),
        opt_literal(d.placeholder_slot),
        opt_literal(d.error_slot),
        d.loading_config.unwrap_or_else(o::null_expr),
        d.placeholder_config.unwrap_or_else(o::null_expr),
        if d.enable_timer_scheduling {
            o::import_ref(Identifiers::defer_enable_timer_scheduling())
        } else {
            o::null_expr()
        },
        match d.flags {
            TDeferDetailsFlags::Default => o::null_expr(),
            flags => o::literal(flags as usize),
        },
    ];
    trim_trailing_nulls(&mut args);
    call(Identifiers::defer(), args, source_span)
}

pub fn defer_on(
    trigger: DeferTriggerKind,
    args: Vec<o::Expression>,
    modifier: DeferOpModifierKind,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    if trigger == DeferTriggerKind::Never {
        return call(Identifiers::defer_hydrate_never(), args, source_span);
    }
    let prefix = match modifier {
        DeferOpModifierKind::None => "",
        DeferOpModifierKind::Prefetch => "Prefetch",
        DeferOpModifierKind::Hydrate => "Hydrate",
    };
    let kind = match trigger {
        DeferTriggerKind::Idle => "Idle",
        DeferTriggerKind::Immediate => "Immediate",
        DeferTriggerKind::Timer => "Timer",
        DeferTriggerKind::Hover => "Hover",
        DeferTriggerKind::Interaction => "Interaction",
        DeferTriggerKind::Viewport => "Viewport",
        DeferTriggerKind::Never => "Never",
    };
    call(Identifiers::defer_on(prefix, kind), args, source_span)
}

pub fn defer_when(modifier: DeferOpModifierKind, expr: o::Expression, source_span: Option<ParseSourceSpan>) -> o::Statement {
    let instruction = match modifier {
        DeferOpModifierKind::None => Identifiers::defer_when(),
        DeferOpModifierKind::Prefetch => Identifiers::defer_prefetch_when(),
        DeferOpModifierKind::Hydrate => Identifiers::defer_hydrate_when(),
    };
    call(instruction, vec![expr], source_span)
}

/// The optional empty view of a repeater.
#[derive(Debug, Clone)]
pub struct RepeaterEmpty {
    pub fn_name: String,
    pub decls: usize,
    pub vars: usize,
    pub tag: Option<String>,
    pub const_index: Option<usize>,
}

#[allow(clippy::too_many_arguments)]
pub fn repeater_create(
    slot: usize,
    view_fn_name: String,
    decls: usize,
    vars: usize,
    tag: Option<String>,
    const_index: Option<usize>,
    track_by_fn: o::Expression,
    track_by_uses_component_instance: bool,
    empty: Option<RepeaterEmpty>,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![
        o::literal(slot),
        o::variable(view_fn_name),
        o::literal(decls),
        o::literal(vars),
        tag.map(o::literal).unwrap_or_else(o::null_expr),
        opt_literal(const_index),
        track_by_fn,
    ];
    if track_by_uses_component_instance || empty.is_some() {
        args.push(o::literal(track_by_uses_component_instance));
        if let Some(empty) = empty {
            args.push(o::variable(empty.fn_name));
            args.push(o::literal(empty.decls));
            args.push(o::literal(empty.vars));
            if empty.tag.is_some() || empty.const_index.is_some() {
                args.push(empty.tag.map(o::literal).unwrap_or_else(o::null_expr));
            }
            if let Some(const_index) = empty.const_index {
                args.push(o::literal(const_index));
            }
        }
    }
    call(Identifiers::repeater_create(), args, source_span)
}

pub fn repeater(collection: o::Expression, source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::repeater(), vec![collection], source_span)
}

pub fn conditional(
    condition: o::Expression,
    context_value: Option<o::Expression>,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![condition];
    args.extend(context_value);
    call(Identifiers::conditional(), args, source_span)
}

pub fn i18n_start(slot: usize, const_index: usize, source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::i18n_start(), vec![o::literal(slot), o::literal(const_index)], source_span)
}

pub fn i18n_end(source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::i18n_end(), vec![], source_span)
}

pub fn i18n_exp(expr: o::Expression, source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::i18n_exp(), vec![expr], source_span)
}

pub fn i18n_apply(slot: usize, source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::i18n_apply(), vec![o::literal(slot)], source_span)
}

pub fn property(
    name: &str,
    expression: o::Expression,
    sanitizer: Option<o::Expression>,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![o::literal(name), expression];
    args.extend(sanitizer);
    call(Identifiers::property(), args, source_span)
}

pub fn dom_property(
    name: &str,
    expression: o::Expression,
    sanitizer: Option<o::Expression>,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![o::literal(name), expression];
    args.extend(sanitizer);
    call(Identifiers::dom_property(), args, source_span)
}

pub fn two_way_property(
    name: &str,
    expression: o::Expression,
    sanitizer: Option<o::Expression>,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![o::literal(name), expression];
    args.extend(sanitizer);
    call(Identifiers::two_way_property(), args, source_span)
}

pub fn attribute(
    name: &str,
    expression: o::Expression,
    sanitizer: Option<o::Expression>,
    namespace: Option<&str>,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![o::literal(name), expression];
    if sanitizer.is_some() || namespace.is_some() {
        args.push(sanitizer.unwrap_or_else(o::null_expr));
    }
    if let Some(namespace) = namespace {
        args.push(o::literal(namespace));
    }
    call(Identifiers::attribute(), args, source_span)
}

pub fn style_prop(
    name: &str,
    expression: o::Expression,
    unit: Option<&str>,
    source_span: Option<ParseSourceSpan>,
) -> o::Statement {
    let mut args = vec![o::literal(name), expression];
    if let Some(unit) = unit {
        args.push(o::literal(unit));
    }
    call(Identifiers::style_prop(), args, source_span)
}

pub fn class_prop(name: &str, expression: o::Expression, source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::class_prop(), vec![o::literal(name), expression], source_span)
}

pub fn style_map(expression: o::Expression, source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::style_map(), vec![expression], source_span)
}

pub fn class_map(expression: o::Expression, source_span: Option<ParseSourceSpan>) -> o::Statement {
    call(Identifiers::class_map(), vec![expression], source_span)
}

pub fn text_interpolate(interpolation: Interpolation, source_span: Option<ParseSourceSpan>) -> Result<o::Statement> {
    let args = collate_interpolation_args(interpolation.strings, interpolation.expressions)?;
    call_variadic_instruction(&TEXT_INTERPOLATE_CONFIG, vec![], args, vec![], source_span)
}

pub fn property_interpolate(
    name: &str,
    interpolation: Interpolation,
    sanitizer: Option<o::Expression>,
    source_span: Option<ParseSourceSpan>,
) -> Result<o::Statement> {
    let args = collate_interpolation_args(interpolation.strings, interpolation.expressions)?;
    let extra = sanitizer.into_iter().collect();
    call_variadic_instruction(&PROPERTY_INTERPOLATE_CONFIG, vec![o::literal(name)], args, extra, source_span)
}

pub fn attribute_interpolate(
    name: &str,
    interpolation: Interpolation,
    sanitizer: Option<o::Expression>,
    namespace: Option<&str>,
    source_span: Option<ParseSourceSpan>,
) -> Result<o::Statement> {
    let args = collate_interpolation_args(interpolation.strings, interpolation.expressions)?;
    let mut extra = Vec::new();
    if sanitizer.is_some() || namespace.is_some() {
        extra.push(sanitizer.unwrap_or_else(o::null_expr));
    }
    if let Some(namespace) = namespace {
        extra.push(o::literal(namespace));
    }
    call_variadic_instruction(&ATTRIBUTE_INTERPOLATE_CONFIG, vec![o::literal(name)], args, extra, source_span)
}

pub fn style_prop_interpolate(
    name: &str,
    interpolation: Interpolation,
    unit: Option<&str>,
    source_span: Option<ParseSourceSpan>,
) -> Result<o::Statement> {
    let args = collate_interpolation_args(interpolation.strings, interpolation.expressions)?;
    let extra = unit.map(o::literal).into_iter().collect();
    call_variadic_instruction(&STYLE_PROP_INTERPOLATE_CONFIG, vec![o::literal(name)], args, extra, source_span)
}

pub fn style_map_interpolate(interpolation: Interpolation, source_span: Option<ParseSourceSpan>) -> Result<o::Statement> {
    let args = collate_interpolation_args(interpolation.strings, interpolation.expressions)?;
    call_variadic_instruction(&STYLE_MAP_INTERPOLATE_CONFIG, vec![], args, vec![], source_span)
}

pub fn class_map_interpolate(interpolation: Interpolation, source_span: Option<ParseSourceSpan>) -> Result<o::Statement> {
    let args = collate_interpolation_args(interpolation.strings, interpolation.expressions)?;
    call_variadic_instruction(&CLASS_MAP_INTERPOLATE_CONFIG, vec![], args, vec![], source_span)
}

pub fn pure_function(var_offset: usize, fn_: o::Expression, args: Vec<o::Expression>) -> Result<o::Expression> {
    call_variadic_instruction_expr(
        &PURE_FUNCTION_CONFIG,
        vec![o::literal(var_offset), fn_],
        args,
        vec![],
        None,
    )
}

pub const MAX_PIPE_BIND_ARITY: usize = 4;

pub fn pipe_bind(slot: usize, var_offset: usize, args: Vec<o::Expression>) -> Result<o::Expression> {
    if args.is_empty() || args.len() > MAX_PIPE_BIND_ARITY {
        return invariant(format!("pipeBind() argument count out of bounds: {}", args.len()));
    }
    let instruction = Identifiers::pipe_bind_n(args.len());
    let mut all_args = vec![o::literal(slot), o::literal(var_offset)];
    all_args.extend(args);
    Ok(call_expr(instruction, all_args))
}

pub fn pipe_bind_v(slot: usize, var_offset: usize, args: o::Expression) -> o::Expression {
    call_expr(Identifiers::pipe_bind_v(), vec![o::literal(slot), o::literal(var_offset), args])
}

/// Joins interpolation strings and expressions into one argument list.
///
/// A lone expression with empty strings on both sides collapses to `[expr]`.
pub fn collate_interpolation_args(strings: Vec<String>, expressions: Vec<o::Expression>) -> Result<Vec<o::Expression>> {
    if strings.is_empty() || expressions.len() + 1 != strings.len() {
        return invariant(format!(
            "expected specific shape of args for strings/expressions in interpolation: strings={}, expressions={}",
            strings.len(),
            expressions.len()
        ));
    }
    if expressions.len() == 1 && strings[0].is_empty() && strings[1].is_empty() {
        return Ok(expressions);
    }
    let mut args = Vec::with_capacity(strings.len() + expressions.len());
    let mut strings = strings.into_iter();
    for expr in expressions {
        args.push(o::literal(strings.next().unwrap_or_default()));
        args.push(expr);
    }
    args.push(o::literal(strings.next().unwrap_or_default()));
    Ok(args)
}

/// Describes a family of instructions with fixed-arity variants and a variadic fallback.
pub struct VariadicInstructionConfig {
    /// The fixed-arity variant for a mapped argument count.
    pub constant: fn(usize) -> ExternalReference,
    /// Number of fixed-arity variants.
    pub constant_count: usize,
    pub variable: fn() -> ExternalReference,
    /// Maps the number of variadic arguments to the index of the fixed-arity variant.
    pub mapping: fn(usize) -> usize,
}

fn interpolation_mapping(n: usize) -> usize {
    n.saturating_sub(1) / 2
}

fn identity_mapping(n: usize) -> usize {
    n
}

pub static TEXT_INTERPOLATE_CONFIG: VariadicInstructionConfig = VariadicInstructionConfig {
    constant: Identifiers::text_interpolate_n,
    constant_count: 9,
    variable: Identifiers::text_interpolate_v,
    mapping: interpolation_mapping,
};

pub static PROPERTY_INTERPOLATE_CONFIG: VariadicInstructionConfig = VariadicInstructionConfig {
    constant: Identifiers::property_interpolate_n,
    constant_count: 9,
    variable: Identifiers::property_interpolate_v,
    mapping: interpolation_mapping,
};

pub static ATTRIBUTE_INTERPOLATE_CONFIG: VariadicInstructionConfig = VariadicInstructionConfig {
    constant: Identifiers::attribute_interpolate_n,
    constant_count: 9,
    variable: Identifiers::attribute_interpolate_v,
    mapping: interpolation_mapping,
};

pub static STYLE_PROP_INTERPOLATE_CONFIG: VariadicInstructionConfig = VariadicInstructionConfig {
    constant: Identifiers::style_prop_interpolate_n,
    constant_count: 9,
    variable: Identifiers::style_prop_interpolate_v,
    mapping: interpolation_mapping,
};

pub static STYLE_MAP_INTERPOLATE_CONFIG: VariadicInstructionConfig = VariadicInstructionConfig {
    constant: Identifiers::style_map_interpolate_n,
    constant_count: 9,
    variable: Identifiers::style_map_interpolate_v,
    mapping: interpolation_mapping,
};

pub static CLASS_MAP_INTERPOLATE_CONFIG: VariadicInstructionConfig = VariadicInstructionConfig {
    constant: Identifiers::class_map_interpolate_n,
    constant_count: 9,
    variable: Identifiers::class_map_interpolate_v,
    mapping: interpolation_mapping,
};

pub static PURE_FUNCTION_CONFIG: VariadicInstructionConfig = VariadicInstructionConfig {
    constant: Identifiers::pure_function_n,
    constant_count: 9,
    variable: Identifiers::pure_function_v,
    mapping: identity_mapping,
};

fn call_variadic_instruction_expr(
    config: &VariadicInstructionConfig,
    base_args: Vec<o::Expression>,
    mut interpolation_args: Vec<o::Expression>,
    extra_args: Vec<o::Expression>,
    source_span: Option<ParseSourceSpan>,
) -> Result<o::Expression> {
    // The arity is decided before a trailing empty string is dropped; the runtime defaults it.
    let n = (config.mapping)(interpolation_args.len());
    let ends_with_empty_string = matches!(
        interpolation_args.last(),
        Some(o::Expression::Literal(lit)) if lit.value == o::LiteralValue::String(String::new())
    );
    if extra_args.is_empty() && interpolation_args.len() > 1 && ends_with_empty_string {
        interpolation_args.pop();
    }

    let mut args = base_args;
    let instruction = if n < config.constant_count {
        args.extend(interpolation_args);
        (config.constant)(n)
    } else {
        args.push(o::literal_arr(interpolation_args));
        (config.variable)()
    };
    args.extend(extra_args);
    Ok(o::import_ref(instruction).call_fn(args, source_span))
}

fn call_variadic_instruction(
    config: &VariadicInstructionConfig,
    base_args: Vec<o::Expression>,
    interpolation_args: Vec<o::Expression>,
    extra_args: Vec<o::Expression>,
    source_span: Option<ParseSourceSpan>,
) -> Result<o::Statement> {
    let expr = call_variadic_instruction_expr(config, base_args, interpolation_args, extra_args, source_span.clone())?;
    Ok(o::Statement::Expression(o::ExpressionStatement {
        expr: Box::new(expr),
        source_span,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callee(stmt: &o::Statement) -> (String, usize) {
        match stmt {
            o::Statement::Expression(s) => match s.expr.as_ref() {
                o::Expression::InvokeFn(call) => match call.fn_.as_ref() {
                    o::Expression::External(ext) => (ext.value.name.clone().unwrap_or_default(), call.args.len()),
                    _ => panic!("not an external call"),
                },
                _ => panic!("not a call"),
            },
            _ => panic!("not an expression statement"),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lone_expression_collapses() {
        let args = collate_interpolation_args(strings(&["", ""]), vec![o::variable("x")]).unwrap();
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn mismatched_interpolation_is_rejected() {
        assert!(collate_interpolation_args(strings(&["a"]), vec![o::variable("x")]).is_err());
    }

    #[test]
    fn text_interpolation_picks_arity_and_drops_trailing_empty_string() {
        let interp = Interpolation::new(strings(&["a", ""]), vec![o::variable("x")], vec![]);
        let (name, argc) = callee(&text_interpolate(interp, None).unwrap());
        assert_eq!(name, "ɵɵtextInterpolate1");
        assert_eq!(argc, 2);

        let interp = Interpolation::new(strings(&["", ""]), vec![o::variable("x")], vec![]);
        assert_eq!(callee(&text_interpolate(interp, None).unwrap()).0, "ɵɵtextInterpolate");
    }

    #[test]
    fn nine_expressions_use_the_variadic_form() {
        let exprs: Vec<_> = (0..9).map(|i| o::variable(format!("v{}", i))).collect();
        let interp = Interpolation::new(vec!["-".to_string(); 10], exprs, vec![]);
        let (name, argc) = callee(&text_interpolate(interp, None).unwrap());
        assert_eq!(name, "ɵɵtextInterpolateV");
        assert_eq!(argc, 1);
    }

    #[test]
    fn advance_by_one_has_no_argument() {
        assert_eq!(callee(&advance(1, None)).1, 0);
        assert_eq!(callee(&advance(3, None)).1, 1);
    }

    #[test]
    fn template_trims_trailing_nulls() {
        let stmt = template(
            TemplateArgs {
                slot: 0,
                fn_name: "Cmp_ng_template_0_Template".to_string(),
                decls: 1,
                vars: 0,
                tag: None,
                const_index: None,
                local_ref_index: None,
            },
            false,
            None,
        );
        assert_eq!(callee(&stmt), ("ɵɵtemplate".to_string(), 4));
    }

    #[test]
    fn pure_functions_past_eight_arguments_are_variadic() {
        let args: Vec<_> = (0..9).map(|i| o::variable(format!("a{}", i))).collect();
        let expr = pure_function(0, o::variable("_c0"), args).unwrap();
        match expr {
            o::Expression::InvokeFn(call) => {
                assert_eq!(call.args.len(), 3);
                assert!(matches!(call.fn_.as_ref(), o::Expression::External(e) if e.value.name.as_deref() == Some("ɵɵpureFunctionV")));
            }
            _ => panic!("expected a call"),
        }
    }

    #[test]
    fn defer_triggers_map_to_modifier_specific_instructions() {
        let stmt = defer_on(DeferTriggerKind::Idle, vec![], DeferOpModifierKind::Hydrate, None);
        assert_eq!(callee(&stmt).0, "ɵɵdeferHydrateOnIdle");
        let stmt = defer_on(DeferTriggerKind::Never, vec![], DeferOpModifierKind::Hydrate, None);
        assert_eq!(callee(&stmt).0, "ɵɵdeferHydrateNever");
    }
}
