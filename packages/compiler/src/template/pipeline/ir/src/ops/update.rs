//! Update Operations
//!
//! Ops of a view's update list, executed on every change detection pass.

use crate::core::SecurityContext;
use crate::output::output_ast::Expression;
use crate::parse_util::ParseSourceSpan;
use crate::template::pipeline::ir::enums::{BindingKind, DeferOpModifierKind, OpKind, TemplateKind};
use crate::template::pipeline::ir::expression::{
    transform_expression_in_place, transform_expressions_in_interpolation, ConditionalCaseExpr,
    ExpressionTransform, TransformExpressions, VisitorContextFlag,
};
use crate::template::pipeline::ir::handle::{SlotHandle, XrefId};
use crate::template::pipeline::ir::operations::Op;
use crate::template::pipeline::ir::ops::shared::{StatementOp, VariableOp};

/// A logical interpolation: static strings around dynamic expressions.
///
/// Always holds one more string than expressions.
#[derive(Debug, Clone)]
pub struct Interpolation {
    pub strings: Vec<String>,
    pub expressions: Vec<Expression>,
    pub i18n_placeholders: Vec<String>,
}

impl Interpolation {
    pub fn new(strings: Vec<String>, expressions: Vec<Expression>, i18n_placeholders: Vec<String>) -> Self {
        Interpolation {
            strings,
            expressions,
            i18n_placeholders,
        }
    }

    /// `{{x}}` with nothing around it.
    pub fn is_singleton(&self) -> bool {
        self.expressions.len() == 1
            && self.strings.len() == 2
            && self.strings.iter().all(String::is_empty)
    }
}

/// The value of a binding: a single expression or an interpolation.
#[derive(Debug, Clone)]
pub enum BindingExpression {
    Expression(Expression),
    Interpolation(Interpolation),
}

impl BindingExpression {
    fn transform(&mut self, transform: &mut ExpressionTransform<'_>, flags: VisitorContextFlag) {
        match self {
            BindingExpression::Expression(expr) => transform_expression_in_place(expr, transform, flags),
            BindingExpression::Interpolation(interp) => {
                transform_expressions_in_interpolation(interp, transform, flags)
            }
        }
    }

    pub fn is_empty_expression(&self) -> bool {
        matches!(self, BindingExpression::Expression(Expression::Empty(_)))
    }
}

/// An intermediate binding, not yet specialized into a concrete instruction.
#[derive(Debug, Clone)]
pub struct BindingOp {
    /// Reference to the element on which the property is bound.
    pub target: XrefId,
    pub kind: BindingKind,
    /// The name of the bound property, attribute, class or style.
    pub name: String,
    pub expression: BindingExpression,
    /// The unit of a bound style value (`px` in `[style.width.px]`).
    pub unit: Option<String>,
    pub security_context: SecurityContext,
    /// Whether the binding is a static text attribute (`<div a="b">`).
    pub is_text_attribute: bool,
    pub is_structural_template_attribute: bool,
    pub template_kind: Option<TemplateKind>,
    pub source_span: ParseSourceSpan,
}

/// A binding to a property, DOM property or the property half of a two-way binding.
#[derive(Debug, Clone)]
pub struct PropertyOp {
    pub target: XrefId,
    pub name: String,
    pub expression: BindingExpression,
    pub binding_kind: BindingKind,
    pub security_context: SecurityContext,
    /// The sanitizer function reference, filled by sanitizer resolution.
    pub sanitizer: Option<Expression>,
    pub is_structural_template_attribute: bool,
    pub template_kind: Option<TemplateKind>,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct AttributeOp {
    pub target: XrefId,
    pub namespace: Option<String>,
    pub name: String,
    pub expression: BindingExpression,
    pub security_context: SecurityContext,
    pub sanitizer: Option<Expression>,
    pub is_text_attribute: bool,
    pub is_structural_template_attribute: bool,
    pub template_kind: Option<TemplateKind>,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct StylePropOp {
    pub target: XrefId,
    pub name: String,
    pub expression: BindingExpression,
    pub unit: Option<String>,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct ClassPropOp {
    pub target: XrefId,
    pub name: String,
    pub expression: Expression,
    pub source_span: ParseSourceSpan,
}

/// A `[style]` or `[class]` map binding.
#[derive(Debug, Clone)]
pub struct MapBindingOp {
    pub target: XrefId,
    pub expression: BindingExpression,
    pub source_span: ParseSourceSpan,
}

/// Interpolates text into the text node created by a `Text` op.
#[derive(Debug, Clone)]
pub struct InterpolateTextOp {
    /// Reference to the text node to which the interpolation is bound.
    pub target: XrefId,
    pub interpolation: Interpolation,
    pub source_span: ParseSourceSpan,
}

/// Advances the runtime's implicit slot context by `delta`.
#[derive(Debug, Clone)]
pub struct AdvanceOp {
    pub delta: usize,
    pub source_span: Option<ParseSourceSpan>,
}

/// Displays the branch of an `@if`/`@switch` whose condition matches.
#[derive(Debug, Clone)]
pub struct ConditionalOp {
    /// The create op of the first branch; conditional instructions run in its slot context.
    pub target: XrefId,
    /// The subject of a `@switch`, compared against each case.
    pub test: Option<Expression>,
    pub conditions: Vec<ConditionalCaseExpr>,
    /// The single expression selecting a branch slot, built from `conditions`.
    pub processed: Option<Expression>,
    /// The value made available to an aliased branch (`@if (x; as y)`).
    pub context_value: Option<Expression>,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct RepeaterOp {
    /// The `RepeaterCreate` op this collection belongs to.
    pub target: XrefId,
    pub target_slot: SlotHandle,
    pub collection: Expression,
    pub source_span: ParseSourceSpan,
}

/// A `when <expr>` trigger of a `@defer` block.
#[derive(Debug, Clone)]
pub struct DeferWhenOp {
    pub target: XrefId,
    pub expr: Expression,
    pub modifier: DeferOpModifierKind,
    pub source_span: ParseSourceSpan,
}

/// An expression used in an i18n block or ICU.
#[derive(Debug, Clone)]
pub struct I18nExpressionOp {
    /// The i18n block the expression belongs to.
    pub target: XrefId,
    pub expression: Expression,
    pub i18n_placeholder: String,
    pub source_span: ParseSourceSpan,
}

/// Applies the i18n expressions preceding it to the block in `target`.
#[derive(Debug, Clone)]
pub struct I18nApplyOp {
    pub target: XrefId,
    pub handle: SlotHandle,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone)]
pub struct StoreLetOp {
    /// The `DeclareLet` op whose slot holds the value.
    pub target: XrefId,
    pub declared_name: String,
    pub value: Expression,
    pub source_span: ParseSourceSpan,
}

/// All ops that can appear in an update list or a listener handler.
#[derive(Debug, Clone)]
pub enum UpdateOp {
    Statement(StatementOp),
    Variable(VariableOp),
    Binding(BindingOp),
    Property(PropertyOp),
    DomProperty(PropertyOp),
    TwoWayProperty(PropertyOp),
    Attribute(AttributeOp),
    StyleProp(StylePropOp),
    ClassProp(ClassPropOp),
    StyleMap(MapBindingOp),
    ClassMap(MapBindingOp),
    InterpolateText(InterpolateTextOp),
    Advance(AdvanceOp),
    Conditional(ConditionalOp),
    Repeater(RepeaterOp),
    DeferWhen(DeferWhenOp),
    I18nExpression(I18nExpressionOp),
    I18nApply(I18nApplyOp),
    StoreLet(StoreLetOp),
}

impl Op for UpdateOp {
    fn kind(&self) -> OpKind {
        match self {
            UpdateOp::Statement(_) => OpKind::Statement,
            UpdateOp::Variable(_) => OpKind::Variable,
            UpdateOp::Binding(_) => OpKind::Binding,
            UpdateOp::Property(_) => OpKind::Property,
            UpdateOp::DomProperty(_) => OpKind::DomProperty,
            UpdateOp::TwoWayProperty(_) => OpKind::TwoWayProperty,
            UpdateOp::Attribute(_) => OpKind::Attribute,
            UpdateOp::StyleProp(_) => OpKind::StyleProp,
            UpdateOp::ClassProp(_) => OpKind::ClassProp,
            UpdateOp::StyleMap(_) => OpKind::StyleMap,
            UpdateOp::ClassMap(_) => OpKind::ClassMap,
            UpdateOp::InterpolateText(_) => OpKind::InterpolateText,
            UpdateOp::Advance(_) => OpKind::Advance,
            UpdateOp::Conditional(_) => OpKind::Conditional,
            UpdateOp::Repeater(_) => OpKind::Repeater,
            UpdateOp::DeferWhen(_) => OpKind::DeferWhen,
            UpdateOp::I18nExpression(_) => OpKind::I18nExpression,
            UpdateOp::I18nApply(_) => OpKind::I18nApply,
            UpdateOp::StoreLet(_) => OpKind::StoreLet,
        }
    }
}

impl UpdateOp {
    /// The op whose slot the runtime's implicit slot context must point at before this op runs.
    pub fn depends_on_slot_context(&self) -> Option<XrefId> {
        match self {
            UpdateOp::Binding(op) => Some(op.target),
            UpdateOp::Property(op) | UpdateOp::DomProperty(op) | UpdateOp::TwoWayProperty(op) => {
                Some(op.target)
            }
            UpdateOp::Attribute(op) => Some(op.target),
            UpdateOp::StyleProp(op) => Some(op.target),
            UpdateOp::ClassProp(op) => Some(op.target),
            UpdateOp::StyleMap(op) | UpdateOp::ClassMap(op) => Some(op.target),
            UpdateOp::InterpolateText(op) => Some(op.target),
            UpdateOp::Conditional(op) => Some(op.target),
            UpdateOp::Repeater(op) => Some(op.target),
            UpdateOp::DeferWhen(op) => Some(op.target),
            UpdateOp::I18nExpression(op) => Some(op.target),
            UpdateOp::StoreLet(op) => Some(op.target),
            UpdateOp::Statement(_)
            | UpdateOp::Variable(_)
            | UpdateOp::Advance(_)
            | UpdateOp::I18nApply(_) => None,
        }
    }

    pub fn source_span(&self) -> Option<&ParseSourceSpan> {
        match self {
            UpdateOp::Binding(op) => Some(&op.source_span),
            UpdateOp::Property(op) | UpdateOp::DomProperty(op) | UpdateOp::TwoWayProperty(op) => {
                Some(&op.source_span)
            }
            UpdateOp::Attribute(op) => Some(&op.source_span),
            UpdateOp::StyleProp(op) => Some(&op.source_span),
            UpdateOp::ClassProp(op) => Some(&op.source_span),
            UpdateOp::StyleMap(op) | UpdateOp::ClassMap(op) => Some(&op.source_span),
            UpdateOp::InterpolateText(op) => Some(&op.source_span),
            UpdateOp::Advance(op) => op.source_span.as_ref(),
            UpdateOp::Conditional(op) => Some(&op.source_span),
            UpdateOp::Repeater(op) => Some(&op.source_span),
            UpdateOp::DeferWhen(op) => Some(&op.source_span),
            UpdateOp::I18nExpression(op) => Some(&op.source_span),
            UpdateOp::I18nApply(op) => Some(&op.source_span),
            UpdateOp::StoreLet(op) => Some(&op.source_span),
            UpdateOp::Statement(_) | UpdateOp::Variable(_) => None,
        }
    }
}

impl TransformExpressions for UpdateOp {
    fn transform_expressions(&mut self, transform: &mut ExpressionTransform<'_>, flags: VisitorContextFlag) {
        match self {
            UpdateOp::Statement(op) => op.transform_expressions(transform, flags),
            UpdateOp::Variable(op) => op.transform_expressions(transform, flags),
            UpdateOp::Binding(op) => op.expression.transform(transform, flags),
            UpdateOp::Property(op) | UpdateOp::DomProperty(op) | UpdateOp::TwoWayProperty(op) => {
                op.expression.transform(transform, flags);
                if let Some(sanitizer) = &mut op.sanitizer {
                    transform_expression_in_place(sanitizer, transform, flags);
                }
            }
            UpdateOp::Attribute(op) => {
                op.expression.transform(transform, flags);
                if let Some(sanitizer) = &mut op.sanitizer {
                    transform_expression_in_place(sanitizer, transform, flags);
                }
            }
            UpdateOp::StyleProp(op) => op.expression.transform(transform, flags),
            UpdateOp::ClassProp(op) => transform_expression_in_place(&mut op.expression, transform, flags),
            UpdateOp::StyleMap(op) | UpdateOp::ClassMap(op) => op.expression.transform(transform, flags),
            UpdateOp::InterpolateText(op) => {
                transform_expressions_in_interpolation(&mut op.interpolation, transform, flags)
            }
            UpdateOp::Conditional(op) => {
                if let Some(test) = &mut op.test {
                    transform_expression_in_place(test, transform, flags);
                }
                for condition in &mut op.conditions {
                    if let Some(expr) = &mut condition.expr {
                        transform_expression_in_place(expr, transform, flags);
                    }
                }
                if let Some(processed) = &mut op.processed {
                    transform_expression_in_place(processed, transform, flags);
                }
                if let Some(context_value) = &mut op.context_value {
                    transform_expression_in_place(context_value, transform, flags);
                }
            }
            UpdateOp::Repeater(op) => transform_expression_in_place(&mut op.collection, transform, flags),
            UpdateOp::DeferWhen(op) => transform_expression_in_place(&mut op.expr, transform, flags),
            UpdateOp::I18nExpression(op) => {
                transform_expression_in_place(&mut op.expression, transform, flags)
            }
            UpdateOp::StoreLet(op) => transform_expression_in_place(&mut op.value, transform, flags),
            UpdateOp::Advance(_) | UpdateOp::I18nApply(_) => {}
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn create_binding_op(
    target: XrefId,
    kind: BindingKind,
    name: impl Into<String>,
    expression: BindingExpression,
    unit: Option<String>,
    security_context: SecurityContext,
    is_text_attribute: bool,
    is_structural_template_attribute: bool,
    template_kind: Option<TemplateKind>,
    source_span: ParseSourceSpan,
) -> UpdateOp {
    UpdateOp::Binding(BindingOp {
        target,
        kind,
        name: name.into(),
        expression,
        unit,
        security_context,
        is_text_attribute,
        is_structural_template_attribute,
        template_kind,
        source_span,
    })
}

pub fn create_interpolate_text_op(
    target: XrefId,
    interpolation: Interpolation,
    source_span: ParseSourceSpan,
) -> UpdateOp {
    UpdateOp::InterpolateText(InterpolateTextOp {
        target,
        interpolation,
        source_span,
    })
}

pub fn create_advance_op(delta: usize, source_span: Option<ParseSourceSpan>) -> UpdateOp {
    UpdateOp::Advance(AdvanceOp { delta, source_span })
}

pub fn create_conditional_op(
    target: XrefId,
    test: Option<Expression>,
    conditions: Vec<ConditionalCaseExpr>,
    source_span: ParseSourceSpan,
) -> UpdateOp {
    UpdateOp::Conditional(ConditionalOp {
        target,
        test,
        conditions,
        processed: None,
        context_value: None,
        source_span,
    })
}

pub fn create_repeater_op(target: XrefId, collection: Expression, source_span: ParseSourceSpan) -> UpdateOp {
    UpdateOp::Repeater(RepeaterOp {
        target,
        target_slot: SlotHandle::new(target),
        collection,
        source_span,
    })
}

pub fn create_defer_when_op(
    target: XrefId,
    expr: Expression,
    modifier: DeferOpModifierKind,
    source_span: ParseSourceSpan,
) -> UpdateOp {
    UpdateOp::DeferWhen(DeferWhenOp {
        target,
        expr,
        modifier,
        source_span,
    })
}

pub fn create_i18n_expression_op(
    target: XrefId,
    expression: Expression,
    i18n_placeholder: impl Into<String>,
    source_span: ParseSourceSpan,
) -> UpdateOp {
    UpdateOp::I18nExpression(I18nExpressionOp {
        target,
        expression,
        i18n_placeholder: i18n_placeholder.into(),
        source_span,
    })
}

pub fn create_i18n_apply_op(target: XrefId, source_span: ParseSourceSpan) -> UpdateOp {
    UpdateOp::I18nApply(I18nApplyOp {
        target,
        handle: SlotHandle::new(target),
        source_span,
    })
}

pub fn create_store_let_op(
    target: XrefId,
    declared_name: impl Into<String>,
    value: Expression,
    source_span: ParseSourceSpan,
) -> UpdateOp {
    UpdateOp::StoreLet(StoreLetOp {
        target,
        declared_name: declared_name.into(),
        value,
        source_span,
    })
}
