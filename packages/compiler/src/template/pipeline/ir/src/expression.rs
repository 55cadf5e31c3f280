//! IR Expressions
//!
//! Logical expressions that only exist inside the pipeline, and the helpers passes use to
//! rewrite expressions nested anywhere inside an op.

use bitflags::bitflags;

use crate::output::output_ast::{ArrowFunctionBody, Expression, LiteralValue, Statement};
use crate::parse_util::ParseSourceSpan;
use crate::template::pipeline::ir::handle::{SlotHandle, XrefId};
use crate::template::pipeline::ir::ops::update::Interpolation;

bitflags! {
    /// Flags for visitor context when transforming expressions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VisitorContextFlag: u32 {
        const NONE = 0b0000;
        /// Set while visiting a nested op (listener handler) or a pure function body.
        const IN_CHILD_OPERATION = 0b0001;
    }
}

/// Transformer which converts expressions into general `Expression`s (which may be an
/// identity transformation).
pub type ExpressionTransform<'a> = dyn FnMut(Expression, VisitorContextFlag) -> Expression + 'a;

/// Check whether a given `Expression` is a logical IR expression type.
pub fn is_ir_expression(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::LexicalRead(_)
            | Expression::Reference(_)
            | Expression::Context(_)
            | Expression::TrackContext(_)
            | Expression::NextContext(_)
            | Expression::GetCurrentView(_)
            | Expression::RestoreView(_)
            | Expression::ResetView(_)
            | Expression::ReadVariable(_)
            | Expression::PureFunction(_)
            | Expression::PureFunctionParameter(_)
            | Expression::PipeBinding(_)
            | Expression::PipeBindingVariadic(_)
            | Expression::SafePropertyRead(_)
            | Expression::SafeKeyedRead(_)
            | Expression::SafeInvokeFunction(_)
            | Expression::SafeTernary(_)
            | Expression::Empty(_)
            | Expression::AssignTemporary(_)
            | Expression::ReadTemporary(_)
            | Expression::SlotLiteral(_)
            | Expression::ConditionalCase(_)
            | Expression::TwoWayBindingSet(_)
            | Expression::ContextLetReference(_)
    )
}

/// Logical expression representing a lexical read of a variable name.
#[derive(Debug, Clone)]
pub struct LexicalReadExpr {
    pub name: String,
    pub source_span: Option<ParseSourceSpan>,
}

impl LexicalReadExpr {
    pub fn new(name: impl Into<String>) -> Self {
        LexicalReadExpr {
            name: name.into(),
            source_span: None,
        }
    }
}

/// Runtime operation to retrieve the value of a local reference.
#[derive(Debug, Clone)]
pub struct ReferenceExpr {
    pub target: XrefId,
    pub target_slot: SlotHandle,
    /// Index of the reference among the local refs of its target.
    pub offset: usize,
}

impl ReferenceExpr {
    pub fn new(target: XrefId, offset: usize) -> Self {
        ReferenceExpr {
            target,
            target_slot: SlotHandle::new(target),
            offset,
        }
    }
}

/// A reference to the current view context (usually the `ctx` variable in a template function).
#[derive(Debug, Clone)]
pub struct ContextExpr {
    pub view: XrefId,
}

impl ContextExpr {
    pub fn new(view: XrefId) -> Self {
        ContextExpr { view }
    }
}

/// A reference to the current view context inside a track function.
#[derive(Debug, Clone)]
pub struct TrackContextExpr {
    pub view: XrefId,
}

/// Runtime operation to navigate to the next view context in the view hierarchy.
#[derive(Debug, Clone)]
pub struct NextContextExpr {
    pub steps: usize,
}

impl Default for NextContextExpr {
    fn default() -> Self {
        NextContextExpr { steps: 1 }
    }
}

/// Runtime operation to snapshot the current view context.
#[derive(Debug, Clone, Default)]
pub struct GetCurrentViewExpr;

/// Either a view xref (before context resolution) or the expression reading its saved state.
#[derive(Debug, Clone)]
pub enum EitherXrefIdOrExpression {
    XrefId(XrefId),
    Expression(Box<Expression>),
}

/// Runtime operation to restore a snapshotted view.
#[derive(Debug, Clone)]
pub struct RestoreViewExpr {
    pub view: EitherXrefIdOrExpression,
}

impl RestoreViewExpr {
    pub fn new(view: XrefId) -> Self {
        RestoreViewExpr {
            view: EitherXrefIdOrExpression::XrefId(view),
        }
    }
}

/// Runtime operation to reset the current view context after `RestoreView`.
#[derive(Debug, Clone)]
pub struct ResetViewExpr {
    pub expr: Box<Expression>,
}

impl ResetViewExpr {
    pub fn new(expr: Expression) -> Self {
        ResetViewExpr {
            expr: Box::new(expr),
        }
    }
}

/// Read of a variable declared as an `ir.VariableOp` and referenced through its `XrefId`.
#[derive(Debug, Clone)]
pub struct ReadVariableExpr {
    pub xref: XrefId,
    pub name: Option<String>,
}

impl ReadVariableExpr {
    pub fn new(xref: XrefId) -> Self {
        ReadVariableExpr { xref, name: None }
    }
}

/// Defines and calls a function with change-detected arguments.
#[derive(Debug, Clone)]
pub struct PureFunctionExpr {
    pub var_offset: Option<usize>,
    /// The expression which should be memoized as a pure computation.
    /// This expression contains internal `PureFunctionParameterExpr`s, which are placeholders for the
    /// positional argument expressions in `args`.
    pub body: Option<Box<Expression>>,
    /// Positional arguments to the pure function which will memoize the `body` expression, which act
    /// as memoization keys.
    pub args: Vec<Expression>,
    /// Once extracted to the `ConstantPool`, a reference to the function which defines the computation
    /// of `body`.
    pub fn_: Option<Box<Expression>>,
}

impl PureFunctionExpr {
    pub fn new(body: Expression, args: Vec<Expression>) -> Self {
        PureFunctionExpr {
            var_offset: None,
            body: Some(Box::new(body)),
            args,
            fn_: None,
        }
    }
}

/// Indicates a positional parameter to a pure function definition.
#[derive(Debug, Clone)]
pub struct PureFunctionParameterExpr {
    pub index: usize,
}

/// Binding to a pipe transformation.
#[derive(Debug, Clone)]
pub struct PipeBindingExpr {
    pub target: XrefId,
    pub target_slot: SlotHandle,
    pub name: String,
    pub args: Vec<Expression>,
    pub var_offset: Option<usize>,
}

impl PipeBindingExpr {
    pub fn new(target: XrefId, name: impl Into<String>, args: Vec<Expression>) -> Self {
        PipeBindingExpr {
            target,
            target_slot: SlotHandle::new(target),
            name: name.into(),
            args,
            var_offset: None,
        }
    }
}

/// Binding to a pipe with more arguments than the fixed-arity instructions accept.
#[derive(Debug, Clone)]
pub struct PipeBindingVariadicExpr {
    pub target: XrefId,
    pub target_slot: SlotHandle,
    pub name: String,
    /// A literal array of the pipe's arguments.
    pub args: Box<Expression>,
    pub num_args: usize,
    pub var_offset: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SafePropertyReadExpr {
    pub receiver: Box<Expression>,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SafeKeyedReadExpr {
    pub receiver: Box<Expression>,
    pub index: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct SafeInvokeFunctionExpr {
    pub receiver: Box<Expression>,
    pub args: Vec<Expression>,
}

/// `guard == null ? null : expr`, produced while expanding safe navigation.
#[derive(Debug, Clone)]
pub struct SafeTernaryExpr {
    pub guard: Box<Expression>,
    pub expr: Box<Expression>,
}

/// An empty expression that will be stripped before generating the final output.
#[derive(Debug, Clone, Default)]
pub struct EmptyExpr {
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct AssignTemporaryExpr {
    pub expr: Box<Expression>,
    pub xref: XrefId,
    pub name: Option<String>,
}

impl AssignTemporaryExpr {
    pub fn new(expr: Expression, xref: XrefId) -> Self {
        AssignTemporaryExpr {
            expr: Box::new(expr),
            xref,
            name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadTemporaryExpr {
    pub xref: XrefId,
    pub name: Option<String>,
}

impl ReadTemporaryExpr {
    pub fn new(xref: XrefId) -> Self {
        ReadTemporaryExpr { xref, name: None }
    }
}

/// The slot of an op as a literal number, once slots are allocated.
#[derive(Debug, Clone)]
pub struct SlotLiteralExpr {
    pub target: XrefId,
    pub slot: SlotHandle,
}

impl SlotLiteralExpr {
    pub fn new(target: XrefId) -> Self {
        SlotLiteralExpr {
            target,
            slot: SlotHandle::new(target),
        }
    }
}

/// A test case in a conditional instruction.
#[derive(Debug, Clone)]
pub struct ConditionalCaseExpr {
    /// The expression to be tested for this case. Might be `None`, as in an `else` case.
    pub expr: Option<Box<Expression>>,
    /// The xref of the view to be displayed if this condition is true.
    pub target: XrefId,
    pub target_slot: SlotHandle,
    /// Name of the alias (`@if (x; as y)`) bound to the matched value, if any.
    pub alias: Option<String>,
}

impl ConditionalCaseExpr {
    pub fn new(expr: Option<Expression>, target: XrefId, alias: Option<String>) -> Self {
        ConditionalCaseExpr {
            expr: expr.map(Box::new),
            target,
            target_slot: SlotHandle::new(target),
            alias,
        }
    }
}

/// The write half of a two-way binding, `target = value`.
#[derive(Debug, Clone)]
pub struct TwoWayBindingSetExpr {
    pub target: Box<Expression>,
    pub value: Box<Expression>,
}

/// A reference to a `@let` declaration read from a parent view or a callback.
#[derive(Debug, Clone)]
pub struct ContextLetReferenceExpr {
    pub target: XrefId,
    pub target_slot: SlotHandle,
}

impl ContextLetReferenceExpr {
    pub fn new(target: XrefId) -> Self {
        ContextLetReferenceExpr {
            target,
            target_slot: SlotHandle::new(target),
        }
    }
}

/// Implemented by ops (and anything else) that hold expressions passes may rewrite.
pub trait TransformExpressions {
    fn transform_expressions(&mut self, transform: &mut ExpressionTransform<'_>, flags: VisitorContextFlag);
}

pub fn transform_expression_in_place(
    slot: &mut Expression,
    transform: &mut ExpressionTransform<'_>,
    flags: VisitorContextFlag,
) {
    let expr = std::mem::replace(slot, Expression::Empty(EmptyExpr::default()));
    *slot = transform_expressions_in_expression(expr, transform, flags);
}

fn transform_all(
    exprs: &mut [Expression],
    transform: &mut ExpressionTransform<'_>,
    flags: VisitorContextFlag,
) {
    for expr in exprs {
        transform_expression_in_place(expr, transform, flags);
    }
}

pub fn transform_expressions_in_interpolation(
    interpolation: &mut Interpolation,
    transform: &mut ExpressionTransform<'_>,
    flags: VisitorContextFlag,
) {
    transform_all(&mut interpolation.expressions, transform, flags);
}

/// Transform all `Expression`s in the AST of `expr` with the `transform` function.
///
/// Children are transformed before their parent, so `transform` sees a node whose
/// subexpressions have already been rewritten.
pub fn transform_expressions_in_expression(
    mut expr: Expression,
    transform: &mut ExpressionTransform<'_>,
    flags: VisitorContextFlag,
) -> Expression {
    match &mut expr {
        Expression::BinaryOp(e) => {
            transform_expression_in_place(&mut e.lhs, transform, flags);
            transform_expression_in_place(&mut e.rhs, transform, flags);
        }
        Expression::Unary(e) => transform_expression_in_place(&mut e.expr, transform, flags),
        Expression::ReadProp(e) => transform_expression_in_place(&mut e.receiver, transform, flags),
        Expression::ReadKey(e) => {
            transform_expression_in_place(&mut e.receiver, transform, flags);
            transform_expression_in_place(&mut e.index, transform, flags);
        }
        Expression::WriteVar(e) => transform_expression_in_place(&mut e.value, transform, flags),
        Expression::WriteKey(e) => {
            transform_expression_in_place(&mut e.receiver, transform, flags);
            transform_expression_in_place(&mut e.index, transform, flags);
            transform_expression_in_place(&mut e.value, transform, flags);
        }
        Expression::WriteProp(e) => {
            transform_expression_in_place(&mut e.receiver, transform, flags);
            transform_expression_in_place(&mut e.value, transform, flags);
        }
        Expression::InvokeFn(e) => {
            transform_expression_in_place(&mut e.fn_, transform, flags);
            transform_all(&mut e.args, transform, flags);
        }
        Expression::LiteralArray(e) => transform_all(&mut e.entries, transform, flags),
        Expression::LiteralMap(e) => {
            for entry in &mut e.entries {
                transform_expression_in_place(&mut entry.value, transform, flags);
            }
        }
        Expression::Conditional(e) => {
            transform_expression_in_place(&mut e.condition, transform, flags);
            transform_expression_in_place(&mut e.true_case, transform, flags);
            if let Some(false_case) = &mut e.false_case {
                transform_expression_in_place(false_case, transform, flags);
            }
        }
        Expression::TypeOf(e) => transform_expression_in_place(&mut e.expr, transform, flags),
        Expression::Parens(e) => transform_expression_in_place(&mut e.expr, transform, flags),
        Expression::NotExpr(e) => transform_expression_in_place(&mut e.condition, transform, flags),
        Expression::ArrowFn(e) => match &mut e.body {
            ArrowFunctionBody::Expression(body) => transform_expression_in_place(body, transform, flags),
            ArrowFunctionBody::Statements(stmts) => {
                for stmt in stmts {
                    transform_expressions_in_statement(stmt, transform, flags);
                }
            }
        },
        Expression::Fn(e) => {
            for stmt in &mut e.statements {
                transform_expressions_in_statement(stmt, transform, flags);
            }
        }
        Expression::SafePropertyRead(e) => transform_expression_in_place(&mut e.receiver, transform, flags),
        Expression::SafeKeyedRead(e) => {
            transform_expression_in_place(&mut e.receiver, transform, flags);
            transform_expression_in_place(&mut e.index, transform, flags);
        }
        Expression::SafeInvokeFunction(e) => {
            transform_expression_in_place(&mut e.receiver, transform, flags);
            transform_all(&mut e.args, transform, flags);
        }
        Expression::SafeTernary(e) => {
            transform_expression_in_place(&mut e.guard, transform, flags);
            transform_expression_in_place(&mut e.expr, transform, flags);
        }
        Expression::PipeBinding(e) => transform_all(&mut e.args, transform, flags),
        Expression::PipeBindingVariadic(e) => transform_expression_in_place(&mut e.args, transform, flags),
        Expression::AssignTemporary(e) => transform_expression_in_place(&mut e.expr, transform, flags),
        Expression::PureFunction(e) => {
            if let Some(body) = &mut e.body {
                transform_expression_in_place(body, transform, flags | VisitorContextFlag::IN_CHILD_OPERATION);
            } else if let Some(fn_) = &mut e.fn_ {
                transform_expression_in_place(fn_, transform, flags);
            }
            transform_all(&mut e.args, transform, flags);
        }
        Expression::ConditionalCase(e) => {
            if let Some(case) = &mut e.expr {
                transform_expression_in_place(case, transform, flags);
            }
        }
        Expression::RestoreView(e) => {
            if let EitherXrefIdOrExpression::Expression(view) = &mut e.view {
                transform_expression_in_place(view, transform, flags);
            }
        }
        Expression::ResetView(e) => transform_expression_in_place(&mut e.expr, transform, flags),
        Expression::TwoWayBindingSet(e) => {
            transform_expression_in_place(&mut e.target, transform, flags);
            transform_expression_in_place(&mut e.value, transform, flags);
        }
        Expression::ReadVar(_)
        | Expression::Literal(_)
        | Expression::External(_)
        | Expression::Fixup(_)
        | Expression::LexicalRead(_)
        | Expression::Reference(_)
        | Expression::Context(_)
        | Expression::TrackContext(_)
        | Expression::NextContext(_)
        | Expression::GetCurrentView(_)
        | Expression::ReadVariable(_)
        | Expression::PureFunctionParameter(_)
        | Expression::Empty(_)
        | Expression::ReadTemporary(_)
        | Expression::SlotLiteral(_)
        | Expression::ContextLetReference(_) => {}
    }

    transform(expr, flags)
}

/// Transform all `Expression`s in the AST of `stmt` with the `transform` function.
pub fn transform_expressions_in_statement(
    stmt: &mut Statement,
    transform: &mut ExpressionTransform<'_>,
    flags: VisitorContextFlag,
) {
    match stmt {
        Statement::Expression(s) => transform_expression_in_place(&mut s.expr, transform, flags),
        Statement::Return(s) => transform_expression_in_place(&mut s.value, transform, flags),
        Statement::DeclareVar(s) => {
            if let Some(value) = &mut s.value {
                transform_expression_in_place(value, transform, flags);
            }
        }
        Statement::IfStmt(s) => {
            transform_expression_in_place(&mut s.condition, transform, flags);
            for case_stmt in s.true_case.iter_mut().chain(s.false_case.iter_mut()) {
                transform_expressions_in_statement(case_stmt, transform, flags);
            }
        }
        Statement::DeclareFn(s) => {
            for inner in &mut s.statements {
                transform_expressions_in_statement(inner, transform, flags);
            }
        }
    }
}

/// Transform all `Expression`s in `op` with the `transform` function.
pub fn transform_expressions_in_op<O: TransformExpressions + ?Sized>(
    op: &mut O,
    transform: &mut ExpressionTransform<'_>,
    flags: VisitorContextFlag,
) {
    op.transform_expressions(transform, flags);
}

/// Visits all `Expression`s in `op` with the `visitor` function.
pub fn visit_expressions_in_op<O: TransformExpressions + ?Sized>(
    op: &mut O,
    visitor: &mut dyn FnMut(&Expression, VisitorContextFlag),
) {
    op.transform_expressions(
        &mut |expr, flags| {
            visitor(&expr, flags);
            expr
        },
        VisitorContextFlag::NONE,
    );
}

/// Checks whether the given expression is a string literal.
pub fn is_string_literal(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::Literal(lit) if matches!(lit.value, LiteralValue::String(_))
    )
}
