//! Output AST
//!
//! The expression and statement trees handed to the code emitter. Logical IR
//! expressions live in the same enum so passes can rewrite them in place; none of
//! them may survive reification.

use crate::constant_pool::FixupRef;
use crate::parse_util::ParseSourceSpan;
use crate::template::pipeline::ir::expression::{
    AssignTemporaryExpr, ConditionalCaseExpr, ContextExpr, ContextLetReferenceExpr, EmptyExpr,
    GetCurrentViewExpr, LexicalReadExpr, NextContextExpr, PipeBindingExpr,
    PipeBindingVariadicExpr, PureFunctionExpr, PureFunctionParameterExpr, ReadTemporaryExpr,
    ReadVariableExpr, ReferenceExpr, ResetViewExpr, RestoreViewExpr, SafeInvokeFunctionExpr,
    SafeKeyedReadExpr, SafePropertyReadExpr, SafeTernaryExpr, SlotLiteralExpr, TrackContextExpr,
    TwoWayBindingSetExpr,
};

///// Expressions

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Equals,
    NotEquals,
    Assign,
    Identical,
    NotIdentical,
    Minus,
    Plus,
    Divide,
    Multiply,
    Modulo,
    And,
    Or,
    BitwiseOr,
    BitwiseAnd,
    Lower,
    LowerEquals,
    Bigger,
    BiggerEquals,
    NullishCoalesce,
}

#[derive(Debug, Clone)]
pub enum Expression {
    ReadVar(ReadVarExpr),
    WriteVar(WriteVarExpr),
    WriteKey(WriteKeyExpr),
    WriteProp(WritePropExpr),
    InvokeFn(InvokeFunctionExpr),
    Literal(LiteralExpr),
    External(ExternalExpr),
    Conditional(ConditionalExpr),
    NotExpr(NotExpr),
    Fn(FunctionExpr),
    ArrowFn(ArrowFunctionExpr),
    BinaryOp(BinaryOperatorExpr),
    ReadProp(ReadPropExpr),
    ReadKey(ReadKeyExpr),
    LiteralArray(LiteralArrayExpr),
    LiteralMap(LiteralMapExpr),
    TypeOf(TypeofExpr),
    Unary(UnaryOperatorExpr),
    Parens(ParenthesizedExpr),
    /// A pooled constant; resolves to its original or to the shared variable.
    Fixup(FixupRef),

    // IR Expression variants
    LexicalRead(LexicalReadExpr),
    Reference(ReferenceExpr),
    Context(ContextExpr),
    TrackContext(TrackContextExpr),
    NextContext(NextContextExpr),
    GetCurrentView(GetCurrentViewExpr),
    RestoreView(RestoreViewExpr),
    ResetView(ResetViewExpr),
    ReadVariable(ReadVariableExpr),
    PureFunction(PureFunctionExpr),
    PureFunctionParameter(PureFunctionParameterExpr),
    PipeBinding(PipeBindingExpr),
    PipeBindingVariadic(PipeBindingVariadicExpr),
    SafePropertyRead(SafePropertyReadExpr),
    SafeKeyedRead(SafeKeyedReadExpr),
    SafeInvokeFunction(SafeInvokeFunctionExpr),
    SafeTernary(SafeTernaryExpr),
    Empty(EmptyExpr),
    AssignTemporary(AssignTemporaryExpr),
    ReadTemporary(ReadTemporaryExpr),
    SlotLiteral(SlotLiteralExpr),
    ConditionalCase(ConditionalCaseExpr),
    TwoWayBindingSet(TwoWayBindingSetExpr),
    ContextLetReference(ContextLetReferenceExpr),
}

#[derive(Debug, Clone)]
pub struct ReadVarExpr {
    pub name: String,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct WriteVarExpr {
    pub name: String,
    pub value: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct WriteKeyExpr {
    pub receiver: Box<Expression>,
    pub index: Box<Expression>,
    pub value: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct WritePropExpr {
    pub receiver: Box<Expression>,
    pub name: String,
    pub value: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct InvokeFunctionExpr {
    pub fn_: Box<Expression>,
    pub args: Vec<Expression>,
    pub source_span: Option<ParseSourceSpan>,
    pub pure: bool,
}

#[derive(Debug, Clone)]
pub struct LiteralExpr {
    pub value: LiteralValue,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Undefined,
    String(String),
    Number(f64),
    Bool(bool),
}

impl LiteralValue {
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self == other
    }
}

#[derive(Debug, Clone)]
pub struct ExternalExpr {
    pub value: ExternalReference,
    pub source_span: Option<ParseSourceSpan>,
}

/// A symbol imported from a module, e.g. a runtime instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalReference {
    pub module_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    pub condition: Box<Expression>,
    pub true_case: Box<Expression>,
    pub false_case: Option<Box<Expression>>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct NotExpr {
    pub condition: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnParam {
    pub name: String,
}

impl FnParam {
    pub fn new(name: impl Into<String>) -> Self {
        FnParam { name: name.into() }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionExpr {
    pub params: Vec<FnParam>,
    pub statements: Vec<Statement>,
    pub source_span: Option<ParseSourceSpan>,
    pub name: Option<String>,
}

impl FunctionExpr {
    pub fn to_decl_stmt(&self, name: impl Into<String>, modifiers: StmtModifier) -> Statement {
        Statement::DeclareFn(DeclareFunctionStmt {
            name: name.into(),
            params: self.params.clone(),
            statements: self.statements.clone(),
            modifiers,
            source_span: self.source_span.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ArrowFunctionExpr {
    pub params: Vec<FnParam>,
    pub body: ArrowFunctionBody,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub enum ArrowFunctionBody {
    Expression(Box<Expression>),
    Statements(Vec<Statement>),
}

#[derive(Debug, Clone)]
pub struct BinaryOperatorExpr {
    pub operator: BinaryOperator,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct ReadPropExpr {
    pub receiver: Box<Expression>,
    pub name: String,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct ReadKeyExpr {
    pub receiver: Box<Expression>,
    pub index: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct LiteralArrayExpr {
    pub entries: Vec<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct LiteralMapEntry {
    pub key: String,
    pub value: Box<Expression>,
    pub quoted: bool,
}

impl LiteralMapEntry {
    pub fn new(key: impl Into<String>, value: Expression, quoted: bool) -> Self {
        LiteralMapEntry {
            key: key.into(),
            value: Box::new(value),
            quoted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiteralMapExpr {
    pub entries: Vec<LiteralMapEntry>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct TypeofExpr {
    pub expr: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct UnaryOperatorExpr {
    pub operator: UnaryOperator,
    pub expr: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct ParenthesizedExpr {
    pub expr: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

///// Statements

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtModifier {
    None = 0,
    Final = 1,
    Private = 2,
    Exported = 4,
    Static = 8,
}

#[derive(Debug, Clone)]
pub enum Statement {
    DeclareVar(DeclareVarStmt),
    DeclareFn(DeclareFunctionStmt),
    Expression(ExpressionStatement),
    Return(ReturnStatement),
    IfStmt(IfStmt),
}

#[derive(Debug, Clone)]
pub struct DeclareVarStmt {
    pub name: String,
    pub value: Option<Box<Expression>>,
    pub modifiers: StmtModifier,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct DeclareFunctionStmt {
    pub name: String,
    pub params: Vec<FnParam>,
    pub statements: Vec<Statement>,
    pub modifiers: StmtModifier,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub expr: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub value: Box<Expression>,
    pub source_span: Option<ParseSourceSpan>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Box<Expression>,
    pub true_case: Vec<Statement>,
    pub false_case: Vec<Statement>,
    pub source_span: Option<ParseSourceSpan>,
}

// Helper functions for creating common expressions
pub fn variable(name: impl Into<String>) -> Expression {
    Expression::ReadVar(ReadVarExpr {
        name: name.into(),
        source_span: None,
    })
}

pub fn literal(value: impl Into<LiteralValue>) -> Expression {
    Expression::Literal(LiteralExpr {
        value: value.into(),
        source_span: None,
    })
}

pub fn literal_arr(values: Vec<Expression>) -> Expression {
    Expression::LiteralArray(LiteralArrayExpr {
        entries: values,
        source_span: None,
    })
}

pub fn literal_map(entries: Vec<LiteralMapEntry>) -> Expression {
    Expression::LiteralMap(LiteralMapExpr {
        entries,
        source_span: None,
    })
}

pub fn import_ref(id: ExternalReference) -> Expression {
    Expression::External(ExternalExpr {
        value: id,
        source_span: None,
    })
}

pub fn null_expr() -> Expression {
    literal(LiteralValue::Null)
}

pub fn not(expr: Expression) -> Expression {
    Expression::NotExpr(NotExpr {
        condition: Box::new(expr),
        source_span: None,
    })
}

pub fn typeof_expr(expr: Expression) -> Expression {
    Expression::TypeOf(TypeofExpr {
        expr: Box::new(expr),
        source_span: None,
    })
}

pub fn fn_expr(params: Vec<FnParam>, statements: Vec<Statement>, name: Option<String>) -> Expression {
    Expression::Fn(FunctionExpr {
        params,
        statements,
        source_span: None,
        name,
    })
}

pub fn arrow_fn(params: Vec<FnParam>, body: ArrowFunctionBody) -> Expression {
    Expression::ArrowFn(ArrowFunctionExpr {
        params,
        body,
        source_span: None,
    })
}

pub fn binary(operator: BinaryOperator, lhs: Expression, rhs: Expression) -> Expression {
    Expression::BinaryOp(BinaryOperatorExpr {
        operator,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        source_span: None,
    })
}

pub fn return_stmt(value: Expression) -> Statement {
    Statement::Return(ReturnStatement {
        value: Box::new(value),
        source_span: None,
    })
}

pub fn if_stmt(condition: Expression, true_case: Vec<Statement>) -> Statement {
    Statement::IfStmt(IfStmt {
        condition: Box::new(condition),
        true_case,
        false_case: Vec::new(),
        source_span: None,
    })
}

impl From<String> for LiteralValue {
    fn from(s: String) -> Self {
        LiteralValue::String(s)
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::String(s.to_string())
    }
}

impl From<f64> for LiteralValue {
    fn from(n: f64) -> Self {
        LiteralValue::Number(n)
    }
}

impl From<usize> for LiteralValue {
    fn from(n: usize) -> Self {
        LiteralValue::Number(n as f64)
    }
}

impl From<i64> for LiteralValue {
    fn from(n: i64) -> Self {
        LiteralValue::Number(n as f64)
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Bool(b)
    }
}

impl Expression {
    pub fn prop(self, name: impl Into<String>) -> Expression {
        Expression::ReadProp(ReadPropExpr {
            receiver: Box::new(self),
            name: name.into(),
            source_span: None,
        })
    }

    pub fn key(self, index: Expression) -> Expression {
        Expression::ReadKey(ReadKeyExpr {
            receiver: Box::new(self),
            index: Box::new(index),
            source_span: None,
        })
    }

    pub fn call_fn(self, args: Vec<Expression>, source_span: Option<ParseSourceSpan>) -> Expression {
        Expression::InvokeFn(InvokeFunctionExpr {
            fn_: Box::new(self),
            args,
            source_span,
            pure: false,
        })
    }

    pub fn conditional(self, true_case: Expression, false_case: Option<Expression>) -> Expression {
        Expression::Conditional(ConditionalExpr {
            condition: Box::new(self),
            true_case: Box::new(true_case),
            false_case: false_case.map(Box::new),
            source_span: None,
        })
    }

    pub fn identical(self, rhs: Expression) -> Expression {
        binary(BinaryOperator::Identical, self, rhs)
    }

    pub fn not_identical(self, rhs: Expression) -> Expression {
        binary(BinaryOperator::NotIdentical, self, rhs)
    }

    pub fn equals(self, rhs: Expression) -> Expression {
        binary(BinaryOperator::Equals, self, rhs)
    }

    pub fn or(self, rhs: Expression) -> Expression {
        binary(BinaryOperator::Or, self, rhs)
    }

    pub fn minus(self, rhs: Expression) -> Expression {
        binary(BinaryOperator::Minus, self, rhs)
    }

    pub fn modulo(self, rhs: Expression) -> Expression {
        binary(BinaryOperator::Modulo, self, rhs)
    }

    pub fn bitwise_and(self, rhs: Expression) -> Expression {
        binary(BinaryOperator::BitwiseAnd, self, rhs)
    }

    pub fn to_stmt(self) -> Statement {
        Statement::Expression(ExpressionStatement {
            expr: Box::new(self),
            source_span: None,
        })
    }

    /// Builds an assignment to this read. Only property, key and variable reads are assignable.
    pub fn set(self, value: Expression) -> Option<Expression> {
        match self {
            Expression::ReadProp(read) => Some(Expression::WriteProp(WritePropExpr {
                receiver: read.receiver,
                name: read.name,
                value: Box::new(value),
                source_span: read.source_span,
            })),
            Expression::ReadKey(read) => Some(Expression::WriteKey(WriteKeyExpr {
                receiver: read.receiver,
                index: read.index,
                value: Box::new(value),
                source_span: read.source_span,
            })),
            Expression::ReadVar(read) => Some(Expression::WriteVar(WriteVarExpr {
                name: read.name,
                value: Box::new(value),
                source_span: read.source_span,
            })),
            _ => None,
        }
    }

    /// Whether the value of this expression is fixed at compile time.
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Literal(_) | Expression::External(_) | Expression::Fixup(_) => true,
            Expression::LiteralArray(arr) => arr.entries.iter().all(Expression::is_constant),
            Expression::LiteralMap(map) => map.entries.iter().all(|e| e.value.is_constant()),
            Expression::Parens(p) => p.expr.is_constant(),
            Expression::Unary(u) => u.expr.is_constant(),
            Expression::NotExpr(n) => n.condition.is_constant(),
            Expression::PureFunctionParameter(_) | Expression::Empty(_) => true,
            _ => false,
        }
    }

    pub fn is_literal_primitive(&self) -> bool {
        matches!(self, Expression::Literal(_))
    }

    pub fn source_span(&self) -> Option<&ParseSourceSpan> {
        match self {
            Expression::ReadVar(e) => e.source_span.as_ref(),
            Expression::WriteVar(e) => e.source_span.as_ref(),
            Expression::WriteKey(e) => e.source_span.as_ref(),
            Expression::WriteProp(e) => e.source_span.as_ref(),
            Expression::InvokeFn(e) => e.source_span.as_ref(),
            Expression::Literal(e) => e.source_span.as_ref(),
            Expression::External(e) => e.source_span.as_ref(),
            Expression::Conditional(e) => e.source_span.as_ref(),
            Expression::NotExpr(e) => e.source_span.as_ref(),
            Expression::Fn(e) => e.source_span.as_ref(),
            Expression::ArrowFn(e) => e.source_span.as_ref(),
            Expression::BinaryOp(e) => e.source_span.as_ref(),
            Expression::ReadProp(e) => e.source_span.as_ref(),
            Expression::ReadKey(e) => e.source_span.as_ref(),
            Expression::LiteralArray(e) => e.source_span.as_ref(),
            Expression::LiteralMap(e) => e.source_span.as_ref(),
            Expression::TypeOf(e) => e.source_span.as_ref(),
            Expression::Unary(e) => e.source_span.as_ref(),
            Expression::Parens(e) => e.source_span.as_ref(),
            Expression::LexicalRead(e) => e.source_span.as_ref(),
            Expression::SafeKeyedRead(e) => e.source_span.as_ref(),
            Expression::Empty(e) => e.source_span.as_ref(),
            _ => None,
        }
    }

    /// Structural equality used for constant and function deduplication.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        use Expression as E;
        match (self, other) {
            (E::ReadVar(a), E::ReadVar(b)) => a.name == b.name,
            (E::WriteVar(a), E::WriteVar(b)) => a.name == b.name && a.value.is_equivalent(&b.value),
            (E::WriteKey(a), E::WriteKey(b)) => {
                a.receiver.is_equivalent(&b.receiver)
                    && a.index.is_equivalent(&b.index)
                    && a.value.is_equivalent(&b.value)
            }
            (E::WriteProp(a), E::WriteProp(b)) => {
                a.name == b.name
                    && a.receiver.is_equivalent(&b.receiver)
                    && a.value.is_equivalent(&b.value)
            }
            (E::InvokeFn(a), E::InvokeFn(b)) => {
                a.fn_.is_equivalent(&b.fn_) && are_all_equivalent(&a.args, &b.args)
            }
            (E::Literal(a), E::Literal(b)) => a.value.is_equivalent(&b.value),
            (E::External(a), E::External(b)) => a.value == b.value,
            (E::Conditional(a), E::Conditional(b)) => {
                a.condition.is_equivalent(&b.condition)
                    && a.true_case.is_equivalent(&b.true_case)
                    && match (&a.false_case, &b.false_case) {
                        (Some(x), Some(y)) => x.is_equivalent(y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (E::NotExpr(a), E::NotExpr(b)) => a.condition.is_equivalent(&b.condition),
            (E::Fn(a), E::Fn(b)) => {
                a.params == b.params && are_all_statements_equivalent(&a.statements, &b.statements)
            }
            (E::ArrowFn(a), E::ArrowFn(b)) => {
                a.params == b.params
                    && match (&a.body, &b.body) {
                        (ArrowFunctionBody::Expression(x), ArrowFunctionBody::Expression(y)) => {
                            x.is_equivalent(y)
                        }
                        (ArrowFunctionBody::Statements(x), ArrowFunctionBody::Statements(y)) => {
                            are_all_statements_equivalent(x, y)
                        }
                        _ => false,
                    }
            }
            (E::BinaryOp(a), E::BinaryOp(b)) => {
                a.operator == b.operator && a.lhs.is_equivalent(&b.lhs) && a.rhs.is_equivalent(&b.rhs)
            }
            (E::ReadProp(a), E::ReadProp(b)) => a.name == b.name && a.receiver.is_equivalent(&b.receiver),
            (E::ReadKey(a), E::ReadKey(b)) => {
                a.receiver.is_equivalent(&b.receiver) && a.index.is_equivalent(&b.index)
            }
            (E::LiteralArray(a), E::LiteralArray(b)) => are_all_equivalent(&a.entries, &b.entries),
            (E::LiteralMap(a), E::LiteralMap(b)) => {
                a.entries.len() == b.entries.len()
                    && a.entries.iter().zip(&b.entries).all(|(x, y)| {
                        x.key == y.key && x.quoted == y.quoted && x.value.is_equivalent(&y.value)
                    })
            }
            (E::TypeOf(a), E::TypeOf(b)) => a.expr.is_equivalent(&b.expr),
            (E::Unary(a), E::Unary(b)) => a.operator == b.operator && a.expr.is_equivalent(&b.expr),
            (E::Parens(a), E::Parens(b)) => a.expr.is_equivalent(&b.expr),
            (E::Fixup(a), E::Fixup(b)) => a == b,
            (E::ReadVariable(a), E::ReadVariable(b)) => a.xref == b.xref,
            (E::PureFunctionParameter(a), E::PureFunctionParameter(b)) => a.index == b.index,
            (E::TrackContext(_), E::TrackContext(_)) => true,
            (E::Context(a), E::Context(b)) => a.view == b.view,
            (E::LexicalRead(a), E::LexicalRead(b)) => a.name == b.name,
            _ => false,
        }
    }
}

pub fn are_all_equivalent(a: &[Expression], b: &[Expression]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_equivalent(y))
}

pub fn are_all_statements_equivalent(a: &[Statement], b: &[Statement]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_equivalent(y))
}

impl Statement {
    pub fn is_equivalent(&self, other: &Statement) -> bool {
        match (self, other) {
            (Statement::DeclareVar(a), Statement::DeclareVar(b)) => {
                a.name == b.name
                    && match (&a.value, &b.value) {
                        (Some(x), Some(y)) => x.is_equivalent(y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (Statement::DeclareFn(a), Statement::DeclareFn(b)) => {
                a.name == b.name
                    && a.params == b.params
                    && are_all_statements_equivalent(&a.statements, &b.statements)
            }
            (Statement::Expression(a), Statement::Expression(b)) => a.expr.is_equivalent(&b.expr),
            (Statement::Return(a), Statement::Return(b)) => a.value.is_equivalent(&b.value),
            (Statement::IfStmt(a), Statement::IfStmt(b)) => {
                a.condition.is_equivalent(&b.condition)
                    && are_all_statements_equivalent(&a.true_case, &b.true_case)
                    && are_all_statements_equivalent(&a.false_case, &b.false_case)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_arrays_compare_structurally() {
        let a = literal_arr(vec![literal("a"), literal(1.0)]);
        let b = literal_arr(vec![literal("a"), literal(1.0)]);
        let c = literal_arr(vec![literal("a"), literal(2.0)]);
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn set_rejects_non_assignable_receivers() {
        assert!(variable("a").prop("b").set(literal(1.0)).is_some());
        assert!(literal(1.0).set(literal(2.0)).is_none());
    }

    #[test]
    fn constant_detection_recurses_into_literals() {
        assert!(literal_arr(vec![literal("x")]).is_constant());
        assert!(!literal_arr(vec![variable("x")]).is_constant());
    }
}
