//! Shared Operations
//!
//! Op payloads valid in both the create and the update list.

use crate::output::output_ast::{Expression, Statement};
use crate::template::pipeline::ir::enums::VariableFlags;
use crate::template::pipeline::ir::expression::{
    transform_expression_in_place, transform_expressions_in_statement, ExpressionTransform,
    TransformExpressions, VisitorContextFlag,
};
use crate::template::pipeline::ir::operations::Op;
use crate::template::pipeline::ir::ops::create::CreateOp;
use crate::template::pipeline::ir::ops::update::UpdateOp;
use crate::template::pipeline::ir::handle::XrefId;
use crate::template::pipeline::ir::variable::SemanticVariable;

/// An op which wraps an output AST statement. Reification turns every other op into one.
#[derive(Debug, Clone)]
pub struct StatementOp {
    pub statement: Statement,
}

/// Declares and initializes a semantic variable.
#[derive(Debug, Clone)]
pub struct VariableOp {
    /// `XrefId` which identifies this specific variable, and is used to reference this variable from
    /// other parts of the IR.
    pub xref: XrefId,
    /// The `SemanticVariable` which describes the meaning behind this variable.
    pub variable: SemanticVariable,
    /// Expression representing the value of the variable.
    pub initializer: Box<Expression>,
    pub flags: VariableFlags,
}

impl VariableOp {
    pub(crate) fn transform_expressions(
        &mut self,
        transform: &mut ExpressionTransform<'_>,
        flags: VisitorContextFlag,
    ) {
        transform_expression_in_place(&mut self.initializer, transform, flags);
    }
}

impl StatementOp {
    pub(crate) fn transform_expressions(
        &mut self,
        transform: &mut ExpressionTransform<'_>,
        flags: VisitorContextFlag,
    ) {
        transform_expressions_in_statement(&mut self.statement, transform, flags);
    }
}

pub fn create_statement_op(statement: Statement) -> StatementOp {
    StatementOp { statement }
}

pub fn create_variable_op(
    xref: XrefId,
    variable: SemanticVariable,
    initializer: Expression,
    flags: VariableFlags,
) -> VariableOp {
    VariableOp {
        xref,
        variable,
        initializer: Box::new(initializer),
        flags,
    }
}

/// Op types that can hold the shared ops, so passes over variables work on either list.
pub trait SharedOps: Op + TransformExpressions + Sized {
    fn as_variable(&self) -> Option<&VariableOp>;
    fn as_variable_mut(&mut self) -> Option<&mut VariableOp>;
    fn as_statement(&self) -> Option<&StatementOp>;
    fn as_statement_mut(&mut self) -> Option<&mut StatementOp>;
    fn from_statement(op: StatementOp) -> Self;
}

impl SharedOps for CreateOp {
    fn as_variable(&self) -> Option<&VariableOp> {
        match self {
            CreateOp::Variable(op) => Some(op),
            _ => None,
        }
    }

    fn as_variable_mut(&mut self) -> Option<&mut VariableOp> {
        match self {
            CreateOp::Variable(op) => Some(op),
            _ => None,
        }
    }

    fn as_statement(&self) -> Option<&StatementOp> {
        match self {
            CreateOp::Statement(op) => Some(op),
            _ => None,
        }
    }

    fn as_statement_mut(&mut self) -> Option<&mut StatementOp> {
        match self {
            CreateOp::Statement(op) => Some(op),
            _ => None,
        }
    }

    fn from_statement(op: StatementOp) -> Self {
        CreateOp::Statement(op)
    }
}

impl SharedOps for UpdateOp {
    fn as_variable(&self) -> Option<&VariableOp> {
        match self {
            UpdateOp::Variable(op) => Some(op),
            _ => None,
        }
    }

    fn as_variable_mut(&mut self) -> Option<&mut VariableOp> {
        match self {
            UpdateOp::Variable(op) => Some(op),
            _ => None,
        }
    }

    fn as_statement(&self) -> Option<&StatementOp> {
        match self {
            UpdateOp::Statement(op) => Some(op),
            _ => None,
        }
    }

    fn as_statement_mut(&mut self) -> Option<&mut StatementOp> {
        match self {
            UpdateOp::Statement(op) => Some(op),
            _ => None,
        }
    }

    fn from_statement(op: StatementOp) -> Self {
        UpdateOp::Statement(op)
    }
}
