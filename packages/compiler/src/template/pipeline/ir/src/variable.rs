//! IR Variables
//!
//! The semantic meaning of a variable declared by a `Variable` op. Names are only assigned
//! late, by the naming pass.

use crate::output::output_ast::Expression;
use crate::template::pipeline::ir::enums::SemanticVariableKind;
use crate::template::pipeline::ir::handle::XrefId;

/// Marker used in a view's context variables for a reference to the entire context object,
/// rather than a specific parameter.
pub const CTX_REF: &str = "CTX_REF_MARKER";

/// A variable that represents the context of a particular view.
#[derive(Debug, Clone)]
pub struct ContextVariable {
    /// `XrefId` of the view that this variable represents.
    pub view: XrefId,
    pub name: Option<String>,
}

/// A variable that represents a specific identifier within a template.
#[derive(Debug, Clone)]
pub struct IdentifierVariable {
    /// The identifier whose value in the template is tracked in this variable.
    pub identifier: String,
    /// Whether the variable was declared locally within the same view or somewhere else.
    pub local: bool,
    pub name: Option<String>,
}

/// A variable that represents a saved view context.
#[derive(Debug, Clone)]
pub struct SavedViewVariable {
    pub view: XrefId,
    pub name: Option<String>,
}

/// A variable that will be inlined at every location it is used.
#[derive(Debug, Clone)]
pub struct AliasVariable {
    pub identifier: String,
    pub expression: Expression,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SemanticVariable {
    Context(ContextVariable),
    Identifier(IdentifierVariable),
    SavedView(SavedViewVariable),
    Alias(AliasVariable),
}

impl SemanticVariable {
    pub fn context(view: XrefId) -> Self {
        SemanticVariable::Context(ContextVariable { view, name: None })
    }

    pub fn identifier(identifier: impl Into<String>, local: bool) -> Self {
        SemanticVariable::Identifier(IdentifierVariable {
            identifier: identifier.into(),
            local,
            name: None,
        })
    }

    pub fn saved_view(view: XrefId) -> Self {
        SemanticVariable::SavedView(SavedViewVariable { view, name: None })
    }

    pub fn alias(identifier: impl Into<String>, expression: Expression) -> Self {
        SemanticVariable::Alias(AliasVariable {
            identifier: identifier.into(),
            expression,
            name: None,
        })
    }

    pub fn kind(&self) -> SemanticVariableKind {
        match self {
            SemanticVariable::Context(_) => SemanticVariableKind::Context,
            SemanticVariable::Identifier(_) => SemanticVariableKind::Identifier,
            SemanticVariable::SavedView(_) => SemanticVariableKind::SavedView,
            SemanticVariable::Alias(_) => SemanticVariableKind::Alias,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            SemanticVariable::Context(v) => v.name.as_deref(),
            SemanticVariable::Identifier(v) => v.name.as_deref(),
            SemanticVariable::SavedView(v) => v.name.as_deref(),
            SemanticVariable::Alias(v) => v.name.as_deref(),
        }
    }

    pub fn set_name(&mut self, name: String) {
        let slot = match self {
            SemanticVariable::Context(v) => &mut v.name,
            SemanticVariable::Identifier(v) => &mut v.name,
            SemanticVariable::SavedView(v) => &mut v.name,
            SemanticVariable::Alias(v) => &mut v.name,
        };
        *slot = Some(name);
    }
}
