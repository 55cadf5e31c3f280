//! Output Module
//!
//! The output AST that reified templates are expressed in.

pub mod output_ast;
