//! Render3 Module
//!
//! The template AST handed to the pipeline, deferred-trigger validation and the runtime
//! instruction identifiers.

pub mod r3_ast;
pub mod r3_deferred_triggers;
pub mod r3_identifiers;

pub use r3_identifiers::Identifiers;
