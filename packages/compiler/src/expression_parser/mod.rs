//! Expression Parser Module
//!
//! The expression AST consumed by ingestion. Parsing template expression text is done
//! upstream; this crate only receives the resulting trees.

pub mod ast;

pub use ast::*;
