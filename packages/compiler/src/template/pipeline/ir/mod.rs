//! Template Pipeline IR
//!
//! Ops, expressions and handles making up the intermediate representation.

pub mod src;

pub use src::*;
