//! Template Pipeline

pub mod ir;
pub mod src;
