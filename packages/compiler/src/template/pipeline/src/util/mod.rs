//! Pipeline Utilities

pub mod elements;
