//! Template Module
//!
//! The template IR pipeline: ingestion, transformation passes and emission.

pub mod pipeline;
