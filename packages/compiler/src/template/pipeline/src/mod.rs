//! Pipeline Source Module
//!
//! Ingestion, the transformation passes and emission over the template IR.

pub mod compilation;
pub mod conversion;
pub mod emit;
pub mod ingest;
pub mod instruction;
pub mod phases;
pub mod util;

pub use compilation::{CompilationJob, DeferMetadata, JobParts, TemplateCompilationMode, ViewCompilationUnit};
pub use emit::{emit_host_binding_function, emit_template_fn, emit_view};
pub use ingest::{ingest_component, ingest_host_binding, HostBindingInput};
pub use phases::transform;
