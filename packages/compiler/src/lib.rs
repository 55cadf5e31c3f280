#![deny(clippy::all)]

/**
 * Angular Template Pipeline
 *
 * Lowers parsed component templates and host bindings into template functions through an
 * intermediate representation of create and update operations.
 */

// Core modules
pub mod config;
pub mod constant_pool;
pub mod core;
pub mod directive_matching;
pub mod error;
pub mod parse_util;

// Inputs to the pipeline
pub mod expression_parser;
pub mod render3;
pub mod schema;

// The pipeline and its output
pub mod output;
pub mod template;

pub use config::PipelineConfig;
pub use error::{CompilerError, Result};

use log::debug;

use constant_pool::ConstantPool;
use output::output_ast::{Expression, FunctionExpr, Statement};
use parse_util::ParseError;
use render3::r3_ast::R3Node;
use template::pipeline::src::{
    emit_host_binding_function, emit_template_fn, ingest_component, ingest_host_binding, transform, CompilationJob,
    DeferMetadata, HostBindingInput,
};

/// The result of compiling a component template or a directive's host bindings.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    /// The template function, or the host bindings function when there is anything to bind.
    pub function: Option<FunctionExpr>,
    /// Slots used by the root view.
    pub decls: usize,
    /// Binding slots used by the root view.
    pub vars: usize,
    /// The component's consts array.
    pub consts: Vec<Expression>,
    /// Statements that must run before the consts array is built.
    pub consts_initializers: Vec<Statement>,
    /// The `ngContentSelectors` of the component, if it projects content.
    pub content_selectors: Option<Expression>,
    /// Static host attributes (`hostAttrs`).
    pub host_attributes: Option<Expression>,
    /// Pooled declarations: shared constants, pure functions and child view functions.
    pub statements: Vec<Statement>,
    /// Problems in the user's template. Compilation completes even when some are present.
    pub errors: Vec<ParseError>,
}

/// Compiles a component template all the way to its template function.
pub fn compile_component_template(
    component_name: &str,
    template: &[R3Node],
    config: PipelineConfig,
    defer_meta: DeferMetadata,
) -> Result<CompiledTemplate> {
    let pool = ConstantPool::with_string_threshold(config.pool_string_threshold);
    let mut job = ingest_component(component_name, template, pool, config, defer_meta)?;
    transform(&mut job)?;
    let template_fn = emit_template_fn(&mut job)?;

    let root = job.root_unit();
    let (decls, vars) = (root.decls.unwrap_or(0), root.vars.unwrap_or(0));
    debug!(
        "compiled {component_name}: {} views, {decls} decls, {vars} vars, {} consts",
        job.view_xrefs().len(),
        job.consts.len()
    );
    Ok(finish(job, Some(template_fn), decls, vars))
}

/// Compiles the host bindings of a directive or component.
pub fn compile_host_bindings(input: &HostBindingInput, config: PipelineConfig) -> Result<CompiledTemplate> {
    let pool = ConstantPool::with_string_threshold(config.pool_string_threshold);
    let mut job = ingest_host_binding(input, pool, config)?;
    transform(&mut job)?;
    let host_fn = emit_host_binding_function(&job)?;

    let vars = job.root_unit().vars.unwrap_or(0);
    Ok(finish(job, host_fn, 0, vars))
}

/// Resolves every pooled constant handle left in the job's output and packages it.
fn finish(job: CompilationJob, function: Option<FunctionExpr>, decls: usize, vars: usize) -> CompiledTemplate {
    let pool = &job.pool;
    let function = function.map(|mut function| {
        for stmt in &mut function.statements {
            pool.resolve_statement(stmt);
        }
        function
    });
    let mut consts_initializers = job.consts_initializers;
    for stmt in &mut consts_initializers {
        pool.resolve_statement(stmt);
    }
    CompiledTemplate {
        function,
        decls,
        vars,
        statements: pool.statements(),
        consts: job.consts.into_iter().map(|expr| pool.resolve(expr)).collect(),
        consts_initializers,
        content_selectors: job.content_selectors.map(|expr| pool.resolve(expr)),
        host_attributes: job.host_attributes.map(|expr| pool.resolve(expr)),
        errors: job.errors,
    }
}
