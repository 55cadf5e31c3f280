//! Pipeline Phases Module
//!
//! Every transformation pass over a `CompilationJob`, and the fixed order in which `transform`
//! runs them. Each pass is tagged with the kind of job it applies to.

pub mod attribute_extraction;
pub mod binding_specialization;
pub mod chaining;
pub mod collapse_singleton_interpolations;
pub mod conditionals;
pub mod const_collection;
pub mod deduplicate_text_bindings;
pub mod defer_configs;
pub mod defer_resolve_targets;
pub mod empty_elements;
pub mod expand_safe_reads;
pub mod generate_advance;
pub mod generate_projection_def;
pub mod generate_variables;
pub mod host_style_property_parsing;
pub mod namespace;
pub mod naming;
pub mod next_context_merging;
pub mod ng_container;
pub mod nonbindable;
pub mod ordering;
pub mod parse_extracted_styles;
pub mod pipe_creation;
pub mod pipe_variadic;
pub mod pure_function_extraction;
pub mod pure_literal_structures;
pub mod reify;
pub mod remove_content_selectors;
pub mod remove_empty_bindings;
pub mod resolve_contexts;
pub mod resolve_dollar_event;
pub mod resolve_names;
pub mod resolve_sanitizers;
pub mod save_restore_view;
pub mod slot_allocation;
pub mod style_binding_specialization;
pub mod temporary_variables;
pub mod track_fn_optimization;
pub mod transform_two_way_binding_set;
pub mod var_counting;
pub mod variable_optimization;

use log::{debug, trace};

use crate::error::Result;
use crate::template::pipeline::ir::CompilationJobKind;
use crate::template::pipeline::src::compilation::CompilationJob;

/// A single named pass in the pipeline.
pub struct Phase {
    pub kind: CompilationJobKind,
    pub name: &'static str,
    pub run: fn(&mut CompilationJob) -> Result<()>,
}

impl Phase {
    const fn new(kind: CompilationJobKind, name: &'static str, run: fn(&mut CompilationJob) -> Result<()>) -> Self {
        Phase { kind, name, run }
    }

    /// Whether this pass runs for a job of the given kind.
    pub fn applies_to(&self, job_kind: CompilationJobKind) -> bool {
        self.kind == CompilationJobKind::Both || self.kind == job_kind
    }
}

use CompilationJobKind::{Both, Host, Tmpl};

pub static PHASES: &[Phase] = &[
    Phase::new(Tmpl, "remove_content_selectors", remove_content_selectors::remove_content_selectors),
    Phase::new(Host, "parse_host_style_properties", host_style_property_parsing::parse_host_style_properties),
    Phase::new(Tmpl, "emit_namespace_changes", namespace::emit_namespace_changes),
    Phase::new(Both, "deduplicate_text_bindings", deduplicate_text_bindings::deduplicate_text_bindings),
    Phase::new(Both, "specialize_style_bindings", style_binding_specialization::specialize_style_bindings),
    Phase::new(Both, "specialize_bindings", binding_specialization::specialize_bindings),
    Phase::new(Both, "extract_attributes", attribute_extraction::extract_attributes),
    Phase::new(Both, "parse_extracted_styles", parse_extracted_styles::parse_extracted_styles),
    Phase::new(Tmpl, "remove_empty_bindings", remove_empty_bindings::remove_empty_bindings),
    Phase::new(
        Both,
        "collapse_singleton_interpolations",
        collapse_singleton_interpolations::collapse_singleton_interpolations,
    ),
    Phase::new(Both, "order_ops", ordering::order_ops),
    Phase::new(Tmpl, "generate_conditional_expressions", conditionals::generate_conditional_expressions),
    Phase::new(Tmpl, "create_pipes", pipe_creation::create_pipes),
    Phase::new(Tmpl, "create_variadic_pipes", pipe_variadic::create_variadic_pipes),
    Phase::new(Tmpl, "configure_defer_instructions", defer_configs::configure_defer_instructions),
    Phase::new(Both, "generate_pure_literal_structures", pure_literal_structures::generate_pure_literal_structures),
    Phase::new(Tmpl, "generate_projection_defs", generate_projection_def::generate_projection_defs),
    Phase::new(Tmpl, "generate_variables", generate_variables::generate_variables),
    Phase::new(Tmpl, "save_and_restore_view", save_restore_view::save_and_restore_view),
    Phase::new(Both, "resolve_dollar_event", resolve_dollar_event::resolve_dollar_event),
    Phase::new(Both, "resolve_names", resolve_names::resolve_names),
    Phase::new(Tmpl, "resolve_defer_target_names", defer_resolve_targets::resolve_defer_target_names),
    Phase::new(Tmpl, "transform_two_way_binding_set", transform_two_way_binding_set::transform_two_way_binding_set),
    Phase::new(Tmpl, "optimize_track_fns", track_fn_optimization::optimize_track_fns),
    Phase::new(Both, "resolve_contexts", resolve_contexts::resolve_contexts),
    Phase::new(Both, "resolve_sanitizers", resolve_sanitizers::resolve_sanitizers),
    Phase::new(Both, "expand_safe_reads", expand_safe_reads::expand_safe_reads),
    Phase::new(Both, "generate_temporary_variables", temporary_variables::generate_temporary_variables),
    Phase::new(Both, "optimize_variables", variable_optimization::optimize_variables),
    Phase::new(Tmpl, "allocate_slots", slot_allocation::allocate_slots),
    Phase::new(Both, "collect_element_consts", const_collection::collect_element_consts),
    Phase::new(Both, "count_variables", var_counting::count_variables),
    Phase::new(Tmpl, "generate_advance", generate_advance::generate_advance),
    Phase::new(Tmpl, "merge_advances", generate_advance::merge_advances),
    Phase::new(Both, "name_functions_and_variables", naming::name_functions_and_variables),
    Phase::new(Tmpl, "merge_next_context_expressions", next_context_merging::merge_next_context_expressions),
    Phase::new(Tmpl, "generate_ng_container_ops", ng_container::generate_ng_container_ops),
    Phase::new(Tmpl, "collapse_empty_instructions", empty_elements::collapse_empty_instructions),
    Phase::new(Tmpl, "disable_bindings", nonbindable::disable_bindings),
    Phase::new(Both, "extract_pure_functions", pure_function_extraction::extract_pure_functions),
    Phase::new(Both, "reify", reify::reify),
    Phase::new(Both, "chain", chaining::chain),
    Phase::new(Both, "verify_reification", reify::verify_reification),
];

/// Runs every applicable pass over `job`, in order, stopping at the first failure.
pub fn transform(job: &mut CompilationJob) -> Result<()> {
    let job_kind = job.kind;
    for phase in PHASES {
        if !phase.applies_to(job_kind) {
            trace!("skipping {} for {:?} job", phase.name, job_kind);
            continue;
        }
        debug!("running {} for {:?} job of {}", phase.name, job_kind, job.component_name);
        (phase.run)(job)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_ends_with_reification() {
        let names: Vec<&str> = PHASES.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), 43);
        assert_eq!(&names[..2], &["remove_content_selectors", "parse_host_style_properties"]);
        assert_eq!(&names[names.len() - 3..], &["reify", "chain", "verify_reification"]);
    }

    #[test]
    fn host_jobs_skip_template_only_passes() {
        let host_passes: Vec<&str> =
            PHASES.iter().filter(|p| p.applies_to(CompilationJobKind::Host)).map(|p| p.name).collect();
        assert!(host_passes.contains(&"resolve_names"));
        assert!(!host_passes.contains(&"allocate_slots"));
        assert!(!host_passes.contains(&"generate_advance"));
        assert!(host_passes.contains(&"parse_host_style_properties"));
        let template_passes: Vec<&str> =
            PHASES.iter().filter(|p| p.applies_to(CompilationJobKind::Tmpl)).map(|p| p.name).collect();
        assert!(!template_passes.contains(&"parse_host_style_properties"));
    }
}
