//! Generate Projection Def Phase
//!
//! Locate projection slots, populate each component's `ngContentSelectors` literal field,
//! populate `project` arguments, and generate the required `projectionDef` instruction for the
//! job's root view.

use crate::directive_matching::{parse_selector_to_r3_selector, r3_selector_literal};
use crate::error::Result;
use crate::output::output_ast::{self as o, Expression};
use crate::parse_util::{ParseError, ParseSourceSpan};
use crate::template::pipeline::ir::{create_projection_def_op, CompatibilityMode, CreateOp};
use crate::template::pipeline::src::compilation::CompilationJob;

const WILDCARD_SELECTOR: &str = "*";

pub fn generate_projection_defs(job: &mut CompilationJob) -> Result<()> {
    // The legacy builder always shared these constants.
    let share = job.compatibility == CompatibilityMode::TemplateDefinitionBuilder;

    // Collect all selectors from this component, and its nested views. Also, assign each
    // projection a unique ascending projection slot index.
    let mut selectors: Vec<(String, ParseSourceSpan)> = Vec::new();
    for unit in job.units_mut() {
        for op in unit.create.iter_mut() {
            if let CreateOp::Projection(projection) = op {
                projection.projection_slot_index = selectors.len();
                selectors.push((projection.selector.clone(), projection.source_span.clone()));
            }
        }
    }

    if selectors.is_empty() {
        return Ok(());
    }

    // A single wildcard selector is the default, and needs no argument.
    let mut def_expr = None;
    if selectors.len() > 1 || selectors[0].0 != WILDCARD_SELECTOR {
        let mut entries = Vec::with_capacity(selectors.len());
        for (selector, span) in &selectors {
            entries.push(selector_entry(job, selector, span));
        }
        def_expr = Some(job.pool.get_const_literal(o::literal_arr(entries), share)?);
    }

    let selector_literals = selectors
        .iter()
        .map(|(selector, _)| o::literal(selector.as_str()))
        .collect();
    job.content_selectors = Some(job.pool.get_const_literal(o::literal_arr(selector_literals), share)?);

    // The projection def instruction goes at the beginning of the root view, before any
    // `projection` instructions.
    job.root_unit_mut().create.prepend([create_projection_def_op(def_expr)]);
    Ok(())
}

fn selector_entry(job: &mut CompilationJob, selector: &str, span: &ParseSourceSpan) -> Expression {
    if selector == WILDCARD_SELECTOR {
        return o::literal(WILDCARD_SELECTOR);
    }
    match parse_selector_to_r3_selector(selector) {
        Ok(parsed) => r3_selector_literal(&parsed),
        Err(msg) => {
            job.report(ParseError::new(span.clone(), msg));
            o::literal_arr(Vec::new())
        }
    }
}
