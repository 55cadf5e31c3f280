//! Defer Configs Phase
//!
//! Defer instructions take a configuration array, which should be collected into the component
//! consts. This phase finds the config options, and creates the corresponding const array.

use crate::error::Result;
use crate::output::output_ast::{self as o, Expression};
use crate::template::pipeline::ir::{CreateOp, OpId, XrefId};
use crate::template::pipeline::src::compilation::CompilationJob;

struct PendingConfig {
    view: XrefId,
    op: OpId,
    loading: Option<Expression>,
    placeholder: Option<Expression>,
}

pub fn configure_defer_instructions(job: &mut CompilationJob) -> Result<()> {
    let mut pending = Vec::new();
    for unit in job.units() {
        for (id, op) in unit.create.iter_with_ids() {
            let CreateOp::Defer(defer) = op else {
                continue;
            };
            let placeholder = defer
                .placeholder_minimum_time
                .map(|minimum| time_array(&[Some(minimum)]));
            let loading = if defer.loading_minimum_time.is_some() || defer.loading_after_time.is_some() {
                Some(time_array(&[defer.loading_minimum_time, defer.loading_after_time]))
            } else {
                None
            };
            if loading.is_some() || placeholder.is_some() {
                pending.push(PendingConfig {
                    view: unit.xref,
                    op: id,
                    loading,
                    placeholder,
                });
            }
        }
    }

    for config in pending {
        let loading = config.loading.map(|arr| const_ref(job, arr));
        let placeholder = config.placeholder.map(|arr| const_ref(job, arr));
        if let Some(CreateOp::Defer(defer)) = job.view_mut(config.view)?.create.get_mut(config.op) {
            defer.loading_config = loading;
            defer.placeholder_config = placeholder;
        }
    }
    Ok(())
}

/// Times in milliseconds; an unset time is `null`.
fn time_array(times: &[Option<usize>]) -> Expression {
    o::literal_arr(
        times
            .iter()
            .map(|time| time.map_or_else(o::null_expr, o::literal))
            .collect(),
    )
}

fn const_ref(job: &mut CompilationJob, config: Expression) -> Expression {
    o::literal(job.add_const(config, Vec::new()).as_usize())
}
