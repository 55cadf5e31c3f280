//! Resolve Dollar Event Phase
//!
//! Any `$event` read inside a listener becomes a read of the handler's `$event` parameter
//! immediately, and does not participate in any of the normal logic for handling variables.

use crate::error::Result;
use crate::output::output_ast::{self as o, Expression};
use crate::template::pipeline::ir::{CreateOp, TransformExpressions, VisitorContextFlag};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn resolve_dollar_event(job: &mut CompilationJob) -> Result<()> {
    for unit in job.units_mut() {
        for op in unit.create.iter_mut() {
            // Two-way listeners always consume `$event`, so the flag only matters for plain ones.
            let is_plain_listener = matches!(op, CreateOp::Listener(_));
            if !is_plain_listener && !matches!(op, CreateOp::TwoWayListener(_)) {
                continue;
            }
            let mut consumed = false;
            op.transform_expressions(
                &mut |expr, _| match expr {
                    Expression::LexicalRead(read) if read.name == "$event" => {
                        consumed = true;
                        o::variable(read.name)
                    }
                    other => other,
                },
                VisitorContextFlag::IN_CHILD_OPERATION,
            );
            if consumed && is_plain_listener {
                if let Some(listener) = op.as_listener_mut() {
                    listener.consumes_dollar_event = true;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::parse_util::{ParseSourceFile, ParseSourceSpan};
    use crate::template::pipeline::ir::{create_listener_op, create_statement_op, LexicalReadExpr, OpList, UpdateOp, XrefId};
    use std::sync::Arc;

    #[test]
    fn event_reads_mark_the_listener() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let mut handler = OpList::new();
        handler.push(UpdateOp::Statement(create_statement_op(o::return_stmt(Expression::LexicalRead(
            LexicalReadExpr::new("$event"),
        )))));
        let file = Arc::new(ParseSourceFile::new("<button (click)=\"f($event)\">", "test.html"));
        let span = ParseSourceSpan::from_offsets(&file, 0, 7);
        let listener = create_listener_op(XrefId(1), "click", None, handler, false, None, span);
        job.root_unit_mut().create.push(CreateOp::Listener(listener));

        resolve_dollar_event(&mut job).unwrap();

        let Some(CreateOp::Listener(listener)) = job.root_unit().create.iter().next() else {
            panic!("expected a listener");
        };
        assert!(listener.consumes_dollar_event);
        let Some(UpdateOp::Statement(stmt)) = listener.handler_ops.iter().next() else {
            panic!("expected a statement");
        };
        assert!(matches!(&stmt.statement, o::Statement::Return(ret) if ret.value.is_equivalent(&o::variable("$event"))));
    }
}
