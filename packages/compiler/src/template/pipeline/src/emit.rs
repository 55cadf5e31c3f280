//! Emission
//!
//! Assembles the reified op lists of a job into output function expressions. Every view becomes
//! a `function NAME(rf, ctx)` whose create and update statements are guarded by the render
//! flags; child views are hoisted into the constant pool as named function declarations.

use log::debug;

use crate::error::{invariant, CompilerError, Result};
use crate::output::output_ast::{self as o, FunctionExpr, Statement};
use crate::template::pipeline::ir::{CompilationJobKind, CreateOp, Op, OpList, UpdateOp, XrefId};
use crate::template::pipeline::src::compilation::{CompilationJob, ViewCompilationUnit};

/// Render flag set while the view is being created.
const RENDER_FLAG_CREATE: usize = 1;
/// Render flag set while the view's bindings are being refreshed.
const RENDER_FLAG_UPDATE: usize = 2;

/// Emits the template function of a component job.
///
/// Child views are declared in the job's constant pool, deepest first, and the function of the
/// root view is returned.
pub fn emit_template_fn(job: &mut CompilationJob) -> Result<FunctionExpr> {
    if job.kind != CompilationJobKind::Tmpl {
        return invariant("template functions can only be emitted for template jobs");
    }
    let root_fn = emit_view(job.root_unit())?;

    let mut declarations = Vec::new();
    emit_child_views(job, job.root, &mut declarations)?;
    for declaration in declarations {
        job.pool.add_statement(declaration);
    }
    Ok(root_fn)
}

fn emit_child_views(job: &CompilationJob, parent: XrefId, out: &mut Vec<Statement>) -> Result<()> {
    for unit in job.units().filter(|unit| unit.parent == Some(parent)) {
        emit_child_views(job, unit.xref, out)?;

        let view_fn = emit_view(unit)?;
        let name = view_fn.name.clone().ok_or(CompilerError::UnnamedView(unit.xref))?;
        out.push(view_fn.to_decl_stmt(name, o::StmtModifier::None));
    }
    Ok(())
}

/// Emits the function of a single view, `function NAME(rf, ctx) { ... }`.
pub fn emit_view(unit: &ViewCompilationUnit) -> Result<FunctionExpr> {
    let name = unit.fn_name.clone().ok_or(CompilerError::UnnamedView(unit.xref))?;
    let create = collect_statements(&unit.create, "create")?;
    let update = collect_statements(&unit.update, "update")?;
    debug!(
        "emitting view function {name} ({} create, {} update statements)",
        create.len(),
        update.len()
    );
    Ok(render_function(name, create, update))
}

/// Emits the host bindings function of a host job, or `None` when it has nothing to do.
pub fn emit_host_binding_function(job: &CompilationJob) -> Result<Option<FunctionExpr>> {
    if job.kind != CompilationJobKind::Host {
        return invariant("host binding functions can only be emitted for host jobs");
    }
    let root = job.root_unit();
    let name = root.fn_name.clone().ok_or(CompilerError::UnnamedView(root.xref))?;
    let create = collect_statements(&root.create, "create")?;
    let update = collect_statements(&root.update, "update")?;
    if create.is_empty() && update.is_empty() {
        debug!("host bindings of {} are empty", job.component_name);
        return Ok(None);
    }
    debug!("emitting host bindings function {name}");
    Ok(Some(render_function(name, create, update)))
}

fn render_function(name: String, create: Vec<Statement>, update: Vec<Statement>) -> FunctionExpr {
    let mut statements = Vec::with_capacity(2);
    statements.extend(render_flag_block(RENDER_FLAG_CREATE, create));
    statements.extend(render_flag_block(RENDER_FLAG_UPDATE, update));
    FunctionExpr {
        params: vec![o::FnParam::new("rf"), o::FnParam::new("ctx")],
        statements,
        source_span: None,
        name: Some(name),
    }
}

/// Wraps `statements` in `if (rf & flag) { ... }`; no block at all when there are none.
fn render_flag_block(flag: usize, statements: Vec<Statement>) -> Option<Statement> {
    if statements.is_empty() {
        return None;
    }
    let condition = o::variable("rf").bitwise_and(o::literal(flag));
    Some(o::if_stmt(condition, statements))
}

fn collect_statements<T>(ops: &OpList<T>, list: &'static str) -> Result<Vec<Statement>>
where
    T: Op + StatementSource,
{
    ops.iter()
        .map(|op| {
            op.statement()
                .cloned()
                .ok_or_else(|| CompilerError::UnreifiedOp { list, kind: op.kind() })
        })
        .collect()
}

/// Ops that carry a finished output statement once reified.
trait StatementSource {
    fn statement(&self) -> Option<&Statement>;
}

impl StatementSource for CreateOp {
    fn statement(&self) -> Option<&Statement> {
        match self {
            CreateOp::Statement(op) => Some(&op.statement),
            _ => None,
        }
    }
}

impl StatementSource for UpdateOp {
    fn statement(&self) -> Option<&Statement> {
        match self {
            UpdateOp::Statement(op) => Some(&op.statement),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;
    use crate::template::pipeline::ir::{create_advance_op, create_statement_op, OpKind};

    fn call(name: &str) -> Statement {
        o::variable(name).call_fn(vec![], None).to_stmt()
    }

    fn guard_flag(stmt: &Statement) -> usize {
        let Statement::IfStmt(if_stmt) = stmt else { panic!("expected a guard") };
        let o::Expression::BinaryOp(binary) = &*if_stmt.condition else { panic!("expected `rf & flag`") };
        let o::Expression::Literal(lit) = &*binary.rhs else { panic!("expected a flag literal") };
        match lit.value {
            o::LiteralValue::Number(n) => n as usize,
            _ => panic!("expected a numeric flag"),
        }
    }

    #[test]
    fn create_only_views_have_a_single_guard() {
        let mut unit = ViewCompilationUnit::new(XrefId(0), None);
        unit.fn_name = Some("Cmp_Template".to_string());
        unit.create.push(CreateOp::Statement(create_statement_op(call("a"))));

        let view_fn = emit_view(&unit).unwrap();

        assert_eq!(view_fn.name.as_deref(), Some("Cmp_Template"));
        let params: Vec<&str> = view_fn.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["rf", "ctx"]);
        assert_eq!(view_fn.statements.len(), 1);
        assert_eq!(guard_flag(&view_fn.statements[0]), 1);
    }

    #[test]
    fn empty_views_have_no_guards() {
        let mut unit = ViewCompilationUnit::new(XrefId(0), None);
        unit.fn_name = Some("Cmp_Template".to_string());
        assert!(emit_view(&unit).unwrap().statements.is_empty());
    }

    #[test]
    fn unnamed_views_are_rejected() {
        let unit = ViewCompilationUnit::new(XrefId(3), None);
        assert_eq!(
            emit_view(&unit).unwrap_err(),
            CompilerError::UnnamedView(XrefId(3))
        );
    }

    #[test]
    fn unreified_ops_are_rejected() {
        let mut unit = ViewCompilationUnit::new(XrefId(0), None);
        unit.fn_name = Some("Cmp_Template".to_string());
        unit.update.push(create_advance_op(1, None));
        assert_eq!(
            emit_view(&unit).unwrap_err(),
            CompilerError::UnreifiedOp { list: "update", kind: OpKind::Advance }
        );
    }

    #[test]
    fn grandchildren_are_declared_before_children() {
        let mut job = CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default());
        let child = job.allocate_view(job.root);
        let grandchild = job.allocate_view(child);
        job.root_unit_mut().fn_name = Some("Cmp_Template".to_string());
        job.view_mut(child).unwrap().fn_name = Some("Cmp_Template_1".to_string());
        job.view_mut(grandchild).unwrap().fn_name = Some("Cmp_Template_2".to_string());

        let root_fn = emit_template_fn(&mut job).unwrap();

        assert_eq!(root_fn.name.as_deref(), Some("Cmp_Template"));
        let declared: Vec<String> = job
            .pool
            .statements()
            .into_iter()
            .map(|stmt| match stmt {
                Statement::DeclareFn(decl) => decl.name,
                other => panic!("unexpected statement {other:?}"),
            })
            .collect();
        assert_eq!(declared, vec!["Cmp_Template_2", "Cmp_Template_1"]);
    }

    #[test]
    fn empty_host_bindings_emit_nothing() {
        let mut job = CompilationJob::host_binding("Dir", ConstantPool::new(), PipelineConfig::default());
        job.root_unit_mut().fn_name = Some("Dir_HostBindings".to_string());
        assert!(emit_host_binding_function(&job).unwrap().is_none());

        job.root_unit_mut().update.push(UpdateOp::Statement(create_statement_op(call("b"))));
        let host_fn = emit_host_binding_function(&job).unwrap().unwrap();
        assert_eq!(host_fn.statements.len(), 1);
        assert_eq!(guard_flag(&host_fn.statements[0]), 2);
    }
}
