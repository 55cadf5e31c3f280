//! Pure Function Extraction Phase
//!
//! Moves the body of every `PureFunctionExpr` into a shared constant arrow function, so that
//! identical pure computations across the whole job share a single declaration.

use crate::constant_pool::{key_of_with, ConstantPool, SharedConstantDefinition};
use crate::error::{CompilerError, Result};
use crate::output::output_ast::{self as o, Expression};
use crate::template::pipeline::ir::{
    transform_expressions_in_expression, PureFunctionExpr, TransformExpressions, VisitorContextFlag,
};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn extract_pure_functions(job: &mut CompilationJob) -> Result<()> {
    let parts = job.parts_mut();
    let pool = parts.pool;
    let mut failure: Option<CompilerError> = None;
    let mut extract = |expr: Expression, _: VisitorContextFlag| match expr {
        Expression::PureFunction(pure) if pure.body.is_some() && failure.is_none() => {
            match extract_body(pool, pure) {
                Ok(extracted) => Expression::PureFunction(extracted),
                Err(err) => {
                    failure = Some(err);
                    Expression::Empty(Default::default())
                }
            }
        }
        other => other,
    };

    for unit in parts.units {
        for op in unit.create.iter_mut() {
            op.transform_expressions(&mut extract, VisitorContextFlag::NONE);
        }
        for op in unit.update.iter_mut() {
            op.transform_expressions(&mut extract, VisitorContextFlag::NONE);
        }
    }
    failure.map_or(Ok(()), Err)
}

fn extract_body(pool: &mut ConstantPool, mut pure: PureFunctionExpr) -> Result<PureFunctionExpr> {
    let Some(body) = pure.body.take() else { return Ok(pure) };
    let definition = PureFunctionConstant { num_args: pure.args.len() };
    pure.fn_ = Some(Box::new(pool.get_shared_constant(&definition, *body)?));
    Ok(pure)
}

/// Declares a pure function body as `const name = (a0, a1, ...) => body;`.
struct PureFunctionConstant {
    num_args: usize,
}

impl SharedConstantDefinition for PureFunctionConstant {
    fn key_of(&self, expr: &Expression) -> Result<String> {
        key_of_with(expr, &|e| match e {
            Expression::PureFunctionParameter(param) => Some(format!("param({})", param.index)),
            _ => None,
        })
    }

    fn to_shared_constant_declaration(&self, name: String, expr: Expression) -> o::Statement {
        let params = (0..self.num_args).map(|i| o::FnParam::new(format!("a{i}"))).collect();
        let body = transform_expressions_in_expression(
            expr,
            &mut |e, _| match e {
                Expression::PureFunctionParameter(param) => o::variable(format!("a{}", param.index)),
                other => other,
            },
            VisitorContextFlag::NONE,
        );
        o::Statement::DeclareVar(o::DeclareVarStmt {
            name,
            value: Some(Box::new(o::arrow_fn(params, o::ArrowFunctionBody::Expression(Box::new(body))))),
            modifiers: o::StmtModifier::Final,
            source_span: None,
        })
    }
}
