//! Pure Literal Structures Phase
//!
//! Literal arrays and maps in update expressions are memoized. Entries which are not constant
//! become arguments of a pure function, so the structure is only rebuilt when they change;
//! structures with no dynamic entries at all are pooled as constants.

use crate::constant_pool::ConstantPool;
use crate::error::{CompilerError, Result};
use crate::output::output_ast::{self as o, Expression, LiteralArrayExpr, LiteralMapExpr, LiteralMapEntry};
use crate::template::pipeline::ir::{
    transform_expressions_in_op, PureFunctionExpr, PureFunctionParameterExpr, VisitorContextFlag,
};
use crate::template::pipeline::src::compilation::CompilationJob;

pub fn generate_pure_literal_structures(job: &mut CompilationJob) -> Result<()> {
    let parts = job.parts_mut();
    let pool = parts.pool;
    let mut failure: Option<CompilerError> = None;
    for unit in parts.units {
        for op in unit.update.iter_mut() {
            transform_expressions_in_op(
                op,
                &mut |expr, flags| {
                    if flags.contains(VisitorContextFlag::IN_CHILD_OPERATION) {
                        return expr;
                    }
                    match expr {
                        Expression::LiteralArray(_) | Expression::LiteralMap(_) if expr.is_constant() => {
                            pool_constant(pool, expr, &mut failure)
                        }
                        Expression::LiteralArray(arr) => transform_literal_array(arr),
                        Expression::LiteralMap(map) => transform_literal_map(map),
                        other => other,
                    }
                },
                VisitorContextFlag::NONE,
            );
        }
    }
    failure.map_or(Ok(()), Err)
}

fn pool_constant(pool: &mut ConstantPool, expr: Expression, failure: &mut Option<CompilerError>) -> Expression {
    match pool.get_const_literal(expr.clone(), false) {
        Ok(pooled) => pooled,
        Err(err) => {
            failure.get_or_insert(err);
            expr
        }
    }
}

fn parameter(index: usize) -> Expression {
    Expression::PureFunctionParameter(PureFunctionParameterExpr { index })
}

fn transform_literal_array(expr: LiteralArrayExpr) -> Expression {
    let mut derived_entries = Vec::with_capacity(expr.entries.len());
    let mut non_constant_args = Vec::new();
    for entry in expr.entries {
        if entry.is_constant() {
            derived_entries.push(entry);
        } else {
            derived_entries.push(parameter(non_constant_args.len()));
            non_constant_args.push(entry);
        }
    }
    Expression::PureFunction(PureFunctionExpr::new(o::literal_arr(derived_entries), non_constant_args))
}

fn transform_literal_map(expr: LiteralMapExpr) -> Expression {
    let mut derived_entries = Vec::with_capacity(expr.entries.len());
    let mut non_constant_args = Vec::new();
    for entry in expr.entries {
        if entry.value.is_constant() {
            derived_entries.push(entry);
        } else {
            derived_entries.push(LiteralMapEntry::new(entry.key, parameter(non_constant_args.len()), entry.quoted));
            non_constant_args.push(*entry.value);
        }
    }
    Expression::PureFunction(PureFunctionExpr::new(o::literal_map(derived_entries), non_constant_args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_entries_become_parameters() {
        let arr = LiteralArrayExpr {
            entries: vec![o::literal("a"), o::variable("x"), o::variable("y")],
            source_span: None,
        };
        let Expression::PureFunction(pure) = transform_literal_array(arr) else {
            panic!("expected a pure function");
        };
        assert_eq!(pure.args.len(), 2);
        let body = pure.body.expect("body");
        let Expression::LiteralArray(body) = *body else {
            panic!("expected an array body");
        };
        assert!(matches!(body.entries[1], Expression::PureFunctionParameter(PureFunctionParameterExpr { index: 0 })));
        assert!(matches!(body.entries[2], Expression::PureFunctionParameter(PureFunctionParameterExpr { index: 1 })));
    }

    #[test]
    fn map_keys_survive() {
        let map = LiteralMapExpr {
            entries: vec![LiteralMapEntry::new("k", o::variable("v"), true)],
            source_span: None,
        };
        let Expression::PureFunction(pure) = transform_literal_map(map) else {
            panic!("expected a pure function");
        };
        let Some(body) = pure.body else {
            panic!("expected a body");
        };
        match *body {
            Expression::LiteralMap(map) => {
                assert_eq!(map.entries[0].key, "k");
                assert!(map.entries[0].quoted);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
