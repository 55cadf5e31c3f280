//! Conversion Module
//!
//! Lowers expression-language ASTs into output expressions, leaving logical IR expressions
//! (lexical reads, pipe bindings, safe navigation) for later passes to resolve.

use crate::error::{invariant, CompilerError, Result};
use crate::expression_parser::ast::{self as e, AbsoluteSourceSpan, AST};
use crate::output::output_ast as o;
use crate::parse_util::ParseSourceSpan;
use crate::template::pipeline::ir::{
    ContextExpr, EmptyExpr, LexicalReadExpr, Namespace, PipeBindingExpr, SafeInvokeFunctionExpr,
    SafeKeyedReadExpr, SafePropertyReadExpr,
};
use crate::template::pipeline::src::compilation::CompilationJob;

static BINARY_OPERATORS: &[(&str, o::BinaryOperator)] = &[
    ("&&", o::BinaryOperator::And),
    (">", o::BinaryOperator::Bigger),
    (">=", o::BinaryOperator::BiggerEquals),
    ("|", o::BinaryOperator::BitwiseOr),
    ("&", o::BinaryOperator::BitwiseAnd),
    ("/", o::BinaryOperator::Divide),
    ("=", o::BinaryOperator::Assign),
    ("==", o::BinaryOperator::Equals),
    ("===", o::BinaryOperator::Identical),
    ("<", o::BinaryOperator::Lower),
    ("<=", o::BinaryOperator::LowerEquals),
    ("-", o::BinaryOperator::Minus),
    ("%", o::BinaryOperator::Modulo),
    ("*", o::BinaryOperator::Multiply),
    ("!=", o::BinaryOperator::NotEquals),
    ("!==", o::BinaryOperator::NotIdentical),
    ("??", o::BinaryOperator::NullishCoalesce),
    ("||", o::BinaryOperator::Or),
    ("+", o::BinaryOperator::Plus),
];

pub fn binary_operator_from_str(op: &str) -> Option<o::BinaryOperator> {
    BINARY_OPERATORS.iter().find(|(k, _)| *k == op).map(|(_, v)| *v)
}

pub fn namespace_for_key(namespace_prefix_key: Option<&str>) -> Namespace {
    match namespace_prefix_key {
        Some("svg") => Namespace::SVG,
        Some("math") => Namespace::Math,
        _ => Namespace::HTML,
    }
}

pub fn key_for_namespace(namespace: Namespace) -> Option<&'static str> {
    match namespace {
        Namespace::SVG => Some("svg"),
        Namespace::Math => Some("math"),
        Namespace::HTML => None,
    }
}

/// Splits `:ns:name` into its namespace prefix and local name.
pub fn split_ns_name(element_name: &str) -> Result<(Option<&str>, &str)> {
    let Some(rest) = element_name.strip_prefix(':') else {
        return Ok((None, element_name));
    };
    match rest.find(':') {
        Some(colon) => Ok((Some(&rest[..colon]), &rest[colon + 1..])),
        None => invariant(format!(
            "Unsupported format \"{}\" expecting \":namespace:name\"",
            element_name
        )),
    }
}

pub fn prefix_with_namespace(stripped_tag: &str, namespace: Namespace) -> String {
    match key_for_namespace(namespace) {
        Some(key) => format!(":{}:{}", key, stripped_tag),
        None => stripped_tag.to_string(),
    }
}

/// Maps a span relative to an expression onto the template file.
pub fn convert_source_span(span: AbsoluteSourceSpan, base_source_span: Option<&ParseSourceSpan>) -> Option<ParseSourceSpan> {
    let base = base_source_span?;
    let start = base.start.move_by(span.start as i32);
    let end = base.start.move_by(span.end as i32);
    Some(ParseSourceSpan::new(start, end))
}

fn convert_literal(value: &e::LiteralValue) -> o::LiteralValue {
    match value {
        e::LiteralValue::String(s) => o::LiteralValue::String(s.clone()),
        e::LiteralValue::Number(n) => o::LiteralValue::Number(*n),
        e::LiteralValue::Boolean(b) => o::LiteralValue::Bool(*b),
        e::LiteralValue::Null => o::LiteralValue::Null,
        e::LiteralValue::Undefined => o::LiteralValue::Undefined,
    }
}

fn convert_all(asts: &[AST], job: &mut CompilationJob, base: Option<&ParseSourceSpan>) -> Result<Vec<o::Expression>> {
    asts.iter().map(|ast| convert_ast(ast, job, base)).collect()
}

/// Converts a template AST expression into an output expression.
///
/// Reads from the implicit receiver become `LexicalRead`s, resolved against the view's
/// variables by name resolution. Each pipe gets a fresh xref for its `Pipe` op.
pub fn convert_ast(ast: &AST, job: &mut CompilationJob, base: Option<&ParseSourceSpan>) -> Result<o::Expression> {
    let expr = match ast {
        AST::PropertyRead(read) => match read.receiver.as_ref() {
            AST::ImplicitReceiver(_) => o::Expression::LexicalRead(LexicalReadExpr {
                name: read.name.clone(),
                source_span: convert_source_span(read.source_span, base),
            }),
            AST::ThisReceiver(_) => o::Expression::ReadProp(o::ReadPropExpr {
                receiver: Box::new(o::Expression::Context(ContextExpr::new(job.root))),
                name: read.name.clone(),
                source_span: convert_source_span(read.source_span, base),
            }),
            receiver => o::Expression::ReadProp(o::ReadPropExpr {
                receiver: Box::new(convert_ast(receiver, job, base)?),
                name: read.name.clone(),
                source_span: convert_source_span(read.source_span, base),
            }),
        },
        AST::PropertyWrite(write) => {
            let receiver = match write.receiver.as_ref() {
                AST::ImplicitReceiver(_) | AST::ThisReceiver(_) => o::Expression::Context(ContextExpr::new(job.root)),
                receiver => convert_ast(receiver, job, base)?,
            };
            o::Expression::WriteProp(o::WritePropExpr {
                receiver: Box::new(receiver),
                name: write.name.clone(),
                value: Box::new(convert_ast(&write.value, job, base)?),
                source_span: convert_source_span(write.source_span, base),
            })
        }
        AST::KeyedWrite(write) => o::Expression::WriteKey(o::WriteKeyExpr {
            receiver: Box::new(convert_ast(&write.receiver, job, base)?),
            index: Box::new(convert_ast(&write.key, job, base)?),
            value: Box::new(convert_ast(&write.value, job, base)?),
            source_span: convert_source_span(write.source_span, base),
        }),
        AST::Call(call) => {
            if call.receiver.is_implicit_receiver() {
                return invariant("Unexpected ImplicitReceiver in Call expression");
            }
            o::Expression::InvokeFn(o::InvokeFunctionExpr {
                fn_: Box::new(convert_ast(&call.receiver, job, base)?),
                args: convert_all(&call.args, job, base)?,
                source_span: convert_source_span(call.source_span, base),
                pure: false,
            })
        }
        AST::LiteralPrimitive(lit) => o::Expression::Literal(o::LiteralExpr {
            value: convert_literal(&lit.value),
            source_span: convert_source_span(lit.source_span, base),
        }),
        AST::Unary(unary) => {
            let operator = match unary.operator.as_str() {
                "+" => o::UnaryOperator::Plus,
                "-" => o::UnaryOperator::Minus,
                other => return invariant(format!("unknown unary operator {}", other)),
            };
            o::Expression::Unary(o::UnaryOperatorExpr {
                operator,
                expr: Box::new(convert_ast(&unary.expr, job, base)?),
                source_span: convert_source_span(unary.source_span, base),
            })
        }
        AST::Binary(binary) => {
            let operator = binary_operator_from_str(&binary.operation)
                .ok_or_else(|| CompilerError::Invariant(format!("unknown binary operator {}", binary.operation)))?;
            o::Expression::BinaryOp(o::BinaryOperatorExpr {
                operator,
                lhs: Box::new(convert_ast(&binary.left, job, base)?),
                rhs: Box::new(convert_ast(&binary.right, job, base)?),
                source_span: convert_source_span(binary.source_span, base),
            })
        }
        AST::ThisReceiver(_) => o::Expression::Context(ContextExpr::new(job.root)),
        AST::KeyedRead(read) => o::Expression::ReadKey(o::ReadKeyExpr {
            receiver: Box::new(convert_ast(&read.receiver, job, base)?),
            index: Box::new(convert_ast(&read.key, job, base)?),
            source_span: convert_source_span(read.source_span, base),
        }),
        AST::Chain(_) => return invariant("Chain in unknown context"),
        AST::LiteralMap(map) => o::Expression::LiteralMap(o::LiteralMapExpr {
            entries: map
                .keys
                .iter()
                .zip(&map.values)
                .map(|(key, value)| Ok(o::LiteralMapEntry::new(key.key.clone(), convert_ast(value, job, base)?, key.quoted)))
                .collect::<Result<Vec<_>>>()?,
            source_span: convert_source_span(map.source_span, base),
        }),
        AST::LiteralArray(arr) => o::Expression::LiteralArray(o::LiteralArrayExpr {
            entries: convert_all(&arr.expressions, job, base)?,
            source_span: convert_source_span(arr.source_span, base),
        }),
        AST::Conditional(cond) => o::Expression::Conditional(o::ConditionalExpr {
            condition: Box::new(convert_ast(&cond.condition, job, base)?),
            true_case: Box::new(convert_ast(&cond.true_exp, job, base)?),
            false_case: Some(Box::new(convert_ast(&cond.false_exp, job, base)?)),
            source_span: convert_source_span(cond.source_span, base),
        }),
        // Non-null assertions don't affect generated instructions.
        AST::NonNullAssert(assert) => convert_ast(&assert.expression, job, base)?,
        AST::BindingPipe(pipe) => {
            let xref = job.allocate_xref_id();
            let mut args = vec![convert_ast(&pipe.exp, job, base)?];
            args.extend(convert_all(&pipe.args, job, base)?);
            o::Expression::PipeBinding(PipeBindingExpr::new(xref, pipe.name.clone(), args))
        }
        AST::SafeKeyedRead(read) => o::Expression::SafeKeyedRead(SafeKeyedReadExpr {
            receiver: Box::new(convert_ast(&read.receiver, job, base)?),
            index: Box::new(convert_ast(&read.key, job, base)?),
            source_span: convert_source_span(read.source_span, base),
        }),
        AST::SafePropertyRead(read) => o::Expression::SafePropertyRead(SafePropertyReadExpr {
            receiver: Box::new(convert_ast(&read.receiver, job, base)?),
            name: read.name.clone(),
        }),
        AST::SafeCall(call) => o::Expression::SafeInvokeFunction(SafeInvokeFunctionExpr {
            receiver: Box::new(convert_ast(&call.receiver, job, base)?),
            args: convert_all(&call.args, job, base)?,
        }),
        AST::EmptyExpr(empty) => o::Expression::Empty(EmptyExpr {
            source_span: convert_source_span(empty.source_span, base),
        }),
        AST::PrefixNot(not) => o::Expression::NotExpr(o::NotExpr {
            condition: Box::new(convert_ast(&not.expression, job, base)?),
            source_span: convert_source_span(not.source_span, base),
        }),
        AST::TypeofExpression(typeof_expr) => o::typeof_expr(convert_ast(&typeof_expr.expression, job, base)?),
        AST::ParenthesizedExpression(parens) => convert_ast(&parens.expression, job, base)?,
        AST::ImplicitReceiver(_) => return invariant("ImplicitReceiver outside of a property read"),
        AST::Interpolation(_) => return invariant("Interpolation in an expression position"),
    };
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::constant_pool::ConstantPool;

    fn job() -> CompilationJob {
        CompilationJob::component("Cmp", ConstantPool::new(), PipelineConfig::default())
    }

    #[test]
    fn implicit_reads_become_lexical_reads() {
        let mut job = job();
        let expr = convert_ast(&AST::read("user").prop("name"), &mut job, None).unwrap();
        match expr {
            o::Expression::ReadProp(read) => {
                assert_eq!(read.name, "name");
                assert!(matches!(*read.receiver, o::Expression::LexicalRead(ref l) if l.name == "user"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pipes_allocate_an_xref_each() {
        let mut job = job();
        let ast = AST::read("a").pipe("async", vec![]).pipe("json", vec![AST::number(2.0)]);
        let expr = convert_ast(&ast, &mut job, None).unwrap();
        match expr {
            o::Expression::PipeBinding(outer) => {
                assert_eq!(outer.name, "json");
                assert_eq!(outer.args.len(), 2);
                assert!(matches!(&outer.args[0], o::Expression::PipeBinding(inner) if inner.target > outer.target));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn chains_are_rejected_outside_listeners() {
        let mut job = job();
        let err = convert_ast(&AST::chain(vec![AST::read("a")]), &mut job, None).unwrap_err();
        assert!(matches!(err, CompilerError::Invariant(_)));
    }

    #[test]
    fn namespaced_names_are_split() {
        assert_eq!(split_ns_name(":svg:rect").unwrap(), (Some("svg"), "rect"));
        assert_eq!(split_ns_name("div").unwrap(), (None, "div"));
        assert!(split_ns_name(":svg").is_err());
        assert_eq!(prefix_with_namespace("circle", Namespace::SVG), ":svg:circle");
    }
}
