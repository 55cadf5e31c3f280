//! Fixture builders shared by the pipeline tests.
//!
//! Templates are assembled by hand; every node points at a span of a small fake source file.

#![allow(dead_code)]

use std::sync::Arc;

use template_pipeline::expression_parser::AST;
use template_pipeline::output::output_ast::{self as o, FunctionExpr, Statement};
use template_pipeline::parse_util::{ParseSourceFile, ParseSourceSpan};
use template_pipeline::render3::r3_ast as t;

const SOURCE: &str = "<div [class.a]=\"x\">{{y}}</div>@defer (on idle) {<span></span>}";

/// Routes pipeline logs to the test output; set `RUST_LOG=debug` to see each pass.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn span() -> ParseSourceSpan {
    span_at(0, 5)
}

pub fn span_at(start: usize, end: usize) -> ParseSourceSpan {
    let file = Arc::new(ParseSourceFile::new(SOURCE, "test.html"));
    ParseSourceSpan::from_offsets(&file, start, end)
}

pub fn element(name: &str, children: Vec<t::R3Node>) -> t::Element {
    t::Element::new(name, children, span())
}

pub fn node(el: t::Element) -> t::R3Node {
    t::R3Node::Element(el)
}

pub fn text(value: &str) -> t::R3Node {
    t::R3Node::Text(t::Text::new(value, span()))
}

/// `{{name}}`
pub fn interpolated_read(name: &str) -> t::R3Node {
    t::R3Node::BoundText(t::BoundText::new(AST::interpolation(vec!["", ""], vec![AST::read(name)]), span()))
}

pub fn bound(name: &str, type_: t::BindingType, value: AST) -> t::BoundAttribute {
    t::BoundAttribute::new(name, type_, value, span())
}

pub fn on(name: &str, parameters: &[&str]) -> t::DeferredTriggerSyntax {
    let parameters = parameters.iter().map(|p| t::TriggerParameter::Text(p.to_string())).collect();
    t::DeferredTriggerSyntax::on(name, parameters, span())
}

/// The calls of an expression statement, innermost first: `ɵɵproperty(a)(b)` yields both links.
pub fn chained_calls(stmt: &Statement) -> Vec<&o::InvokeFunctionExpr> {
    let Statement::Expression(stmt) = stmt else { return Vec::new() };
    let mut calls = Vec::new();
    let mut expr = &*stmt.expr;
    while let o::Expression::InvokeFn(call) = expr {
        calls.push(call);
        expr = &call.fn_;
    }
    calls.reverse();
    calls
}

/// The runtime instruction called by an expression statement, if any.
pub fn instruction_name(stmt: &Statement) -> Option<&str> {
    let first = chained_calls(stmt).into_iter().next()?;
    match &*first.fn_ {
        o::Expression::External(external) => external.value.name.as_deref(),
        _ => None,
    }
}

/// One name per instruction call, with chained calls listed link by link.
pub fn instruction_names(statements: &[Statement]) -> Vec<&str> {
    statements
        .iter()
        .filter_map(|stmt| instruction_name(stmt).map(|name| vec![name; chained_calls(stmt).len()]))
        .flatten()
        .collect()
}

/// Arguments of every call to `name`, in order, looking through chains.
pub fn calls_to<'a>(statements: &'a [Statement], name: &str) -> Vec<&'a [o::Expression]> {
    statements
        .iter()
        .filter(|stmt| instruction_name(stmt) == Some(name))
        .flat_map(chained_calls)
        .map(|call| call.args.as_slice())
        .collect()
}

/// The statements guarded by `if (rf & flag)` in a view function.
pub fn guarded(function: &FunctionExpr, flag: f64) -> Option<&[Statement]> {
    function.statements.iter().find_map(|stmt| {
        let Statement::IfStmt(guard) = stmt else { return None };
        let o::Expression::BinaryOp(condition) = &*guard.condition else { return None };
        match &*condition.rhs {
            o::Expression::Literal(o::LiteralExpr { value: o::LiteralValue::Number(n), .. }) if *n == flag => {
                Some(guard.true_case.as_slice())
            }
            _ => None,
        }
    })
}

pub fn create_instructions(function: &FunctionExpr) -> Vec<&str> {
    guarded(function, 1.0).map(instruction_names).unwrap_or_default()
}

pub fn update_instructions(function: &FunctionExpr) -> Vec<&str> {
    guarded(function, 2.0).map(instruction_names).unwrap_or_default()
}

/// Compares instruction arguments one by one, printing both lists on a mismatch.
pub fn assert_args(actual: &[o::Expression], expected: &[o::Expression]) {
    assert!(
        o::are_all_equivalent(actual, expected),
        "arguments differ\n  actual:   {actual:?}\n  expected: {expected:?}"
    );
}
