//! Constant Pool
//!
//! ConstantPool tries to reuse literal factories when two or more literals are identical.
//! This optimizes the generated code by avoiding duplicate constant definitions.
//!
//! A literal seen for the first time is handed out as a `Fixup` handle that resolves to the
//! literal itself. When the same literal is requested again, a `const _cN` declaration is
//! emitted and every handle for that literal is forwarded to the shared variable.

use indexmap::IndexMap;
use log::trace;

use crate::error::{CompilerError, Result};
use crate::output::output_ast as o;
use crate::template::pipeline::ir::expression::{
    transform_expressions_in_expression, transform_expressions_in_statement, VisitorContextFlag,
};

const CONSTANT_PREFIX: &str = "_c";

/// Strings shorter than this stay inline instead of being hoisted into the pool.
pub const POOL_INCLUSION_LENGTH_THRESHOLD_FOR_STRINGS: usize = 50;

/// Handle to a pooled literal. Resolved through `ConstantPool::resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixupRef(pub usize);

/// A pooled literal: used as-is until it is shared, then forwarded to its variable.
#[derive(Debug, Clone)]
pub enum FixupExpression {
    Direct(o::Expression),
    Forwarded {
        original: o::Expression,
        target: o::Expression,
    },
}

impl FixupExpression {
    pub fn original(&self) -> &o::Expression {
        match self {
            FixupExpression::Direct(original) => original,
            FixupExpression::Forwarded { original, .. } => original,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, FixupExpression::Forwarded { .. })
    }
}

/// A keyed kind of pooled constant whose declaration shape is chosen by the definition.
pub trait SharedConstantDefinition {
    fn key_of(&self, expr: &o::Expression) -> Result<String>;
    fn to_shared_constant_declaration(&self, name: String, expr: o::Expression) -> o::Statement;
}

/// Structural keys for the expressions the pool can deduplicate.
pub struct GenericKeyFn;

impl GenericKeyFn {
    pub const INSTANCE: GenericKeyFn = GenericKeyFn;

    pub fn key_of(&self, expr: &o::Expression) -> Result<String> {
        key_of_with(expr, &|_| None)
    }
}

/// Builds the key of `expr`, asking `special` first for every node so definitions can key
/// their own placeholder expressions.
pub fn key_of_with(
    expr: &o::Expression,
    special: &dyn Fn(&o::Expression) -> Option<String>,
) -> Result<String> {
    if let Some(key) = special(expr) {
        return Ok(key);
    }
    let key = match expr {
        o::Expression::Literal(lit) => match &lit.value {
            o::LiteralValue::String(s) => format!("\"{}\"", s),
            o::LiteralValue::Number(n) => n.to_string(),
            o::LiteralValue::Bool(b) => b.to_string(),
            o::LiteralValue::Null => "null".to_string(),
            o::LiteralValue::Undefined => "undefined".to_string(),
        },
        o::Expression::LiteralArray(arr) => {
            let entries = arr
                .entries
                .iter()
                .map(|e| key_of_with(e, special))
                .collect::<Result<Vec<_>>>()?;
            format!("[{}]", entries.join(","))
        }
        o::Expression::LiteralMap(map) => {
            let entries = map
                .entries
                .iter()
                .map(|e| {
                    let key = if e.quoted {
                        format!("\"{}\"", e.key)
                    } else {
                        e.key.clone()
                    };
                    Ok(format!("{}:{}", key, key_of_with(&e.value, special)?))
                })
                .collect::<Result<Vec<_>>>()?;
            format!("{{{}}}", entries.join(","))
        }
        o::Expression::External(ext) => format!(
            "import(\"{}\", {})",
            ext.value.module_name.as_deref().unwrap_or(""),
            ext.value.name.as_deref().unwrap_or("")
        ),
        o::Expression::ReadVar(read) => format!("read({})", read.name),
        o::Expression::TypeOf(t) => format!("typeof({})", key_of_with(&t.expr, special)?),
        o::Expression::Fixup(fixup) => format!("fixup({})", fixup.0),
        other => return Err(CompilerError::UnsupportedConstantKey(format!("{:?}", other))),
    };
    Ok(key)
}

/// A factory function for a literal with dynamic entries, plus the arguments to call it with.
#[derive(Debug, Clone)]
pub struct LiteralFactory {
    pub literal_factory: o::Expression,
    pub literal_factory_arguments: Vec<o::Expression>,
}

#[derive(Debug)]
pub struct ConstantPool {
    statements: Vec<o::Statement>,
    fixups: Vec<FixupExpression>,
    literals: IndexMap<String, FixupRef>,
    literal_factories: IndexMap<String, o::Expression>,
    shared_constants: IndexMap<String, o::Expression>,
    claimed_names: IndexMap<String, usize>,
    string_threshold: usize,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::with_string_threshold(POOL_INCLUSION_LENGTH_THRESHOLD_FOR_STRINGS)
    }

    pub fn with_string_threshold(string_threshold: usize) -> Self {
        ConstantPool {
            statements: Vec::new(),
            fixups: Vec::new(),
            literals: IndexMap::new(),
            literal_factories: IndexMap::new(),
            shared_constants: IndexMap::new(),
            claimed_names: IndexMap::new(),
            string_threshold,
        }
    }

    fn is_long_string_literal(&self, expr: &o::Expression) -> bool {
        matches!(
            expr,
            o::Expression::Literal(o::LiteralExpr { value: o::LiteralValue::String(s), .. })
                if s.len() >= self.string_threshold
        )
    }

    /// Returns a pooled handle for `literal`, or `literal` itself when it is a short primitive
    /// or already a pooled handle.
    pub fn get_const_literal(&mut self, literal: o::Expression, force_shared: bool) -> Result<o::Expression> {
        if matches!(literal, o::Expression::Fixup(_))
            || (literal.is_literal_primitive() && !self.is_long_string_literal(&literal))
        {
            return Ok(literal);
        }

        let key = GenericKeyFn::INSTANCE.key_of(&literal)?;
        let (fixup, is_new) = match self.literals.get(&key) {
            Some(existing) => (*existing, false),
            None => {
                let fixup = FixupRef(self.fixups.len());
                self.fixups.push(FixupExpression::Direct(literal));
                self.literals.insert(key.clone(), fixup);
                (fixup, true)
            }
        };

        let shared = self.fixups[fixup.0].is_shared();
        if (!is_new && !shared) || (is_new && force_shared) {
            let name = self.fresh_name();
            let original = self.fixups[fixup.0].original().clone();
            self.statements.push(declare_final(&name, original.clone()));
            trace!("forwarding pooled literal {} to {}", key, name);
            self.fixups[fixup.0] = FixupExpression::Forwarded {
                original,
                target: o::variable(name),
            };
        }

        Ok(o::Expression::Fixup(fixup))
    }

    pub fn get_shared_constant(
        &mut self,
        definition: &dyn SharedConstantDefinition,
        expr: o::Expression,
    ) -> Result<o::Expression> {
        let key = definition.key_of(&expr)?;
        if let Some(existing) = self.shared_constants.get(&key) {
            return Ok(existing.clone());
        }
        let id = self.fresh_name();
        let usage = o::variable(id.clone());
        self.statements.push(definition.to_shared_constant_declaration(id, expr));
        self.shared_constants.insert(key, usage.clone());
        Ok(usage)
    }

    /// Returns a reference to a declared function equivalent to `fn_expr`, declaring it first
    /// if no such function exists.
    pub fn get_shared_function_reference(
        &mut self,
        fn_expr: o::Expression,
        prefix: &str,
        use_unique_name: bool,
    ) -> o::Expression {
        let is_arrow = matches!(fn_expr, o::Expression::ArrowFn(_));
        for current in &self.statements {
            match (current, &fn_expr) {
                (o::Statement::DeclareVar(decl), _) if is_arrow => {
                    if decl.value.as_ref().is_some_and(|v| v.is_equivalent(&fn_expr)) {
                        return o::variable(decl.name.clone());
                    }
                }
                (o::Statement::DeclareFn(decl), o::Expression::Fn(func)) => {
                    if decl.params == func.params
                        && o::are_all_statements_equivalent(&decl.statements, &func.statements)
                    {
                        return o::variable(decl.name.clone());
                    }
                }
                _ => {}
            }
        }

        let name = if use_unique_name {
            self.unique_name(prefix, true)
        } else {
            prefix.to_string()
        };
        let stmt = match fn_expr {
            o::Expression::Fn(func) => func.to_decl_stmt(name.clone(), o::StmtModifier::Final),
            other => declare_final(&name, other),
        };
        self.statements.push(stmt);
        o::variable(name)
    }

    /// Returns a factory for a literal array or map whose non-constant entries become
    /// parameters `a0..`, along with the non-constant entries to call it with.
    pub fn get_literal_factory(&mut self, literal: o::Expression) -> Result<LiteralFactory> {
        let unknown = || o::variable("<unknown>");
        match literal {
            o::Expression::LiteralArray(arr) => {
                let for_key = o::literal_arr(
                    arr.entries
                        .iter()
                        .map(|e| if e.is_constant() { e.clone() } else { unknown() })
                        .collect(),
                );
                let key = GenericKeyFn::INSTANCE.key_of(&for_key)?;
                self.literal_factory_for(key, arr.entries, o::literal_arr)
            }
            o::Expression::LiteralMap(map) => {
                let for_key = o::literal_map(
                    map.entries
                        .iter()
                        .map(|e| {
                            let value = if e.value.is_constant() {
                                (*e.value).clone()
                            } else {
                                unknown()
                            };
                            o::LiteralMapEntry::new(e.key.clone(), value, e.quoted)
                        })
                        .collect(),
                );
                let key = GenericKeyFn::INSTANCE.key_of(&for_key)?;
                let keys: Vec<(String, bool)> =
                    map.entries.iter().map(|e| (e.key.clone(), e.quoted)).collect();
                let values = map.entries.into_iter().map(|e| *e.value).collect();
                self.literal_factory_for(key, values, move |values| {
                    o::literal_map(
                        values
                            .into_iter()
                            .zip(&keys)
                            .map(|(value, (key, quoted))| o::LiteralMapEntry::new(key.clone(), value, *quoted))
                            .collect(),
                    )
                })
            }
            other => Err(CompilerError::UnsupportedConstantKey(format!(
                "literal factory for non-literal {:?}",
                other
            ))),
        }
    }

    fn literal_factory_for(
        &mut self,
        key: String,
        values: Vec<o::Expression>,
        result_map: impl FnOnce(Vec<o::Expression>) -> o::Expression,
    ) -> Result<LiteralFactory> {
        let literal_factory_arguments: Vec<o::Expression> =
            values.iter().filter(|e| !e.is_constant()).cloned().collect();

        if let Some(existing) = self.literal_factories.get(&key) {
            return Ok(LiteralFactory {
                literal_factory: existing.clone(),
                literal_factory_arguments,
            });
        }

        let mut params = Vec::new();
        let mut result_expressions = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            if value.is_constant() {
                result_expressions.push(self.get_const_literal(value, true)?);
            } else {
                let name = format!("a{}", index);
                params.push(o::FnParam::new(name.clone()));
                result_expressions.push(o::variable(name));
            }
        }
        let factory = o::arrow_fn(
            params,
            o::ArrowFunctionBody::Expression(Box::new(result_map(result_expressions))),
        );
        let name = self.fresh_name();
        self.statements.push(declare_final(&name, factory));
        let literal_factory = o::variable(name);
        self.literal_factories.insert(key, literal_factory.clone());
        Ok(LiteralFactory {
            literal_factory,
            literal_factory_arguments,
        })
    }

    /// Produces a unique name. The first request for `name` returns it bare unless
    /// `always_include_suffix` is set; later requests append a counter.
    pub fn unique_name(&mut self, name: &str, always_include_suffix: bool) -> String {
        let count = self.claimed_names.get(name).copied().unwrap_or(0);
        let result = if count == 0 && !always_include_suffix {
            name.to_string()
        } else {
            format!("{}{}", name, count)
        };
        self.claimed_names.insert(name.to_string(), count + 1);
        result
    }

    pub fn fresh_name(&mut self) -> String {
        self.unique_name(CONSTANT_PREFIX, true)
    }

    /// Declares an arbitrary statement, e.g. an emitted child view function.
    pub fn add_statement(&mut self, stmt: o::Statement) {
        self.statements.push(stmt);
    }

    pub fn fixup(&self, fixup: FixupRef) -> Option<&FixupExpression> {
        self.fixups.get(fixup.0)
    }

    /// Returns `expr` with every pooled handle replaced by its current target.
    pub fn resolve(&self, expr: o::Expression) -> o::Expression {
        transform_expressions_in_expression(
            expr,
            &mut |e, _| match e {
                o::Expression::Fixup(fixup) => self.resolve_fixup(fixup),
                other => other,
            },
            VisitorContextFlag::NONE,
        )
    }

    fn resolve_fixup(&self, fixup: FixupRef) -> o::Expression {
        match self.fixups.get(fixup.0) {
            Some(FixupExpression::Direct(original)) => self.resolve(original.clone()),
            Some(FixupExpression::Forwarded { target, .. }) => target.clone(),
            None => o::Expression::Fixup(fixup),
        }
    }

    /// Resolves handles in a statement in place.
    pub fn resolve_statement(&self, stmt: &mut o::Statement) {
        transform_expressions_in_statement(
            stmt,
            &mut |e, _| match e {
                o::Expression::Fixup(fixup) => self.resolve_fixup(fixup),
                other => other,
            },
            VisitorContextFlag::NONE,
        );
    }

    /// The declarations made so far, in order, with pooled handles resolved.
    pub fn statements(&self) -> Vec<o::Statement> {
        self.statements
            .iter()
            .cloned()
            .map(|mut stmt| {
                self.resolve_statement(&mut stmt);
                stmt
            })
            .collect()
    }
}

fn declare_final(name: &str, value: o::Expression) -> o::Statement {
    o::Statement::DeclareVar(o::DeclareVarStmt {
        name: name.to_string(),
        value: Some(Box::new(value)),
        modifiers: o::StmtModifier::Final,
        source_span: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared_names(pool: &ConstantPool) -> Vec<String> {
        pool.statements()
            .iter()
            .filter_map(|s| match s {
                o::Statement::DeclareVar(d) => Some(d.name.clone()),
                o::Statement::DeclareFn(d) => Some(d.name.clone()),
                _ => None,
            })
            .collect()
    }

    fn read_var_name(expr: &o::Expression) -> Option<&str> {
        match expr {
            o::Expression::ReadVar(v) => Some(&v.name),
            _ => None,
        }
    }

    #[test]
    fn short_primitives_are_not_pooled() {
        let mut pool = ConstantPool::new();
        let expr = pool.get_const_literal(o::literal("short"), true).unwrap();
        assert!(expr.is_equivalent(&o::literal("short")));
        assert!(pool.statements().is_empty());
    }

    #[test]
    fn forced_literals_share_one_declaration() {
        let mut pool = ConstantPool::new();
        let arr = || o::literal_arr(vec![o::literal("a"), o::literal(1.0)]);
        let first = pool.get_const_literal(arr(), true).unwrap();
        let second = pool.get_const_literal(arr(), true).unwrap();
        assert_eq!(read_var_name(&pool.resolve(first)), Some("_c0"));
        assert_eq!(read_var_name(&pool.resolve(second)), Some("_c0"));
        assert_eq!(declared_names(&pool), vec!["_c0"]);
    }

    #[test]
    fn second_request_forwards_earlier_handles() {
        let mut pool = ConstantPool::new();
        let arr = || o::literal_arr(vec![o::literal("x")]);
        let first = pool.get_const_literal(arr(), false).unwrap();
        assert!(pool.resolve(first.clone()).is_equivalent(&arr()));
        assert!(pool.statements().is_empty());

        pool.get_const_literal(arr(), false).unwrap();
        assert_eq!(read_var_name(&pool.resolve(first)), Some("_c0"));
        assert_eq!(declared_names(&pool), vec!["_c0"]);
    }

    #[test]
    fn long_strings_respect_threshold() {
        let mut pool = ConstantPool::with_string_threshold(4);
        let long = pool.get_const_literal(o::literal("abcdef"), true).unwrap();
        assert!(matches!(long, o::Expression::Fixup(_)));
        assert_eq!(declared_names(&pool), vec!["_c0"]);
    }

    #[test]
    fn unsupported_keys_are_errors() {
        let mut pool = ConstantPool::new();
        let call = o::variable("f").call_fn(vec![], None);
        let err = pool.get_const_literal(o::literal_arr(vec![call]), true).unwrap_err();
        assert!(matches!(err, CompilerError::UnsupportedConstantKey(_)));
    }

    #[test]
    fn literal_factory_parameterizes_dynamic_entries() {
        let mut pool = ConstantPool::new();
        let literal = o::literal_arr(vec![o::literal(1.0), o::variable("x"), o::variable("y")]);
        let factory = pool.get_literal_factory(literal).unwrap();
        assert_eq!(read_var_name(&factory.literal_factory), Some("_c0"));
        assert_eq!(factory.literal_factory_arguments.len(), 2);

        let again = pool
            .get_literal_factory(o::literal_arr(vec![o::literal(1.0), o::variable("p"), o::variable("q")]))
            .unwrap();
        assert_eq!(read_var_name(&again.literal_factory), Some("_c0"));

        match &pool.statements()[0] {
            o::Statement::DeclareVar(decl) => match decl.value.as_deref() {
                Some(o::Expression::ArrowFn(arrow)) => {
                    let params: Vec<_> = arrow.params.iter().map(|p| p.name.as_str()).collect();
                    assert_eq!(params, vec!["a1", "a2"]);
                }
                other => panic!("expected arrow function, got {:?}", other),
            },
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn shared_functions_are_reused() {
        let mut pool = ConstantPool::new();
        let make = || {
            o::arrow_fn(
                vec![o::FnParam::new("a")],
                o::ArrowFunctionBody::Expression(Box::new(o::variable("a").prop("id"))),
            )
        };
        let first = pool.get_shared_function_reference(make(), "_forTrack", true);
        let second = pool.get_shared_function_reference(make(), "_forTrack", true);
        assert_eq!(read_var_name(&first), Some("_forTrack0"));
        assert_eq!(read_var_name(&second), Some("_forTrack0"));
        assert_eq!(declared_names(&pool).len(), 1);
    }

    #[test]
    fn unique_names_count_per_base() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.unique_name("Cmp_Template", false), "Cmp_Template");
        assert_eq!(pool.unique_name("Cmp_Template", false), "Cmp_Template1");
        assert_eq!(pool.fresh_name(), "_c0");
        assert_eq!(pool.fresh_name(), "_c1");
    }
}
