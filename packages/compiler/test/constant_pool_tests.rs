/**
 * Constant Pool Tests
 *
 * Deduplication of literals, literal factories and shared functions across many requests,
 * and resolution of pooled handles inside larger expressions.
 */

#[cfg(test)]
mod tests {
    use template_pipeline::constant_pool::{ConstantPool, SharedConstantDefinition};
    use template_pipeline::output::output_ast::{self as o, Statement};
    use template_pipeline::Result;

    fn declarations(pool: &ConstantPool) -> Vec<(String, Option<o::Expression>)> {
        pool.statements()
            .into_iter()
            .filter_map(|stmt| match stmt {
                Statement::DeclareVar(decl) => Some((decl.name, decl.value.map(|v| *v))),
                _ => None,
            })
            .collect()
    }

    fn var_name(expr: &o::Expression) -> &str {
        match expr {
            o::Expression::ReadVar(read) => &read.name,
            other => panic!("expected a variable, got {other:?}"),
        }
    }

    #[test]
    fn nested_literals_are_shared_by_their_parents() {
        let mut pool = ConstantPool::new();
        let inner = || o::literal_arr(vec![o::literal("a"), o::literal("b")]);
        let inner_handle = pool.get_const_literal(inner(), true).unwrap();
        let outer = pool
            .get_const_literal(o::literal_arr(vec![inner_handle.clone(), o::literal(3usize)]), true)
            .unwrap();

        assert_eq!(var_name(&pool.resolve(inner_handle)), "_c0");
        assert_eq!(var_name(&pool.resolve(outer)), "_c1");
        let declared = declarations(&pool);
        assert_eq!(declared.len(), 2);
        let expected = o::literal_arr(vec![o::variable("_c0"), o::literal(3usize)]);
        assert!(declared[1].1.as_ref().is_some_and(|value| value.is_equivalent(&expected)));
    }

    #[test]
    fn distinct_literals_get_distinct_names() {
        let mut pool = ConstantPool::new();
        let first = pool.get_const_literal(o::literal_arr(vec![o::literal("x")]), true).unwrap();
        let second = pool.get_const_literal(o::literal_arr(vec![o::literal("y")]), true).unwrap();
        let again = pool.get_const_literal(o::literal_arr(vec![o::literal("x")]), true).unwrap();

        assert_eq!(var_name(&pool.resolve(first)), "_c0");
        assert_eq!(var_name(&pool.resolve(second)), "_c1");
        assert_eq!(var_name(&pool.resolve(again)), "_c0");
        assert_eq!(declarations(&pool).len(), 2);
    }

    #[test]
    fn map_keys_distinguish_quoting() {
        let mut pool = ConstantPool::new();
        let map = |quoted| o::literal_map(vec![o::LiteralMapEntry::new("key", o::literal(1usize), quoted)]);
        pool.get_const_literal(map(false), true).unwrap();
        pool.get_const_literal(map(true), true).unwrap();
        assert_eq!(declarations(&pool).len(), 2);
    }

    #[test]
    fn handles_resolve_inside_statements() {
        let mut pool = ConstantPool::new();
        let handle = pool.get_const_literal(o::literal_arr(vec![o::literal("q")]), false).unwrap();
        let mut stmt = o::variable("use").call_fn(vec![handle.clone()], None).to_stmt();

        pool.resolve_statement(&mut stmt);
        let Statement::Expression(call) = &stmt else { panic!("expected an expression statement") };
        let o::Expression::InvokeFn(call) = &*call.expr else { panic!("expected a call") };
        assert!(call.args[0].is_equivalent(&o::literal_arr(vec![o::literal("q")])));

        pool.get_const_literal(o::literal_arr(vec![o::literal("q")]), false).unwrap();
        let mut stmt = o::variable("use").call_fn(vec![handle], None).to_stmt();
        pool.resolve_statement(&mut stmt);
        let Statement::Expression(call) = &stmt else { panic!("expected an expression statement") };
        let o::Expression::InvokeFn(call) = &*call.expr else { panic!("expected a call") };
        assert_eq!(var_name(&call.args[0]), "_c0");
    }

    #[test]
    fn literal_factory_constants_are_pooled_first() {
        let mut pool = ConstantPool::new();
        let factory = pool
            .get_literal_factory(o::literal_arr(vec![o::literal_arr(vec![o::literal("k")]), o::variable("v")]))
            .unwrap();

        assert_eq!(factory.literal_factory_arguments.len(), 1);
        assert_eq!(var_name(&factory.literal_factory), "_c1");
        let names: Vec<String> = declarations(&pool).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["_c0", "_c1"]);
    }

    #[test]
    fn shared_functions_differ_by_body() {
        let mut pool = ConstantPool::new();
        let track = |field: &str| {
            o::arrow_fn(
                vec![o::FnParam::new("$index"), o::FnParam::new("item")],
                o::ArrowFunctionBody::Expression(Box::new(o::variable("item").prop(field))),
            )
        };
        let by_id = pool.get_shared_function_reference(track("id"), "_forTrack", true);
        let by_name = pool.get_shared_function_reference(track("name"), "_forTrack", true);
        let by_id_again = pool.get_shared_function_reference(track("id"), "_forTrack", true);

        assert_eq!(var_name(&by_id), "_forTrack0");
        assert_eq!(var_name(&by_name), "_forTrack1");
        assert_eq!(var_name(&by_id_again), "_forTrack0");
    }

    struct Token;

    impl SharedConstantDefinition for Token {
        fn key_of(&self, expr: &o::Expression) -> Result<String> {
            Ok(format!("token:{}", var_name(expr)))
        }

        fn to_shared_constant_declaration(&self, name: String, expr: o::Expression) -> Statement {
            Statement::DeclareVar(o::DeclareVarStmt {
                name,
                value: Some(Box::new(expr.prop("token"))),
                modifiers: o::StmtModifier::Final,
                source_span: None,
            })
        }
    }

    #[test]
    fn shared_constants_are_declared_once_per_key() {
        let mut pool = ConstantPool::new();
        let first = pool.get_shared_constant(&Token, o::variable("Service")).unwrap();
        let second = pool.get_shared_constant(&Token, o::variable("Service")).unwrap();
        let other = pool.get_shared_constant(&Token, o::variable("Other")).unwrap();

        assert_eq!(var_name(&first), var_name(&second));
        assert_ne!(var_name(&first), var_name(&other));
        let declared = declarations(&pool);
        assert_eq!(declared.len(), 2);
        let expected = o::variable("Service").prop("token");
        assert!(declared[0].1.as_ref().is_some_and(|value| value.is_equivalent(&expected)));
    }
}
