// tests/machine_tests.rs

use ck_query::instruction::Scope;
use ck_query::machine::initial_context;
use ck_query::{
    Arguments, BinaryOp, CallError, CompileError, Construct, Instruction, Machine, Node, Outcome,
    RenderError, Template, Value,
};

fn compile(listing: &str, args: Arguments) -> Result<Outcome, CompileError> {
    let template: Template = listing.parse().unwrap();
    template.build().call(&args)
}

fn expression(listing: &str) -> String {
    compile(listing, Arguments::new())
        .unwrap()
        .render_expression()
        .unwrap()
}

fn statement(listing: &str) -> String {
    compile(listing, Arguments::new())
        .unwrap()
        .render_statement()
        .unwrap()
}

fn error(listing: &str) -> CompileError {
    match compile(listing, Arguments::new()) {
        Err(e) => e,
        Ok(outcome) => panic!("Expected a compile error, got {outcome:?}"),
    }
}

// ============================================================================
// Names and operators
// ============================================================================

#[test]
fn test_free_names_become_identifiers() {
    let listing = "LOAD_GLOBAL price\nLOAD_CONST 2\nBINARY_MULTIPLY\nRETURN_VALUE";
    assert_eq!(expression(listing), "multiply(`price`, 2)");
    assert_eq!(statement(listing), "select multiply(`price`, 2)");
}

#[test]
fn test_parameters_bind_arguments() {
    let listing = "def f(x, y=10):\nLOAD_FAST x\nLOAD_FAST y\nBINARY_ADD\nRETURN_VALUE";
    let outcome = compile(listing, Arguments::new().arg(Node::identifier("col"))).unwrap();
    assert_eq!(outcome.render_expression().unwrap(), "plus(`col`, 10)");

    let outcome = compile(listing, Arguments::new().arg(1).kwarg("y", 2)).unwrap();
    assert_eq!(outcome.render_expression().unwrap(), "plus(1, 2)");
}

#[test]
fn test_binding_precedence() {
    let listing = "def f(x=3):\nglobal x = 1\nclosure x = 2\nLOAD_FAST x\nRETURN_VALUE";
    assert_eq!(expression(listing), "3");

    let listing = "global x = 1\nclosure x = 2\nLOAD_DEREF x\nRETURN_VALUE";
    assert_eq!(expression(listing), "2");
}

#[test]
fn test_store_then_load() {
    let listing = "LOAD_CONST 5\n\
                   STORE_FAST y\n\
                   LOAD_GLOBAL x\n\
                   LOAD_FAST y\n\
                   BINARY_ADD\n\
                   RETURN_VALUE";
    assert_eq!(expression(listing), "plus(`x`, 5)");
}

#[test]
fn test_delete_unbound_name() {
    let err = error("DELETE_FAST ghost\nLOAD_CONST None\nRETURN_VALUE");
    assert_eq!(
        err,
        CompileError::UnboundName {
            offset: 0,
            name: "ghost".to_string()
        }
    );
}

#[test]
fn test_delete_restores_identifier() {
    let listing = "LOAD_CONST 1\n\
                   STORE_FAST x\n\
                   DELETE_FAST x\n\
                   LOAD_FAST x\n\
                   RETURN_VALUE";
    assert_eq!(expression(listing), "`x`");
}

#[test]
fn test_unary_and_comparison() {
    assert_eq!(expression("LOAD_GLOBAL flag\nUNARY_NOT\nRETURN_VALUE"), "not(`flag`)");
    assert_eq!(
        expression("LOAD_GLOBAL n\nLOAD_CONST 0\nCOMPARE_OP >\nRETURN_VALUE"),
        "greater(`n`, 0)"
    );
    assert_eq!(
        expression("LOAD_GLOBAL n\nLOAD_CONST (1, 2)\nCONTAINS_OP 1\nRETURN_VALUE"),
        "notIn(`n`, tuple(1, 2))"
    );
    assert_eq!(
        expression("LOAD_GLOBAL x\nLOAD_CONST None\nIS_OP 0\nRETURN_VALUE"),
        "and(equals(toTypeName(`x`), toTypeName(null)), equals(`x`, null))"
    );
}

#[test]
fn test_attribute_and_subscript() {
    assert_eq!(
        expression("LOAD_GLOBAL row\nLOAD_ATTR name\nRETURN_VALUE"),
        "tupleElement(`row`, 'name')"
    );
    assert_eq!(
        expression("LOAD_GLOBAL items\nLOAD_CONST 1\nBINARY_SUBSCR\nRETURN_VALUE"),
        "arrayElement(`items`, 1)"
    );
}

#[test]
fn test_stack_shuffles() {
    assert_eq!(
        expression("LOAD_GLOBAL a\nLOAD_GLOBAL b\nROT_TWO\nBINARY_SUBTRACT\nRETURN_VALUE"),
        "minus(`b`, `a`)"
    );
    assert_eq!(
        expression("LOAD_GLOBAL a\nDUP_TOP\nBINARY_MULTIPLY\nRETURN_VALUE"),
        "multiply(`a`, `a`)"
    );
    assert_eq!(
        expression(
            "LOAD_GLOBAL a\nLOAD_GLOBAL b\nLOAD_GLOBAL c\nROT_THREE\n\
             BUILD_TUPLE 3\nRETURN_VALUE"
        ),
        "tuple(`c`, `a`, `b`)"
    );
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_select_from_where() {
    let listing = "def active(min_age=18):\n\
                   LOAD_GLOBAL select\n\
                   LOAD_GLOBAL id\n\
                   LOAD_GLOBAL name\n\
                   CALL_FUNCTION 2\n\
                   LOAD_METHOD from_\n\
                   LOAD_GLOBAL users\n\
                   CALL_METHOD 1\n\
                   LOAD_METHOD where_\n\
                   LOAD_GLOBAL age\n\
                   LOAD_FAST min_age\n\
                   COMPARE_OP >=\n\
                   CALL_METHOD 1\n\
                   RETURN_VALUE";
    assert_eq!(
        statement(listing),
        "select `id`, `name` from `users` where greaterOrEquals(`age`, 18)"
    );
}

#[test]
fn test_clause_through_attribute() {
    let listing = "LOAD_GLOBAL select\n\
                   LOAD_CONST 1\n\
                   CALL_FUNCTION 1\n\
                   LOAD_ATTR from_\n\
                   LOAD_GLOBAL t\n\
                   CALL_FUNCTION 1\n\
                   RETURN_VALUE";
    assert_eq!(statement(listing), "select 1 from `t`");
}

#[test]
fn test_keyword_arguments_become_aliases() {
    let listing = "LOAD_GLOBAL select\n\
                   LOAD_GLOBAL x\n\
                   LOAD_GLOBAL x\n\
                   LOAD_CONST 1\n\
                   BINARY_ADD\n\
                   LOAD_CONST ('total',)\n\
                   CALL_FUNCTION_KW 2\n\
                   RETURN_VALUE";
    assert_eq!(statement(listing), "select `x`, plus(`x`, 1) as `total`");
}

#[test]
fn test_select_star() {
    let listing = "LOAD_GLOBAL select_distinct\n\
                   LOAD_CONST ...\n\
                   CALL_FUNCTION 1\n\
                   LOAD_METHOD from_\n\
                   LOAD_GLOBAL t\n\
                   CALL_METHOD 1\n\
                   RETURN_VALUE";
    assert_eq!(statement(listing), "select distinct * from `t`");
}

#[test]
fn test_subquery_is_parenthesised() {
    let listing = "LOAD_GLOBAL select\n\
                   LOAD_GLOBAL select\n\
                   LOAD_CONST 1\n\
                   CALL_FUNCTION 1\n\
                   CALL_FUNCTION 1\n\
                   RETURN_VALUE";
    assert_eq!(statement(listing), "select (select 1)");
}

#[test]
fn test_chained_lists_rejected() {
    let listing = "LOAD_GLOBAL select\n\
                   LOAD_GLOBAL a\n\
                   CALL_FUNCTION 1\n\
                   LOAD_GLOBAL b\n\
                   CALL_FUNCTION 1\n\
                   RETURN_VALUE";
    assert!(matches!(
        error(listing),
        CompileError::Render(RenderError::ClauseChaining { .. })
    ));
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_symbolic_call() {
    assert_eq!(
        expression("LOAD_GLOBAL length\nLOAD_GLOBAL name\nCALL_FUNCTION 1\nRETURN_VALUE"),
        "`length`(`name`)"
    );
}

#[test]
fn test_keywords_on_symbolic_call() {
    let listing = "LOAD_GLOBAL f\n\
                   LOAD_CONST 1\n\
                   LOAD_CONST ('k',)\n\
                   CALL_FUNCTION_KW 1\n\
                   RETURN_VALUE";
    assert!(matches!(error(listing), CompileError::KeywordCall { offset: 3, .. }));
}

#[test]
fn test_builtin_runs_eagerly() {
    let outcome = compile(
        "LOAD_GLOBAL len\nLOAD_CONST (1, 2, 3)\nCALL_FUNCTION 1\nRETURN_VALUE",
        Arguments::new(),
    )
    .unwrap();
    assert_eq!(outcome, Outcome::Native(Value::Integer(3)));
    assert_eq!(outcome.render_statement().unwrap(), "select 3");
}

#[test]
fn test_spread_call() {
    let listing = "LOAD_GLOBAL max\nLOAD_CONST (3, 9, 4)\nCALL_FUNCTION_EX 0\nRETURN_VALUE";
    assert_eq!(expression(listing), "9");
}

#[test]
fn test_native_method() {
    let listing = "LOAD_CONST '{}_{}'\n\
                   LOAD_METHOD format\n\
                   LOAD_CONST 'a'\n\
                   LOAD_CONST 1\n\
                   CALL_METHOD 2\n\
                   RETURN_VALUE";
    assert_eq!(expression(listing), "'a_1'");
    assert_eq!(
        expression("LOAD_CONST 'abc'\nLOAD_METHOD upper\nCALL_METHOD 0\nRETURN_VALUE"),
        "'ABC'"
    );
}

#[test]
fn test_host_failure_is_reported() {
    let err = error("LOAD_GLOBAL len\nLOAD_CONST 3\nCALL_FUNCTION 1\nRETURN_VALUE");
    match err {
        CompileError::Call { offset, function, source } => {
            assert_eq!(offset, 2);
            assert_eq!(function, "len");
            assert!(matches!(source, CallError::Type(_)));
        }
        other => panic!("Expected call error, got {other:?}"),
    }
}

#[test]
fn test_native_value_not_callable() {
    let err = error("LOAD_CONST 3\nLOAD_CONST 1\nCALL_FUNCTION 1\nRETURN_VALUE");
    assert!(matches!(err, CompileError::Type { offset: 2, .. }));
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_build_containers() {
    assert_eq!(
        expression("LOAD_GLOBAL a\nLOAD_CONST 1\nBUILD_TUPLE 2\nRETURN_VALUE"),
        "tuple(`a`, 1)"
    );
    assert_eq!(
        expression("LOAD_GLOBAL a\nLOAD_CONST 1\nBUILD_LIST 2\nRETURN_VALUE"),
        "array(`a`, 1)"
    );

    let outcome = compile(
        "LOAD_CONST 1\nLOAD_CONST 2\nLOAD_CONST ('a', 'b')\nBUILD_CONST_KEY_MAP 2\nRETURN_VALUE",
        Arguments::new(),
    )
    .unwrap();
    assert_eq!(
        outcome.into_value(),
        Value::map([("a".into(), 1.into()), ("b".into(), 2.into())])
    );
}

#[test]
fn test_unpacking_merges() {
    let outcome = compile(
        "LOAD_CONST (1, 2)\nLOAD_CONST [3]\nBUILD_LIST_UNPACK 2\nRETURN_VALUE",
        Arguments::new(),
    )
    .unwrap();
    assert_eq!(
        outcome.into_value(),
        Value::List(vec![1.into(), 2.into(), 3.into()])
    );
}

#[test]
fn test_spread_call_through_list_extend() {
    let listing = "LOAD_GLOBAL f\n\
                   LOAD_GLOBAL x\n\
                   BUILD_LIST 1\n\
                   LOAD_CONST (2, 3)\n\
                   LIST_EXTEND 1\n\
                   LIST_TO_TUPLE\n\
                   CALL_FUNCTION_EX 0\n\
                   RETURN_VALUE";
    assert_eq!(expression(listing), "`f`(`x`, 2, 3)");
}

#[test]
fn test_set_and_dict_updates() {
    let outcome = compile(
        "BUILD_SET 0\nLOAD_CONST (1, 2, 1)\nSET_UPDATE 1\nRETURN_VALUE",
        Arguments::new(),
    )
    .unwrap();
    assert_eq!(outcome.into_value(), Value::set([1.into(), 2.into()]));

    let outcome = compile(
        "BUILD_MAP 0\nLOAD_CONST {'a': 1}\nDICT_UPDATE 1\nLOAD_CONST {'a': 2}\nDICT_UPDATE 1\nRETURN_VALUE",
        Arguments::new(),
    )
    .unwrap();
    assert_eq!(outcome.into_value(), Value::map([("a".into(), 2.into())]));
}

#[test]
fn test_dict_merge_rejects_repeated_keys() {
    let err = error(
        "BUILD_MAP 0\nLOAD_CONST {'a': 1}\nDICT_MERGE 1\nLOAD_CONST {'a': 2}\nDICT_MERGE 1\nRETURN_VALUE",
    );
    assert!(matches!(err, CompileError::Type { offset: 4, .. }));
}

#[test]
fn test_merge_into_wrong_container() {
    let err = error("LOAD_CONST (1,)\nLOAD_CONST [2]\nLIST_EXTEND 1\nRETURN_VALUE");
    assert!(matches!(err, CompileError::Type { offset: 2, .. }));
}

#[test]
fn test_build_string() {
    assert_eq!(
        expression("LOAD_CONST 'a'\nLOAD_CONST 'b'\nBUILD_STRING 2\nRETURN_VALUE"),
        "'ab'"
    );
    assert_eq!(
        expression(
            "LOAD_CONST 'id='\nLOAD_GLOBAL id\nFORMAT_VALUE 0\nBUILD_STRING 2\nRETURN_VALUE"
        ),
        "concat('id=', toString(`id`))"
    );
}

#[test]
fn test_format_value_native() {
    assert_eq!(expression("LOAD_CONST 5\nFORMAT_VALUE 0\nRETURN_VALUE"), "'5'");
    let err = error("LOAD_CONST 5\nLOAD_CONST '>3'\nFORMAT_VALUE 4\nRETURN_VALUE");
    assert!(matches!(err, CompileError::Type { offset: 2, .. }));
}

#[test]
fn test_unpack_symbolic_sequence() {
    let listing = "LOAD_GLOBAL pair\n\
                   UNPACK_SEQUENCE 2\n\
                   STORE_FAST a\n\
                   STORE_FAST b\n\
                   LOAD_FAST a\n\
                   LOAD_FAST b\n\
                   BINARY_SUBTRACT\n\
                   RETURN_VALUE";
    assert_eq!(
        expression(listing),
        "minus(tupleElement(`pair`, 1), tupleElement(`pair`, 2))"
    );
}

#[test]
fn test_unpack_native_sequence() {
    let listing = "LOAD_CONST (1, 2)\n\
                   UNPACK_SEQUENCE 2\n\
                   BINARY_SUBTRACT\n\
                   RETURN_VALUE";
    // First member ends on top
    assert_eq!(expression(listing), "minus(2, 1)");

    let err = error("LOAD_CONST (1, 2, 3)\nUNPACK_SEQUENCE 2\nRETURN_VALUE");
    assert!(matches!(err, CompileError::Type { offset: 1, .. }));
}

#[test]
fn test_unpack_with_star() {
    let listing = "LOAD_CONST (1, 2, 3, 4)\n\
                   UNPACK_EX 1\n\
                   STORE_FAST first\n\
                   STORE_FAST rest\n\
                   LOAD_FAST rest\n\
                   RETURN_VALUE";
    assert_eq!(expression(listing), "array(2, 3, 4)");
}

#[test]
fn test_subscript_store_rebinds_container() {
    let listing = "LOAD_CONST 0\n\
                   LOAD_GLOBAL items\n\
                   LOAD_CONST 2\n\
                   STORE_SUBSCR\n\
                   LOAD_GLOBAL items\n\
                   RETURN_VALUE";
    assert_eq!(
        expression(listing),
        "arrayConcat(arraySlice(`items`, 1, minus(2, 1)), array(0), arraySlice(`items`, plus(2, 1)))"
    );
}

#[test]
fn test_subscript_delete_rebinds_parameter() {
    let listing = "def f(xs):\n\
                   LOAD_FAST xs\n\
                   LOAD_CONST 1\n\
                   DELETE_SUBSCR\n\
                   LOAD_FAST xs\n\
                   RETURN_VALUE";
    let outcome = compile(listing, Arguments::new().arg(Node::identifier("v"))).unwrap();
    assert_eq!(
        outcome.render_expression().unwrap(),
        "arrayConcat(arraySlice(`v`, 1, minus(1, 1)), arraySlice(`v`, plus(1, 1)))"
    );
}

// ============================================================================
// Trace contract
// ============================================================================

#[test]
fn test_unsupported_instruction() {
    let err = error("LOAD_GLOBAL xs\nGET_ITER\nRETURN_VALUE");
    assert_eq!(
        err,
        CompileError::Unsupported {
            offset: 1,
            mnemonic: "GET_ITER".to_string(),
            construct: Construct::Iteration,
        }
    );
}

#[test]
fn test_values_left_on_stack() {
    let err = error("LOAD_CONST 1\nLOAD_CONST 2\nRETURN_VALUE");
    assert_eq!(err, CompileError::StackContract { remaining: 1 });
}

#[test]
fn test_missing_return() {
    assert_eq!(error("LOAD_CONST 1"), CompileError::MissingReturn);
}

#[test]
fn test_stack_underflow() {
    assert_eq!(error("BINARY_ADD\nRETURN_VALUE"), CompileError::StackUnderflow { offset: 0 });
}

#[test]
fn test_machine_without_template() {
    let code = [
        Instruction::Load(Scope::Global, "a".into()),
        Instruction::Load(Scope::Global, "b".into()),
        Instruction::Binary(BinaryOp::Power),
        Instruction::ReturnValue,
    ];
    let context = initial_context(Vec::<(String, Value)>::new());
    let node = Machine::new(&code, context).run().unwrap();
    assert_eq!(node.render_expression().unwrap(), "pow(`a`, `b`)");
}

// ============================================================================
// Templates as functions
// ============================================================================

fn double() -> Template {
    Template::new("double").with_param("x").with_code([
        Instruction::Load(Scope::Fast, "x".into()),
        Instruction::LoadConst(Value::Integer(2)),
        Instruction::Binary(BinaryOp::Multiply),
        Instruction::ReturnValue,
    ])
}

#[test]
fn test_template_called_from_template() {
    let outer = Template::new("outer")
        .with_global("double", double().into_function())
        .with_code([
            Instruction::Load(Scope::Global, "double".into()),
            Instruction::Load(Scope::Global, "price".into()),
            Instruction::CallFunction(1),
            Instruction::ReturnValue,
        ]);
    let outcome = outer.build().call(&Arguments::new()).unwrap();
    assert_eq!(outcome.render_expression().unwrap(), "multiply(`price`, 2)");
}

#[test]
fn test_template_rendered_as_lambda() {
    let outer = Template::new("outer")
        .with_global("double", double().into_function())
        .with_code([
            Instruction::Load(Scope::Global, "arrayMap".into()),
            Instruction::Load(Scope::Global, "double".into()),
            Instruction::Load(Scope::Global, "prices".into()),
            Instruction::CallFunction(2),
            Instruction::ReturnValue,
        ]);
    let outcome = outer.build().call(&Arguments::new()).unwrap();
    assert_eq!(
        outcome.render_expression().unwrap(),
        "`arrayMap`(lambda(tuple('x'), multiply(`x`, 2)), `prices`)"
    );
}
