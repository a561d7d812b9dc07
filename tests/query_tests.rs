// tests/query_tests.rs

use ck_query::builtins::builtins;
use ck_query::{
    Arguments, BindError, CallError, CompileError, Function, QueryError, Template, Value, methods,
    render, render_expression, render_listing,
};

const ADULTS: &str = "\
def adults(table, min_age=18):
    LOAD_GLOBAL select
    LOAD_CONST ...
    CALL_FUNCTION 1
    LOAD_METHOD from_
    LOAD_FAST table
    CALL_METHOD 1
    LOAD_METHOD where_
    LOAD_GLOBAL age
    LOAD_FAST min_age
    COMPARE_OP >=
    CALL_METHOD 1
    RETURN_VALUE
";

fn adults() -> Template {
    ADULTS.parse().unwrap()
}

// ============================================================================
// Driver
// ============================================================================

#[test]
fn test_render_statement() {
    let args = Arguments::new().arg(ck_query::Node::identifier("people"));
    assert_eq!(
        render(&adults(), &args).unwrap(),
        "select * from `people` where greaterOrEquals(`age`, 18)"
    );
}

#[test]
fn test_render_expression_wraps_statement() {
    let args = Arguments::new()
        .arg(ck_query::Node::identifier("people"))
        .kwarg("min_age", 21);
    assert_eq!(
        render_expression(&adults(), &args).unwrap(),
        "(select * from `people` where greaterOrEquals(`age`, 21))"
    );
}

#[test]
fn test_text_argument_is_a_literal() {
    let args = Arguments::new().arg("people");
    assert_eq!(
        render(&adults(), &args).unwrap(),
        "select * from 'people' where greaterOrEquals(`age`, 18)"
    );
}

#[test]
fn test_native_result_is_selected() {
    let template: Template = "LOAD_CONST 40\nRETURN_VALUE\n".parse().unwrap();
    assert_eq!(render(&template, &Arguments::new()).unwrap(), "select 40");
    assert_eq!(render_expression(&template, &Arguments::new()).unwrap(), "40");
}

#[test]
fn test_render_listing() {
    let query = render_listing(
        "def f(x):\nLOAD_FAST x\nLOAD_CONST 1\nBINARY_ADD\nRETURN_VALUE",
        &Arguments::new().arg(41),
    )
    .unwrap();
    assert_eq!(query, "select plus(41, 1)");
}

#[test]
fn test_render_listing_errors() {
    assert!(matches!(
        render_listing("NOT_AN_OPCODE", &Arguments::new()),
        Err(QueryError::Parse(_))
    ));
    assert!(matches!(
        render_listing("LOAD_CONST 1", &Arguments::new()),
        Err(QueryError::Compile(CompileError::MissingReturn))
    ));
}

#[test]
fn test_builder_is_reusable() {
    let builder = adults().build();
    let first = builder
        .call(&Arguments::new().arg(ck_query::Node::identifier("a")))
        .unwrap();
    let second = builder
        .call(&Arguments::new().arg(ck_query::Node::identifier("b")))
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(builder.template().name(), "adults");
}

#[test]
fn test_builder_shared_across_threads() {
    let template: Template = "def inc(x):\nLOAD_FAST x\nLOAD_CONST 1\nBINARY_ADD\nRETURN_VALUE"
        .parse()
        .unwrap();
    let builder = template.build();

    let workers: Vec<_> = (0..4)
        .map(|n| {
            let builder = builder.clone();
            std::thread::spawn(move || {
                builder
                    .call(&Arguments::new().arg(n))
                    .unwrap()
                    .render_statement()
                    .unwrap()
            })
        })
        .collect();

    for (n, worker) in workers.into_iter().enumerate() {
        assert_eq!(worker.join().unwrap(), format!("select plus({n}, 1)"));
    }
}

// ============================================================================
// Argument binding
// ============================================================================

fn bind_error(args: Arguments) -> BindError {
    match adults().build().call(&args) {
        Err(CompileError::Bind(e)) => e,
        other => panic!("Expected a bind error, got {other:?}"),
    }
}

#[test]
fn test_missing_argument() {
    assert_eq!(
        bind_error(Arguments::new()),
        BindError::Missing {
            template: "adults".to_string(),
            name: "table".to_string()
        }
    );
}

#[test]
fn test_too_many_arguments() {
    assert!(matches!(
        bind_error(Arguments::new().arg(1).arg(2).arg(3)),
        BindError::TooManyArguments { expected: 2, given: 3, .. }
    ));
}

#[test]
fn test_unexpected_keyword() {
    assert!(matches!(
        bind_error(Arguments::new().arg(1).kwarg("limit", 5)),
        BindError::UnexpectedKeyword { .. }
    ));
}

#[test]
fn test_duplicate_argument() {
    assert!(matches!(
        bind_error(Arguments::new().arg(1).kwarg("table", 2)),
        BindError::Duplicate { .. }
    ));
}

#[test]
fn test_bind_applies_defaults() {
    let bound = adults().bind(&Arguments::new().arg("t")).unwrap();
    assert_eq!(
        bound,
        vec![
            ("table".to_string(), Value::from("t")),
            ("min_age".to_string(), Value::Integer(18)),
        ]
    );
}

// ============================================================================
// Builtins
// ============================================================================

fn builtin(name: &str) -> Function {
    builtins()
        .into_iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, function)| function)
        .unwrap()
}

fn call(name: &str, args: Vec<Value>) -> Result<Value, CallError> {
    builtin(name).call(args, Vec::new())
}

#[test]
fn test_len_and_conversions() {
    assert_eq!(call("len", vec![Value::from("héllo")]), Ok(Value::Integer(5)));
    assert_eq!(call("int", vec![Value::from(" 42 ")]), Ok(Value::Integer(42)));
    assert_eq!(call("int", vec![Value::Float(-2.9)]), Ok(Value::Integer(-2)));
    assert_eq!(call("float", vec![Value::from("1.5")]), Ok(Value::Float(1.5)));
    assert_eq!(call("str", vec![Value::Integer(7)]), Ok(Value::from("7")));
    assert_eq!(call("repr", vec![Value::from("a")]), Ok(Value::from("'a'")));
    assert_eq!(call("bool", vec![Value::List(Vec::new())]), Ok(Value::Boolean(false)));
    assert!(matches!(call("int", vec![Value::from("x")]), Err(CallError::Failed(_))));
    assert!(matches!(call("len", vec![Value::Integer(1)]), Err(CallError::Type(_))));
}

#[test]
fn test_int_rejects_out_of_range_floats() {
    assert_eq!(
        call("int", vec![Value::Float(1e20)]),
        Err(CallError::Failed("integer overflow in int()".to_string()))
    );
    assert!(matches!(call("int", vec![Value::Float(-1e19)]), Err(CallError::Failed(_))));
    assert_eq!(
        call("int", vec![Value::Float(-9.223372036854775808e18)]),
        Ok(Value::Integer(i64::MIN))
    );

    let err = render_listing(
        "LOAD_GLOBAL int
LOAD_CONST 1e20
CALL_FUNCTION 1
RETURN_VALUE",
        &Arguments::new(),
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::Compile(CompileError::Call { offset: 2, .. })));
}

#[test]
fn test_wide_ranges_report_their_size() {
    let wide = Value::Range { start: -1, stop: i64::MAX, step: 1 };
    assert_eq!(
        call("len", vec![wide.clone()]),
        Err(CallError::Failed("range too large".to_string()))
    );
    assert_eq!(call("bool", vec![wide.clone()]), Ok(Value::Boolean(true)));
    assert!(matches!(call("list", vec![wide]), Err(CallError::Failed(_))));

    let full = Value::Range { start: i64::MIN, stop: i64::MAX, step: i64::MAX };
    assert_eq!(call("len", vec![full.clone()]), Ok(Value::Integer(3)));
    assert_eq!(
        call("list", vec![full]),
        Ok(Value::List(vec![i64::MIN.into(), (-1).into(), (i64::MAX - 1).into()]))
    );

    let err = render_listing(
        "LOAD_GLOBAL len
         LOAD_GLOBAL range
         LOAD_CONST -1
         LOAD_CONST 9223372036854775807
         CALL_FUNCTION 2
         CALL_FUNCTION 1
         RETURN_VALUE",
        &Arguments::new(),
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::Compile(CompileError::Call { offset: 5, .. })));
}

#[test]
fn test_arity_is_checked() {
    assert!(matches!(call("len", Vec::new()), Err(CallError::Arity { .. })));
    assert!(matches!(
        builtin("len").call(vec![Value::from("a")], vec![("x".to_string(), Value::Null)]),
        Err(CallError::UnexpectedKeyword { .. })
    ));
}

#[test]
fn test_aggregates() {
    let numbers = Value::List(vec![3.into(), 1.into(), 2.into()]);
    assert_eq!(call("min", vec![numbers.clone()]), Ok(Value::Integer(1)));
    assert_eq!(call("max", vec![1.into(), 5.into(), 2.into()]), Ok(Value::Integer(5)));
    assert_eq!(call("sum", vec![numbers.clone()]), Ok(Value::Integer(6)));
    assert_eq!(
        builtin("sum").call(vec![numbers.clone()], vec![("start".to_string(), Value::Float(0.5))]),
        Ok(Value::Float(6.5))
    );
    assert_eq!(
        call("sorted", vec![numbers.clone()]),
        Ok(Value::List(vec![1.into(), 2.into(), 3.into()]))
    );
    assert_eq!(
        builtin("sorted").call(vec![numbers], vec![("reverse".to_string(), Value::Boolean(true))]),
        Ok(Value::List(vec![3.into(), 2.into(), 1.into()]))
    );
    assert!(matches!(call("max", vec![Value::List(Vec::new())]), Err(CallError::Failed(_))));
}

#[test]
fn test_round_half_to_even() {
    assert_eq!(call("round", vec![Value::Float(2.5)]), Ok(Value::Integer(2)));
    assert_eq!(call("round", vec![Value::Float(3.5)]), Ok(Value::Integer(4)));
    assert_eq!(
        call("round", vec![Value::Float(0.125), Value::Integer(2)]),
        Ok(Value::Float(0.12))
    );
    assert_eq!(
        call("round", vec![Value::Integer(1250), Value::Integer(-2)]),
        Ok(Value::Integer(1200))
    );
    assert!(matches!(
        call("round", vec![Value::Float(f64::NAN)]),
        Err(CallError::Failed(_))
    ));
}

#[test]
fn test_range_and_collections() {
    let range = call("range", vec![1.into(), 7.into(), 3.into()]).unwrap();
    assert_eq!(range, Value::Range { start: 1, stop: 7, step: 3 });
    assert_eq!(
        call("list", vec![range]),
        Ok(Value::List(vec![1.into(), 4.into()]))
    );
    assert_eq!(
        call("tuple", vec![Value::from("ab")]),
        Ok(Value::Tuple(vec!["a".into(), "b".into()]))
    );
    assert_eq!(
        call("set", vec![Value::List(vec![1.into(), 1.into()])]),
        Ok(Value::set([1.into()]))
    );
    assert!(matches!(
        call("range", vec![0.into(), 1.into(), 0.into()]),
        Err(CallError::Failed(_))
    ));
}

#[test]
fn test_booleans_collapse_with_equal_numbers() {
    assert_eq!(Value::Boolean(true), Value::Integer(1));
    assert_eq!(Value::Boolean(false), Value::Float(0.0));
    assert_eq!(
        Value::set([Value::Integer(1), Value::Boolean(true)]),
        Value::Set(vec![Value::Integer(1)])
    );
    assert_eq!(
        Value::map([(Value::Integer(1), "a".into()), (Value::Boolean(true), "b".into())]),
        Value::Map(vec![(Value::Integer(1), "b".into())])
    );
}

// ============================================================================
// Native methods
// ============================================================================

fn method(receiver: impl Into<Value>, name: &str, args: Vec<Value>) -> Result<Value, CallError> {
    methods::bind(&receiver.into(), name).unwrap().call(args, Vec::new())
}

#[test]
fn test_format() {
    assert_eq!(
        method("{} + {}", "format", vec![1.into(), 2.into()]),
        Ok(Value::from("1 + 2"))
    );
    assert_eq!(
        method("{1}{0}", "format", vec!["a".into(), "b".into()]),
        Ok(Value::from("ba"))
    );
    assert_eq!(method("{{x}}", "format", Vec::new()), Ok(Value::from("{x}")));

    let named = methods::bind(&Value::from("hi {name}"), "format")
        .unwrap()
        .call(Vec::new(), vec![("name".to_string(), Value::from("bob"))]);
    assert_eq!(named, Ok(Value::from("hi bob")));

    assert!(method("{}{0}", "format", vec![1.into()]).is_err());
    assert!(method("{", "format", Vec::new()).is_err());
    assert!(method("{:>3}", "format", vec![1.into()]).is_err());
}

#[test]
fn test_text_methods() {
    assert_eq!(
        method(",", "join", vec![Value::List(vec!["a".into(), "b".into()])]),
        Ok(Value::from("a,b"))
    );
    assert_eq!(method("  x ", "strip", Vec::new()), Ok(Value::from("x")));
    assert_eq!(method("xxaxx", "strip", vec!["x".into()]), Ok(Value::from("a")));
    assert_eq!(method("Ab", "lower", Vec::new()), Ok(Value::from("ab")));
    assert_eq!(
        method("a-b-c", "replace", vec!["-".into(), "+".into(), 1.into()]),
        Ok(Value::from("a+b-c"))
    );
    assert_eq!(
        method("a b  c", "split", Vec::new()),
        Ok(Value::List(vec!["a".into(), "b".into(), "c".into()]))
    );
    assert_eq!(
        method("a,b,c", "split", vec![",".into(), 1.into()]),
        Ok(Value::List(vec!["a".into(), "b,c".into()]))
    );
    assert_eq!(
        method("a b  c", "split", vec![Value::Null, 1.into()]),
        Ok(Value::List(vec!["a".into(), "b  c".into()]))
    );
    assert_eq!(
        method("report.csv", "endswith", vec![Value::Tuple(vec![".tsv".into(), ".csv".into()])]),
        Ok(Value::Boolean(true))
    );
    assert_eq!(method("abc", "startswith", vec!["b".into()]), Ok(Value::Boolean(false)));
}

#[test]
fn test_sequence_and_map_methods() {
    let items = Value::List(vec![1.into(), 2.into(), 1.into()]);
    assert_eq!(method(items.clone(), "count", vec![1.into()]), Ok(Value::Integer(2)));
    assert_eq!(method(items.clone(), "index", vec![2.into()]), Ok(Value::Integer(1)));
    assert!(method(items, "index", vec![9.into()]).is_err());

    let map = Value::map([("a".into(), 1.into())]);
    assert_eq!(method(map.clone(), "get", vec!["a".into()]), Ok(Value::Integer(1)));
    assert_eq!(method(map.clone(), "get", vec!["z".into(), 0.into()]), Ok(Value::Integer(0)));
    assert_eq!(method(map.clone(), "keys", Vec::new()), Ok(Value::List(vec!["a".into()])));
    assert_eq!(
        method(map, "items", Vec::new()),
        Ok(Value::List(vec![Value::Tuple(vec!["a".into(), 1.into()])]))
    );
}

#[test]
fn test_unknown_method() {
    assert!(methods::bind(&Value::Integer(1), "upper").is_none());
    assert!(methods::bind(&Value::from("a"), "frobnicate").is_none());
}
