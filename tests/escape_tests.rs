// tests/escape_tests.rs

use ck_query::{
    Expression, Function, Node, RenderError, Value, escape_buffer, escape_text, escape_value,
    format_float,
};

// ============================================================================
// Text and buffers
// ============================================================================

#[test]
fn test_text_quotes_and_escapes() {
    assert_eq!(escape_text("plain", '\''), "'plain'");
    assert_eq!(escape_text("it's", '\''), "'it\\'s'");
    assert_eq!(escape_text("a\nb\tc\\", '\''), "'a\\nb\\tc\\\\'");
    assert_eq!(escape_text("\0\x07\x08\x0c\r\x0b", '\''), "'\\0\\a\\b\\f\\r\\v'");
}

/// Strips the quotes and undoes each two-character escape.
fn unescape(escaped: &str, quote: char) -> String {
    let inner = escaped
        .strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .unwrap();
    let mut result = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        let original = match chars.next().unwrap() {
            '0' => '\0',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\x0b',
            other => other,
        };
        result.push(original);
    }
    result
}

#[test]
fn test_text_escapes_invert() {
    let texts = [
        "\0\\\x07\x08\x0c\n\r\t\x0b'",
        "select 'x'\nfrom\t`t`\\",
        "café \x0b\x0b end",
        "",
    ];
    for text in texts {
        for quote in ['\'', '`'] {
            let escaped = escape_text(text, quote);
            assert_eq!(unescape(&escaped, quote), text, "{escaped}");
        }
    }
}

#[test]
fn test_text_keeps_non_ascii() {
    assert_eq!(escape_text("café", '\''), "'café'");
}

#[test]
fn test_identifier_quote() {
    assert_eq!(escape_text("my table", '`'), "`my table`");
    assert_eq!(escape_text("a`b", '`'), "`a\\`b`");
    // The other quote is left alone
    assert_eq!(escape_text("it's", '`'), "`it's`");
}

#[test]
fn test_buffer_escapes_high_bytes() {
    assert_eq!(escape_buffer(&[0x00, b'A', 0xff], '\''), "'\\0A\\xff'");
    assert_eq!(escape_buffer(b"it's", '\''), "'it\\'s'");
}

// ============================================================================
// Floats
// ============================================================================

#[test]
fn test_float_text() {
    assert_eq!(format_float(1.0), "1.0");
    assert_eq!(format_float(0.1), "0.1");
    assert_eq!(format_float(-2.5), "-2.5");
    assert_eq!(format_float(1e16), "1e+16");
    assert_eq!(format_float(1e-5), "1e-05");
    assert_eq!(format_float(f64::INFINITY), "inf");
    assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
    assert_eq!(format_float(f64::NAN), "nan");
}

// ============================================================================
// Values
// ============================================================================

fn escaped(value: Value) -> String {
    escape_value(&value).unwrap()
}

#[test]
fn test_scalar_values() {
    assert_eq!(escaped(Value::Null), "null");
    assert_eq!(escaped(Value::Wildcard), "*");
    assert_eq!(escaped(Value::Boolean(true)), "true");
    assert_eq!(escaped(Value::Boolean(false)), "false");
    assert_eq!(escaped(Value::Integer(-3)), "-3");
    assert_eq!(escaped(Value::Float(1.5)), "1.5");
    assert_eq!(escaped(Value::from("users")), "'users'");
    assert_eq!(escaped(Value::Bytes(b"ab".to_vec())), "'ab'");
}

#[test]
fn test_complex_is_a_pair() {
    assert_eq!(escaped(Value::Complex { re: 1.0, im: -2.0 }), "tuple(1.0, -2.0)");
}

#[test]
fn test_containers() {
    assert_eq!(escaped(Value::List(vec![1.into(), "a".into()])), "array(1, 'a')");
    assert_eq!(escaped(Value::Tuple(vec![1.into(), 2.into()])), "tuple(1, 2)");
    assert_eq!(escaped(Value::Tuple(Vec::new())), "tuple()");
    assert_eq!(escaped(Value::set([Value::from(7)])), "array(7)");
    assert_eq!(
        escaped(Value::Range { start: 0, stop: 3, step: 1 }),
        "range(0, 3, 1)"
    );
    assert_eq!(
        escaped(Value::map([(Value::from("a"), Value::from(1))])),
        "array(tuple('a', 1))"
    );
}

#[test]
fn test_nested_containers() {
    let value = Value::List(vec![
        Value::Tuple(vec![1.into(), Value::Null]),
        Value::List(Vec::new()),
    ]);
    assert_eq!(escaped(value), "array(tuple(1, null), array())");
}

#[test]
fn test_embedded_node() {
    let value = Value::List(vec![Value::from(Node::identifier("x")), 2.into()]);
    assert_eq!(escaped(value), "array(`x`, 2)");
}

#[test]
fn test_builtin_function_is_unrenderable() {
    let function = Function::builtin("noop", |_, _| Ok(Value::Null));
    let result = escape_value(&Value::Function(function));
    assert!(matches!(result, Err(RenderError::Unrenderable(_))));
}

#[test]
fn test_lambda_function_renders_body() {
    let pair = Function::lambda("pair", ["a", "b"], |args, _| {
        let a = Node::from(args[0].clone());
        let b = Node::from(args[1].clone());
        Ok(Value::from(Expression::call("tuple", [a, b])))
    });
    assert_eq!(
        escaped(Value::Function(pair)),
        "lambda(tuple('a', 'b'), tuple(`a`, `b`))"
    );
}

#[test]
fn test_failing_lambda_reports_name() {
    let broken = Function::lambda("broken", ["x"], |_, _| {
        Err(ck_query::CallError::Failed("nope".to_string()))
    });
    match escape_value(&Value::Function(broken)) {
        Err(RenderError::Lambda { name, .. }) => assert_eq!(name, "broken"),
        other => panic!("Expected lambda error, got {other:?}"),
    }
}
