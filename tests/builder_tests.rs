// tests/builder_tests.rs

use ck_query::ast::select;
use ck_query::{Expression, Node, Value};

fn col(name: &str) -> Node {
    Node::identifier(name)
}

#[test]
fn test_arithmetic_overloads() {
    let expr = (col("a") + 1) * col("b");
    assert_eq!(expr.render_expression().unwrap(), "multiply(plus(`a`, 1), `b`)");

    let expr = col("a") - 2.5;
    assert_eq!(expr.render_expression().unwrap(), "minus(`a`, 2.5)");

    let expr = col("a") / col("b") % 3;
    assert_eq!(expr.render_expression().unwrap(), "modulo(divide(`a`, `b`), 3)");
}

#[test]
fn test_bitwise_overloads() {
    let expr = (col("flags") & 4) | (col("mask") ^ 1);
    assert_eq!(
        expr.render_expression().unwrap(),
        "bitOr(bitAnd(`flags`, 4), bitXor(`mask`, 1))"
    );

    let expr = (col("n") << 2) >> 1;
    assert_eq!(expr.render_expression().unwrap(), "bitShiftRight(bitShiftLeft(`n`, 2), 1)");
}

#[test]
fn test_unary_overloads() {
    assert_eq!((-col("n")).render_expression().unwrap(), "negate(`n`)");
    assert_eq!((!col("ok")).render_expression().unwrap(), "not(`ok`)");
    assert_eq!((-(-col("n"))).render_expression().unwrap(), "negate(negate(`n`))");
}

#[test]
fn test_text_operand_is_a_literal() {
    let expr = col("name") + "suffix";
    assert_eq!(expr.render_expression().unwrap(), "plus(`name`, 'suffix')");
}

#[test]
fn test_comparison_methods() {
    assert_eq!(col("a").less(1).render_expression().unwrap(), "less(`a`, 1)");
    assert_eq!(
        col("a").greater_or_equals(col("b")).render_expression().unwrap(),
        "greaterOrEquals(`a`, `b`)"
    );
    assert_eq!(
        (col("a") + 1).equals(2).render_expression().unwrap(),
        "equals(plus(`a`, 1), 2)"
    );

    let members = Value::Tuple(vec![1.into(), 2.into()]);
    assert_eq!(
        col("a").is_in(members).render_expression().unwrap(),
        "in(`a`, tuple(1, 2))"
    );
}

#[test]
fn test_element_access() {
    let expr = col("items").element(1);
    assert_eq!(expr.render_expression().unwrap(), "arrayElement(`items`, 1)");
}

#[test]
fn test_value_constructors() {
    assert_eq!(Expression::value(3).render_expression().unwrap(), "3");
    assert_eq!(Expression::identifier("t").render_expression().unwrap(), "`t`");
}

#[test]
fn test_builder_query_matches_hand_written() {
    let query = select()
        .list([col("user_id"), Node::from(Expression::call("count", Vec::<Node>::new()))])
        .unwrap()
        .method("from_", [col("events")])
        .unwrap()
        .method("group_by_", [col("user_id")])
        .unwrap();

    assert_eq!(
        query.render_statement().unwrap(),
        "select `user_id`, count() from `events` group by `user_id`"
    );
}
