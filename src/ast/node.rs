use thiserror::Error;

use crate::{
    ast::{Expression, Statement},
    function::CallError,
    value::Value,
};

/// Errors raised while rendering (or assembling) nodes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The value has no literal form in the dialect
    #[error("cannot render {0} as a query literal")]
    Unrenderable(String),

    /// A list clause was chained directly onto another list clause
    #[error("a list clause cannot follow another list clause directly (after `{previous}`)")]
    ClauseChaining { previous: String },

    /// A lambda-capable function failed while producing its body
    #[error("lambda `{name}` failed: {source}")]
    Lambda { name: String, source: CallError },
}

/// A query AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Expression(Expression),
    Statement(Statement),

    /// Verbatim query text, rendered the same way in both positions
    Raw(String),
}

impl Node {
    /// Renders the node where a value is expected.
    pub fn render_expression(&self) -> Result<String, RenderError> {
        match self {
            Node::Expression(expression) => expression.render_expression(),
            Node::Statement(statement) => statement.render_expression(),
            Node::Raw(text) => Ok(text.clone()),
        }
    }

    /// Renders the node as a complete query.
    pub fn render_statement(&self) -> Result<String, RenderError> {
        match self {
            Node::Expression(expression) => expression.render_statement(),
            Node::Statement(statement) => statement.render_statement(),
            Node::Raw(text) => Ok(text.clone()),
        }
    }

    pub fn is_statement(&self) -> bool {
        matches!(self, Node::Statement(_))
    }
}

impl From<Expression> for Node {
    fn from(expression: Expression) -> Self {
        Node::Expression(expression)
    }
}

impl From<Statement> for Node {
    fn from(statement: Statement) -> Self {
        Node::Statement(statement)
    }
}

/// Boxes a native value; an embedded node is taken out of its box instead.
impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Node(node) => *node,
            other => Node::Expression(Expression::Value(other)),
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::from(Value::Boolean(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::from(Value::Integer(value))
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::from(Value::from(value))
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::from(Value::Float(value))
    }
}

/// A text literal, not an identifier.
impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::from(Value::from(value))
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::from(Value::Text(value))
    }
}
