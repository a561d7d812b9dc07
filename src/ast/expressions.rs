use crate::{
    ast::{Node, RenderError},
    escape::{escape_text, escape_value},
    value::Value,
};

/// What a [`Expression::Call`] invokes.
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    /// A dialect function name, rendered verbatim
    ///
    /// # Example
    /// ```text
    /// plus(`x`, 1)
    /// ```
    Function(String),

    /// A prior node, rendered as an expression
    ///
    /// # Example
    /// ```text
    /// `length`(`name`)
    /// ```
    Node(Box<Node>),
}

/// Expression node: denotes a scalar or composite value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Boxed native literal
    ///
    /// # Example
    /// ```text
    /// 42
    /// 'text'
    /// array(1, 2)
    /// ```
    Value(Value),

    /// Bare name, typically a column reference
    ///
    /// # Example
    /// ```text
    /// `user_id`
    /// ```
    Identifier(String),

    /// Function application
    Call { callee: Callee, args: Vec<Node> },
}

impl Expression {
    pub fn render_expression(&self) -> Result<String, RenderError> {
        match self {
            Expression::Value(value) => escape_value(value),
            Expression::Identifier(name) => Ok(escape_text(name, '`')),
            Expression::Call { callee, args } => {
                let callee_text = match callee {
                    Callee::Function(name) => name.clone(),
                    Callee::Node(node) => node.render_expression()?,
                };
                let args_text = args
                    .iter()
                    .map(Node::render_expression)
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ");
                Ok(format!("{callee_text}({args_text})"))
            }
        }
    }

    /// An expression on its own is a `select` of that expression.
    pub fn render_statement(&self) -> Result<String, RenderError> {
        Ok(format!("select {}", self.render_expression()?))
    }
}
