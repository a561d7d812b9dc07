//! Direct AST construction.
//!
//! Everything the replayed trace can produce is also reachable from here:
//! operators overload onto `Expression` and `Node`, comparisons are methods,
//! and statements chain with [`Statement::clause`], [`Statement::list`] and
//! [`Statement::method`].

use std::ops;

use crate::{
    ast::{BinaryOp, Callee, CompareOp, Expression, Node, RenderError, Statement, UnaryOp},
    value::Value,
};

impl Expression {
    pub fn value(value: impl Into<Value>) -> Self {
        Expression::Value(value.into())
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    /// Calls a dialect function by name.
    pub fn call<A>(function: impl Into<String>, args: A) -> Self
    where
        A: IntoIterator<Item = Node>,
    {
        Expression::Call {
            callee: Callee::Function(function.into()),
            args: args.into_iter().collect(),
        }
    }

    /// Calls whatever `callee` renders to.
    pub fn invoke<A>(callee: impl Into<Node>, args: A) -> Self
    where
        A: IntoIterator<Item = Node>,
    {
        Expression::Call {
            callee: Callee::Node(Box::new(callee.into())),
            args: args.into_iter().collect(),
        }
    }
}

impl Node {
    pub fn identifier(name: impl Into<String>) -> Self {
        Node::Expression(Expression::identifier(name))
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Node::Raw(text.into())
    }

    /// `node.name`: a clause keyword on statements, a tuple element otherwise.
    pub fn attr(self, name: &str) -> Node {
        match self {
            Node::Statement(statement) => Node::Statement(statement.clause(name)),
            other => Node::Expression(Expression::call(
                "tupleElement",
                [other, Node::from(name)],
            )),
        }
    }

    /// `node[index]`
    pub fn element(self, index: impl Into<Node>) -> Expression {
        BinaryOp::Subscript.apply(self, index.into())
    }
}

macro_rules! comparison_methods {
    ($target:ty) => {
        impl $target {
            pub fn less(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::Less.apply(self.into(), rhs.into())
            }

            pub fn less_or_equals(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::LessOrEquals.apply(self.into(), rhs.into())
            }

            pub fn equals(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::Equals.apply(self.into(), rhs.into())
            }

            pub fn not_equals(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::NotEquals.apply(self.into(), rhs.into())
            }

            pub fn greater(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::Greater.apply(self.into(), rhs.into())
            }

            pub fn greater_or_equals(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::GreaterOrEquals.apply(self.into(), rhs.into())
            }

            pub fn is_in(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::In.apply(self.into(), rhs.into())
            }

            pub fn not_in(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::NotIn.apply(self.into(), rhs.into())
            }

            /// Same type name and equal value.
            pub fn identical(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::Is.apply(self.into(), rhs.into())
            }

            pub fn not_identical(self, rhs: impl Into<Node>) -> Expression {
                CompareOp::IsNot.apply(self.into(), rhs.into())
            }
        }
    };
}

comparison_methods!(Expression);
comparison_methods!(Node);

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Node>> ops::$trait<T> for Expression {
            type Output = Expression;

            fn $method(self, rhs: T) -> Expression {
                $op.apply(Node::from(self), rhs.into())
            }
        }

        impl<T: Into<Node>> ops::$trait<T> for Node {
            type Output = Expression;

            fn $method(self, rhs: T) -> Expression {
                $op.apply(self, rhs.into())
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Subtract);
binary_operator!(Mul, mul, BinaryOp::Multiply);
binary_operator!(Div, div, BinaryOp::TrueDivide);
binary_operator!(Rem, rem, BinaryOp::Modulo);
binary_operator!(BitAnd, bitand, BinaryOp::And);
binary_operator!(BitOr, bitor, BinaryOp::Or);
binary_operator!(BitXor, bitxor, BinaryOp::Xor);
binary_operator!(Shl, shl, BinaryOp::LeftShift);
binary_operator!(Shr, shr, BinaryOp::RightShift);

macro_rules! unary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait for Expression {
            type Output = Expression;

            fn $method(self) -> Expression {
                $op.apply(Node::from(self))
            }
        }

        impl ops::$trait for Node {
            type Output = Expression;

            fn $method(self) -> Expression {
                $op.apply(self)
            }
        }
    };
}

unary_operator!(Neg, neg, UnaryOp::Negative);
unary_operator!(Not, not, UnaryOp::Not);

impl Statement {
    pub fn initial(name: impl Into<String>) -> Self {
        Statement::Initial(name.into())
    }

    /// Appends a bare clause keyword.
    pub fn clause(self, name: impl Into<String>) -> Statement {
        Statement::SimpleClause {
            previous: Box::new(self),
            name: name.into(),
        }
    }

    /// Appends a comma-separated list.
    pub fn list<A>(self, args: A) -> Result<Statement, RenderError>
    where
        A: IntoIterator<Item = Node>,
    {
        self.list_with_aliases(args, Vec::new())
    }

    /// Appends a comma-separated list followed by `value as name` aliases.
    ///
    /// Fails when `self` is itself a list clause.
    pub fn list_with_aliases<A, L>(self, args: A, aliases: L) -> Result<Statement, RenderError>
    where
        A: IntoIterator<Item = Node>,
        L: IntoIterator<Item = (String, Node)>,
    {
        if self.is_list_clause() {
            return Err(RenderError::ClauseChaining {
                previous: self.render_statement()?,
            });
        }
        Ok(Statement::ListClause {
            previous: Box::new(self),
            args: args.into_iter().collect(),
            aliases: aliases.into_iter().collect(),
        })
    }

    /// `statement.name(args)`: a clause keyword followed by its list.
    pub fn method<A>(self, name: impl Into<String>, args: A) -> Result<Statement, RenderError>
    where
        A: IntoIterator<Item = Node>,
    {
        self.clause(name).list(args)
    }
}

pub fn with_() -> Statement {
    Statement::initial("with")
}

pub fn select() -> Statement {
    Statement::initial("select")
}

pub fn select_distinct() -> Statement {
    Statement::initial("select_distinct")
}

pub fn insert_into() -> Statement {
    Statement::initial("insert_into")
}
