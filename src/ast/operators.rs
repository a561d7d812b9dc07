use crate::ast::{Expression, Node};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+x`, rendered as a double negation
    Positive,
    /// `-x`
    Negative,
    /// `not x`
    Not,
    /// `~x`
    Invert,
}

impl UnaryOp {
    pub fn apply(self, operand: Node) -> Expression {
        match self {
            UnaryOp::Positive => Expression::call(
                "negate",
                [Node::from(Expression::call("negate", [operand]))],
            ),
            UnaryOp::Negative => Expression::call("negate", [operand]),
            UnaryOp::Not => Expression::call("not", [operand]),
            UnaryOp::Invert => Expression::call("bitNot", [operand]),
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOp::Positive => "UNARY_POSITIVE",
            UnaryOp::Negative => "UNARY_NEGATIVE",
            UnaryOp::Not => "UNARY_NOT",
            UnaryOp::Invert => "UNARY_INVERT",
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `//`
    FloorDivide,
    /// `/`
    TrueDivide,
    /// `%`
    Modulo,
    /// `**`
    Power,
    /// `@`, which the dialect reads as a cast: `x @ 'UInt8'`
    MatrixMultiply,

    // Bitwise
    /// `<<`
    LeftShift,
    /// `>>`
    RightShift,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,

    /// `x[i]`
    Subscript,
}

impl BinaryOp {
    /// Dialect function the operator translates to.
    pub fn function_name(self) -> &'static str {
        match self {
            BinaryOp::Add => "plus",
            BinaryOp::Subtract => "minus",
            BinaryOp::Multiply => "multiply",
            BinaryOp::FloorDivide => "intDiv",
            BinaryOp::TrueDivide => "divide",
            BinaryOp::Modulo => "modulo",
            BinaryOp::Power => "pow",
            BinaryOp::MatrixMultiply => "cast",
            BinaryOp::LeftShift => "bitShiftLeft",
            BinaryOp::RightShift => "bitShiftRight",
            BinaryOp::And => "bitAnd",
            BinaryOp::Or => "bitOr",
            BinaryOp::Xor => "bitXor",
            BinaryOp::Subscript => "arrayElement",
        }
    }

    pub fn apply(self, lhs: Node, rhs: Node) -> Expression {
        Expression::call(self.function_name(), [lhs, rhs])
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "BINARY_ADD",
            BinaryOp::Subtract => "BINARY_SUBTRACT",
            BinaryOp::Multiply => "BINARY_MULTIPLY",
            BinaryOp::FloorDivide => "BINARY_FLOOR_DIVIDE",
            BinaryOp::TrueDivide => "BINARY_TRUE_DIVIDE",
            BinaryOp::Modulo => "BINARY_MODULO",
            BinaryOp::Power => "BINARY_POWER",
            BinaryOp::MatrixMultiply => "BINARY_MATRIX_MULTIPLY",
            BinaryOp::LeftShift => "BINARY_LSHIFT",
            BinaryOp::RightShift => "BINARY_RSHIFT",
            BinaryOp::And => "BINARY_AND",
            BinaryOp::Or => "BINARY_OR",
            BinaryOp::Xor => "BINARY_XOR",
            BinaryOp::Subscript => "BINARY_SUBSCR",
        }
    }

    /// Looks up the operator behind a `BINARY_*` or `INPLACE_*` mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let suffix = mnemonic
            .strip_prefix("BINARY_")
            .or_else(|| mnemonic.strip_prefix("INPLACE_"))?;
        let op = match suffix {
            "ADD" => BinaryOp::Add,
            "SUBTRACT" => BinaryOp::Subtract,
            "MULTIPLY" => BinaryOp::Multiply,
            "FLOOR_DIVIDE" => BinaryOp::FloorDivide,
            "TRUE_DIVIDE" => BinaryOp::TrueDivide,
            "MODULO" => BinaryOp::Modulo,
            "POWER" => BinaryOp::Power,
            "MATRIX_MULTIPLY" => BinaryOp::MatrixMultiply,
            "LSHIFT" => BinaryOp::LeftShift,
            "RSHIFT" => BinaryOp::RightShift,
            "AND" => BinaryOp::And,
            "OR" => BinaryOp::Or,
            "XOR" => BinaryOp::Xor,
            "SUBSCR" if mnemonic.starts_with("BINARY_") => BinaryOp::Subscript,
            _ => return None,
        };
        Some(op)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Less,
    /// `<=`
    LessOrEquals,
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEquals,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `is`: same type name and equal value
    Is,
    /// `is not`: different type name or unequal value
    IsNot,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Less => "<",
            CompareOp::LessOrEquals => "<=",
            CompareOp::Equals => "==",
            CompareOp::NotEquals => "!=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEquals => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "<" => CompareOp::Less,
            "<=" => CompareOp::LessOrEquals,
            "==" => CompareOp::Equals,
            "!=" => CompareOp::NotEquals,
            ">" => CompareOp::Greater,
            ">=" => CompareOp::GreaterOrEquals,
            "in" => CompareOp::In,
            "not in" => CompareOp::NotIn,
            "is" => CompareOp::Is,
            "is not" => CompareOp::IsNot,
            _ => return None,
        };
        Some(op)
    }

    pub fn apply(self, lhs: Node, rhs: Node) -> Expression {
        let name = match self {
            CompareOp::Less => "less",
            CompareOp::LessOrEquals => "lessOrEquals",
            CompareOp::Equals => "equals",
            CompareOp::NotEquals => "notEquals",
            CompareOp::Greater => "greater",
            CompareOp::GreaterOrEquals => "greaterOrEquals",
            CompareOp::In => "in",
            CompareOp::NotIn => "notIn",
            CompareOp::Is => return identity(lhs, rhs, "and", "equals"),
            CompareOp::IsNot => return identity(lhs, rhs, "or", "notEquals"),
        };
        Expression::call(name, [lhs, rhs])
    }
}

/// No dialect identity test exists: compare type names and values instead.
fn identity(lhs: Node, rhs: Node, junction: &str, comparison: &str) -> Expression {
    let type_of = |node: Node| Node::from(Expression::call("toTypeName", [node]));
    Expression::call(
        junction,
        [
            Node::from(Expression::call(
                comparison,
                [type_of(lhs.clone()), type_of(rhs.clone())],
            )),
            Node::from(Expression::call(comparison, [lhs, rhs])),
        ],
    )
}
