use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::{
    ast::{Expression, Node, Statement},
    escape::{escape_buffer, escape_text, format_float},
    function::Function,
};

/// Most members a range may expand into when iterated.
pub const MAX_EXPANSION: usize = 1 << 20;

/// Why a value has no length or cannot be expanded into members.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeError {
    #[error("'{0}' object has no length")]
    Unsized(&'static str),

    #[error("range too large")]
    TooLarge,
}

/// A native host value flowing through the compiler.
///
/// Values enter the compiler as constants, bound arguments, globals and
/// closure bindings. They stay native while host computation runs eagerly
/// and are rendered as dialect literals once they end up inside the query.
///
/// # Examples
///
/// ```
/// use ck_query::Value;
///
/// let scalar = Value::Integer(42);
/// let text = Value::from("users");
/// let row = Value::Tuple(vec![Value::Integer(1), Value::from("a")]);
///
/// assert_eq!(scalar.type_name(), "int");
/// assert_eq!(text.to_text(), "users");
/// assert_eq!(row.repr(), "(1, 'a')");
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// `None`
    Null,

    /// The `...` marker, rendered as `*`
    Wildcard,

    Boolean(bool),

    Integer(i64),

    Float(f64),

    /// Complex number, rendered as a `(re, im)` tuple
    Complex { re: f64, im: f64 },

    /// Ordered sequence
    List(Vec<Value>),

    /// Fixed-size sequence
    Tuple(Vec<Value>),

    /// Arithmetic progression `start..stop` by `step`
    Range { start: i64, stop: i64, step: i64 },

    /// UTF-8 text
    Text(String),

    /// Raw byte buffer
    Bytes(Vec<u8>),

    /// Unordered collection without duplicates (kept in insertion order)
    Set(Vec<Value>),

    /// Key/value mapping (kept in insertion order, later keys replace earlier)
    Map(Vec<(Value, Value)>),

    /// An AST node embedded in a native container
    Node(Box<Node>),

    /// Host-callable function, invoked eagerly at compile time
    Function(Function),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) | (Wildcard, Wildcard) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Boolean(a), Integer(b)) | (Integer(b), Boolean(a)) => i64::from(*a) == *b,
            (Float(a), Float(b)) => a == b,
            (Integer(a), Float(b)) | (Float(b), Integer(a)) => (*a as f64) == *b,
            (Boolean(a), Float(b)) | (Float(b), Boolean(a)) => f64::from(u8::from(*a)) == *b,
            (Complex { re: ar, im: ai }, Complex { re: br, im: bi }) => ar == br && ai == bi,
            (List(a), List(b)) | (Tuple(a), Tuple(b)) => a == b,
            (
                Range { start: a0, stop: a1, step: a2 },
                Range { start: b0, stop: b1, step: b2 },
            ) => (a0, a1, a2) == (b0, b1, b2),
            (Text(a), Text(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Set(a), Set(b)) => a.len() == b.len() && a.iter().all(|item| b.contains(item)),
            (Map(a), Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.iter().any(|(other_key, other_value)| key == other_key && value == other_value)
                    })
            }
            (Node(a), Node(b)) => a == b,
            (Function(a), Function(b)) => a.same(b),
            _ => false,
        }
    }
}

impl Value {
    /// Builds a set, dropping duplicate members.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Value {
        let mut members: Vec<Value> = Vec::new();
        for item in items {
            if !members.contains(&item) {
                members.push(item);
            }
        }
        Value::Set(members)
    }

    /// Builds a map; a repeated key keeps its first position and takes the last value.
    pub fn map(pairs: impl IntoIterator<Item = (Value, Value)>) -> Value {
        let mut entries: Vec<(Value, Value)> = Vec::new();
        for (key, value) in pairs {
            match entries.iter_mut().find(|(existing, _)| *existing == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
        Value::Map(entries)
    }

    /// Host-language type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NoneType",
            Value::Wildcard => "ellipsis",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::Complex { .. } => "complex",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Range { .. } => "range",
            Value::Text(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Set(_) => "set",
            Value::Map(_) => "dict",
            Value::Node(_) => "node",
            Value::Function(_) => "function",
        }
    }

    /// Check if the value is truthy (for `bool()` and conditions)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Wildcard => true,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Complex { re, im } => *re != 0.0 || *im != 0.0,
            Value::Range { start, stop, step } => range_len(*start, *stop, *step) != Some(0),
            Value::Text(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Node(_) | Value::Function(_) => true,
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Boolean(b) => Some(i64::from(*b)),
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Number of members, for anything with a length.
    ///
    /// Ranges whose length does not fit an `int` fail with [`SizeError::TooLarge`].
    pub fn len(&self) -> Result<usize, SizeError> {
        match self {
            Value::Text(s) => Ok(s.chars().count()),
            Value::Bytes(b) => Ok(b.len()),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items.len()),
            Value::Map(entries) => Ok(entries.len()),
            Value::Range { start, stop, step } => {
                range_len(*start, *stop, *step).ok_or(SizeError::TooLarge)
            }
            other => Err(SizeError::Unsized(other.type_name())),
        }
    }

    /// Members in iteration order.
    ///
    /// Maps iterate over their keys, text over its characters and bytes over
    /// their integer values. Ranges expand to at most [`MAX_EXPANSION`] members.
    pub fn iterate(&self) -> Result<Vec<Value>, SizeError> {
        match self {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items.clone()),
            Value::Map(entries) => Ok(entries.iter().map(|(key, _)| key.clone()).collect()),
            Value::Text(s) => Ok(s.chars().map(|c| Value::Text(c.to_string())).collect()),
            Value::Bytes(b) => Ok(b.iter().map(|byte| Value::Integer(i64::from(*byte))).collect()),
            Value::Range { start, stop, step } => {
                let len = range_len(*start, *stop, *step)
                    .filter(|len| *len <= MAX_EXPANSION)
                    .ok_or(SizeError::TooLarge)?;
                let (start, step) = (i128::from(*start), i128::from(*step));
                Ok((0..len as i128)
                    .map(|i| Value::Integer((start + i * step) as i64))
                    .collect())
            }
            other => Err(SizeError::Unsized(other.type_name())),
        }
    }

    /// Host `str()` of the value.
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// Host `repr()` of the value. Text is quoted the way dialect literals are.
    pub fn repr(&self) -> String {
        match self {
            Value::Null => "None".to_string(),
            Value::Wildcard => "Ellipsis".to_string(),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::Complex { re, im } => {
                let sign = if im.is_sign_negative() { "" } else { "+" };
                format!("({}{}{}j)", format_float(*re), sign, format_float(*im))
            }
            Value::List(items) => format!("[{}]", repr_members(items)),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", repr_members(items)),
            Value::Range { start, stop, step: 1 } => format!("range({start}, {stop})"),
            Value::Range { start, stop, step } => format!("range({start}, {stop}, {step})"),
            Value::Text(s) => escape_text(s, '\''),
            Value::Bytes(b) => format!("b{}", escape_buffer(b, '\'')),
            Value::Set(items) if items.is_empty() => "set()".to_string(),
            Value::Set(items) => format!("{{{}}}", repr_members(items)),
            Value::Map(entries) => {
                let members: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.repr(), value.repr()))
                    .collect();
                format!("{{{}}}", members.join(", "))
            }
            Value::Node(node) => match node.render_expression() {
                Ok(text) => text,
                Err(_) => "<node>".to_string(),
            },
            Value::Function(function) => format!("<function {}>", function.name()),
        }
    }

    /// Orders numbers and texts the way `sorted()`/`min()`/`max()` need.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                for (left, right) in a.iter().zip(b) {
                    match left.compare(right)? {
                        Ordering::Equal => continue,
                        unequal => return Some(unequal),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => a.as_float()?.partial_cmp(&b.as_float()?),
            },
        }
    }
}

/// Member count of a range, or `None` when it does not fit an `int`.
fn range_len(start: i64, stop: i64, step: i64) -> Option<usize> {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let len = if step > 0 && start < stop {
        (stop - start - 1) / step + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) / -step + 1
    } else {
        0
    };
    i64::try_from(len).ok().and_then(|len| usize::try_from(len).ok())
}

fn repr_members(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Value::Function(value)
    }
}

/// Unboxes a node: literal payloads come back as themselves, anything
/// symbolic stays embedded as [`Value::Node`].
impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Expression(Expression::Value(value)) => value,
            other => Value::Node(Box::new(other)),
        }
    }
}

impl From<Expression> for Value {
    fn from(expression: Expression) -> Self {
        Value::from(Node::Expression(expression))
    }
}

impl From<Statement> for Value {
    fn from(statement: Statement) -> Self {
        Value::Node(Box::new(Node::Statement(statement)))
    }
}
