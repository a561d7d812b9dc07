//! Dialect literal syntax for native values and bare identifiers.
//!
//! ```
//! use ck_query::{escape_text, escape_value, Value};
//!
//! assert_eq!(escape_text("it's", '\''), "'it\\'s'");
//! assert_eq!(escape_value(&Value::List(vec![1.into(), 2.into()])).unwrap(), "array(1, 2)");
//! ```

use crate::{
    ast::{Node, RenderError},
    function::Function,
    value::Value,
};

/// Two-character escape for the characters the dialect treats specially.
fn escape_char(ch: char) -> Option<&'static str> {
    let escaped = match ch {
        '\0' => "\\0",
        '\\' => "\\\\",
        '\x07' => "\\a",
        '\x08' => "\\b",
        '\x0c' => "\\f",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        '\x0b' => "\\v",
        _ => return None,
    };
    Some(escaped)
}

/// Quotes `text` with `quote`, escaping control characters, backslashes and the quote.
/// Non-ASCII characters are copied verbatim.
pub fn escape_text(text: &str, quote: char) -> String {
    let mut result = String::with_capacity(text.len() + 2);
    result.push(quote);
    for ch in text.chars() {
        match escape_char(ch) {
            Some(escaped) => result.push_str(escaped),
            None if ch == quote => {
                result.push('\\');
                result.push(quote);
            }
            None => result.push(ch),
        }
    }
    result.push(quote);
    result
}

/// Like [`escape_text`] over raw bytes; bytes at or above 128 become `\xHH`.
pub fn escape_buffer(buffer: &[u8], quote: char) -> String {
    let mut result = String::with_capacity(buffer.len() + 2);
    result.push(quote);
    for &byte in buffer {
        let ch = char::from(byte);
        if let Some(escaped) = escape_char(ch) {
            result.push_str(escaped);
        } else if ch == quote {
            result.push('\\');
            result.push(quote);
        } else if byte >= 128 {
            result.push_str(&format!("\\x{byte:02x}"));
        } else {
            result.push(ch);
        }
    }
    result.push(quote);
    result
}

/// Shortest round-trip float text with a fractional part or an exponent:
/// `123.0`, `0.1`, `1e+16`, `1e-05`, `inf`, `-inf`, `nan`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let text = format!("{value:?}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => text,
    }
}

/// Renders a native value as a dialect literal.
///
/// Sets and maps render in their stored order, which callers should treat as
/// unspecified. Builtin functions and bound methods have no literal form and
/// yield [`RenderError::Unrenderable`].
pub fn escape_value(value: &Value) -> Result<String, RenderError> {
    let text = match value {
        Value::Null => "null".to_string(),
        Value::Wildcard => "*".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(n) => format_float(*n),
        Value::Complex { re, im } => format!("tuple({}, {})", format_float(*re), format_float(*im)),
        Value::List(items) | Value::Set(items) => format!("array({})", escape_members(items)?),
        Value::Tuple(items) => format!("tuple({})", escape_members(items)?),
        Value::Range { start, stop, step } => format!("range({start}, {stop}, {step})"),
        Value::Text(s) => escape_text(s, '\''),
        Value::Bytes(b) => escape_buffer(b, '\''),
        Value::Map(entries) => {
            let members = entries
                .iter()
                .map(|(key, value)| Ok(format!("tuple({}, {})", escape_value(key)?, escape_value(value)?)))
                .collect::<Result<Vec<_>, RenderError>>()?;
            format!("array({})", members.join(", "))
        }
        Value::Node(node) => node.render_expression()?,
        Value::Function(function) => escape_function(function)?,
    };
    Ok(text)
}

fn escape_members(items: &[Value]) -> Result<String, RenderError> {
    let members = items.iter().map(escape_value).collect::<Result<Vec<_>, _>>()?;
    Ok(members.join(", "))
}

fn escape_function(function: &Function) -> Result<String, RenderError> {
    let Some(params) = function.params() else {
        return Err(RenderError::Unrenderable(format!(
            "builtin function `{}`",
            function.name()
        )));
    };

    let args = params
        .iter()
        .map(|param| Value::Node(Box::new(Node::identifier(param.as_str()))))
        .collect();
    let body = function
        .call(args, Vec::new())
        .map_err(|source| RenderError::Lambda {
            name: function.name().to_string(),
            source,
        })?;
    let body_text = Node::from(body).render_expression()?;

    let params_text = params
        .iter()
        .map(|param| escape_text(param, '\''))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("lambda(tuple({params_text}), {body_text})"))
}
