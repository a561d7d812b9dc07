//! Methods on native values, bound when the trace loads a method on a literal.

use regex::Regex;

use crate::{
    builtins::members,
    function::{CallError, Function, check_arity, reject_keywords},
    value::Value,
};

type Args = Vec<Value>;
type Kwargs = Vec<(String, Value)>;
type Method = fn(&Value, Args, Kwargs) -> Result<Value, CallError>;

/// Binds `receiver.name` to a callable, if the receiver's type has that method.
pub fn bind(receiver: &Value, name: &str) -> Option<Function> {
    let method = lookup(receiver, name)?;
    let receiver = receiver.clone();
    let qualified = format!("{}.{name}", receiver.type_name());
    Some(Function::builtin(qualified, move |args, kwargs| {
        method(&receiver, args, kwargs)
    }))
}

fn lookup(receiver: &Value, name: &str) -> Option<Method> {
    let method: Method = match (receiver, name) {
        (Value::Text(_), "format") => format,
        (Value::Text(_), "join") => join,
        (Value::Text(_), "upper") => upper,
        (Value::Text(_), "lower") => lower,
        (Value::Text(_), "strip") => strip,
        (Value::Text(_), "replace") => replace,
        (Value::Text(_), "split") => split,
        (Value::Text(_), "startswith") => startswith,
        (Value::Text(_), "endswith") => endswith,
        (Value::List(_) | Value::Tuple(_), "count") => count,
        (Value::List(_) | Value::Tuple(_), "index") => index,
        (Value::Map(_), "get") => get,
        (Value::Map(_), "keys") => keys,
        (Value::Map(_), "values") => values,
        (Value::Map(_), "items") => items,
        _ => return None,
    };
    Some(method)
}

fn text_of(receiver: &Value) -> &str {
    match receiver {
        Value::Text(s) => s,
        _ => "",
    }
}

fn text_arg<'a>(method: &str, value: &'a Value) -> Result<&'a str, CallError> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(CallError::Type(format!(
            "{method}() argument must be str, not {}",
            other.type_name()
        ))),
    }
}

// ========================================
// Text Methods
// ========================================

/// `str.format`: `{}`, `{0}`, `{name}` and the `{{`/`}}` escapes.
fn format(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    let template = text_of(receiver);
    let pattern = Regex::new(r"\{\{|\}\}|\{([^{}]*)\}")
        .map_err(|e| CallError::Failed(format!("invalid format pattern: {e}")))?;

    let mut result = String::with_capacity(template.len());
    let mut last = 0;
    let mut next_auto = 0;
    let mut numbering: Option<bool> = None;

    for captures in pattern.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let literal = &template[last..whole.start()];
        if literal.contains(['{', '}']) {
            return Err(CallError::Failed(format!(
                "single brace encountered in format string {:?}",
                template
            )));
        }
        result.push_str(literal);
        last = whole.end();

        let field = match (whole.as_str(), captures.get(1)) {
            ("{{", _) => {
                result.push('{');
                continue;
            }
            ("}}", _) => {
                result.push('}');
                continue;
            }
            (_, Some(field)) => field.as_str(),
            (_, None) => continue,
        };

        if field.contains(['!', ':', '.', '[']) {
            return Err(CallError::Failed(format!(
                "unsupported replacement field {{{field}}}"
            )));
        }

        let automatic = field.is_empty();
        let value = if automatic || field.chars().all(|c| c.is_ascii_digit()) {
            if numbering.is_some_and(|previous| previous != automatic) {
                return Err(CallError::Failed(
                    "cannot mix automatic and manual field numbering".to_string(),
                ));
            }
            numbering = Some(automatic);

            let position = if automatic {
                next_auto += 1;
                next_auto - 1
            } else {
                field
                    .parse::<usize>()
                    .map_err(|_| CallError::Failed(format!("invalid field index {field}")))?
            };
            args.get(position).ok_or_else(|| {
                CallError::Failed(format!("replacement index {position} out of range"))
            })?
        } else {
            kwargs
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, value)| value)
                .ok_or_else(|| CallError::Failed(format!("missing format argument '{field}'")))?
        };
        result.push_str(&value.to_text());
    }

    let rest = &template[last..];
    if rest.contains(['{', '}']) {
        return Err(CallError::Failed(format!(
            "single brace encountered in format string {:?}",
            template
        )));
    }
    result.push_str(rest);
    Ok(Value::Text(result))
}

fn join(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("join", &kwargs)?;
    check_arity("join", &args, 1, 1)?;
    let parts = members("join", &args[0])?
        .iter()
        .map(|item| text_arg("join", item).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Text(parts.join(text_of(receiver))))
}

fn upper(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("upper", &kwargs)?;
    check_arity("upper", &args, 0, 0)?;
    Ok(Value::Text(text_of(receiver).to_uppercase()))
}

fn lower(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("lower", &kwargs)?;
    check_arity("lower", &args, 0, 0)?;
    Ok(Value::Text(text_of(receiver).to_lowercase()))
}

fn strip(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("strip", &kwargs)?;
    check_arity("strip", &args, 0, 1)?;
    let text = text_of(receiver);
    let stripped = match args.first() {
        None | Some(Value::Null) => text.trim(),
        Some(chars) => {
            let chars: Vec<char> = text_arg("strip", chars)?.chars().collect();
            text.trim_matches(chars.as_slice())
        }
    };
    Ok(Value::Text(stripped.to_string()))
}

fn replace(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("replace", &kwargs)?;
    check_arity("replace", &args, 2, 3)?;
    let old = text_arg("replace", &args[0])?;
    let new = text_arg("replace", &args[1])?;
    let text = text_of(receiver);
    let replaced = match args.get(2).and_then(Value::as_int) {
        Some(limit) if limit >= 0 => text.replacen(old, new, limit as usize),
        _ => text.replace(old, new),
    };
    Ok(Value::Text(replaced))
}

fn split(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("split", &kwargs)?;
    check_arity("split", &args, 0, 2)?;
    let text = text_of(receiver);
    let limit = args
        .get(1)
        .and_then(Value::as_int)
        .filter(|limit| *limit >= 0)
        .map(|limit| limit as usize + 1);

    let parts: Vec<Value> = match args.first() {
        None | Some(Value::Null) => match limit {
            Some(limit) => whitespace_splitn(text, limit),
            None => text.split_whitespace().map(Value::from).collect(),
        },
        Some(separator) => {
            let separator = text_arg("split", separator)?;
            if separator.is_empty() {
                return Err(CallError::Failed("empty separator".to_string()));
            }
            match limit {
                Some(limit) => text.splitn(limit, separator).map(Value::from).collect(),
                None => text.split(separator).map(Value::from).collect(),
            }
        }
    };
    Ok(Value::List(parts))
}

/// Whitespace split with at most `limit` parts; the last keeps its inner whitespace.
fn whitespace_splitn(text: &str, limit: usize) -> Vec<Value> {
    let mut parts = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if parts.len() + 1 == limit {
            parts.push(Value::from(rest));
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(Value::from(&rest[..end]));
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(Value::from(rest));
                break;
            }
        }
    }
    parts
}

fn affixes<'a>(method: &str, value: &'a Value) -> Result<Vec<&'a str>, CallError> {
    match value {
        Value::Tuple(items) => items.iter().map(|item| text_arg(method, item)).collect(),
        other => Ok(vec![text_arg(method, other)?]),
    }
}

fn startswith(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("startswith", &kwargs)?;
    check_arity("startswith", &args, 1, 1)?;
    let text = text_of(receiver);
    let found = affixes("startswith", &args[0])?
        .iter()
        .any(|prefix| text.starts_with(prefix));
    Ok(Value::Boolean(found))
}

fn endswith(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("endswith", &kwargs)?;
    check_arity("endswith", &args, 1, 1)?;
    let text = text_of(receiver);
    let found = affixes("endswith", &args[0])?
        .iter()
        .any(|suffix| text.ends_with(suffix));
    Ok(Value::Boolean(found))
}

// ========================================
// Sequence Methods
// ========================================

fn sequence_of(receiver: &Value) -> &[Value] {
    match receiver {
        Value::List(items) | Value::Tuple(items) => items,
        _ => &[],
    }
}

fn count(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("count", &kwargs)?;
    check_arity("count", &args, 1, 1)?;
    let total = sequence_of(receiver).iter().filter(|item| **item == args[0]).count();
    Ok(Value::Integer(total as i64))
}

fn index(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("index", &kwargs)?;
    check_arity("index", &args, 1, 1)?;
    sequence_of(receiver)
        .iter()
        .position(|item| *item == args[0])
        .map(|position| Value::Integer(position as i64))
        .ok_or_else(|| CallError::Failed(format!("{} is not in {}", args[0].repr(), receiver.type_name())))
}

// ========================================
// Map Methods
// ========================================

fn entries_of(receiver: &Value) -> &[(Value, Value)] {
    match receiver {
        Value::Map(entries) => entries,
        _ => &[],
    }
}

fn get(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("get", &kwargs)?;
    check_arity("get", &args, 1, 2)?;
    let found = entries_of(receiver)
        .iter()
        .find(|(key, _)| *key == args[0])
        .map(|(_, value)| value.clone());
    Ok(found.unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::Null)))
}

fn keys(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("keys", &kwargs)?;
    check_arity("keys", &args, 0, 0)?;
    Ok(Value::List(entries_of(receiver).iter().map(|(key, _)| key.clone()).collect()))
}

fn values(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("values", &kwargs)?;
    check_arity("values", &args, 0, 0)?;
    Ok(Value::List(entries_of(receiver).iter().map(|(_, value)| value.clone()).collect()))
}

fn items(receiver: &Value, args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("items", &kwargs)?;
    check_arity("items", &args, 0, 0)?;
    Ok(Value::List(
        entries_of(receiver)
            .iter()
            .map(|(key, value)| Value::Tuple(vec![key.clone(), value.clone()]))
            .collect(),
    ))
}
