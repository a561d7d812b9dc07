//! Host builtins bound in every template's context.
//!
//! They run eagerly at compile time, so `len(columns)` over a native list
//! becomes a literal while `length(x)` (not a builtin) stays a dialect call.

use std::cmp::Ordering;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::{
    function::{CallError, Function, check_arity, reject_keywords},
    value::{SizeError, Value},
};

/// Floats in `I64_MIN..I64_LIMIT` truncate to an `int` without overflow.
const I64_MIN: f64 = -9_223_372_036_854_775_808.0;
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

pub fn builtins() -> Vec<(&'static str, Function)> {
    vec![
        ("len", Function::builtin("len", len)),
        ("str", Function::builtin("str", text)),
        ("repr", Function::builtin("repr", representation)),
        ("int", Function::builtin("int", integer)),
        ("float", Function::builtin("float", floating)),
        ("bool", Function::builtin("bool", truth)),
        ("abs", Function::builtin("abs", abs)),
        ("min", Function::builtin("min", |args, kwargs| extreme("min", args, kwargs, Ordering::Less))),
        ("max", Function::builtin("max", |args, kwargs| extreme("max", args, kwargs, Ordering::Greater))),
        ("sum", Function::builtin("sum", sum)),
        ("round", Function::builtin("round", round)),
        ("range", Function::builtin("range", range)),
        ("list", Function::builtin("list", |args, kwargs| {
            collect("list", args, kwargs).map(Value::List)
        })),
        ("tuple", Function::builtin("tuple", |args, kwargs| {
            collect("tuple", args, kwargs).map(Value::Tuple)
        })),
        ("set", Function::builtin("set", |args, kwargs| {
            collect("set", args, kwargs).map(Value::set)
        })),
        ("sorted", Function::builtin("sorted", sorted)),
    ]
}

type Args = Vec<Value>;
type Kwargs = Vec<(String, Value)>;

fn type_error(message: String) -> CallError {
    CallError::Type(message)
}

pub(crate) fn members(function: &str, value: &Value) -> Result<Vec<Value>, CallError> {
    value.iterate().map_err(|e| match e {
        SizeError::Unsized(type_name) => {
            type_error(format!("{function}(): '{type_name}' object is not iterable"))
        }
        SizeError::TooLarge => CallError::Failed(format!("{function}(): {e}")),
    })
}

fn len(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("len", &kwargs)?;
    check_arity("len", &args, 1, 1)?;
    let length = args[0].len().map_err(|e| match e {
        SizeError::Unsized(type_name) => {
            type_error(format!("object of type '{type_name}' has no len()"))
        }
        SizeError::TooLarge => CallError::Failed(e.to_string()),
    })?;
    Ok(Value::Integer(length as i64))
}

fn text(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("str", &kwargs)?;
    check_arity("str", &args, 0, 1)?;
    Ok(Value::Text(args.first().map(Value::to_text).unwrap_or_default()))
}

fn representation(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("repr", &kwargs)?;
    check_arity("repr", &args, 1, 1)?;
    Ok(Value::Text(args[0].repr()))
}

fn integer(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("int", &kwargs)?;
    check_arity("int", &args, 0, 1)?;
    let Some(value) = args.first() else {
        return Ok(Value::Integer(0));
    };
    match value {
        Value::Boolean(_) | Value::Integer(_) => Ok(Value::Integer(value.as_int().unwrap_or_default())),
        Value::Float(n) if (I64_MIN..I64_LIMIT).contains(&n.trunc()) => {
            Ok(Value::Integer(n.trunc() as i64))
        }
        Value::Float(n) if n.is_finite() => {
            Err(CallError::Failed("integer overflow in int()".to_string()))
        }
        Value::Float(n) => Err(CallError::Failed(format!(
            "cannot convert float {} to integer",
            if n.is_nan() { "NaN" } else { "infinity" }
        ))),
        Value::Text(s) => s.trim().replace('_', "").parse::<i64>().map(Value::Integer).map_err(|_| {
            CallError::Failed(format!("invalid literal for int() with base 10: {}", value.repr()))
        }),
        other => Err(type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn floating(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("float", &kwargs)?;
    check_arity("float", &args, 0, 1)?;
    let Some(value) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    if let Some(n) = value.as_float() {
        return Ok(Value::Float(n));
    }
    match value {
        Value::Text(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            CallError::Failed(format!("could not convert string to float: {}", value.repr()))
        }),
        other => Err(type_error(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn truth(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("bool", &kwargs)?;
    check_arity("bool", &args, 0, 1)?;
    Ok(Value::Boolean(args.first().is_some_and(Value::is_truthy)))
}

fn abs(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("abs", &kwargs)?;
    check_arity("abs", &args, 1, 1)?;
    match &args[0] {
        Value::Boolean(_) | Value::Integer(_) => {
            let n = args[0].as_int().unwrap_or_default();
            n.checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| CallError::Failed("integer overflow in abs()".to_string()))
        }
        Value::Float(n) => Ok(Value::Float(n.abs())),
        Value::Complex { re, im } => Ok(Value::Float(re.hypot(*im))),
        other => Err(type_error(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

/// `min`/`max` over either one iterable or several arguments.
fn extreme(function: &str, args: Args, kwargs: Kwargs, wanted: Ordering) -> Result<Value, CallError> {
    reject_keywords(function, &kwargs)?;
    check_arity(function, &args, 1, usize::MAX)?;
    let candidates = if args.len() == 1 {
        members(function, &args[0])?
    } else {
        args
    };

    let mut candidates = candidates.into_iter();
    let Some(mut best) = candidates.next() else {
        return Err(CallError::Failed(format!("{function}() arg is an empty sequence")));
    };
    for candidate in candidates {
        let ordering = candidate.compare(&best).ok_or_else(|| {
            type_error(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                if wanted == Ordering::Less { "<" } else { ">" },
                candidate.type_name(),
                best.type_name()
            ))
        })?;
        if ordering == wanted {
            best = candidate;
        }
    }
    Ok(best)
}

fn add_numbers(lhs: &Value, rhs: &Value) -> Result<Value, CallError> {
    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        return a
            .checked_add(b)
            .map(Value::Integer)
            .ok_or_else(|| CallError::Failed("integer overflow in sum()".to_string()));
    }
    match (lhs.as_float(), rhs.as_float()) {
        (Some(a), Some(b)) => Ok(Value::Float(a + b)),
        _ => Err(type_error(format!(
            "unsupported operand type(s) for +: '{}' and '{}'",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn sum(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    check_arity("sum", &args, 1, 2)?;
    let mut start = args.get(1).cloned().unwrap_or(Value::Integer(0));
    for (name, value) in kwargs {
        if name != "start" {
            return Err(CallError::UnexpectedKeyword {
                function: "sum".to_string(),
                keyword: name,
            });
        }
        start = value;
    }

    members("sum", &args[0])?
        .iter()
        .try_fold(start, |total, item| add_numbers(&total, item))
}

fn round(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("round", &kwargs)?;
    check_arity("round", &args, 1, 2)?;
    let digits = match args.get(1) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_int().ok_or_else(|| {
            type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?),
    };

    let number = &args[0];
    let decimal = match number {
        Value::Boolean(_) | Value::Integer(_) => Decimal::from(number.as_int().unwrap_or_default()),
        Value::Float(n) if !n.is_finite() => {
            return match digits {
                Some(_) => Ok(number.clone()),
                None => Err(CallError::Failed(format!("cannot convert float {} to integer", number.repr()))),
            };
        }
        Value::Float(n) => Decimal::from_f64_retain(*n)
            .ok_or_else(|| CallError::Failed(format!("cannot round {}", number.repr())))?,
        other => {
            return Err(type_error(format!(
                "type {} doesn't define __round__ method",
                other.type_name()
            )));
        }
    };

    let rounded = round_decimal(decimal, digits.unwrap_or(0))
        .ok_or_else(|| CallError::Failed(format!("cannot round {}", number.repr())))?;

    let integral = digits.is_none() || matches!(number, Value::Boolean(_) | Value::Integer(_));
    if integral {
        rounded
            .to_i64()
            .map(Value::Integer)
            .ok_or_else(|| CallError::Failed("integer overflow in round()".to_string()))
    } else {
        rounded
            .to_f64()
            .map(Value::Float)
            .ok_or_else(|| CallError::Failed(format!("cannot round {}", number.repr())))
    }
}

/// Half-to-even rounding; negative `digits` round to tens, hundreds and so on.
fn round_decimal(value: Decimal, digits: i64) -> Option<Decimal> {
    if digits >= 0 {
        let digits = u32::try_from(digits).ok()?.min(28);
        return Some(value.round_dp_with_strategy(digits, RoundingStrategy::MidpointNearestEven));
    }
    let scale = Decimal::from(10i64.checked_pow(u32::try_from(-digits).ok()?)?);
    let scaled = value.checked_div(scale)?;
    scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .checked_mul(scale)
}

fn range(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    reject_keywords("range", &kwargs)?;
    check_arity("range", &args, 1, 3)?;
    let bounds = args
        .iter()
        .map(|value| {
            value.as_int().ok_or_else(|| {
                type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    value.type_name()
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (start, stop, step) = match bounds[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => return Err(CallError::Failed("range() takes 1 to 3 arguments".to_string())),
    };
    if step == 0 {
        return Err(CallError::Failed("range() arg 3 must not be zero".to_string()));
    }
    Ok(Value::Range { start, stop, step })
}

fn collect(function: &str, args: Args, kwargs: Kwargs) -> Result<Vec<Value>, CallError> {
    reject_keywords(function, &kwargs)?;
    check_arity(function, &args, 0, 1)?;
    match args.first() {
        Some(value) => members(function, value),
        None => Ok(Vec::new()),
    }
}

fn sorted(args: Args, kwargs: Kwargs) -> Result<Value, CallError> {
    check_arity("sorted", &args, 1, 1)?;
    let mut reverse = false;
    for (name, value) in kwargs {
        if name != "reverse" {
            return Err(CallError::UnexpectedKeyword {
                function: "sorted".to_string(),
                keyword: name,
            });
        }
        reverse = value.is_truthy();
    }

    let mut items = members("sorted", &args[0])?;
    let mut failure = None;
    items.sort_by(|a, b| {
        a.compare(b).unwrap_or_else(|| {
            failure.get_or_insert_with(|| {
                type_error(format!(
                    "'<' not supported between instances of '{}' and '{}'",
                    a.type_name(),
                    b.type_name()
                ))
            });
            Ordering::Equal
        })
    });
    if let Some(error) = failure {
        return Err(error);
    }
    if reverse {
        items.reverse();
    }
    Ok(Value::List(items))
}
