//! Host-callable functions.
//!
//! A [`Function`] is the compile-time escape hatch: when the replayed trace
//! calls one, the arguments are unboxed to native values, the function runs
//! eagerly, and its result is boxed back onto the operand stack.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::value::Value;

type HostFn = dyn Fn(Vec<Value>, Vec<(String, Value)>) -> Result<Value, CallError> + Send + Sync;

/// Errors raised by host functions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("{function}() takes {expected} argument(s) ({given} given)")]
    Arity {
        function: String,
        expected: String,
        given: usize,
    },

    #[error("{function}() got an unexpected keyword argument '{keyword}'")]
    UnexpectedKeyword { function: String, keyword: String },

    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Failed(String),
}

/// A named host function.
///
/// Functions declared with parameter names are *lambda-capable*: when one is
/// rendered as a literal it becomes `lambda(tuple('p', ...), body)`, the body
/// obtained by calling it with identifiers in place of the parameters.
#[derive(Clone)]
pub struct Function {
    name: String,
    params: Option<Vec<String>>,
    body: Arc<HostFn>,
}

impl Function {
    /// A builtin or bound method; it cannot be rendered into a query.
    pub fn builtin<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Vec<Value>, Vec<(String, Value)>) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Function {
            name: name.into(),
            params: None,
            body: Arc::new(body),
        }
    }

    /// A function with named parameters, renderable as a dialect lambda.
    ///
    /// ```
    /// use ck_query::{escape_value, Expression, Function, Node, Value};
    ///
    /// let increment = Function::lambda("increment", ["x"], |args, _| {
    ///     let x = Node::from(args[0].clone());
    ///     Ok(Value::from(Expression::call("plus", [x, Node::from(1)])))
    /// });
    ///
    /// assert_eq!(
    ///     escape_value(&Value::Function(increment)).unwrap(),
    ///     "lambda(tuple('x'), plus(`x`, 1))"
    /// );
    /// ```
    pub fn lambda<F, P>(name: impl Into<String>, params: P, body: F) -> Self
    where
        F: Fn(Vec<Value>, Vec<(String, Value)>) -> Result<Value, CallError> + Send + Sync + 'static,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Function {
            name: name.into(),
            params: Some(params.into_iter().map(Into::into).collect()),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter names; `None` for builtins and bound methods.
    pub fn params(&self) -> Option<&[String]> {
        self.params.as_deref()
    }

    pub fn call(&self, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value, CallError> {
        (self.body)(args, kwargs)
    }

    /// Identity comparison: clones of one function are the same function.
    pub fn same(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

pub(crate) fn check_arity(
    function: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> Result<(), CallError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else if max == usize::MAX {
        format!("at least {min}")
    } else {
        format!("{min} to {max}")
    };
    Err(CallError::Arity {
        function: function.to_string(),
        expected,
        given: args.len(),
    })
}

pub(crate) fn reject_keywords(function: &str, kwargs: &[(String, Value)]) -> Result<(), CallError> {
    match kwargs.first() {
        Some((keyword, _)) => Err(CallError::UnexpectedKeyword {
            function: function.to_string(),
            keyword: keyword.clone(),
        }),
        None => Ok(()),
    }
}
