//! Pluggable function resolvers.
//!
//! Resolvers form a chain: the evaluator asks each one in order and the
//! first to return `Some` handles the call. Built-in names are matched
//! case-insensitively.

mod arrays;
mod faker;
mod math;
mod request;
mod strings;
mod variables;

pub use arrays::ArraysResolver;
pub use faker::{FakerResolver, FAKER_PATHS};
pub use math::MathResolver;
pub use request::{RequestParamsResolver, RequestView};
pub use strings::StringsResolver;
pub use variables::VariablesResolver;

use super::context::TemplateContext;
use super::value::Value;
use crate::error::EvalError;
use rand::RngCore;

/// Mutable render state a resolver may touch.
pub struct FunctionScope<'a> {
    pub variables: &'a mut TemplateContext,
    pub rng: &'a mut dyn RngCore,
}

/// A handler that may recognize and compute a named function call.
pub trait FunctionResolver: Send + Sync {
    /// `None` means "not my function"; `Some(Err(..))` aborts the render.
    fn try_resolve(
        &self,
        name: &str,
        args: &[Value],
        scope: &mut FunctionScope<'_>,
    ) -> Option<Result<Value, EvalError>>;
}

/// Built-in resolvers in their fixed order.
pub(crate) static BUILTIN_RESOLVERS: [&(dyn FunctionResolver); 4] = [
    &StringsResolver,
    &ArraysResolver,
    &MathResolver,
    &FakerResolver,
];

// Argument helpers shared by the built-in families.

pub(crate) fn arg<'v>(args: &'v [Value], index: usize, function: &str) -> Result<&'v Value, EvalError> {
    args.get(index)
        .ok_or_else(|| EvalError::args(function, format!("missing argument #{}", index + 1)))
}

pub(crate) fn str_arg<'v>(args: &'v [Value], index: usize, function: &str) -> Result<&'v str, EvalError> {
    let value = arg(args, index, function)?;
    value.as_str().ok_or_else(|| {
        EvalError::args(
            function,
            format!("argument #{} must be a string, got {}", index + 1, value.type_name()),
        )
    })
}

pub(crate) fn int_arg(args: &[Value], index: usize, function: &str) -> Result<i64, EvalError> {
    let value = arg(args, index, function)?;
    value.as_integer().ok_or_else(|| {
        EvalError::args(function, format!("argument #{} must be an integer", index + 1))
    })
}

pub(crate) fn array_arg<'v>(args: &'v [Value], index: usize, function: &str) -> Result<&'v [Value], EvalError> {
    let value = arg(args, index, function)?;
    value.as_array().ok_or_else(|| {
        EvalError::args(
            function,
            format!("argument #{} must be an array, got {}", index + 1, value.type_name()),
        )
    })
}

/// Optional string argument, falling back when absent or not a string.
pub(crate) fn opt_str<'v>(args: &'v [Value], index: usize, default: &'v str) -> &'v str {
    args.get(index).and_then(Value::as_str).unwrap_or(default)
}
