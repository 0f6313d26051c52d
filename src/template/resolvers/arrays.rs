//! Array helpers: `array`, `oneOf`, `someOf`, `join`, `slice`, `sort`, `reverse`.

use super::{array_arg, int_arg, opt_str, FunctionResolver, FunctionScope};
use crate::error::EvalError;
use crate::template::value::Value;
use rand::seq::SliceRandom;
use rand::Rng;

pub struct ArraysResolver;

impl FunctionResolver for ArraysResolver {
    fn try_resolve(
        &self,
        name: &str,
        args: &[Value],
        scope: &mut FunctionScope<'_>,
    ) -> Option<Result<Value, EvalError>> {
        let result = match name.to_ascii_lowercase().as_str() {
            "array" => array(args),
            "oneof" => one_of(args, scope),
            "someof" => some_of(args, scope),
            "join" => join(args),
            "slice" => slice(args),
            "sort" => sort(args),
            "reverse" => array_arg(args, 0, "reverse")
                .map(|items| Value::Array(items.iter().rev().cloned().collect())),
            _ => return None,
        };
        Some(result)
    }
}

fn array(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::args("array", "at least one element is required"));
    }
    Ok(Value::Array(args.to_vec()))
}

fn one_of(args: &[Value], scope: &mut FunctionScope<'_>) -> Result<Value, EvalError> {
    let items = array_arg(args, 0, "oneOf")?;
    items
        .choose(&mut *scope.rng)
        .cloned()
        .ok_or_else(|| EvalError::args("oneOf", "array is empty"))
}

fn some_of(args: &[Value], scope: &mut FunctionScope<'_>) -> Result<Value, EvalError> {
    let items = array_arg(args, 0, "someOf")?;
    let min = int_arg(args, 1, "someOf")?;
    let max = int_arg(args, 2, "someOf")?;
    let stringify = opt_str(args, 3, "false").eq_ignore_ascii_case("true");

    if min < 0 || max < min {
        return Err(EvalError::args(
            "someOf",
            format!("invalid range [{min}, {max}]"),
        ));
    }

    let count = (scope.rng.gen_range(min..=max) as usize).min(items.len());
    let mut picked = items.to_vec();
    picked.shuffle(&mut *scope.rng);
    picked.truncate(count);

    if stringify {
        picked = picked.iter().map(|v| Value::from(v.to_string())).collect();
    }
    Ok(Value::Array(picked))
}

fn join(args: &[Value]) -> Result<Value, EvalError> {
    let items = array_arg(args, 0, "join")?;
    let separator = opt_str(args, 1, " ");
    let joined = items
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::from(joined))
}

fn slice(args: &[Value]) -> Result<Value, EvalError> {
    let items = array_arg(args, 0, "slice")?;
    let len = items.len() as i64;
    let start = int_arg(args, 1, "slice")?.clamp(0, len);
    let end = match args.get(2) {
        Some(_) => int_arg(args, 2, "slice")?.clamp(start, len),
        None => len,
    };
    Ok(Value::Array(items[start as usize..end as usize].to_vec()))
}

fn sort(args: &[Value]) -> Result<Value, EvalError> {
    let items = array_arg(args, 0, "sort")?;
    let descending = match opt_str(args, 1, "asc").to_ascii_lowercase().as_str() {
        "asc" => false,
        "desc" => true,
        other => {
            return Err(EvalError::args(
                "sort",
                format!("unknown order '{other}', expected 'asc' or 'desc'"),
            ))
        }
    };

    let mut keyed: Vec<(String, Value)> = items
        .iter()
        .map(|item| (item.to_string(), item.clone()))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    if descending {
        keyed.reverse();
    }
    Ok(Value::Array(keyed.into_iter().map(|(_, v)| v).collect()))
}
