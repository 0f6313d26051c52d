//! Arithmetic and comparison helpers.
//!
//! Numeric arguments are either numbers or strings that parse as a float.
//! Variadic functions silently drop anything else before folding.

use super::{arg, int_arg, FunctionResolver, FunctionScope};
use crate::error::EvalError;
use crate::template::value::Value;

pub struct MathResolver;

impl FunctionResolver for MathResolver {
    fn try_resolve(
        &self,
        name: &str,
        args: &[Value],
        _scope: &mut FunctionScope<'_>,
    ) -> Option<Result<Value, EvalError>> {
        let result = match name.to_ascii_lowercase().as_str() {
            "add" => Ok(Value::Number(numbers(args).sum())),
            "multiply" => Ok(Value::Number(numbers(args).product())),
            "subtract" => Ok(fold_from_first(args, |acc, n| acc - n)),
            "divide" => Ok(fold_from_first(args, |acc, n| acc / n)),
            "modulo" => modulo(args),
            "ceil" => unary(args, "ceil", f64::ceil),
            "floor" => unary(args, "floor", f64::floor),
            "round" => unary(args, "round", f64::round_ties_even),
            "tofixed" => to_fixed(args),
            "eq" => Ok(Value::Bool(args.windows(2).all(|w| w[0] == w[1]))),
            "noteq" => not_eq(args),
            "gt" => compare(args, "gt", |a, b| a > b),
            "gte" => compare(args, "gte", |a, b| a >= b),
            "lt" => compare(args, "lt", |a, b| a < b),
            "lte" => compare(args, "lte", |a, b| a <= b),
            _ => return None,
        };
        Some(result)
    }
}

fn numbers(args: &[Value]) -> impl Iterator<Item = f64> + '_ {
    args.iter().filter_map(Value::as_number)
}

fn fold_from_first(args: &[Value], op: impl Fn(f64, f64) -> f64) -> Value {
    let mut values = numbers(args);
    let first = values.next().unwrap_or(0.0);
    Value::Number(values.fold(first, op))
}

fn number_arg(args: &[Value], index: usize, function: &str) -> Result<f64, EvalError> {
    arg(args, index, function)?.as_number().ok_or_else(|| {
        EvalError::args(function, format!("argument #{} must be a number", index + 1))
    })
}

fn unary(args: &[Value], function: &str, op: fn(f64) -> f64) -> Result<Value, EvalError> {
    Ok(Value::Number(op(number_arg(args, 0, function)?)))
}

fn modulo(args: &[Value]) -> Result<Value, EvalError> {
    let values: Vec<f64> = numbers(args).collect();
    match values.as_slice() {
        [a, b, ..] => Ok(Value::Number(a % b)),
        _ => Err(EvalError::args("modulo", "two numbers are required")),
    }
}

fn to_fixed(args: &[Value]) -> Result<Value, EvalError> {
    let value = number_arg(args, 0, "toFixed")?;
    let decimals = int_arg(args, 1, "toFixed")?;
    if !(0..=15).contains(&decimals) {
        return Err(EvalError::args("toFixed", "decimals must be between 0 and 15"));
    }
    let factor = 10f64.powi(decimals as i32);
    Ok(Value::Number((value * factor).round_ties_even() / factor))
}

fn not_eq(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [a, b, ..] => Ok(Value::Bool(a != b)),
        _ => Err(EvalError::args("noteq", "two arguments are required")),
    }
}

fn compare(args: &[Value], function: &str, op: fn(f64, f64) -> bool) -> Result<Value, EvalError> {
    let values: Vec<f64> = numbers(args).collect();
    if values.len() < 2 {
        return Err(EvalError::args(function, "at least two numbers are required"));
    }
    Ok(Value::Bool(values.windows(2).all(|w| op(w[0], w[1]))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::context::TemplateContext;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let mut variables = TemplateContext::new();
        let mut rng = rand::thread_rng();
        let mut scope = FunctionScope {
            variables: &mut variables,
            rng: &mut rng,
        };
        MathResolver
            .try_resolve(name, &args, &mut scope)
            .expect("function should be recognized")
    }

    fn nums(values: &[f64]) -> Vec<Value> {
        values.iter().map(|n| Value::Number(*n)).collect()
    }

    fn as_f64(value: Value) -> f64 {
        value.as_number().expect("numeric result")
    }

    #[test]
    fn test_variadic_arithmetic() {
        assert_eq!(call("add", nums(&[1.0, 2.0, 3.0])).unwrap(), Value::Number(6.0));
        assert_eq!(call("multiply", nums(&[2.0, 3.0, 4.0])).unwrap(), Value::Number(24.0));
        assert_eq!(call("subtract", nums(&[10.0, 3.0, 2.0])).unwrap(), Value::Number(5.0));
        let quotient = as_f64(call("divide", nums(&[1.0, 2.0, 3.0])).unwrap());
        assert!((quotient - 0.1667).abs() < 1e-3);
    }

    #[test]
    fn test_string_coercion_and_dropping() {
        let args = vec![Value::from("2"), Value::from("abc"), Value::Number(3.0)];
        assert_eq!(call("add", args).unwrap(), Value::Number(5.0));
        assert_eq!(call("add", vec![]).unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_modulo() {
        assert_eq!(call("modulo", nums(&[7.0, 3.0])).unwrap(), Value::Number(1.0));
        assert!(call("modulo", nums(&[7.0])).is_err());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(call("ceil", vec!["1.2".into()]).unwrap(), Value::Number(2.0));
        assert_eq!(call("floor", vec!["1.8".into()]).unwrap(), Value::Number(1.0));
        assert_eq!(call("round", nums(&[2.5])).unwrap(), Value::Number(2.0));
        assert_eq!(call("round", nums(&[3.5])).unwrap(), Value::Number(4.0));
        assert!(call("round", vec!["x".into()]).is_err());
        assert_eq!(
            call("toFixed", vec![Value::Number(3.14159), "2".into()]).unwrap(),
            Value::Number(3.14)
        );
    }

    #[test]
    fn test_equality_is_type_strict() {
        assert_eq!(
            call("eq", vec![Value::Number(5.0), Value::from("5")]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            call("eq", vec![Value::from("5"), Value::from("5")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("noteq", vec![Value::Number(5.0), Value::from("5")]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_chained_comparisons() {
        assert_eq!(call("lt", nums(&[1.0, 2.0, 3.0])).unwrap(), Value::Bool(true));
        assert_eq!(call("lt", nums(&[1.0, 3.0, 2.0])).unwrap(), Value::Bool(false));
        assert_eq!(call("gte", nums(&[3.0, 3.0, 1.0])).unwrap(), Value::Bool(true));
        assert_eq!(call("gt", vec!["10".into(), "9".into()]).unwrap(), Value::Bool(true));
        assert!(call("lte", nums(&[1.0])).is_err());
    }
}
