//! String helpers: `lowercase`, `uppercase`, `includes`, `substr`, `split`, `padStart`.

use super::{int_arg, opt_str, str_arg, FunctionResolver, FunctionScope};
use crate::error::EvalError;
use crate::template::value::Value;

pub struct StringsResolver;

impl FunctionResolver for StringsResolver {
    fn try_resolve(
        &self,
        name: &str,
        args: &[Value],
        _scope: &mut FunctionScope<'_>,
    ) -> Option<Result<Value, EvalError>> {
        let result = match name.to_ascii_lowercase().as_str() {
            "lowercase" => str_arg(args, 0, "lowercase").map(|s| Value::from(s.to_lowercase())),
            "uppercase" => str_arg(args, 0, "uppercase").map(|s| Value::from(s.to_uppercase())),
            "includes" => includes(args),
            "substr" => substr(args),
            "split" => split(args),
            "padstart" => pad_start(args),
            _ => return None,
        };
        Some(result)
    }
}

fn includes(args: &[Value]) -> Result<Value, EvalError> {
    let haystack = str_arg(args, 0, "includes")?;
    let needle = str_arg(args, 1, "includes")?;
    Ok(Value::from(haystack.contains(needle).to_string()))
}

fn substr(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, 0, "substr")?;
    let start = int_arg(args, 1, "substr")?;

    let char_count = s.chars().count() as i64;
    let start = start.clamp(0, char_count);
    let length = match args.get(2) {
        Some(value) => value
            .as_integer()
            .ok_or_else(|| EvalError::args("substr", "length must be an integer"))?,
        None => char_count - start,
    };
    let length = length.clamp(0, char_count - start);

    Ok(Value::from(
        s.chars()
            .skip(start as usize)
            .take(length as usize)
            .collect::<String>(),
    ))
}

fn split(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, 0, "split")?;
    let separator = opt_str(args, 1, " ");
    if separator.is_empty() {
        return Ok(Value::Array(vec![Value::from(s)]));
    }
    Ok(Value::Array(s.split(separator).map(Value::from).collect()))
}

/// Upper bound on the length `padStart` pads to.
const MAX_PAD_LENGTH: i64 = 1 << 20;

fn pad_start(args: &[Value]) -> Result<Value, EvalError> {
    let s = str_arg(args, 0, "padStart")?;
    let total = int_arg(args, 1, "padStart")?;
    if total > MAX_PAD_LENGTH {
        return Err(EvalError::args(
            "padStart",
            format!("length {total} exceeds the limit of {MAX_PAD_LENGTH}"),
        ));
    }
    let pad = opt_str(args, 2, "0").chars().next().unwrap_or('0');

    let missing = (total.max(0) as usize).saturating_sub(s.chars().count());
    let mut padded: String = std::iter::repeat(pad).take(missing).collect();
    padded.push_str(s);
    Ok(Value::from(padded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::context::TemplateContext;

    fn call(name: &str, args: &[&str]) -> Result<Value, EvalError> {
        let args: Vec<Value> = args.iter().map(|a| Value::from(*a)).collect();
        let mut variables = TemplateContext::new();
        let mut rng = rand::thread_rng();
        let mut scope = FunctionScope {
            variables: &mut variables,
            rng: &mut rng,
        };
        StringsResolver
            .try_resolve(name, &args, &mut scope)
            .expect("function should be recognized")
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(call("uppercase", &["hello"]).unwrap(), Value::from("HELLO"));
        assert_eq!(call("lowercase", &["HeLLo"]).unwrap(), Value::from("hello"));
        assert_eq!(call("UPPERCASE", &["x"]).unwrap(), Value::from("X"));
        assert!(call("uppercase", &[]).is_err());
    }

    #[test]
    fn test_includes() {
        assert_eq!(call("includes", &["hello", "ell"]).unwrap(), Value::from("true"));
        assert_eq!(call("includes", &["hello", "xyz"]).unwrap(), Value::from("false"));
        assert!(call("includes", &["hello"]).is_err());
    }

    #[test]
    fn test_substr() {
        assert_eq!(call("substr", &["hello world", "6"]).unwrap(), Value::from("world"));
        assert_eq!(call("substr", &["hello", "1", "3"]).unwrap(), Value::from("ell"));
        assert_eq!(call("substr", &["hello", "3", "100"]).unwrap(), Value::from("lo"));
        assert_eq!(call("substr", &["hello", "10"]).unwrap(), Value::from(""));
        assert!(call("substr", &["hello", "x"]).is_err());
    }

    #[test]
    fn test_split() {
        assert_eq!(
            call("split", &["a b c"]).unwrap(),
            Value::Array(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(
            call("split", &["a,b", ","]).unwrap(),
            Value::Array(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_pad_start() {
        assert_eq!(call("padStart", &["7", "3"]).unwrap(), Value::from("007"));
        assert_eq!(call("padstart", &["7", "3", "*"]).unwrap(), Value::from("**7"));
        assert_eq!(call("padStart", &["1234", "2"]).unwrap(), Value::from("1234"));
        assert!(matches!(
            call("padStart", &["x", "100000000000"]),
            Err(EvalError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_unknown_function_is_not_resolved() {
        let mut variables = TemplateContext::new();
        let mut rng = rand::thread_rng();
        let mut scope = FunctionScope {
            variables: &mut variables,
            rng: &mut rng,
        };
        assert!(StringsResolver.try_resolve("add", &[], &mut scope).is_none());
    }
}
