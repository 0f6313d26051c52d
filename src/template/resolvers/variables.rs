//! `var name value`: assigns into the innermost scope and renders nothing.

use super::{arg, str_arg, FunctionResolver, FunctionScope};
use crate::error::EvalError;
use crate::template::value::Value;

pub struct VariablesResolver;

impl FunctionResolver for VariablesResolver {
    fn try_resolve(
        &self,
        name: &str,
        args: &[Value],
        scope: &mut FunctionScope<'_>,
    ) -> Option<Result<Value, EvalError>> {
        if !name.eq_ignore_ascii_case("var") {
            return None;
        }
        Some(assign(args, scope))
    }
}

fn assign(args: &[Value], scope: &mut FunctionScope<'_>) -> Result<Value, EvalError> {
    let name = str_arg(args, 0, "var")?;
    if name.is_empty() {
        return Err(EvalError::args("var", "variable name can't be empty"));
    }
    let value = arg(args, 1, "var")?.clone();
    scope.variables.set(name, value);
    Ok(Value::from(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::context::TemplateContext;

    #[test]
    fn test_var_assigns_innermost_scope() {
        let mut variables = TemplateContext::new();
        variables.push_scope();
        let mut rng = rand::thread_rng();
        let mut scope = FunctionScope {
            variables: &mut variables,
            rng: &mut rng,
        };
        let result = VariablesResolver
            .try_resolve("var", &["greeting".into(), "hi".into()], &mut scope)
            .unwrap()
            .unwrap();
        assert_eq!(result, Value::from(""));
        assert_eq!(variables.get("greeting").unwrap(), &Value::from("hi"));
        variables.pop_scope();
        assert!(variables.get("greeting").is_err());
    }

    #[test]
    fn test_var_requires_value() {
        let mut variables = TemplateContext::new();
        let mut rng = rand::thread_rng();
        let mut scope = FunctionScope {
            variables: &mut variables,
            rng: &mut rng,
        };
        let result = VariablesResolver.try_resolve("var", &["x".into()], &mut scope);
        assert!(matches!(result, Some(Err(EvalError::InvalidArguments { .. }))));
        assert!(VariablesResolver.try_resolve("vars", &[], &mut scope).is_none());
    }
}
