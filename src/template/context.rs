//! Lexical scope stack for template variables.

use super::value::Value;
use crate::error::EvalError;
use std::collections::HashMap;

/// Stack of variable scopes. The root scope is never popped.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    scopes: Vec<HashMap<String, Value>>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// No-op when only the root scope remains.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Look a variable up from the innermost scope outwards.
    pub fn get(&self, name: &str) -> Result<&Value, EvalError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    /// Always writes to the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_and_release() {
        let mut ctx = TemplateContext::new();
        ctx.set("a", Value::from("outer"));
        ctx.push_scope();
        ctx.set("a", Value::from("inner"));
        assert_eq!(ctx.get("a").unwrap(), &Value::from("inner"));
        ctx.pop_scope();
        assert_eq!(ctx.get("a").unwrap(), &Value::from("outer"));
    }

    #[test]
    fn test_missing_variable() {
        let ctx = TemplateContext::new();
        assert_eq!(
            ctx.get("nope"),
            Err(EvalError::UndefinedVariable("nope".to_string()))
        );
    }

    #[test]
    fn test_root_scope_is_never_popped() {
        let mut ctx = TemplateContext::new();
        ctx.set("root", Value::Bool(true));
        ctx.pop_scope();
        ctx.pop_scope();
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.get("root").is_ok());
    }

    #[test]
    fn test_outer_visible_from_inner() {
        let mut ctx = TemplateContext::new();
        ctx.set("x", Value::Number(1.0));
        ctx.push_scope();
        ctx.push_scope();
        assert_eq!(ctx.get("x").unwrap(), &Value::Number(1.0));
    }
}
