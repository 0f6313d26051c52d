//! Tree-walking evaluator.
//!
//! Renders a node list to a string against a fresh [`TemplateContext`].
//! Any error aborts the whole render; there is no partial output.

use super::context::TemplateContext;
use super::parser::Node;
use super::resolvers::{FunctionResolver, FunctionScope, VariablesResolver, BUILTIN_RESOLVERS};
use super::value::Value;
use crate::error::EvalError;
use rand::{Rng, RngCore};

const ELSE: &str = "else";
const ELSIF: &str = "elsif";

/// Upper bound on `#repeat` iterations.
const MAX_REPEAT_COUNT: i64 = 10_000;

/// Render `nodes` with the built-in resolvers, then `extra`, then `var`.
pub fn evaluate(
    nodes: &[Node],
    extra: &[&dyn FunctionResolver],
    rng: &mut dyn RngCore,
) -> Result<String, EvalError> {
    let mut evaluator = Evaluator {
        context: TemplateContext::new(),
        extra,
        rng,
    };
    evaluator.render(nodes)
}

struct Evaluator<'e> {
    context: TemplateContext,
    extra: &'e [&'e dyn FunctionResolver],
    rng: &'e mut dyn RngCore,
}

impl Evaluator<'_> {
    fn render(&mut self, nodes: &[Node]) -> Result<String, EvalError> {
        let mut out = String::new();
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                other => out.push_str(&self.value(other)?.to_string()),
            }
        }
        Ok(out)
    }

    /// Render `nodes` inside a scope of their own.
    fn render_scoped(&mut self, nodes: &[Node]) -> Result<String, EvalError> {
        self.context.push_scope();
        let result = self.render(nodes);
        self.context.pop_scope();
        result
    }

    fn value(&mut self, node: &Node) -> Result<Value, EvalError> {
        match node {
            Node::Text(text) | Node::Literal(text) => Ok(Value::from(text.as_str())),
            Node::Variable(name) => self.context.get(name).cloned(),
            Node::Function { name, params } => {
                let args = self.values(params)?;
                self.call(name, &args)
            }
            Node::Block { name, params, body } => self.block(name, params, body).map(Value::from),
        }
    }

    fn values(&mut self, nodes: &[Node]) -> Result<Vec<Value>, EvalError> {
        nodes.iter().map(|node| self.value(node)).collect()
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let extra = self.extra;
        let mut scope = FunctionScope {
            variables: &mut self.context,
            rng: &mut *self.rng,
        };

        let chain = BUILTIN_RESOLVERS
            .iter()
            .copied()
            .chain(extra.iter().copied())
            .chain(std::iter::once(&VariablesResolver as &dyn FunctionResolver));

        for resolver in chain {
            if let Some(result) = resolver.try_resolve(name, args, &mut scope) {
                return result;
            }
        }
        Err(EvalError::UndefinedFunction(name.to_string()))
    }

    fn block(&mut self, name: &str, params: &[Node], body: &[Node]) -> Result<String, EvalError> {
        match name {
            "repeat" => self.repeat(params, body),
            "each" => self.each(params, body),
            "if" => self.if_block(params, body),
            _ => Err(EvalError::UnknownBlock(name.to_string())),
        }
    }

    fn repeat(&mut self, params: &[Node], body: &[Node]) -> Result<String, EvalError> {
        let values = self.values(params)?;
        let first = values
            .first()
            .ok_or_else(|| EvalError::block("repeat", "a count is required"))?;
        let min = first
            .as_integer()
            .ok_or_else(|| EvalError::block("repeat", format!("count '{first}' is not an integer")))?;

        let (count, separator) = match values.get(1) {
            Some(second) => match second.as_integer() {
                Some(max) => {
                    if max < min {
                        return Err(EvalError::block(
                            "repeat",
                            format!("max count {max} is lower than min count {min}"),
                        ));
                    }
                    check_repeat_count(max)?;
                    let count = self.rng.gen_range(min..=max);
                    (count, values.get(2).map(Value::to_string))
                }
                None => (check_repeat_count(min)?, Some(second.to_string())),
            },
            None => (check_repeat_count(min)?, None),
        };

        self.context.push_scope();
        let result = self.repeat_body(count, separator.as_deref(), body);
        self.context.pop_scope();
        result
    }

    fn repeat_body(
        &mut self,
        count: i64,
        separator: Option<&str>,
        body: &[Node],
    ) -> Result<String, EvalError> {
        let mut out = String::new();
        for i in 0..count.max(0) {
            if i > 0 {
                if let Some(separator) = separator {
                    insert_separator(&mut out, separator);
                }
            }
            self.context.set("index", Value::from(i.to_string()));
            out.push_str(&self.render_scoped(body)?);
        }
        Ok(out)
    }

    fn each(&mut self, params: &[Node], body: &[Node]) -> Result<String, EvalError> {
        let source = params
            .first()
            .ok_or_else(|| EvalError::block("each", "an array is required"))?;
        let items = match self.value(source)? {
            Value::Array(items) => items,
            other => {
                return Err(EvalError::block(
                    "each",
                    format!("expected an array, got {}", other.type_name()),
                ))
            }
        };

        self.context.push_scope();
        let result = self.each_body(items, body);
        self.context.pop_scope();
        result
    }

    fn each_body(&mut self, items: Vec<Value>, body: &[Node]) -> Result<String, EvalError> {
        let mut out = String::new();
        for (i, item) in items.into_iter().enumerate() {
            self.context.set("this", item);
            self.context.set("index", Value::from(i.to_string()));
            out.push_str(&self.render_scoped(body)?);
        }
        Ok(out)
    }

    fn if_block(&mut self, params: &[Node], body: &[Node]) -> Result<String, EvalError> {
        let condition = params
            .first()
            .ok_or_else(|| EvalError::block("if", "a condition is required"))?;

        for clause in split_clauses(condition, body)? {
            let taken = match clause.condition {
                Some(condition) => self.value(condition)?.is_truthy(),
                None => true,
            };
            if taken {
                return self.render_scoped(clause.body);
            }
        }
        Ok(String::new())
    }
}

struct Clause<'n> {
    /// `None` for the trailing `else`.
    condition: Option<&'n Node>,
    body: &'n [Node],
}

/// Split an `if` body on its top-level `else` / `elsif` markers.
fn split_clauses<'n>(condition: &'n Node, body: &'n [Node]) -> Result<Vec<Clause<'n>>, EvalError> {
    let mut clauses = Vec::new();
    let mut current = Some(condition);
    let mut start = 0;
    let mut seen_else = false;

    for (i, node) in body.iter().enumerate() {
        let Node::Function { name, params } = node else {
            continue;
        };
        let next = match name.as_str() {
            ELSE if params.is_empty() => {
                if seen_else {
                    return Err(EvalError::block("if", "only one 'else' is allowed"));
                }
                seen_else = true;
                None
            }
            ELSIF => {
                if seen_else {
                    return Err(EvalError::block("if", "'elsif' can't follow 'else'"));
                }
                match params.first() {
                    Some(condition) => Some(condition),
                    None => return Err(EvalError::block("if", "'elsif' needs a condition")),
                }
            }
            _ => continue,
        };

        clauses.push(Clause {
            condition: current,
            body: &body[start..i],
        });
        current = next;
        start = i + 1;
    }

    clauses.push(Clause {
        condition: current,
        body: &body[start..],
    });
    Ok(clauses)
}

fn check_repeat_count(count: i64) -> Result<i64, EvalError> {
    if count > MAX_REPEAT_COUNT {
        return Err(EvalError::block(
            "repeat",
            format!("count {count} exceeds the limit of {MAX_REPEAT_COUNT}"),
        ));
    }
    Ok(count)
}

/// Put `separator` right after the content, keeping one line break if the
/// trimmed trailing whitespace had any.
fn insert_separator(out: &mut String, separator: &str) {
    let content_len = out.trim_end().len();
    let had_newline = out[content_len..].contains(|c| c == '\n' || c == '\r');
    out.truncate(content_len);
    out.push_str(separator);
    if had_newline {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lexer::tokenize;
    use crate::template::parser::parse;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn render(source: &str) -> Result<String, EvalError> {
        render_with(source, &[])
    }

    fn render_with(source: &str, extra: &[&dyn FunctionResolver]) -> Result<String, EvalError> {
        let nodes = parse(&tokenize(source).unwrap()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        evaluate(&nodes, extra, &mut rng)
    }

    #[test]
    fn test_text_and_functions() {
        assert_eq!(render("Hello {{ uppercase 'world' }}").unwrap(), "Hello WORLD");
        assert_eq!(render("{{ add 1 2 3 }}").unwrap(), "6");
        assert_eq!(render("{{ join (split 'a b c') '-' }}").unwrap(), "a-b-c");
    }

    #[test]
    fn test_var_and_lookup() {
        assert_eq!(render("{{ var 'name' 'Ann' }}Hi {{ @name }}").unwrap(), "Hi Ann");
        assert_eq!(
            render("{{ @missing }}"),
            Err(EvalError::UndefinedVariable("missing".to_string()))
        );
    }

    #[test]
    fn test_undefined_function() {
        assert_eq!(
            render("{{ nope 1 }}"),
            Err(EvalError::UndefinedFunction("nope".to_string()))
        );
    }

    #[test]
    fn test_repeat_with_index() {
        assert_eq!(render("{{#repeat 3}}{{@index}}{{/repeat}}").unwrap(), "012");
        assert_eq!(render("{{#repeat 0}}x{{/repeat}}").unwrap(), "");
        assert_eq!(render("{{#repeat '-2'}}x{{/repeat}}").unwrap(), "");
    }

    #[test]
    fn test_repeat_separator() {
        assert_eq!(render("{{#repeat 3 ', '}}x{{/repeat}}").unwrap(), "x, x, x");
        assert_eq!(
            render("{{#repeat 2 ','}}\n  {\"id\": {{@index}}}\n{{/repeat}}").unwrap(),
            "\n  {\"id\": 0},\n\n  {\"id\": 1}\n"
        );
    }

    #[test]
    fn test_repeat_random_range() {
        for _ in 0..10 {
            let out = render("{{#repeat 2 4}}x{{/repeat}}").unwrap();
            assert!((2..=4).contains(&out.len()));
        }
        let out = render("{{#repeat 2 2 '|'}}x{{/repeat}}").unwrap();
        assert_eq!(out, "x|x");
    }

    #[test]
    fn test_repeat_errors() {
        assert!(matches!(
            render("{{#repeat 100000000000}}x{{/repeat}}"),
            Err(EvalError::InvalidBlock { .. })
        ));
        assert!(matches!(
            render("{{#repeat 1 100000000000}}x{{/repeat}}"),
            Err(EvalError::InvalidBlock { .. })
        ));
        assert!(matches!(
            render("{{#repeat 'many'}}x{{/repeat}}"),
            Err(EvalError::InvalidBlock { .. })
        ));
        assert!(matches!(
            render("{{#repeat 5 2}}x{{/repeat}}"),
            Err(EvalError::InvalidBlock { .. })
        ));
        assert!(matches!(
            render("{{#repeat}}x{{/repeat}}"),
            Err(EvalError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_loop_variables_do_not_leak() {
        let out = render(
            "{{#repeat 2}}{{#if (eq @index '1')}}{{@seen}}{{/if}}{{var 'seen' 'y'}}{{/repeat}}",
        );
        assert_eq!(out, Err(EvalError::UndefinedVariable("seen".to_string())));
        assert_eq!(
            render("{{#repeat 1}}x{{/repeat}}{{@index}}"),
            Err(EvalError::UndefinedVariable("index".to_string()))
        );
    }

    #[test]
    fn test_each() {
        assert_eq!(
            render("{{#each (array 'a' 'b')}}{{@index}}={{@this}};{{/each}}").unwrap(),
            "0=a;1=b;"
        );
        assert!(matches!(
            render("{{#each 'abc'}}x{{/each}}"),
            Err(EvalError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_if_clauses() {
        let source = "{{#if (eq @v '1')}}one{{elsif (eq @v '2')}}two{{else}}other{{/if}}";
        for (v, expected) in [("1", "one"), ("2", "two"), ("3", "other")] {
            let full = format!("{{{{ var 'v' '{v}' }}}}{source}");
            assert_eq!(render(&full).unwrap(), expected);
        }
        assert_eq!(render("{{#if ''}}yes{{/if}}").unwrap(), "");
        assert_eq!(render("{{#if (add 1 1)}}yes{{else}}no{{/if}}").unwrap(), "no");
        assert_eq!(render("{{#if '0'}}yes{{/if}}").unwrap(), "yes");
        assert_eq!(render("{{#if 'x'}}yes{{/if}}").unwrap(), "yes");
    }

    #[test]
    fn test_if_errors() {
        assert!(matches!(
            render("{{#if 'x'}}a{{else}}b{{else}}c{{/if}}"),
            Err(EvalError::InvalidBlock { .. })
        ));
        assert!(matches!(
            render("{{#if 'x'}}a{{elsif}}b{{/if}}"),
            Err(EvalError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_unknown_block() {
        assert_eq!(
            render("{{#loop 2}}x{{/loop}}"),
            Err(EvalError::UnknownBlock("loop".to_string()))
        );
    }

    #[test]
    fn test_extra_resolvers_come_before_var() {
        struct Fixed;
        impl FunctionResolver for Fixed {
            fn try_resolve(
                &self,
                name: &str,
                _args: &[Value],
                _scope: &mut FunctionScope<'_>,
            ) -> Option<Result<Value, EvalError>> {
                (name == "var" || name == "answer").then(|| Ok(Value::Number(42.0)))
            }
        }
        assert_eq!(render_with("{{ answer }}", &[&Fixed]).unwrap(), "42");
        assert_eq!(render_with("{{ var 'x' 1 }}", &[&Fixed]).unwrap(), "42");
        // built-ins still win
        assert_eq!(render_with("{{ uppercase 'a' }}", &[&Fixed]).unwrap(), "A");
    }

    #[test]
    fn test_insert_separator() {
        let mut out = "a \n\n".to_string();
        insert_separator(&mut out, ",");
        assert_eq!(out, "a,\n");

        let mut out = "a  ".to_string();
        insert_separator(&mut out, ";");
        assert_eq!(out, "a;");
    }
}
