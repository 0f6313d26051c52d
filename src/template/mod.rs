//! Template engine for response bodies.
//!
//! Bodies use a small `{{ }}` language: literals, `@variables`, function
//! calls with positional arguments, sub-expressions in parentheses, and
//! `#repeat` / `#each` / `#if` blocks.
//!
//! ```text
//! {{#repeat 2 ','}}
//!   { "id": {{ add @index 1 }}, "name": "{{ faker 'name.firstname' }}" }
//! {{/repeat}}
//! ```

pub mod context;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod resolvers;
pub mod value;

use crate::error::{EvalError, TemplateError};
use parser::Node;
use rand::RngCore;
use resolvers::FunctionResolver;
use tracing::warn;

const EXPR_OPEN: &str = "{{";

/// A compiled response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// Rendered as-is. Used for bodies without expressions and as the
    /// lenient fallback for bodies that fail to compile.
    Static(String),
    Compiled(Vec<Node>),
}

/// Compile `source`.
///
/// Sources without `{{` skip the lexer entirely. When compilation fails
/// and `strict` is off, the whole source becomes static text.
pub fn compile_template(source: &str, strict: bool) -> Result<Template, TemplateError> {
    if !source.contains(EXPR_OPEN) {
        return Ok(Template::Static(source.to_string()));
    }

    match compile_nodes(source) {
        Ok(nodes) => Ok(Template::Compiled(nodes)),
        Err(err) if strict => Err(err),
        Err(err) => {
            warn!(error = %err, "template failed to compile, serving it as static text");
            Ok(Template::Static(source.to_string()))
        }
    }
}

fn compile_nodes(source: &str) -> Result<Vec<Node>, TemplateError> {
    let tokens = lexer::tokenize(source)?;
    Ok(parser::parse(&tokens)?)
}

impl Template {
    pub fn is_static(&self) -> bool {
        matches!(self, Template::Static(_))
    }

    /// Render with the thread-local RNG.
    pub fn render(&self, extra: &[&dyn FunctionResolver]) -> Result<String, EvalError> {
        self.render_with_rng(extra, &mut rand::thread_rng())
    }

    /// Render with an injected randomness source.
    pub fn render_with_rng(
        &self,
        extra: &[&dyn FunctionResolver],
        rng: &mut dyn RngCore,
    ) -> Result<String, EvalError> {
        match self {
            Template::Static(text) => Ok(text.clone()),
            Template::Compiled(nodes) => eval::evaluate(nodes, extra, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use resolvers::{RequestParamsResolver, RequestView};

    fn render(source: &str) -> String {
        compile_template(source, true).unwrap().render(&[]).unwrap()
    }

    #[test]
    fn test_static_round_trip() {
        for source in ["", "plain", "{ \"json\": true }", "single { brace }", "}} stray", "ünïcödé"] {
            let template = compile_template(source, true).unwrap();
            assert!(template.is_static());
            assert_eq!(template.render(&[]).unwrap(), source);
        }
    }

    #[test]
    fn test_full_render() {
        assert_eq!(
            render("{{ var 'name' 'world' }}Hello {{ uppercase @name }}"),
            "Hello WORLD"
        );
    }

    #[test]
    fn test_repeat_with_separator() {
        assert_eq!(render("{{#repeat 3 ', '}}x{{/repeat}}"), "x, x, x");
    }

    #[test]
    fn test_math_and_arrays() {
        assert_eq!(render("{{ add 1 2 3 }}"), "6");
        assert_eq!(render("{{ join (slice (array 'a' 'b' 'c' 'd') 1 3) ',' }}"), "b,c");
        assert_eq!(render("{{ join (sort (array 'c' 'a' 'b') 'desc') }}"), "c b a");
        assert_eq!(render("{{ eq 5 '5' }}"), "true");
    }

    #[test]
    fn test_strict_compile_errors_propagate() {
        assert!(matches!(
            compile_template("{{ 'x'", true),
            Err(TemplateError::Lex(_))
        ));
        assert!(matches!(
            compile_template("{{ 'a' 'b' }}", true),
            Err(TemplateError::Parse(ParseError::TooManyNodes))
        ));
    }

    #[test]
    fn test_render_errors_surface() {
        let template = compile_template("{{ @missing }}", true).unwrap();
        assert_eq!(
            template.render(&[]),
            Err(EvalError::UndefinedVariable("missing".to_string()))
        );
    }

    #[test]
    fn test_lenient_compile_falls_back_to_static() {
        let template = compile_template("{{ 'a' 'b' }}", false).unwrap();
        assert_eq!(template, Template::Static("{{ 'a' 'b' }}".to_string()));
    }

    #[test]
    fn test_seeded_render_is_reproducible() {
        let template = compile_template("{{ oneOf (array 'a' 'b' 'c' 'd' 'e') }}{{ guid }}", true).unwrap();
        let first = template
            .render_with_rng(&[], &mut StdRng::seed_from_u64(11))
            .unwrap();
        let second = template
            .render_with_rng(&[], &mut StdRng::seed_from_u64(11))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_request_resolver_plugs_in() {
        let request = RequestView::new("POST", "/orders").with_query_string("id=7");
        let resolver = RequestParamsResolver::new(&request);
        let template = compile_template("{{ method }} {{ queryParam 'id' }}", true).unwrap();
        assert_eq!(template.render(&[&resolver]).unwrap(), "POST 7");
    }
}
