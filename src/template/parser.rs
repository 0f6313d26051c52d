//! Recursive-descent parser turning tokens into a [`Node`] tree.

use super::lexer::{Token, TokenKind};
use crate::error::ParseError;

/// Block terminator accepted for any block, in addition to `/<name>`.
const GENERIC_BLOCK_END: &str = "end";

static EOF: Token = Token {
    kind: TokenKind::Eof,
    text: String::new(),
};

/// A parsed template node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Raw text outside of any expression.
    Text(String),
    /// A quoted string or bare number, kept as raw text.
    Literal(String),
    /// `@name` reference into the template context.
    Variable(String),
    /// A function call with positional parameters.
    Function { name: String, params: Vec<Node> },
    /// A structural construct (`repeat`, `each`, `if`) with a body.
    Block {
        name: String,
        params: Vec<Node>,
        body: Vec<Node>,
    },
}

/// Parse a token stream produced by [`super::lexer::tokenize`].
pub fn parse(tokens: &[Token]) -> Result<Vec<Node>, ParseError> {
    Parser::new(tokens).program()
}

struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, current: 0 }
    }

    fn program(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        while !self.is_at_end() {
            if let Some(node) = self.top_level_node()? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// `TEXT | expression`
    fn top_level_node(&mut self) -> Result<Option<Node>, ParseError> {
        match self.peek_kind() {
            TokenKind::Text => Ok(Some(Node::Text(self.advance().text.clone()))),
            TokenKind::ExprStart => {
                self.advance();
                self.expression()
            }
            _ => Err(self.unexpected("text or '{{'")),
        }
    }

    /// Everything after `{{` up to and including `}}`.
    fn expression(&mut self) -> Result<Option<Node>, ParseError> {
        match self.peek_kind() {
            TokenKind::BlockStart => self.block(),
            TokenKind::BlockEnd => Err(ParseError::UnexpectedBlockEnd(self.peek().text.clone())),
            _ => {
                let node = self.node_list(TokenKind::ExprEnd)?;
                self.consume(TokenKind::ExprEnd)?;
                Ok(node)
            }
        }
    }

    /// Nodes up to (not including) `end`, reduced to at most one node.
    fn node_list(&mut self, end: TokenKind) -> Result<Option<Node>, ParseError> {
        let mut nodes = Vec::new();
        while self.peek_kind() != end && !self.is_at_end() {
            if let Some(node) = self.node(end)? {
                nodes.push(node);
            }
        }
        if nodes.len() > 1 {
            return Err(ParseError::TooManyNodes);
        }
        Ok(nodes.pop())
    }

    /// `STRING | NUMBER | VAR_IDENTIFIER | subExpr | function`
    fn node(&mut self, end: TokenKind) -> Result<Option<Node>, ParseError> {
        match self.peek_kind() {
            TokenKind::String | TokenKind::Number => {
                Ok(Some(Node::Literal(self.advance().text.clone())))
            }
            TokenKind::VarIdentifier => Ok(Some(Node::Variable(self.advance().text.clone()))),
            TokenKind::SubExprStart => {
                self.advance();
                if self.peek_kind() == TokenKind::BlockStart {
                    return Err(ParseError::BlockInSubExpression(self.peek().text.clone()));
                }
                let node = self.node_list(TokenKind::SubExprEnd)?;
                self.consume(TokenKind::SubExprEnd)?;
                Ok(node)
            }
            TokenKind::FunctionName => {
                let name = self.advance().text.clone();
                let mut params = Vec::new();
                while !matches!(self.peek_kind(), TokenKind::Eof)
                    && self.peek_kind() != end
                    && self.peek_kind() != TokenKind::ExprEnd
                {
                    if let Some(param) = self.node(end)? {
                        params.push(param);
                    }
                }
                Ok(Some(Node::Function { name, params }))
            }
            TokenKind::BlockEnd => Err(ParseError::UnexpectedBlockEnd(self.peek().text.clone())),
            _ => Err(self.unexpected("a literal, variable, function or '('")),
        }
    }

    /// `BLOCK_START node* EXPR_END blockContent EXPR_START BLOCK_END EXPR_END`
    fn block(&mut self) -> Result<Option<Node>, ParseError> {
        let name = self.advance().text.clone();

        let mut params = Vec::new();
        while self.peek_kind() != TokenKind::ExprEnd && !self.is_at_end() {
            if let Some(param) = self.node(TokenKind::ExprEnd)? {
                params.push(param);
            }
        }
        self.consume(TokenKind::ExprEnd)?;

        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return Err(ParseError::UnclosedBlock(name)),
                TokenKind::Text => body.push(Node::Text(self.advance().text.clone())),
                TokenKind::ExprStart => {
                    self.advance();
                    if self.peek_kind() == TokenKind::BlockEnd {
                        let found = self.advance().text.clone();
                        if found != name && found != GENERIC_BLOCK_END {
                            return Err(ParseError::MismatchedBlockEnd {
                                expected: name,
                                found,
                            });
                        }
                        self.consume(TokenKind::ExprEnd)?;
                        break;
                    }
                    if let Some(node) = self.expression()? {
                        body.push(node);
                    }
                }
                _ => return Err(self.unexpected("text or '{{'")),
            }
        }

        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(Node::Block { name, params, body }))
    }

    fn consume(&mut self, kind: TokenKind) -> Result<&'a Token, ParseError> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("{kind:?}")))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: format!("{:?}", self.peek_kind()),
        }
    }

    fn peek(&self) -> &'a Token {
        self.token_at(self.current)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn advance(&mut self) -> &'a Token {
        let index = self.current;
        if !self.is_at_end() {
            self.current += 1;
        }
        self.token_at(index)
    }

    // The lexer guarantees a trailing Eof, but a hand-built slice may lack it.
    fn token_at(&self, index: usize) -> &'a Token {
        self.tokens.get(index).unwrap_or(&EOF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lexer::tokenize;

    fn parse_str(source: &str) -> Result<Vec<Node>, ParseError> {
        parse(&tokenize(source).unwrap())
    }

    fn lit(s: &str) -> Node {
        Node::Literal(s.to_string())
    }

    #[test]
    fn test_empty_expression_is_elided() {
        assert!(parse_str("{{ }}").unwrap().is_empty());
        assert!(parse_str("{{ () }}").unwrap().is_empty());
    }

    #[test]
    fn test_single_literal_and_variable() {
        assert_eq!(parse_str("{{ 'hello' }}").unwrap(), vec![lit("hello")]);
        assert_eq!(
            parse_str("{{ @variable }}").unwrap(),
            vec![Node::Variable("variable".to_string())]
        );
    }

    #[test]
    fn test_multiple_expressions() {
        let nodes = parse_str("{{ 'Hello' }} {{ @user }}").unwrap();
        assert_eq!(
            nodes,
            vec![
                lit("Hello"),
                Node::Text(" ".to_string()),
                Node::Variable("user".to_string())
            ]
        );
    }

    #[test]
    fn test_function_with_parameter() {
        assert_eq!(
            parse_str("{{ uppercase 'hello' }}").unwrap(),
            vec![Node::Function {
                name: "uppercase".to_string(),
                params: vec![lit("hello")],
            }]
        );
    }

    #[test]
    fn test_function_with_subexpression() {
        let nodes = parse_str("{{ uppercase (concat 'hello' 'world') 'x' }}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::Function {
                name: "uppercase".to_string(),
                params: vec![
                    Node::Function {
                        name: "concat".to_string(),
                        params: vec![lit("hello"), lit("world")],
                    },
                    lit("x"),
                ],
            }]
        );
    }

    #[test]
    fn test_nested_function_without_parens_is_greedy() {
        let nodes = parse_str("{{ join split 'a b' ',' }}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::Function {
                name: "join".to_string(),
                params: vec![Node::Function {
                    name: "split".to_string(),
                    params: vec![lit("a b"), lit(",")],
                }],
            }]
        );
    }

    #[test]
    fn test_block_with_text() {
        let nodes = parse_str("{{ #repeat 3 }} Hello {{ /repeat }}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::Block {
                name: "repeat".to_string(),
                params: vec![lit("3")],
                body: vec![Node::Text(" Hello ".to_string())],
            }]
        );
    }

    #[test]
    fn test_block_with_inner_expression_and_generic_end() {
        let nodes = parse_str("{{ #repeat 3 }}{{ concat 'a' 'b' }}{{ /end }}").unwrap();
        match &nodes[0] {
            Node::Block { body, .. } => assert!(matches!(
                &body[0],
                Node::Function { name, .. } if name == "concat"
            )),
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_blocks() {
        let nodes =
            parse_str("{{#each @items}}[{{#if @this}}y{{else}}n{{/if}}]{{/each}}").unwrap();
        let Node::Block { name, body, .. } = &nodes[0] else {
            panic!("expected block");
        };
        assert_eq!(name, "each");
        assert_eq!(body.len(), 3);
        let Node::Block { name, body, .. } = &body[1] else {
            panic!("expected nested block");
        };
        assert_eq!(name, "if");
        assert_eq!(
            body,
            &vec![
                Node::Text("y".to_string()),
                Node::Function {
                    name: "else".to_string(),
                    params: vec![]
                },
                Node::Text("n".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_block_is_elided() {
        assert!(parse_str("{{#repeat 2}}{{/repeat}}").unwrap().is_empty());
    }

    #[test]
    fn test_two_top_level_nodes_fail() {
        assert_eq!(parse_str("{{ 'a' @b }}"), Err(ParseError::TooManyNodes));
        assert_eq!(parse_str("{{ @user 'extra' }}"), Err(ParseError::TooManyNodes));
    }

    #[test]
    fn test_block_in_subexpression_fails() {
        assert!(matches!(
            parse_str("{{ ( #repeat 3 'text' ) }}"),
            Err(ParseError::BlockInSubExpression(_))
        ));
    }

    #[test]
    fn test_block_end_errors() {
        assert!(matches!(
            parse_str("{{#repeat 2}}x{{/each}}"),
            Err(ParseError::MismatchedBlockEnd { .. })
        ));
        assert!(matches!(
            parse_str("{{#repeat 2}}x"),
            Err(ParseError::UnclosedBlock(_))
        ));
        assert!(matches!(
            parse_str("x{{/repeat}}"),
            Err(ParseError::UnexpectedBlockEnd(_))
        ));
    }
}
