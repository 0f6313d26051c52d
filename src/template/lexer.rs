//! Template tokenizer.
//!
//! Everything outside `{{ ... }}` becomes [`TokenKind::Text`]. Inside an
//! expression the lexer recognizes string literals, numbers, `@variables`,
//! `#block` starts, `/block` ends, function names and parentheses.

use crate::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    ExprStart,
    ExprEnd,
    SubExprStart,
    SubExprEnd,
    BlockStart,
    BlockEnd,
    FunctionName,
    String,
    Number,
    VarIdentifier,
    Eof,
}

/// A single lexed token. `text` holds the payload without sigils or quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Tokenize a template source. The result always ends with exactly one `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut text_start = 0;

        while self.pos < self.source.len() {
            if self.rest().starts_with("{{") {
                self.flush_text(text_start);
                let expr_start = self.pos;
                self.pos += 2;
                self.tokens.push(Token::new(TokenKind::ExprStart, "{{"));
                self.expression(expr_start)?;
                text_start = self.pos;
            } else {
                self.bump();
            }
        }

        self.flush_text(text_start);
        self.tokens.push(Token::new(TokenKind::Eof, ""));
        Ok(self.tokens)
    }

    /// Scan until the matching `}}`, which is consumed.
    fn expression(&mut self, expr_start: usize) -> Result<(), LexError> {
        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek() else {
                return Err(LexError::UnterminatedExpression(expr_start));
            };

            if self.rest().starts_with("}}") {
                self.pos += 2;
                self.tokens.push(Token::new(TokenKind::ExprEnd, "}}"));
                return Ok(());
            }

            let token = match ch {
                '(' => {
                    self.bump();
                    Token::new(TokenKind::SubExprStart, "(")
                }
                ')' => {
                    self.bump();
                    Token::new(TokenKind::SubExprEnd, ")")
                }
                '\'' => self.string_literal(expr_start)?,
                c if c.is_ascii_digit() => self.number()?,
                '@' => self.sigil_name(TokenKind::VarIdentifier)?,
                '#' => self.sigil_name(TokenKind::BlockStart)?,
                '/' => self.sigil_name(TokenKind::BlockEnd)?,
                c if is_ident_char(c) => {
                    let start = self.pos;
                    self.eat_while(is_ident_char);
                    Token::new(TokenKind::FunctionName, &self.source[start..self.pos])
                }
                c => {
                    return Err(LexError::UnexpectedCharacter {
                        ch: c,
                        offset: self.pos,
                    })
                }
            };
            self.tokens.push(token);
        }
    }

    fn string_literal(&mut self, expr_start: usize) -> Result<Token, LexError> {
        let open = self.pos;
        self.bump();
        let start = self.pos;
        match self.rest().find('\'') {
            Some(len) => {
                self.pos = start + len + 1;
                Ok(Token::new(TokenKind::String, &self.source[start..start + len]))
            }
            None if self.rest().contains("}}") => Err(LexError::UnterminatedString(open)),
            None => Err(LexError::UnterminatedExpression(expr_start)),
        }
    }

    fn number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        self.eat_while(|c| c.is_ascii_digit());

        let mut fraction = self.rest().chars();
        if fraction.next() == Some('.') && fraction.next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }

        match self.peek() {
            Some(c) if is_ident_char(c) || c == '.' => Err(LexError::InvalidNumber(start)),
            _ => Ok(Token::new(TokenKind::Number, &self.source[start..self.pos])),
        }
    }

    /// `@name`, `#name` or `/name`.
    fn sigil_name(&mut self, kind: TokenKind) -> Result<Token, LexError> {
        let sigil_at = self.pos;
        self.bump();
        let start = self.pos;
        self.eat_while(|c| !c.is_whitespace() && !matches!(c, '}' | '(' | ')' | '\''));
        if self.pos == start {
            return Err(match kind {
                TokenKind::VarIdentifier => LexError::EmptyVariableName(sigil_at),
                _ => LexError::EmptyBlockName(sigil_at),
            });
        }
        Ok(Token::new(kind, &self.source[start..self.pos]))
    }

    fn flush_text(&mut self, start: usize) {
        if start < self.pos {
            self.tokens
                .push(Token::new(TokenKind::Text, &self.source[start..self.pos]));
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace);
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(tokenize("").unwrap(), vec![Token::new(TokenKind::Eof, "")]);
    }

    #[test]
    fn test_empty_expression() {
        assert_eq!(
            kinds("{{ }}"),
            vec![TokenKind::ExprStart, TokenKind::ExprEnd, TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_literal() {
        let tokens = tokenize("{{ 'hello' }}").unwrap();
        assert_eq!(tokens[1], Token::new(TokenKind::String, "hello"));
    }

    #[test]
    fn test_text_only() {
        let tokens = tokenize("plain } text {").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::new(TokenKind::Text, "plain } text {"));
    }

    #[test]
    fn test_mixed_template() {
        let source = r#"{"name": "{{queryParam 'name' 'John'}}", "var": {{@test}}, "one": "{{oneOf (array 'a' 'b')}}"}"#;
        let tokens = tokenize(source).unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text,
                TokenKind::ExprStart,
                TokenKind::FunctionName,
                TokenKind::String,
                TokenKind::String,
                TokenKind::ExprEnd,
                TokenKind::Text,
                TokenKind::ExprStart,
                TokenKind::VarIdentifier,
                TokenKind::ExprEnd,
                TokenKind::Text,
                TokenKind::ExprStart,
                TokenKind::FunctionName,
                TokenKind::SubExprStart,
                TokenKind::FunctionName,
                TokenKind::String,
                TokenKind::String,
                TokenKind::SubExprEnd,
                TokenKind::ExprEnd,
                TokenKind::Text,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[8].text, "test");
    }

    #[test]
    fn test_blocks_and_numbers() {
        let tokens = tokenize("{{#repeat 3 10}}x{{/repeat}}").unwrap();
        assert_eq!(tokens[1], Token::new(TokenKind::BlockStart, "repeat"));
        assert_eq!(tokens[2], Token::new(TokenKind::Number, "3"));
        assert_eq!(tokens[3], Token::new(TokenKind::Number, "10"));
        assert_eq!(tokens[5], Token::new(TokenKind::Text, "x"));
        assert_eq!(tokens[7], Token::new(TokenKind::BlockEnd, "repeat"));
    }

    #[test]
    fn test_decimal_number() {
        let tokens = tokenize("{{ add 1.5 2 }}").unwrap();
        assert_eq!(tokens[2], Token::new(TokenKind::Number, "1.5"));
    }

    #[test]
    fn test_string_keeps_whitespace_and_braces() {
        let tokens = tokenize("{{ ' a }} b ' }}").unwrap();
        assert_eq!(tokens[1], Token::new(TokenKind::String, " a }} b "));
    }

    #[test]
    fn test_unterminated_expression() {
        assert!(matches!(
            tokenize("{{ 'x'"),
            Err(LexError::UnterminatedExpression(0))
        ));
        assert!(matches!(
            tokenize("text {{ upper"),
            Err(LexError::UnterminatedExpression(5))
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            tokenize("{{ 'abc }}"),
            Err(LexError::UnterminatedString(3))
        ));
    }

    #[test]
    fn test_empty_names() {
        assert!(matches!(
            tokenize("{{ @ }}"),
            Err(LexError::EmptyVariableName(3))
        ));
        assert!(matches!(tokenize("{{ # }}"), Err(LexError::EmptyBlockName(3))));
        assert!(matches!(tokenize("{{ /}}"), Err(LexError::EmptyBlockName(3))));
    }

    #[test]
    fn test_invalid_number() {
        assert!(matches!(
            tokenize("{{ 12ab }}"),
            Err(LexError::InvalidNumber(3))
        ));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(matches!(
            tokenize("{{ $ }}"),
            Err(LexError::UnexpectedCharacter { ch: '$', .. })
        ));
    }
}
