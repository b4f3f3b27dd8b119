//! High-level lexer interface.

use crate::error::LexError;
use crate::token::{Token, TokenKind};
use logos::Logos;

/// A lexer for Ruby source code.
///
/// Wraps the logos-generated lexer with a nicer interface and error handling.
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, TokenKind>,
    peeked: Option<Result<Token, LexError>>,
    /// Track if we've emitted EOF
    done: bool,
}

impl<'source> Lexer<'source> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            peeked: None,
            done: false,
        }
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Option<&Result<Token, LexError>> {
        if self.peeked.is_none() {
            self.peeked = self.next_inner();
        }
        self.peeked.as_ref()
    }

    /// Get the source text.
    pub fn source(&self) -> &'source str {
        self.inner.source()
    }

    fn next_inner(&mut self) -> Option<Result<Token, LexError>> {
        loop {
            match self.inner.next() {
                Some(Ok(kind)) => {
                    let span = self.inner.span();

                    // Skip trivia (comments)
                    if kind.is_trivia() {
                        continue;
                    }

                    return Some(Ok(Token::new(kind, span)));
                }
                Some(Err(())) => {
                    let span = self.inner.span();
                    return Some(Err(classify_error(self.inner.slice(), span)));
                }
                None => {
                    if !self.done {
                        self.done = true;
                        let pos = self.inner.span().end;
                        return Some(Ok(Token::new(TokenKind::Eof, pos..pos)));
                    }
                    return None;
                }
            }
        }
    }
}

fn classify_error(slice: &str, span: std::ops::Range<usize>) -> LexError {
    match slice.chars().next() {
        Some('"') | Some('\'') => LexError::UnterminatedString { span },
        Some(c) if c.is_ascii_digit() => LexError::InvalidNumber { span },
        _ => LexError::UnexpectedChar { span },
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(peeked) = self.peeked.take() {
            return Some(peeked);
        }
        self.next_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;

    fn significant(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .filter_map(|r| r.ok())
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenKind::Newline))
            .collect()
    }

    #[test]
    fn test_simple_tokenization() {
        let source = "x = 42";
        let tokens: Vec<_> = Lexer::new(source).filter_map(|r| r.ok()).collect();

        assert_eq!(tokens.len(), 4); // x, =, 42, EOF
        assert_eq!(tokens[0].kind, TokenKind::Ident(SmolStr::from("x")));
        assert_eq!(tokens[1].kind, TokenKind::Eq);
        assert_eq!(tokens[2].kind, TokenKind::Int(42));
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_class_definition() {
        let source = r#"
            class Foo < Bar
              delegate :name, to: :user
            end
        "#;
        let kinds = significant(source);

        assert_eq!(kinds[0], TokenKind::Class);
        assert_eq!(kinds[1], TokenKind::Const(SmolStr::from("Foo")));
        assert_eq!(kinds[2], TokenKind::Lt);
        assert_eq!(kinds[3], TokenKind::Const(SmolStr::from("Bar")));
        assert_eq!(kinds[4], TokenKind::Ident(SmolStr::from("delegate")));
        assert_eq!(kinds[5], TokenKind::Symbol(SmolStr::from("name")));
        assert_eq!(kinds[6], TokenKind::Comma);
        assert_eq!(kinds[7], TokenKind::Ident(SmolStr::from("to")));
        assert_eq!(kinds[8], TokenKind::Colon);
        assert_eq!(kinds[9], TokenKind::Symbol(SmolStr::from("user")));
        assert_eq!(kinds[10], TokenKind::End);
        assert_eq!(kinds[11], TokenKind::Eof);
    }

    #[test]
    fn test_comments_skipped() {
        let source = "# leading comment\nx = 1 # trailing\n=begin\nclass Hidden\n=end\ny = 2\n";
        let kinds = significant(source);

        let idents: Vec<_> = kinds
            .iter()
            .filter_map(|k| match k {
                TokenKind::Ident(s) => Some(s.as_str()),
                TokenKind::Const(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();

        assert_eq!(idents, vec!["x", "y"]);
    }

    #[test]
    fn test_newlines_are_kept() {
        let tokens: Vec<_> = Lexer::new("a\nb").filter_map(|r| r.ok()).collect();
        assert_eq!(tokens[1].kind, TokenKind::Newline);
    }

    #[test]
    fn test_unterminated_string_is_reported() {
        let errors: Vec<_> = Lexer::new("x = \"open").filter_map(|r| r.err()).collect();
        assert!(matches!(
            errors.first(),
            Some(LexError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = Lexer::new("foo");
        let peeked = lexer.peek().cloned();
        let next = lexer.next();
        assert_eq!(peeked, next);
    }
}
