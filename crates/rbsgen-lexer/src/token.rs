//! Token definitions for the Ruby subset.

use logos::Logos;
use smol_str::SmolStr;

/// A token with its kind and span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: std::ops::Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, span: std::ops::Range<usize>) -> Self {
        Self { kind, span }
    }
}

/// A decoded string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLit {
    /// Contents with escapes decoded (interpolations are kept verbatim).
    pub value: SmolStr,
    /// Whether the literal contains `#{...}`.
    pub interpolated: bool,
}

/// Token kinds.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")] // Skip spaces and tabs
#[logos(skip r"\\\r?\n")] // Line continuations
pub enum TokenKind {
    // ========================================================================
    // Keywords
    // ========================================================================
    #[token("class")]
    Class,
    #[token("module")]
    Module,
    #[token("def")]
    Def,
    #[token("end")]
    End,
    #[token("do")]
    Do,
    #[token("if")]
    If,
    #[token("unless")]
    Unless,
    #[token("elsif")]
    Elsif,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("until")]
    Until,
    #[token("case")]
    Case,
    #[token("when")]
    When,
    #[token("then")]
    Then,
    #[token("begin")]
    Begin,
    #[token("rescue")]
    Rescue,
    #[token("ensure")]
    Ensure,
    #[token("return")]
    Return,
    #[token("yield")]
    Yield,
    #[token("self")]
    SelfKw,
    #[token("nil")]
    Nil,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,

    // ========================================================================
    // Operators
    // ========================================================================
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    Ne,
    #[token("=~")]
    Match,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<=>")]
    Spaceship,
    #[token("<<")]
    Shl,

    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("||=")]
    OrEq,
    #[token("&&=")]
    AndEq,
    #[token("!")]
    Bang,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("?")]
    Question,
    #[token("=>")]
    FatArrow,
    #[token("->")]
    Arrow,
    #[token("...")]
    Ellipsis,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token("&.")]
    SafeNav,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    // ========================================================================
    // Delimiters
    // ========================================================================
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // ========================================================================
    // Literals
    // ========================================================================
    /// Integer literal
    #[regex(r"[0-9][0-9_]*", |lex| parse_int(lex.slice()))]
    #[regex(r"0x[0-9a-fA-F][0-9a-fA-F_]*", |lex| parse_radix(lex.slice(), "0x", 16))]
    #[regex(r"0b[01][01_]*", |lex| parse_radix(lex.slice(), "0b", 2))]
    #[regex(r"0o[0-7][0-7_]*", |lex| parse_radix(lex.slice(), "0o", 8))]
    Int(i64),

    /// Float literal
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*", |lex| parse_float(lex.slice()))]
    Float(f64),

    /// String literal, single or double quoted
    #[regex(r#""([^"\\]|\\.)*""#, |lex| parse_double_quoted(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| parse_single_quoted(lex.slice()))]
    Str(StrLit),

    /// Symbol literal: `:name`, `:"quoted"`, `:@ivar`, `:+`
    ///
    /// Setter symbols (`:name=`) lex as a symbol followed by an adjacent `=`
    /// so that `:name=>value` still splits at the rocket.
    #[regex(r":[a-zA-Z_][a-zA-Z0-9_]*[?!]?", |lex| parse_symbol(lex.slice()))]
    #[regex(r":@@?[a-zA-Z_][a-zA-Z0-9_]*", |lex| parse_symbol(lex.slice()))]
    #[regex(r":\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| parse_symbol(lex.slice()))]
    #[regex(r":(\[\]=?|<=>|===?|=~|![=~]?|<=|>=|<<|>>|\*\*|[+\-*/%<>~^&|])", |lex| parse_symbol(lex.slice()))]
    #[regex(r#":"([^"\\]|\\.)*""#, |lex| parse_quoted_symbol(lex.slice()))]
    Symbol(SmolStr),

    /// `%i[...]` symbol array
    #[regex(r"%i\[[^\]]*\]", |lex| parse_word_list(lex.slice()))]
    #[regex(r"%i\([^)]*\)", |lex| parse_word_list(lex.slice()))]
    SymbolArray(Vec<SmolStr>),

    /// `%w[...]` string array
    #[regex(r"%w\[[^\]]*\]", |lex| parse_word_list(lex.slice()))]
    #[regex(r"%w\([^)]*\)", |lex| parse_word_list(lex.slice()))]
    WordArray(Vec<SmolStr>),

    /// Local identifier or method name (may end in `?` or `!`)
    #[regex(r"[a-z_][a-zA-Z0-9_]*[?!]?", |lex| SmolStr::from(lex.slice()))]
    Ident(SmolStr),

    /// Constant name
    #[regex(r"[A-Z][a-zA-Z0-9_]*", |lex| SmolStr::from(lex.slice()))]
    Const(SmolStr),

    /// Instance variable: `@name`
    #[regex(r"@[a-zA-Z_][a-zA-Z0-9_]*", |lex| SmolStr::from(lex.slice()))]
    InstanceVar(SmolStr),

    /// Class variable: `@@name`
    #[regex(r"@@[a-zA-Z_][a-zA-Z0-9_]*", |lex| SmolStr::from(lex.slice()))]
    ClassVar(SmolStr),

    /// Global variable: `$name`
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| SmolStr::from(lex.slice()))]
    GlobalVar(SmolStr),

    // ========================================================================
    // Whitespace and Comments
    // ========================================================================
    /// Newline (significant for statement separation)
    #[regex(r"\n|\r\n")]
    Newline,

    /// Single-line comment
    #[regex(r"#[^\n]*")]
    LineComment,

    /// `=begin` ... `=end` documentation block (handled specially)
    #[token("=begin", |lex| skip_block_comment(lex))]
    BlockComment,

    /// End of file
    Eof,
}

impl TokenKind {
    /// Check if this token is a keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Class
                | TokenKind::Module
                | TokenKind::Def
                | TokenKind::End
                | TokenKind::Do
                | TokenKind::If
                | TokenKind::Unless
                | TokenKind::Elsif
                | TokenKind::Else
                | TokenKind::While
                | TokenKind::Until
                | TokenKind::Case
                | TokenKind::When
                | TokenKind::Then
                | TokenKind::Begin
                | TokenKind::Rescue
                | TokenKind::Ensure
                | TokenKind::Return
                | TokenKind::Yield
                | TokenKind::SelfKw
                | TokenKind::Nil
                | TokenKind::True
                | TokenKind::False
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
        )
    }

    /// Source spelling of a keyword, used when a keyword appears as a
    /// method name (`def class`, `foo.then`) or a hash label (`if:`).
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::Class => "class",
            TokenKind::Module => "module",
            TokenKind::Def => "def",
            TokenKind::End => "end",
            TokenKind::Do => "do",
            TokenKind::If => "if",
            TokenKind::Unless => "unless",
            TokenKind::Elsif => "elsif",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Until => "until",
            TokenKind::Case => "case",
            TokenKind::When => "when",
            TokenKind::Then => "then",
            TokenKind::Begin => "begin",
            TokenKind::Rescue => "rescue",
            TokenKind::Ensure => "ensure",
            TokenKind::Return => "return",
            TokenKind::Yield => "yield",
            TokenKind::SelfKw => "self",
            TokenKind::Nil => "nil",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            _ => return None,
        };
        Some(text)
    }

    /// Check if this token is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::Symbol(_)
                | TokenKind::SymbolArray(_)
                | TokenKind::WordArray(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
        )
    }

    /// Check if this token is trivia (comments, etc.)
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Check if this token ends a statement.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }
}

// ============================================================================
// Helper functions for parsing
// ============================================================================

fn parse_int(s: &str) -> Option<i64> {
    let s = s.replace('_', "");
    s.parse().ok()
}

fn parse_radix(s: &str, prefix: &str, radix: u32) -> Option<i64> {
    let s = s.strip_prefix(prefix).unwrap_or(s).replace('_', "");
    i64::from_str_radix(&s, radix).ok()
}

fn parse_float(s: &str) -> Option<f64> {
    let s = s.replace('_', "");
    s.parse().ok()
}

fn parse_double_quoted(s: &str) -> Option<StrLit> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    Some(StrLit {
        value: unescape(inner),
        interpolated: inner.contains("#{"),
    })
}

fn parse_single_quoted(s: &str) -> Option<StrLit> {
    let inner = s.strip_prefix('\'')?.strip_suffix('\'')?;

    // Only `\\` and `\'` are escapes inside single quotes
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && matches!(chars.peek(), Some('\\') | Some('\'')) {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }

    Some(StrLit {
        value: SmolStr::from(result),
        interpolated: false,
    })
}

fn unescape(s: &str) -> SmolStr {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('0') => result.push('\0'),
                Some('s') => result.push(' '),
                Some('e') => result.push('\u{1b}'),
                Some(c) => result.push(c),
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    SmolStr::from(result)
}

fn parse_symbol(s: &str) -> Option<SmolStr> {
    s.strip_prefix(':').map(SmolStr::from)
}

fn parse_quoted_symbol(s: &str) -> Option<SmolStr> {
    let inner = s.strip_prefix(":\"")?.strip_suffix('"')?;
    Some(unescape(inner))
}

fn parse_word_list(s: &str) -> Option<Vec<SmolStr>> {
    let inner = s.get(3..s.len().checked_sub(1)?)?;
    Some(inner.split_whitespace().map(SmolStr::from).collect())
}

fn skip_block_comment(lex: &mut logos::Lexer<TokenKind>) -> logos::Skip {
    let remainder = lex.remainder();

    // The terminator must start a line.
    let mut offset = 0;
    for line in remainder.split_inclusive('\n') {
        offset += line.len();
        if line.starts_with("=end") {
            lex.bump(offset);
            return logos::Skip;
        }
    }

    // Unclosed comment - bump to end
    lex.bump(remainder.len());
    logos::Skip
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos::Logos;

    fn sym(s: &str) -> Option<Result<TokenKind, ()>> {
        Some(Ok(TokenKind::Symbol(SmolStr::from(s))))
    }

    #[test]
    fn test_keywords() {
        let mut lex = TokenKind::lexer("class module def end do");
        assert_eq!(lex.next(), Some(Ok(TokenKind::Class)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Module)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Def)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::End)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Do)));
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let mut lex = TokenKind::lexer("classify ending");
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::Ident(SmolStr::from("classify"))))
        );
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::Ident(SmolStr::from("ending"))))
        );
    }

    #[test]
    fn test_integers() {
        let mut lex = TokenKind::lexer("42 1_000_000 0xFF 0b1010 0o755");
        assert_eq!(lex.next(), Some(Ok(TokenKind::Int(42))));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Int(1_000_000))));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Int(255))));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Int(10))));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Int(493))));
    }

    #[test]
    fn test_floats() {
        let mut lex = TokenKind::lexer("3.25 1_000.5");
        assert_eq!(lex.next(), Some(Ok(TokenKind::Float(3.25))));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Float(1000.5))));
    }

    #[test]
    fn test_strings() {
        let mut lex = TokenKind::lexer(r##""hello" "world\n" 'it\'s' "#{x}""##);
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::Str(StrLit {
                value: SmolStr::from("hello"),
                interpolated: false
            })))
        );
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::Str(StrLit {
                value: SmolStr::from("world\n"),
                interpolated: false
            })))
        );
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::Str(StrLit {
                value: SmolStr::from("it's"),
                interpolated: false
            })))
        );
        assert!(matches!(
            lex.next(),
            Some(Ok(TokenKind::Str(StrLit {
                interpolated: true,
                ..
            })))
        ));
    }

    #[test]
    fn test_symbols() {
        let mut lex = TokenKind::lexer(r#":foo :bar= :baz? :@ivar :"quoted name" :<=> :[]"#);
        assert_eq!(lex.next(), sym("foo"));
        assert_eq!(lex.next(), sym("bar"));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Eq)));
        assert_eq!(lex.next(), sym("baz?"));
        assert_eq!(lex.next(), sym("@ivar"));
        assert_eq!(lex.next(), sym("quoted name"));
        assert_eq!(lex.next(), sym("<=>"));
        assert_eq!(lex.next(), sym("[]"));
    }

    #[test]
    fn test_scope_operator_is_not_a_symbol() {
        let mut lex = TokenKind::lexer("Foo::Bar ::Baz");
        assert_eq!(lex.next(), Some(Ok(TokenKind::Const(SmolStr::from("Foo")))));
        assert_eq!(lex.next(), Some(Ok(TokenKind::ColonColon)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Const(SmolStr::from("Bar")))));
        assert_eq!(lex.next(), Some(Ok(TokenKind::ColonColon)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Const(SmolStr::from("Baz")))));
    }

    #[test]
    fn test_symbol_before_rocket() {
        let mut lex = TokenKind::lexer(":to=>:bar");
        assert_eq!(lex.next(), sym("to"));
        assert_eq!(lex.next(), Some(Ok(TokenKind::FatArrow)));
        assert_eq!(lex.next(), sym("bar"));
    }

    #[test]
    fn test_label_lexes_as_identifier_and_colon() {
        let mut lex = TokenKind::lexer("to: :bar");
        assert_eq!(lex.next(), Some(Ok(TokenKind::Ident(SmolStr::from("to")))));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Colon)));
        assert_eq!(lex.next(), sym("bar"));
    }

    #[test]
    fn test_percent_arrays() {
        let mut lex = TokenKind::lexer("%i[foo bar] %w(a b)");
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::SymbolArray(vec![
                SmolStr::from("foo"),
                SmolStr::from("bar")
            ])))
        );
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::WordArray(vec![
                SmolStr::from("a"),
                SmolStr::from("b")
            ])))
        );
    }

    #[test]
    fn test_variables() {
        let mut lex = TokenKind::lexer("@user @@count $stdout");
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::InstanceVar(SmolStr::from("@user"))))
        );
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::ClassVar(SmolStr::from("@@count"))))
        );
        assert_eq!(
            lex.next(),
            Some(Ok(TokenKind::GlobalVar(SmolStr::from("$stdout"))))
        );
    }

    #[test]
    fn test_operators() {
        let mut lex = TokenKind::lexer("+ - * / == != <= >= = | ? => -> .. ... &. ||=");
        assert_eq!(lex.next(), Some(Ok(TokenKind::Plus)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Minus)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Star)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Slash)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::EqEq)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Ne)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Le)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Ge)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Eq)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Pipe)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Question)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::FatArrow)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Arrow)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::DotDot)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::Ellipsis)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::SafeNav)));
        assert_eq!(lex.next(), Some(Ok(TokenKind::OrEq)));
    }
}
