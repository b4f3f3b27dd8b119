//! Tokens of RBS signature files.

use logos::Logos;
use smol_str::SmolStr;

/// Signature token kinds.
///
/// Keywords (`class`, `def`, `untyped`, ...) lex as [`SigToken::Ident`] and
/// are recognized by the parser, since most of them are also valid method
/// names and keyword-argument labels.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"%a\{[^}]*\}")]
#[logos(skip r"%a\([^)]*\)")]
#[logos(skip r"%a\[[^\]]*\]")]
pub enum SigToken {
    /// Any identifier: constant, interface (`_Each`), alias or keyword
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| SmolStr::from(lex.slice()))]
    #[regex(r"`[^`\n]+`", |lex| SmolStr::from(lex.slice().trim_matches('`')))]
    Ident(SmolStr),

    /// `@ivar`, `@@cvar`
    #[regex(r"@@?[a-zA-Z_][a-zA-Z0-9_]*", |lex| SmolStr::from(lex.slice()))]
    InstanceVar(SmolStr),

    /// `$global`
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| SmolStr::from(lex.slice()))]
    GlobalVar(SmolStr),

    #[regex(r"-?[0-9][0-9_]*", |lex| lex.slice().replace('_', "").parse().ok())]
    Int(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    Str(SmolStr),

    /// `:sym`, `:sym?`, `:"quoted"`
    #[regex(r":[a-zA-Z_][a-zA-Z0-9_]*[?!=]?", |lex| SmolStr::from(&lex.slice()[1..]))]
    #[regex(r#":"([^"\\]|\\.)*""#, |lex| unquote(&lex.slice()[1..]))]
    Symbol(SmolStr),

    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
    #[token("...")]
    Ellipsis,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("|")]
    Pipe,
    #[token("&")]
    Amp,
    #[token("^")]
    Caret,
    #[token("?")]
    Question,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("~")]
    Tilde,
    /// The `@` of unary operator names: `-@`, `+@`
    #[token("@")]
    At,

    /// End of input
    Eof,
}

fn unquote(s: &str) -> Option<SmolStr> {
    let quote = s.chars().next()?;
    let inner = s.strip_prefix(quote)?.strip_suffix(quote)?;
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }
    Some(SmolStr::from(result))
}
