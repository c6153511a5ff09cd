//! Lexer for group and template files using logos

use logos::{Lexer, Logos};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Header keywords
    #[token("delimiters")]
    Delimiters,
    #[token("import")]
    Import,
    #[token("default")]
    Default,

    #[token("::=")]
    Define,

    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Equals,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_\-]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len()-1])
    })]
    String(String),

    /// `<<...>>` template body
    #[token("<<", big_string)]
    BigString(String),

    /// `<%...%>` template body, kept verbatim
    #[token("<%", raw_string)]
    RawString(String),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    BlockComment,
}

fn big_string(lex: &mut Lexer<Token>) -> Option<String> {
    let rest = lex.remainder();
    let end = rest.find(">>")?;
    let body = strip_outer_newlines(&rest[..end]).to_string();
    lex.bump(end + 2);
    Some(body)
}

fn raw_string(lex: &mut Lexer<Token>) -> Option<String> {
    let rest = lex.remainder();
    let end = rest.find("%>")?;
    let body = rest[..end].to_string();
    lex.bump(end + 2);
    Some(body)
}

/// Drop one newline after `<<` and one before `>>`
fn strip_outer_newlines(s: &str) -> &str {
    let s = s
        .strip_prefix("\r\n")
        .or_else(|| s.strip_prefix('\n'))
        .unwrap_or(s);
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}

/// Resolve quote and whitespace escapes; other escapes are left for the body compiler
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('"') => {
                out.push('"');
                chars.next();
            }
            Some('n') => {
                out.push('\n');
                chars.next();
            }
            Some('t') => {
                out.push('\t');
                chars.next();
            }
            Some('r') => {
                out.push('\r');
                chars.next();
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// Lex input string into tokens with spans, plus the spans logos rejected
pub fn lex(input: &str) -> (Vec<(Token, Span)>, Vec<Span>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for (tok, span) in Token::lexer(input).spanned() {
        match tok {
            Ok(t) => tokens.push((t, span)),
            Err(()) => errors.push(span),
        }
    }
    (tokens, errors)
}
