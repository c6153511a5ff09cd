//! Error types for template groups and template syntax

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Errors raised while building groups or resolving names to storage
#[derive(Debug, Error)]
pub enum GroupError {
    /// A requested name or configured root cannot form a storage location
    #[error("invalid template location '{location}': {reason}")]
    InvalidName { location: String, reason: String },

    /// Neither the filesystem nor an embedded bundle has the directory
    #[error("no such directory: {name}")]
    NoSuchDirectory { name: String },

    /// A name was registered twice with different definitions
    #[error("duplicate definition of template '{name}' (first defined in {existing})")]
    DuplicateDefinition { name: String, existing: String },

    /// Delimiters must be two distinct, non-whitespace characters
    #[error("invalid delimiters {start:?} {stop:?}: {reason}")]
    InvalidDelimiters {
        start: String,
        stop: String,
        reason: String,
    },

    /// Reading an artifact failed for a reason other than absence
    #[error("can't read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Artifact bytes are not valid in the configured encoding
    #[error("can't decode {location} as {encoding}")]
    Decode { location: String, encoding: String },
}

impl GroupError {
    pub fn invalid_name(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_delimiters(
        start: impl Into<String>,
        stop: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidDelimiters {
            start: start.into(),
            stop: stop.into(),
            reason: reason.into(),
        }
    }
}

/// A syntax error inside a group file or template file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    /// Create a syntax error with no expectation list
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            span,
            message: message.into(),
            expected: Vec::new(),
        }
    }

    /// Characters the lexer could not turn into a token
    pub fn unrecognized(span: Span, source: &str) -> Self {
        let text = source.get(span.clone()).unwrap_or("");
        Self::syntax(span, format!("Unrecognized input '{}'", text))
    }

    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Syntax { message, .. } => message,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                let written = Report::build(ReportKind::Error, filename, span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf);
                if written.is_err() {
                    return format!("{}: {}", filename, self);
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::String(s) => format!("string \"{}\"", s),
        Token::BigString(_) => "'<<...>>' template".to_string(),
        Token::RawString(_) => "'<%...%>' template".to_string(),
        Token::Delimiters => "keyword 'delimiters'".to_string(),
        Token::Import => "keyword 'import'".to_string(),
        Token::Default => "keyword 'default'".to_string(),
        Token::Define => "'::='".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Equals => "'='".to_string(),
        _ => format!("{:?}", tok),
    }
}
