//! Compiled templates and body compilation
//!
//! A template body is split into literal text and expression chunks using the
//! effective delimiters. The expression language itself is not interpreted
//! here; expressions are kept as trimmed source text for the rendering engine.

use std::fmt;

use crate::error::{GroupError, ParseError};
use crate::name;
use crate::parser::ast::{DictionaryDef, TemplateDef};

/// Start/stop characters that mark expressions inside template bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    start: char,
    stop: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            start: '<',
            stop: '>',
        }
    }
}

impl Delimiters {
    pub fn new(start: char, stop: char) -> Result<Self, GroupError> {
        if start == stop {
            return Err(GroupError::invalid_delimiters(
                start,
                stop,
                "start and stop must differ",
            ));
        }
        if start.is_whitespace() || stop.is_whitespace() {
            return Err(GroupError::invalid_delimiters(
                start,
                stop,
                "whitespace is not a delimiter",
            ));
        }
        Ok(Self { start, stop })
    }

    /// Parse a two-character string such as `"<>"` or `"$#"`
    pub fn parse(spec: &str) -> Result<Self, GroupError> {
        let mut chars = spec.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(start), Some(stop), None) => Self::new(start, stop),
            _ => Err(GroupError::invalid_delimiters(
                spec,
                "",
                "expected exactly two characters",
            )),
        }
    }

    /// Build from two single-character strings, as written in group files
    pub fn from_strings(start: &str, stop: &str) -> Result<Self, GroupError> {
        let single = |s: &str| {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        };
        match (single(start), single(stop)) {
            (Some(a), Some(b)) => Self::new(a, b),
            _ => Err(GroupError::invalid_delimiters(
                start,
                stop,
                "each delimiter must be a single character",
            )),
        }
    }

    pub fn start(&self) -> char {
        self.start
    }

    pub fn stop(&self) -> char {
        self.stop
    }
}

impl fmt::Display for Delimiters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.start, self.stop)
    }
}

/// One piece of a compiled template body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    Expr(String),
}

/// A formal argument with an optional default value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormalArgument {
    pub name: String,
    pub default: Option<String>,
}

/// A template compiled from a group file or template file
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    /// Fully-qualified name, e.g. `util/header`
    pub name: String,
    pub formal_args: Vec<FormalArgument>,
    pub chunks: Vec<Chunk>,
    /// Label of the artifact the template came from
    pub source: String,
    /// Delimiter override declared by the defining group file
    pub delimiters: Option<Delimiters>,
    /// Delimiters the body was split with
    pub compiled_with: Delimiters,
}

impl CompiledTemplate {
    /// Compile a parsed definition under `qualified_name`
    ///
    /// `group_delimiters` apply unless `file_delimiters` overrides them.
    pub fn compile(
        def: &TemplateDef,
        qualified_name: String,
        source: &str,
        group_delimiters: Delimiters,
        file_delimiters: Option<Delimiters>,
    ) -> Result<Self, ParseError> {
        let delimiters = file_delimiters.unwrap_or(group_delimiters);
        let chunks = compile_body(&def.body.node, delimiters).map_err(|e| {
            ParseError::syntax(
                def.body.span.clone(),
                format!(
                    "{} in template '{}' (body offset {})",
                    e.message, def.name.node, e.offset
                ),
            )
        })?;

        Ok(Self {
            name: qualified_name,
            formal_args: def
                .args
                .iter()
                .map(|arg| FormalArgument {
                    name: arg.name.node.clone(),
                    default: arg.default.as_ref().map(|d| d.node.clone()),
                })
                .collect(),
            chunks,
            source: source.to_string(),
            delimiters: file_delimiters,
            compiled_with: delimiters,
        })
    }

    pub fn leaf_name(&self) -> &str {
        name::leaf_of(&self.name)
    }

    pub fn prefix(&self) -> &str {
        name::prefix_of(&self.name)
    }

    pub fn has_argument(&self, name: &str) -> bool {
        self.formal_args.iter().any(|a| a.name == name)
    }

    pub fn argument_names(&self) -> Vec<&str> {
        self.formal_args.iter().map(|a| a.name.as_str()).collect()
    }

    /// Expression source texts in body order
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().filter_map(|c| match c {
            Chunk::Expr(e) => Some(e.as_str()),
            Chunk::Text(_) => None,
        })
    }

    /// Reassemble the body using the delimiters it was compiled with
    pub fn body_source(&self) -> String {
        let delimiters = self.compiled_with;
        let mut out = String::new();
        for chunk in &self.chunks {
            match chunk {
                Chunk::Text(text) => {
                    for c in text.chars() {
                        if c == delimiters.start() {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                }
                Chunk::Expr(expr) => {
                    out.push(delimiters.start());
                    out.push_str(expr);
                    out.push(delimiters.stop());
                }
            }
        }
        out
    }
}

impl fmt::Display for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .formal_args
            .iter()
            .map(|a| match &a.default {
                Some(d) => format!("{}=\"{}\"", a.name, d.replace('"', "\\\"")),
                None => a.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let body = self.body_source();
        if body.contains('\n') {
            write!(f, "{}({}) ::= <<\n{}\n>>", self.leaf_name(), args, body)
        } else {
            write!(
                f,
                "{}({}) ::= \"{}\"",
                self.leaf_name(),
                args,
                body.replace('"', "\\\"")
            )
        }
    }
}

/// A key/value map defined in a group file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    pub name: String,
    pub entries: Vec<(String, String)>,
    pub default: Option<String>,
    pub source: String,
}

impl Dictionary {
    pub fn from_def(def: &DictionaryDef, qualified_name: String, source: &str) -> Self {
        Self {
            name: qualified_name,
            entries: def
                .entries
                .iter()
                .map(|(k, v)| (k.node.clone(), v.node.clone()))
                .collect(),
            default: def.default.as_ref().map(|d| d.node.clone()),
            source: source.to_string(),
        }
    }

    /// Value for `key`, falling back to the dictionary's default
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .or(self.default.as_deref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// Failure to split a body into chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyError {
    /// Byte offset of the offending start delimiter within the body
    pub offset: usize,
    pub message: String,
}

impl BodyError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Split a template body into text and expression chunks
pub fn compile_body(body: &str, delimiters: Delimiters) -> Result<Vec<Chunk>, BodyError> {
    let mut chunks = Vec::new();
    let mut text = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c == '\\' {
            // Escaped start delimiter is literal text
            if let Some(&(_, next)) = chars.peek() {
                if next == delimiters.start() {
                    text.push(next);
                    chars.next();
                    continue;
                }
            }
            text.push(c);
            continue;
        }

        if c != delimiters.start() {
            text.push(c);
            continue;
        }

        if chars.peek().map(|&(_, n)| n) == Some('!') {
            chars.next();
            let mut closed = false;
            while let Some((_, n)) = chars.next() {
                if n == '!' && chars.peek().map(|&(_, s)| s) == Some(delimiters.stop()) {
                    chars.next();
                    closed = true;
                    break;
                }
            }
            if !closed {
                return Err(BodyError::new(idx, "unterminated comment"));
            }
            continue;
        }

        let expr = scan_expression(&mut chars, delimiters.stop())
            .ok_or_else(|| BodyError::new(idx, "unterminated expression"))?;
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(BodyError::new(idx, "empty expression"));
        }
        if !text.is_empty() {
            chunks.push(Chunk::Text(std::mem::take(&mut text)));
        }
        chunks.push(Chunk::Expr(expr.to_string()));
    }

    if !text.is_empty() {
        chunks.push(Chunk::Text(text));
    }
    Ok(chunks)
}

/// Consume an expression up to the matching stop delimiter
///
/// Stop characters inside `{...}` subtemplates or string literals do not end
/// the expression.
fn scan_expression(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    stop: char,
) -> Option<String> {
    let mut expr = String::new();
    let mut depth = 0usize;
    let mut in_string = false;

    while let Some((_, c)) = chars.next() {
        if in_string {
            expr.push(c);
            if c == '\\' {
                if let Some((_, escaped)) = chars.next() {
                    expr.push(escaped);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if c == stop && depth == 0 => return Some(expr),
            _ => {}
        }
        expr.push(c);
    }
    None
}
