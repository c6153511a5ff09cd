//! Diagnostics reported while loading templates
//!
//! Loading never fails loudly: problems are handed to an [`ErrorListener`]
//! and resolution carries on. [`TracingListener`] logs them, and
//! [`CollectingListener`] keeps them for callers that want to present them.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{GroupError, ParseError};

/// Which entry point of the syntax parser produced a syntax error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    /// A `.stg` group file
    Group,
    /// A single-template `.st` file
    Template,
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxKind::Group => f.write_str("group file"),
            SyntaxKind::Template => f.write_str("template file"),
        }
    }
}

/// A reported problem
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Configuration or I/O trouble that is not a syntax problem
    Internal {
        context: String,
        message: String,
        cause: Option<String>,
    },
    /// Malformed source in a specific artifact
    Syntax {
        kind: SyntaxKind,
        artifact: String,
        errors: Vec<ParseError>,
        /// Full artifact text, for rendering source excerpts
        source: String,
    },
}

impl Diagnostic {
    pub fn is_syntax(&self) -> bool {
        matches!(self, Diagnostic::Syntax { .. })
    }

    /// Render for a terminal, with ariadne excerpts for syntax errors
    pub fn render(&self) -> String {
        match self {
            Diagnostic::Internal { .. } => format!("error: {}", self),
            Diagnostic::Syntax {
                artifact,
                errors,
                source,
                ..
            } => errors
                .iter()
                .map(|e| e.format(source, artifact))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Internal {
                context,
                message,
                cause,
            } => {
                write!(f, "{}: {}", context, message)?;
                if let Some(cause) = cause {
                    write!(f, ": {}", cause)?;
                }
                Ok(())
            }
            Diagnostic::Syntax {
                kind,
                artifact,
                errors,
                ..
            } => {
                let messages = errors
                    .iter()
                    .map(|e| e.message())
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "syntax error in {} {}: {}", kind, artifact, messages)
            }
        }
    }
}

/// Sink for diagnostics; reporting never changes resolution results
pub trait ErrorListener: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Logs diagnostics through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl ErrorListener for TracingListener {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::Internal { .. } => tracing::error!("{}", diagnostic),
            Diagnostic::Syntax {
                kind,
                artifact,
                errors,
                ..
            } => {
                for err in errors {
                    tracing::warn!(%kind, %artifact, span = ?err.span(), "{}", err.message());
                }
            }
        }
    }
}

/// Keeps every diagnostic in memory
#[derive(Debug, Default)]
pub struct CollectingListener {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Drain the collected diagnostics
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    pub fn syntax_errors(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.is_syntax())
            .cloned()
            .collect()
    }

    pub fn internal_errors(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| !d.is_syntax())
            .cloned()
            .collect()
    }
}

impl ErrorListener for CollectingListener {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }
}

/// Front end that builds diagnostics and hands them to a listener
#[derive(Clone)]
pub struct ErrorManager {
    listener: Arc<dyn ErrorListener>,
}

impl ErrorManager {
    pub fn new(listener: Arc<dyn ErrorListener>) -> Self {
        Self { listener }
    }

    pub fn internal_error(
        &self,
        context: &str,
        message: impl Into<String>,
        cause: Option<&dyn StdError>,
    ) {
        self.listener.report(Diagnostic::Internal {
            context: context.to_string(),
            message: message.into(),
            cause: cause.map(|c| c.to_string()),
        });
    }

    /// Report a [`GroupError`] as an internal error
    pub fn group_error(&self, context: &str, err: &GroupError) {
        self.internal_error(context, err.to_string(), None);
    }

    pub fn syntax_error(
        &self,
        kind: SyntaxKind,
        artifact: &str,
        errors: Vec<ParseError>,
        source: &str,
    ) {
        if errors.is_empty() {
            return;
        }
        self.listener.report(Diagnostic::Syntax {
            kind,
            artifact: artifact.to_string(),
            errors,
            source: source.to_string(),
        });
    }

    pub fn listener(&self) -> &Arc<dyn ErrorListener> {
        &self.listener
    }
}

impl fmt::Debug for ErrorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorManager").finish_non_exhaustive()
    }
}
