use thiserror::Error;

use crate::common::consts::{EXIT_ERROR, EXIT_EXCEPTION, EXIT_SUCCESS, EXIT_WARNING};
use crate::parser::span::Span;

/// Result type for joosc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a diagnostic, one per compiler pass family.
///
/// The kind determines the exit code: `Internal` maps to 13, everything
/// else at error severity maps to 42.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntactic,
    Weeder,
    Environment,
    Hierarchy,
    Type,
    Reachability,
    DefiniteAssignment,
    Codegen,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntactic => "syntactic",
            ErrorKind::Weeder => "weeder",
            ErrorKind::Environment => "environment",
            ErrorKind::Hierarchy => "hierarchy",
            ErrorKind::Type => "type",
            ErrorKind::Reachability => "reachability",
            ErrorKind::DefiniteAssignment => "definite-assignment",
            ErrorKind::Codegen => "codegen",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single reported problem with its source attribution.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub file: Option<String>,
    pub span: Option<Span>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{} [{}]: {}", tag, self.kind.as_str(), self.message)?;
        if let Some(file) = &self.file {
            write!(f, " ({}", file)?;
            if let Some(span) = self.span {
                write!(f, ":{}", span.start)?;
            }
            write!(f, ")")?;
        } else if let Some(span) = self.span {
            write!(f, " (line {})", span.start.line)?;
        }
        Ok(())
    }
}

/// Accumulator for diagnostics produced by a pass.
///
/// Passes report every independent failure they find; the driver checks
/// `has_errors` at the end of each pass and stops the pipeline there.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    current_file: Option<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file attributed to subsequently pushed diagnostics.
    pub fn set_file(&mut self, file: impl Into<String>) {
        self.current_file = Some(file.into());
    }

    pub fn clear_file(&mut self) {
        self.current_file = None;
    }

    pub fn error(&mut self, kind: ErrorKind, message: impl Into<String>, span: Option<Span>) {
        self.items.push(Diagnostic {
            kind,
            severity: Severity::Error,
            message: message.into(),
            file: self.current_file.clone(),
            span,
        });
    }

    pub fn warning(&mut self, kind: ErrorKind, message: impl Into<String>, span: Option<Span>) {
        self.items.push(Diagnostic {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            file: self.current_file.clone(),
            span,
        });
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    /// Exit code for the accumulated diagnostics under the a6 driver policy.
    pub fn exit_code(&self) -> i32 {
        if self
            .items
            .iter()
            .any(|d| d.severity == Severity::Error && d.kind == ErrorKind::Internal)
        {
            EXIT_EXCEPTION
        } else if self.has_errors() {
            EXIT_ERROR
        } else if self.has_warnings() {
            EXIT_WARNING
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Error type for the strict library API.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}", format_diagnostics(.0))]
    Failed(Vec<Diagnostic>),

    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io(_) => EXIT_ERROR,
            Error::Failed(diags) => {
                if diags
                    .iter()
                    .any(|d| d.severity == Severity::Error && d.kind == ErrorKind::Internal)
                {
                    EXIT_EXCEPTION
                } else {
                    EXIT_ERROR
                }
            }
            Error::Internal(_) => EXIT_EXCEPTION,
        }
    }
}

fn format_diagnostics(diags: &[Diagnostic]) -> String {
    diags
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_prefers_internal() {
        let mut diags = Diagnostics::new();
        diags.error(ErrorKind::Type, "bad type", None);
        diags.error(ErrorKind::Internal, "broken invariant", None);
        assert_eq!(diags.exit_code(), EXIT_EXCEPTION);
    }

    #[test]
    fn warnings_alone_give_43() {
        let mut diags = Diagnostics::new();
        diags.warning(ErrorKind::Reachability, "unreachable statement", None);
        assert_eq!(diags.exit_code(), EXIT_WARNING);
        assert!(!diags.has_errors());
    }

    #[test]
    fn clean_run_gives_0() {
        let diags = Diagnostics::new();
        assert_eq!(diags.exit_code(), EXIT_SUCCESS);
    }
}
