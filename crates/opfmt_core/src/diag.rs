//! # Format Diagnostics
//! Structured errors produced while compiling an assembly format.
//! - Every diagnostic carries a byte-offset [`Span`] into the format string.
//! - Codes are stable and unique, for easy communication/bug reports.
//! - An optional note suggests a fix (e.g. a directive to add).

use std::fmt;

use itertools::Itertools;

/// A half-open byte range into the format string being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span {
            start: start as u32,
            end: end as u32,
        }
    }

    /// A zero-width span, used when an error concerns a single offset.
    pub fn point(at: usize) -> Self {
        Span::new(at, at)
    }

    /// The span covering an entire format string. Verifier errors that talk
    /// about the format as a whole (e.g. a missing directive) use this.
    pub fn whole(format: &str) -> Self {
        Span::new(0, format.len())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A located compilation error with a stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Stable code, rendered as `OPFMT-nn`.
    pub code: usize,
    pub severity: Severity,
    pub span: Span,
    /// What went wrong.
    pub message: String,
    /// Suggested fix, if any.
    pub note: Option<String>,
}

impl Diagnostic {
    pub fn error(code: usize, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: Severity::Error,
            span,
            message: message.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{prefix}[OPFMT-{}] at {}: {}",
            self.code, self.span, self.message
        )?;
        if let Some(note) = &self.note {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

/// Accumulator used while compiling one operation.
pub struct Diagnostics {
    errs: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { errs: Vec::new() }
    }

    pub fn add(&mut self, d: Diagnostic) {
        self.errs.push(d);
    }

    pub fn empty(&self) -> bool {
        self.errs.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.errs
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure of one operation's format compilation.
///
/// Aborts only that operation; the caller decides whether the batch continues
/// (see [`crate::BatchOptions`]).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .diagnostics.iter().map(|d| d.to_string()).join("\n"))]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    pub fn single(diag: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diag],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::error(12, Span::new(3, 7), "operand 'x' is already bound")
            .with_note("remove the second '$x'");
        let s = format!("{d}");
        assert!(s.starts_with("error[OPFMT-12] at 3..7: operand 'x'"));
        assert!(s.contains("note: remove the second"));
    }

    #[test]
    fn accumulator_roundtrip() {
        let mut ds = Diagnostics::new();
        assert!(ds.empty());
        ds.add(Diagnostic::error(1, Span::point(0), "boom"));
        assert!(!ds.empty());
        assert_eq!(ds.into_vec().len(), 1);
    }
}
