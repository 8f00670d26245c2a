//! Positioned, fail-fast compile errors.
//!
//! Every stage stops at the first violation and reports a single error with a
//! best-effort source position derived from a byte offset. Line and column are
//! computed eagerly so the artifact is self-contained for tooling and tests.

use std::fmt::Write as _;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use crate::ast::Span;

/// Which stage rejected the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid character in the schema text.
    Lex,
    /// Grammar or naming-convention violation.
    Parse,
    /// Schema-invariant violation.
    Semantic,
    /// Unsatisfiable or underspecified generation request.
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Lex => "lex error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Semantic => "semantic error",
            ErrorKind::Config => "config error",
        };
        f.write_str(name)
    }
}

/// The single error artifact the compiler produces.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {filename}:{line}:{col}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub filename: String,
    /// Byte offset into the original source text.
    pub offset: usize,
    /// 1-based line derived from `offset`.
    pub line: u32,
    /// 1-based column derived from `offset`.
    pub col: u32,
}

impl CompileError {
    pub fn new(
        kind: ErrorKind,
        span: Span,
        message: impl Into<String>,
        source: &str,
        filename: &str,
    ) -> Self {
        let offset = span.start.min(source.len());
        let (line, col) = line_col(source, offset);
        Self {
            kind,
            message: message.into(),
            filename: filename.to_string(),
            offset,
            line,
            col,
        }
    }

    /// Render the error as an annotated snippet of the offending source.
    pub fn render(&self, source: &str, colored: bool) -> String {
        let renderer = if colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let start = self.offset.min(source.len());
        let end = (start + 1).min(source.len()).max(start);
        let snippet = Snippet::source(source)
            .line_start(1)
            .path(&self.filename)
            .annotation(AnnotationKind::Primary.span(start..end).label(&self.message));

        let report: Vec<Group> = vec![Level::ERROR.primary_title(&self.message).element(snippet)];

        let mut out = String::new();
        write!(out, "{}", renderer.render(&report)).expect("String write never fails");
        out
    }
}

/// 1-based line/column of a byte offset.
fn line_col(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut line_start = 0usize;
    for (i, byte) in source.as_bytes().iter().enumerate() {
        if i >= offset {
            break;
        }
        if *byte == b'\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    (line, (offset - line_start) as u32 + 1)
}

/// Stage-internal error: kind, message, and span, before the source context is
/// attached. Stages that do not hold the source text produce these.
#[derive(Debug, Clone)]
pub(crate) struct Fail {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

impl Fail {
    pub fn lex(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Lex,
            message: message.into(),
            span,
        }
    }

    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            message: message.into(),
            span,
        }
    }

    pub fn semantic(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Semantic,
            message: message.into(),
            span,
        }
    }

    pub fn config(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Config,
            message: message.into(),
            span,
        }
    }

    pub fn into_error(self, source: &str, filename: &str) -> CompileError {
        CompileError::new(self.kind, self.span, self.message, source, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_of_offsets() {
        let src = "abc\ndef\nghi";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 2), (1, 3));
        assert_eq!(line_col(src, 4), (2, 1));
        assert_eq!(line_col(src, 9), (3, 2));
    }

    #[test]
    fn error_carries_position() {
        let err = CompileError::new(
            ErrorKind::Parse,
            Span::new(4, 7),
            "expected a type",
            "abc\ndef\n",
            "schema.bare",
        );
        assert_eq!(err.line, 2);
        assert_eq!(err.col, 1);
        assert_eq!(err.offset, 4);
        assert_eq!(
            err.to_string(),
            "parse error: schema.bare:2:1: expected a type"
        );
    }
}
