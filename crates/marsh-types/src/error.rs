//! The `SyntaxError` diagnostic record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::code::ErrorCode;
use crate::severity::{ErrorCategory, Severity};

/// Where in the script a diagnostic points.
///
/// `line` is 1-based. `column_start`/`column_end` are 0-based byte
/// offsets into the line, half-open; both zero means "the whole line".
/// `offset` is the absolute byte offset into the newline-joined script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorPosition {
    pub line: usize,
    pub column_start: usize,
    pub column_end: usize,
    pub offset: usize,
}

impl ErrorPosition {
    /// Position covering a whole line.
    pub fn line(line: usize) -> Self {
        Self { line, ..Self::default() }
    }

    /// Position covering `[start, end)` on a line.
    pub fn span(line: usize, start: usize, end: usize) -> Self {
        Self { line, column_start: start, column_end: end, offset: 0 }
    }

    fn has_column(&self) -> bool {
        self.column_start > 0 || self.column_end > self.column_start
    }
}

/// One diagnostic produced by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub severity: Severity,
    pub category: ErrorCategory,
    pub code: ErrorCode,
    pub message: String,
    pub position: ErrorPosition,
    /// The offending line, verbatim.
    pub line_text: String,
    /// Optional fix hint, rendered only when the host asks for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Additional context lines ("opened on line 3").
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,
}

impl SyntaxError {
    /// Create a diagnostic with the code's default severity and category.
    pub fn new(
        code: ErrorCode,
        line: usize,
        message: impl Into<String>,
        line_text: impl Into<String>,
    ) -> Self {
        Self {
            severity: code.default_severity(),
            category: code.category(),
            code,
            message: message.into(),
            position: ErrorPosition::line(line),
            line_text: line_text.into(),
            suggestion: None,
            notes: Vec::new(),
            doc_url: None,
        }
    }

    /// Override the default severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Narrow the position to a column span on the line.
    pub fn with_columns(mut self, start: usize, end: usize) -> Self {
        self.position.column_start = start;
        self.position.column_end = end;
        self
    }

    /// Record the absolute byte offset into the joined script.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.position.offset = offset;
        self
    }

    /// Attach a fix hint.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach a related-information note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attach a documentation link.
    pub fn with_doc_url(mut self, url: impl Into<String>) -> Self {
        self.doc_url = Some(url.into());
        self
    }

    /// Compact one-to-four-line rendering:
    ///
    /// ```text
    /// error: [RED001] redirection has no target (line 3, col 8)
    ///     suggestion: add a filename after '>'
    /// ```
    ///
    /// Suggestion, notes, and docs lines appear only when
    /// `with_hints` is set.
    pub fn render(&self, with_hints: bool) -> String {
        let mut out = format!("{}: [{}] {}", self.severity, self.code, self.message);
        if self.position.has_column() {
            out.push_str(&format!(
                " (line {}, col {})",
                self.position.line,
                self.position.column_start + 1
            ));
        } else {
            out.push_str(&format!(" (line {})", self.position.line));
        }
        if with_hints {
            if let Some(suggestion) = &self.suggestion {
                out.push_str(&format!("\n    suggestion: {}", suggestion));
            }
            for note in &self.notes {
                out.push_str(&format!("\n    note: {}", note));
            }
            if let Some(url) = &self.doc_url {
                out.push_str(&format!("\n    docs: {}", url));
            }
        }
        out
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_code_defaults() {
        let err = SyntaxError::new(ErrorCode::UnclosedQuote, 3, "unclosed quote", "echo 'oops");
        assert_eq!(err.severity, Severity::Critical);
        assert_eq!(err.category, ErrorCategory::Syntax);
        assert_eq!(err.position.line, 3);
    }

    #[test]
    fn render_without_column() {
        let err = SyntaxError::new(ErrorCode::ForMalformed, 2, "for loop missing 'do'", "for i in a b");
        assert_eq!(err.render(false), "error: [SYN002] for loop missing 'do' (line 2)");
    }

    #[test]
    fn render_with_column_and_hints() {
        let err = SyntaxError::new(ErrorCode::RedirMissingTarget, 1, "redirection has no target", "cat >")
            .with_columns(4, 5)
            .with_suggestion("add a filename after '>'");
        let rendered = err.render(true);
        assert!(rendered.starts_with("error: [RED001] redirection has no target (line 1, col 5)"));
        assert!(rendered.contains("suggestion: add a filename after '>'"));
    }

    #[test]
    fn hints_are_suppressed_when_disabled() {
        let err = SyntaxError::new(ErrorCode::UnclosedConstruct, 1, "unclosed 'if'", "if true; then")
            .with_suggestion("add 'fi'")
            .with_note("'if' opened on line 1");
        let rendered = err.render(false);
        assert!(!rendered.contains("suggestion"));
        assert!(!rendered.contains("note"));
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let err = SyntaxError::new(ErrorCode::LongLine, 1, "line exceeds 100 characters", "x");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("suggestion"));
        assert!(!json.contains("doc_url"));
        assert!(json.contains("\"long_line\""));
    }
}
