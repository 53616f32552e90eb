//! Severity levels and diagnostic categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity level for a diagnostic.
///
/// Ordered from least to most severe, so `>=` comparisons work the
/// obvious way (`severity >= Severity::Error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; never affects execution.
    Info,
    /// Advisory; execution proceeds.
    Warning,
    /// A real problem; may block execution depending on the code.
    Error,
    /// The script cannot be meaningfully interpreted past this point.
    Critical,
}

impl Severity {
    /// Prefix used when rendering a diagnostic, e.g. `error:`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Broad grouping of diagnostics for filtering and tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Quoting, substitutions, operators, general shape of a line.
    Syntax,
    /// `if`/`for`/`while`/`case` nesting and pairing.
    ControlFlow,
    /// File redirections, pipes, and here-documents.
    Redirection,
    /// Variable definition, use, and expansion.
    Variables,
    /// Command words and function definitions.
    Commands,
    /// Problems that are well-formed but meaningless (e.g. `/ 0`).
    Semantics,
    /// Cosmetic issues that never affect execution.
    Style,
    /// Constructs likely to be slow; currently unused by the engine.
    Performance,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Syntax => "syntax",
            ErrorCategory::ControlFlow => "control-flow",
            ErrorCategory::Redirection => "redirection",
            ErrorCategory::Variables => "variables",
            ErrorCategory::Commands => "commands",
            ErrorCategory::Semantics => "semantics",
            ErrorCategory::Style => "style",
            ErrorCategory::Performance => "performance",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn severity_prefixes() {
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!(Severity::Info.to_string(), "info");
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCategory::ControlFlow).unwrap();
        assert_eq!(json, "\"control_flow\"");
    }
}
