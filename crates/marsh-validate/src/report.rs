//! The collected outcome of a validation run.

use marsh_types::{ErrorCode, Severity, SyntaxError};
use serde::Serialize;

/// All diagnostics from one run, ordered by position.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    errors: Vec<SyntaxError>,
    posix_mode: bool,
}

impl ValidationReport {
    pub fn new(errors: Vec<SyntaxError>, posix_mode: bool) -> Self {
        Self { errors, posix_mode }
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<SyntaxError> {
        self.errors
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.errors.iter().filter(|e| e.severity >= severity).count()
    }

    /// Whether the script should be refused execution.
    ///
    /// Blocking means: a structural missing-keyword error, any POSIX
    /// compliance error while POSIX mode is active, or any critical
    /// diagnostic other than the advisory unclosed-brace-group one.
    pub fn has_blocking_errors(&self) -> bool {
        self.errors.iter().any(|e| {
            e.code.is_structural()
                || (self.posix_mode && e.code.is_posix())
                || (e.severity == Severity::Critical && e.code != ErrorCode::UnclosedBraceGroup)
        })
    }

    /// Multi-line human rendering; hints are included when the host
    /// enables suggestions.
    pub fn render(&self, with_hints: bool) -> String {
        self.errors
            .iter()
            .map(|e| e.render(with_hints))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(code: ErrorCode) -> SyntaxError {
        SyntaxError::new(code, 1, "test diagnostic", "line")
    }

    #[test]
    fn critical_errors_block() {
        let report = ValidationReport::new(vec![error(ErrorCode::UnclosedQuote)], false);
        assert!(report.has_blocking_errors());
    }

    #[test]
    fn structural_errors_block_at_error_severity() {
        let report = ValidationReport::new(vec![error(ErrorCode::ForMalformed)], false);
        assert!(report.has_blocking_errors());
    }

    #[test]
    fn advisory_brace_group_does_not_block() {
        let report = ValidationReport::new(
            vec![error(ErrorCode::UnclosedBraceGroup).with_severity(Severity::Critical)],
            false,
        );
        assert!(!report.has_blocking_errors());
    }

    #[test]
    fn redirection_errors_report_but_do_not_block() {
        let report = ValidationReport::new(vec![error(ErrorCode::RedirMissingTarget)], false);
        assert!(!report.is_clean());
        assert!(!report.has_blocking_errors());
    }

    #[test]
    fn posix_errors_block_only_in_posix_mode() {
        let errors = vec![error(ErrorCode::PosixExtendedTest)];
        assert!(ValidationReport::new(errors.clone(), true).has_blocking_errors());
        assert!(!ValidationReport::new(errors, false).has_blocking_errors());
    }

    #[test]
    fn severity_counting() {
        let report = ValidationReport::new(
            vec![error(ErrorCode::VarDefinedNotUsed), error(ErrorCode::RedirMissingTarget)],
            false,
        );
        assert_eq!(report.count_at_least(Severity::Error), 1);
        assert_eq!(report.count_at_least(Severity::Info), 2);
    }

    #[test]
    fn report_serializes_for_host_tooling() {
        let report = ValidationReport::new(vec![error(ErrorCode::UnclosedQuote)], false);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"unclosed_quote\""), "got {json}");
        assert!(json.contains("\"posix_mode\":false"), "got {json}");
    }

    #[test]
    fn render_joins_lines() {
        let report = ValidationReport::new(
            vec![error(ErrorCode::UnclosedQuote), error(ErrorCode::RedirMissingTarget)],
            false,
        );
        assert_eq!(report.render(false).lines().count(), 2);
    }
}
