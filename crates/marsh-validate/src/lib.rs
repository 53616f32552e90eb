//! marsh-validate: pre-execution validation for marsh scripts.
//!
//! This crate provides:
//!
//! - **Scanner**: quote/escape-aware character walking shared by every pass
//! - **Sanitizer**: command-substitution blanking so inner text cannot
//!   confuse outer-construct analysis
//! - **Control flow**: the `if`/`for`/`while`/`case` nesting validator
//! - **Statement checks**: per-line loop, conditional, and function shape
//! - **Redirections**: file redirections, pipelines, and here-documents
//! - **Expansions**: arithmetic, command substitution, parameter expansion,
//!   and array literals
//! - **Variables**: whole-script definition/use analysis
//!
//! The engine never executes anything. It answers two questions: is this
//! script safe to hand to the interpreter, and is the user mid-construct
//! and owed a continuation prompt.

pub mod constructs;
pub mod control_flow;
pub mod expansions;
pub mod posix;
pub mod redirection;
pub mod report;
pub mod sanitize;
pub mod scanner;
pub mod statements;
pub mod style;
pub mod token;
pub mod variables;

use std::collections::HashSet;

use tracing::debug;

pub use marsh_types::{ErrorCategory, ErrorCode, ErrorPosition, Severity, SyntaxError};
pub use report::ValidationReport;

/// Validation settings, fixed for the lifetime of a [`Validator`].
///
/// There is no global state: two validators with different configs can
/// run side by side over the same lines.
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    /// Reject shell extensions (`[[`, arrays, `function`, ...) with
    /// `POSIX*` diagnostics.
    pub posix_mode: bool,
    /// Include suggestion / note / docs lines when rendering a report.
    /// Analysis is unaffected.
    pub suggestions_enabled: bool,
    /// Run the opt-in style pass (`STYLE*` diagnostics).
    pub check_style: bool,
}

impl ValidatorConfig {
    /// Config with suggestions on, the usual interactive setup.
    pub fn interactive() -> Self {
        Self { suggestions_enabled: true, ..Self::default() }
    }
}

/// Answers "is this variable set outside the script" for the
/// used-but-undefined check.
pub trait VariableScope {
    fn is_set(&self, name: &str) -> bool;
}

/// [`VariableScope`] backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvScope;

impl VariableScope for EnvScope {
    fn is_set(&self, name: &str) -> bool {
        std::env::var_os(name).is_some()
    }
}

/// [`VariableScope`] backed by an explicit name set. Used by hosts that
/// track shell-local variables themselves, and by tests.
#[derive(Debug, Clone, Default)]
pub struct SetScope {
    names: HashSet<String>,
}

impl SetScope {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { names: names.into_iter().map(Into::into).collect() }
    }
}

impl VariableScope for SetScope {
    fn is_set(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// The validation engine.
pub struct Validator<S = EnvScope> {
    config: ValidatorConfig,
    scope: S,
}

impl Validator<EnvScope> {
    /// Validator that consults the process environment for variable
    /// existence.
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config, scope: EnvScope }
    }
}

impl<S: VariableScope> Validator<S> {
    /// Validator with an explicit variable scope.
    pub fn with_scope(config: ValidatorConfig, scope: S) -> Self {
        Self { config, scope }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Run every pass over `lines` and collect the diagnostics.
    ///
    /// Diagnostics are ordered by (line, column) with a stable sort, so
    /// same-position diagnostics keep pass order and repeated runs over
    /// the same input produce identical reports.
    pub fn validate(&self, lines: &[String]) -> ValidationReport {
        debug!(lines = lines.len(), posix = self.config.posix_mode, "validating script");

        let mut errors = control_flow::validate_control_flow(lines);
        errors.extend(variables::validate_variable_usage(lines, &self.scope));
        errors.extend(redirection::validate_redirections(lines));
        errors.extend(expansions::validate_arithmetic(lines));
        errors.extend(expansions::validate_expansions(lines));
        errors.extend(redirection::validate_pipelines(lines));
        errors.extend(statements::validate_function_syntax(lines));
        errors.extend(statements::validate_loop_syntax(lines));
        errors.extend(statements::validate_conditional_syntax(lines));
        errors.extend(expansions::validate_arrays(lines, self.config.posix_mode));
        errors.extend(redirection::validate_heredocs(lines));

        if self.config.posix_mode {
            errors.extend(posix::validate_posix_compliance(lines));
        }

        if self.config.check_style {
            errors.extend(style::check_style_guidelines(lines));
        }

        // Absolute byte offsets into the newline-joined script.
        let mut line_starts = Vec::with_capacity(lines.len());
        let mut next = 0usize;
        for line in lines {
            line_starts.push(next);
            next += line.len() + 1;
        }
        let mut errors: Vec<SyntaxError> = errors
            .into_iter()
            .map(|e| {
                let base = line_starts
                    .get(e.position.line.saturating_sub(1))
                    .copied()
                    .unwrap_or(0);
                let column = e.position.column_start;
                e.with_offset(base + column)
            })
            .collect();

        errors.sort_by_key(|e| (e.position.line, e.position.column_start));
        ValidationReport::new(errors, self.config.posix_mode)
    }

    /// True when the script stops mid-construct: an unclosed quote,
    /// substitution, expansion, heredoc, or any control-flow frame still
    /// open at the end, including a header whose `then`/`do`/`in` has
    /// not arrived yet. Drives the interactive continuation prompt.
    ///
    /// Style, variable-hygiene, and POSIX diagnostics never make this
    /// true: a complete-but-wrong script reports errors instead of
    /// prompting.
    pub fn needs_additional_input(&self, lines: &[String]) -> bool {
        if control_flow::has_open_construct(lines) {
            debug!(incomplete = true, "continuation check");
            return true;
        }

        let mut errors = expansions::validate_arithmetic(lines);
        errors.extend(expansions::validate_expansions(lines));
        errors.extend(expansions::validate_arrays(lines, false));
        errors.extend(redirection::validate_heredocs(lines));
        errors.extend(variables::validate_variable_usage(lines, &self.scope));

        let incomplete = errors.iter().any(|e| e.code.signals_incomplete_input());
        debug!(incomplete, "continuation check");
        incomplete
    }
}
