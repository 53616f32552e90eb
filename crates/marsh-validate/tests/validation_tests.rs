//! Integration tests for the validation engine.
//!
//! These tests run whole scripts through [`Validator`] and check the
//! report surface: which scripts are clean, which diagnostics block
//! execution, and when the engine asks for continuation input instead
//! of reporting.

use proptest::prelude::*;
use rstest::rstest;

use marsh_validate::{ErrorCode, SetScope, Severity, Validator, ValidatorConfig};

fn lines(script: &[&str]) -> Vec<String> {
    script.iter().map(|s| s.to_string()).collect()
}

/// Validator with an empty variable scope, so results do not depend on
/// the test process environment.
fn validator() -> Validator<SetScope> {
    Validator::with_scope(ValidatorConfig::default(), SetScope::default())
}

fn posix_validator() -> Validator<SetScope> {
    let config = ValidatorConfig { posix_mode: true, ..ValidatorConfig::default() };
    Validator::with_scope(config, SetScope::default())
}

// ============================================================================
// Clean scripts
// ============================================================================

#[test]
fn realistic_script_with_every_construct_is_clean() {
    let script = lines(&[
        "#!/bin/sh",
        "# deployment helper",
        "target=local",
        "log_file=deploy.log",
        "",
        "prepare() {",
        "    echo \"preparing $target\" >> \"$log_file\"",
        "}",
        "",
        "if [ \"$target\" = \"local\" ]; then",
        "    prepare",
        "elif [ -n \"$target\" ]; then",
        "    echo \"remote: $target\"",
        "else",
        "    echo \"no target\"",
        "fi",
        "",
        "for step in build test package; do",
        "    echo \"$step\"",
        "done",
        "",
        "case $target in",
        "    local) echo here ;;",
        "    *) echo elsewhere ;;",
        "esac",
        "",
        "while read -r line; do",
        "    echo \"$line\"",
        "done < deploy.log",
        "",
        "cat <<EOF >> \"$log_file\"",
        "finished",
        "EOF",
    ]);

    let v = validator();
    let report = v.validate(&script);
    assert!(report.is_clean(), "unexpected diagnostics: {:?}", report.errors());
    assert!(!v.needs_additional_input(&script), "complete script should not prompt");
}

#[rstest]
#[case::inline_if("if true; then echo y; fi")]
#[case::inline_while("while true; do break; done")]
#[case::inline_for("for i in 1 2; do echo $i; done")]
#[case::inline_case("case x in a) ;; esac")]
#[case::subshell_keywords("result=$(if true; then echo y; fi) && echo \"$result\"")]
fn complete_one_liners_are_clean(#[case] line: &str) {
    let report = validator().validate(&lines(&[line]));
    assert!(report.is_clean(), "{line:?} gave {:?}", report.errors());
}

// ============================================================================
// Blocking diagnostics
// ============================================================================

#[test]
fn unclosed_quote_yields_one_critical_blocking_error() {
    let script = lines(&["echo ok", "x=1", "echo 'never closed"]);
    let report = validator().validate(&script);

    assert_eq!(report.errors().len(), 1, "got {:?}", report.errors());
    let err = &report.errors()[0];
    assert_eq!(err.code, ErrorCode::UnclosedQuote);
    assert_eq!(err.code.code(), "SYN001");
    assert_eq!(err.severity, Severity::Critical);
    assert_eq!(err.position.line, 3);
    assert!(report.has_blocking_errors(), "unclosed quote must block");
}

#[rstest]
#[case::stray_fi(&["fi"], ErrorCode::KeywordMismatch)]
#[case::stray_done(&["done"], ErrorCode::KeywordMismatch)]
#[case::for_without_in(&["for do done"], ErrorCode::ForMalformed)]
#[case::unclosed_backtick(&["echo `date"], ErrorCode::UnclosedBacktick)]
#[case::unclosed_subst(&["echo $(date"], ErrorCode::UnclosedCommandSub)]
fn structural_and_critical_problems_block(
    #[case] script: &[&str],
    #[case] expected: ErrorCode,
) {
    let report = validator().validate(&lines(script));
    assert!(
        report.errors().iter().any(|e| e.code == expected),
        "{script:?} should report {expected:?}, got {:?}",
        report.errors()
    );
    assert!(report.has_blocking_errors(), "{script:?} should block execution");
}

#[rstest]
#[case::missing_target(&["echo >"], ErrorCode::RedirMissingTarget)]
#[case::bad_descriptor(&["ls 2>&x"], ErrorCode::BadFdDuplication)]
#[case::operator_target(&["echo > |"], ErrorCode::RedirTargetIsOperator)]
#[case::unused_variable(&["unused=1"], ErrorCode::VarDefinedNotUsed)]
#[case::undefined_variable(&["echo \"$missing\""], ErrorCode::VarUsedNotDefined)]
fn advisory_problems_report_without_blocking(
    #[case] script: &[&str],
    #[case] expected: ErrorCode,
) {
    let report = validator().validate(&lines(script));
    assert!(
        report.errors().iter().any(|e| e.code == expected),
        "{script:?} should report {expected:?}, got {:?}",
        report.errors()
    );
    assert!(
        !report.has_blocking_errors(),
        "{script:?} should not block: {:?}",
        report.errors()
    );
}

// ============================================================================
// Continuation prompting
// ============================================================================

#[rstest]
#[case::open_quote(&["echo 'still going"], true)]
#[case::open_if(&["if true; then"], true)]
#[case::bare_if_header(&["if true"], true)]
#[case::bare_while_header(&["while true"], true)]
#[case::bare_case_header(&["case $x"], true)]
#[case::open_loop(&["for f in a b; do"], true)]
#[case::open_subst(&["echo $("], true)]
#[case::open_param_expansion(&["echo ${name"], true)]
#[case::open_heredoc(&["cat <<EOF", "body"], true)]
#[case::open_array(&["files=(a b"], true)]
#[case::closed_if(&["if true; then", ":", "fi"], false)]
#[case::closed_subst(&["echo $(date)"], false)]
#[case::closed_heredoc(&["cat <<EOF", "body", "EOF"], false)]
#[case::closed_array(&["files=(a b)"], false)]
fn continuation_prompt_follows_open_constructs(#[case] script: &[&str], #[case] wants_more: bool) {
    assert_eq!(
        validator().needs_additional_input(&lines(script)),
        wants_more,
        "continuation for {script:?}"
    );
}

#[test]
fn complete_but_invalid_script_reports_instead_of_prompting() {
    let script = lines(&["for do done", "fi"]);
    let v = validator();
    assert!(!v.needs_additional_input(&script));
    assert!(!v.validate(&script).is_clean());
}

#[test]
fn multibyte_text_validates_without_losing_diagnostics() {
    let script = lines(&[
        "# résumé",
        "greeting='héllo'",
        "echo \"$greeting\"",
        "x=$((1+1)é)",
        "echo \"$x\"",
    ]);
    let v = validator();
    let report = v.validate(&script);
    assert_eq!(report.errors().len(), 1, "got {:?}", report.errors());
    assert_eq!(report.errors()[0].code, ErrorCode::UnbalancedArithParens);
    assert_eq!(report.errors()[0].position.line, 4);
    assert!(!v.needs_additional_input(&script));
}

// ============================================================================
// Variable scope
// ============================================================================

#[test]
fn host_scope_suppresses_undefined_variable_warnings() {
    let script = lines(&["echo \"$DEPLOY_ENV\""]);

    let bare = validator().validate(&script);
    assert!(
        bare.errors().iter().any(|e| e.code == ErrorCode::VarUsedNotDefined),
        "got {:?}",
        bare.errors()
    );

    let scoped = Validator::with_scope(
        ValidatorConfig::default(),
        SetScope::new(["DEPLOY_ENV"]),
    );
    let report = scoped.validate(&script);
    assert!(report.is_clean(), "scoped run gave {:?}", report.errors());
}

// ============================================================================
// POSIX mode and style gating
// ============================================================================

#[test]
fn posix_checks_run_and_block_only_in_posix_mode() {
    let script = lines(&["if [[ -f x ]]; then", "    echo x", "fi"]);

    let relaxed = validator().validate(&script);
    assert!(relaxed.is_clean(), "got {:?}", relaxed.errors());

    let strict = posix_validator().validate(&script);
    assert!(strict.errors().iter().any(|e| e.code == ErrorCode::PosixExtendedTest));
    assert!(strict.has_blocking_errors(), "POSIX violations block in POSIX mode");
}

#[test]
fn posix_mode_rejects_array_literals() {
    let script = lines(&["files=(a b c)", "echo \"$files\""]);
    let report = posix_validator().validate(&script);
    assert!(
        report.errors().iter().any(|e| e.code == ErrorCode::PosixArray),
        "got {:?}",
        report.errors()
    );
}

#[test]
fn style_pass_is_opt_in_and_never_blocks() {
    let long = format!("echo {}", "x".repeat(120));
    let script = lines(&[long.as_str()]);

    assert!(validator().validate(&script).is_clean());

    let config = ValidatorConfig { check_style: true, ..ValidatorConfig::default() };
    let report = Validator::with_scope(config, SetScope::default()).validate(&script);
    assert!(report.errors().iter().any(|e| e.code == ErrorCode::LongLine));
    assert!(!report.has_blocking_errors());
}

// ============================================================================
// Report surface
// ============================================================================

#[test]
fn rendering_includes_hints_only_on_request() {
    let report = validator().validate(&lines(&["if true; then"]));
    let err = &report.errors()[0];
    let hint = err.suggestion.as_deref().unwrap_or("");
    assert!(!hint.is_empty(), "unclosed construct should carry a suggestion");

    assert!(report.render(true).contains(hint));
    assert!(!report.render(false).contains(hint));
}

#[test]
fn diagnostics_are_ordered_by_line() {
    let script = lines(&["echo >", "ok=1", "echo $(", "echo \"$ok\""]);
    let report = validator().validate(&script);
    assert!(report.errors().len() >= 2, "got {:?}", report.errors());

    let positions: Vec<usize> = report.errors().iter().map(|e| e.position.line).collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "diagnostics out of order: {positions:?}");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Arbitrary printable input never panics and always produces the
    /// same report twice.
    #[test]
    fn validation_is_total_and_deterministic(
        script in proptest::collection::vec("[ -~]{0,60}", 0..8)
    ) {
        let v = validator();
        let first = v.validate(&script);
        let second = v.validate(&script);
        prop_assert_eq!(first.errors(), second.errors());

        let wants_first = v.needs_additional_input(&script);
        let wants_second = v.needs_additional_input(&script);
        prop_assert_eq!(wants_first, wants_second);
    }

    /// A define-then-use pair is clean for any valid identifier.
    #[test]
    fn assignment_and_use_round_trip_is_clean(
        name in "[a-z_][a-z0-9_]{0,8}",
        value in "[a-zA-Z0-9]{1,8}",
    ) {
        let script = vec![
            format!("{name}={value}"),
            format!("echo \"${{{name}}}\""),
        ];
        let report = validator().validate(&script);
        prop_assert!(report.is_clean(), "{:?} gave {:?}", script, report.errors());
    }
}
