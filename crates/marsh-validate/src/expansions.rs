//! Arithmetic expansion, command substitution, assignment, and array
//! literal checks.

use marsh_types::{ErrorCode, SyntaxError};

use crate::sanitize::{extract_trimmed_line, find_closing_backtick, find_closing_paren};
use crate::scanner::{
    is_valid_identifier, is_valid_identifier_char, is_valid_identifier_start, should_process_char,
    strip_inline_comment, QuoteState, ScanFlags,
};
use crate::token::{is_assignment_token, tokenize_whitespace};

const ARITH_OPERATORS: [char; 8] = ['+', '-', '*', '/', '%', '&', '|', '^'];

/// End index of the second `)` closing a `$((` that starts at `start`,
/// or `None` when the line ends first.
fn arithmetic_close(line: &str, start: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut depth = 2usize;
    let mut i = start + 3;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn check_arithmetic_expression(
    expr: &str,
    line_no: usize,
    line: &str,
    errors: &mut Vec<SyntaxError>,
) {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        errors.push(SyntaxError::new(
            ErrorCode::EmptyArithmetic,
            line_no,
            "Empty arithmetic expression",
            line,
        ));
        return;
    }

    let last = trimmed.chars().next_back();
    let increments = trimmed.ends_with("++") || trimmed.ends_with("--");
    if !increments && last.is_some_and(|c| ARITH_OPERATORS.contains(&c)) {
        errors.push(SyntaxError::new(
            ErrorCode::TrailingArithOperator,
            line_no,
            "Incomplete arithmetic expression - missing operand",
            line,
        ));
    }

    if ["/0", "/ 0", "%0", "% 0"].iter().any(|p| trimmed.contains(p)) {
        errors.push(SyntaxError::new(
            ErrorCode::DivisionByZero,
            line_no,
            "Potential division by zero",
            line,
        ));
    }

    let opens = trimmed.matches('(').count();
    let closes = trimmed.matches(')').count();
    if opens != closes {
        errors.push(SyntaxError::new(
            ErrorCode::UnbalancedArithParens,
            line_no,
            "Unbalanced parentheses in arithmetic expression",
            line,
        ));
    }
}

/// `$((...))` and `$[...]` checks.
pub fn validate_arithmetic(lines: &[String]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if extract_trimmed_line(line).is_none() {
            continue;
        }
        let text = strip_inline_comment(line);
        let bytes = text.as_bytes();

        let mut state = QuoteState::default();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if !should_process_char(&mut state, c, ScanFlags::skip_single_quoted()) {
                i += 1;
                continue;
            }
            if c != '$' {
                i += 1;
                continue;
            }

            if text[i..].starts_with("$((") {
                match arithmetic_close(text, i) {
                    Some(close) => {
                        // `close` is the outer `)`; the inner `)` may not
                        // sit right before it, so strip it char-safely and
                        // let anything else between the two reach the
                        // expression checks.
                        let interior = &text[i + 3..close];
                        let interior = interior.strip_suffix(')').unwrap_or(interior);
                        check_arithmetic_expression(interior, line_no, line, &mut errors);
                        i = close + 1;
                    }
                    None => {
                        errors.push(
                            SyntaxError::new(
                                ErrorCode::UnclosedArithmetic,
                                line_no,
                                "Unclosed arithmetic expansion $((",
                                line,
                            )
                            .with_suggestion("Add closing ))")
                            .with_columns(i, i + 3),
                        );
                        break;
                    }
                }
                continue;
            }

            if text[i..].starts_with("$[") {
                errors.push(
                    SyntaxError::new(
                        ErrorCode::DeprecatedArithSyntax,
                        line_no,
                        "Deprecated arithmetic syntax $[...], use $((...))",
                        line,
                    )
                    .with_columns(i, i + 2),
                );
                i += 2;
                continue;
            }

            i += 1;
        }
    }

    errors
}

fn array_index_issue(index: &str) -> Option<String> {
    if index.is_empty() {
        return Some("Empty array index".to_string());
    }
    if index.chars().any(char::is_whitespace) {
        return Some("Whitespace in array index".to_string());
    }
    index
        .chars()
        .find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '*' | '/' | '%' | '(' | ')' | '$')))
        .map(|c| format!("Invalid character '{c}' in array index"))
}

fn check_assignment_lhs(
    token: &str,
    line_no: usize,
    line: &str,
    errors: &mut Vec<SyntaxError>,
) {
    let Some(eq) = token.find('=') else { return };
    let lhs = &token[..eq];
    let lhs = lhs.strip_suffix('+').unwrap_or(lhs);

    if let Some(bracket) = lhs.find('[') {
        let name = &lhs[..bracket];
        if is_valid_identifier(name) && lhs.ends_with(']') {
            let index = &lhs[bracket + 1..lhs.len() - 1];
            if let Some(issue) = array_index_issue(index) {
                errors.push(SyntaxError::new(
                    ErrorCode::InvalidAssignment,
                    line_no,
                    format!("{issue} for array '{name}'"),
                    line,
                ));
            }
            return;
        }
    }

    if lhs.is_empty() || is_valid_identifier(lhs) {
        return;
    }
    let message = if !lhs.starts_with(is_valid_identifier_start) {
        format!("Invalid variable name '{lhs}' - must start with letter or underscore")
    } else {
        let bad = lhs
            .chars()
            .find(|&c| !is_valid_identifier_char(c))
            .unwrap_or('?');
        format!("Invalid variable name '{lhs}' - contains invalid character '{bad}'")
    };
    errors.push(SyntaxError::new(ErrorCode::InvalidVariableName, line_no, message, line));
}

const ASSIGNMENT_BUILTINS: [&str; 5] = ["export", "local", "declare", "readonly", "alias"];
const SPACED_EQUALS_EXEMPT: [&str; 5] = ["[", "[[", "test", "let", "expr"];

/// Command substitution and assignment checks.
pub fn validate_expansions(lines: &[String]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if extract_trimmed_line(line).is_none() {
            continue;
        }
        let text = strip_inline_comment(line);
        let bytes = text.as_bytes();

        let mut state = QuoteState::default();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if !should_process_char(&mut state, c, ScanFlags::skip_single_quoted()) {
                i += 1;
                continue;
            }

            if c == '$' && text[i..].starts_with("$(") && !text[i..].starts_with("$((") {
                match find_closing_paren(text, i + 2) {
                    Some(close) => i = close + 1,
                    None => {
                        errors.push(
                            SyntaxError::new(
                                ErrorCode::UnclosedCommandSub,
                                line_no,
                                "Unclosed command substitution $() - missing ')'",
                                line,
                            )
                            .with_suggestion("Add closing parenthesis")
                            .with_columns(i, i + 2),
                        );
                        break;
                    }
                }
                continue;
            }

            if c == '`' && !state.in_quotes {
                match find_closing_backtick(text, i + 1) {
                    Some(close) => i = close + 1,
                    None => {
                        errors.push(
                            SyntaxError::new(
                                ErrorCode::UnclosedBacktick,
                                line_no,
                                "Unclosed backtick command substitution - missing '`'",
                                line,
                            )
                            .with_columns(i, i + 1),
                        );
                        break;
                    }
                }
                continue;
            }

            i += 1;
        }

        // Assignment shape checks work on the leading words of the line.
        let parsing = text.trim();
        let tokens = tokenize_whitespace(parsing);
        let Some(first) = tokens.first() else { continue };

        if ASSIGNMENT_BUILTINS.contains(&first.as_str()) {
            for token in tokens.iter().skip(1) {
                if token.starts_with('-') {
                    continue;
                }
                if is_assignment_token(token) {
                    check_assignment_lhs(token, line_no, line, &mut errors);
                } else {
                    break;
                }
            }
            continue;
        }

        if SPACED_EQUALS_EXEMPT.contains(&first.as_str()) {
            continue;
        }

        if tokens.len() >= 2
            && is_valid_identifier(first)
            && tokens[1].starts_with('=')
            && !tokens[1].starts_with("==")
        {
            errors.push(SyntaxError::new(
                ErrorCode::InvalidAssignment,
                line_no,
                "Variable assignment cannot have spaces around '='",
                line,
            ));
            continue;
        }

        if is_assignment_token(first) {
            check_assignment_lhs(first, line_no, line, &mut errors);
        }
    }

    errors
}

/// Array literal checks. In POSIX mode any `name=(...)` is rejected
/// outright; otherwise the literal must close on its opening line.
pub fn validate_arrays(lines: &[String], posix_mode: bool) -> Vec<SyntaxError> {
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if extract_trimmed_line(line).is_none() {
            continue;
        }
        let text = strip_inline_comment(line);
        let bytes = text.as_bytes();

        let mut state = QuoteState::default();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if !should_process_char(&mut state, c, ScanFlags::skip_single_quoted()) {
                i += 1;
                continue;
            }
            if c != '(' {
                i += 1;
                continue;
            }

            let mut j = i;
            while j > 0 && (bytes[j - 1] == b' ' || bytes[j - 1] == b'\t') {
                j -= 1;
            }
            if j == 0 || bytes[j - 1] != b'=' {
                i += 1;
                continue;
            }

            if posix_mode {
                errors.push(
                    SyntaxError::new(
                        ErrorCode::PosixArray,
                        line_no,
                        "Arrays are disabled in POSIX mode",
                        line,
                    )
                    .with_suggestion("Use separate scalar variables or positional parameters")
                    .with_columns(i, i + 1),
                );
                break;
            }

            match find_closing_paren(text, i + 1) {
                Some(close) => i = close + 1,
                None => {
                    errors.push(
                        SyntaxError::new(
                            ErrorCode::UnclosedArrayLiteral,
                            line_no,
                            "Unclosed array declaration - missing ')'",
                            line,
                        )
                        .with_columns(i, i + 1),
                    );
                    break;
                }
            }
        }
    }

    errors
}
