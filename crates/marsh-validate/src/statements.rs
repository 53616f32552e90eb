//! Per-line statement shape checks for loops, conditionals, and
//! function declarations.
//!
//! These complement the nesting validator: that pass tracks what is
//! open across lines, this one checks that each header line has the
//! parts it needs, with one line of lookahead so `do`, `then`, or `in`
//! on the following line is accepted.

use marsh_types::{ErrorCode, SyntaxError};

use crate::constructs::{
    analyze_case_syntax, analyze_for_loop_syntax, analyze_if_syntax, analyze_while_until_syntax,
    next_effective_line_starts_with_keyword,
};
use crate::sanitize::extract_trimmed_line;
use crate::scanner::{
    is_valid_identifier_char, is_valid_identifier_start, process_line_for_validation,
    starts_with_keyword_token,
};
use crate::token::tokenize_whitespace;

/// `for`, `while`, and `until` header checks.
pub fn validate_loop_syntax(lines: &[String]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let Some(trimmed) = extract_trimmed_line(line) else {
            continue;
        };
        let parsing = process_line_for_validation(&trimmed);
        let tokens = tokenize_whitespace(parsing);

        if starts_with_keyword_token(parsing, "for") {
            let syntax = analyze_for_loop_syntax(&tokens, parsing);
            if syntax.incomplete {
                errors.push(
                    SyntaxError::new(
                        ErrorCode::ForMalformed,
                        line_no,
                        "'for' statement incomplete",
                        line,
                    )
                    .with_suggestion("Complete for statement: for var in list; do"),
                );
                continue;
            }
            if syntax.missing_iteration_list {
                errors.push(SyntaxError::new(
                    ErrorCode::ForMalformed,
                    line_no,
                    "'for' statement missing iteration list after 'in'",
                    line,
                ));
            }
            if !syntax.missing_in_keyword
                && syntax.missing_do_keyword
                && !next_effective_line_starts_with_keyword(lines, idx, "do")
            {
                errors.push(SyntaxError::new(
                    ErrorCode::ForMalformed,
                    line_no,
                    "'for' statement missing 'do' keyword",
                    line,
                ));
            }
            if syntax.inline_body_without_done {
                errors.push(SyntaxError::new(
                    ErrorCode::ForMalformed,
                    line_no,
                    "'for' loop missing closing 'done' after inline body",
                    line,
                ));
            }
            continue;
        }

        for keyword in ["while", "until"] {
            if !starts_with_keyword_token(parsing, keyword) {
                continue;
            }
            let code = ErrorCode::WhileMalformed;
            let syntax = analyze_while_until_syntax(keyword, parsing, &tokens);
            if syntax.missing_condition && syntax.missing_do_keyword {
                errors.push(SyntaxError::new(
                    code,
                    line_no,
                    format!("'{keyword}' statement missing condition expression and 'do' keyword"),
                    line,
                ));
            } else if syntax.missing_condition {
                errors.push(SyntaxError::new(
                    code,
                    line_no,
                    format!("'{keyword}' loop missing condition expression"),
                    line,
                ));
            }
            if syntax.unclosed_test {
                errors.push(SyntaxError::new(
                    code,
                    line_no,
                    format!("Unclosed test expression in '{keyword}' condition"),
                    line,
                ));
            }
            if !syntax.missing_condition
                && syntax.missing_do_keyword
                && !next_effective_line_starts_with_keyword(lines, idx, "do")
            {
                errors.push(SyntaxError::new(
                    ErrorCode::ForMalformed,
                    line_no,
                    format!("'{keyword}' statement missing 'do' keyword"),
                    line,
                ));
            }
        }
    }

    errors
}

/// `if` and `case` header checks.
pub fn validate_conditional_syntax(lines: &[String]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let Some(trimmed) = extract_trimmed_line(line) else {
            continue;
        };
        let parsing = process_line_for_validation(&trimmed);
        let tokens = tokenize_whitespace(parsing);

        if starts_with_keyword_token(parsing, "if") {
            let syntax = analyze_if_syntax(&tokens, parsing);
            let missing_then = syntax.missing_then_keyword
                && !next_effective_line_starts_with_keyword(lines, idx, "then");
            if missing_then && syntax.missing_condition {
                errors.push(SyntaxError::new(
                    ErrorCode::IfMalformed,
                    line_no,
                    "'if' statement missing condition and 'then' keyword",
                    line,
                ));
            } else if missing_then {
                errors.push(SyntaxError::new(
                    ErrorCode::IfMalformed,
                    line_no,
                    "'if' statement missing 'then' keyword",
                    line,
                ));
            } else if syntax.missing_condition {
                errors.push(SyntaxError::new(
                    ErrorCode::IfMalformed,
                    line_no,
                    "'if' statement missing condition",
                    line,
                ));
            }
            continue;
        }

        if starts_with_keyword_token(parsing, "case") {
            let syntax = analyze_case_syntax(&tokens);
            let in_follows = next_effective_line_starts_with_keyword(lines, idx, "in");
            if syntax.incomplete && !in_follows {
                errors.push(SyntaxError::new(
                    ErrorCode::CaseMalformed,
                    line_no,
                    "'case' statement incomplete",
                    line,
                ));
            } else if syntax.missing_in_keyword && !in_follows {
                errors.push(SyntaxError::new(
                    ErrorCode::CaseMalformed,
                    line_no,
                    "'case' statement missing 'in' keyword",
                    line,
                ));
            }
        }
    }

    errors
}

fn function_name_errors(name: &str, line_no: usize, line: &str) -> Option<SyntaxError> {
    let mut chars = name.chars();
    let first = chars.next()?;
    if !is_valid_identifier_start(first) {
        return Some(SyntaxError::new(
            ErrorCode::InvalidFunctionName,
            line_no,
            format!("Invalid function name '{name}' - must start with letter or underscore"),
            line,
        ));
    }
    for c in chars {
        if !is_valid_identifier_char(c) {
            return Some(SyntaxError::new(
                ErrorCode::InvalidFunctionName,
                line_no,
                format!("Invalid function name '{name}' - contains invalid character '{c}'"),
                line,
            ));
        }
    }
    None
}

/// Function declaration checks, both the `function name` and the
/// `name()` form.
pub fn validate_function_syntax(lines: &[String]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let Some(trimmed) = extract_trimmed_line(line) else {
            continue;
        };
        let parsing = process_line_for_validation(&trimmed);

        if starts_with_keyword_token(parsing, "function") {
            let tokens = tokenize_whitespace(parsing);
            if tokens.len() < 2 || tokens[1] == "{" || tokens[1] == "()" {
                errors.push(SyntaxError::new(
                    ErrorCode::MissingFunctionName,
                    line_no,
                    "Function declaration missing name",
                    line,
                ));
                continue;
            }
            let name = tokens[1].strip_suffix("()").unwrap_or(&tokens[1]);
            errors.extend(function_name_errors(name, line_no, line));
            continue;
        }

        if let Some(pos) = parsing.find("()") {
            if pos == 0 {
                continue;
            }
            let rest = parsing[pos + 2..].trim_start();
            if !rest.is_empty() && !rest.starts_with('{') {
                continue;
            }
            let name = parsing[..pos].split_whitespace().next_back().unwrap_or("");
            if name.is_empty() || parsing[..pos].trim_end().len() != parsing[..pos].len() {
                continue;
            }
            errors.extend(function_name_errors(name, line_no, line));
        }
    }

    errors
}
