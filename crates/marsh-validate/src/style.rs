//! Opt-in style checks. Everything here is advisory and never blocks
//! execution.

use marsh_types::{ErrorCode, SyntaxError};

use crate::sanitize::extract_trimmed_line;
use crate::scanner::{should_process_char, QuoteState, ScanFlags};
use crate::token::tokenize_whitespace;

const MAX_LINE_LENGTH: usize = 100;
const MAX_LOGICAL_OPERATORS: usize = 3;
const MAX_TEST_DEPTH: usize = 2;
const INDENT_WINDOW: usize = 20;

fn condition_metrics(line: &str) -> (usize, usize) {
    let bytes = line.as_bytes();
    let mut state = QuoteState::default();
    let mut operators = 0;
    let mut depth = 0usize;
    let mut max_depth = 0;

    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if !should_process_char(&mut state, c, ScanFlags::structural()) || state.in_quotes {
            i += 1;
            continue;
        }
        match c {
            '&' | '|' if bytes.get(i + 1) == Some(&(c as u8)) => {
                operators += 1;
                i += 2;
                continue;
            }
            '[' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    (operators, max_depth)
}

pub fn check_style_guidelines(lines: &[String]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;

        if line.len() > MAX_LINE_LENGTH {
            errors.push(
                SyntaxError::new(
                    ErrorCode::LongLine,
                    line_no,
                    format!(
                        "Line length ({} chars) exceeds recommended {MAX_LINE_LENGTH} characters",
                        line.len()
                    ),
                    line,
                )
                .with_columns(MAX_LINE_LENGTH, line.len()),
            );
        }

        let indent: String = line
            .chars()
            .take(INDENT_WINDOW)
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        if indent.contains('\t') && indent.contains(' ') {
            errors.push(SyntaxError::new(
                ErrorCode::MixedIndentation,
                line_no,
                "Mixed tabs and spaces for indentation",
                line,
            ));
        }

        let Some(trimmed) = extract_trimmed_line(line) else {
            continue;
        };

        if trimmed.contains("eval ") || trimmed.contains("$(") {
            errors.push(SyntaxError::new(
                ErrorCode::UnsafeEval,
                line_no,
                "Use of eval/command substitution - potential security risk",
                line,
            ));
        }

        let tokens = tokenize_whitespace(&trimmed);
        if !matches!(
            tokens.first().map(String::as_str),
            Some("if" | "elif" | "while" | "until")
        ) {
            continue;
        }

        let (operators, depth) = condition_metrics(&trimmed);
        if operators > MAX_LOGICAL_OPERATORS {
            errors.push(SyntaxError::new(
                ErrorCode::ComplexCondition,
                line_no,
                format!("Complex condition with {operators} logical operators"),
                line,
            ));
        }
        if depth > MAX_TEST_DEPTH {
            errors.push(SyntaxError::new(
                ErrorCode::DeeplyNestedTest,
                line_no,
                format!("Deeply nested test conditions (depth: {depth})"),
                line,
            ));
        }
    }

    errors
}
