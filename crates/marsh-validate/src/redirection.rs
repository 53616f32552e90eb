//! Redirection, pipeline, and here-document checks.

use marsh_types::{ErrorCode, SyntaxError};

use crate::sanitize::extract_trimmed_line;
use crate::scanner::{should_process_char, strip_inline_comment, QuoteState, ScanFlags};

const GT_OPS: [&str; 4] = [">>", ">&", ">|", ">"];
const LT_OPS: [&str; 4] = ["<<<", "<<", "<&", "<"];

fn redirection_op(text: &str) -> &str {
    let ops: &[&str] = if text.starts_with('>') { &GT_OPS } else { &LT_OPS };
    for op in ops {
        if text.starts_with(op) {
            return op;
        }
    }
    &text[..1]
}

fn skip_spaces(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

/// End of the redirection target word starting at `i`. Quote-aware, so
/// `> "a b"` is one target.
fn target_end(bytes: &[u8], mut i: usize) -> usize {
    let mut state = QuoteState::default();
    while i < bytes.len() {
        let c = bytes[i] as char;
        let effective = should_process_char(&mut state, c, ScanFlags::default());
        if effective
            && !state.in_quotes
            && (c.is_ascii_whitespace() || matches!(c, ';' | '|' | '&'))
        {
            break;
        }
        i += 1;
    }
    i
}

/// File redirection checks: missing targets, bad descriptor
/// duplications, doubled operators, and pipes with nothing after them.
pub fn validate_redirections(lines: &[String]) -> Vec<SyntaxError> {
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
            if !should_process_char(&mut state, c, ScanFlags::default()) || state.in_quotes {
                i += 1;
                continue;
            }

            if c == '|' {
                if bytes.get(i + 1) == Some(&b'|') {
                    i += 2;
                    continue;
                }
                let j = skip_spaces(bytes, i + 1);
                if j >= bytes.len() || bytes[j] == b'|' || bytes[j] == b'&' {
                    errors.push(
                        SyntaxError::new(
                            ErrorCode::EmptyPipelineSegment,
                            line_no,
                            "Pipe missing command after '|'",
                            line,
                        )
                        .with_columns(i, i + 1),
                    );
                }
                i += 1;
                continue;
            }

            if c != '>' && c != '<' {
                i += 1;
                continue;
            }

            let op = redirection_op(&text[i..]);
            let op_start = i;
            i += op.len();
            let j = skip_spaces(bytes, i);

            if j >= bytes.len() {
                let err = if op == "<<" {
                    SyntaxError::new(
                        ErrorCode::HeredocMissingDelimiter,
                        line_no,
                        "Here document missing delimiter",
                        line,
                    )
                } else {
                    SyntaxError::new(
                        ErrorCode::RedirMissingTarget,
                        line_no,
                        format!("Redirection '{op}' missing target"),
                        line,
                    )
                    .with_suggestion(format!("Add filename or file descriptor after {op}"))
                };
                errors.push(err.with_columns(op_start, op_start + op.len()));
                break;
            }

            if bytes[j] == b'>' || bytes[j] == b'<' {
                let second = redirection_op(&text[j..]);
                errors.push(
                    SyntaxError::new(
                        ErrorCode::DoubledRedirection,
                        line_no,
                        format!("Invalid redirection syntax '{op} {second}'"),
                        line,
                    )
                    .with_columns(op_start, j + second.len()),
                );
                i = j + second.len();
                continue;
            }

            if matches!(bytes[j], b';' | b'|' | b'&') {
                errors.push(
                    SyntaxError::new(
                        ErrorCode::RedirTargetIsOperator,
                        line_no,
                        format!(
                            "Redirection '{op}' target cannot be an operator '{}'",
                            bytes[j] as char
                        ),
                        line,
                    )
                    .with_columns(op_start, j + 1),
                );
                i = j;
                continue;
            }

            let end = target_end(bytes, j);
            let target = &text[j..end];
            if matches!(op, ">&" | "<&")
                && !target.chars().all(|t| t.is_ascii_digit() || t == '-')
            {
                errors.push(
                    SyntaxError::new(
                        ErrorCode::BadFdDuplication,
                        line_no,
                        "File descriptor redirection requires digit or '-'",
                        line,
                    )
                    .with_suggestion("Use format like 2>&1 or 2>&-")
                    .with_columns(j, end),
                );
            }
            i = end;
        }
    }

    errors
}

/// Pipeline structure checks at the line level.
pub fn validate_pipelines(lines: &[String]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let Some(trimmed) = extract_trimmed_line(line) else {
            continue;
        };
        let parsing = strip_inline_comment(&trimmed).trim();

        if parsing.starts_with('|') && !parsing.starts_with("||") {
            errors.push(SyntaxError::new(
                ErrorCode::ConsecutivePipes,
                line_no,
                "Pipeline cannot start with pipe operator",
                line,
            ));
        }

        let bytes = parsing.as_bytes();
        let mut state = QuoteState::default();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if !should_process_char(&mut state, c, ScanFlags::default()) || state.in_quotes {
                i += 1;
                continue;
            }
            if c == '|' && bytes.get(i + 1) == Some(&b'|') {
                let j = skip_spaces(bytes, i + 2);
                if j < bytes.len() && bytes[j] == b'|' {
                    errors.push(
                        SyntaxError::new(
                            ErrorCode::EmptyPipelineSegment,
                            line_no,
                            "Invalid pipeline syntax",
                            line,
                        )
                        .with_columns(i, j + 1),
                    );
                }
                i += 2;
                continue;
            }
            i += 1;
        }
    }

    errors
}

/// Here-document open/close tracking across the script.
pub fn validate_heredocs(lines: &[String]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();
    let mut open: Vec<(String, usize)> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;

        if let Some((delimiter, _)) = open.last() {
            if line.trim() == delimiter {
                open.pop();
                continue;
            }
        }

        let bytes = line.as_bytes();
        let mut state = QuoteState::default();
        let mut arithmetic_depth = 0usize;
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if !should_process_char(&mut state, c, ScanFlags::default()) || state.in_quotes {
                i += 1;
                continue;
            }

            if c == '$' && line[i..].starts_with("$((") {
                arithmetic_depth += 1;
                i += 3;
                continue;
            }
            if c == '(' && line[i..].starts_with("((") {
                arithmetic_depth += 1;
                i += 2;
                continue;
            }
            if c == ')' && line[i..].starts_with("))") && arithmetic_depth > 0 {
                arithmetic_depth -= 1;
                i += 2;
                continue;
            }

            // << opens a heredoc; <<< is a here-string and does not.
            if c == '<' && line[i..].starts_with("<<<") {
                i += 3;
                continue;
            }
            if c == '<' && arithmetic_depth == 0 && line[i..].starts_with("<<") {
                let mut j = i + 2;
                if bytes.get(j) == Some(&b'-') {
                    j += 1;
                }
                j = skip_spaces(bytes, j);
                let start = j;
                while j < bytes.len()
                    && !(bytes[j] as char).is_ascii_whitespace()
                    && !matches!(bytes[j], b';' | b'&' | b'|')
                {
                    j += 1;
                }
                let mut delimiter = &line[start..j];
                for quote in ['\'', '"'] {
                    if delimiter.len() >= 2
                        && delimiter.starts_with(quote)
                        && delimiter.ends_with(quote)
                    {
                        delimiter = &delimiter[1..delimiter.len() - 1];
                    }
                }
                if !delimiter.is_empty() {
                    if !open.is_empty() {
                        errors.push(SyntaxError::new(
                            ErrorCode::NestedHeredoc,
                            line_no,
                            "Nested heredoc detected - may cause parsing issues",
                            line,
                        ));
                    }
                    open.push((delimiter.to_string(), line_no));
                }
                i = j;
                continue;
            }

            i += 1;
        }
    }

    for (delimiter, line_no) in open {
        let line_text = lines.get(line_no - 1).map(String::as_str).unwrap_or("");
        errors.push(
            SyntaxError::new(
                ErrorCode::UnterminatedHeredoc,
                line_no,
                format!("Unclosed here document - missing '{delimiter}'"),
                line_text,
            )
            .with_suggestion(format!("Add closing delimiter: {delimiter}")),
        );
    }

    errors
}
