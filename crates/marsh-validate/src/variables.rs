//! Whole-script variable definition and use analysis.
//!
//! Collects definitions (assignments, `for` variables, `read` targets,
//! `export`-family arguments) and uses (`$name`, `${name}`, names in
//! arithmetic), then reports uses with no definition anywhere and
//! definitions that are never used. A [`VariableScope`] answers whether
//! a name exists outside the script, so environment variables are not
//! flagged.

use std::collections::BTreeMap;

use marsh_types::{ErrorCode, SyntaxError};

use crate::sanitize::extract_trimmed_line;
use crate::scanner::{
    find_unquoted_keyword, is_valid_identifier, is_valid_identifier_char,
    is_valid_identifier_start, should_process_char, strip_inline_comment, QuoteState, ScanFlags,
};
use crate::token::{
    is_assignment_token, is_separator_token, normalize_assignment_identifier,
    tokenize_shell_segment, tokenize_whitespace,
};
use crate::VariableScope;

/// Shell-managed names that are legitimately set without a use in the
/// same script.
const SPECIAL_VARS: [&str; 26] = [
    "IFS", "PATH", "HOME", "PWD", "OLDPWD", "MAIL", "MAILPATH", "PS1", "PS2", "PS3", "PS4",
    "LANG", "LC_ALL", "LC_CTYPE", "LC_COLLATE", "LC_MESSAGES", "LC_NUMERIC", "OPTIND", "OPTARG",
    "SECONDS", "RANDOM", "LINENO", "HISTFILE", "HISTSIZE", "HISTCONTROL", "PROMPT_COMMAND",
];

const EXPORT_LIKE: [&str; 5] = ["export", "local", "declare", "readonly", "typeset"];

/// Options of `read` that consume the following word.
const READ_OPTS_WITH_ARG: [&str; 8] = ["-p", "-u", "-t", "-d", "-N", "-n", "-i", "-k"];

fn resets_command(token: &str) -> bool {
    is_separator_token(token) || matches!(token, "if" | "elif" | "while" | "until")
}

struct Tracker {
    defined: BTreeMap<String, usize>,
    used: BTreeMap<String, usize>,
}

impl Tracker {
    fn define(&mut self, name: &str, line_no: usize) {
        if is_valid_identifier(name) {
            self.defined.entry(name.to_string()).or_insert(line_no);
        }
    }

    fn record_use(&mut self, name: &str, line_no: usize) {
        if is_valid_identifier(name) {
            self.used.entry(name.to_string()).or_insert(line_no);
        }
    }
}

/// Walk a token list collecting definitions: leading assignments,
/// `export`-family arguments, and `read` targets.
fn collect_definitions(tokens: &[String], line_no: usize, tracker: &mut Tracker) {
    let mut command_started = false;
    let mut prev = "";
    let mut k = 0;

    while k < tokens.len() {
        let token = tokens[k].as_str();

        if resets_command(token) {
            command_started = false;
            prev = token;
            k += 1;
            continue;
        }

        if !command_started {
            if EXPORT_LIKE.contains(&token) {
                k += 1;
                while k < tokens.len() && !is_separator_token(&tokens[k]) {
                    let arg = tokens[k].as_str();
                    if !arg.starts_with('-') {
                        if is_assignment_token(arg) {
                            if let Some(name) = normalize_assignment_identifier(arg) {
                                tracker.define(name, line_no);
                            }
                        } else if is_valid_identifier(arg) {
                            tracker.define(arg, line_no);
                        }
                    }
                    k += 1;
                }
                command_started = true;
                continue;
            }

            if token == "read" {
                k += 1;
                while k < tokens.len() && !is_separator_token(&tokens[k]) {
                    let arg = tokens[k].as_str();
                    if arg.starts_with('-') {
                        if READ_OPTS_WITH_ARG.contains(&arg) {
                            k += 1;
                        }
                    } else if !arg.starts_with('<') && !arg.starts_with('>') {
                        let name = crate::scanner::extract_identifier_from_token(arg);
                        tracker.define(name, line_no);
                    }
                    k += 1;
                }
                command_started = true;
                continue;
            }

            if is_assignment_token(token) {
                if !matches!(prev, "[" | "[[" | "test") {
                    if let Some(name) = normalize_assignment_identifier(token) {
                        tracker.define(name, line_no);
                    }
                }
                prev = token;
                k += 1;
                continue;
            }

            command_started = true;
        }

        prev = token;
        k += 1;
    }
}

fn identifiers_in(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if is_valid_identifier_start(bytes[i] as char) {
            let start = i;
            while i < bytes.len() && is_valid_identifier_char(bytes[i] as char) {
                i += 1;
            }
            names.push(&expr[start..i]);
        } else {
            i += 1;
        }
    }
    names
}

/// Scan one line for `$name`, `${name}`, and arithmetic uses. Returns
/// an error for an unclosed `${`.
fn collect_uses(
    text: &str,
    line_no: usize,
    raw: &str,
    tracker: &mut Tracker,
) -> Option<SyntaxError> {
    let bytes = text.as_bytes();
    let mut state = QuoteState::default();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if !should_process_char(&mut state, c, ScanFlags::skip_single_quoted()) || c != '$' {
            i += 1;
            continue;
        }

        if text[i..].starts_with("$((") {
            // Identifiers in arithmetic are uses even without a `$`.
            let mut depth = 2usize;
            let mut j = i + 3;
            let mut close = None;
            while j < bytes.len() {
                match bytes[j] {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            close = Some(j);
                            break;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            if let Some(close) = close {
                // `close` is the outer `)`; slicing to it keeps every
                // byte boundary valid even when the inner `)` is not
                // adjacent.
                let interior = &text[i + 3..close];
                let interior = interior.strip_suffix(')').unwrap_or(interior);
                for name in identifiers_in(interior) {
                    tracker.record_use(name, line_no);
                }
                i = close + 1;
            } else {
                i = bytes.len();
            }
            continue;
        }

        if text[i..].starts_with("${") {
            if !text[i..].contains('}') {
                return Some(
                    SyntaxError::new(
                        ErrorCode::UnclosedParamExpansion,
                        line_no,
                        "Unclosed variable expansion ${",
                        raw,
                    )
                    .with_suggestion("Add closing brace '}'")
                    .with_columns(i, i + 2),
                );
            }
            let mut j = i + 2;
            while j < bytes.len() && matches!(bytes[j], b'#' | b'!') {
                j += 1;
            }
            let start = j;
            while j < bytes.len() && is_valid_identifier_char(bytes[j] as char) {
                j += 1;
            }
            tracker.record_use(&text[start..j], line_no);
            i = j;
            continue;
        }

        if i + 1 < bytes.len() && is_valid_identifier_start(bytes[i + 1] as char) {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && is_valid_identifier_char(bytes[j] as char) {
                j += 1;
            }
            tracker.record_use(&text[start..j], line_no);
            i = j;
            continue;
        }

        i += 1;
    }

    None
}

pub fn validate_variable_usage<S: VariableScope>(lines: &[String], scope: &S) -> Vec<SyntaxError> {
    let mut errors = Vec::new();
    let mut tracker = Tracker { defined: BTreeMap::new(), used: BTreeMap::new() };

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if extract_trimmed_line(line).is_none() {
            continue;
        }
        let text = strip_inline_comment(line);

        let ws_tokens = tokenize_whitespace(text);
        if ws_tokens.first().is_some_and(|t| t == "for") {
            if let Some(var) = ws_tokens.get(1) {
                tracker.define(var, line_no);
            }
        }

        // Condition segments of `if`/`while` headers can carry their
        // own leading assignments, as in `while IFS= read -r l; do`.
        let segment = match ws_tokens.first().map(String::as_str) {
            Some("if" | "elif") => {
                let end = find_unquoted_keyword(text, "then", 0).unwrap_or(text.len());
                &text[..end]
            }
            Some("while" | "until") => {
                let end = find_unquoted_keyword(text, "do", 0).unwrap_or(text.len());
                &text[..end]
            }
            _ => text,
        };
        collect_definitions(&tokenize_shell_segment(segment), line_no, &mut tracker);

        if let Some(err) = collect_uses(text, line_no, line, &mut tracker) {
            errors.push(err);
        }
    }

    for (name, &line_no) in &tracker.used {
        if tracker.defined.contains_key(name) || scope.is_set(name) {
            continue;
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let line_text = lines.get(line_no - 1).map(String::as_str).unwrap_or("");
        errors.push(
            SyntaxError::new(
                ErrorCode::VarUsedNotDefined,
                line_no,
                format!("Variable '{name}' used but not defined in this script"),
                line_text,
            )
            .with_suggestion(format!("Define the variable before use: {name}=value")),
        );
    }

    for (name, &line_no) in &tracker.defined {
        if tracker.used.contains_key(name) || SPECIAL_VARS.contains(&name.as_str()) {
            continue;
        }
        let line_text = lines.get(line_no - 1).map(String::as_str).unwrap_or("");
        errors.push(
            SyntaxError::new(
                ErrorCode::VarDefinedNotUsed,
                line_no,
                format!("Variable '{name}' defined but never used"),
                line_text,
            )
            .with_suggestion("Remove unused variable or add usage"),
        );
    }

    errors
}
