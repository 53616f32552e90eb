//! Shape analysis for single construct headers.
//!
//! Each analyzer takes one already-trimmed line (plus its whitespace
//! tokens) and reports which required parts are missing. Deciding
//! whether a missing part is an error, or satisfied by a later line,
//! is the caller's job.

use crate::sanitize::extract_trimmed_line;
use crate::scanner::{
    get_last_non_comment_token, is_do_token, is_word_boundary, starts_with_keyword_token,
};

/// Byte index of an inline `do` keyword, i.e. a word-boundary `do`
/// preceded by a `;` (as in `for i in x; do`).
pub fn find_inline_do_position(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(off) = text[from..].find("do") {
        let pos = from + off;
        if is_word_boundary(text, pos, 2) {
            let mut j = pos;
            while j > 0 && (bytes[j - 1] == b' ' || bytes[j - 1] == b'\t') {
                j -= 1;
            }
            if j > 0 && bytes[j - 1] == b';' {
                return Some(pos);
            }
        }
        from = pos + 1;
    }
    None
}

/// Byte index of a word-boundary `done` at or after `search_from`.
pub fn find_inline_done_position(text: &str, search_from: usize) -> Option<usize> {
    if search_from >= text.len() {
        return None;
    }
    let mut from = search_from;
    while let Some(off) = text[from..].find("done") {
        let pos = from + off;
        if is_word_boundary(text, pos, 4) {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

fn body_after_do_missing_done(trimmed: &str, do_end: usize) -> bool {
    let body = trimmed[do_end..].trim_start_matches([' ', '\t', ';']);
    if body.is_empty() || body.starts_with('#') {
        return false;
    }
    find_inline_done_position(trimmed, do_end).is_none()
}

/// What a `for` header is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForLoopSyntax {
    pub incomplete: bool,
    pub missing_in_keyword: bool,
    pub missing_iteration_list: bool,
    pub missing_do_keyword: bool,
    pub has_inline_do: bool,
    pub inline_body_without_done: bool,
}

pub fn analyze_for_loop_syntax(tokens: &[String], trimmed: &str) -> ForLoopSyntax {
    let mut syntax = ForLoopSyntax::default();

    if tokens.len() < 3 {
        syntax.incomplete = true;
        return syntax;
    }

    let Some(in_index) = tokens.iter().position(|t| t == "in") else {
        syntax.missing_in_keyword = true;
        return syntax;
    };

    let mut has_list_item = false;
    for token in &tokens[in_index + 1..] {
        if token.starts_with('#') {
            break;
        }
        let word = token.trim_end_matches(';');
        if matches!(word, "do" | "done" | "then" | "elif" | "else") {
            break;
        }
        if !word.is_empty() {
            has_list_item = true;
            break;
        }
    }
    if !has_list_item {
        syntax.missing_iteration_list = true;
    }

    match find_inline_do_position(trimmed) {
        Some(do_pos) => {
            syntax.has_inline_do = true;
            syntax.inline_body_without_done = body_after_do_missing_done(trimmed, do_pos + 2);
        }
        None => syntax.missing_do_keyword = true,
    }

    syntax
}

/// What a `while` or `until` header is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhileUntilSyntax {
    pub missing_condition: bool,
    pub unclosed_test: bool,
    pub missing_do_keyword: bool,
    pub has_inline_do: bool,
    pub inline_body_without_done: bool,
}

pub fn analyze_while_until_syntax(
    keyword: &str,
    trimmed: &str,
    tokens: &[String],
) -> WhileUntilSyntax {
    let mut syntax = WhileUntilSyntax::default();

    let inline_do = find_inline_do_position(trimmed);
    let has_do = inline_do.is_some() || tokens.iter().skip(1).any(|t| is_do_token(t));
    syntax.missing_do_keyword = !has_do;
    syntax.has_inline_do = is_do_token(get_last_non_comment_token(tokens));

    if let Some(do_pos) = inline_do {
        syntax.inline_body_without_done = body_after_do_missing_done(trimmed, do_pos + 2);
        if syntax.inline_body_without_done {
            syntax.has_inline_do = true;
        }
    }

    let mut condition = trimmed[keyword.len()..].trim();
    if let Some(rest) = condition.strip_suffix("do") {
        if rest.is_empty() || rest.ends_with([' ', '\t', ';']) {
            condition = rest.trim_end();
        }
    }
    condition = condition.trim_end_matches(';').trim_end();

    if condition.is_empty() {
        syntax.missing_condition = true;
    } else if condition.starts_with("[[") {
        syntax.unclosed_test = !condition.contains("]]");
    } else if condition.starts_with('[') {
        syntax.unclosed_test = !condition.contains(']');
    }

    syntax
}

/// What an `if` header is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IfSyntax {
    pub missing_then_keyword: bool,
    pub missing_condition: bool,
}

pub fn analyze_if_syntax(tokens: &[String], trimmed: &str) -> IfSyntax {
    IfSyntax {
        missing_then_keyword: !tokens.iter().any(|t| t == "then") && !trimmed.contains(';'),
        missing_condition: tokens.len() == 1 || (tokens.len() == 2 && tokens[1] == "then"),
    }
}

/// What a `case` header is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseSyntax {
    pub incomplete: bool,
    pub missing_in_keyword: bool,
}

pub fn analyze_case_syntax(tokens: &[String]) -> CaseSyntax {
    let mut syntax = CaseSyntax::default();
    if tokens.len() < 3 {
        syntax.incomplete = true;
        return syntax;
    }
    if !tokens.iter().any(|t| t == "in") {
        syntax.missing_in_keyword = true;
    }
    syntax
}

/// True when the next non-blank, non-comment line begins with `keyword`
/// as its own word. Lets `for i in list` on one line be satisfied by a
/// `do` on the next.
pub fn next_effective_line_starts_with_keyword(
    lines: &[String],
    current_index: usize,
    keyword: &str,
) -> bool {
    lines[current_index + 1..]
        .iter()
        .find_map(|line| extract_trimmed_line(line))
        .is_some_and(|trimmed| starts_with_keyword_token(&trimmed, keyword))
}
