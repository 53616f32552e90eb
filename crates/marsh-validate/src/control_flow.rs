//! Whole-script control-flow nesting validation.
//!
//! Walks the script line by line with a stack of open constructs,
//! checking that every `then` has an `if`, every `done` has a `do`, and
//! that nothing is left open at end of script. Quote and parenthesis
//! balance is checked first on each line; an unclosed quote poisons
//! everything after it, so it aborts the walk with a single error.

use marsh_types::{ErrorCode, SyntaxError};

use crate::constructs::{
    analyze_case_syntax, analyze_for_loop_syntax, analyze_while_until_syntax,
    find_inline_do_position,
};
use crate::sanitize::{extract_trimmed_line, sanitize_command_substitutions, sanitize_lines};
use crate::scanner::{
    for_each_effective_char, scan_quote_state, starts_with_keyword_token, strip_inline_comment,
    has_inline_terminator, is_word_boundary, Scan, ScanFlags,
};
use crate::token::tokenize_whitespace;

/// A construct, or construct phase, on the nesting stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructTag {
    If,
    Then,
    Elif,
    Else,
    While,
    Until,
    For,
    Do,
    /// A `case` header whose `in` has not been seen yet.
    CaseHeader,
    Case,
    Brace,
    Function,
}

impl ConstructTag {
    fn keyword(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Then => "then",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::While => "while",
            Self::Until => "until",
            Self::For => "for",
            Self::Do => "do",
            Self::CaseHeader | Self::Case => "case",
            Self::Brace => "{",
            Self::Function => "function",
        }
    }

    fn expected_close(self) -> &'static str {
        match self {
            Self::If => "fi",
            Self::While | Self::Until | Self::For | Self::Do => "done",
            Self::CaseHeader | Self::Case => "esac",
            Self::Brace | Self::Function => "}",
            Self::Then | Self::Elif | Self::Else => "fi",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Current phase of the construct (`Then` after `if ...; then`).
    state: ConstructTag,
    /// What opened it; decides the closing keyword.
    opened: ConstructTag,
    /// 1-based line the construct opened on.
    line: usize,
}

fn keyword_mismatch(line_no: usize, line: &str, message: &str) -> SyntaxError {
    SyntaxError::new(ErrorCode::KeywordMismatch, line_no, message, line)
}

/// Pop and report until the top frame can be closed by `done`.
fn unwind_to_done(stack: &mut Vec<Frame>, errors: &mut Vec<SyntaxError>, line_text: &str) -> bool {
    while let Some(top) = stack.last().copied() {
        if top.state == ConstructTag::Do || top.opened.expected_close() == "done" {
            break;
        }
        stack.pop();
        errors.push(report_unclosed(&top, line_text));
    }
    matches!(stack.last(), Some(frame) if frame.state == ConstructTag::Do)
}

fn report_unclosed(frame: &Frame, line_text: &str) -> SyntaxError {
    let opener = frame.opened.keyword();
    let close = frame.opened.expected_close();
    let message = format!("Unclosed '{opener}' from line {} - missing '{close}'", frame.line);
    if matches!(frame.opened, ConstructTag::Brace | ConstructTag::Function) {
        SyntaxError::new(ErrorCode::UnclosedBraceGroup, frame.line, message, line_text)
            .with_suggestion(format!(
                "Add closing '}}' to match the opening on line {}",
                frame.line
            ))
    } else {
        SyntaxError::new(ErrorCode::UnclosedConstruct, frame.line, message, line_text)
            .with_suggestion(format!(
                "Add '{close}' to close the '{opener}' that started on line {}",
                frame.line
            ))
    }
}

/// Quote-and-comment-aware scan for an unmatched parenthesis. Parens
/// that belong to an unterminated `$(` are left to the expansion pass.
fn check_paren_balance(effective: &str, line_no: usize, raw: &str) -> Option<SyntaxError> {
    let bytes = effective.as_bytes();
    let mut opens: Vec<usize> = Vec::new();
    let mut unmatched_close = None;

    for_each_effective_char(effective, ScanFlags::structural(), |i, c, _| {
        match c {
            '(' => opens.push(i),
            ')' => {
                if opens.pop().is_none() && unmatched_close.is_none() {
                    unmatched_close = Some(i);
                }
            }
            _ => {}
        }
        Scan::Continue
    });

    if let Some(col) = unmatched_close {
        return Some(
            SyntaxError::new(
                ErrorCode::UnmatchedParen,
                line_no,
                "Unmatched closing parenthesis",
                raw,
            )
            .with_columns(col, col + 1),
        );
    }

    for &pos in &opens {
        let after_dollar = pos > 0 && bytes[pos - 1] == b'$';
        let after_arith = pos > 1 && bytes[pos - 1] == b'(' && bytes[pos - 2] == b'$';
        if !after_dollar && !after_arith {
            return Some(
                SyntaxError::new(
                    ErrorCode::UnmatchedParen,
                    line_no,
                    "Unmatched opening parenthesis",
                    raw,
                )
                .with_columns(pos, pos + 1),
            );
        }
    }
    None
}

/// True when the line is (or sits inside) a `case` pattern arm, where a
/// lone `)` is expected.
fn looks_like_case_pattern(line: &str, in_case_block: bool) -> bool {
    let Some(paren) = line.find(')') else {
        return false;
    };
    if !in_case_block && !(line.contains("case ") && line.contains(" in ")) {
        return false;
    }
    let before = line[..paren].trim();
    match before.chars().next_back() {
        None => false,
        Some(c) => c == '"' || c == '\'' || c == '*' || c.is_ascii_alphanumeric(),
    }
}

fn push_function_context(stack: &mut Vec<Frame>, trimmed: &str, line_no: usize) {
    if trimmed.ends_with('{') {
        if let Some(first) = trimmed.find('{') {
            let body = &trimmed[first..];
            let net = body.matches('{').count() as i64 - body.matches('}').count() as i64;
            if net > 0 {
                stack.push(Frame {
                    state: ConstructTag::Brace,
                    opened: ConstructTag::Brace,
                    line: line_no,
                });
                return;
            }
        }
    }
    stack.push(Frame {
        state: ConstructTag::Function,
        opened: ConstructTag::Function,
        line: line_no,
    });
}

/// Lines that begin `while`/`until`/`for` and carry an inline `; do`.
/// Returns true when the line was consumed.
fn handle_inline_loop_header(
    stack: &mut Vec<Frame>,
    trimmed: &str,
    line_no: usize,
) -> bool {
    for (keyword, tag) in [
        ("while", ConstructTag::While),
        ("until", ConstructTag::Until),
        ("for", ConstructTag::For),
    ] {
        if !starts_with_keyword_token(trimmed, keyword) {
            continue;
        }
        if find_inline_do_position(trimmed).is_none() {
            return false;
        }
        if !has_inline_terminator(trimmed, "done") {
            stack.push(Frame { state: ConstructTag::Do, opened: tag, line: line_no });
        }
        return true;
    }
    false
}

/// A loop keyword buried mid-line, as in `produce | while read x; do`.
fn handle_embedded_loop_header(stack: &mut Vec<Frame>, trimmed: &str, line_no: usize) {
    let flags = ScanFlags {
        ignore_single_quotes: true,
        process_escaped: false,
        ignore_double_quotes: true,
    };
    for (keyword, tag) in [
        ("while", ConstructTag::While),
        ("until", ConstructTag::Until),
        ("for", ConstructTag::For),
    ] {
        let mut found = None;
        for_each_effective_char(trimmed, flags, |i, c, _| {
            if i > 0
                && c == keyword.as_bytes()[0] as char
                && trimmed[i..].starts_with(keyword)
                && is_word_boundary(trimmed, i, keyword.len())
            {
                let prefix = trimmed.as_bytes()[i - 1];
                if matches!(prefix, b' ' | b'\t' | b'|' | b';' | b'&' | b'(' | b'{') {
                    found = Some(i);
                    return Scan::Stop;
                }
            }
            Scan::Continue
        });

        let Some(pos) = found else { continue };
        let remainder = &trimmed[pos..];
        let tokens = tokenize_whitespace(remainder);
        if tokens.first().map(String::as_str) != Some(keyword) {
            continue;
        }
        if has_inline_terminator(remainder, "done") {
            continue;
        }
        let state = if find_inline_do_position(remainder).is_some() {
            ConstructTag::Do
        } else {
            tag
        };
        stack.push(Frame { state, opened: tag, line: line_no });
        return;
    }
}

fn elif_conditions_on_line(trimmed: &str, line_no: usize, raw: &str, errors: &mut Vec<SyntaxError>) {
    let mut from = 0;
    while let Some(off) = trimmed[from..].find("; elif") {
        let pos = from + off + "; elif".len();
        let rest = trimmed[pos..].trim_start();
        if rest.is_empty() || rest.starts_with(';') || starts_with_keyword_token(rest, "then") {
            errors.push(
                SyntaxError::new(
                    ErrorCode::ElifMissingCondition,
                    line_no,
                    "'elif' without condition",
                    raw,
                )
                .with_suggestion("Add a condition after 'elif'"),
            );
        }
        from = pos;
    }
}

/// Top-of-stack check shared by the closing-keyword handlers. Reports
/// `message` and leaves the stack alone when the top does not match.
fn require_top(
    stack: &[Frame],
    allowed: &[ConstructTag],
    message: &str,
    line_no: usize,
    raw: &str,
    errors: &mut Vec<SyntaxError>,
) -> bool {
    match stack.last() {
        Some(frame) if allowed.contains(&frame.state) => true,
        _ => {
            errors.push(keyword_mismatch(line_no, raw, message));
            false
        }
    }
}

/// One walk over the script: per-line quote and paren diagnostics plus
/// the construct stack as it stands at end of script.
fn scan_script(lines: &[String]) -> (Vec<SyntaxError>, Vec<Frame>, bool) {
    use ConstructTag::*;

    let mut errors = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut unclosed_quote = false;

    let sanitized = sanitize_lines(lines);

    for (idx, line) in sanitized.iter().enumerate() {
        let line_no = idx + 1;
        let Some(trimmed) = extract_trimmed_line(line) else {
            continue;
        };

        let effective = sanitize_command_substitutions(strip_inline_comment(line));
        let quote_state = scan_quote_state(&effective);
        if quote_state.in_quotes {
            let quote = quote_state.quote_char.unwrap_or('\'');
            errors.push(
                SyntaxError::new(
                    ErrorCode::UnclosedQuote,
                    line_no,
                    format!("Unclosed quote: missing closing {quote}"),
                    &lines[idx],
                )
                .with_suggestion(format!(
                    "Close the opening {quote} or remove the stray quote"
                )),
            );
            unclosed_quote = true;
            stack.clear();
            break;
        }

        let in_case_block = stack.iter().any(|f| matches!(f.state, Case | CaseHeader));
        if !looks_like_case_pattern(&effective, in_case_block) {
            if let Some(err) = check_paren_balance(&effective, line_no, &lines[idx]) {
                errors.push(err);
            }
        }

        let mut parsing = trimmed.as_str();
        parsing = strip_inline_comment(parsing).trim();
        parsing = parsing.trim_end_matches(';').trim_end();
        if let Some(rest) = parsing.strip_prefix(';') {
            let rest = rest.trim_start();
            if ["then", "elif", "else", "fi"]
                .iter()
                .any(|kw| starts_with_keyword_token(rest, kw))
            {
                parsing = rest;
            }
        }
        if parsing.is_empty() {
            continue;
        }

        if starts_with_keyword_token(parsing, "if")
            && (parsing.contains("; then") || parsing.contains(";then"))
        {
            if !has_inline_terminator(parsing, "fi") {
                stack.push(Frame { state: Then, opened: If, line: line_no });
            }
            elif_conditions_on_line(parsing, line_no, &lines[idx], &mut errors);
            continue;
        }

        if handle_inline_loop_header(&mut stack, parsing, line_no) {
            continue;
        }
        handle_embedded_loop_header(&mut stack, parsing, line_no);

        let tokens = tokenize_whitespace(parsing);
        let Some(first) = tokens.first() else { continue };
        let raw = lines[idx].as_str();

        match first.as_str() {
            "if" => stack.push(Frame { state: If, opened: If, line: line_no }),
            "then" => {
                if require_top(&stack, &[If], "'then' without matching 'if'", line_no, raw, &mut errors) {
                    if let Some(top) = stack.last_mut() {
                        top.state = Then;
                    }
                }
            }
            "elif" => {
                if require_top(
                    &stack,
                    &[Then, Elif],
                    "'elif' without matching 'if...then'",
                    line_no,
                    raw,
                    &mut errors,
                ) {
                    if let Some(top) = stack.last_mut() {
                        top.state = Elif;
                    }
                }
                if tokens.len() == 1 {
                    errors.push(
                        SyntaxError::new(
                            ErrorCode::ElifMissingCondition,
                            line_no,
                            "'elif' without condition",
                            raw,
                        )
                        .with_suggestion("Add a condition after 'elif'"),
                    );
                }
            }
            "else" => {
                if require_top(
                    &stack,
                    &[Then, Elif],
                    "'else' without matching 'if...then'",
                    line_no,
                    raw,
                    &mut errors,
                ) {
                    if let Some(top) = stack.last_mut() {
                        top.state = Else;
                    }
                }
            }
            "fi" => {
                if require_top(
                    &stack,
                    &[Then, Elif, Else],
                    "'fi' without matching 'if'",
                    line_no,
                    raw,
                    &mut errors,
                ) {
                    stack.pop();
                }
            }
            "while" | "until" => {
                let tag = if first == "while" { While } else { Until };
                let syntax = analyze_while_until_syntax(first, parsing, &tokens);
                let state = if syntax.has_inline_do { Do } else { tag };
                stack.push(Frame { state, opened: tag, line: line_no });
            }
            "do" => {
                if require_top(
                    &stack,
                    &[While, Until, For],
                    "'do' without matching 'while', 'until', or 'for'",
                    line_no,
                    raw,
                    &mut errors,
                ) {
                    if let Some(top) = stack.last_mut() {
                        top.state = Do;
                    }
                }
            }
            "done" => {
                if unwind_to_done(&mut stack, &mut errors, raw) {
                    stack.pop();
                } else {
                    errors.push(keyword_mismatch(line_no, raw, "'done' without matching 'do'"));
                }
            }
            "for" => {
                let syntax = analyze_for_loop_syntax(&tokens, parsing);
                if syntax.missing_in_keyword {
                    errors.push(SyntaxError::new(
                        ErrorCode::ForMalformed,
                        line_no,
                        "'for' statement missing 'in' clause",
                        raw,
                    ));
                }
                let state = if syntax.has_inline_do { Do } else { For };
                stack.push(Frame { state, opened: For, line: line_no });
            }
            "case" => {
                let syntax = analyze_case_syntax(&tokens);
                if syntax.missing_in_keyword {
                    errors.push(SyntaxError::new(
                        ErrorCode::CaseMalformed,
                        line_no,
                        "'case' statement missing 'in' clause",
                        raw,
                    ));
                }
                if !has_inline_terminator(parsing, "esac") {
                    let complete = tokens.len() >= 3 && tokens.iter().any(|t| t == "in");
                    let state = if complete { Case } else { CaseHeader };
                    stack.push(Frame { state, opened: Case, line: line_no });
                }
            }
            "in" => {
                if let Some(top) = stack.last_mut() {
                    if top.state == CaseHeader {
                        top.state = Case;
                    }
                }
            }
            "esac" => {
                if require_top(
                    &stack,
                    &[Case],
                    "'esac' without matching 'case'",
                    line_no,
                    raw,
                    &mut errors,
                ) {
                    stack.pop();
                }
            }
            "function" => {
                if tokens.len() < 2 {
                    errors.push(SyntaxError::new(
                        ErrorCode::MissingFunctionName,
                        line_no,
                        "'function' missing function name",
                        raw,
                    ));
                    push_function_context(&mut stack, parsing, line_no);
                } else if tokens[1] == "()" {
                    push_function_context(&mut stack, parsing, line_no);
                } else if parsing.ends_with('{') {
                    stack.push(Frame { state: Brace, opened: Brace, line: line_no });
                }
            }
            "}" => {
                if require_top(
                    &stack,
                    &[Brace, Function],
                    "Unmatched closing brace '}'",
                    line_no,
                    raw,
                    &mut errors,
                ) {
                    stack.pop();
                }
            }
            _ => {
                if parsing.ends_with('{') {
                    stack.push(Frame { state: Brace, opened: Brace, line: line_no });
                }
            }
        }
    }

    (errors, stack, unclosed_quote)
}

/// Validate quoting, parenthesis balance, and construct nesting across
/// the whole script.
pub fn validate_control_flow(lines: &[String]) -> Vec<SyntaxError> {
    let (mut errors, stack, unclosed_quote) = scan_script(lines);

    if !unclosed_quote {
        for frame in &stack {
            if frame.state == ConstructTag::CaseHeader {
                continue;
            }
            if frame.state == frame.opened
                && matches!(frame.state, ConstructTag::If | ConstructTag::While | ConstructTag::Until | ConstructTag::For)
            {
                // A header with no `do`/`then` yet is a statement-shape
                // problem, reported by the statement pass instead.
                continue;
            }
            let line_text = lines.get(frame.line - 1).map(String::as_str).unwrap_or("");
            errors.push(report_unclosed(frame, line_text));
        }
    }

    errors
}

/// Whether the script ends mid-construct, for the continuation prompt.
///
/// Unlike [`validate_control_flow`], a header frame still waiting for
/// its `then`/`do`/`in` counts as open here: the keyword may arrive on
/// the next line. A header line that already carries its closing
/// keyword is complete but malformed, and reports instead.
pub fn has_open_construct(lines: &[String]) -> bool {
    let (_, stack, unclosed_quote) = scan_script(lines);
    if unclosed_quote {
        return true;
    }
    stack.iter().any(|frame| {
        if frame.state != frame.opened {
            return true;
        }
        match frame.opened {
            ConstructTag::If | ConstructTag::While | ConstructTag::Until | ConstructTag::For => {
                let line = lines.get(frame.line - 1).map(String::as_str).unwrap_or("");
                !has_inline_terminator(strip_inline_comment(line), frame.opened.expected_close())
            }
            _ => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(script: &[&str]) -> Vec<String> {
        script.iter().map(|s| s.to_string()).collect()
    }

    fn codes(script: &[&str]) -> Vec<ErrorCode> {
        validate_control_flow(&lines(script)).into_iter().map(|e| e.code).collect()
    }

    #[test]
    fn balanced_constructs_are_clean() {
        let script = &[
            "if [ -f x ]; then",
            "    while read l; do",
            "        echo \"$l\"",
            "    done < x",
            "fi",
        ];
        assert!(codes(script).is_empty(), "got {:?}", codes(script));
    }

    #[test]
    fn unclosed_if_is_reported_at_its_opening_line() {
        let errors = validate_control_flow(&lines(&["echo start", "if true; then", "echo body"]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::UnclosedConstruct);
        assert_eq!(errors[0].position.line, 2);
        assert!(errors[0].message.contains("missing 'fi'"));
    }

    #[test]
    fn fi_without_if() {
        let errors = validate_control_flow(&lines(&["fi"]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::KeywordMismatch);
        assert!(errors[0].message.contains("'fi' without matching 'if'"));
    }

    #[test]
    fn done_closes_only_do() {
        assert_eq!(codes(&["done"]), vec![ErrorCode::KeywordMismatch]);
        assert!(codes(&["while true; do", "    :", "done"]).is_empty());
    }

    #[test]
    fn done_unwinds_past_an_unclosed_if() {
        let errors = validate_control_flow(&lines(&[
            "while true; do",
            "    if true; then",
            "done",
        ]));
        assert_eq!(errors.len(), 1, "got {errors:?}");
        assert_eq!(errors[0].code, ErrorCode::UnclosedConstruct);
        assert!(errors[0].message.contains("'if'"));
        assert!(errors[0].message.contains("missing 'fi'"));
    }

    #[test]
    fn unclosed_quote_aborts_with_a_single_error() {
        let errors = validate_control_flow(&lines(&[
            "if true; then",
            "echo 'oops",
            "done",
            "fi",
        ]));
        assert_eq!(errors.len(), 1, "got {errors:?}");
        assert_eq!(errors[0].code, ErrorCode::UnclosedQuote);
        assert_eq!(errors[0].position.line, 2);
    }

    #[test]
    fn keywords_inside_substitutions_are_invisible() {
        assert!(codes(&["result=$(if true; then echo y; fi)"]).is_empty());
        assert!(codes(&["echo \"$(while true; do break; done)\""]).is_empty());
    }

    #[test]
    fn keywords_inside_multi_line_string_are_invisible() {
        let script = &["msg='start", "if while done fi", "end'", "echo \"$msg\""];
        assert!(codes(script).is_empty(), "got {:?}", codes(script));
    }

    #[test]
    fn case_arms_do_not_trip_paren_balance() {
        let script = &[
            "case $x in",
            "    a) echo one ;;",
            "    *) echo rest ;;",
            "esac",
        ];
        assert!(codes(script).is_empty(), "got {:?}", codes(script));
    }

    #[test]
    fn stray_paren_is_reported() {
        assert_eq!(codes(&["echo )"]), vec![ErrorCode::UnmatchedParen]);
        assert_eq!(codes(&["echo ( foo"]), vec![ErrorCode::UnmatchedParen]);
    }

    #[test]
    fn unterminated_substitution_is_left_to_the_expansion_pass() {
        assert!(codes(&["echo $("]).is_empty());
        assert!(codes(&["echo $((1 + 2"]).is_empty());
    }

    #[test]
    fn case_without_in_keyword() {
        let errors = validate_control_flow(&lines(&["case $x of", "esac"]));
        assert!(errors.iter().any(|e| e.code == ErrorCode::CaseMalformed));
    }

    #[test]
    fn case_header_split_across_lines() {
        let script = &["case $x", "in", "    a) echo a ;;", "esac"];
        let errors = validate_control_flow(&lines(script));
        assert!(
            !errors.iter().any(|e| e.code == ErrorCode::KeywordMismatch),
            "esac should close a case whose 'in' arrives later: {errors:?}"
        );
    }

    #[test]
    fn brace_group_left_open_is_advisory() {
        let errors = validate_control_flow(&lines(&["myfunc() {", "    echo hi"]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::UnclosedBraceGroup);
    }

    #[test]
    fn embedded_loop_in_pipeline_is_tracked() {
        let errors = validate_control_flow(&lines(&["cat f | while read l; do echo $l"]));
        assert_eq!(errors.len(), 1, "got {errors:?}");
        assert_eq!(errors[0].code, ErrorCode::UnclosedConstruct);
        assert!(errors[0].message.contains("'while'"));
    }

    #[test]
    fn elif_without_condition_inline() {
        let errors =
            validate_control_flow(&lines(&["if a; then b; elif ; then c; fi"]));
        assert!(errors.iter().any(|e| e.code == ErrorCode::ElifMissingCondition));
    }

    #[test]
    fn bare_header_is_left_to_the_statement_pass() {
        assert!(codes(&["for i in 1 2 3"]).is_empty());
        assert!(codes(&["while true"]).is_empty());
    }

    #[test]
    fn bare_headers_count_as_open_for_continuation() {
        assert!(has_open_construct(&lines(&["if true"])));
        assert!(has_open_construct(&lines(&["while true"])));
        assert!(has_open_construct(&lines(&["for i in 1 2 3"])));
        assert!(has_open_construct(&lines(&["case $x"])));
        assert!(has_open_construct(&lines(&["while true; do"])));
    }

    #[test]
    fn complete_headers_are_not_open() {
        assert!(!has_open_construct(&lines(&["for do done"])));
        assert!(!has_open_construct(&lines(&["if true; then", ":", "fi"])));
        assert!(!has_open_construct(&lines(&["while read -r l; do echo \"$l\"; done < f"])));
    }
}
