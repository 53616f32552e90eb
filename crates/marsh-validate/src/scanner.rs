//! Quote/escape-aware character scanning.
//!
//! Every pass in this crate walks lines through [`should_process_char`]
//! or the [`for_each_effective_char`] driver, so quoting and escaping
//! behave identically everywhere: a `|` inside single quotes is never a
//! pipe, a `\"` never closes a string.

/// Quote context carried while scanning a line left to right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteState {
    pub in_quotes: bool,
    pub quote_char: Option<char>,
    pub escaped: bool,
}

impl QuoteState {
    /// True while inside a single-quoted region.
    pub fn in_single_quotes(&self) -> bool {
        self.in_quotes && self.quote_char == Some('\'')
    }
}

/// Flags controlling which characters count as "effective".
#[derive(Debug, Clone, Copy)]
pub struct ScanFlags {
    /// Treat single-quoted characters as invisible.
    pub ignore_single_quotes: bool,
    /// Deliver the character following a backslash to the caller.
    pub process_escaped: bool,
    /// Treat double-quoted characters as invisible.
    pub ignore_double_quotes: bool,
}

impl Default for ScanFlags {
    fn default() -> Self {
        Self { ignore_single_quotes: false, process_escaped: true, ignore_double_quotes: false }
    }
}

impl ScanFlags {
    /// Structural scanning: quoted text stays visible, escaped
    /// characters are skipped.
    pub fn structural() -> Self {
        Self { process_escaped: false, ..Self::default() }
    }

    /// Expansion scanning: single-quoted text is invisible (`$` is
    /// literal there), escapes are delivered.
    pub fn skip_single_quoted() -> Self {
        Self { ignore_single_quotes: true, ..Self::default() }
    }
}

/// Advance the quote state by one character and report whether the
/// character is effective under `flags`.
///
/// Quote characters themselves, and the backslash that starts an
/// escape, are never effective.
pub fn should_process_char(state: &mut QuoteState, c: char, flags: ScanFlags) -> bool {
    if state.escaped {
        state.escaped = false;
        return flags.process_escaped;
    }

    if c == '\\' && !state.in_single_quotes() {
        state.escaped = true;
        return false;
    }

    if !state.in_quotes && (c == '"' || c == '\'') {
        state.in_quotes = true;
        state.quote_char = Some(c);
        return false;
    }

    if state.in_quotes && Some(c) == state.quote_char {
        state.in_quotes = false;
        state.quote_char = None;
        return false;
    }

    if state.in_quotes {
        let skip = match state.quote_char {
            Some('\'') => flags.ignore_single_quotes,
            Some('"') => flags.ignore_double_quotes,
            _ => false,
        };
        if skip {
            return false;
        }
    }

    true
}

/// What a [`for_each_effective_char`] callback wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// Move to the next character.
    Continue,
    /// Fast-forward past the next `n` bytes (the callback consumed them).
    Skip(usize),
    /// Stop scanning the line.
    Stop,
}

/// Walk the effective characters of `line`, calling `f` with the byte
/// index, the character, and the quote state after consuming it.
///
/// The callback's return value drives the cursor, so multi-byte
/// operators can be consumed in one step without out-parameters.
pub fn for_each_effective_char<F>(line: &str, flags: ScanFlags, mut f: F)
where
    F: FnMut(usize, char, &QuoteState) -> Scan,
{
    let bytes = line.as_bytes();
    let mut state = QuoteState::default();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if !should_process_char(&mut state, c, flags) {
            i += 1;
            continue;
        }
        match f(i, c, &state) {
            Scan::Continue => i += 1,
            Scan::Skip(n) => i += n + 1,
            Scan::Stop => break,
        }
    }
}

/// Run the full quote scan over a line and return the final state.
pub fn scan_quote_state(line: &str) -> QuoteState {
    let mut state = QuoteState::default();
    for c in line.chars() {
        should_process_char(&mut state, c, ScanFlags::structural());
    }
    state
}

pub fn is_valid_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_valid_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_valid_identifier_start(c) => chars.all(is_valid_identifier_char),
        _ => false,
    }
}

fn is_boundary_char(c: char) -> bool {
    c.is_ascii_whitespace() || matches!(c, ';' | '&' | '|' | '(' | ')' | '{' | '}')
}

/// True when `text[start..start + len]` sits on shell word boundaries.
pub fn is_word_boundary(text: &str, start: usize, len: usize) -> bool {
    let bytes = text.as_bytes();
    if start > bytes.len() {
        return false;
    }
    let end = start + len;
    let start_ok = start == 0 || is_boundary_char(bytes[start - 1] as char);
    let end_ok = end >= bytes.len() || is_boundary_char(bytes[end] as char);
    start_ok && end_ok
}

/// True when `line` begins with `keyword` as its own word.
pub fn starts_with_keyword_token(line: &str, keyword: &str) -> bool {
    let Some(rest) = line.strip_prefix(keyword) else {
        return false;
    };
    match rest.as_bytes().first() {
        None => true,
        Some(&b) => (b as char).is_ascii_whitespace() || b == b'(',
    }
}

/// True when `token` is `keyword`, optionally followed by semicolons
/// (`do`, `do;`, `do;;`).
pub fn is_keyword_token(token: &str, keyword: &str) -> bool {
    token
        .strip_prefix(keyword)
        .is_some_and(|rest| rest.bytes().all(|b| b == b';'))
}

pub fn is_do_token(token: &str) -> bool {
    is_keyword_token(token, "do")
}

pub fn is_done_token(token: &str) -> bool {
    is_keyword_token(token, "done")
}

/// Last token before any comment token.
pub fn get_last_non_comment_token<'a>(tokens: &'a [String]) -> &'a str {
    let mut last = "";
    for token in tokens {
        if token.starts_with('#') {
            break;
        }
        if !token.is_empty() {
            last = token;
        }
    }
    last
}

/// First identifier embedded in `token`, e.g. `"$x,"` yields `x`.
pub fn extract_identifier_from_token(token: &str) -> &str {
    let bytes = token.as_bytes();
    let mut start = 0;
    while start < bytes.len() && !is_valid_identifier_start(bytes[start] as char) {
        start += 1;
    }
    if start >= bytes.len() {
        return "";
    }
    let mut end = start + 1;
    while end < bytes.len() && is_valid_identifier_char(bytes[end] as char) {
        end += 1;
    }
    &token[start..end]
}

/// True when `terminator` appears in `text` as a standalone word.
pub fn has_inline_terminator(text: &str, terminator: &str) -> bool {
    let mut from = 0;
    while let Some(off) = text[from..].find(terminator) {
        let pos = from + off;
        if is_word_boundary(text, pos, terminator.len()) {
            return true;
        }
        from = pos + 1;
    }
    false
}

/// Find an unquoted word-boundary occurrence of `keyword` at or after
/// `search_from`, returning its byte index.
pub fn find_unquoted_keyword(line: &str, keyword: &str, search_from: usize) -> Option<usize> {
    if keyword.is_empty() || search_from >= line.len() {
        return None;
    }
    let bytes = line.as_bytes();
    let mut state = QuoteState::default();
    let mut i = search_from;
    while i + keyword.len() <= bytes.len() {
        let c = bytes[i] as char;
        if should_process_char(&mut state, c, ScanFlags::default())
            && bytes[i] == keyword.as_bytes()[0]
            && line[i..].starts_with(keyword)
            && is_word_boundary(line, i, keyword.len())
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Strip an unquoted `#` comment from the line.
///
/// `#` inside quotes, inside `${...}`, or directly after `$` (as in
/// `$#`) does not start a comment.
pub fn strip_inline_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut quote = 0u8;
    let mut in_brace_expansion = false;

    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];

        if !in_quotes && c == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            in_brace_expansion = true;
        } else if in_brace_expansion && c == b'}' {
            in_brace_expansion = false;
        }

        if !in_quotes && !in_brace_expansion && c == b'$' && i + 1 < bytes.len() {
            let next = bytes[i + 1];
            if matches!(next, b'#' | b'?' | b'$' | b'*' | b'@' | b'!')
                || next.is_ascii_digit()
            {
                i += 2;
                continue;
            }
        }

        if c == b'"' || c == b'\'' {
            let mut backslashes = 0;
            let mut j = i;
            while j > 0 && bytes[j - 1] == b'\\' {
                backslashes += 1;
                j -= 1;
            }
            if backslashes % 2 == 0 {
                if !in_quotes {
                    in_quotes = true;
                    quote = c;
                } else if quote == c {
                    in_quotes = false;
                    quote = 0;
                }
            }
        } else if !in_quotes && !in_brace_expansion && c == b'#' {
            return &line[..i];
        }
        i += 1;
    }
    line
}

/// Comment-stripped and trimmed view of a line, the form every
/// keyword-oriented pass works over.
pub fn process_line_for_validation(line: &str) -> &str {
    strip_inline_comment(line).trim()
}

/// Map a byte offset inside a multi-line string back to a display line.
pub fn adjust_display_line(text: &str, base_line: usize, offset: usize) -> usize {
    let limit = offset.min(text.len());
    base_line + text.as_bytes()[..limit].iter().filter(|&&b| b == b'\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_toggle_state() {
        let mut state = QuoteState::default();
        assert!(!should_process_char(&mut state, '\'', ScanFlags::default()));
        assert!(state.in_quotes);
        assert!(should_process_char(&mut state, 'x', ScanFlags::default()));
        assert!(!should_process_char(&mut state, '\'', ScanFlags::default()));
        assert!(!state.in_quotes);
    }

    #[test]
    fn escapes_hide_the_next_char() {
        let mut state = QuoteState::default();
        let flags = ScanFlags::structural();
        assert!(!should_process_char(&mut state, '\\', flags));
        assert!(!should_process_char(&mut state, '"', flags), "escaped quote is not effective");
        assert!(!state.in_quotes, "escaped quote must not open a string");
    }

    #[test]
    fn backslash_is_literal_in_single_quotes() {
        let state = scan_quote_state(r"'a\'");
        assert!(!state.in_quotes, "backslash cannot escape inside single quotes");
    }

    #[test]
    fn unterminated_quote_survives_scan() {
        let state = scan_quote_state("echo 'oops");
        assert!(state.in_quotes);
        assert_eq!(state.quote_char, Some('\''));
    }

    #[test]
    fn skip_single_quoted_hides_content() {
        let mut seen = String::new();
        for_each_effective_char("a'b'c", ScanFlags::skip_single_quoted(), |_, c, _| {
            seen.push(c);
            Scan::Continue
        });
        assert_eq!(seen, "ac");
    }

    #[test]
    fn skip_fast_forwards() {
        let mut seen = Vec::new();
        for_each_effective_char("abcdef", ScanFlags::default(), |i, c, _| {
            seen.push((i, c));
            if c == 'b' { Scan::Skip(2) } else { Scan::Continue }
        });
        assert_eq!(seen, vec![(0, 'a'), (1, 'b'), (4, 'e'), (5, 'f')]);
    }

    #[test]
    fn word_boundaries() {
        assert!(is_word_boundary("for i; do", 7, 2));
        assert!(!is_word_boundary("dodge", 0, 2));
        assert!(has_inline_terminator("do :; done", "done"));
        assert!(!has_inline_terminator("doneish", "done"));
    }

    #[test]
    fn keyword_tokens_allow_trailing_semicolons() {
        assert!(is_do_token("do"));
        assert!(is_do_token("do;"));
        assert!(!is_do_token("done"));
        assert!(is_done_token("done;;"));
    }

    #[test]
    fn inline_comment_stripping() {
        assert_eq!(strip_inline_comment("echo hi # trailing"), "echo hi ");
        assert_eq!(strip_inline_comment("echo '#not a comment'"), "echo '#not a comment'");
        assert_eq!(strip_inline_comment("echo ${#var}"), "echo ${#var}");
        assert_eq!(strip_inline_comment("echo $#"), "echo $#");
    }

    #[test]
    fn identifier_extraction() {
        assert_eq!(extract_identifier_from_token("\"$name\""), "name");
        assert_eq!(extract_identifier_from_token("123"), "");
        assert!(is_valid_identifier("_foo2"));
        assert!(!is_valid_identifier("2foo"));
    }

    #[test]
    fn display_line_adjustment() {
        assert_eq!(adjust_display_line("a\nb\nc", 1, 4), 3);
        assert_eq!(adjust_display_line("abc", 5, 2), 5);
    }
}
