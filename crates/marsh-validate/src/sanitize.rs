//! Line pre-processing that keeps inner text from confusing outer
//! analysis.
//!
//! Command substitutions are replaced with a fixed placeholder before
//! control-flow scanning, so `if grep -q "$(echo 'do')" f; then` does
//! not look like a loop header. Multi-line single-quoted literals are
//! blanked so their interior is never parsed as code.

use crate::scanner::{should_process_char, QuoteState, ScanFlags};

/// Stand-in for blanked command substitution bodies. Contains no shell
/// metacharacters, so downstream passes treat it as an ordinary word.
pub const SUBST_PLACEHOLDER: &str = "__MARSH_SUBST__";

pub(crate) fn find_closing_paren(line: &str, from: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut state = QuoteState::default();
    let mut depth = 1usize;
    let mut i = from;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if should_process_char(&mut state, c, ScanFlags::default()) {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

pub(crate) fn find_closing_backtick(line: &str, from: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let mut backslashes = 0;
            let mut j = i;
            while j > from && bytes[j - 1] == b'\\' {
                backslashes += 1;
                j -= 1;
            }
            if backslashes % 2 == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Replace the body of every closed `$(...)` and `` `...` `` with
/// [`SUBST_PLACEHOLDER`], keeping the delimiters. Unterminated
/// substitutions are copied through untouched so the expansion pass can
/// still report them.
pub fn sanitize_command_substitutions(line: &str) -> String {
    let bytes = line.as_bytes();
    // Byte-level copy: the only bytes inspected are ASCII, and every
    // byte written is either copied from the input or ASCII, so the
    // result is valid UTF-8 whenever the input is.
    let mut out: Vec<u8> = Vec::with_capacity(line.len());
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];

        if escaped {
            escaped = false;
            out.push(b);
            i += 1;
            continue;
        }
        if b == b'\\' && !in_single {
            escaped = true;
            out.push(b);
            i += 1;
            continue;
        }
        if b == b'\'' && !in_double {
            in_single = !in_single;
            out.push(b);
            i += 1;
            continue;
        }
        if b == b'"' && !in_single {
            in_double = !in_double;
            out.push(b);
            i += 1;
            continue;
        }

        if !in_single && b == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'(' {
            if let Some(close) = find_closing_paren(line, i + 2) {
                out.extend_from_slice(b"$(");
                out.extend_from_slice(SUBST_PLACEHOLDER.as_bytes());
                out.push(b')');
                i = close + 1;
                continue;
            }
        }

        if !in_single && b == b'`' {
            if let Some(close) = find_closing_backtick(line, i + 1) {
                out.push(b'`');
                out.extend_from_slice(SUBST_PLACEHOLDER.as_bytes());
                out.push(b'`');
                i = close + 1;
                continue;
            }
        }

        out.push(b);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Blank single-quoted literals that span multiple lines, delimiters
/// included, replacing each byte with a space so column positions stay
/// stable. A literal that never closes is left untouched from its
/// opening quote onward, so the quote scan reports it where it opened.
pub fn sanitize_lines(lines: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_literal = false;
    // Where the currently open literal started: (line index, byte offset).
    let mut open: Option<(usize, usize)> = None;

    for (idx, line) in lines.iter().enumerate() {
        let mut sanitized: Vec<u8> = Vec::with_capacity(line.len());
        let mut in_double = false;
        let mut escaped = false;

        for (i, &b) in line.as_bytes().iter().enumerate() {
            if in_literal {
                sanitized.push(b' ');
                if b == b'\'' {
                    in_literal = false;
                    open = None;
                }
                continue;
            }
            if escaped {
                escaped = false;
                sanitized.push(b);
                continue;
            }
            match b {
                b'\\' => {
                    escaped = true;
                    sanitized.push(b);
                }
                b'"' => {
                    in_double = !in_double;
                    sanitized.push(b);
                }
                b'\'' if !in_double => {
                    in_literal = true;
                    open = Some((idx, i));
                    sanitized.push(b);
                }
                _ => sanitized.push(b),
            }
        }

        if in_literal {
            if let Some((open_line, open_col)) = open {
                if open_line == idx {
                    // The literal crosses into the next line: blank its
                    // opening delimiter and interior on this line too.
                    for b in &mut sanitized[open_col..] {
                        *b = b' ';
                    }
                }
            }
        }
        out.push(String::from_utf8_lossy(&sanitized).into_owned());
    }

    // A literal still open at end of script is an unterminated quote,
    // not a multi-line string. Put the original text back so the error
    // is reported at the opening line.
    if in_literal {
        if let Some((open_line, open_col)) = open {
            out[open_line].replace_range(open_col.., &lines[open_line][open_col..]);
            for idx in (open_line + 1)..lines.len() {
                out[idx] = lines[idx].clone();
            }
        }
    }

    out
}

/// Leading-whitespace-trimmed, substitution-sanitized view of a line.
/// Returns `None` for blank lines and full-line comments.
pub fn extract_trimmed_line(line: &str) -> Option<String> {
    let first = line.find(|c: char| c != ' ' && c != '\t')?;
    if line[first..].starts_with('#') {
        return None;
    }
    Some(sanitize_command_substitutions(&line[first..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(script: &[&str]) -> Vec<String> {
        script.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substitution_bodies_are_blanked() {
        let out = sanitize_command_substitutions("echo $(ls -l; echo 'do')");
        assert_eq!(out, format!("echo $({SUBST_PLACEHOLDER})"));
    }

    #[test]
    fn nested_substitutions_collapse_to_one_placeholder() {
        let out = sanitize_command_substitutions("x=$(echo $(date))");
        assert_eq!(out, format!("x=$({SUBST_PLACEHOLDER})"));
    }

    #[test]
    fn backtick_bodies_are_blanked() {
        let out = sanitize_command_substitutions("echo `ls | wc -l` end");
        assert_eq!(out, format!("echo `{SUBST_PLACEHOLDER}` end"));
    }

    #[test]
    fn unterminated_substitution_is_untouched() {
        assert_eq!(sanitize_command_substitutions("echo $(ls"), "echo $(ls");
    }

    #[test]
    fn single_quoted_dollar_paren_is_literal() {
        let text = "echo '$(not a subst)'";
        assert_eq!(sanitize_command_substitutions(text), text);
    }

    #[test]
    fn multi_line_literal_is_blanked() {
        let out = sanitize_lines(&lines(&["msg='first", "if then done", "end' tail"]));
        assert_eq!(out[0], "msg=      ");
        assert_eq!(out[1], "            ");
        assert_eq!(out[2], "     tail");
        assert_eq!(out[0].len(), "msg='first".len(), "columns must be preserved");
    }

    #[test]
    fn unterminated_literal_is_restored() {
        let src = lines(&["echo 'oops", "more text"]);
        let out = sanitize_lines(&src);
        assert_eq!(out, src, "unclosed quote must stay visible to the quote scan");
    }

    #[test]
    fn single_line_quotes_are_kept() {
        let src = lines(&["echo 'hello' 'world'"]);
        assert_eq!(sanitize_lines(&src), src);
    }

    #[test]
    fn trimmed_line_extraction() {
        assert_eq!(extract_trimmed_line("   echo hi"), Some("echo hi".to_string()));
        assert_eq!(extract_trimmed_line("  # comment"), None);
        assert_eq!(extract_trimmed_line(""), None);
        assert_eq!(extract_trimmed_line(" \t "), None);
    }
}
