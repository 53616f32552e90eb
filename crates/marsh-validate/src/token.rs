//! Small shell tokenizer used by the variable and statement passes.
//!
//! This is deliberately not a full lexer. It splits a line segment into
//! words and operators well enough to answer questions like "which
//! token follows `export`" and "is this word an assignment".

/// Split on ASCII whitespace. The statement analyzers work over this
/// coarse view.
pub fn tokenize_whitespace(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

const THREE_CHAR_OPS: [&str; 1] = [";;&"];
const TWO_CHAR_OPS: [&str; 4] = ["&&", "||", ";;", ";&"];

fn single_char_op(c: char) -> bool {
    matches!(c, ';' | '|' | '&' | '(' | ')' | '{' | '}')
}

/// Tokenize a line segment into words and operator tokens. Quoted and
/// escaped characters stay inside their word, so `a="b c"` is one
/// token.
pub fn tokenize_shell_segment(segment: &str) -> Vec<String> {
    let bytes = segment.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if let Some(op) = THREE_CHAR_OPS.iter().find(|op| segment[i..].starts_with(**op)) {
            tokens.push((*op).to_string());
            i += op.len();
            continue;
        }
        if let Some(op) = TWO_CHAR_OPS.iter().find(|op| segment[i..].starts_with(**op)) {
            tokens.push((*op).to_string());
            i += op.len();
            continue;
        }
        if single_char_op(c) {
            tokens.push(c.to_string());
            i += 1;
            continue;
        }

        let start = i;
        let mut in_quotes = false;
        let mut quote = ' ';
        let mut escaped = false;
        while i < bytes.len() {
            let w = bytes[i] as char;
            if escaped {
                escaped = false;
                i += 1;
                continue;
            }
            if w == '\\' && quote != '\'' {
                escaped = true;
                i += 1;
                continue;
            }
            if !in_quotes && (w == '"' || w == '\'') {
                in_quotes = true;
                quote = w;
            } else if in_quotes && w == quote {
                in_quotes = false;
                quote = ' ';
            } else if !in_quotes && (w.is_ascii_whitespace() || single_char_op(w)) {
                break;
            }
            i += 1;
        }
        tokens.push(segment[start..i].to_string());
    }

    tokens
}

/// Tokens that end a simple command and start a fresh one.
pub fn is_separator_token(token: &str) -> bool {
    matches!(
        token,
        ";" | ";;" | ";&" | ";;&" | "|" | "||" | "&" | "&&" | "(" | ")" | "{" | "}"
            | "do" | "then" | "elif" | "else" | "fi" | "done"
    )
}

/// True for `NAME=value`-shaped tokens. `==` and `=~` comparisons and
/// quoted words are not assignments.
pub fn is_assignment_token(token: &str) -> bool {
    if token.starts_with('\'') || token.starts_with('"') {
        return false;
    }
    match token.find('=') {
        None | Some(0) => false,
        Some(pos) => !matches!(token.as_bytes().get(pos + 1), Some(b'=') | Some(b'~')),
    }
}

/// Variable name of an assignment token: `x+=1` and `arr[0]=v` both
/// normalize to the bare name.
pub fn normalize_assignment_identifier(token: &str) -> Option<&str> {
    let lhs = &token[..token.find('=')?];
    let lhs = lhs.strip_suffix('+').unwrap_or(lhs);
    let lhs = match lhs.find('[') {
        Some(pos) => &lhs[..pos],
        None => lhs,
    };
    if lhs.is_empty() { None } else { Some(lhs) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_and_operators_split() {
        assert_eq!(
            tokenize_shell_segment("a=1 b=2; echo $a && true"),
            vec!["a=1", "b=2", ";", "echo", "$a", "&&", "true"]
        );
    }

    #[test]
    fn quoted_spaces_stay_in_one_token() {
        assert_eq!(
            tokenize_shell_segment(r#"msg="hello world" echo"#),
            vec![r#"msg="hello world""#, "echo"]
        );
    }

    #[test]
    fn case_terminators_tokenize_whole() {
        assert_eq!(tokenize_shell_segment("a) echo;; b)"), vec!["a", ")", "echo", ";;", "b", ")"]);
        assert_eq!(tokenize_shell_segment(";;& x"), vec![";;&", "x"]);
    }

    #[test]
    fn assignment_detection() {
        assert!(is_assignment_token("x=1"));
        assert!(is_assignment_token("arr[2]=v"));
        assert!(is_assignment_token("x+=1"));
        assert!(!is_assignment_token("=x"));
        assert!(!is_assignment_token("a==b"));
        assert!(!is_assignment_token("a=~b"));
        assert!(!is_assignment_token("'x=1'"));
        assert!(!is_assignment_token("word"));
    }

    #[test]
    fn assignment_identifier_normalization() {
        assert_eq!(normalize_assignment_identifier("x=1"), Some("x"));
        assert_eq!(normalize_assignment_identifier("x+=1"), Some("x"));
        assert_eq!(normalize_assignment_identifier("arr[0]=v"), Some("arr"));
        assert_eq!(normalize_assignment_identifier("=1"), None);
        assert_eq!(normalize_assignment_identifier("plain"), None);
    }
}
