//! Detection of non-POSIX shell extensions.
//!
//! Only runs when the validator is in POSIX mode. Each construct gets
//! its own code so hosts can allow-list individually.

use marsh_types::{ErrorCode, SyntaxError};

use crate::sanitize::extract_trimmed_line;
use crate::scanner::{is_valid_identifier, should_process_char, QuoteState, ScanFlags};
use crate::token::tokenize_whitespace;

pub fn validate_posix_compliance(lines: &[String]) -> Vec<SyntaxError> {
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let Some(trimmed) = extract_trimmed_line(line) else {
            continue;
        };
        let tokens = tokenize_whitespace(&trimmed);

        match tokens.first().map(String::as_str) {
            Some("function") => errors.push(
                SyntaxError::new(
                    ErrorCode::PosixFunctionKeyword,
                    line_no,
                    "'function' keyword is not available in POSIX mode",
                    line,
                )
                .with_suggestion("Declare with name() { ... } instead"),
            ),
            Some("source") => errors.push(
                SyntaxError::new(
                    ErrorCode::PosixSourceBuiltin,
                    line_no,
                    "'source' is not available in POSIX mode",
                    line,
                )
                .with_suggestion("Use '.' instead"),
            ),
            Some("local") => errors.push(
                SyntaxError::new(
                    ErrorCode::PosixLocalBuiltin,
                    line_no,
                    "'local' is not available in POSIX mode",
                    line,
                )
                .with_suggestion("Assign to an ordinary variable instead"),
            ),
            _ => {}
        }

        for token in &tokens {
            if let Some(pos) = token.find("+=") {
                if pos > 0 && is_valid_identifier(&token[..pos]) {
                    errors.push(
                        SyntaxError::new(
                            ErrorCode::PosixAppendAssign,
                            line_no,
                            "Append assignment '+=' is not available in POSIX mode",
                            line,
                        )
                        .with_suggestion("Use name=\"${name}suffix\" instead"),
                    );
                    break;
                }
            }
        }

        let bytes = trimmed.as_bytes();
        let mut state = QuoteState::default();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i] as char;
            let effective = should_process_char(&mut state, c, ScanFlags::structural());

            if c == '$' && !state.in_single_quotes() && bytes.get(i + 1) == Some(&b'\'') {
                errors.push(SyntaxError::new(
                    ErrorCode::PosixAnsiQuoting,
                    line_no,
                    "ANSI-C quoting $'...' is not available in POSIX mode",
                    line,
                ));
                i += 1;
                continue;
            }

            if !effective || state.in_quotes {
                i += 1;
                continue;
            }

            if c == '[' && trimmed[i..].starts_with("[[") {
                let before_ok = i == 0
                    || (bytes[i - 1] as char).is_ascii_whitespace()
                    || matches!(bytes[i - 1], b';' | b'(' | b'{' | b'!');
                if before_ok {
                    errors.push(
                        SyntaxError::new(
                            ErrorCode::PosixExtendedTest,
                            line_no,
                            "Extended test '[[' is not available in POSIX mode",
                            line,
                        )
                        .with_suggestion("Use '[ ... ]' instead"),
                    );
                    i += 2;
                    continue;
                }
            }

            if c == '<' && trimmed[i..].starts_with("<<<") {
                errors.push(
                    SyntaxError::new(
                        ErrorCode::PosixHereString,
                        line_no,
                        "Here-string '<<<' is not available in POSIX mode",
                        line,
                    )
                    .with_suggestion("Use a here document instead"),
                );
                i += 3;
                continue;
            }

            if c == '&' && bytes.get(i + 1) == Some(&b'>') {
                errors.push(
                    SyntaxError::new(
                        ErrorCode::PosixRedirectShorthand,
                        line_no,
                        "'&>' redirection is not available in POSIX mode",
                        line,
                    )
                    .with_suggestion("Use '> file 2>&1' instead"),
                );
                i += 2;
                continue;
            }

            if c == '|'
                && bytes.get(i + 1) == Some(&b'&')
                && (i == 0 || bytes[i - 1] != b'|')
            {
                errors.push(
                    SyntaxError::new(
                        ErrorCode::PosixPipeAmpersand,
                        line_no,
                        "'|&' is not available in POSIX mode",
                        line,
                    )
                    .with_suggestion("Use '2>&1 |' instead"),
                );
                i += 2;
                continue;
            }

            i += 1;
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(script: &[&str]) -> Vec<String> {
        script.iter().map(|s| s.to_string()).collect()
    }

    fn codes(script: &[&str]) -> Vec<&'static str> {
        validate_posix_compliance(&lines(script))
            .into_iter()
            .map(|e| e.code.code())
            .collect()
    }

    #[test]
    fn extended_test_is_flagged() {
        assert_eq!(codes(&["if [[ -f x ]]; then", "fi"]), vec!["POSIX001"]);
    }

    #[test]
    fn function_keyword_is_flagged() {
        assert_eq!(codes(&["function setup {", "}"]), vec!["POSIX002"]);
    }

    #[test]
    fn append_assignment_is_flagged() {
        assert_eq!(codes(&["path+=/usr/local/bin"]), vec!["POSIX003"]);
    }

    #[test]
    fn pipe_ampersand_is_flagged() {
        assert_eq!(codes(&["make |& tee log"]), vec!["POSIX004"]);
        assert!(codes(&["a || b"]).is_empty());
    }

    #[test]
    fn redirect_shorthand_is_flagged() {
        assert_eq!(codes(&["cmd &> /dev/null"]), vec!["POSIX006"]);
        assert!(codes(&["cmd > f 2>&1"]).is_empty());
    }

    #[test]
    fn source_and_local_builtins_are_flagged() {
        assert_eq!(codes(&["source ./env.sh"]), vec!["POSIX007"]);
        assert_eq!(codes(&["local x=1"]), vec!["POSIX008"]);
    }

    #[test]
    fn here_string_is_flagged() {
        assert_eq!(codes(&["grep x <<< \"$y\""]), vec!["POSIX009"]);
    }

    #[test]
    fn ansi_quoting_is_flagged() {
        assert_eq!(codes(&["echo $'tab\\there'"]), vec!["POSIX010"]);
    }

    #[test]
    fn plain_posix_script_is_clean() {
        let script = &["if [ -f x ]; then", "    . ./env.sh", "fi"];
        assert!(codes(script).is_empty(), "got {:?}", codes(script));
    }

    #[test]
    fn quoted_extensions_are_literal() {
        assert!(codes(&["echo '[[ not a test ]]'"]).is_empty());
        assert!(codes(&["echo \"a |& b\""]).is_empty());
    }
}
