//! The closed error-code taxonomy.
//!
//! Wire codes are stable: hosts match on strings like `"SYN001"` and
//! those strings never change meaning between releases. A few distinct
//! conditions share a wire code (noted per variant); the enum keeps them
//! apart so the engine can reason about them separately.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::severity::{ErrorCategory, Severity};

/// Every diagnostic the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unclosed single or double quote. Wire code `SYN001`.
    UnclosedQuote,
    /// A control-flow construct left open at end of script. Shares `SYN001`.
    UnclosedConstruct,
    /// A closing keyword with no matching opener (`fi` without `if`). Shares `SYN001`.
    KeywordMismatch,
    /// Unmatched `(` or `)` outside any recognized construct. Shares `SYN001`.
    UnmatchedParen,
    /// `for` header malformed or missing `do`. Wire code `SYN002`.
    ForMalformed,
    /// `while`/`until` missing its condition or with an unclosed test. Wire code `SYN003`.
    WhileMalformed,
    /// `if` missing its condition or `then`. Wire code `SYN004`.
    IfMalformed,
    /// Unclosed `$(` command substitution. Wire code `SYN005`.
    UnclosedCommandSub,
    /// Unclosed backtick substitution. Wire code `SYN006`.
    UnclosedBacktick,
    /// Unclosed `{` group or function body; advisory. Wire code `SYN007`.
    UnclosedBraceGroup,
    /// `case` missing `in` or otherwise malformed. Wire code `SYN008`.
    CaseMalformed,
    /// Unclosed `${` parameter expansion. Shares `SYN008`.
    UnclosedParamExpansion,
    /// Unclosed array literal `name=(`. Wire code `SYN009`.
    UnclosedArrayLiteral,
    /// Here-document never terminated by its delimiter. Wire code `SYN010`.
    UnterminatedHeredoc,
    /// Second heredoc opened on a line that already has one. Wire code `SYN011`.
    NestedHeredoc,
    /// `elif` with no condition before `then`. Wire code `SYN012`.
    ElifMissingCondition,

    /// Variable used but never defined. Wire code `VAR002`.
    VarUsedNotDefined,
    /// Variable defined but never used. Wire code `VAR003`.
    VarDefinedNotUsed,
    /// Assignment name does not start with a letter or underscore. Wire code `VAR004`.
    InvalidVariableName,
    /// Spaces around `=` or a bad array index in an assignment. Wire code `VAR005`.
    InvalidAssignment,

    /// Unclosed `$((`. Wire code `ARITH001`.
    UnclosedArithmetic,
    /// `$(( ))` with no expression. Wire code `ARITH002`.
    EmptyArithmetic,
    /// Arithmetic expression ends in an operator. Wire code `ARITH003`.
    TrailingArithOperator,
    /// Literal division or modulo by zero. Wire code `ARITH004`.
    DivisionByZero,
    /// Unbalanced parentheses inside an arithmetic expression. Wire code `ARITH005`.
    UnbalancedArithParens,
    /// Deprecated `$[ ]` arithmetic form. Wire code `ARITH006`.
    DeprecatedArithSyntax,

    /// Redirection with no target word. Wire code `RED001`.
    RedirMissingTarget,
    /// `>&`/`<&` not followed by a descriptor, `-`, or word. Wire code `RED002`.
    BadFdDuplication,
    /// `<<` with no delimiter word. Wire code `RED003`.
    HeredocMissingDelimiter,
    /// Redirection target is itself an operator. Wire code `RED004`.
    RedirTargetIsOperator,
    /// Doubled redirection operator (`> >`). Wire code `RED005`.
    DoubledRedirection,

    /// Pipeline starts or ends with `|`, or has an empty segment. Wire code `PIPE001`.
    EmptyPipelineSegment,
    /// Consecutive pipe operators. Wire code `PIPE002`.
    ConsecutivePipes,

    /// `[[ ]]` extended test in POSIX mode. Wire code `POSIX001`.
    PosixExtendedTest,
    /// `function` keyword in POSIX mode. Wire code `POSIX002`.
    PosixFunctionKeyword,
    /// `+=` append assignment in POSIX mode. Wire code `POSIX003`.
    PosixAppendAssign,
    /// `|&` pipe shorthand in POSIX mode. Wire code `POSIX004`.
    PosixPipeAmpersand,
    /// Array syntax in POSIX mode. Wire code `POSIX005`.
    PosixArray,
    /// `&>` redirect shorthand in POSIX mode. Wire code `POSIX006`.
    PosixRedirectShorthand,
    /// `source` builtin in POSIX mode (use `.`). Wire code `POSIX007`.
    PosixSourceBuiltin,
    /// `local` builtin in POSIX mode. Wire code `POSIX008`.
    PosixLocalBuiltin,
    /// `<<<` here-string in POSIX mode. Wire code `POSIX009`.
    PosixHereString,
    /// `$'...'` ANSI-C quoting in POSIX mode. Wire code `POSIX010`.
    PosixAnsiQuoting,

    /// Condition chains more than three logical operators. Wire code `STYLE001`.
    ComplexCondition,
    /// Test brackets nested deeper than two levels. Wire code `STYLE002`.
    DeeplyNestedTest,
    /// Line longer than 100 characters. Wire code `STYLE003`.
    LongLine,
    /// Tabs and spaces mixed in indentation. Wire code `STYLE004`.
    MixedIndentation,
    /// `eval` or command substitution; input should be validated. Wire code `STYLE005`.
    UnsafeEval,

    /// Function declaration with no name. Wire code `FUNC001`.
    MissingFunctionName,
    /// Function name is not a valid identifier. Wire code `FUNC002`.
    InvalidFunctionName,
}

impl ErrorCode {
    /// The stable wire code, e.g. `"SYN005"`.
    pub fn code(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            UnclosedQuote | UnclosedConstruct | KeywordMismatch | UnmatchedParen => "SYN001",
            ForMalformed => "SYN002",
            WhileMalformed => "SYN003",
            IfMalformed => "SYN004",
            UnclosedCommandSub => "SYN005",
            UnclosedBacktick => "SYN006",
            UnclosedBraceGroup => "SYN007",
            CaseMalformed | UnclosedParamExpansion => "SYN008",
            UnclosedArrayLiteral => "SYN009",
            UnterminatedHeredoc => "SYN010",
            NestedHeredoc => "SYN011",
            ElifMissingCondition => "SYN012",

            VarUsedNotDefined => "VAR002",
            VarDefinedNotUsed => "VAR003",
            InvalidVariableName => "VAR004",
            InvalidAssignment => "VAR005",

            UnclosedArithmetic => "ARITH001",
            EmptyArithmetic => "ARITH002",
            TrailingArithOperator => "ARITH003",
            DivisionByZero => "ARITH004",
            UnbalancedArithParens => "ARITH005",
            DeprecatedArithSyntax => "ARITH006",

            RedirMissingTarget => "RED001",
            BadFdDuplication => "RED002",
            HeredocMissingDelimiter => "RED003",
            RedirTargetIsOperator => "RED004",
            DoubledRedirection => "RED005",

            EmptyPipelineSegment => "PIPE001",
            ConsecutivePipes => "PIPE002",

            PosixExtendedTest => "POSIX001",
            PosixFunctionKeyword => "POSIX002",
            PosixAppendAssign => "POSIX003",
            PosixPipeAmpersand => "POSIX004",
            PosixArray => "POSIX005",
            PosixRedirectShorthand => "POSIX006",
            PosixSourceBuiltin => "POSIX007",
            PosixLocalBuiltin => "POSIX008",
            PosixHereString => "POSIX009",
            PosixAnsiQuoting => "POSIX010",

            ComplexCondition => "STYLE001",
            DeeplyNestedTest => "STYLE002",
            LongLine => "STYLE003",
            MixedIndentation => "STYLE004",
            UnsafeEval => "STYLE005",

            MissingFunctionName => "FUNC001",
            InvalidFunctionName => "FUNC002",
        }
    }

    /// Severity a diagnostic with this code carries unless overridden.
    pub fn default_severity(&self) -> Severity {
        use ErrorCode::*;
        match self {
            // The script cannot be interpreted past these.
            UnclosedQuote | UnclosedConstruct | KeywordMismatch | UnmatchedParen
            | UnclosedCommandSub | UnclosedBacktick | UnclosedParamExpansion
            | UnclosedArrayLiteral | UnterminatedHeredoc | UnclosedArithmetic => {
                Severity::Critical
            }

            ForMalformed | WhileMalformed | IfMalformed | CaseMalformed
            | ElifMissingCondition | InvalidVariableName | InvalidAssignment
            | EmptyArithmetic | TrailingArithOperator | UnbalancedArithParens
            | RedirMissingTarget | BadFdDuplication | HeredocMissingDelimiter
            | RedirTargetIsOperator | DoubledRedirection | EmptyPipelineSegment
            | ConsecutivePipes | MissingFunctionName | InvalidFunctionName => Severity::Error,

            PosixExtendedTest | PosixFunctionKeyword | PosixAppendAssign
            | PosixPipeAmpersand | PosixArray | PosixRedirectShorthand
            | PosixSourceBuiltin | PosixLocalBuiltin | PosixHereString
            | PosixAnsiQuoting => Severity::Error,

            // Advisory: a brace group may legitimately span a paste buffer.
            UnclosedBraceGroup | NestedHeredoc | VarUsedNotDefined | DivisionByZero
            | DeprecatedArithSyntax | UnsafeEval => Severity::Warning,

            VarDefinedNotUsed | ComplexCondition | DeeplyNestedTest | LongLine
            | MixedIndentation => Severity::Info,
        }
    }

    /// Category a diagnostic with this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        use ErrorCode::*;
        match self {
            UnclosedConstruct | KeywordMismatch | ForMalformed | WhileMalformed
            | IfMalformed | UnclosedBraceGroup | CaseMalformed | ElifMissingCondition => {
                ErrorCategory::ControlFlow
            }

            VarUsedNotDefined | VarDefinedNotUsed | InvalidVariableName
            | InvalidAssignment => ErrorCategory::Variables,

            RedirMissingTarget | BadFdDuplication | HeredocMissingDelimiter
            | RedirTargetIsOperator | DoubledRedirection | UnterminatedHeredoc
            | NestedHeredoc => ErrorCategory::Redirection,

            DivisionByZero => ErrorCategory::Semantics,

            DeprecatedArithSyntax | ComplexCondition | DeeplyNestedTest | LongLine
            | MixedIndentation | UnsafeEval => ErrorCategory::Style,

            UnclosedQuote | UnmatchedParen | UnclosedCommandSub | UnclosedBacktick
            | UnclosedParamExpansion | UnclosedArrayLiteral | UnclosedArithmetic
            | EmptyArithmetic | TrailingArithOperator | UnbalancedArithParens
            | EmptyPipelineSegment | ConsecutivePipes | PosixExtendedTest
            | PosixFunctionKeyword | PosixAppendAssign | PosixPipeAmpersand
            | PosixArray | PosixRedirectShorthand | PosixSourceBuiltin
            | PosixLocalBuiltin | PosixHereString | PosixAnsiQuoting
            | MissingFunctionName | InvalidFunctionName => ErrorCategory::Syntax,
        }
    }

    /// True for the POSIX-mode-only codes.
    pub fn is_posix(&self) -> bool {
        self.code().starts_with("POSIX")
    }

    /// True for codes that mean "a required keyword is missing from a
    /// construct": `SYN002`, `SYN003`, `SYN004`, `SYN008`, `SYN012`.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ErrorCode::ForMalformed
                | ErrorCode::WhileMalformed
                | ErrorCode::IfMalformed
                | ErrorCode::CaseMalformed
                | ErrorCode::ElifMissingCondition
        )
    }

    /// True for codes that mean the script simply stops mid-construct,
    /// the signal an interactive host uses to prompt for another line.
    pub fn signals_incomplete_input(&self) -> bool {
        matches!(
            self,
            ErrorCode::UnclosedQuote
                | ErrorCode::UnclosedConstruct
                | ErrorCode::UnclosedCommandSub
                | ErrorCode::UnclosedBacktick
                | ErrorCode::UnclosedParamExpansion
                | ErrorCode::UnclosedArithmetic
                | ErrorCode::UnclosedArrayLiteral
                | ErrorCode::UnclosedBraceGroup
                | ErrorCode::UnterminatedHeredoc
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A wire code string that names no known diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    /// Parse a wire code back to its canonical variant.
    ///
    /// Shared wire codes resolve to the variant listed first in the
    /// taxonomy (`SYN001` parses as [`ErrorCode::UnclosedQuote`],
    /// `SYN008` as [`ErrorCode::CaseMalformed`]).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ErrorCode::*;
        let code = match s {
            "SYN001" => UnclosedQuote,
            "SYN002" => ForMalformed,
            "SYN003" => WhileMalformed,
            "SYN004" => IfMalformed,
            "SYN005" => UnclosedCommandSub,
            "SYN006" => UnclosedBacktick,
            "SYN007" => UnclosedBraceGroup,
            "SYN008" => CaseMalformed,
            "SYN009" => UnclosedArrayLiteral,
            "SYN010" => UnterminatedHeredoc,
            "SYN011" => NestedHeredoc,
            "SYN012" => ElifMissingCondition,
            "VAR002" => VarUsedNotDefined,
            "VAR003" => VarDefinedNotUsed,
            "VAR004" => InvalidVariableName,
            "VAR005" => InvalidAssignment,
            "ARITH001" => UnclosedArithmetic,
            "ARITH002" => EmptyArithmetic,
            "ARITH003" => TrailingArithOperator,
            "ARITH004" => DivisionByZero,
            "ARITH005" => UnbalancedArithParens,
            "ARITH006" => DeprecatedArithSyntax,
            "RED001" => RedirMissingTarget,
            "RED002" => BadFdDuplication,
            "RED003" => HeredocMissingDelimiter,
            "RED004" => RedirTargetIsOperator,
            "RED005" => DoubledRedirection,
            "PIPE001" => EmptyPipelineSegment,
            "PIPE002" => ConsecutivePipes,
            "POSIX001" => PosixExtendedTest,
            "POSIX002" => PosixFunctionKeyword,
            "POSIX003" => PosixAppendAssign,
            "POSIX004" => PosixPipeAmpersand,
            "POSIX005" => PosixArray,
            "POSIX006" => PosixRedirectShorthand,
            "POSIX007" => PosixSourceBuiltin,
            "POSIX008" => PosixLocalBuiltin,
            "POSIX009" => PosixHereString,
            "POSIX010" => PosixAnsiQuoting,
            "STYLE001" => ComplexCondition,
            "STYLE002" => DeeplyNestedTest,
            "STYLE003" => LongLine,
            "STYLE004" => MixedIndentation,
            "STYLE005" => UnsafeEval,
            "FUNC001" => MissingFunctionName,
            "FUNC002" => InvalidFunctionName,
            other => return Err(UnknownErrorCode(other.to_string())),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(ErrorCode::UnclosedQuote.code(), "SYN001");
        assert_eq!(ErrorCode::UnclosedCommandSub.code(), "SYN005");
        assert_eq!(ErrorCode::VarDefinedNotUsed.code(), "VAR003");
        assert_eq!(ErrorCode::PosixArray.code(), "POSIX005");
        assert_eq!(ErrorCode::InvalidFunctionName.code(), "FUNC002");
    }

    #[test]
    fn shared_wire_codes() {
        assert_eq!(ErrorCode::UnclosedConstruct.code(), ErrorCode::UnclosedQuote.code());
        assert_eq!(
            ErrorCode::UnclosedParamExpansion.code(),
            ErrorCode::CaseMalformed.code()
        );
    }

    #[test]
    fn parse_round_trips_canonical_variants() {
        for s in ["SYN002", "VAR004", "ARITH006", "RED005", "PIPE001", "POSIX010", "STYLE004"] {
            let code: ErrorCode = s.parse().unwrap();
            assert_eq!(code.code(), s, "round trip for {}", s);
        }
        assert!("SYN999".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn advisory_brace_group_is_not_critical() {
        assert_eq!(
            ErrorCode::UnclosedBraceGroup.default_severity(),
            Severity::Warning
        );
        assert!(ErrorCode::UnclosedBraceGroup.signals_incomplete_input());
    }

    #[test]
    fn posix_codes_identify_themselves() {
        assert!(ErrorCode::PosixHereString.is_posix());
        assert!(!ErrorCode::UnclosedQuote.is_posix());
    }

    #[test]
    fn structural_codes() {
        assert!(ErrorCode::ForMalformed.is_structural());
        assert!(ErrorCode::ElifMissingCondition.is_structural());
        assert!(!ErrorCode::UnclosedQuote.is_structural());
    }
}
