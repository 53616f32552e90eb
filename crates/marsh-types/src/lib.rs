//! marsh-types: the shared diagnostic model for marsh.
//!
//! This crate provides:
//!
//! - **Severity / category**: the four severity levels and the broad
//!   diagnostic categories used for filtering and tooling
//! - **Error codes**: the closed taxonomy of stable wire codes
//!   (`SYN*`, `VAR*`, `ARITH*`, `RED*`, `PIPE*`, `POSIX*`, `STYLE*`,
//!   `FUNC*`) with per-code default severity and category
//! - **SyntaxError**: the diagnostic record itself, with builder-style
//!   constructors and a compact human-readable rendering
//!
//! The validation engine lives in `marsh-validate`; hosts that only
//! consume diagnostics (a REPL, an editor plugin) can depend on this
//! crate alone.

pub mod code;
pub mod error;
pub mod severity;

pub use code::{ErrorCode, UnknownErrorCode};
pub use error::{ErrorPosition, SyntaxError};
pub use severity::{ErrorCategory, Severity};
