//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics are kept lightweight: every user-facing error carries the
//! source position it was raised at and renders as a single `line:col`
//! message. The first error aborts the compile; there is no recovery or
//! multi-error collection.

use snafu::Snafu;

use crate::lexer::Pos;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{pos}: lex error: {message}"))]
  Lex { pos: Pos, message: String },

  #[snafu(display("{pos}: syntax error: expected {expected}, but got {found}"))]
  Syntax {
    pos: Pos,
    expected: String,
    found: String,
  },

  #[snafu(display("{pos}: {message}"))]
  Semantic { pos: Pos, message: String },

  /// Constructs the grammar accepts but the pipeline does not lower.
  /// Some are caught while parsing (with a position), some only once the
  /// generator meets the op.
  #[snafu(display("{}unsupported: {message}", pos.map(|p| format!("{p}: ")).unwrap_or_default()))]
  Unsupported { pos: Option<Pos>, message: String },

  /// A builder/generator contract mismatch, never a user error.
  #[snafu(display("internal error: {message}"))]
  Internal { message: String },
}

impl CompileError {
  pub fn lex(pos: Pos, message: impl Into<String>) -> Self {
    Self::Lex {
      pos,
      message: message.into(),
    }
  }

  pub fn syntax(pos: Pos, expected: impl Into<String>, found: impl Into<String>) -> Self {
    Self::Syntax {
      pos,
      expected: expected.into(),
      found: found.into(),
    }
  }

  pub fn semantic(pos: Pos, message: impl Into<String>) -> Self {
    Self::Semantic {
      pos,
      message: message.into(),
    }
  }

  pub fn unsupported(pos: Option<Pos>, message: impl Into<String>) -> Self {
    Self::Unsupported {
      pos,
      message: message.into(),
    }
  }

  pub fn internal(message: impl Into<String>) -> Self {
    Self::Internal {
      message: message.into(),
    }
  }

  /// Process exit status the driver uses for this error category.
  pub fn exit_code(&self) -> i32 {
    match self {
      Self::Lex { .. } => 4,
      Self::Syntax { .. } => 5,
      Self::Semantic { .. } => 6,
      Self::Unsupported { .. } => 7,
      Self::Internal { .. } => 8,
    }
  }
}
