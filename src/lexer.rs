//! Lexical analysis as a pull lexer: the parser asks for one token at a
//! time and no token vector is ever materialised.
//!
//! The lexer knows nothing about semantics beyond recognising literals,
//! identifiers and operators. Keywords are matched only after a maximal
//! identifier run, so `retx` is an identifier and never `ret` followed
//! by `x`. String literals are copied verbatim, with no escape
//! processing; line and column advance across every consumed character,
//! newlines inside strings included.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::{CompileError, CompileResult};

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
  pub line: u32,
  pub col: u32,
}

impl Pos {
  pub fn new(line: u32, col: u32) -> Self {
    Self { line, col }
  }
}

impl Default for Pos {
  fn default() -> Self {
    Self::new(1, 1)
  }
}

impl fmt::Display for Pos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.col)
  }
}

/// Kinds of tokens recognised by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Rt,
  Ret,
  If,
  Else,
  While,
  I8,
  I16,
  I32,
  I64,
  U8,
  U16,
  U32,
  U64,
  F32,
  F64,
  Identifier,
  Int,
  Real,
  Str,
  LParen,
  RParen,
  LBrace,
  RBrace,
  Semi,
  Comma,
  Assign,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
  Plus,
  Minus,
  Star,
  Slash,
  Shl,
  Shr,
  Amp,
  Eof,
}

impl TokenKind {
  /// Human-friendly description used in diagnostics.
  pub fn describe(self) -> &'static str {
    match self {
      Self::Rt => "\"rt\"",
      Self::Ret => "\"ret\"",
      Self::If => "\"if\"",
      Self::Else => "\"else\"",
      Self::While => "\"while\"",
      Self::I8 => "\"i8\"",
      Self::I16 => "\"i16\"",
      Self::I32 => "\"i32\"",
      Self::I64 => "\"i64\"",
      Self::U8 => "\"u8\"",
      Self::U16 => "\"u16\"",
      Self::U32 => "\"u32\"",
      Self::U64 => "\"u64\"",
      Self::F32 => "\"f32\"",
      Self::F64 => "\"f64\"",
      Self::Identifier => "an identifier",
      Self::Int => "an integer literal",
      Self::Real => "a real literal",
      Self::Str => "a string literal",
      Self::LParen => "\"(\"",
      Self::RParen => "\")\"",
      Self::LBrace => "\"{\"",
      Self::RBrace => "\"}\"",
      Self::Semi => "\";\"",
      Self::Comma => "\",\"",
      Self::Assign => "\"=\"",
      Self::Eq => "\"==\"",
      Self::Ne => "\"!=\"",
      Self::Lt => "\"<\"",
      Self::Le => "\"<=\"",
      Self::Gt => "\">\"",
      Self::Ge => "\">=\"",
      Self::Plus => "\"+\"",
      Self::Minus => "\"-\"",
      Self::Star => "\"*\"",
      Self::Slash => "\"/\"",
      Self::Shl => "\"<<\"",
      Self::Shr => "\">>\"",
      Self::Amp => "\"&\"",
      Self::Eof => "end of input",
    }
  }
}

/// One lexed token. `text` is filled for identifiers and literals and
/// empty otherwise; string literals hold their bytes verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub pos: Pos,
}

impl Token {
  pub fn new(kind: TokenKind, pos: Pos) -> Self {
    Self {
      kind,
      text: String::new(),
      pos,
    }
  }

  pub fn with_text(kind: TokenKind, text: impl Into<String>, pos: Pos) -> Self {
    Self {
      kind,
      text: text.into(),
      pos,
    }
  }

  /// Rendering used for the "got ..." half of syntax errors.
  pub fn describe(&self) -> String {
    match self.kind {
      TokenKind::Identifier | TokenKind::Int | TokenKind::Real => format!("\"{}\"", self.text),
      _ => self.kind.describe().to_string(),
    }
  }
}

/// Keyword table; anything else falls through to `None`.
fn keyword_kind(word: &str) -> Option<TokenKind> {
  let kind = match word {
    "rt" => TokenKind::Rt,
    "ret" => TokenKind::Ret,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "i8" => TokenKind::I8,
    "i16" => TokenKind::I16,
    "i32" => TokenKind::I32,
    "i64" => TokenKind::I64,
    "u8" => TokenKind::U8,
    "u16" => TokenKind::U16,
    "u32" => TokenKind::U32,
    "u64" => TokenKind::U64,
    "f32" => TokenKind::F32,
    "f64" => TokenKind::F64,
    _ => return None,
  };
  Some(kind)
}

/// Pull lexer over a source string.
pub struct Lexer<'a> {
  chars: Peekable<Chars<'a>>,
  pos: Pos,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      chars: source.chars().peekable(),
      pos: Pos::default(),
    }
  }

  fn peek(&mut self) -> Option<char> {
    self.chars.peek().copied()
  }

  /// Consume one character, tracking line and column.
  fn advance(&mut self) -> Option<char> {
    let c = self.chars.next()?;
    if c == '\n' {
      self.pos.line += 1;
      self.pos.col = 1;
    } else {
      self.pos.col += 1;
    }
    Some(c)
  }

  /// Skip whitespace and `//` line comments. A lone slash is the
  /// division operator and is left for the caller.
  fn skip_trivia(&mut self) {
    loop {
      match self.peek() {
        Some(c) if c.is_whitespace() => {
          self.advance();
        }
        Some('/') => {
          let mut ahead = self.chars.clone();
          ahead.next();
          if ahead.next() != Some('/') {
            return;
          }
          while let Some(c) = self.peek() {
            if c == '\n' {
              break;
            }
            self.advance();
          }
        }
        _ => return,
      }
    }
  }

  /// Produce the next token. End of input yields an `Eof` token rather
  /// than an error, so the caller can report its own expectation; lex
  /// failures are returned as errors and the caller decides whether to
  /// stop.
  pub fn next_token(&mut self) -> CompileResult<Token> {
    self.skip_trivia();
    let pos = self.pos;
    let Some(c) = self.peek() else {
      return Ok(Token::new(TokenKind::Eof, pos));
    };

    if c.is_ascii_digit() {
      return Ok(self.lex_number(pos));
    }
    if c.is_ascii_alphabetic() || c == '_' {
      return Ok(self.lex_word(pos));
    }
    if c == '"' {
      return self.lex_string(pos);
    }

    self.advance();
    let kind = match c {
      '(' => TokenKind::LParen,
      ')' => TokenKind::RParen,
      '{' => TokenKind::LBrace,
      '}' => TokenKind::RBrace,
      ';' => TokenKind::Semi,
      ',' => TokenKind::Comma,
      '+' => TokenKind::Plus,
      '-' => TokenKind::Minus,
      '*' => TokenKind::Star,
      '/' => TokenKind::Slash,
      '&' => TokenKind::Amp,
      '=' => {
        if self.peek() == Some('=') {
          self.advance();
          TokenKind::Eq
        } else {
          TokenKind::Assign
        }
      }
      '<' => match self.peek() {
        Some('<') => {
          self.advance();
          TokenKind::Shl
        }
        Some('=') => {
          self.advance();
          TokenKind::Le
        }
        _ => TokenKind::Lt,
      },
      '>' => match self.peek() {
        Some('>') => {
          self.advance();
          TokenKind::Shr
        }
        Some('=') => {
          self.advance();
          TokenKind::Ge
        }
        _ => TokenKind::Gt,
      },
      '!' => {
        if self.peek() == Some('=') {
          self.advance();
          TokenKind::Ne
        } else {
          return Err(CompileError::lex(pos, "unrecognized character '!'"));
        }
      }
      _ => return Err(CompileError::lex(pos, format!("unrecognized character '{c}'"))),
    };
    Ok(Token::new(kind, pos))
  }

  /// Digit run, optionally switching to a real literal at the first
  /// `.`; the value itself is parsed later, by the consumer.
  fn lex_number(&mut self, pos: Pos) -> Token {
    let mut text = String::new();
    let mut kind = TokenKind::Int;
    while let Some(c) = self.peek() {
      if c.is_ascii_digit() {
        text.push(c);
        self.advance();
      } else if c == '.' && kind == TokenKind::Int {
        kind = TokenKind::Real;
        text.push(c);
        self.advance();
      } else {
        break;
      }
    }
    Token::with_text(kind, text, pos)
  }

  fn lex_word(&mut self, pos: Pos) -> Token {
    let mut text = String::new();
    while let Some(c) = self.peek() {
      if c.is_ascii_alphanumeric() || c == '_' {
        text.push(c);
        self.advance();
      } else {
        break;
      }
    }
    match keyword_kind(&text) {
      Some(kind) => Token::new(kind, pos),
      None => Token::with_text(TokenKind::Identifier, text, pos),
    }
  }

  /// Everything between the quotes, verbatim. The token is anchored at
  /// the opening quote.
  fn lex_string(&mut self, pos: Pos) -> CompileResult<Token> {
    self.advance();
    let mut text = String::new();
    loop {
      match self.advance() {
        Some('"') => return Ok(Token::with_text(TokenKind::Str, text, pos)),
        Some(c) => text.push(c),
        None => return Err(CompileError::lex(pos, "unterminated string literal")),
      }
    }
  }
}
