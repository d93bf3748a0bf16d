//! Single-pass front end: parsing and lowering are interleaved.
//!
//! There is no syntax tree. The builder pulls tokens from the lexer on
//! demand and appends IR ops as each construct is recognised, keeping a
//! one-token lookahead, a stack of lexical scopes and the running frame
//! offset for the routine being compiled. Expressions use precedence
//! climbing; every intermediate result is parked in a freshly allocated
//! stack slot rather than a register, which keeps the generator a
//! straight-line translation.

use std::collections::HashMap;

use crate::error::{CompileError, CompileResult};
use crate::ir::{Arg, ArgKind, BinOp, MAX_CALL_ARGS, Op, Program, Size, UnOp};
use crate::lexer::{Lexer, Token, TokenKind};

/// Compile a whole source unit into IR. The first error aborts.
pub fn parse(source: &str) -> CompileResult<Program> {
  let mut parser = Parser::new(source)?;
  parser.compile_unit()?;
  Ok(parser.program)
}

/// Infix operator table: IR op and binding power, strongest first.
fn infix_op(kind: TokenKind) -> Option<(BinOp, u8)> {
  let entry = match kind {
    TokenKind::Star => (BinOp::Mul, 4),
    TokenKind::Slash => (BinOp::Div, 4),
    TokenKind::Plus => (BinOp::Add, 3),
    TokenKind::Minus => (BinOp::Sub, 3),
    TokenKind::Shl => (BinOp::Shl, 2),
    TokenKind::Shr => (BinOp::Shr, 2),
    TokenKind::Lt => (BinOp::Lt, 1),
    TokenKind::Le => (BinOp::Le, 1),
    TokenKind::Gt => (BinOp::Gt, 1),
    TokenKind::Ge => (BinOp::Ge, 1),
    TokenKind::Eq => (BinOp::Eq, 1),
    TokenKind::Ne => (BinOp::Ne, 1),
    _ => return None,
  };
  Some(entry)
}

fn is_type(kind: TokenKind) -> bool {
  matches!(
    kind,
    TokenKind::I8
      | TokenKind::I16
      | TokenKind::I32
      | TokenKind::I64
      | TokenKind::U8
      | TokenKind::U16
      | TokenKind::U32
      | TokenKind::U64
      | TokenKind::F32
      | TokenKind::F64
  )
}

struct Parser<'a> {
  lexer: Lexer<'a>,
  /// One-token lookahead.
  current: Token,
  program: Program,
  /// Innermost scope last.
  scopes: Vec<HashMap<String, Arg>>,
  /// Bytes allocated so far in the current routine's frame; monotonic,
  /// reset per routine.
  frame: usize,
  /// Next label index; unit-wide, never reused.
  labels: usize,
  /// Set when a `ret` statement is parsed anywhere in the current
  /// routine body. Syntactic only, not a control-flow analysis.
  has_returned: bool,
  saw_main: bool,
}

impl<'a> Parser<'a> {
  fn new(source: &'a str) -> CompileResult<Self> {
    let mut lexer = Lexer::new(source);
    let current = lexer.next_token()?;
    Ok(Self {
      lexer,
      current,
      program: Program::new(),
      scopes: Vec::new(),
      frame: 0,
      labels: 0,
      has_returned: false,
      saw_main: false,
    })
  }

  /// Consume the current token and return it, pulling the next one in.
  fn advance(&mut self) -> CompileResult<Token> {
    let next = self.lexer.next_token()?;
    Ok(std::mem::replace(&mut self.current, next))
  }

  /// Consume the current token if it matches.
  fn eat(&mut self, kind: TokenKind) -> CompileResult<bool> {
    if self.current.kind == kind {
      self.advance()?;
      Ok(true)
    } else {
      Ok(false)
    }
  }

  fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
    if self.current.kind == kind {
      self.advance()
    } else {
      Err(self.syntax_error(kind.describe()))
    }
  }

  fn syntax_error(&self, expected: impl Into<String>) -> CompileError {
    CompileError::syntax(self.current.pos, expected, self.current.describe())
  }

  fn next_label(&mut self) -> usize {
    let index = self.labels;
    self.labels += 1;
    index
  }

  /// Bump the frame counter and return the new slot's offset. Offsets
  /// grow downward from the frame base and are never reused.
  fn alloc(&mut self, size: Size) -> usize {
    self.frame += size.bytes();
    self.frame
  }

  /// Innermost-first name lookup; first match wins.
  fn lookup(&self, name: &str) -> Option<Arg> {
    self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
  }

  /// Allocate a frame slot and bind a new name in the current scope.
  fn declare(&mut self, name_tok: Token, size: Size, signed: bool) -> CompileResult<Arg> {
    let Some(scope) = self.scopes.last_mut() else {
      return Err(CompileError::internal("declaration outside any scope"));
    };
    if scope.contains_key(&name_tok.text) {
      return Err(CompileError::semantic(
        name_tok.pos,
        format!("redeclaration of \"{}\"", name_tok.text),
      ));
    }
    self.frame += size.bytes();
    let arg = Arg::position(self.frame, size, signed);
    scope.insert(name_tok.text, arg);
    Ok(arg)
  }

  /// A program is a sequence of routine declarations and nothing else.
  fn compile_unit(&mut self) -> CompileResult<()> {
    while self.current.kind != TokenKind::Eof {
      if self.current.kind != TokenKind::Rt {
        return Err(self.syntax_error("a routine declaration"));
      }
      self.compile_routine()?;
    }
    if !self.saw_main {
      return Err(CompileError::semantic(
        self.current.pos,
        "no entry routine named \"main\"",
      ));
    }
    Ok(())
  }

  /// `rt <name> ( params ) { body }`. The header op is pushed before
  /// the parameter list is read and patched with the final frame size
  /// once the body is done. Parameters share the body's outermost
  /// scope, so a local redeclaring one is rejected.
  fn compile_routine(&mut self) -> CompileResult<()> {
    self.expect(TokenKind::Rt)?;
    let name_tok = self.expect(TokenKind::Identifier)?;
    if name_tok.text == "main" {
      self.saw_main = true;
    }

    self.frame = 0;
    self.has_returned = false;
    let patch = self.program.push_routine(name_tok.text);

    self.scopes.push(HashMap::new());
    let params = self.compile_params()?;
    self.expect(TokenKind::LBrace)?;
    while self.current.kind != TokenKind::RBrace {
      if self.current.kind == TokenKind::Eof {
        return Err(self.syntax_error("\"}\""));
      }
      self.compile_stmt()?;
    }
    self.advance()?;
    self.scopes.pop();

    if !self.has_returned {
      self.program.push(Op::Return { value: None });
    }
    self.program.patch_routine(patch, self.frame, params);
    Ok(())
  }

  /// Comma-separated `<type> <name>` pairs, capped at the number of
  /// integer argument registers.
  fn compile_params(&mut self) -> CompileResult<Vec<Arg>> {
    self.expect(TokenKind::LParen)?;
    let mut params = Vec::new();
    if self.current.kind != TokenKind::RParen {
      loop {
        let pos = self.current.pos;
        if params.len() == MAX_CALL_ARGS {
          return Err(CompileError::semantic(
            pos,
            format!("more than {MAX_CALL_ARGS} parameters"),
          ));
        }
        let (size, signed) = self.expect_type()?;
        let name_tok = self.expect(TokenKind::Identifier)?;
        params.push(self.declare(name_tok, size, signed)?);
        if !self.eat(TokenKind::Comma)? {
          break;
        }
      }
    }
    self.expect(TokenKind::RParen)?;
    Ok(params)
  }

  /// Consume a type keyword, yielding width and signedness. Float
  /// types parse but do not lower.
  fn expect_type(&mut self) -> CompileResult<(Size, bool)> {
    let (size, signed) = match self.current.kind {
      TokenKind::I8 => (Size::Byte, true),
      TokenKind::I16 => (Size::Word, true),
      TokenKind::I32 => (Size::DWord, true),
      TokenKind::I64 => (Size::QWord, true),
      TokenKind::U8 => (Size::Byte, false),
      TokenKind::U16 => (Size::Word, false),
      TokenKind::U32 => (Size::DWord, false),
      TokenKind::U64 => (Size::QWord, false),
      TokenKind::F32 | TokenKind::F64 => {
        return Err(CompileError::unsupported(
          Some(self.current.pos),
          "floating-point types are not lowered",
        ));
      }
      _ => return Err(self.syntax_error("a type name")),
    };
    self.advance()?;
    Ok((size, signed))
  }

  fn compile_stmt(&mut self) -> CompileResult<()> {
    match self.current.kind {
      kind if is_type(kind) => self.compile_decl(),
      TokenKind::Identifier => self.compile_assign_or_call(),
      TokenKind::Ret => self.compile_return(),
      TokenKind::If => self.compile_if(),
      TokenKind::While => self.compile_while(),
      TokenKind::LBrace => self.compile_block(),
      _ => Err(self.syntax_error("a statement")),
    }
  }

  /// `<type> <name> [= expr] ;`. The slot is allocated and the name
  /// bound before the initializer compiles, C style.
  fn compile_decl(&mut self) -> CompileResult<()> {
    let (size, signed) = self.expect_type()?;
    let name_tok = self.expect(TokenKind::Identifier)?;
    let dst = self.declare(name_tok, size, signed)?;
    if self.eat(TokenKind::Assign)? {
      let src = self.compile_expr(0, size)?;
      self.program.push(Op::AssignLocal { dst, src });
    }
    self.expect(TokenKind::Semi)?;
    Ok(())
  }

  fn compile_assign_or_call(&mut self) -> CompileResult<()> {
    let name_tok = self.expect(TokenKind::Identifier)?;
    if self.current.kind == TokenKind::LParen {
      self.compile_call(name_tok)?;
    } else {
      self.expect(TokenKind::Assign)?;
      let Some(dst) = self.lookup(&name_tok.text) else {
        return Err(CompileError::semantic(
          name_tok.pos,
          format!("assignment to undeclared \"{}\"", name_tok.text),
        ));
      };
      let src = self.compile_expr(0, dst.size)?;
      self.program.push(Op::AssignLocal { dst, src });
    }
    self.expect(TokenKind::Semi)?;
    Ok(())
  }

  /// `name ( arg0, … )`, capped at the number of integer argument
  /// registers. Argument expressions default to pointer width.
  fn compile_call(&mut self, name_tok: Token) -> CompileResult<()> {
    self.expect(TokenKind::LParen)?;
    let mut args = Vec::new();
    if self.current.kind != TokenKind::RParen {
      loop {
        if args.len() == MAX_CALL_ARGS {
          return Err(CompileError::semantic(
            self.current.pos,
            format!("more than {MAX_CALL_ARGS} call arguments"),
          ));
        }
        args.push(self.compile_expr(0, Size::QWord)?);
        if !self.eat(TokenKind::Comma)? {
          break;
        }
      }
    }
    self.expect(TokenKind::RParen)?;
    self.program.push(Op::Call {
      name: name_tok.text,
      args,
    });
    Ok(())
  }

  /// `ret [expr] ;`. One `ret` anywhere in the body suppresses the
  /// implicit zero return, whether or not it dominates the exit.
  fn compile_return(&mut self) -> CompileResult<()> {
    self.advance()?;
    let value = if self.current.kind == TokenKind::Semi {
      None
    } else {
      Some(self.compile_expr(0, Size::QWord)?)
    };
    self.expect(TokenKind::Semi)?;
    self.has_returned = true;
    self.program.push(Op::Return { value });
    Ok(())
  }

  /// `if ( cond ) stmt [else stmt]`.
  fn compile_if(&mut self) -> CompileResult<()> {
    self.advance()?;
    self.expect(TokenKind::LParen)?;
    let cond = self.compile_expr(0, Size::Byte)?;
    self.expect(TokenKind::RParen)?;

    let skip = self.program.push_jump_if_not(cond);
    self.compile_stmt()?;

    if self.eat(TokenKind::Else)? {
      let else_label = self.next_label();
      let end = self.next_label();
      self.program.push(Op::Jump { target: end });
      self.program.push(Op::Label { index: else_label });
      self.program.patch_jump(skip, else_label);
      self.compile_stmt()?;
      self.program.push(Op::Label { index: end });
    } else {
      let end = self.next_label();
      self.program.push(Op::Label { index: end });
      self.program.patch_jump(skip, end);
    }
    Ok(())
  }

  /// `while ( cond ) { block }`; the back edge re-evaluates the
  /// condition at the start label.
  fn compile_while(&mut self) -> CompileResult<()> {
    self.advance()?;
    let start = self.next_label();
    self.program.push(Op::Label { index: start });
    self.expect(TokenKind::LParen)?;
    let cond = self.compile_expr(0, Size::Byte)?;
    self.expect(TokenKind::RParen)?;
    let exit = self.program.push_jump_if_not(cond);

    self.compile_block()?;

    self.program.push(Op::Jump { target: start });
    let end = self.next_label();
    self.program.push(Op::Label { index: end });
    self.program.patch_jump(exit, end);
    Ok(())
  }

  /// `{ stmt* }` with one scope pushed for the block's lifetime.
  fn compile_block(&mut self) -> CompileResult<()> {
    self.expect(TokenKind::LBrace)?;
    self.scopes.push(HashMap::new());
    while self.current.kind != TokenKind::RBrace {
      if self.current.kind == TokenKind::Eof {
        return Err(self.syntax_error("\"}\""));
      }
      self.compile_stmt()?;
    }
    self.advance()?;
    self.scopes.pop();
    Ok(())
  }

  /// Precedence climbing: compile a primary, then fold infix operators
  /// while they bind strictly tighter than `min_bp` (equal binding
  /// power breaks the loop, giving left associativity). `hint` sizes
  /// integer literals, which carry no width of their own.
  fn compile_expr(&mut self, min_bp: u8, hint: Size) -> CompileResult<Arg> {
    let mut lhs = self.compile_primary(hint)?;

    while let Some((op, bp)) = infix_op(self.current.kind) {
      if bp <= min_bp {
        break;
      }
      self.advance()?;
      let rhs = self.compile_expr(bp, hint)?;

      let dst = if op.is_comparison() {
        Arg::position(self.alloc(Size::Byte), Size::Byte, false)
      } else {
        let size = lhs.size.max(rhs.size);
        let signed = lhs.signed || rhs.signed;
        Arg::position(self.alloc(size), size, signed)
      };
      self.program.push(Op::Binary { op, dst, lhs, rhs });
      lhs = dst;
    }

    Ok(lhs)
  }

  fn compile_primary(&mut self, hint: Size) -> CompileResult<Arg> {
    match self.current.kind {
      TokenKind::Int => {
        let tok = self.advance()?;
        let Ok(bits) = tok.text.parse::<i64>() else {
          return Err(CompileError::syntax(
            tok.pos,
            "an integer literal that fits 64 bits",
            format!("\"{}\"", tok.text),
          ));
        };
        Ok(Arg::immediate(bits, hint, true))
      }
      TokenKind::Real => Err(CompileError::unsupported(
        Some(self.current.pos),
        "real literals are not lowered",
      )),
      TokenKind::Str => {
        let tok = self.advance()?;
        let index = self.program.push_data(tok.text);
        Ok(Arg::static_ref(index))
      }
      TokenKind::Identifier => {
        let tok = self.advance()?;
        if self.current.kind == TokenKind::LParen {
          self.compile_call(tok)?;
          return Ok(Arg::return_value());
        }
        match self.lookup(&tok.text) {
          Some(arg) => Ok(arg),
          None => Err(CompileError::semantic(
            tok.pos,
            format!("use of undeclared \"{}\"", tok.text),
          )),
        }
      }
      TokenKind::LParen => {
        self.advance()?;
        let arg = self.compile_expr(0, hint)?;
        self.expect(TokenKind::RParen)?;
        Ok(arg)
      }
      TokenKind::Star => {
        self.advance()?;
        let operand = self.compile_primary(Size::QWord)?;
        let dst = Arg::position(self.alloc(hint), hint, true);
        self.program.push(Op::Unary {
          op: UnOp::Deref,
          dst,
          operand,
        });
        Ok(dst)
      }
      TokenKind::Amp => {
        let pos = self.current.pos;
        self.advance()?;
        let operand = self.compile_primary(hint)?;
        if !matches!(operand.kind, ArgKind::Position { .. }) {
          return Err(CompileError::semantic(
            pos,
            "cannot take the address of this operand",
          ));
        }
        let dst = Arg::position(self.alloc(Size::QWord), Size::QWord, false);
        self.program.push(Op::Unary {
          op: UnOp::AddrOf,
          dst,
          operand,
        });
        Ok(dst)
      }
      _ => Err(self.syntax_error("an expression")),
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::lexer::Pos;

  #[test]
  fn declaration_with_initializer_lowers_to_expected_ops() {
    let program = parse("rt main() { i32 x = 1 + 2; }").unwrap();
    assert_eq!(
      program.ops,
      vec![
        Op::NewRoutine {
          name: "main".to_string(),
          params: vec![],
          frame_bytes: 8,
        },
        Op::Binary {
          op: BinOp::Add,
          dst: Arg::position(8, Size::DWord, true),
          lhs: Arg::immediate(1, Size::DWord, true),
          rhs: Arg::immediate(2, Size::DWord, true),
        },
        Op::AssignLocal {
          dst: Arg::position(4, Size::DWord, true),
          src: Arg::position(8, Size::DWord, true),
        },
        Op::Return { value: None },
      ]
    );
  }

  #[test]
  fn multiplication_binds_tighter_than_addition() {
    let program = parse("rt main() { i32 x = 1 + 2 * 3; }").unwrap();
    assert_eq!(
      program.ops[1],
      Op::Binary {
        op: BinOp::Mul,
        dst: Arg::position(8, Size::DWord, true),
        lhs: Arg::immediate(2, Size::DWord, true),
        rhs: Arg::immediate(3, Size::DWord, true),
      }
    );
    assert_eq!(
      program.ops[2],
      Op::Binary {
        op: BinOp::Add,
        dst: Arg::position(12, Size::DWord, true),
        lhs: Arg::immediate(1, Size::DWord, true),
        rhs: Arg::position(8, Size::DWord, true),
      }
    );
  }

  #[test]
  fn while_loop_lowers_to_label_test_body_backedge() {
    let program = parse("rt main() { i32 i = 0; while (i < 10) { i = i + 1; } }").unwrap();
    let i = Arg::position(4, Size::DWord, true);
    assert_eq!(
      program.ops,
      vec![
        Op::NewRoutine {
          name: "main".to_string(),
          params: vec![],
          frame_bytes: 9,
        },
        Op::AssignLocal {
          dst: i,
          src: Arg::immediate(0, Size::DWord, true),
        },
        Op::Label { index: 0 },
        Op::Binary {
          op: BinOp::Lt,
          dst: Arg::position(5, Size::Byte, false),
          lhs: i,
          rhs: Arg::immediate(10, Size::Byte, true),
        },
        Op::JumpIfNot {
          target: 1,
          cond: Arg::position(5, Size::Byte, false),
        },
        Op::Binary {
          op: BinOp::Add,
          dst: Arg::position(9, Size::DWord, true),
          lhs: i,
          rhs: Arg::immediate(1, Size::DWord, true),
        },
        Op::AssignLocal {
          dst: i,
          src: Arg::position(9, Size::DWord, true),
        },
        Op::Jump { target: 0 },
        Op::Label { index: 1 },
        Op::Return { value: None },
      ]
    );
  }

  #[test]
  fn inner_shadow_gets_its_own_slot_and_outer_returns() {
    let program = parse("rt main() { i32 x = 1; { i32 x = 2; x = 3; } x = 4; }").unwrap();
    assert_eq!(
      program.ops[3],
      Op::AssignLocal {
        dst: Arg::position(8, Size::DWord, true),
        src: Arg::immediate(3, Size::DWord, true),
      }
    );
    assert_eq!(
      program.ops[4],
      Op::AssignLocal {
        dst: Arg::position(4, Size::DWord, true),
        src: Arg::immediate(4, Size::DWord, true),
      }
    );
  }

  #[test]
  fn redeclaration_in_the_same_scope_is_rejected() {
    let err = parse("rt main() { i32 x; i32 x; }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
  }

  #[test]
  fn same_name_in_nested_scopes_is_accepted() {
    assert!(parse("rt main() { i32 x; { i32 x; } }").is_ok());
  }

  #[test]
  fn undeclared_name_reports_the_exact_position() {
    let err = parse("rt main() { i32 x = y; }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { pos, .. } if pos == Pos::new(1, 21)));
  }

  #[test]
  fn assignment_to_undeclared_name_is_rejected() {
    let err = parse("rt main() { y = 1; }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
  }

  #[test]
  fn seventh_call_argument_is_rejected() {
    let err = parse("rt main() { foo(1, 2, 3, 4, 5, 6, 7); }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
  }

  #[test]
  fn seventh_parameter_is_rejected() {
    let err = parse("rt f(i8 a, i8 b, i8 c, i8 d, i8 e, i8 g, i8 h) { }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
  }

  #[test]
  fn local_redeclaring_a_parameter_is_rejected() {
    let err = parse("rt main(i32 a) { i32 a; }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
  }

  #[test]
  fn parameters_become_position_operands_in_declaration_order() {
    let program = parse("rt main(i32 a, u8 b) { a = 1; }").unwrap();
    assert_eq!(
      program.ops[0],
      Op::NewRoutine {
        name: "main".to_string(),
        params: vec![Arg::position(4, Size::DWord, true), Arg::position(5, Size::Byte, false)],
        frame_bytes: 5,
      }
    );
  }

  #[test]
  fn entry_routine_is_required() {
    let err = parse("rt helper() { }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
    assert!(parse("rt helper() { } rt main() { helper(); }").is_ok());
  }

  #[test]
  fn top_level_accepts_only_routines() {
    let err = parse("i32 x;").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
  }

  #[test]
  fn oversized_integer_literal_is_a_syntax_error() {
    let err = parse("rt main() { i64 x = 99999999999999999999; }").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
  }

  #[test]
  fn identical_string_literals_get_distinct_pool_entries() {
    let program = parse(r#"rt main() { print("hi"); print("hi"); }"#).unwrap();
    assert_eq!(program.data, vec!["hi".to_string(), "hi".to_string()]);
    assert_eq!(
      program.ops[1],
      Op::Call {
        name: "print".to_string(),
        args: vec![Arg::static_ref(0)],
      }
    );
    assert_eq!(
      program.ops[2],
      Op::Call {
        name: "print".to_string(),
        args: vec![Arg::static_ref(1)],
      }
    );
  }

  #[test]
  fn call_in_expression_yields_the_return_value_operand() {
    let program = parse("rt main() { i64 x = f(); }").unwrap();
    assert_eq!(
      program.ops[1],
      Op::Call {
        name: "f".to_string(),
        args: vec![],
      }
    );
    assert_eq!(
      program.ops[2],
      Op::AssignLocal {
        dst: Arg::position(8, Size::QWord, true),
        src: Arg::return_value(),
      }
    );
  }

  #[test]
  fn explicit_return_suppresses_the_implicit_one() {
    let program = parse("rt main() { ret 5; }").unwrap();
    assert_eq!(
      program.ops[1],
      Op::Return {
        value: Some(Arg::immediate(5, Size::QWord, true)),
      }
    );
    assert_eq!(program.ops.len(), 2);
  }

  #[test]
  fn return_tracking_is_syntactic_not_path_complete() {
    // A ret inside a branch counts, so no implicit return is added even
    // though the false path falls through.
    let program = parse("rt main() { if (1) { ret 1; } }").unwrap();
    assert_eq!(program.ops.last(), Some(&Op::Label { index: 0 }));
  }

  #[test]
  fn division_is_represented_in_the_ir() {
    let program = parse("rt main() { i32 x = 4 / 2; }").unwrap();
    assert!(
      program
        .ops
        .iter()
        .any(|op| matches!(op, Op::Binary { op: BinOp::Div, .. }))
    );
  }

  #[test]
  fn float_types_and_real_literals_are_unsupported() {
    let err = parse("rt main() { f32 x; }").unwrap_err();
    assert!(matches!(err, CompileError::Unsupported { .. }));

    let err = parse("rt main() { i32 x = 1.5; }").unwrap_err();
    assert!(matches!(err, CompileError::Unsupported { .. }));
  }

  #[test]
  fn address_of_requires_a_stack_operand() {
    let err = parse("rt main() { u64 p = &5; }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
  }

  #[test]
  fn frames_do_not_leak_between_routines() {
    let program = parse("rt helper() { i64 a = 0; } rt main() { i8 b = 0; }").unwrap();
    let frames: Vec<usize> = program
      .ops
      .iter()
      .filter_map(|op| match op {
        Op::NewRoutine { frame_bytes, .. } => Some(*frame_bytes),
        _ => None,
      })
      .collect();
    assert_eq!(frames, vec![8, 1]);
  }
}
