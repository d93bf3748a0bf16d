//! Flat intermediate representation shared by the builder and the code
//! generator.
//!
//! Ops are appended in program order into a single sequence per
//! compilation unit. Two op kinds carry forward references: the frame
//! size of `NewRoutine` and the target of `JumpIfNot`. Both are pushed
//! with placeholders and resolved through the handle types below; the
//! handles are consumed by value, so a forward reference cannot be
//! patched twice, and the generator checks that none is left pending.

use std::fmt;

/// The calling convention passes at most six integer arguments in registers.
pub const MAX_CALL_ARGS: usize = 6;

/// Operand width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Size {
  Byte,
  Word,
  DWord,
  QWord,
}

impl Size {
  pub fn bytes(self) -> usize {
    match self {
      Self::Byte => 1,
      Self::Word => 2,
      Self::DWord => 4,
      Self::QWord => 8,
    }
  }
}

impl fmt::Display for Size {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Byte => "byte",
      Self::Word => "word",
      Self::DWord => "dword",
      Self::QWord => "qword",
    };
    write!(f, "{name}")
  }
}

/// Where an operand's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
  /// Compile-time constant. The value is kept in 64 bits regardless of
  /// the operand's width tag; emission wraps it at the width of the
  /// consuming instruction.
  Immediate { bits: i64 },
  /// Stack-resident value at a fixed byte offset below the frame base.
  /// Offsets are assigned once per routine and never reused.
  Position { offset: usize },
  /// Index into the static data pool.
  StaticRef { index: usize },
  /// The value produced by the immediately preceding call; meaningful
  /// only until the next call is emitted.
  ReturnValue,
}

/// A sized, kind-tagged operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg {
  pub size: Size,
  pub signed: bool,
  pub kind: ArgKind,
}

impl Arg {
  pub fn immediate(bits: i64, size: Size, signed: bool) -> Self {
    Self {
      size,
      signed,
      kind: ArgKind::Immediate { bits },
    }
  }

  pub fn position(offset: usize, size: Size, signed: bool) -> Self {
    Self {
      size,
      signed,
      kind: ArgKind::Position { offset },
    }
  }

  pub fn static_ref(index: usize) -> Self {
    Self {
      size: Size::QWord,
      signed: false,
      kind: ArgKind::StaticRef { index },
    }
  }

  pub fn return_value() -> Self {
    Self {
      size: Size::QWord,
      signed: true,
      kind: ArgKind::ReturnValue,
    }
  }
}

impl fmt::Display for Arg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      ArgKind::Immediate { bits } => write!(f, "{} {bits}", self.size),
      ArgKind::Position { offset } => write!(f, "{} [rbp - {offset}]", self.size),
      ArgKind::StaticRef { index } => write!(f, "str_{index}"),
      ArgKind::ReturnValue => write!(f, "retval"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
  Add,
  Sub,
  Mul,
  Div,
  Shl,
  Shr,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl BinOp {
  /// Comparisons produce a byte-sized 0/1 destination.
  pub fn is_comparison(self) -> bool {
    matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge)
  }
}

impl fmt::Display for BinOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Add => "add",
      Self::Sub => "sub",
      Self::Mul => "mul",
      Self::Div => "div",
      Self::Shl => "shl",
      Self::Shr => "shr",
      Self::Eq => "eq",
      Self::Ne => "ne",
      Self::Lt => "lt",
      Self::Le => "le",
      Self::Gt => "gt",
      Self::Ge => "ge",
    };
    write!(f, "{name}")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
  Deref,
  AddrOf,
}

impl fmt::Display for UnOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Deref => "deref",
      Self::AddrOf => "addr",
    };
    write!(f, "{name}")
  }
}

/// One instruction of the flat IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
  NewRoutine {
    name: String,
    params: Vec<Arg>,
    frame_bytes: usize,
  },
  Return {
    value: Option<Arg>,
  },
  AssignLocal {
    dst: Arg,
    src: Arg,
  },
  Call {
    name: String,
    args: Vec<Arg>,
  },
  Binary {
    op: BinOp,
    dst: Arg,
    lhs: Arg,
    rhs: Arg,
  },
  Unary {
    op: UnOp,
    dst: Arg,
    operand: Arg,
  },
  Label {
    index: usize,
  },
  Jump {
    target: usize,
  },
  JumpIfNot {
    target: usize,
    cond: Arg,
  },
}

impl fmt::Display for Op {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NewRoutine {
        name,
        params,
        frame_bytes,
      } => write!(f, "routine {name}({} params, frame {frame_bytes})", params.len()),
      Self::Return { value: Some(value) } => write!(f, "ret {value}"),
      Self::Return { value: None } => write!(f, "ret"),
      Self::AssignLocal { dst, src } => write!(f, "assign {dst} = {src}"),
      Self::Call { name, args } => write!(f, "call {name}/{}", args.len()),
      Self::Binary { op, dst, lhs, rhs } => write!(f, "{op} {dst} = {lhs}, {rhs}"),
      Self::Unary { op, dst, operand } => write!(f, "{op} {dst} = {operand}"),
      Self::Label { index } => write!(f, "label L{index}"),
      Self::Jump { target } => write!(f, "jump L{target}"),
      Self::JumpIfNot { target, cond } => write!(f, "jump-if-not L{target}, {cond}"),
    }
  }
}

/// Placeholder for a target that has not been resolved yet.
const UNRESOLVED: usize = usize::MAX;

/// Handle for a routine header awaiting its frame size and parameter
/// list. Consumed by [`Program::patch_routine`].
#[derive(Debug)]
pub struct RoutinePatch {
  index: usize,
}

/// Handle for a conditional jump awaiting its target label. Consumed by
/// [`Program::patch_jump`].
#[derive(Debug)]
pub struct JumpPatch {
  index: usize,
}

/// One compilation unit's worth of IR: the op sequence plus the static
/// data pool.
#[derive(Debug, Default)]
pub struct Program {
  pub ops: Vec<Op>,
  pub data: Vec<String>,
  pending: Vec<usize>,
}

impl Program {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, op: Op) {
    self.ops.push(op);
  }

  /// Append a routine header with a placeholder frame size; the handle
  /// patches it once the body has been compiled.
  pub fn push_routine(&mut self, name: impl Into<String>) -> RoutinePatch {
    let index = self.ops.len();
    self.ops.push(Op::NewRoutine {
      name: name.into(),
      params: Vec::new(),
      frame_bytes: 0,
    });
    self.pending.push(index);
    RoutinePatch { index }
  }

  pub fn patch_routine(&mut self, patch: RoutinePatch, frame_bytes: usize, params: Vec<Arg>) {
    if let Op::NewRoutine {
      frame_bytes: slot,
      params: param_slot,
      ..
    } = &mut self.ops[patch.index]
    {
      *slot = frame_bytes;
      *param_slot = params;
    }
    self.resolve(patch.index);
  }

  /// Append a conditional jump whose target label is not yet known.
  pub fn push_jump_if_not(&mut self, cond: Arg) -> JumpPatch {
    let index = self.ops.len();
    self.ops.push(Op::JumpIfNot {
      target: UNRESOLVED,
      cond,
    });
    self.pending.push(index);
    JumpPatch { index }
  }

  pub fn patch_jump(&mut self, patch: JumpPatch, target: usize) {
    if let Op::JumpIfNot { target: slot, .. } = &mut self.ops[patch.index] {
      *slot = target;
    }
    self.resolve(patch.index);
  }

  fn resolve(&mut self, index: usize) {
    self.pending.retain(|&pending| pending != index);
  }

  /// Index of the first op still carrying an unresolved placeholder.
  /// The generator refuses to run while one exists.
  pub fn unresolved(&self) -> Option<usize> {
    self.pending.first().copied()
  }

  /// Register a string literal and return its pool index. Identical
  /// texts get distinct entries; the pool is never deduplicated.
  pub fn push_data(&mut self, text: impl Into<String>) -> usize {
    self.data.push(text.into());
    self.data.len() - 1
  }
}
