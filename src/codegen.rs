//! Assembly emission: translates the flat IR into GAS Intel-syntax
//! x86-64 text.
//!
//! Every op is a self-contained template keyed off its operand kinds
//! and widths. rax is the working register, the rdi family holds the
//! second operand when one is needed and cl holds shift counts. Values
//! never stay in registers across ops, so no allocation state survives
//! between iterations of the emission loop.

use crate::error::{CompileError, CompileResult};
use crate::ir::{Arg, ArgKind, BinOp, Op, Program, Size, UnOp};

/// Render a whole program. Refuses to run while any backpatch
/// placeholder is unresolved; that is a builder bug, not an input
/// error.
pub fn generate(program: &Program) -> CompileResult<String> {
  if let Some(index) = program.unresolved() {
    return Err(CompileError::internal(format!(
      "op {index} still carries an unresolved placeholder"
    )));
  }

  let mut asm = String::new();
  asm.push_str(".intel_syntax noprefix\n");
  asm.push_str(".text\n");
  for op in &program.ops {
    emit_op(op, &mut asm)?;
  }
  emit_data(&program.data, &mut asm);
  Ok(asm)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reg {
  Ax,
  Di,
  Si,
  Dx,
  Cx,
  R8,
  R9,
}

/// System V integer argument registers, in order.
const ARG_REGS: [Reg; 6] = [Reg::Di, Reg::Si, Reg::Dx, Reg::Cx, Reg::R8, Reg::R9];

/// Width-specific register name.
fn reg(r: Reg, size: Size) -> &'static str {
  match (r, size) {
    (Reg::Ax, Size::Byte) => "al",
    (Reg::Ax, Size::Word) => "ax",
    (Reg::Ax, Size::DWord) => "eax",
    (Reg::Ax, Size::QWord) => "rax",
    (Reg::Di, Size::Byte) => "dil",
    (Reg::Di, Size::Word) => "di",
    (Reg::Di, Size::DWord) => "edi",
    (Reg::Di, Size::QWord) => "rdi",
    (Reg::Si, Size::Byte) => "sil",
    (Reg::Si, Size::Word) => "si",
    (Reg::Si, Size::DWord) => "esi",
    (Reg::Si, Size::QWord) => "rsi",
    (Reg::Dx, Size::Byte) => "dl",
    (Reg::Dx, Size::Word) => "dx",
    (Reg::Dx, Size::DWord) => "edx",
    (Reg::Dx, Size::QWord) => "rdx",
    (Reg::Cx, Size::Byte) => "cl",
    (Reg::Cx, Size::Word) => "cx",
    (Reg::Cx, Size::DWord) => "ecx",
    (Reg::Cx, Size::QWord) => "rcx",
    (Reg::R8, Size::Byte) => "r8b",
    (Reg::R8, Size::Word) => "r8w",
    (Reg::R8, Size::DWord) => "r8d",
    (Reg::R8, Size::QWord) => "r8",
    (Reg::R9, Size::Byte) => "r9b",
    (Reg::R9, Size::Word) => "r9w",
    (Reg::R9, Size::DWord) => "r9d",
    (Reg::R9, Size::QWord) => "r9",
  }
}

/// Memory operand width prefix.
fn ptr(size: Size) -> &'static str {
  match size {
    Size::Byte => "byte ptr",
    Size::Word => "word ptr",
    Size::DWord => "dword ptr",
    Size::QWord => "qword ptr",
  }
}

/// Append one indented instruction line.
fn emit(asm: &mut String, line: impl AsRef<str>) {
  asm.push_str("    ");
  asm.push_str(line.as_ref());
  asm.push('\n');
}

/// The value an immediate presents when read at `width`. An operand's
/// size tag only records the context its literal appeared in; the full
/// 64-bit value is kept and wraps at the width of the instruction that
/// consumes it.
fn immediate_at(bits: i64, width: Size) -> i64 {
  match width {
    Size::Byte => bits as i8 as i64,
    Size::Word => bits as i16 as i64,
    Size::DWord => bits as i32 as i64,
    Size::QWord => bits,
  }
}

/// x86 immediate operands sign-extend from at most 32 bits; anything
/// wider has to ride in through a register.
fn fits_i32(value: i64) -> bool {
  i32::try_from(value).is_ok()
}

/// Callees treated as variadic by convention.
fn is_variadic(name: &str) -> bool {
  name == "printf"
}

fn emit_op(op: &Op, asm: &mut String) -> CompileResult<()> {
  match op {
    Op::NewRoutine {
      name,
      params,
      frame_bytes,
    } => emit_prologue(name, params, *frame_bytes, asm),
    Op::Return { value } => emit_return(*value, asm),
    Op::AssignLocal { dst, src } => emit_assign(*dst, *src, asm),
    Op::Call { name, args } => emit_call(name, args, asm),
    Op::Binary { op, dst, lhs, rhs } => emit_binary(*op, *dst, *lhs, *rhs, asm),
    Op::Unary { op, dst, operand } => emit_unary(*op, *dst, *operand, asm),
    Op::Label { index } => {
      asm.push_str(&format!(".L{index}:\n"));
      Ok(())
    }
    Op::Jump { target } => {
      emit(asm, format!("jmp .L{target}"));
      Ok(())
    }
    Op::JumpIfNot { target, cond } => emit_jump_if_not(*target, *cond, asm),
  }
}

/// Load `arg` into register `r` at `width`. Widening reads of stack
/// slots extend per the operand's declared signedness; a 32-bit load
/// already zero-extends in hardware, so the unsigned dword case is a
/// bare mov.
fn load_into(r: Reg, width: Size, arg: Arg, asm: &mut String) -> CompileResult<()> {
  match arg.kind {
    ArgKind::Immediate { bits } => {
      let value = immediate_at(bits, width);
      emit(asm, format!("mov {}, {value}", reg(r, width)));
    }
    ArgKind::Position { offset } => {
      if width <= arg.size {
        emit(
          asm,
          format!("mov {}, {} [rbp - {offset}]", reg(r, width), ptr(width)),
        );
      } else if arg.signed && arg.size == Size::DWord {
        emit(
          asm,
          format!("movsxd {}, dword ptr [rbp - {offset}]", reg(r, width)),
        );
      } else if arg.signed {
        emit(
          asm,
          format!("movsx {}, {} [rbp - {offset}]", reg(r, width), ptr(arg.size)),
        );
      } else if arg.size == Size::DWord {
        emit(
          asm,
          format!("mov {}, dword ptr [rbp - {offset}]", reg(r, Size::DWord)),
        );
      } else {
        emit(
          asm,
          format!("movzx {}, {} [rbp - {offset}]", reg(r, width), ptr(arg.size)),
        );
      }
    }
    ArgKind::StaticRef { index } => {
      if width != Size::QWord {
        return Err(CompileError::internal(format!(
          "static reference loaded at {width} width"
        )));
      }
      emit(asm, format!("lea {}, [rip + str_{index}]", reg(r, Size::QWord)));
    }
    ArgKind::ReturnValue => {
      if r != Reg::Ax {
        emit(asm, format!("mov {}, {}", reg(r, width), reg(Reg::Ax, width)));
      }
    }
  }
  Ok(())
}

/// Routine header: export the symbol, set up the frame and spill the
/// incoming arguments into their slots. The reservation is rounded up
/// to a power of two.
fn emit_prologue(
  name: &str,
  params: &[Arg],
  frame_bytes: usize,
  asm: &mut String,
) -> CompileResult<()> {
  asm.push_str(&format!(".globl {name}\n"));
  asm.push_str(&format!("{name}:\n"));
  emit(asm, "push rbp");
  emit(asm, "mov rbp, rsp");
  if frame_bytes > 0 {
    emit(asm, format!("sub rsp, {}", frame_bytes.next_power_of_two()));
  }
  for (index, param) in params.iter().enumerate() {
    let Some(&r) = ARG_REGS.get(index) else {
      return Err(CompileError::internal("more parameters than argument registers"));
    };
    let ArgKind::Position { offset } = param.kind else {
      return Err(CompileError::internal("parameter is not a stack position"));
    };
    emit(
      asm,
      format!("mov {} [rbp - {offset}], {}", ptr(param.size), reg(r, param.size)),
    );
  }
  Ok(())
}

fn emit_return(value: Option<Arg>, asm: &mut String) -> CompileResult<()> {
  match value {
    Some(arg) => load_into(Reg::Ax, arg.size, arg, asm)?,
    None => emit(asm, "xor rax, rax"),
  }
  emit(asm, "mov rsp, rbp");
  emit(asm, "pop rbp");
  emit(asm, "ret");
  Ok(())
}

/// Store `src` into a stack slot at the slot's width. Small constants
/// go straight to memory; everything else stages through rax.
fn emit_assign(dst: Arg, src: Arg, asm: &mut String) -> CompileResult<()> {
  let ArgKind::Position { offset } = dst.kind else {
    return Err(CompileError::internal("assignment destination is not a stack position"));
  };
  if let ArgKind::Immediate { bits } = src.kind {
    let value = immediate_at(bits, dst.size);
    if dst.size != Size::QWord || fits_i32(value) {
      emit(asm, format!("mov {} [rbp - {offset}], {value}", ptr(dst.size)));
      return Ok(());
    }
  }
  load_into(Reg::Ax, dst.size, src, asm)?;
  emit(
    asm,
    format!("mov {} [rbp - {offset}], {}", ptr(dst.size), reg(Reg::Ax, dst.size)),
  );
  Ok(())
}

fn emit_binary(op: BinOp, dst: Arg, lhs: Arg, rhs: Arg, asm: &mut String) -> CompileResult<()> {
  if op == BinOp::Div {
    return Err(CompileError::unsupported(None, "division is not lowered"));
  }
  let ArgKind::Position { offset } = dst.kind else {
    return Err(CompileError::internal("binary destination is not a stack position"));
  };
  match op {
    BinOp::Shl | BinOp::Shr => emit_shift(op, dst, offset, lhs, rhs, asm),
    op if op.is_comparison() => emit_compare(op, offset, lhs, rhs, asm),
    _ => emit_arith(op, dst, offset, lhs, rhs, asm),
  }
}

/// Add, sub and imul at the destination width. There is no byte form
/// of imul, so byte multiplies are legalized to word width; the low
/// byte of the result is the same either way.
fn emit_arith(
  op: BinOp,
  dst: Arg,
  dst_offset: usize,
  lhs: Arg,
  rhs: Arg,
  asm: &mut String,
) -> CompileResult<()> {
  let width = if op == BinOp::Mul && dst.size == Size::Byte {
    Size::Word
  } else {
    dst.size
  };
  let mnemonic = match op {
    BinOp::Add => "add",
    BinOp::Sub => "sub",
    BinOp::Mul => "imul",
    other => return Err(CompileError::internal(format!("{other} is not an arithmetic op"))),
  };

  // A call result on the right must leave rax before the left operand
  // load clobbers it.
  let rhs_in_di = matches!(rhs.kind, ArgKind::ReturnValue);
  if rhs_in_di {
    emit(asm, format!("mov {}, {}", reg(Reg::Di, width), reg(Reg::Ax, width)));
  }
  load_into(Reg::Ax, width, lhs, asm)?;

  if rhs_in_di {
    emit(asm, format!("{mnemonic} {}, {}", reg(Reg::Ax, width), reg(Reg::Di, width)));
  } else if let ArgKind::Immediate { bits } = rhs.kind {
    let value = immediate_at(bits, width);
    if width == Size::QWord && !fits_i32(value) {
      load_into(Reg::Di, width, rhs, asm)?;
      emit(asm, format!("{mnemonic} {}, {}", reg(Reg::Ax, width), reg(Reg::Di, width)));
    } else if op == BinOp::Mul {
      emit(asm, format!("imul {0}, {0}, {value}", reg(Reg::Ax, width)));
    } else {
      emit(asm, format!("{mnemonic} {}, {value}", reg(Reg::Ax, width)));
    }
  } else if let ArgKind::Position { offset } = rhs.kind
    && rhs.size == width
  {
    emit(
      asm,
      format!("{mnemonic} {}, {} [rbp - {offset}]", reg(Reg::Ax, width), ptr(width)),
    );
  } else {
    load_into(Reg::Di, width, rhs, asm)?;
    emit(asm, format!("{mnemonic} {}, {}", reg(Reg::Ax, width), reg(Reg::Di, width)));
  }

  emit(
    asm,
    format!("mov {} [rbp - {dst_offset}], {}", ptr(dst.size), reg(Reg::Ax, dst.size)),
  );
  Ok(())
}

/// Compare at the wider operand width and materialize the flag as a
/// byte. The condition codes are the signed family.
fn emit_compare(
  op: BinOp,
  dst_offset: usize,
  lhs: Arg,
  rhs: Arg,
  asm: &mut String,
) -> CompileResult<()> {
  let width = lhs.size.max(rhs.size);

  let rhs_in_di = matches!(rhs.kind, ArgKind::ReturnValue);
  if rhs_in_di {
    emit(asm, format!("mov {}, {}", reg(Reg::Di, width), reg(Reg::Ax, width)));
  }
  load_into(Reg::Ax, width, lhs, asm)?;

  if rhs_in_di {
    emit(asm, format!("cmp {}, {}", reg(Reg::Ax, width), reg(Reg::Di, width)));
  } else if let ArgKind::Immediate { bits } = rhs.kind {
    let value = immediate_at(bits, width);
    if width == Size::QWord && !fits_i32(value) {
      load_into(Reg::Di, width, rhs, asm)?;
      emit(asm, format!("cmp {}, {}", reg(Reg::Ax, width), reg(Reg::Di, width)));
    } else {
      emit(asm, format!("cmp {}, {value}", reg(Reg::Ax, width)));
    }
  } else if let ArgKind::Position { offset } = rhs.kind
    && rhs.size == width
  {
    emit(asm, format!("cmp {}, {} [rbp - {offset}]", reg(Reg::Ax, width), ptr(width)));
  } else {
    load_into(Reg::Di, width, rhs, asm)?;
    emit(asm, format!("cmp {}, {}", reg(Reg::Ax, width), reg(Reg::Di, width)));
  }

  let set = match op {
    BinOp::Eq => "sete",
    BinOp::Ne => "setne",
    BinOp::Lt => "setl",
    BinOp::Le => "setle",
    BinOp::Gt => "setg",
    BinOp::Ge => "setge",
    other => return Err(CompileError::internal(format!("{other} is not a comparison"))),
  };
  emit(asm, format!("{set} byte ptr [rbp - {dst_offset}]"));
  Ok(())
}

/// Shifts work at the destination width with the count in cl or as an
/// immediate masked the way the hardware masks it. Right shifts are
/// arithmetic when the left operand is signed.
fn emit_shift(
  op: BinOp,
  dst: Arg,
  dst_offset: usize,
  lhs: Arg,
  rhs: Arg,
  asm: &mut String,
) -> CompileResult<()> {
  let width = dst.size;
  let mnemonic = match op {
    BinOp::Shl => "shl",
    _ if lhs.signed => "sar",
    _ => "shr",
  };

  // The count has to reach cl before the left operand lands in rax.
  let count_in_cl = !matches!(rhs.kind, ArgKind::Immediate { .. });
  if count_in_cl {
    load_into(Reg::Cx, Size::Byte, rhs, asm)?;
  }
  load_into(Reg::Ax, width, lhs, asm)?;

  if let ArgKind::Immediate { bits } = rhs.kind {
    let mask = if width == Size::QWord { 63 } else { 31 };
    let count = bits & mask;
    emit(asm, format!("{mnemonic} {}, {count}", reg(Reg::Ax, width)));
  } else {
    emit(asm, format!("{mnemonic} {}, cl", reg(Reg::Ax, width)));
  }

  emit(
    asm,
    format!("mov {} [rbp - {dst_offset}], {}", ptr(dst.size), reg(Reg::Ax, dst.size)),
  );
  Ok(())
}

fn emit_unary(op: UnOp, dst: Arg, operand: Arg, asm: &mut String) -> CompileResult<()> {
  let ArgKind::Position { offset: dst_offset } = dst.kind else {
    return Err(CompileError::internal("unary destination is not a stack position"));
  };
  match op {
    UnOp::Deref => {
      load_into(Reg::Ax, Size::QWord, operand, asm)?;
      emit(asm, format!("mov {}, {} [rax]", reg(Reg::Ax, dst.size), ptr(dst.size)));
      emit(
        asm,
        format!("mov {} [rbp - {dst_offset}], {}", ptr(dst.size), reg(Reg::Ax, dst.size)),
      );
    }
    UnOp::AddrOf => {
      let ArgKind::Position { offset } = operand.kind else {
        return Err(CompileError::internal("address-of operand is not a stack position"));
      };
      emit(asm, format!("lea rax, [rbp - {offset}]"));
      emit(asm, format!("mov qword ptr [rbp - {dst_offset}], rax"));
    }
  }
  Ok(())
}

/// Arguments load into the System V registers in order, each at its
/// own width. Variadic callees get the vector register count in al.
fn emit_call(name: &str, args: &[Arg], asm: &mut String) -> CompileResult<()> {
  for (index, arg) in args.iter().enumerate() {
    let Some(&r) = ARG_REGS.get(index) else {
      return Err(CompileError::internal("more call arguments than argument registers"));
    };
    load_into(r, arg.size, *arg, asm)?;
  }
  if is_variadic(name) {
    emit(asm, "mov al, 0");
  }
  emit(asm, format!("call {name}"));
  Ok(())
}

fn emit_jump_if_not(target: usize, cond: Arg, asm: &mut String) -> CompileResult<()> {
  if let ArgKind::Position { offset } = cond.kind {
    emit(asm, format!("cmp {} [rbp - {offset}], 0", ptr(cond.size)));
  } else {
    load_into(Reg::Ax, cond.size, cond, asm)?;
    emit(asm, format!("cmp {}, 0", reg(Reg::Ax, cond.size)));
  }
  emit(asm, format!("je .L{target}"));
  Ok(())
}

/// Render the string pool as an .rodata section of NUL-terminated
/// entries. Omitted entirely when no literal was seen.
fn emit_data(data: &[String], asm: &mut String) {
  if data.is_empty() {
    return;
  }
  asm.push_str(".section .rodata\n");
  for (index, text) in data.iter().enumerate() {
    asm.push_str(&format!("str_{index}:\n"));
    emit(asm, format!(".asciz \"{}\"", escape(text)));
    emit(asm, format!(".size str_{index}, {}", text.len() + 1));
  }
}

/// Escape a literal for a GAS string directive so the assembled bytes
/// match the stored text exactly.
fn escape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for byte in text.bytes() {
    match byte {
      b'\\' => out.push_str("\\\\"),
      b'"' => out.push_str("\\\""),
      b'\n' => out.push_str("\\n"),
      b'\t' => out.push_str("\\t"),
      b'\r' => out.push_str("\\r"),
      0x20..=0x7e => out.push(byte as char),
      _ => out.push_str(&format!("\\{byte:03o}")),
    }
  }
  out
}
