//! gdnc: an ahead-of-time compiler for the gdn language.
//!
//! The pipeline has two stages. [`parser::parse`] is a single-pass
//! front end that pulls tokens and lowers them straight to a flat IR
//! with a static data pool; there is no syntax tree. The generator
//! then renders that IR as GAS Intel-syntax x86-64 text ready for
//! `as` and a linker.

pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;

mod codegen;

pub use error::{CompileError, CompileResult};

/// Compile gdn source text to assembly in one call.
///
/// ```
/// let asm = gdnc::generate_assembly("rt main() { ret 7; }").unwrap();
/// assert!(asm.contains("main:"));
/// assert!(asm.contains("mov rax, 7"));
/// ```
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  let program = parser::parse(source)?;
  codegen::generate(&program)
}
