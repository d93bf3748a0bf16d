//! End-to-end compiles through the public API, checked against the
//! exact emitted text.

use gdnc::{CompileError, generate_assembly};
use pretty_assertions::assert_eq;

#[test]
fn arithmetic_into_a_local_compiles_to_the_expected_text() {
  let asm = generate_assembly("rt main() { i32 x = 1 + 2; }").unwrap();
  let expected = "\
.intel_syntax noprefix
.text
.globl main
main:
    push rbp
    mov rbp, rsp
    sub rsp, 8
    mov eax, 1
    add eax, 2
    mov dword ptr [rbp - 8], eax
    mov eax, dword ptr [rbp - 8]
    mov dword ptr [rbp - 4], eax
    xor rax, rax
    mov rsp, rbp
    pop rbp
    ret
";
  assert_eq!(asm, expected);
}

#[test]
fn while_loop_compiles_to_a_test_and_a_back_edge() {
  let asm = generate_assembly("rt main() { i32 i = 0; while (i < 10) { i = i + 1; } }").unwrap();
  let expected = "\
.intel_syntax noprefix
.text
.globl main
main:
    push rbp
    mov rbp, rsp
    sub rsp, 16
    mov dword ptr [rbp - 4], 0
.L0:
    mov eax, dword ptr [rbp - 4]
    cmp eax, 10
    setl byte ptr [rbp - 5]
    cmp byte ptr [rbp - 5], 0
    je .L1
    mov eax, dword ptr [rbp - 4]
    add eax, 1
    mov dword ptr [rbp - 9], eax
    mov eax, dword ptr [rbp - 9]
    mov dword ptr [rbp - 4], eax
    jmp .L0
.L1:
    xor rax, rax
    mov rsp, rbp
    pop rbp
    ret
";
  assert_eq!(asm, expected);
}

#[test]
fn loop_bounds_beyond_a_byte_compare_at_their_full_value() {
  let asm =
    generate_assembly("rt main() { i32 i = 0; while (i < 200) { i = i + 1; } ret i; }").unwrap();
  let expected = "\
.intel_syntax noprefix
.text
.globl main
main:
    push rbp
    mov rbp, rsp
    sub rsp, 16
    mov dword ptr [rbp - 4], 0
.L0:
    mov eax, dword ptr [rbp - 4]
    cmp eax, 200
    setl byte ptr [rbp - 5]
    cmp byte ptr [rbp - 5], 0
    je .L1
    mov eax, dword ptr [rbp - 4]
    add eax, 1
    mov dword ptr [rbp - 9], eax
    mov eax, dword ptr [rbp - 9]
    mov dword ptr [rbp - 4], eax
    jmp .L0
.L1:
    mov eax, dword ptr [rbp - 4]
    mov rsp, rbp
    pop rbp
    ret
";
  assert_eq!(asm, expected);
}

#[test]
fn if_else_compiles_to_a_skip_and_a_join() {
  let asm =
    generate_assembly("rt main() { i32 x = 0; if (x == 0) { x = 1; } else { x = 2; } ret x; }")
      .unwrap();
  let expected = "\
.intel_syntax noprefix
.text
.globl main
main:
    push rbp
    mov rbp, rsp
    sub rsp, 8
    mov dword ptr [rbp - 4], 0
    mov eax, dword ptr [rbp - 4]
    cmp eax, 0
    sete byte ptr [rbp - 5]
    cmp byte ptr [rbp - 5], 0
    je .L0
    mov dword ptr [rbp - 4], 1
    jmp .L1
.L0:
    mov dword ptr [rbp - 4], 2
.L1:
    mov eax, dword ptr [rbp - 4]
    mov rsp, rbp
    pop rbp
    ret
";
  assert_eq!(asm, expected);
}

#[test]
fn routines_call_each_other_through_the_argument_registers() {
  let source =
    "rt add(i32 a, i32 b) { ret a + b; }\nrt main() { i32 r = add(1, 2); printf(\"%d\", r); }";
  let asm = generate_assembly(source).unwrap();
  let expected = "\
.intel_syntax noprefix
.text
.globl add
add:
    push rbp
    mov rbp, rsp
    sub rsp, 16
    mov dword ptr [rbp - 4], edi
    mov dword ptr [rbp - 8], esi
    mov eax, dword ptr [rbp - 4]
    add eax, dword ptr [rbp - 8]
    mov dword ptr [rbp - 12], eax
    mov eax, dword ptr [rbp - 12]
    mov rsp, rbp
    pop rbp
    ret
.globl main
main:
    push rbp
    mov rbp, rsp
    sub rsp, 4
    mov rdi, 1
    mov rsi, 2
    call add
    mov dword ptr [rbp - 4], eax
    lea rdi, [rip + str_0]
    mov esi, dword ptr [rbp - 4]
    mov al, 0
    call printf
    xor rax, rax
    mov rsp, rbp
    pop rbp
    ret
.section .rodata
str_0:
    .asciz \"%d\"
    .size str_0, 3
";
  assert_eq!(asm, expected);
}

#[test]
fn repeated_literals_each_get_their_own_pool_entry() {
  let asm = generate_assembly(r#"rt main() { printf("hi"); printf("hi"); }"#).unwrap();
  let expected = "\
.intel_syntax noprefix
.text
.globl main
main:
    push rbp
    mov rbp, rsp
    lea rdi, [rip + str_0]
    mov al, 0
    call printf
    lea rdi, [rip + str_1]
    mov al, 0
    call printf
    xor rax, rax
    mov rsp, rbp
    pop rbp
    ret
.section .rodata
str_0:
    .asciz \"hi\"
    .size str_0, 3
str_1:
    .asciz \"hi\"
    .size str_1, 3
";
  assert_eq!(asm, expected);
}

#[test]
fn a_seventh_call_argument_is_a_semantic_error() {
  let err = generate_assembly(r#"rt main() { printf("%d", 1, 2, 3, 4, 5, 6); }"#).unwrap_err();
  assert!(matches!(err, CompileError::Semantic { .. }));
  assert_eq!(err.exit_code(), 6);
  assert!(err.to_string().contains("more than 6 call arguments"));
}

#[test]
fn an_undeclared_name_reports_its_exact_position() {
  let err = generate_assembly("rt main() { i32 x = y; }").unwrap_err();
  assert_eq!(err.to_string(), "1:21: use of undeclared \"y\"");
  assert_eq!(err.exit_code(), 6);
}

#[test]
fn division_parses_but_fails_in_the_generator() {
  let err = generate_assembly("rt main() { i32 x = 4 / 2; }").unwrap_err();
  assert_eq!(err.to_string(), "unsupported: division is not lowered");
  assert_eq!(err.exit_code(), 7);
}

#[test]
fn each_error_category_keeps_its_exit_code() {
  let lex = generate_assembly("rt main() { i32 x = \"oops; }").unwrap_err();
  assert_eq!(lex.exit_code(), 4);
  assert!(lex.to_string().contains("unterminated string literal"));

  let syntax = generate_assembly("rt main() { i32 5; }").unwrap_err();
  assert_eq!(syntax.exit_code(), 5);

  let semantic = generate_assembly("rt main() { i32 x; i32 x; }").unwrap_err();
  assert_eq!(semantic.exit_code(), 6);

  let unsupported = generate_assembly("rt main() { f64 d; }").unwrap_err();
  assert_eq!(unsupported.exit_code(), 7);
}

#[test]
fn a_program_without_main_is_rejected() {
  let err = generate_assembly("rt helper() { ret 1; }").unwrap_err();
  assert!(matches!(err, CompileError::Semantic { .. }));
  assert!(err.to_string().contains("no entry routine named \"main\""));
}

#[test]
fn comparisons_and_literals_widen_to_the_larger_side() {
  let asm = generate_assembly("rt main() { i64 big = 1; u8 r = big > 0; }").unwrap();
  assert!(asm.contains("mov rax, qword ptr [rbp - 8]"));
  assert!(asm.contains("cmp rax, 0"));
  assert!(asm.contains("setg byte ptr [rbp - 10]"));
}
