//! The single-pass bytecode compiler: a token-stream parser state
//! fused with a bytecode emitter, exactly as the teacher's
//! own `Compiler`/`Parser` pair are fused into one pass rather than
//! building an intermediate tree. Grounded throughout on
//! `src/compiler/parser.rs` (the token-stream plumbing: `advance`,
//! `check`, `matches`, `consume`, `error_at_*`, `synchronize`) from an
//! earlier draft of this same interpreter, and on `Parser/src/lib.rs`'s
//! Pratt-table shape for the expression grammar, adapted to a
//! tree-less, emit-as-you-go compiler per this language's design.

mod declarations;
mod expressions;
mod loops;
pub mod precedence;
mod resolver;

use warp_core::diagnostics::{DiagLevel, Diagnostic};
use warp_core::object::ObjRef;
use warp_core::opcode::OpCode;
use warp_core::token::{Token, TokenKind};
use warp_core::value::Value;
use warp_core::Chunk;
use warp_lexer::Lexer;
use warp_objects::{FunctionObject, HeapObject, ObjectArena, StringIntern};

pub use precedence::Precedence;

/// A compiler instance's locals vector holds at most this many entries;
/// slot 0 is always reserved for the callee, so user locals are capped
/// at 255.
const MAX_LOCALS: usize = 256;

/// `depth == -1` marks a declared-but-uninitialized local, forbidding
/// self-reference in its own initializer.
struct Local {
  name: String,
  depth: i32,
}

/// Bookkeeping for one `while` in progress: where its condition re-test
/// starts, the scope depth it opened at, and the jump sites its `break`s
/// need patched once the loop closes. The enclosing loop isn't linked
/// explicitly; it's just the rest of `FunctionState::loops` below this
/// one.
struct LoopRecord {
  start_offset: usize,
  scope_depth: i32,
  end_jumps: Vec<usize>,
}

/// A function-in-progress: its own locals, scope depth, loop-record
/// stack, and running/peak slot count. Nested
/// function bodies push a new `FunctionState`; the enclosing one is
/// simply the rest of `Compiler::functions` below it.
struct FunctionState {
  function: FunctionObject,
  locals: Vec<Local>,
  scope_depth: i32,
  loops: Vec<LoopRecord>,
  slot_count: i32,
  max_slots: i32,
}

impl FunctionState {
  fn new(name: Option<String>, arity: u8) -> Self {
    FunctionState {
      function: FunctionObject::new(name, arity),
      // Slot 0 holds the callee itself; it is never addressed by name,
      // so it carries no name and a permanent depth of 0.
      locals: vec![Local {
        name: String::new(),
        depth: 0,
      }],
      scope_depth: 0,
      loops: Vec::new(),
      slot_count: 1,
      max_slots: 1,
    }
  }
}

/// The token-stream parser state fused with the bytecode emitter.
/// `'src` is the lifetime of the decoded source buffer the lexer
/// borrows; `'vm` is the lifetime of the VM-owned arena and intern
/// table the compiler allocates into as it goes (object literals and
/// interned identifiers alike go through the VM's own allocation and
/// interning entry points).
pub struct Compiler<'src, 'vm> {
  lexer: Lexer<'src>,
  previous: Token,
  current: Token,
  had_error: bool,
  panic_mode: bool,
  filename: String,
  diagnostics: Vec<Diagnostic>,
  arena: &'vm mut ObjectArena,
  intern: &'vm mut StringIntern,
  functions: Vec<FunctionState>,
}

/// Compiles `source` to a script-function object (top-level code is
/// wrapped in a synthetic nameless function, the same as any other
/// function body). On success, returns the compiled function's arena
/// reference; on failure, every diagnostic recorded during the attempt
/// — any recorded error means no function is produced at all.
pub fn compile(filename: &str, source: &str, arena: &mut ObjectArena, intern: &mut StringIntern) -> Result<ObjRef, Vec<Diagnostic>> {
  let chars: Vec<char> = source.chars().collect();
  let lexer = Lexer::new(&chars);
  let mut compiler = Compiler {
    lexer,
    previous: Token::synthetic(TokenKind::Eof),
    current: Token::synthetic(TokenKind::Eof),
    had_error: false,
    panic_mode: false,
    filename: filename.to_string(),
    diagnostics: Vec::new(),
    arena,
    intern,
    functions: vec![FunctionState::new(None, 0)],
  };

  compiler.advance();
  compiler.compile_sequence(TokenKind::Eof);
  if !compiler.check(TokenKind::Eof) {
    compiler.error_at_current("expected end of input");
  }
  compiler.emit_op(OpCode::Return);

  if compiler.had_error {
    return Err(compiler.diagnostics);
  }
  let state = compiler.functions.pop().expect("the script's own function state is always present");
  let obj_ref = compiler.arena.alloc(HeapObject::Function(state.function));
  Ok(obj_ref)
}

/// The net value-stack effect of an opcode whose operand doesn't change
/// its effect. `Block` and `Call` are excluded: their effect depends on
/// their operand and is applied by their own emit call sites instead.
fn opcode_effect(op: OpCode) -> i32 {
  use OpCode::*;
  match op {
    Const | Nil | True | False | Dup | GetLocal | GetGlobal => 1,
    Pop | Add | Sub | Mul | Div | Lt | Gt | LtEq | GtEq | Eq => -1,
    DefGlobal | SetGlobal | SetLocal | Neg | Not | Jmp | JmpFalse | Loop | EndLoop | Print | Return => 0,
    Block | Call => 0,
  }
}

impl<'src, 'vm> Compiler<'src, 'vm> {
  // ---- token stream plumbing ----

  fn advance(&mut self) {
    std::mem::swap(&mut self.previous, &mut self.current);
    loop {
      self.current = self.lexer.next_token();
      self.drain_lex_issues();
      // An INVALID token is consumed and the scan continues.
      if self.current.kind != TokenKind::Invalid {
        break;
      }
    }
  }

  fn drain_lex_issues(&mut self) {
    let issues: Vec<_> = self.lexer.pending.drain(..).collect();
    for issue in issues {
      if issue.level == DiagLevel::Error {
        self.had_error = true;
      }
      self.diagnostics.push(Diagnostic::new(issue.level, issue.message, self.filename.clone(), issue.line, issue.column, issue.length));
    }
  }

  fn check(&self, kind: TokenKind) -> bool {
    self.current.kind == kind
  }

  fn match_(&mut self, kind: TokenKind) -> bool {
    if !self.check(kind) {
      return false;
    }
    self.advance();
    true
  }

  fn consume(&mut self, kind: TokenKind, message: &str) {
    if self.check(kind) {
      self.advance();
      return;
    }
    self.error_at_current(message);
  }

  /// Drops tokens until a likely declaration boundary: `previous` is a
  /// `;`, or `current` starts a new declaration, or the block/input
  /// ends.
  fn synchronize(&mut self) {
    self.panic_mode = false;
    while !self.check(TokenKind::Eof) && !self.check(TokenKind::RBrace) {
      if self.previous.kind == TokenKind::Semicolon {
        return;
      }
      match self.current.kind {
        TokenKind::Fun | TokenKind::Var | TokenKind::For | TokenKind::If | TokenKind::While | TokenKind::Return => return,
        _ => {}
      }
      self.advance();
    }
  }

  fn error_at_current(&mut self, message: &str) {
    let token = self.current.clone();
    self.error_at(&token, message);
  }

  fn error_at_previous(&mut self, message: &str) {
    let token = self.previous.clone();
    self.error_at(&token, message);
  }

  fn error_at(&mut self, token: &Token, message: &str) {
    if self.panic_mode {
      return;
    }
    self.panic_mode = true;
    self.had_error = true;
    let length = if token.kind == TokenKind::Eof { 0 } else { token.lexeme.chars().count().max(1) };
    self.diagnostics.push(Diagnostic::new(DiagLevel::Error, message.to_string(), self.filename.clone(), token.line, token.column, length));
  }

  // ---- compiler-instance / scope accessors ----

  fn current_function(&self) -> &FunctionState {
    self.functions.last().expect("a FunctionState is always on the stack while compiling")
  }

  fn current_function_mut(&mut self) -> &mut FunctionState {
    self.functions.last_mut().expect("a FunctionState is always on the stack while compiling")
  }

  fn current_chunk(&self) -> &Chunk {
    &self.current_function().function.chunk
  }

  fn current_chunk_mut(&mut self) -> &mut Chunk {
    &mut self.current_function_mut().function.chunk
  }

  /// `begin_scope` increments depth.
  fn begin_scope(&mut self) {
    self.current_function_mut().scope_depth += 1;
  }

  /// `end_scope` pops every local whose depth exceeds the new depth and
  /// emits `BLOCK` to drop their stack slots while preserving the
  /// top-of-stack expression value.
  fn end_scope(&mut self) {
    let new_depth = self.current_function().scope_depth - 1;
    let mut dropped: u16 = 0;
    while let Some(local) = self.current_function().locals.last() {
      if local.depth <= new_depth {
        break;
      }
      dropped += 1;
      self.current_function_mut().locals.pop();
    }
    self.current_function_mut().scope_depth = new_depth;
    self.emit_op_u16(OpCode::Block, dropped);
  }

  // ---- bytecode emission ----

  fn bump_slots(&mut self, delta: i32) {
    let state = self.current_function_mut();
    state.slot_count += delta;
    if state.slot_count > state.max_slots {
      state.max_slots = state.slot_count;
    }
  }

  fn emit_raw_byte(&mut self, byte: u8) -> usize {
    let line = self.previous.line;
    self.current_chunk_mut().push_byte(byte, line)
  }

  fn emit_op(&mut self, op: OpCode) {
    self.emit_raw_byte(op as u8);
    self.bump_slots(opcode_effect(op));
  }

  fn emit_op_u8(&mut self, op: OpCode, operand: u8) {
    self.emit_raw_byte(op as u8);
    self.emit_raw_byte(operand);
    let delta = if op == OpCode::Call { -(operand as i32) } else { opcode_effect(op) };
    self.bump_slots(delta);
  }

  /// Emits `op` with a 2-byte operand, returning the operand's first
  /// byte offset (used both for known operands like `BLOCK k` and for
  /// jump placeholders patched later).
  fn emit_op_u16(&mut self, op: OpCode, operand: u16) -> usize {
    self.emit_raw_byte(op as u8);
    let line = self.previous.line;
    let idx = self.current_chunk_mut().push_short(operand, line);
    let delta = if op == OpCode::Block { -(operand as i32) } else { opcode_effect(op) };
    self.bump_slots(delta);
    idx
  }

  /// Emits `op` with a placeholder operand, to be rewritten once the
  /// jump's target is known.
  fn emit_jump(&mut self, op: OpCode) -> usize {
    self.emit_op_u16(op, 0xffff)
  }

  /// Patches a forward jump emitted by `emit_jump` to land at the
  /// current code position. Patched exactly once.
  fn patch_jump(&mut self, offset: usize) {
    let jump = self.current_chunk().len() - (offset + 2);
    if jump > u16::MAX as usize {
      self.error_at_previous("jump too far (offset > 65535)");
    }
    self.current_chunk_mut().patch_short(offset, jump as u16);
  }

  /// Emits a backward `LOOP` to `loop_start`: `while`'s own loop close,
  /// and `continue`'s jump back to the loop's start.
  fn emit_loop(&mut self, loop_start: usize) {
    self.emit_raw_byte(OpCode::Loop as u8);
    let line = self.previous.line;
    let after_operand = self.current_chunk().len() + 2;
    let jump = after_operand.saturating_sub(loop_start);
    if jump > u16::MAX as usize {
      self.error_at_previous("loop body too large (offset > 65535)");
    }
    self.current_chunk_mut().push_short(jump as u16, line);
  }

  /// Rewrites an `ENDLOOP` placeholder in place to a concrete `JMP`
  /// landing at `target` — the in-place sentinel-rewrite technique used
  /// for `break`.
  fn rewrite_endloop_as_jump(&mut self, offset: usize, target: usize) {
    let jump = target.saturating_sub(offset + 2);
    if jump > u16::MAX as usize {
      self.error_at_previous("break jump too far (offset > 65535)");
    }
    self.current_chunk_mut().patch_byte(offset - 1, OpCode::Jmp as u8);
    self.current_chunk_mut().patch_short(offset, jump as u16);
  }

  /// Emits `BLOCK k` where `k` is the count of locals declared deeper
  /// than `target_depth`, without removing them from the compiler's
  /// locals vector — used by `break`/`continue` to drop runtime slots
  /// down to the enclosing loop's scope while compilation of the
  /// current block continues past the jump.
  fn emit_block_drop_to_depth(&mut self, target_depth: i32) {
    let count = self.current_function().locals.iter().rev().take_while(|local| local.depth > target_depth).count();
    self.emit_op_u16(OpCode::Block, count as u16);
  }

  /// Adds `value` to the current chunk's constant pool, reporting a
  /// "too many constants" error on overflow.
  fn add_constant(&mut self, value: Value) -> u8 {
    match self.current_chunk_mut().add_constant(value) {
      Some(idx) => idx,
      None => {
        self.error_at_previous("too many constants in one chunk");
        0
      }
    }
  }

  /// Interns `name` and adds it as a constant, for `DEF_GLOB`/`GET_GLOB`/
  /// `SET_GLOB`'s name operand.
  fn identifier_constant(&mut self, name: &str) -> u8 {
    let obj_ref = self.intern.make_string(self.arena, name.to_string());
    self.add_constant(Value::Obj(obj_ref))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn compile_ok(source: &str) -> Chunk {
    let mut arena = ObjectArena::new();
    let mut intern = StringIntern::new();
    match compile("<test>", source, &mut arena, &mut intern) {
      Ok(func_ref) => {
        // Cloned out of the arena by value since the arena borrow would
        // otherwise have to outlive this helper.
        let chunk = &arena.get(func_ref).as_function().expect("compile() always produces a Function object").chunk;
        Chunk {
          code: chunk.code.clone(),
          lines: chunk.lines.clone(),
          constants: chunk.constants.clone(),
        }
      }
      Err(diags) => panic!("expected successful compilation, got {:?}", diags.iter().map(|d| &d.message).collect::<Vec<_>>()),
    }
  }

  fn compile_err(source: &str) -> Vec<Diagnostic> {
    let mut arena = ObjectArena::new();
    let mut intern = StringIntern::new();
    match compile("<test>", source, &mut arena, &mut intern) {
      Ok(_) => panic!("expected a compile error"),
      Err(diags) => diags,
    }
  }

  fn opcodes(chunk: &Chunk) -> Vec<OpCode> {
    let mut ops = Vec::new();
    let mut i = 0;
    while i < chunk.code.len() {
      let op = OpCode::try_from(chunk.code[i]).expect("every emitted byte is a valid opcode");
      ops.push(op);
      i += 1 + op.operand_len();
    }
    ops
  }

  #[test]
  fn arithmetic_precedence_emits_mul_before_add() {
    let chunk = compile_ok("1 + 2 * 3");
    let ops = opcodes(&chunk);
    // CONST 1, CONST 2, CONST 3, MUL, ADD, POP(discarded trailing), RETURN —
    // the script wraps a single top-level expression-declaration.
    let mul_pos = ops.iter().position(|op| *op == OpCode::Mul).unwrap();
    let add_pos = ops.iter().position(|op| *op == OpCode::Add).unwrap();
    assert!(mul_pos < add_pos, "2 * 3 must be compiled (and thus appear) before the outer +");
    assert_eq!(ops.last(), Some(&OpCode::Return));
  }

  #[test]
  fn var_declaration_at_global_scope_emits_def_global() {
    let chunk = compile_ok("var x = 1;");
    assert!(opcodes(&chunk).contains(&OpCode::DefGlobal));
  }

  #[test]
  fn local_declaration_emits_dup_not_def_global() {
    let chunk = compile_ok("{ var x = 1; x }");
    let ops = opcodes(&chunk);
    assert!(ops.contains(&OpCode::Dup));
    assert!(!ops.contains(&OpCode::DefGlobal));
  }

  #[test]
  fn empty_block_yields_nil() {
    let chunk = compile_ok("{}");
    // NIL (empty sequence), BLOCK 0, POP (discarded), NIL (script's own
    // trailing value), RETURN.
    assert!(opcodes(&chunk).contains(&OpCode::Nil));
    assert!(opcodes(&chunk).contains(&OpCode::Block));
  }

  #[test]
  fn if_expression_emits_jmp_false_and_jmp() {
    let chunk = compile_ok("if true then 1 else 2 end");
    let ops = opcodes(&chunk);
    assert!(ops.contains(&OpCode::JmpFalse));
    assert!(ops.contains(&OpCode::Jmp));
  }

  #[test]
  fn while_loop_emits_loop_and_jmp_false() {
    let chunk = compile_ok("while true { break }");
    let ops = opcodes(&chunk);
    assert!(ops.contains(&OpCode::Loop));
    assert!(ops.contains(&OpCode::JmpFalse));
    // break's ENDLOOP sentinel is always rewritten to JMP by the time
    // compilation finishes.
    assert!(!ops.contains(&OpCode::EndLoop));
  }

  #[test]
  fn function_call_emits_call_with_argc_operand() {
    let chunk = compile_ok("fun add = (a, b) { a + b }; add(2, 40)");
    let call_pos = chunk.code.iter().position(|&b| OpCode::try_from(b) == Ok(OpCode::Call)).unwrap();
    assert_eq!(chunk.code[call_pos + 1], 2);
  }

  #[test]
  fn self_reference_in_initializer_is_a_compile_error() {
    let diags = compile_err("{ var x = x; }");
    assert!(diags.iter().any(|d| d.message.contains("own initializer")));
  }

  #[test]
  fn redeclaring_a_local_in_the_same_scope_is_an_error() {
    let diags = compile_err("{ var x = 1; var x = 2; }");
    assert!(diags.iter().any(|d| d.message.contains("already exists in this scope")));
  }

  #[test]
  fn break_outside_a_loop_is_an_error() {
    let diags = compile_err("break");
    assert!(diags.iter().any(|d| d.message.contains("outside a loop")));
  }

  #[test]
  fn continue_outside_a_loop_is_an_error() {
    let diags = compile_err("continue");
    assert!(diags.iter().any(|d| d.message.contains("outside a loop")));
  }

  #[test]
  fn too_many_constants_is_a_clean_compile_error() {
    let mut source = String::new();
    for i in 0..260 {
      source.push_str(&format!("{}.0;\n", i));
    }
    let diags = compile_err(&source);
    assert!(diags.iter().any(|d| d.message.contains("too many constants")));
  }

  #[test]
  fn jump_operands_stay_within_chunk_bounds() {
    let chunk = compile_ok("var x = if true then 1 else 2 end; while x < 10 { x = x + 1 }");
    let mut i = 0;
    while i < chunk.code.len() {
      let op = OpCode::try_from(chunk.code[i]).unwrap();
      if matches!(op, OpCode::Jmp | OpCode::JmpFalse | OpCode::Loop) {
        let operand = chunk.get_short(i + 1) as usize;
        let target = if op == OpCode::Loop { (i + 3).saturating_sub(operand) } else { i + 3 + operand };
        assert!(target <= chunk.code.len());
      }
      i += 1 + op.operand_len();
    }
  }
}
