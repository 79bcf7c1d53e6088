//! `while`, `break`, and `continue`. Loop bookkeeping lives on a
//! per-function stack (`FunctionState::loops`); nested loops are simply
//! the remainder of that stack below the innermost one.

use warp_core::opcode::OpCode;
use warp_core::token::TokenKind;

use crate::{Compiler, LoopRecord};

impl<'src, 'vm> Compiler<'src, 'vm> {
  /// `while cond { body }`. Records the pre-condition offset, emits the
  /// exit test, compiles the body (discarding its per-iteration value),
  /// loops back, then patches the exit and every `break` site recorded
  /// during the body to land past the loop's default `NIL`.
  pub(crate) fn while_expression(&mut self) {
    let start_offset = self.current_chunk().len();
    let scope_depth = self.current_function().scope_depth;
    self.current_function_mut().loops.push(LoopRecord {
      start_offset,
      scope_depth,
      end_jumps: Vec::new(),
    });

    self.expression();
    let exit_jump = self.emit_jump(OpCode::JmpFalse);
    self.emit_op(OpCode::Pop);

    self.consume(TokenKind::LBrace, "expected '{' after while condition");
    self.block_expression();
    self.emit_op(OpCode::Pop);
    self.emit_loop(start_offset);

    self.patch_jump(exit_jump);
    self.emit_op(OpCode::Pop);
    self.emit_op(OpCode::Nil);

    let record = self.current_function_mut().loops.pop().expect("this loop's own record is always on top");
    let end_offset = self.current_chunk().len();
    for endloop_offset in record.end_jumps {
      self.rewrite_endloop_as_jump(endloop_offset, end_offset);
    }
  }

  /// `break expr?`: an error outside a loop. Compiles `expr` (or `nil`
  /// when none follows), drops locals back to the enclosing loop's
  /// scope depth, then emits the `ENDLOOP` sentinel `close_loop`
  /// rewrites once the loop's end offset is known.
  pub(crate) fn break_expression(&mut self) {
    if self.current_function().loops.is_empty() {
      self.error_at_previous("can't use 'break' outside a loop");
    }

    if self.has_break_or_continue_value() {
      self.expression();
    } else {
      self.emit_op(OpCode::Nil);
    }

    if self.current_function().loops.is_empty() {
      return;
    }
    let target_depth = self.current_function().loops.last().expect("checked non-empty above").scope_depth;
    self.emit_block_drop_to_depth(target_depth);
    let endloop_offset = self.emit_jump(OpCode::EndLoop);
    self.current_function_mut().loops.last_mut().expect("checked non-empty above").end_jumps.push(endloop_offset);
  }

  /// `continue`: an error outside a loop. Drops locals back to the
  /// enclosing loop's scope depth, then jumps back to the loop's start
  /// so the condition is re-tested.
  pub(crate) fn continue_expression(&mut self) {
    if self.current_function().loops.is_empty() {
      self.error_at_previous("can't use 'continue' outside a loop");
      self.emit_op(OpCode::Nil);
      return;
    }
    let (target_depth, start_offset) = {
      let record = self.current_function().loops.last().expect("checked non-empty above");
      (record.scope_depth, record.start_offset)
    };
    self.emit_block_drop_to_depth(target_depth);
    self.emit_loop(start_offset);
    // `continue` occupies an expression slot grammatically (every
    // declaration leaves exactly one value), but control never reaches
    // past the unconditional jump above; this keeps that invariant
    // textually true without being observable at runtime.
    self.emit_op(OpCode::Nil);
  }

  /// A `break`/`continue` is followed by a value expression unless the
  /// next token is a terminator (`;`, a new line, `}`, or end of
  /// input).
  fn has_break_or_continue_value(&self) -> bool {
    !(self.check(TokenKind::Semicolon) || self.check(TokenKind::RBrace) || self.check(TokenKind::Eof) || self.current.starts_line)
  }
}
