//! Declarations (`var`, `fun`, and bare expressions) and the
//! declaration-sequence driver shared by the script body, `{ }` blocks,
//! and function bodies.

use warp_core::object::ObjRef;
use warp_core::opcode::OpCode;
use warp_core::token::TokenKind;
use warp_core::value::Value;
use warp_objects::HeapObject;

use crate::{Compiler, FunctionState};

impl<'src, 'vm> Compiler<'src, 'vm> {
  /// Compiles declarations up to (but not including) `end` or end of
  /// input. Every declaration leaves exactly one value on the stack;
  /// the trailing value of each one that isn't last in its block is
  /// discarded with `POP`. An empty sequence emits `NIL` so the
  /// surrounding construct still yields a value.
  pub(crate) fn compile_sequence(&mut self, end: TokenKind) {
    if self.check(end) || self.check(TokenKind::Eof) {
      self.emit_op(OpCode::Nil);
      return;
    }

    loop {
      self.compile_one_declaration();

      if self.check(TokenKind::Semicolon) {
        self.advance();
      } else if !(self.check(end) || self.check(TokenKind::Eof)) {
        if !self.current.starts_line {
          self.error_at_current("expected a terminator after this declaration");
        }
      }

      if self.check(end) || self.check(TokenKind::Eof) {
        return;
      }
      self.emit_op(OpCode::Pop);
    }
  }

  fn compile_one_declaration(&mut self) {
    if self.match_(TokenKind::Var) {
      self.var_declaration();
    } else if self.match_(TokenKind::Fun) {
      self.fun_declaration();
    } else {
      self.expression();
    }

    if self.panic_mode {
      self.synchronize();
    }
  }

  /// `var x = e;`. At global scope, emits `DEF_GLOB` (which retains the
  /// initializer's value). At local scope, records a local (depth = -1
  /// until the initializer finishes, forbidding self-reference) and
  /// emits `DUP` so the declaration still yields a value.
  fn var_declaration(&mut self) {
    self.consume(TokenKind::Identifier, "expected a variable name");
    let name = self.previous.lexeme.clone();
    let is_local = self.current_function().scope_depth > 0;
    if is_local {
      self.declare_local(&name);
    }

    self.consume(TokenKind::Eq, "expected '=' after variable name");
    self.expression();

    if is_local {
      self.mark_initialized();
      self.emit_op(OpCode::Dup);
    } else {
      let idx = self.identifier_constant(&name);
      self.emit_op_u8(OpCode::DefGlobal, idx);
    }
  }

  /// `fun name = ( params ) { body }`. The name is declared (and, for
  /// locals, immediately marked initialized) before the body compiles,
  /// so the function can call itself recursively. The compiled function
  /// becomes a constant of the enclosing chunk and is bound the same
  /// way a `var`'s value is.
  fn fun_declaration(&mut self) {
    self.consume(TokenKind::Identifier, "expected a function name");
    let name = self.previous.lexeme.clone();
    let is_local = self.current_function().scope_depth > 0;
    if is_local {
      self.declare_local(&name);
      self.mark_initialized();
    }

    self.consume(TokenKind::Eq, "expected '=' after function name");
    self.function_body(&name);

    if is_local {
      self.emit_op(OpCode::Dup);
    } else {
      let idx = self.identifier_constant(&name);
      self.emit_op_u8(OpCode::DefGlobal, idx);
    }
  }

  /// Compiles a function's parameter list and body into a nested
  /// `FunctionState`, then pushes the finished function onto the
  /// enclosing chunk as a constant. Slot 0 is reserved for the
  /// callee itself (`FunctionState::new`); parameters become locals at
  /// depth 1, addressable by `GET_LOCAL 1..arity`.
  fn function_body(&mut self, name: &str) {
    self.functions.push(FunctionState::new(Some(name.to_string()), 0));
    self.begin_scope();

    self.consume(TokenKind::LParen, "expected '(' after function name");
    if !self.check(TokenKind::RParen) {
      loop {
        if self.current_function().function.arity == 255 {
          self.error_at_current("can't have more than 255 parameters");
        } else {
          self.current_function_mut().function.arity += 1;
        }
        self.consume(TokenKind::Identifier, "expected a parameter name");
        let param_name = self.previous.lexeme.clone();
        self.declare_local(&param_name);
        self.mark_initialized();
        if !self.match_(TokenKind::Comma) {
          break;
        }
      }
    }
    self.consume(TokenKind::RParen, "expected ')' after parameters");

    self.consume(TokenKind::LBrace, "expected '{' before function body");
    // The body's declarations share the param scope (depth 1) rather
    // than opening yet another nested one: `RETURN` below unwinds the
    // whole frame regardless of scope depth, so there is nothing for a
    // separate `BLOCK` to usefully drop here.
    self.compile_sequence(TokenKind::RBrace);
    self.consume(TokenKind::RBrace, "expected '}' after function body");
    self.emit_op(OpCode::Return);

    let state = self.functions.pop().expect("function_body always pushes exactly one FunctionState");
    let func_ref: ObjRef = self.arena.alloc(HeapObject::Function(state.function));
    let idx = self.add_constant(Value::Obj(func_ref));
    self.emit_op_u8(OpCode::Const, idx);
  }
}
