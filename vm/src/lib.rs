//! The stack-based virtual machine: call-frame stack, value stack,
//! globals map, and the fetch/decode/execute loop. Grounded on
//! `VirtualMachine/src/run.rs` (dispatch loop shape) and
//! `src/virtual_machine/mod.rs` (`interpret`'s top-level control flow,
//! `CallFrame`/`RuntimeResult` shape), trimmed from the teacher's ~80
//! opcodes covering closures/classes/iterators down to this language's
//! ~25.

mod arithmetic;
mod frame;

use hashbrown::HashMap;

use warp_compiler::compile;
use warp_core::chunk::Chunk;
use warp_core::diagnostics::Diagnostic;
use warp_core::interp_result::InterpretResult;
use warp_core::object::ObjRef;
use warp_core::opcode::OpCode;
use warp_core::value::Value;
use warp_objects::{HeapObject, NativeContext, NativeObject, ObjectArena, StringIntern};

use arithmetic::{add, compare, div, mul, neg, sub, stringify, values_equal, CompareOp};
pub use frame::CallFrame;

/// What `CALL`'s callee region resolved to, extracted out of the arena
/// before any frame/stack mutation so the arena borrow doesn't overlap
/// with it (see `Vm::call_value`).
enum Callable {
  Function(u8),
  Native(u8, fn(&mut dyn NativeContext, &mut [Value])),
  NotCallable(&'static str),
}

/// The call-frame stack's capacity. Exceeding it (a call that would be
/// the 65th nested frame) is a runtime error.
pub const MAX_FRAMES: usize = 64;

/// The value stack's capacity: `MAX_FRAMES × 256`.
pub const STACK_MAX: usize = MAX_FRAMES * 256;

/// `vm_new`'s configuration. The allocator collaborator is not
/// reified — Rust's global allocator is used directly, and `user_info`
/// is dropped since Rust closures already close over whatever state a
/// sink needs (see `DESIGN.md`). `compile_diag_sink` receives full
/// `Diagnostic` records; `runtime_diag_sink` receives a plain message.
/// `print_sink` receives `PRINT`'s already-`Display`-ed text, made
/// injectable the same way the diagnostic sinks are, rather than
/// writing to stdout directly, so a host (or a test) can capture a
/// program's output instead of only its `InterpretResult`.
pub struct VmConfig {
  pub compile_diag_sink: Box<dyn FnMut(&Diagnostic)>,
  pub runtime_diag_sink: Box<dyn FnMut(&str)>,
  pub print_sink: Box<dyn FnMut(&str)>,
}

impl Default for VmConfig {
  /// Prints diagnostics to stderr with no source-span rendering; the
  /// CLI installs its own sinks that render a caret-tilde underline via
  /// `warp_core`'s source text, not this crate's concern. `PRINT`
  /// output goes to stdout, one line per call.
  fn default() -> Self {
    VmConfig {
      compile_diag_sink: Box::new(|diag| eprintln!("{:?}: {}", diag.level, diag.message)),
      runtime_diag_sink: Box::new(|msg| eprintln!("{}", msg)),
      print_sink: Box::new(|text| println!("{}", text)),
    }
  }
}

/// `{frame stack, value stack, all-objects arena, interned-strings
/// table, globals map}`. There's no `bytes-allocated` counter: nothing
/// here ever runs a GC to gate.
pub struct Vm {
  frames: Vec<CallFrame>,
  stack: Vec<Value>,
  globals: HashMap<ObjRef, Value>,
  arena: ObjectArena,
  intern: StringIntern,
  config: VmConfig,
}

impl NativeContext for Vm {
  fn arena_mut(&mut self) -> &mut ObjectArena {
    &mut self.arena
  }

  fn intern_mut(&mut self) -> &mut StringIntern {
    &mut self.intern
  }
}

impl Vm {
  pub fn new(config: VmConfig) -> Self {
    Vm {
      frames: Vec::with_capacity(MAX_FRAMES),
      stack: Vec::with_capacity(STACK_MAX),
      globals: HashMap::new(),
      arena: ObjectArena::new(),
      intern: StringIntern::new(),
      config,
    }
  }

  /// `vm_register_native`: interns `name`, allocates a `Native` heap
  /// object, and binds it in the globals map exactly as a global
  /// function declaration would.
  pub fn register_native(&mut self, name: &str, arity: u8, body: fn(&mut dyn NativeContext, &mut [Value])) {
    let name_ref = self.intern.make_string(&mut self.arena, name.to_string());
    let native_ref = self.arena.alloc(HeapObject::Native(NativeObject {
      name: name.to_string(),
      arity,
      body,
    }));
    self.globals.insert(name_ref, Value::Obj(native_ref));
  }

  /// `vm_get_slot`: reads a 0-based value-stack slot, bounded by
  /// the current stack pointer.
  pub fn get_slot(&self, index: usize) -> Option<Value> {
    self.stack.get(index).copied()
  }

  /// `vm_interpret`: compiles `source` to a script function and
  /// invokes it with zero arguments. Compile errors never reach `run` —
  /// any recorded error means no function is produced, so there is
  /// nothing to execute. The value stack is cleared first: each
  /// top-level call is a fresh invocation starting from an idle VM,
  /// sharing only globals/arena/intern with prior calls, the way a REPL
  /// reuses one `Vm` across lines.
  pub fn interpret(&mut self, filename: &str, source: &str) -> InterpretResult {
    match compile(filename, source, &mut self.arena, &mut self.intern) {
      Ok(function_ref) => {
        self.stack.clear();
        self.stack.push(Value::Obj(function_ref));
        self.frames.push(CallFrame { function: function_ref, ip: 0, base: 0 });
        self.run()
      }
      Err(diagnostics) => {
        for diagnostic in &diagnostics {
          (self.config.compile_diag_sink)(diagnostic);
        }
        InterpretResult::CompileError
      }
    }
  }

  fn function_chunk(&self, function_ref: ObjRef) -> &Chunk {
    &self
      .arena
      .get(function_ref)
      .as_function()
      .expect("a CallFrame always points to a Function object")
      .chunk
  }

  fn read_byte(&mut self) -> u8 {
    let frame = self.frames.last_mut().expect("run() never executes with an empty frame stack");
    let byte = self.arena.get(frame.function).as_function().expect("CallFrame always names a Function").chunk.get_byte(frame.ip);
    frame.ip += 1;
    byte
  }

  fn read_short(&mut self) -> u16 {
    let frame = self.frames.last_mut().expect("run() never executes with an empty frame stack");
    let short = self.arena.get(frame.function).as_function().expect("CallFrame always names a Function").chunk.get_short(frame.ip);
    frame.ip += 2;
    short
  }

  fn read_const(&mut self, idx: u8) -> Value {
    let frame = self.frames.last().expect("run() never executes with an empty frame stack");
    self.function_chunk(frame.function).constants[idx as usize]
  }

  fn current_line(&self, instruction_offset: usize) -> usize {
    let frame = self.frames.last().expect("run() never executes with an empty frame stack");
    self.function_chunk(frame.function).line_at(instruction_offset)
  }

  /// Resets the value and frame stacks on a runtime fault. The VM
  /// itself is not poisoned by this — only its frame stack and value
  /// stack are reset, so subsequent calls are independent.
  fn runtime_error(&mut self, message: String, instruction_offset: usize) -> InterpretResult {
    let line = self.current_line(instruction_offset);
    let formatted = format!("[line {}] {}", line, message);
    (self.config.runtime_diag_sink)(&formatted);
    self.stack.clear();
    self.frames.clear();
    InterpretResult::RuntimeError
  }

  /// The fetch/decode/execute loop. Single-threaded, no suspension
  /// points.
  fn run(&mut self) -> InterpretResult {
    loop {
      let instruction_offset = self.frames.last().expect("the script frame is always present while running").ip;
      let byte = self.read_byte();
      let op = match OpCode::try_from(byte) {
        Ok(op) => op,
        Err(()) => return self.runtime_error(format!("invalid opcode byte {}", byte), instruction_offset),
      };

      match op {
        OpCode::Const => {
          let idx = self.read_byte();
          let value = self.read_const(idx);
          self.stack.push(value);
        }
        OpCode::Nil => self.stack.push(Value::Nil),
        OpCode::True => self.stack.push(Value::Bool(true)),
        OpCode::False => self.stack.push(Value::Bool(false)),
        OpCode::Pop => {
          self.stack.pop();
        }
        OpCode::Dup => {
          let top = *self.stack.last().expect("DUP requires a value on the stack");
          self.stack.push(top);
        }
        OpCode::Block => {
          let count = self.read_short() as usize;
          let top = self.stack.pop().expect("BLOCK requires its result value on the stack");
          let new_len = self.stack.len() - count;
          self.stack.truncate(new_len);
          self.stack.push(top);
        }
        OpCode::DefGlobal => {
          let idx = self.read_byte();
          let name_ref = self.global_name_ref(idx);
          let value = *self.stack.last().expect("DEF_GLOB requires its initializer value on the stack");
          self.globals.insert(name_ref, value);
        }
        OpCode::GetGlobal => {
          let idx = self.read_byte();
          let name_ref = self.global_name_ref(idx);
          match self.globals.get(&name_ref).copied() {
            Some(value) => self.stack.push(value),
            None => {
              let name = self.global_name_text(name_ref);
              return self.runtime_error(format!("undefined variable '{}'", name), instruction_offset);
            }
          }
        }
        OpCode::SetGlobal => {
          let idx = self.read_byte();
          let name_ref = self.global_name_ref(idx);
          if !self.globals.contains_key(&name_ref) {
            let name = self.global_name_text(name_ref);
            return self.runtime_error(format!("undefined variable '{}'", name), instruction_offset);
          }
          let value = *self.stack.last().expect("SET_GLOB requires the assigned value on the stack");
          self.globals.insert(name_ref, value);
        }
        OpCode::GetLocal => {
          let slot = self.read_byte() as usize;
          let base = self.frames.last().expect("frame always present").base;
          self.stack.push(self.stack[base + slot]);
        }
        OpCode::SetLocal => {
          let slot = self.read_byte() as usize;
          let base = self.frames.last().expect("frame always present").base;
          let value = *self.stack.last().expect("SET_LOCAL requires the assigned value on the stack");
          self.stack[base + slot] = value;
        }
        OpCode::Neg => {
          let value = *self.stack.last().expect("NEG requires its operand on the stack");
          match neg(value, &self.arena) {
            Ok(result) => *self.stack.last_mut().unwrap() = result,
            Err(arithmetic::ArithError::TypeMismatch(msg)) => return self.runtime_error(msg, instruction_offset),
          }
        }
        OpCode::Not => {
          let value = *self.stack.last().expect("NOT requires its operand on the stack");
          *self.stack.last_mut().unwrap() = Value::Bool(value.is_falsey());
        }
        OpCode::Add => {
          let b = self.stack.pop().expect("ADD requires two operands");
          let a = self.stack.pop().expect("ADD requires two operands");
          match add(a, b, &mut self.arena, &mut self.intern) {
            Ok(result) => self.stack.push(result),
            Err(arithmetic::ArithError::TypeMismatch(msg)) => return self.runtime_error(msg, instruction_offset),
          }
        }
        OpCode::Sub => {
          let b = self.stack.pop().expect("SUB requires two operands");
          let a = self.stack.pop().expect("SUB requires two operands");
          match sub(a, b, &self.arena) {
            Ok(result) => self.stack.push(result),
            Err(arithmetic::ArithError::TypeMismatch(msg)) => return self.runtime_error(msg, instruction_offset),
          }
        }
        OpCode::Mul => {
          let b = self.stack.pop().expect("MUL requires two operands");
          let a = self.stack.pop().expect("MUL requires two operands");
          match mul(a, b, &self.arena) {
            Ok(result) => self.stack.push(result),
            Err(arithmetic::ArithError::TypeMismatch(msg)) => return self.runtime_error(msg, instruction_offset),
          }
        }
        OpCode::Div => {
          let b = self.stack.pop().expect("DIV requires two operands");
          let a = self.stack.pop().expect("DIV requires two operands");
          match div(a, b, &self.arena) {
            Ok(result) => self.stack.push(result),
            Err(arithmetic::ArithError::TypeMismatch(msg)) => return self.runtime_error(msg, instruction_offset),
          }
        }
        OpCode::Lt | OpCode::Gt | OpCode::LtEq | OpCode::GtEq => {
          let cmp_op = match op {
            OpCode::Lt => CompareOp::Lt,
            OpCode::Gt => CompareOp::Gt,
            OpCode::LtEq => CompareOp::LtEq,
            OpCode::GtEq => CompareOp::GtEq,
            _ => unreachable!(),
          };
          let b = self.stack.pop().expect("comparison requires two operands");
          let a = self.stack.pop().expect("comparison requires two operands");
          match compare(a, b, cmp_op, &self.arena) {
            Ok(result) => self.stack.push(Value::Bool(result)),
            Err(arithmetic::ArithError::TypeMismatch(msg)) => return self.runtime_error(msg, instruction_offset),
          }
        }
        OpCode::Eq => {
          let b = self.stack.pop().expect("EQ requires two operands");
          let a = self.stack.pop().expect("EQ requires two operands");
          self.stack.push(Value::Bool(values_equal(a, b)));
        }
        OpCode::Jmp => {
          let offset = self.read_short();
          self.frames.last_mut().unwrap().ip += offset as usize;
        }
        OpCode::JmpFalse => {
          let offset = self.read_short();
          let condition = *self.stack.last().expect("JMP_FALSE requires the condition on the stack");
          if condition.is_falsey() {
            self.frames.last_mut().unwrap().ip += offset as usize;
          }
        }
        OpCode::Loop => {
          let offset = self.read_short();
          self.frames.last_mut().unwrap().ip -= offset as usize;
        }
        // A compiled function never actually executes an ENDLOOP: the
        // compiler always rewrites every sentinel to a concrete JMP
        // before compilation finishes. This arm exists only as a
        // defensive fallback with identical semantics to JMP.
        OpCode::EndLoop => {
          let offset = self.read_short();
          self.frames.last_mut().unwrap().ip += offset as usize;
        }
        OpCode::Call => {
          let argc = self.read_byte() as usize;
          if let Some(result) = self.call_value(argc, instruction_offset) {
            return result;
          }
        }
        OpCode::Return => {
          let result = self.stack.pop().expect("RETURN requires its value on the stack");
          let frame = self.frames.pop().expect("RETURN requires an active frame");
          self.stack.truncate(frame.base);
          self.stack.push(result);
          if self.frames.is_empty() {
            return InterpretResult::Ok;
          }
        }
        OpCode::Print => {
          let value = *self.stack.last().expect("PRINT requires its operand on the stack");
          let text = stringify(value, &self.arena);
          (self.config.print_sink)(&text);
        }
      }
    }
  }

  fn global_name_ref(&mut self, const_idx: u8) -> ObjRef {
    match self.read_const(const_idx) {
      Value::Obj(r) => r,
      _ => unreachable!("DEF_GLOB/GET_GLOB/SET_GLOB's operand always names an interned string constant"),
    }
  }

  fn global_name_text(&self, name_ref: ObjRef) -> String {
    self.arena.get(name_ref).as_str().expect("global names are always strings").bytes.clone()
  }

  /// `CALL argc`: dispatches on the callable sitting below its
  /// argument region. Returns `Some(result)` when execution should stop
  /// immediately (a runtime error); `None` to keep running.
  fn call_value(&mut self, argc: usize, instruction_offset: usize) -> Option<InterpretResult> {
    let callee_idx = self.stack.len() - 1 - argc;
    let callee = self.stack[callee_idx];
    let callee_ref = match callee {
      Value::Obj(r) => r,
      _ => {
        let kind = warp_objects::kind_name(&callee, &self.arena);
        return Some(self.runtime_error(format!("can't call a value of type '{}'", kind), instruction_offset));
      }
    };

    // Resolved eagerly, in its own statement, so the immutable borrow of
    // `self.arena` this requires ends before the frame/stack mutation
    // below — `self.frames.push`/`self.stack.drain` need `&mut self`.
    let callable = match self.arena.get(callee_ref) {
      HeapObject::Function(f) => Callable::Function(f.arity),
      HeapObject::Native(n) => Callable::Native(n.arity, n.body),
      _ => Callable::NotCallable(warp_objects::kind_name(&callee, &self.arena)),
    };

    match callable {
      Callable::Function(arity) => {
        if arity as usize != argc {
          return Some(self.runtime_error(format!("expected {} argument(s) but got {}", arity, argc), instruction_offset));
        }
        if self.frames.len() >= MAX_FRAMES {
          return Some(self.runtime_error("stack overflow".to_string(), instruction_offset));
        }
        self.frames.push(CallFrame {
          function: callee_ref,
          ip: 0,
          base: callee_idx,
        });
        None
      }
      Callable::Native(arity, body) => {
        if arity as usize != argc {
          return Some(self.runtime_error(format!("expected {} argument(s) but got {}", arity, argc), instruction_offset));
        }
        // The region `stack[callee_idx+1..]` holds the arguments;
        // `body` reads them and writes its result into `slots[0]`.
        // Drained into an owned `Vec` first since a native needs
        // `&mut self` (for `NativeContext`) and `&mut [Value]`
        // simultaneously, which can't both borrow `self.stack`.
        let mut slots: Vec<Value> = self.stack.drain(callee_idx + 1..).collect();
        if slots.is_empty() {
          slots.push(Value::Nil);
        }
        body(self, &mut slots);
        let result = slots[0];
        self.stack.truncate(callee_idx);
        self.stack.push(result);
        None
      }
      Callable::NotCallable(kind) => Some(self.runtime_error(format!("can't call a value of type '{}'", kind), instruction_offset)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::rc::Rc;

  /// Captures every sink `VmConfig` exposes — compile diagnostics,
  /// runtime diagnostics, and `PRINT` output — so a test can assert on
  /// the printed text itself, not just the final `InterpretResult`.
  fn vm_with_capture() -> (Vm, Rc<RefCell<Vec<String>>>, Rc<RefCell<Vec<String>>>, Rc<RefCell<Vec<String>>>) {
    let compile_errors = Rc::new(RefCell::new(Vec::new()));
    let runtime_errors = Rc::new(RefCell::new(Vec::new()));
    let printed = Rc::new(RefCell::new(Vec::new()));
    let compile_errors_clone = compile_errors.clone();
    let runtime_errors_clone = runtime_errors.clone();
    let printed_clone = printed.clone();
    let config = VmConfig {
      compile_diag_sink: Box::new(move |diag| compile_errors_clone.borrow_mut().push(diag.message.clone())),
      runtime_diag_sink: Box::new(move |msg| runtime_errors_clone.borrow_mut().push(msg.to_string())),
      print_sink: Box::new(move |text| printed_clone.borrow_mut().push(text.to_string())),
    };
    (Vm::new(config), compile_errors, runtime_errors, printed)
  }

  #[test]
  fn arithmetic_and_precedence() {
    let (mut vm, _, _, printed) = vm_with_capture();
    let result = vm.interpret("<test>", "print 1 + 2 * 3");
    assert!(result.is_ok());
    assert_eq!(printed.borrow()[0], "7");
  }

  #[test]
  fn string_concatenation() {
    let (mut vm, _, _, printed) = vm_with_capture();
    let result = vm.interpret("<test>", r#"print "hello" + " " + "world""#);
    assert!(result.is_ok());
    assert_eq!(printed.borrow()[0], "hello world");
  }

  #[test]
  fn locals_and_blocks() {
    let (mut vm, _, _, printed) = vm_with_capture();
    let result = vm.interpret("<test>", "var a = 1; var b = { var c = 2; a + c }; print b");
    assert!(result.is_ok());
    assert_eq!(printed.borrow()[0], "3");
  }

  #[test]
  fn control_flow_as_expression() {
    let (mut vm, _, _, printed) = vm_with_capture();
    let result = vm.interpret("<test>", "var x = if true then 10 else 20 end; print x");
    assert!(result.is_ok());
    assert_eq!(printed.borrow()[0], "10");
  }

  #[test]
  fn while_and_break() {
    let (mut vm, _, _, printed) = vm_with_capture();
    let result = vm.interpret("<test>", "var i = 0; var r = while i < 5 { if i == 3 { break i * 10 }; i = i + 1 }; print r");
    assert!(result.is_ok());
    assert_eq!(printed.borrow()[0], "30");
  }

  #[test]
  fn function_call() {
    let (mut vm, _, _, printed) = vm_with_capture();
    let result = vm.interpret("<test>", "fun add = (a, b) { a + b }; print add(2, 40)");
    assert!(result.is_ok());
    assert_eq!(printed.borrow()[0], "42");
  }

  #[test]
  fn undefined_global_is_a_runtime_error() {
    let (mut vm, _, runtime_errors, _) = vm_with_capture();
    let result = vm.interpret("<test>", "print undefined_name");
    assert_eq!(result, InterpretResult::RuntimeError);
    assert!(runtime_errors.borrow()[0].contains("undefined_name"));
  }

  #[test]
  fn arity_mismatch_is_a_runtime_error() {
    let (mut vm, _, runtime_errors, _) = vm_with_capture();
    let result = vm.interpret("<test>", "fun f = (a) { a }; f(1, 2)");
    assert_eq!(result, InterpretResult::RuntimeError);
    assert!(runtime_errors.borrow()[0].contains("argument"));
  }

  #[test]
  fn vm_remains_usable_after_a_runtime_error() {
    let (mut vm, _, _, printed) = vm_with_capture();
    assert_eq!(vm.interpret("<test>", "print undefined_name"), InterpretResult::RuntimeError);
    assert_eq!(vm.interpret("<test>", "print 1 + 1"), InterpretResult::Ok);
    assert_eq!(printed.borrow()[0], "2");
  }

  #[test]
  fn globals_persist_across_interpret_calls_like_a_repl() {
    let (mut vm, _, _, printed) = vm_with_capture();
    assert!(vm.interpret("<test>", "var counter = 1;").is_ok());
    assert!(vm.interpret("<test>", "counter = counter + 1; print counter").is_ok());
    assert_eq!(printed.borrow()[0], "2");
  }

  #[test]
  fn register_native_is_callable() {
    fn double(_ctx: &mut dyn NativeContext, slots: &mut [Value]) {
      if let Value::Number(n) = slots[0] {
        slots[0] = Value::Number(n * 2.0);
      }
    }
    let (mut vm, _, _, printed) = vm_with_capture();
    vm.register_native("double", 1, double);
    let result = vm.interpret("<test>", "print double(21)");
    assert!(result.is_ok());
    assert_eq!(printed.borrow()[0], "42");
  }
}
