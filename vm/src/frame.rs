use warp_core::object::ObjRef;

/// `{function, instruction-pointer, base-slot-pointer}`. Only one
/// callee kind exists here — a plain `Function` — unlike the teacher's
/// own `CallFrameType::{Closure, Function, Method}` (`src/virtual_machine/call_frame.rs`),
/// since closures and methods aren't part of this language.
pub struct CallFrame {
  pub function: ObjRef,
  pub ip: usize,
  pub base: usize,
}
