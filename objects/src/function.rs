use warp_core::chunk::Chunk;
use warp_core::value::Value;

use crate::arena::ObjectArena;
use crate::string_intern::StringIntern;

/// What a native function needs from its host VM: the object arena (to
/// allocate new heap values) and the string-intern table (to produce
/// interned strings). A trait, not a concrete `Vm` type, since `warp_vm`
/// depends on `warp_objects` and a native's signature living here can't
/// name the VM type without a dependency cycle — grounded on the
/// teacher's own `Objects/src/native_func_obj.rs`, whose native bodies
/// take `&mut GarbageCollector` (the teacher's own object store type,
/// not its `VM`) for exactly the same reason.
pub trait NativeContext {
  fn arena_mut(&mut self) -> &mut ObjectArena;
  fn intern_mut(&mut self) -> &mut StringIntern;
}

/// A user-defined function: optional name, fixed arity, owned chunk.
#[derive(Debug)]
pub struct FunctionObject {
  pub name: Option<String>,
  pub arity: u8,
  pub chunk: Chunk,
}

impl FunctionObject {
  pub fn new(name: Option<String>, arity: u8) -> Self {
    FunctionObject {
      name,
      arity,
      chunk: Chunk::new(),
    }
  }

  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or("<script>")
  }
}

/// A host-registered native function: name, arity, and a function
/// pointer reading its arguments from and writing its result into
/// `slots[0]`, the way `vm_register_native` wires it up.
pub struct NativeObject {
  pub name: String,
  pub arity: u8,
  pub body: fn(&mut dyn NativeContext, &mut [Value]),
}

impl std::fmt::Debug for NativeObject {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NativeObject").field("name", &self.name).field("arity", &self.arity).finish()
  }
}
