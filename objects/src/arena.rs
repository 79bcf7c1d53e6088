use warp_core::object::ObjRef;

use crate::function::{FunctionObject, NativeObject};
use crate::map::MapObject;
use crate::string_obj::StringObject;

/// The four heap-object kinds: string, map, function, native.
pub enum HeapObject {
  Str(StringObject),
  Map(MapObject),
  Function(FunctionObject),
  Native(NativeObject),
}

impl HeapObject {
  pub fn as_str(&self) -> Option<&StringObject> {
    match self {
      HeapObject::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&MapObject> {
    match self {
      HeapObject::Map(m) => Some(m),
      _ => None,
    }
  }

  pub fn as_map_mut(&mut self) -> Option<&mut MapObject> {
    match self {
      HeapObject::Map(m) => Some(m),
      _ => None,
    }
  }

  pub fn as_function(&self) -> Option<&FunctionObject> {
    match self {
      HeapObject::Function(f) => Some(f),
      _ => None,
    }
  }

  pub fn as_native(&self) -> Option<&NativeObject> {
    match self {
      HeapObject::Native(n) => Some(n),
      _ => None,
    }
  }
}

/// The VM-owned object store. Every heap object is registered here at
/// construction and lives until the arena itself is dropped (at VM
/// teardown) — the safe-Rust restatement of the source language's
/// intrusive "all objects" list, grounded on the teacher's own
/// `Objects/src/gc.rs` `GarbageCollector`. Since garbage collection is
/// out of scope here, the arena never frees individual slots; it only
/// grows.
#[derive(Default)]
pub struct ObjectArena {
  objects: Vec<HeapObject>,
}

impl ObjectArena {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn alloc(&mut self, obj: HeapObject) -> ObjRef {
    self.objects.push(obj);
    ObjRef(self.objects.len() - 1)
  }

  pub fn get(&self, r: ObjRef) -> &HeapObject {
    &self.objects[r.0]
  }

  pub fn get_mut(&mut self, r: ObjRef) -> &mut HeapObject {
    &mut self.objects[r.0]
  }

  pub fn len(&self) -> usize {
    self.objects.len()
  }

  pub fn is_empty(&self) -> bool {
    self.objects.is_empty()
  }
}
