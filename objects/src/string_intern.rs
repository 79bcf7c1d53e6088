use hashbrown::HashMap;
use warp_core::object::ObjRef;

use crate::arena::{HeapObject, ObjectArena};
use crate::string_obj::{fnv1a, StringObject};

/// The VM-owned string-intern table: every string the VM produces goes
/// through here first, so two equal strings always end up sharing one
/// heap slot. Keyed by `(length, hash, bytes)` so a
/// lookup only ever compares full byte content against candidates that
/// already agree on length and hash — grounded on
/// `original_source/.../table.c`/`map.c`'s `warp_map_find_str`, which
/// does the same length/hash/`memcmp` triple check before an actual
/// byte comparison.
#[derive(Default)]
pub struct StringIntern {
  table: HashMap<(usize, u32, String), ObjRef>,
}

impl StringIntern {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the interned string object for `bytes`, allocating and
  /// registering a new one in `arena` only if no equal string is
  /// already interned with the same (length, hash, bytes) tuple.
  pub fn make_string(&mut self, arena: &mut ObjectArena, bytes: String) -> ObjRef {
    let hash = fnv1a(bytes.as_bytes());
    let key = (bytes.len(), hash, bytes);
    if let Some(&existing) = self.table.get(&key) {
      return existing;
    }
    let bytes = key.2.clone();
    let obj = StringObject::new(bytes);
    let obj_ref = arena.alloc(HeapObject::Str(obj));
    self.table.insert(key, obj_ref);
    obj_ref
  }

  /// Concatenation always returns the interned result.
  pub fn concat(&mut self, arena: &mut ObjectArena, a: &str, b: &str) -> ObjRef {
    let mut joined = String::with_capacity(a.len() + b.len());
    joined.push_str(a);
    joined.push_str(b);
    self.make_string(arena, joined)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn equal_content_interns_to_the_same_object() {
    let mut arena = ObjectArena::new();
    let mut intern = StringIntern::new();
    let a = intern.make_string(&mut arena, "hello".to_string());
    let b = intern.make_string(&mut arena, "hello".to_string());
    assert_eq!(a, b);
    assert_eq!(arena.len(), 1);
  }

  #[test]
  fn different_content_interns_separately() {
    let mut arena = ObjectArena::new();
    let mut intern = StringIntern::new();
    let a = intern.make_string(&mut arena, "hello".to_string());
    let b = intern.make_string(&mut arena, "world".to_string());
    assert_ne!(a, b);
    assert_eq!(arena.len(), 2);
  }

  #[test]
  fn concat_is_interned() {
    let mut arena = ObjectArena::new();
    let mut intern = StringIntern::new();
    let a = intern.concat(&mut arena, "hello ", "world");
    let b = intern.make_string(&mut arena, "hello world".to_string());
    assert_eq!(a, b);
  }
}
