use warp_core::value::Value;

use crate::arena::ObjectArena;

const MAP_MAX_LOAD: f64 = 0.75;
const MIN_CAPACITY: usize = 8;

#[derive(Clone, Copy)]
struct Entry {
  key: Value,
  value: Value,
}

/// An open-addressed hash table with tombstones. Directly
/// grounded, slot shape and all, on
/// `original_source/.../types/map.c`: `find_entry`'s linear probe with
/// tombstone reuse, `map_adjust_cap`'s grow-and-rehash, and the
/// tombstone convention (`key = nil, value = true`) distinguishing a
/// deleted slot from a never-used one (`key = nil, value = nil`).
///
/// `load` (live entries + tombstones) is tracked separately from
/// `count` (live entries only) because the 0.75 growth trigger fires
/// on `load`: without that distinction, repeated insert/delete cycles
/// would degrade probe length without the table ever growing to
/// compensate.
pub struct MapObject {
  entries: Vec<Entry>,
  capacity: usize,
  count: usize,
  load: usize,
}

impl Default for MapObject {
  fn default() -> Self {
    MapObject {
      entries: Vec::new(),
      capacity: 0,
      count: 0,
      load: 0,
    }
  }
}

/// Keys are numbers, booleans, or strings — an `Obj` key is only
/// valid when it resolves to a `String` object, not a `Map`/`Function`/
/// `Native`, since `hash_key` below can only hash strings among the
/// object kinds.
fn is_valid_key(key: &Value, arena: &ObjectArena) -> bool {
  match key {
    Value::Number(_) | Value::Bool(_) => true,
    Value::Obj(r) => arena.get(*r).as_str().is_some(),
    Value::Nil => false,
  }
}

/// Thomas Wang's integer hash mixer, as used by `map.c`'s `hash_bits`
/// (itself citing Wren's `hashBits`, which cites v8's
/// `ComputeLongHash`).
fn hash_bits(hash: u64) -> u32 {
  let mut hash = hash;
  hash = (!hash).wrapping_add(hash << 18);
  hash ^= hash >> 31;
  hash = hash.wrapping_mul(21);
  hash ^= hash >> 11;
  hash = hash.wrapping_add(hash << 6);
  hash ^= hash >> 22;
  (hash & 0x3fff_ffff) as u32
}

fn hash_num(num: f64) -> u32 {
  hash_bits(num.to_bits())
}

/// Hashes a map key. String keys reuse their own FNV-1a hash directly
/// (matching `map.c`'s `hash()`, which returns `WARP_AS_STR(key)->hash`
/// verbatim rather than re-mixing it).
fn hash_key(key: &Value, arena: &ObjectArena) -> u32 {
  match key {
    Value::Number(n) => hash_num(*n),
    Value::Bool(b) => hash_bits(*b as u64),
    Value::Obj(r) => arena.get(*r).as_str().expect("map keys are number, bool, or string").hash,
    Value::Nil => unreachable!("nil is not a valid map key"),
  }
}

fn values_equal(a: &Value, b: &Value, arena: &ObjectArena) -> bool {
  match (a, b) {
    (Value::Obj(ra), Value::Obj(rb)) => match (arena.get(*ra).as_str(), arena.get(*rb).as_str()) {
      (Some(sa), Some(sb)) => sa.bytes == sb.bytes,
      _ => ra == rb,
    },
    _ => a == b,
  }
}

impl MapObject {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn count(&self) -> usize {
    self.count
  }

  fn find_entry(entries: &[Entry], capacity: usize, key: &Value, arena: &ObjectArena) -> usize {
    let mut idx = hash_key(key, arena) as usize % capacity;
    let mut tombstone: Option<usize> = None;
    loop {
      let entry = &entries[idx];
      match entry.key {
        Value::Nil => {
          if matches!(entry.value, Value::Nil) {
            return tombstone.unwrap_or(idx);
          } else if tombstone.is_none() {
            tombstone = Some(idx);
          }
        }
        _ if values_equal(&entry.key, key, arena) => return idx,
        _ => {}
      }
      idx = (idx + 1) % capacity;
    }
  }

  fn adjust_capacity(&mut self, new_capacity: usize, arena: &ObjectArena) {
    let mut entries = vec![
      Entry {
        key: Value::Nil,
        value: Value::Nil,
      };
      new_capacity
    ];

    for entry in self.entries.iter().filter(|e| !matches!(e.key, Value::Nil)) {
      let idx = Self::find_entry(&entries, new_capacity, &entry.key, arena);
      entries[idx] = *entry;
    }

    self.entries = entries;
    self.load = self.count;
    self.capacity = new_capacity;
  }

  /// Sets `key` to `value`, returning `true` if `key` already had an
  /// entry. Returns `false` without touching the table if `key` is an
  /// object that isn't a string (a `Map`, `Function`, or `Native`
  /// reference), since those have no defined hash.
  pub fn set(&mut self, key: Value, value: Value, arena: &ObjectArena) -> bool {
    if !is_valid_key(&key, arena) {
      return false;
    }

    if (self.load + 1) as f64 > self.capacity as f64 * MAP_MAX_LOAD {
      let new_capacity = if self.capacity == 0 { MIN_CAPACITY } else { self.capacity * 2 };
      self.adjust_capacity(new_capacity, arena);
    }

    let idx = Self::find_entry(&self.entries, self.capacity, &key, arena);
    let existing = !matches!(self.entries[idx].key, Value::Nil);
    if !existing {
      self.count += 1;
      self.load += 1;
    }
    self.entries[idx] = Entry { key, value };
    existing
  }

  /// Gets the value for `key`, or `None` if absent. Also `None` if
  /// `key` isn't a valid key, since no entry could ever have been
  /// stored under it.
  pub fn get(&self, key: &Value, arena: &ObjectArena) -> Option<Value> {
    if self.count == 0 || !is_valid_key(key, arena) {
      return None;
    }
    let idx = Self::find_entry(&self.entries, self.capacity, key, arena);
    match self.entries[idx].key {
      Value::Nil => None,
      _ => Some(self.entries[idx].value),
    }
  }

  /// Deletes `key`, leaving a tombstone (`key = nil, value = true`) in
  /// its slot so later probes still skip over it. Returns `false` for
  /// an absent or invalid key without touching the table.
  pub fn delete(&mut self, key: &Value, arena: &ObjectArena) -> bool {
    if self.count == 0 || !is_valid_key(key, arena) {
      return false;
    }
    let idx = Self::find_entry(&self.entries, self.capacity, key, arena);
    if matches!(self.entries[idx].key, Value::Nil) {
      return false;
    }
    self.entries[idx] = Entry {
      key: Value::Nil,
      value: Value::Bool(true),
    };
    self.count -= 1;
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn set_then_get_round_trips() {
    let arena = ObjectArena::new();
    let mut map = MapObject::new();
    map.set(Value::Number(1.0), Value::Number(42.0), &arena);
    assert_eq!(map.get(&Value::Number(1.0), &arena), Some(Value::Number(42.0)));
  }

  #[test]
  fn delete_then_get_is_absent() {
    let arena = ObjectArena::new();
    let mut map = MapObject::new();
    map.set(Value::Bool(true), Value::Number(1.0), &arena);
    assert!(map.delete(&Value::Bool(true), &arena));
    assert_eq!(map.get(&Value::Bool(true), &arena), None);
  }

  #[test]
  fn overwrite_reports_existing() {
    let arena = ObjectArena::new();
    let mut map = MapObject::new();
    assert!(!map.set(Value::Number(1.0), Value::Number(1.0), &arena));
    assert!(map.set(Value::Number(1.0), Value::Number(2.0), &arena));
    assert_eq!(map.get(&Value::Number(1.0), &arena), Some(Value::Number(2.0)));
  }

  #[test]
  fn grows_past_minimum_capacity() {
    let arena = ObjectArena::new();
    let mut map = MapObject::new();
    for i in 0..20 {
      map.set(Value::Number(i as f64), Value::Number(i as f64), &arena);
    }
    assert!(map.capacity >= 20);
    for i in 0..20 {
      assert_eq!(map.get(&Value::Number(i as f64), &arena), Some(Value::Number(i as f64)));
    }
  }

  #[test]
  fn tombstone_slot_is_reused_on_insert() {
    let arena = ObjectArena::new();
    let mut map = MapObject::new();
    map.set(Value::Number(1.0), Value::Number(1.0), &arena);
    map.delete(&Value::Number(1.0), &arena);
    let count_before = map.count();
    map.set(Value::Number(2.0), Value::Number(2.0), &arena);
    assert_eq!(map.count(), count_before + 1);
  }

  #[test]
  fn non_string_object_key_is_rejected_not_panicked() {
    use crate::arena::HeapObject;

    let mut arena = ObjectArena::new();
    let mut map = MapObject::new();
    let nested = arena.alloc(HeapObject::Map(MapObject::new()));
    let key = Value::Obj(nested);
    assert!(!map.set(key, Value::Number(1.0), &arena));
    assert_eq!(map.get(&key, &arena), None);
    assert!(!map.delete(&key, &arena));
    assert_eq!(map.count(), 0);
  }
}
