//! The heap-object model: an arena of `HeapObject`s (string, map,
//! function, native), the string-intern table, and the open-addressed
//! `Map`. Kept as its own crate, matching the teacher's `Objects` crate
//! boundary, since both the compiler (which interns literals) and the
//! VM (which allocates at runtime) need it.

pub mod arena;
pub mod function;
pub mod map;
pub mod string_intern;
pub mod string_obj;

pub use arena::{HeapObject, ObjectArena};
pub use function::{FunctionObject, NativeContext, NativeObject};
pub use map::MapObject;
pub use string_intern::StringIntern;
pub use string_obj::StringObject;

use warp_core::value::Value;

/// Textual printing for a value. Scalars print directly; object
/// values need the arena to resolve their concrete kind.
pub fn display(value: &Value, arena: &ObjectArena) -> String {
  match value {
    Value::Nil => "nil".to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => format_number(*n),
    Value::Obj(r) => match arena.get(*r) {
      HeapObject::Str(s) => s.bytes.clone(),
      HeapObject::Map(m) => format!("<map {} entries>", m.count()),
      HeapObject::Function(f) => format!("<fn {}>", f.display_name()),
      HeapObject::Native(n) => format!("<native fn {}>", n.name),
    },
  }
}

fn format_number(n: f64) -> String {
  if n.is_nan() {
    return "nan".to_string();
  }
  if n.is_infinite() {
    return if n > 0.0 { "inf".to_string() } else { "-inf".to_string() };
  }
  if n == n.trunc() && n.abs() < 1e15 {
    format!("{}", n as i64)
  } else {
    format!("{}", n)
  }
}

/// The name used in diagnostics; resolves object values to their
/// concrete heap kind rather than the generic `Value::type_name`.
pub fn kind_name(value: &Value, arena: &ObjectArena) -> &'static str {
  match value {
    Value::Obj(r) => match arena.get(*r) {
      HeapObject::Str(_) => "string",
      HeapObject::Map(_) => "map",
      HeapObject::Function(_) => "function",
      HeapObject::Native(_) => "native function",
    },
    other => other.type_name(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn integral_numbers_print_without_decimal() {
    assert_eq!(format_number(42.0), "42");
  }

  #[test]
  fn fractional_numbers_print_with_decimal() {
    assert_eq!(format_number(1.5), "1.5");
  }

  #[test]
  fn strings_print_their_bytes() {
    let mut arena = ObjectArena::new();
    let mut intern = StringIntern::new();
    let r = intern.make_string(&mut arena, "hi".to_string());
    assert_eq!(display(&Value::Obj(r), &arena), "hi");
  }
}
