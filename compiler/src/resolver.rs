//! Local-variable resolution and declaration: scope-depth bookkeeping
//! plus the identifier-resolution rule used by expression parsing.

use crate::{Compiler, Local, MAX_LOCALS};

impl<'src, 'vm> Compiler<'src, 'vm> {
  /// Declares `name` as a local in the current scope, or does nothing
  /// at global scope (globals are looked up by name at runtime, not
  /// tracked in the locals vector). Redeclaring a name already present
  /// in the same scope is an error.
  pub(crate) fn declare_local(&mut self, name: &str) {
    let scope_depth = self.current_function().scope_depth;
    if scope_depth == 0 {
      return;
    }

    let mut duplicate = false;
    {
      let state = self.current_function();
      for local in state.locals.iter().rev() {
        if local.depth != -1 && local.depth < scope_depth {
          break;
        }
        if local.name == name {
          duplicate = true;
          break;
        }
      }
    }
    if duplicate {
      self.error_at_previous("a variable with this name already exists in this scope");
      return;
    }
    self.add_local(name);
  }

  fn add_local(&mut self, name: &str) {
    if self.current_function().locals.len() >= MAX_LOCALS {
      self.error_at_previous("too many local variables in one function");
      return;
    }
    self.current_function_mut().locals.push(Local {
      name: name.to_string(),
      depth: -1,
    });
  }

  /// Promotes the most recently declared local from "uninitialized"
  /// (`depth == -1`) to the current scope depth. A no-op at global
  /// scope, where there is no locals-vector entry to promote.
  pub(crate) fn mark_initialized(&mut self) {
    let depth = self.current_function().scope_depth;
    if depth == 0 {
      return;
    }
    if let Some(local) = self.current_function_mut().locals.last_mut() {
      local.depth = depth;
    }
  }

  /// Resolves `name` against the current function's locals,
  /// innermost-first. Returns `None` when no local matches (the caller
  /// falls back to treating it as a global). Referencing a local whose
  /// `depth == -1` — a self-reference inside its own initializer — is
  /// an error.
  pub(crate) fn resolve_local(&mut self, name: &str) -> Option<u8> {
    let mut found: Option<(usize, bool)> = None;
    {
      let state = self.current_function();
      for (index, local) in state.locals.iter().enumerate().rev() {
        if local.name == name {
          found = Some((index, local.depth == -1));
          break;
        }
      }
    }
    let (index, uninitialized) = found?;
    if uninitialized {
      self.error_at_previous("can't reference a local variable in its own initializer");
    }
    Some(index as u8)
  }
}
