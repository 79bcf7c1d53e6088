//! `warp <path>`: reads the whole file into memory and calls
//! `interpret` once. Grounded on `Hinton/src/main.rs::read_file_chars`'s
//! `ErrorKind`-to-message mapping, adapted to `String` source text
//! (this language has no `Vec<char>` source representation) and to
//! sysexits-style exit codes the teacher's own `raw_os_error()` fallback
//! already leans on.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use warp_core::diagnostics::Diagnostic;
use warp_core::interp_result::InterpretResult;
use warp_vm::{Vm, VmConfig};

use crate::diagnostics_render::{render, render_runtime};

pub fn run_file(path: &Path) -> i32 {
  let source = match fs::read_to_string(path) {
    Ok(source) => source,
    Err(err) => {
      match err.kind() {
        ErrorKind::NotFound => eprintln!("file '{}' not found.", path.display()),
        ErrorKind::PermissionDenied => eprintln!("need permission to open '{}'.", path.display()),
        _ => eprintln!("unexpected error reading '{}': {}", path.display(), err),
      }
      return 70;
    }
  };

  let filename = path.display().to_string();
  let source_for_sink = source.clone();
  let config = VmConfig {
    compile_diag_sink: Box::new(move |diag: &Diagnostic| eprintln!("{}", render(diag, Some(&source_for_sink)))),
    runtime_diag_sink: Box::new(|msg: &str| eprintln!("{}", render_runtime(msg))),
    print_sink: Box::new(|text: &str| println!("{}", text)),
  };
  let mut vm = Vm::new(config);

  match vm.interpret(&filename, &source) {
    InterpretResult::Ok => 0,
    InterpretResult::CompileError | InterpretResult::RuntimeError => 1,
  }
}
