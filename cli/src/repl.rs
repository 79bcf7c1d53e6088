//! The interactive REPL: prompt, read a line, call interpret, loop.
//! One `Vm` is created for the whole session so its globals map
//! persists across lines. History is read from and written to
//! `$HOME/.warp_history`, falling back to `./.warp_history` when `HOME`
//! is unset, using `rustyline` the way the corpus's own line-edited
//! REPLs do.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use warp_core::diagnostics::Diagnostic;
use warp_vm::{Vm, VmConfig};

use crate::diagnostics_render::{render, render_runtime};

const PROMPT: &str = ">> ";

fn history_path() -> PathBuf {
  match std::env::var("HOME") {
    Ok(home) if !home.is_empty() => PathBuf::from(home).join(".warp_history"),
    _ => PathBuf::from(".warp_history"),
  }
}

pub fn run() -> i32 {
  let mut editor = match DefaultEditor::new() {
    Ok(editor) => editor,
    Err(err) => {
      eprintln!("failed to start the line editor: {}", err);
      return 70;
    }
  };

  let history_path = history_path();
  let _ = editor.load_history(&history_path);

  // Shared with the diagnostic sinks so a compile error can still
  // underline the line that produced it, without threading the current
  // line through `VmConfig` itself.
  let current_line = Rc::new(RefCell::new(String::new()));
  let current_line_for_sink = current_line.clone();

  let config = VmConfig {
    compile_diag_sink: Box::new(move |diag: &Diagnostic| eprintln!("{}", render(diag, Some(&current_line_for_sink.borrow())))),
    runtime_diag_sink: Box::new(|msg: &str| eprintln!("{}", render_runtime(msg))),
    print_sink: Box::new(|text: &str| println!("{}", text)),
  };
  let mut vm = Vm::new(config);

  loop {
    match editor.readline(PROMPT) {
      Ok(line) => {
        if line.trim().is_empty() {
          continue;
        }
        let _ = editor.add_history_entry(line.as_str());
        *current_line.borrow_mut() = line.clone();
        vm.interpret("<repl>", &line);
      }
      Err(ReadlineError::Interrupted) => continue,
      Err(ReadlineError::Eof) => break,
      Err(err) => {
        eprintln!("readline error: {}", err);
        break;
      }
    }
  }

  let _ = editor.save_history(&history_path);
  0
}
