//! `warp`: with no arguments starts a REPL; `warp <path>`
//! runs a single script file. Grounded on `Hinton/src/main.rs`'s
//! args-slice dispatch, replaced with `clap`'s derive parser per the
//! corpus's own CLI convention — the teacher's own dispatch is two
//! `todo!()` stubs, so this crate's shape comes from the rest of the
//! example pack rather than from the teacher directly.

mod diagnostics_render;
mod repl;
mod run_file;

use std::path::PathBuf;
use std::process;

use clap::Parser;

/// A small embeddable, expression-oriented scripting language.
#[derive(Parser)]
#[command(name = "warp", version, about = "A small embeddable, expression-oriented scripting language")]
struct Cli {
  /// Script to run. Omit to start an interactive REPL.
  path: Option<PathBuf>,
}

fn main() {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(err) => {
      err.print().ok();
      let code = match err.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
        _ => 64,
      };
      process::exit(code);
    }
  };

  let exit_code = match cli.path {
    Some(path) => run_file::run_file(&path),
    None => repl::run(),
  };
  process::exit(exit_code);
}
