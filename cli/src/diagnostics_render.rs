//! Renders a `Diagnostic` as a coloured heading, the offending source
//! line, and a caret-tilde underline of the span. Grounded on
//! `Parser/src/lib.rs::error_at_tok`'s ANSI escape convention
//! (`\x1b[31;1m...\x1b[0m\x1b[1m...\x1b[0m`) and `src/errors.rs`'s
//! practice of slicing the offending line out of the source text by
//! 1-based line number.

use warp_core::diagnostics::{DiagLevel, Diagnostic};

fn heading(level: DiagLevel) -> &'static str {
  match level {
    DiagLevel::Error => "Error",
    DiagLevel::Warn => "Warning",
    DiagLevel::Info => "Info",
  }
}

/// `source` is the full buffer the diagnostic's line/column were
/// computed against; `None` when no source text is available (a
/// runtime diagnostic only carries a formatted message, not a span).
pub fn render(diag: &Diagnostic, source: Option<&str>) -> String {
  let mut out = format!(
    "\x1b[31;1m{}\x1b[0m\x1b[1m at [{}:{}:{}]: {}\x1b[0m",
    heading(diag.level),
    diag.source_filename,
    diag.line,
    diag.column,
    diag.message
  );

  if let Some(source) = source {
    if let Some(line_text) = source.lines().nth(diag.line.saturating_sub(1)) {
      let pad = " ".repeat(diag.column.saturating_sub(1));
      let underline_len = diag.length.max(1);
      let underline = format!("^{}", "~".repeat(underline_len.saturating_sub(1)));
      out.push('\n');
      out.push_str(line_text);
      out.push('\n');
      out.push_str(&pad);
      out.push_str("\x1b[31;1m");
      out.push_str(&underline);
      out.push_str("\x1b[0m");
    }
  }

  out
}

/// A plain runtime message (as passed to `runtime_diag_sink`) has no
/// span to underline, only the `"[line N] message"` text
/// `Vm::runtime_error` already formats.
pub fn render_runtime(message: &str) -> String {
  format!("\x1b[31;1mRuntimeError:\x1b[0m\x1b[1m {}\x1b[0m", message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn underlines_the_named_span() {
    let diag = Diagnostic::new(DiagLevel::Error, "unexpected token", "<test>", 1, 5, 3);
    let rendered = render(&diag, Some("var 123 = 1"));
    assert!(rendered.contains("var 123 = 1"));
    assert!(rendered.contains("^~~"));
  }

  #[test]
  fn runtime_message_has_no_source_span() {
    let rendered = render_runtime("[line 3] undefined variable 'x'");
    assert!(rendered.contains("undefined variable"));
  }
}
