use warp_core::diagnostics::DiagLevel;
use warp_core::token::{Literal, Token, TokenKind};

use crate::Lexer;

impl<'a> Lexer<'a> {
  /// Scans a string literal. `"` opens and closes it; newlines inside
  /// bump the line counter; backslash escapes `\\ \n \r \t \e \"`
  /// produce the corresponding byte; any other escape emits a warning
  /// and is skipped.
  pub(crate) fn string(&mut self) -> Token {
    let mut value = String::new();

    loop {
      if self.is_at_end() {
        self.push_issue(DiagLevel::Error, "unterminated string", self.column(), self.current - self.token_start);
        return self.make_token_with_literal(TokenKind::Invalid, Literal::None);
      }

      let c = self.advance();
      match c {
        '"' => break,
        '\n' => {
          self.line += 1;
          self.line_start = self.current;
          value.push('\n');
        }
        '\\' => {
          if self.is_at_end() {
            self.push_issue(DiagLevel::Error, "unterminated string", self.column(), self.current - self.token_start);
            return self.make_token_with_literal(TokenKind::Invalid, Literal::None);
          }
          let escaped = self.advance();
          match escaped {
            '\\' => value.push('\\'),
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            'e' => value.push('\x1b'),
            '"' => value.push('"'),
            other => {
              self.push_issue(
                DiagLevel::Warn,
                format!("unknown escape sequence '\\{}'", other),
                self.column(),
                2,
              );
            }
          }
        }
        other => value.push(other),
      }
    }

    self.make_token_with_literal(TokenKind::String, Literal::String(value))
  }
}
