use warp_core::token::{Literal, Token, TokenKind};

use crate::Lexer;

impl<'a> Lexer<'a> {
  /// Scans a number literal: one or more ASCII digits, optionally
  /// followed by `.` and more digits. The literal value is the
  /// parsed double.
  pub(crate) fn number(&mut self) -> Token {
    while self.peek().is_ascii_digit() {
      self.current += 1;
    }

    if self.peek() == '.' && self.peek_next().is_ascii_digit() {
      self.current += 1;
      while self.peek().is_ascii_digit() {
        self.current += 1;
      }
    }

    let lexeme = self.lexeme();
    let value: f64 = lexeme.parse().expect("lexer only scans well-formed digit runs");
    self.make_token_with_literal(TokenKind::Number, Literal::Number(value))
  }
}
