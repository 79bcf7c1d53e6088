//! The UTF-8 scanner. Produces one `Token` per call to
//! `next_token`, skipping whitespace and line comments along the way.
//! Grounded on the teacher's `Lexer/src/lib.rs` (whitespace/comment
//! skipping, line tracking, `matches`/`advance` cursor shape) and
//! `src/lexer/lex_next_token.rs` (the compound-operator maximal-munch
//! dispatch), trimmed to this language's own grammar and keyword table.

mod lex_numbers;
mod lex_strings;

use warp_core::diagnostics::DiagLevel;
use warp_core::token::{keyword_or_identifier, Literal, Token, TokenKind};

/// A diagnostic raised while scanning, buffered until the compiler
/// drains it and attaches the source filename (the lexer itself has
/// no notion of a filename, matching its role as a pure text scanner).
#[derive(Debug, Clone)]
pub struct LexIssue {
  pub level: DiagLevel,
  pub message: String,
  pub line: usize,
  pub column: usize,
  pub length: usize,
}

/// The scanner. Borrows a `&[char]` slice of the already-decoded
/// source (the teacher's own representation) so column arithmetic
/// stays in `char` units rather than UTF-8 byte units.
pub struct Lexer<'a> {
  source: &'a [char],
  current: usize,
  line: usize,
  line_start: usize,
  token_start: usize,
  /// Whether the next produced token is the first one scanned since a
  /// newline; load-bearing for semicolon elision further up the pipeline.
  at_line_start: bool,
  pub pending: Vec<LexIssue>,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a [char]) -> Self {
    Lexer {
      source,
      current: 0,
      line: 1,
      line_start: 0,
      token_start: 0,
      at_line_start: true,
      pending: Vec::new(),
    }
  }

  pub fn is_at_end(&self) -> bool {
    self.current >= self.source.len()
  }

  fn peek(&self) -> char {
    if self.is_at_end() {
      '\0'
    } else {
      self.source[self.current]
    }
  }

  fn peek_next(&self) -> char {
    if self.current + 1 >= self.source.len() {
      '\0'
    } else {
      self.source[self.current + 1]
    }
  }

  fn previous(&self) -> char {
    self.source[self.current - 1]
  }

  fn advance(&mut self) -> char {
    let c = self.peek();
    self.current += 1;
    c
  }

  fn matches(&mut self, expected: char) -> bool {
    if self.is_at_end() || self.peek() != expected {
      return false;
    }
    self.current += 1;
    true
  }

  fn column(&self) -> usize {
    self.token_start - self.line_start + 1
  }

  fn lexeme(&self) -> String {
    self.source[self.token_start..self.current].iter().collect()
  }

  fn push_issue(&mut self, level: DiagLevel, message: impl Into<String>, column: usize, length: usize) {
    self.pending.push(LexIssue {
      level,
      message: message.into(),
      line: self.line,
      column,
      length,
    });
  }

  fn skip_whitespace_and_comments(&mut self) {
    loop {
      match self.peek() {
        ' ' | '\t' | '\r' => {
          self.current += 1;
        }
        '\n' => {
          self.current += 1;
          self.line += 1;
          self.line_start = self.current;
          self.at_line_start = true;
        }
        '/' if self.peek_next() == '/' => {
          while !self.is_at_end() && self.peek() != '\n' {
            self.current += 1;
          }
        }
        _ => return,
      }
    }
  }

  fn make_token(&mut self, kind: TokenKind) -> Token {
    self.make_token_with_literal(kind, Literal::None)
  }

  fn make_token_with_literal(&mut self, kind: TokenKind, literal: Literal) -> Token {
    let starts_line = self.at_line_start;
    self.at_line_start = false;
    Token {
      kind,
      lexeme: self.lexeme(),
      line: self.line,
      column: self.column(),
      starts_line,
      literal,
    }
  }

  /// Scans and returns the next token, skipping whitespace and
  /// comments first.
  pub fn next_token(&mut self) -> Token {
    self.skip_whitespace_and_comments();
    self.token_start = self.current;

    if self.is_at_end() {
      return self.make_token(TokenKind::Eof);
    }

    let c = self.advance();

    if c.is_alphabetic() || c == '_' {
      return self.identifier();
    }
    if c.is_ascii_digit() {
      return self.number();
    }
    if c == '"' {
      return self.string();
    }

    match c {
      '(' => self.make_token(TokenKind::LParen),
      ')' => self.make_token(TokenKind::RParen),
      '{' => self.make_token(TokenKind::LBrace),
      '}' => self.make_token(TokenKind::RBrace),
      '[' => self.make_token(TokenKind::LBracket),
      ']' => self.make_token(TokenKind::RBracket),
      ';' => self.make_token(TokenKind::Semicolon),
      ':' => self.make_token(TokenKind::Colon),
      ',' => self.make_token(TokenKind::Comma),
      '.' => self.make_token(TokenKind::Dot),
      '^' => self.make_token(TokenKind::Caret),
      '~' => self.make_token(TokenKind::Tilde),
      '%' => self.make_token(TokenKind::Percent),
      '?' => self.make_token(TokenKind::Question),
      '+' => {
        let kind = if self.matches('=') { TokenKind::PlusEq } else { TokenKind::Plus };
        self.make_token(kind)
      }
      '-' => {
        let kind = if self.matches('=') {
          TokenKind::MinusEq
        } else if self.matches('>') {
          TokenKind::Arrow
        } else {
          TokenKind::Minus
        };
        self.make_token(kind)
      }
      '*' => {
        let kind = if self.matches('=') { TokenKind::StarEq } else { TokenKind::Star };
        self.make_token(kind)
      }
      '/' => {
        let kind = if self.matches('=') { TokenKind::SlashEq } else { TokenKind::Slash };
        self.make_token(kind)
      }
      '=' => {
        let kind = if self.matches('=') { TokenKind::EqEq } else { TokenKind::Eq };
        self.make_token(kind)
      }
      '!' => {
        let kind = if self.matches('=') { TokenKind::BangEq } else { TokenKind::Bang };
        self.make_token(kind)
      }
      '<' => {
        let kind = if self.matches('=') { TokenKind::LtEq } else { TokenKind::Lt };
        self.make_token(kind)
      }
      '>' => {
        let kind = if self.matches('=') { TokenKind::GtEq } else { TokenKind::Gt };
        self.make_token(kind)
      }
      '&' if self.matches('&') => self.make_token(TokenKind::AmpAmp),
      '|' if self.matches('|') => self.make_token(TokenKind::PipePipe),

      _ => {
        self.push_issue(DiagLevel::Error, format!("invalid character '{}'", c), self.column(), 1);
        self.make_token(TokenKind::Invalid)
      }
    }
  }

  fn identifier(&mut self) -> Token {
    while self.peek().is_alphanumeric() || self.peek() == '_' {
      self.current += 1;
    }
    let lexeme = self.lexeme();
    let kind = keyword_or_identifier(&lexeme);
    self.make_token(kind)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scan_all(src: &str) -> Vec<TokenKind> {
    let chars: Vec<char> = src.chars().collect();
    let mut lexer = Lexer::new(&chars);
    let mut kinds = Vec::new();
    loop {
      let tok = lexer.next_token();
      let done = matches!(tok.kind, TokenKind::Eof);
      kinds.push(tok.kind);
      if done {
        break;
      }
    }
    kinds
  }

  #[test]
  fn skips_whitespace_and_line_comments() {
    let kinds = scan_all("  // a comment\n  1");
    assert!(matches!(kinds[0], TokenKind::Number));
  }

  #[test]
  fn compound_operators_maximal_munch() {
    let chars: Vec<char> = "+= -> == != <= >= &&".chars().collect();
    let mut lexer = Lexer::new(&chars);
    let kinds: Vec<_> = (0..7).map(|_| lexer.next_token().kind).collect();
    assert_eq!(
      kinds,
      vec![
        TokenKind::PlusEq,
        TokenKind::Arrow,
        TokenKind::EqEq,
        TokenKind::BangEq,
        TokenKind::LtEq,
        TokenKind::GtEq,
        TokenKind::AmpAmp,
      ]
    );
  }

  #[test]
  fn keywords_recognized() {
    for (src, expected) in [("break", TokenKind::Break), ("fun", TokenKind::Fun), ("nil", TokenKind::Nil), ("notakeyword", TokenKind::Identifier)] {
      let chars: Vec<char> = src.chars().collect();
      let mut lexer = Lexer::new(&chars);
      assert!(matches!(lexer.next_token().kind, k if std::mem::discriminant(&k) == std::mem::discriminant(&expected)));
    }
  }

  #[test]
  fn number_literal_value() {
    let chars: Vec<char> = "3.5".chars().collect();
    let mut lexer = Lexer::new(&chars);
    let tok = lexer.next_token();
    match tok.literal {
      Literal::Number(n) => assert_eq!(n, 3.5),
      _ => panic!("expected a number literal"),
    }
  }

  #[test]
  fn string_escapes_are_decoded() {
    let chars: Vec<char> = "\"a\\nb\\tc\"".chars().collect();
    let mut lexer = Lexer::new(&chars);
    let tok = lexer.next_token();
    match tok.literal {
      Literal::String(s) => assert_eq!(s, "a\nb\tc"),
      _ => panic!("expected a string literal"),
    }
  }

  #[test]
  fn unknown_escape_emits_warning_and_is_skipped() {
    let chars: Vec<char> = "\"a\\qb\"".chars().collect();
    let mut lexer = Lexer::new(&chars);
    let tok = lexer.next_token();
    match tok.literal {
      Literal::String(s) => assert_eq!(s, "ab"),
      _ => panic!("expected a string literal"),
    }
    assert_eq!(lexer.pending.len(), 1);
    assert_eq!(lexer.pending[0].level, DiagLevel::Warn);
  }

  #[test]
  fn invalid_character_produces_invalid_token() {
    let chars: Vec<char> = "@".chars().collect();
    let mut lexer = Lexer::new(&chars);
    let tok = lexer.next_token();
    assert!(matches!(tok.kind, TokenKind::Invalid));
    assert_eq!(lexer.pending.len(), 1);
  }

  #[test]
  fn newline_sets_starts_line_flag() {
    let chars: Vec<char> = "a\nb".chars().collect();
    let mut lexer = Lexer::new(&chars);
    let first = lexer.next_token();
    let second = lexer.next_token();
    assert!(first.starts_line);
    assert!(second.starts_line);
  }
}
