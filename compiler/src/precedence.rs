use warp_core::token::TokenKind;

/// The Pratt precedence ladder: `NONE < ASSIGN < OR < AND < EQ <
/// CMP < TERM < FACTOR < UNARY < CALL < PRIMARY`. Grounded on the
/// teacher's own `Parser` precedence enum, trimmed to this language's
/// operator set (no bitwise/range tiers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
  None,
  Assign,
  Or,
  And,
  Eq,
  Cmp,
  Term,
  Factor,
  Unary,
  Call,
  Primary,
}

impl Precedence {
  /// One tier tighter than `self`, used when compiling a binary
  /// operator's right-hand operand to enforce left-associativity: the
  /// right side always compiles at the operator's own precedence + 1.
  pub fn next(self) -> Precedence {
    use Precedence::*;
    match self {
      None => Assign,
      Assign => Or,
      Or => And,
      And => Eq,
      Eq => Cmp,
      Cmp => Term,
      Term => Factor,
      Factor => Unary,
      Unary => Call,
      Call => Primary,
      Primary => Primary,
    }
  }
}

/// The precedence at which an infix operator binds. `TokenKind`s with
/// no infix meaning return `Precedence::None`, which ends
/// `parse_precedence`'s infix loop.
pub fn infix_precedence(kind: TokenKind) -> Precedence {
  use TokenKind::*;
  match kind {
    // `=` is not dispatched through the infix loop: `identifier()`
    // consumes a following `=` itself once it knows its operand was an
    // lvalue.
    PipePipe => Precedence::Or,
    AmpAmp => Precedence::And,
    EqEq | BangEq => Precedence::Eq,
    Lt | LtEq | Gt | GtEq => Precedence::Cmp,
    Plus | Minus => Precedence::Term,
    // `%` is tokenized but has no defined binary opcode, so it binds no
    // infix.
    Star | Slash => Precedence::Factor,
    LParen => Precedence::Call,
    _ => Precedence::None,
  }
}
