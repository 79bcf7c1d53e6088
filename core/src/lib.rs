//! Shared types for the warp language pipeline: the tagged `Value`, the
//! heap-object kind tag, the bytecode `OpCode` set, the per-function
//! `Chunk`, the lexer's `Token`/`TokenKind`, and diagnostic types.
//! Everything here is inert data with no VM or compiler logic attached,
//! matching the teacher's own `Core` crate boundary.

pub mod chunk;
pub mod diagnostics;
pub mod interp_result;
pub mod object;
pub mod opcode;
pub mod token;
pub mod value;

pub use chunk::Chunk;
pub use diagnostics::{DiagLevel, Diagnostic};
pub use interp_result::InterpretResult;
pub use object::{ObjRef, ObjectKind};
pub use opcode::OpCode;
pub use token::{keyword_or_identifier, Literal, Token, TokenKind};
pub use value::Value;
