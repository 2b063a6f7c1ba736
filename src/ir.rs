//! Intermediate representation: a structural model of LLVM textual IR.
//!
//! Only the parts of a module that instrumentation needs are modelled
//! structurally: symbols, function headers and signatures, basic
//! blocks, and the opcode of each instruction. Everything else
//! (metadata, attribute groups, type definitions, global initializers,
//! instruction operands) is carried verbatim so that it survives a
//! parse/print roundtrip unchanged.

use crate::declare_entity;

declare_entity!(Func, "func");
declare_entity!(Global, "global");
declare_entity!(Block, "block");
declare_entity!(Inst, "inst");

mod module;
pub use module::*;
mod func;
pub use func::*;
mod inst;
pub use inst::*;
mod symbol;
pub use symbol::*;
mod types;
pub use types::*;
mod display;
pub use display::*;
