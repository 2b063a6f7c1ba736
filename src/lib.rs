//! entrytrace: function-entry tracing for LLVM textual IR.
//!
//! A module is parsed into a structural IR (`Module`), the
//! `entry_trace` pass inserts a call to a logging primitive at the
//! start of every eligible function, and the module is printed back
//! to text. The `pipeline` module wraps this with the front-end
//! compiler invocation used by the `entrytrace` binary.

pub mod entity;
mod errors;
mod frontend;
mod ir;
pub mod passes;
pub mod pipeline;

pub use errors::*;
pub use frontend::detect_pointer_style;
pub use ir::*;
