//! Passes.

pub mod entry_trace;
