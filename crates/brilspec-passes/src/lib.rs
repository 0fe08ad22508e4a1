//! Program rewrites over the Bril model: call inlining, speculation
//! injection, and call-graph recursion detection.

pub mod callgraph;
mod error;
pub mod inline;
pub mod speculate;

pub use callgraph::{CallGraph, render_cycle};
pub use error::{CallGraphError, InjectError, InlineError};
pub use inline::{InlineNaming, callee_locals, inline_call};
pub use speculate::{
    DEOPTIMIZE_LABEL, EffectPolicy, InjectOptions, InjectReport, NamingMode, inject,
};
