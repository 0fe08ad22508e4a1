//! Bril program model and the block-structure analyses the rewriter needs.

pub mod cfg;
mod display;
pub mod instruction;
pub mod program;
pub mod trace;

pub use cfg::{Block, BlockMap, normalize, partition};
pub use display::render_instrs;
pub use instruction::{Instruction, Label, Literal, OpClass, Opcode, Operation, Type};
pub use program::{Function, Param, Program};
pub use trace::Trace;
