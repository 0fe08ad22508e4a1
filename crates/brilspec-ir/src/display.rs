//! Textual Bril rendering, used for logs and test snapshots.

use std::fmt;

use crate::instruction::{Instruction, Literal, Opcode, Operation, Type};
use crate::program::Function;

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Prim(name) => f.write_str(name),
            Type::Ptr { ptr } => write!(f, "ptr<{ptr}>"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value:?}"),
            Literal::Char(value) => write!(f, "'{value}'"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dest) = &self.dest {
            f.write_str(dest)?;
            if let Some(ty) = &self.ty {
                write!(f, ": {ty}")?;
            }
            f.write_str(" = ")?;
        }
        write!(f, "{}", self.op)?;
        if let Some(value) = &self.value {
            write!(f, " {value}")?;
        }
        for func in self.funcs() {
            write!(f, " @{func}")?;
        }
        for arg in self.args() {
            write!(f, " {arg}")?;
        }
        for label in self.labels() {
            write!(f, " .{label}")?;
        }
        f.write_str(";")
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Label(label) => write!(f, ".{}:", label.label),
            Instruction::Op(op) => write!(f, "{op}"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.params().is_empty() {
            f.write_str("(")?;
            for (idx, param) in self.params().iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: {}", param.name, param.ty)?;
            }
            f.write_str(")")?;
        }
        if let Some(ty) = &self.return_type {
            write!(f, ": {ty}")?;
        }
        writeln!(f, " {{")?;
        for instr in &self.instrs {
            match instr {
                Instruction::Label(_) => writeln!(f, "{instr}")?,
                Instruction::Op(_) => writeln!(f, "  {instr}")?,
            }
        }
        f.write_str("}")
    }
}

/// Renders a body one instruction per line.
pub fn render_instrs<'a>(instrs: impl IntoIterator<Item = &'a Instruction>) -> String {
    instrs
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
