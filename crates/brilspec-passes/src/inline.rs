//! Call-site inlining.
//!
//! Expands one `call` into the callee's body: parameters are bound to the
//! call-site arguments with `id`, and every `ret` becomes an `id` into the
//! call's destination. Calls inside the callee are left alone.

use brilspec_ir::{Function, Instruction, Label, Opcode, Operation};

use crate::error::InlineError;

/// How callee-local names are carried into the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineNaming {
    /// Names are copied unchanged. Two expansions of the same callee in one
    /// scope will alias each other's variables.
    Verbatim,
    /// Every callee-local variable and label gets a `.inl<site>` suffix.
    Hygienic(u32),
}

impl InlineNaming {
    /// The caller-side name of callee-local `name`.
    pub fn local(self, name: &str) -> String {
        match self {
            InlineNaming::Verbatim => name.to_string(),
            InlineNaming::Hygienic(site) => format!("{name}.inl{site}"),
        }
    }

    fn operation(self, op: &Operation) -> Operation {
        let mut op = op.clone();
        if let InlineNaming::Verbatim = self {
            return op;
        }
        if let Some(dest) = &mut op.dest {
            *dest = self.local(dest);
        }
        for arg in op.args.iter_mut().flatten() {
            *arg = self.local(arg);
        }
        for label in op.labels.iter_mut().flatten() {
            *label = self.local(label);
        }
        op
    }
}

fn exit_label(callee: &Function) -> String {
    format!("{}.ret", callee.name)
}

/// Every name an expansion of `callee` renames: parameters, variables,
/// labels, and the early-return exit label.
pub fn callee_locals(callee: &Function) -> Vec<String> {
    let mut names: Vec<String> = callee.params().iter().map(|p| p.name.clone()).collect();
    for instr in &callee.instrs {
        match instr {
            Instruction::Label(label) => names.push(label.label.clone()),
            Instruction::Op(op) => {
                names.extend(op.dest.iter().cloned());
                names.extend(op.args().iter().cloned());
                names.extend(op.labels().iter().cloned());
            }
        }
    }
    names.push(exit_label(callee));
    names
}

/// Expands `site`, a call to `callee`, into straight-line caller code.
///
/// Arity, the call's destination and the return shape are checked before
/// anything is emitted. A `ret` that is not the last instruction of the
/// callee is followed by a jump to an exit label placed after the expansion.
pub fn inline_call(
    callee: &Function,
    site: &Operation,
    naming: InlineNaming,
) -> Result<Vec<Instruction>, InlineError> {
    if site.op != Opcode::Call {
        return Err(InlineError::NotACall(site.op.clone()));
    }
    if site.funcs().len() != 1 {
        return Err(InlineError::CalleeCount(site.funcs().len()));
    }
    let params = callee.params();
    let args = site.args();
    if params.len() != args.len() {
        return Err(InlineError::ArityMismatch {
            callee: callee.name.clone(),
            expected: params.len(),
            found: args.len(),
        });
    }
    let Some(dest) = site.dest.as_deref() else {
        return Err(InlineError::VoidCallSite {
            callee: callee.name.clone(),
        });
    };

    let mut out = Vec::with_capacity(params.len() + callee.instrs.len() + 1);
    for (param, arg) in params.iter().zip(args) {
        out.push(Instruction::id(naming.local(&param.name), arg.clone()));
    }

    let exit = naming.local(&exit_label(callee));
    let last = callee.instrs.len().saturating_sub(1);
    let mut returned = false;
    let mut early_exit = false;

    for (idx, instr) in callee.instrs.iter().enumerate() {
        let op = match instr {
            Instruction::Label(label) => {
                out.push(Instruction::Label(Label {
                    label: naming.local(&label.label),
                    extra: label.extra.clone(),
                }));
                continue;
            }
            Instruction::Op(op) => op,
        };
        if op.op != Opcode::Ret {
            out.push(Instruction::Op(naming.operation(op)));
            continue;
        }

        match op.args() {
            [value] => out.push(Instruction::id(dest, naming.local(value))),
            [] => {
                return Err(InlineError::MissingReturnValue {
                    callee: callee.name.clone(),
                });
            }
            values => {
                return Err(InlineError::MultiValueReturn {
                    callee: callee.name.clone(),
                    count: values.len(),
                });
            }
        }
        returned = true;
        if idx != last {
            out.push(Instruction::jump(exit.clone()));
            early_exit = true;
        }
    }

    if !returned {
        return Err(InlineError::MissingReturnValue {
            callee: callee.name.clone(),
        });
    }
    if early_exit {
        out.push(Instruction::label(exit));
    }

    Ok(out)
}
