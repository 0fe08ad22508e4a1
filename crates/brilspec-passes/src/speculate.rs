//! Speculation injection.
//!
//! For every conditional branch in a traced function, the predicted-taken
//! block is hoisted in front of the branch:
//!
//! ```text
//! speculate;
//!   <taken block, calls inlined, labels and exit jump stripped>
//! guard <cond> .deoptimize;
//! commit;
//! .deoptimize:
//! br <cond> .taken .other;
//! ```
//!
//! Inlined callees must be straight-line: a label or terminator coming out of
//! an expansion is rejected rather than spliced into the speculated region.
//!
//! The guard re-checks the condition. If it fails, control lands on the
//! deoptimize label and falls into the original branch. Effects performed
//! during speculation are not rolled back; [`EffectPolicy::Reject`] refuses
//! to speculate over them instead.

use brilspec_ir::{
    Block, BlockMap, Function, Instruction, OpClass, Opcode, Operation, Program, Trace,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::error::{InjectError, InlineError};
use crate::inline::{InlineNaming, callee_locals, inline_call};

/// Label the first guard of a function fails to.
pub const DEOPTIMIZE_LABEL: &str = "deoptimize";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamingMode {
    /// Suffix inlined locals per site (see [`InlineNaming::Hygienic`]).
    #[default]
    Hygienic,
    Verbatim,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EffectPolicy {
    #[default]
    Allow,
    /// Refuse side-effecting ops and residual calls on the speculated path.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectOptions {
    pub naming: NamingMode,
    pub effects: EffectPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectReport {
    pub functions: usize,
    pub branches: usize,
    pub inlined_calls: usize,
}

/// Rewrites every function named in `trace`.
///
/// All rewrites are computed against the unmodified program before any is
/// applied; on error `program` is left untouched.
pub fn inject(
    program: &mut Program,
    trace: &Trace,
    options: &InjectOptions,
) -> Result<InjectReport, InjectError> {
    let (rewrites, report) = plan(program, trace, options)?;
    for (idx, instrs) in rewrites {
        program.functions[idx].instrs = instrs;
    }
    Ok(report)
}

fn plan(
    program: &Program,
    trace: &Trace,
    options: &InjectOptions,
) -> Result<(Vec<(usize, Vec<Instruction>)>, InjectReport), InjectError> {
    let callees: FxHashMap<&str, &Function> = program
        .functions
        .iter()
        .map(|func| (func.name.as_str(), func))
        .collect();
    for name in trace.names() {
        if !callees.contains_key(name) {
            warn!(function = name, "traced function is not in the program");
        }
    }

    let mut rewrites = Vec::new();
    let mut report = InjectReport::default();
    for (idx, func) in program.functions.iter().enumerate() {
        if !trace.contains(&func.name) {
            continue;
        }
        let mut rewriter = FunctionRewriter::new(func, &callees, options);
        let instrs = rewriter.run()?;
        debug!(
            function = %func.name,
            branches = rewriter.branches,
            inlined = rewriter.inlined,
            "speculated function"
        );
        report.functions += 1;
        report.branches += rewriter.branches;
        report.inlined_calls += rewriter.inlined;
        rewrites.push((idx, instrs));
    }
    Ok((rewrites, report))
}

struct FunctionRewriter<'p> {
    func: &'p Function,
    callees: &'p FxHashMap<&'p str, &'p Function>,
    options: &'p InjectOptions,
    labels: FxHashSet<String>,
    variables: FxHashSet<String>,
    next_deopt: usize,
    next_site: u32,
    branches: usize,
    inlined: usize,
}

impl<'p> FunctionRewriter<'p> {
    fn new(
        func: &'p Function,
        callees: &'p FxHashMap<&'p str, &'p Function>,
        options: &'p InjectOptions,
    ) -> Self {
        Self {
            func,
            callees,
            options,
            labels: func
                .instrs
                .iter()
                .filter_map(Instruction::as_label)
                .map(str::to_string)
                .collect(),
            variables: variables(func),
            next_deopt: 0,
            next_site: 0,
            branches: 0,
            inlined: 0,
        }
    }

    fn run(&mut self) -> Result<Vec<Instruction>, InjectError> {
        let func = self.func;
        let blocks = BlockMap::build(&func.instrs);
        let mut out = Vec::with_capacity(func.instrs.len());
        for instr in &func.instrs {
            if let Instruction::Op(op) = instr {
                if op.op == Opcode::Br {
                    self.expand_branch(&blocks, op, &mut out)?;
                }
            }
            out.push(instr.clone());
        }
        Ok(out)
    }

    fn expand_branch(
        &mut self,
        blocks: &BlockMap<'_>,
        branch: &Operation,
        out: &mut Vec<Instruction>,
    ) -> Result<(), InjectError> {
        let Some(taken) = branch.labels().first() else {
            return Err(InjectError::BranchWithoutTarget {
                function: self.func.name.clone(),
            });
        };
        let Some(block) = blocks.get(taken) else {
            return Err(InjectError::UnknownLabel {
                function: self.func.name.clone(),
                label: taken.clone(),
            });
        };

        out.push(Operation::new(Opcode::Speculate).into());
        for instr in blocks.instrs_of(block) {
            let Instruction::Op(op) = instr else {
                continue;
            };
            match op.class() {
                // The block's own exit edge; the guard sequence replaces it.
                OpClass::Terminator if op.op != Opcode::Br => {}
                OpClass::Terminator => {
                    return Err(InjectError::NestedBranch {
                        function: self.func.name.clone(),
                        block: block.name.clone(),
                    });
                }
                OpClass::Speculation => return Err(self.nested_speculation(block, op)),
                OpClass::Call => {
                    let (callee, body) = self.inline(op)?;
                    for inlined in &body {
                        self.check_inlined(block, callee, inlined)?;
                    }
                    out.extend(body);
                }
                OpClass::Effect => {
                    self.check_effect(block, op)?;
                    out.push(instr.clone());
                }
                OpClass::Compute => out.push(instr.clone()),
            }
        }

        let deopt = self.deopt_label();
        out.push(
            Operation::new(Opcode::Guard)
                .with_args(branch.args().iter().cloned())
                .with_labels([deopt.clone()])
                .into(),
        );
        out.push(Operation::new(Opcode::Commit).into());
        out.push(Instruction::label(deopt));

        self.branches += 1;
        trace!(function = %self.func.name, block = %block.name, "speculated branch");
        Ok(())
    }

    fn inline(
        &mut self,
        call: &Operation,
    ) -> Result<(&'p Function, Vec<Instruction>), InjectError> {
        let func = self.func;
        let callee_name = match call.funcs() {
            [name] => name,
            other => {
                return Err(InjectError::Inline {
                    function: func.name.clone(),
                    source: InlineError::CalleeCount(other.len()),
                });
            }
        };
        let Some(callee) = self.callees.get(callee_name.as_str()).copied() else {
            return Err(InjectError::UnknownCallee {
                function: func.name.clone(),
                callee: callee_name.clone(),
            });
        };
        let naming = match self.options.naming {
            NamingMode::Verbatim => InlineNaming::Verbatim,
            NamingMode::Hygienic => self.fresh_site(callee),
        };
        let body = inline_call(callee, call, naming).map_err(|source| InjectError::Inline {
            function: func.name.clone(),
            source,
        })?;
        self.inlined += 1;
        trace!(function = %func.name, callee = %callee.name, len = body.len(), "inlined call");
        Ok((callee, body))
    }

    /// Next site number whose renamed callee locals are all unused in the caller.
    fn fresh_site(&mut self, callee: &Function) -> InlineNaming {
        let locals = callee_locals(callee);
        loop {
            let naming = InlineNaming::Hygienic(self.next_site);
            self.next_site += 1;
            let clash = locals.iter().map(|name| naming.local(name)).any(|renamed| {
                self.variables.contains(&renamed) || self.labels.contains(&renamed)
            });
            if !clash {
                return naming;
            }
        }
    }

    fn check_inlined(
        &self,
        block: &Block,
        callee: &Function,
        instr: &Instruction,
    ) -> Result<(), InjectError> {
        let control_flow = || InjectError::ControlFlowInCallee {
            function: self.func.name.clone(),
            block: block.name.clone(),
            callee: callee.name.clone(),
            instr: instr.to_string(),
        };
        let Instruction::Op(op) = instr else {
            return Err(control_flow());
        };
        match op.class() {
            OpClass::Terminator => Err(control_flow()),
            OpClass::Speculation => Err(self.nested_speculation(block, op)),
            OpClass::Effect | OpClass::Call => self.check_effect(block, op),
            OpClass::Compute => Ok(()),
        }
    }

    fn check_effect(&self, block: &Block, op: &Operation) -> Result<(), InjectError> {
        match self.options.effects {
            EffectPolicy::Allow => Ok(()),
            EffectPolicy::Reject => Err(InjectError::SideEffectInSpeculation {
                function: self.func.name.clone(),
                block: block.name.clone(),
                op: op.op.clone(),
            }),
        }
    }

    fn nested_speculation(&self, block: &Block, op: &Operation) -> InjectError {
        InjectError::NestedSpeculation {
            function: self.func.name.clone(),
            block: block.name.clone(),
            op: op.op.clone(),
        }
    }

    /// `deoptimize` for the first guard, then `deoptimize.1`, `deoptimize.2`, ...
    /// skipping labels the function already uses.
    fn deopt_label(&mut self) -> String {
        loop {
            let name = match self.next_deopt {
                0 => DEOPTIMIZE_LABEL.to_string(),
                n => format!("{DEOPTIMIZE_LABEL}.{n}"),
            };
            self.next_deopt += 1;
            if self.labels.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// Parameter, destination and argument names used by `func`.
fn variables(func: &Function) -> FxHashSet<String> {
    let mut names: FxHashSet<String> = func.params().iter().map(|p| p.name.clone()).collect();
    for op in func.instrs.iter().filter_map(Instruction::as_op) {
        names.extend(op.dest.iter().cloned());
        names.extend(op.args().iter().cloned());
    }
    names
}
