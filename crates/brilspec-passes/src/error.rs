use brilspec_ir::Opcode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InlineError {
    #[error("call site is not a `call` instruction (found `{0}`)")]
    NotACall(Opcode),
    #[error("call site names {0} functions; exactly one is required")]
    CalleeCount(usize),
    #[error("call to `{callee}` passes {found} arguments but it takes {expected}")]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
    },
    #[error("`{callee}` returns {count} values; only single-value returns can be inlined")]
    MultiValueReturn { callee: String, count: usize },
    #[error("call to `{callee}` has no destination; only value-producing calls can be inlined")]
    VoidCallSite { callee: String },
    #[error("call site expects a value but `{callee}` does not return one")]
    MissingReturnValue { callee: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectError {
    #[error("in `{function}`: call to unknown function `{callee}`")]
    UnknownCallee { function: String, callee: String },
    #[error("in `{function}`: branch target `{label}` does not name a block")]
    UnknownLabel { function: String, label: String },
    #[error("in `{function}`: conditional branch has no target label")]
    BranchWithoutTarget { function: String },
    #[error("in `{function}`: block `{block}` ends in a nested branch, which cannot be speculated")]
    NestedBranch { function: String, block: String },
    #[error("in `{function}`: block `{block}` already contains `{op}`; speculation cannot nest")]
    NestedSpeculation {
        function: String,
        block: String,
        op: Opcode,
    },
    #[error("in `{function}`: `{op}` in block `{block}` has an effect that speculation cannot roll back")]
    SideEffectInSpeculation {
        function: String,
        block: String,
        op: Opcode,
    },
    #[error(
        "in `{function}`: inlining `{callee}` into block `{block}` would bring `{instr}` into the speculated region"
    )]
    ControlFlowInCallee {
        function: String,
        block: String,
        callee: String,
        instr: String,
    },
    #[error("in `{function}`: {source}")]
    Inline {
        function: String,
        #[source]
        source: InlineError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallGraphError {
    #[error("`{caller}` calls unknown function `{callee}`")]
    UnknownCallee { caller: String, callee: String },
}
