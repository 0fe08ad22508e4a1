use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operation codes the rewriter reasons about.
///
/// Everything it does not need to tell apart (arithmetic, comparisons, float
/// and char ops, ...) lands in `Other` and is treated as pure computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Opcode {
    Const,
    Id,
    Call,
    Jmp,
    Br,
    Ret,
    Print,
    Nop,
    Alloc,
    Free,
    Store,
    Load,
    PtrAdd,
    Speculate,
    Guard,
    Commit,
    Other(String),
}

/// Coarse classification driving block splitting and speculation checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    Compute,
    /// Computation with an observable effect that speculation cannot undo.
    Effect,
    Call,
    Terminator,
    Speculation,
}

impl Opcode {
    pub fn as_str(&self) -> &str {
        match self {
            Opcode::Const => "const",
            Opcode::Id => "id",
            Opcode::Call => "call",
            Opcode::Jmp => "jmp",
            Opcode::Br => "br",
            Opcode::Ret => "ret",
            Opcode::Print => "print",
            Opcode::Nop => "nop",
            Opcode::Alloc => "alloc",
            Opcode::Free => "free",
            Opcode::Store => "store",
            Opcode::Load => "load",
            Opcode::PtrAdd => "ptradd",
            Opcode::Speculate => "speculate",
            Opcode::Guard => "guard",
            Opcode::Commit => "commit",
            Opcode::Other(name) => name,
        }
    }

    pub fn class(&self) -> OpClass {
        match self {
            Opcode::Const
            | Opcode::Id
            | Opcode::Nop
            | Opcode::Load
            | Opcode::PtrAdd
            | Opcode::Other(_) => OpClass::Compute,
            Opcode::Print | Opcode::Alloc | Opcode::Free | Opcode::Store => OpClass::Effect,
            Opcode::Call => OpClass::Call,
            Opcode::Jmp | Opcode::Br | Opcode::Ret => OpClass::Terminator,
            Opcode::Speculate | Opcode::Guard | Opcode::Commit => OpClass::Speculation,
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.class() == OpClass::Terminator
    }
}

impl From<String> for Opcode {
    fn from(name: String) -> Self {
        match name.as_str() {
            "const" => Opcode::Const,
            "id" => Opcode::Id,
            "call" => Opcode::Call,
            "jmp" => Opcode::Jmp,
            "br" => Opcode::Br,
            "ret" => Opcode::Ret,
            "print" => Opcode::Print,
            "nop" => Opcode::Nop,
            "alloc" => Opcode::Alloc,
            "free" => Opcode::Free,
            "store" => Opcode::Store,
            "load" => Opcode::Load,
            "ptradd" => Opcode::PtrAdd,
            "speculate" => Opcode::Speculate,
            "guard" => Opcode::Guard,
            "commit" => Opcode::Commit,
            _ => Opcode::Other(name),
        }
    }
}

impl From<&str> for Opcode {
    fn from(name: &str) -> Self {
        Opcode::from(name.to_string())
    }
}

impl From<Opcode> for String {
    fn from(op: Opcode) -> Self {
        match op {
            Opcode::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Type {
    Prim(String),
    Ptr { ptr: Box<Type> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(String),
}

/// A label marker. Carries no operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An operation instruction.
///
/// Operand lists are kept as `Option` so that a key that was absent in the
/// input stays absent in the output, and one that was present but empty stays
/// present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub op: Opcode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funcs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Operation {
    pub fn new(op: impl Into<Opcode>) -> Self {
        Self {
            op: op.into(),
            dest: None,
            ty: None,
            args: None,
            funcs: None,
            labels: None,
            value: None,
            extra: Map::new(),
        }
    }

    pub fn with_dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_funcs<I, S>(mut self, funcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.funcs = Some(funcs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_value(mut self, value: Literal) -> Self {
        self.value = Some(value);
        self
    }

    pub fn args(&self) -> &[String] {
        self.args.as_deref().unwrap_or(&[])
    }

    pub fn funcs(&self) -> &[String] {
        self.funcs.as_deref().unwrap_or(&[])
    }

    pub fn labels(&self) -> &[String] {
        self.labels.as_deref().unwrap_or(&[])
    }

    pub fn class(&self) -> OpClass {
        self.op.class()
    }
}

/// One element of a function body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instruction {
    Label(Label),
    Op(Operation),
}

impl Instruction {
    pub fn label(name: impl Into<String>) -> Self {
        Instruction::Label(Label {
            label: name.into(),
            extra: Map::new(),
        })
    }

    /// `dest = id src`, untyped.
    pub fn id(dest: impl Into<String>, src: impl Into<String>) -> Self {
        Instruction::Op(Operation::new(Opcode::Id).with_dest(dest).with_args([src]))
    }

    pub fn jump(target: impl Into<String>) -> Self {
        Instruction::Op(Operation::new(Opcode::Jmp).with_labels([target]))
    }

    /// A `ret` carrying no value.
    pub fn ret() -> Self {
        Instruction::Op(Operation::new(Opcode::Ret).with_args(Vec::<String>::new()))
    }

    pub fn as_op(&self) -> Option<&Operation> {
        match self {
            Instruction::Op(op) => Some(op),
            Instruction::Label(_) => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Instruction::Label(label) => Some(&label.label),
            Instruction::Op(_) => None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.as_op().is_some_and(|op| op.op.is_terminator())
    }
}

impl From<Operation> for Instruction {
    fn from(op: Operation) -> Self {
        Instruction::Op(op)
    }
}
