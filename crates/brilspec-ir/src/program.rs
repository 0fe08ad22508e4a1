use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::instruction::{Instruction, Type};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<Function>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|func| func.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(rename = "args", default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Param>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<Type>,
    pub instrs: Vec<Instruction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Function {
    pub fn new(name: impl Into<String>, instrs: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            params: None,
            return_type: None,
            instrs,
            extra: Map::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_return_type(mut self, ty: Type) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn params(&self) -> &[Param] {
        self.params.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            extra: Map::new(),
        }
    }
}
