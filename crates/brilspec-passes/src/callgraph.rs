//! Function call graph and recursion detection.

use brilspec_ir::{Instruction, Opcode, Program};
use rustc_hash::FxHashMap;

use crate::error::CallGraphError;

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    names: Vec<String>,
    callees: Vec<Vec<String>>,
    index: FxHashMap<String, usize>,
}

impl CallGraph {
    /// One node per function, in program order, with an edge for every name
    /// in every `call` instruction's `funcs`.
    pub fn from_program(program: &Program) -> Self {
        let mut graph = Self::default();
        for func in &program.functions {
            let node = graph.node(&func.name);
            let calls = func
                .instrs
                .iter()
                .filter_map(Instruction::as_op)
                .filter(|op| op.op == Opcode::Call)
                .flat_map(|op| op.funcs().iter().cloned());
            graph.callees[node].extend(calls);
        }
        graph
    }

    pub fn from_edges<'a, C>(edges: impl IntoIterator<Item = (&'a str, C)>) -> Self
    where
        C: IntoIterator<Item = &'a str>,
    {
        let mut graph = Self::default();
        for (caller, callees) in edges {
            let node = graph.node(caller);
            graph.callees[node].extend(callees.into_iter().map(str::to_string));
        }
        graph
    }

    fn node(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.callees.push(Vec::new());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn callees(&self, name: &str) -> Option<&[String]> {
        self.index.get(name).map(|&idx| self.callees[idx].as_slice())
    }

    /// Searches from every node in order and returns the first call cycle
    /// found, as the path from the start node through the repeated one.
    pub fn first_cycle(&self) -> Result<Option<Vec<String>>, CallGraphError> {
        let mut path = Vec::new();
        for start in 0..self.names.len() {
            if let Some(cycle) = self.walk(start, &mut path)? {
                return Ok(Some(cycle.into_iter().map(|idx| self.names[idx].clone()).collect()));
            }
        }
        Ok(None)
    }

    /// Depth-first search that only remembers the nodes on the current path,
    /// so shared callees reached along different paths are explored again.
    fn walk(
        &self,
        node: usize,
        path: &mut Vec<usize>,
    ) -> Result<Option<Vec<usize>>, CallGraphError> {
        path.push(node);
        for callee in &self.callees[node] {
            let Some(&next) = self.index.get(callee) else {
                path.pop();
                return Err(CallGraphError::UnknownCallee {
                    caller: self.names[node].clone(),
                    callee: callee.clone(),
                });
            };
            if path.contains(&next) {
                let mut cycle = path.clone();
                cycle.push(next);
                path.pop();
                return Ok(Some(cycle));
            }
            if let Some(cycle) = self.walk(next, path)? {
                path.pop();
                return Ok(Some(cycle));
            }
        }
        path.pop();
        Ok(None)
    }
}

/// `A -> B -> A`
pub fn render_cycle(cycle: &[String]) -> String {
    cycle.join(" -> ")
}
