//! Basic-block view over a flat function body.
//!
//! Blocks never own instructions. Each one is an index range into the
//! function's instruction arena plus, after [`normalize`], an optional
//! synthesized exit terminator. The view is rebuilt whenever a pass needs it
//! and dropped afterwards.

use std::ops::Range;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::instruction::Instruction;

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub range: Range<usize>,
    /// Terminator added by [`normalize`] when the block fell through.
    pub exit: Option<Instruction>,
}

impl Block {
    /// The block's instructions: its arena slice followed by any synthesized exit.
    pub fn instrs<'a>(&'a self, arena: &'a [Instruction]) -> impl Iterator<Item = &'a Instruction> {
        arena[self.range.clone()].iter().chain(self.exit.iter())
    }

    pub fn last<'a>(&'a self, arena: &'a [Instruction]) -> Option<&'a Instruction> {
        self.exit.as_ref().or_else(|| arena[self.range.clone()].last())
    }

    pub fn is_terminated(&self, arena: &[Instruction]) -> bool {
        self.last(arena).is_some_and(Instruction::is_terminator)
    }

    pub fn len(&self) -> usize {
        self.range.len() + usize::from(self.exit.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hands out names for unlabeled blocks that cannot clash with real labels.
struct BlockNamer<'a> {
    taken: FxHashSet<&'a str>,
    next: usize,
}

impl<'a> BlockNamer<'a> {
    fn new(instrs: &'a [Instruction]) -> Self {
        Self {
            taken: instrs.iter().filter_map(Instruction::as_label).collect(),
            next: 0,
        }
    }

    fn fresh(&mut self) -> String {
        loop {
            let name = format!("_b{}", self.next);
            self.next += 1;
            if !self.taken.contains(name.as_str()) {
                return name;
            }
        }
    }

    fn block(&mut self, instrs: &[Instruction], range: Range<usize>) -> Block {
        let name = match instrs[range.start].as_label() {
            Some(label) => label.to_string(),
            None => self.fresh(),
        };
        Block {
            name,
            range,
            exit: None,
        }
    }
}

/// Splits `instrs` into maximal straight-line blocks.
///
/// A terminator closes the block it ends; a label opens a new one. The ranges
/// cover the input contiguously and in order.
pub fn partition(instrs: &[Instruction]) -> Vec<Block> {
    let mut namer = BlockNamer::new(instrs);
    let mut blocks = Vec::new();
    let mut start = 0;

    for (idx, instr) in instrs.iter().enumerate() {
        match instr {
            Instruction::Op(op) => {
                if op.op.is_terminator() {
                    blocks.push(namer.block(instrs, start..idx + 1));
                    start = idx + 1;
                }
            }
            Instruction::Label(_) => {
                if start < idx {
                    blocks.push(namer.block(instrs, start..idx));
                }
                start = idx;
            }
        }
    }
    if start < instrs.len() {
        blocks.push(namer.block(instrs, start..instrs.len()));
    }

    blocks
}

/// Makes every fallthrough explicit.
///
/// A block that does not end in a terminator gets a `jmp` to the next block,
/// or a bare `ret` when it is the last block. Already-terminated blocks are
/// left alone, so running this twice is harmless.
pub fn normalize(instrs: &[Instruction], blocks: &mut [Block]) {
    for idx in 0..blocks.len() {
        if blocks[idx].is_terminated(instrs) {
            continue;
        }
        let exit = match blocks.get(idx + 1) {
            Some(next) => Instruction::jump(next.name.clone()),
            None => Instruction::ret(),
        };
        blocks[idx].exit = Some(exit);
    }
}

/// Normalized blocks of one function body, addressable by name.
pub struct BlockMap<'f> {
    instrs: &'f [Instruction],
    blocks: Vec<Block>,
    by_name: FxHashMap<String, usize>,
}

impl<'f> BlockMap<'f> {
    pub fn build(instrs: &'f [Instruction]) -> Self {
        let mut blocks = partition(instrs);
        normalize(instrs, &mut blocks);
        let mut by_name = FxHashMap::default();
        for (idx, block) in blocks.iter().enumerate() {
            // A duplicated label keeps its first block.
            by_name.entry(block.name.clone()).or_insert(idx);
        }
        Self {
            instrs,
            blocks,
            by_name,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, name: &str) -> Option<&Block> {
        self.by_name.get(name).map(|&idx| &self.blocks[idx])
    }

    pub fn arena(&self) -> &'f [Instruction] {
        self.instrs
    }

    pub fn instrs_of<'a>(&'a self, block: &'a Block) -> impl Iterator<Item = &'a Instruction> {
        block.instrs(self.instrs)
    }
}
