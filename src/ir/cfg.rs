//! Control-flow graph over the linear IR.
//!
//! Blocks live in an arena and refer to each other by index, so the graph
//! has no ownership cycles. The surface language has no branching
//! construct yet, so building a CFG always yields a single entry block;
//! every pass contract still holds for N blocks.

use super::Inst;
use std::fmt;

/// Arena index of a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A maximal straight-line run of instructions with single entry/exit.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Block label.
    pub label: String,
    /// Instructions in program order.
    pub insts: Vec<Inst>,
    /// Predecessor block indices.
    pub preds: Vec<BlockId>,
    /// Successor block indices.
    pub succs: Vec<BlockId>,
}

impl BasicBlock {
    /// Create a new empty block.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            insts: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
        }
    }

    /// Add an instruction to the block.
    pub fn push(&mut self, inst: Inst) {
        self.insts.push(inst);
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.insts.len()
    }

    /// Is this block empty?
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for inst in &self.insts {
            writeln!(f, "    {}", inst)?;
        }
        Ok(())
    }
}

/// A control-flow graph: an arena of blocks plus the entry index.
#[derive(Debug, Clone)]
pub struct Cfg {
    /// Block arena, in program order.
    pub blocks: Vec<BasicBlock>,
    /// Entry block index.
    pub entry: BlockId,
}

impl Cfg {
    /// Partition a linear instruction sequence into basic blocks.
    pub fn build(insts: Vec<Inst>) -> Self {
        let mut entry = BasicBlock::new("entry");
        entry.insts = insts;
        Self {
            blocks: vec![entry],
            entry: BlockId(0),
        }
    }

    /// Flatten blocks back to a linear sequence, preserving order.
    ///
    /// `flatten(build(p)) == p` for any program `p`.
    pub fn flatten(self) -> Vec<Inst> {
        let mut out = Vec::new();
        for block in self.blocks {
            out.extend(block.insts);
        }
        out
    }

    /// Get a block by index.
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    /// Get a mutable block by index.
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0]
    }

    /// Total instruction count across all blocks.
    pub fn inst_count(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }

    /// Iterate over blocks in program order.
    pub fn iter_blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter()
    }
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}
