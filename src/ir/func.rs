use super::{Block, Inst, InstData, Name, SignatureData};
use crate::entity::EntityVec;

/// The part of a function shared by declarations and definitions.
#[derive(Clone, Debug)]
pub struct FuncHeader {
    pub name: Name,
    pub sig: SignatureData,
    /// The header as written, from `define`/`declare` up to (not
    /// including) the opening brace of a body.
    pub text: String,
}

#[derive(Clone, Debug)]
pub enum FuncDecl {
    Declaration(FuncHeader),
    Definition(FuncHeader, FunctionBody),
}

impl FuncDecl {
    pub fn header(&self) -> &FuncHeader {
        match self {
            FuncDecl::Declaration(header) => header,
            FuncDecl::Definition(header, _) => header,
        }
    }

    pub fn name(&self) -> &Name {
        &self.header().name
    }

    pub fn sig(&self) -> &SignatureData {
        &self.header().sig
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self, FuncDecl::Declaration(..))
    }

    pub fn body(&self) -> Option<&FunctionBody> {
        match self {
            FuncDecl::Definition(_, body) => Some(body),
            _ => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut FunctionBody> {
        match self {
            FuncDecl::Definition(_, body) => Some(body),
            _ => None,
        }
    }
}

/// Which leading instructions of a block must stay ahead of anything
/// inserted into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixPolicy {
    /// Treat leading `alloca`s as part of the prefix. Phis and EH pads
    /// always are.
    pub allocas: bool,
}

impl Default for PrefixPolicy {
    fn default() -> Self {
        PrefixPolicy { allocas: true }
    }
}

#[derive(Clone, Debug)]
pub struct FunctionBody {
    /// Entry block.
    pub entry: Block,
    /// Blocks, in layout order.
    pub blocks: EntityVec<Block, BlockDef>,
    /// Instruction definitions, indexed by `Inst`.
    pub insts: EntityVec<Inst, InstData>,
}

#[derive(Clone, Debug, Default)]
pub struct BlockDef {
    /// The label line as written (e.g. `5:                       ; preds = %2`),
    /// or `None` for an implicit label.
    pub label: Option<String>,
    /// Instructions in this block.
    pub insts: Vec<Inst>,
}

impl Default for FunctionBody {
    fn default() -> Self {
        FunctionBody::new()
    }
}

impl FunctionBody {
    /// A body with a single, empty entry block.
    pub fn new() -> FunctionBody {
        let mut blocks = EntityVec::default();
        let entry = blocks.push(BlockDef::default());
        FunctionBody {
            entry,
            blocks,
            insts: EntityVec::default(),
        }
    }

    pub fn add_block(&mut self, label: Option<String>) -> Block {
        let id = self.blocks.push(BlockDef {
            label,
            insts: vec![],
        });
        log::trace!("add_block: block {}", id);
        id
    }

    pub fn append_to_block(&mut self, block: Block, data: InstData) -> Inst {
        let inst = self.insts.push(data);
        self.blocks[block].insts.push(inst);
        inst
    }

    /// Insert a new instruction at `pos` in `block`; `pos` may equal
    /// the block's length.
    pub fn insert_inst(&mut self, block: Block, pos: usize, data: InstData) -> Inst {
        log::trace!("insert_inst: {:?} at {} pos {}", data, block, pos);
        let inst = self.insts.push(data);
        self.blocks[block].insts.insert(pos, inst);
        inst
    }

    /// Index of the first instruction in `block` that is not part of
    /// its order-constrained prefix, or the block length if there is
    /// none. Zero for an empty block.
    ///
    /// Debug records never end the prefix, and the ones directly ahead
    /// of the returned position stay attached to the instruction after
    /// them.
    pub fn first_insertion_point(&self, block: Block, policy: PrefixPolicy) -> usize {
        let insts = &self.blocks[block].insts;
        let opcode = |pos: usize| self.insts[insts[pos]].opcode();
        let mut pos = (0..insts.len())
            .find(|&pos| {
                let op = opcode(pos);
                !(op.is_phi()
                    || op.is_eh_pad()
                    || op.is_debug_record()
                    || (policy.allocas && op.is_alloca()))
            })
            .unwrap_or(insts.len());
        while pos > 0 && opcode(pos - 1).is_debug_record() {
            pos -= 1;
        }
        pos
    }

    pub fn block_insts(&self, block: Block) -> impl Iterator<Item = &InstData> {
        self.blocks[block]
            .insts
            .iter()
            .map(move |&inst| &self.insts[inst])
    }
}
