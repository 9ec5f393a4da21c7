//! Minimal SSA function builder.
//!
//! Provides a small API for creating SSA functions for tests and clients
//! without exposing the raw ID allocation details.

use super::ir::*;

/// Constructs SSA functions while managing ID allocation.
pub struct FunctionBuilder {
    func: Function,
    next_value: u32,
    next_block: u32,
    next_local: u32,
    next_inst: u32,
}

impl FunctionBuilder {
    /// Creates a new SSA builder for a single function. The entry block is
    /// the first block added.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            func: Function {
                name: name.into(),
                locals: Vec::new(),
                blocks: Vec::new(),
            },
            next_value: 0,
            next_block: 0,
            next_local: 0,
            next_inst: 0,
        }
    }

    /// Appends a new basic block and returns its ID.
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.func.blocks.push(Block {
            id,
            params: Vec::new(),
            insts: Vec::new(),
            term: Terminator::Unreachable,
        });
        id
    }

    /// Adds a stack slot to the function locals list.
    pub fn add_local(&mut self, name: Option<String>) -> LocalId {
        let id = LocalId(self.next_local);
        self.next_local += 1;
        self.func.locals.push(Local { id, name });
        id
    }

    /// Adds a parameter to the given block and returns the SSA value ID.
    pub fn add_block_param(&mut self, block: BlockId) -> ValueId {
        let value = self.alloc_value();
        self.block_mut(block).params.push(value);
        value
    }

    /// Emits an integer constant instruction in the given block.
    pub fn const_int(&mut self, block: BlockId, value: i64) -> ValueId {
        self.emit_with_result(
            block,
            InstKind::Const {
                value: ConstValue::Int(value),
            },
        )
    }

    /// Emits a boolean constant instruction in the given block.
    pub fn const_bool(&mut self, block: BlockId, value: bool) -> ValueId {
        self.emit_with_result(
            block,
            InstKind::Const {
                value: ConstValue::Bool(value),
            },
        )
    }

    /// Emits a global address constant in the given block.
    pub fn global_addr(&mut self, block: BlockId, id: GlobalId) -> ValueId {
        self.emit_with_result(
            block,
            InstKind::Const {
                value: ConstValue::GlobalAddr { id },
            },
        )
    }

    /// Emits a binary operation instruction in the given block.
    pub fn binop(&mut self, block: BlockId, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.emit_with_result(block, InstKind::BinOp { op, lhs, rhs })
    }

    /// Emits a comparison instruction in the given block.
    pub fn cmp(&mut self, block: BlockId, op: CmpOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.emit_with_result(block, InstKind::Cmp { op, lhs, rhs })
    }

    /// Emits an address-of instruction for a stack slot.
    pub fn addr_of(&mut self, block: BlockId, local: LocalId) -> ValueId {
        self.emit_with_result(block, InstKind::AddrOfLocal { local })
    }

    /// Emits a field address computation off a base pointer.
    pub fn field_addr(&mut self, block: BlockId, base: ValueId, index: usize) -> ValueId {
        self.emit_with_result(block, InstKind::FieldAddr { base, index })
    }

    /// Emits a load through a pointer.
    pub fn load(&mut self, block: BlockId, ptr: ValueId) -> ValueId {
        self.emit_with_result(block, InstKind::Load { ptr })
    }

    /// Emits a store through a pointer. Returns the instruction id since
    /// stores produce no value.
    pub fn store(&mut self, block: BlockId, ptr: ValueId, value: ValueId) -> InstId {
        self.emit(block, None, InstKind::Store { ptr, value })
    }

    /// Emits a call returning a value.
    pub fn call(
        &mut self,
        block: BlockId,
        callee: impl Into<String>,
        args: Vec<ValueId>,
    ) -> ValueId {
        self.emit_with_result(
            block,
            InstKind::Call {
                callee: callee.into(),
                args,
            },
        )
    }

    /// Terminates the given block.
    pub fn terminate(&mut self, block: BlockId, term: Terminator) {
        self.block_mut(block).term = term;
    }

    /// Returns the id of the last instruction emitted into a block. Tests
    /// use this to name loads and stores.
    pub fn last_inst(&self, block: BlockId) -> InstId {
        self.func
            .block(block)
            .insts
            .last()
            .unwrap_or_else(|| panic!("block {:?} has no instructions", block))
            .id
    }

    /// Finishes construction and returns the function.
    pub fn finish(self) -> Function {
        self.func
    }

    fn emit_with_result(&mut self, block: BlockId, kind: InstKind) -> ValueId {
        let result = self.alloc_value();
        self.emit(block, Some(result), kind);
        result
    }

    fn emit(&mut self, block: BlockId, result: Option<ValueId>, kind: InstKind) -> InstId {
        let id = InstId(self.next_inst);
        self.next_inst += 1;
        self.block_mut(block)
            .insts
            .push(Instruction { id, result, kind });
        id
    }

    fn alloc_value(&mut self) -> ValueId {
        let value = ValueId(self.next_value);
        self.next_value += 1;
        value
    }

    fn block_mut(&mut self, block: BlockId) -> &mut Block {
        &mut self.func.blocks[block.index()]
    }
}

#[cfg(test)]
#[path = "../tests/ir/t_builder.rs"]
mod tests;
