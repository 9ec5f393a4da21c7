//! Memory SSA construction.
//!
//! Builds the access graph for a function: scan instructions into uses and
//! defs, place phis on the iterated dominance frontier of the defining
//! blocks, then rename along the dominator tree. Renaming is two-phase by
//! design: phis are placed with sentinel incomings first and filled in
//! during the walk, so loop back-edges need no special casing.

use std::collections::HashSet;

use crate::alias::{classify, AccessClass, AliasOracle, MemoryLocation};
use crate::analysis::{Cfg, DomTree};
use crate::ir::{BlockId, Function, InstId};

use super::access::{Access, AccessGraph, AccessId, LIVE_ON_ENTRY};
use super::optimize;
use super::walker::{CachingWalker, DoNothingWalker, WalkCtx, Walker};

/// The Memory SSA analysis for one function.
///
/// Owns every access node; the function, oracle, and dominator tree are
/// borrowed and must outlive the analysis. All queries and mutations go
/// through this type.
pub struct MemorySsa<'a> {
    pub(super) func: &'a Function,
    pub(super) oracle: &'a dyn AliasOracle,
    pub(super) dt: &'a DomTree,
    pub(super) cfg: Cfg,
    pub(super) graph: AccessGraph,
    pub(super) walker: Box<dyn Walker>,
    next_version: u32,
}

impl<'a> MemorySsa<'a> {
    /// Builds the analysis and optimizes all uses.
    pub fn build(func: &'a Function, oracle: &'a dyn AliasOracle, dt: &'a DomTree) -> Self {
        Self::build_with_walker(func, oracle, dt, Box::new(CachingWalker::new()))
    }

    /// Builds the analysis with the trivial walker, which answers clobber
    /// queries with defining edges verbatim. For tests.
    pub fn with_trivial_walker(
        func: &'a Function,
        oracle: &'a dyn AliasOracle,
        dt: &'a DomTree,
    ) -> Self {
        Self::build_with_walker(func, oracle, dt, Box::new(DoNothingWalker))
    }

    fn build_with_walker(
        func: &'a Function,
        oracle: &'a dyn AliasOracle,
        dt: &'a DomTree,
        walker: Box<dyn Walker>,
    ) -> Self {
        let mut mssa = Self {
            func,
            oracle,
            dt,
            cfg: Cfg::new(func),
            graph: AccessGraph::new(),
            walker,
            next_version: 1,
        };
        let defining_blocks = mssa.scan();
        mssa.place_phis(&defining_blocks);
        mssa.rename();
        optimize::optimize_uses(&mut mssa);
        mssa
    }

    /// Creates uses and defs for every memory-touching instruction, with
    /// sentinel defining edges. Returns the blocks containing defs.
    fn scan(&mut self) -> Vec<BlockId> {
        let mut defining_blocks = Vec::new();
        for block in &self.func.blocks {
            for inst in &block.insts {
                match classify(self.oracle.mod_ref(inst.id)) {
                    AccessClass::Skip => {}
                    AccessClass::Use => {
                        let access = self.graph.add_use(inst.id, LIVE_ON_ENTRY, block.id);
                        self.graph.push_to_block(block.id, access);
                    }
                    AccessClass::Def => {
                        let version = self.fresh_version();
                        let access =
                            self.graph
                                .add_def(inst.id, LIVE_ON_ENTRY, version, block.id);
                        self.graph.push_to_block(block.id, access);
                        if !defining_blocks.contains(&block.id) {
                            defining_blocks.push(block.id);
                        }
                    }
                }
            }
        }
        defining_blocks
    }

    /// Places a phi in every block of the iterated dominance frontier of
    /// the defining blocks. Incomings start as the sentinel and are filled
    /// during renaming; unreachable predecessors simply keep it.
    fn place_phis(&mut self, defining_blocks: &[BlockId]) {
        for block in self.dt.iterated_frontier(defining_blocks) {
            let incoming: Vec<(BlockId, AccessId)> = self
                .cfg
                .preds(block)
                .iter()
                .map(|pred| (*pred, LIVE_ON_ENTRY))
                .collect();
            let version = self.fresh_version();
            let phi = self.graph.add_phi(block, version, incoming);
            self.graph.push_to_block(block, phi);
        }
    }

    /// Dominator-tree preorder walk filling defining edges and phi
    /// incomings with the current memory state. Blocks the walk never
    /// reaches keep their sentinel edges.
    fn rename(&mut self) {
        let mut visited = HashSet::new();
        self.rename_block(self.cfg.entry(), LIVE_ON_ENTRY, &mut visited);
    }

    fn rename_block(
        &mut self,
        block: BlockId,
        mut incoming: AccessId,
        visited: &mut HashSet<BlockId>,
    ) {
        if !visited.insert(block) {
            return;
        }

        if let Some(phi) = self.graph.phi_of(block) {
            incoming = phi;
        }
        for access in self.graph.block_accesses(block).to_vec() {
            let node = self.graph.node(access);
            if node.is_phi() {
                continue;
            }
            let is_def = node.is_def();
            self.graph.set_defining(access, incoming);
            if is_def {
                incoming = access;
            }
        }

        for succ in self.cfg.succs(block).to_vec() {
            if let Some(phi) = self.graph.phi_of(succ) {
                self.graph.set_phi_incoming_for_block(phi, block, incoming);
            }
        }

        for child in self.dt.children(block).to_vec() {
            self.rename_block(child, incoming, visited);
        }
    }

    pub(super) fn fresh_version(&mut self) -> u32 {
        let version = self.next_version;
        self.next_version += 1;
        version
    }

    pub fn func(&self) -> &'a Function {
        self.func
    }

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    pub fn dom_tree(&self) -> &'a DomTree {
        self.dt
    }

    /// Read access to the access graph and its side tables.
    pub fn graph(&self) -> &AccessGraph {
        &self.graph
    }

    pub fn live_on_entry(&self) -> AccessId {
        LIVE_ON_ENTRY
    }

    pub fn is_live_on_entry(&self, access: AccessId) -> bool {
        access == LIVE_ON_ENTRY
    }

    /// The access node for an id.
    pub fn access(&self, id: AccessId) -> &Access {
        self.graph.node(id)
    }

    /// The access for a memory-touching instruction.
    pub fn access_of(&self, inst: InstId) -> Option<AccessId> {
        self.graph.access_of(inst)
    }

    /// The block's phi, if any.
    pub fn phi_of(&self, block: BlockId) -> Option<AccessId> {
        self.graph.phi_of(block)
    }

    /// The block's ordered access list; phi first.
    pub fn block_accesses(&self, block: BlockId) -> &[AccessId] {
        self.graph.block_accesses(block)
    }

    /// The location an access's instruction touches, if it has one.
    pub(super) fn location_of(&self, inst: InstId) -> Option<MemoryLocation> {
        let (inst, _) = self
            .func
            .inst(inst)
            .unwrap_or_else(|| panic!("instruction {:?} is not in the function", inst));
        MemoryLocation::of_inst(&inst.kind)
    }

    /// Splits the analysis into the walker and the context it walks over.
    pub(super) fn walk_parts(&mut self) -> (&mut dyn Walker, WalkCtx<'_>) {
        let MemorySsa {
            func,
            oracle,
            dt,
            graph,
            walker,
            ..
        } = self;
        (
            walker.as_mut(),
            WalkCtx {
                func: *func,
                dt: *dt,
                oracle: *oracle,
                graph,
            },
        )
    }
}

#[cfg(test)]
#[path = "../tests/memssa/t_build.rs"]
mod tests;
