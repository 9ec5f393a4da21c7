//! Local mutation of the access graph.
//!
//! These are the operations surrounding transformations use to keep the
//! analysis in sync with IR changes they make: materializing accesses for
//! inserted instructions, removing accesses for deleted ones, and the
//! dominance predicates clients need to reason about positions. None of
//! them create phis or re-optimize uses; callers own those decisions.

use crate::alias::{classify, AccessClass};
use crate::ir::{BlockId, InstId};

use super::access::{AccessId, AccessKind, LIVE_ON_ENTRY};
use super::build::MemorySsa;

/// Where in a block's access list a new access lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPlace {
    Beginning,
    End,
}

impl MemorySsa<'_> {
    /// Materializes an access for `inst` at one end of `block`'s access
    /// list, with the given defining access. The kind (use or def) follows
    /// the oracle's classification. Does not create phis and does not
    /// re-optimize uses. If an access already existed for `inst` it is
    /// orphaned and the caller must remove it.
    pub fn create_access_in_block(
        &mut self,
        inst: InstId,
        defining: AccessId,
        block: BlockId,
        place: InsertionPlace,
    ) -> AccessId {
        let access = self.new_use_or_def(inst, defining, block);
        match place {
            InsertionPlace::Beginning => {
                // Keep the phi-first invariant.
                let position = if self.graph.phi_of(block).is_some() { 1 } else { 0 };
                self.graph.insert_in_block(block, position, access);
            }
            InsertionPlace::End => {
                self.graph.push_to_block(block, access);
            }
        }
        access
    }

    /// Materializes an access for `inst` immediately before `anchor` in its
    /// block's access list.
    pub fn create_access_before(
        &mut self,
        inst: InstId,
        defining: AccessId,
        anchor: AccessId,
    ) -> AccessId {
        let (block, position) = self.anchor_position(anchor);
        let access = self.new_use_or_def(inst, defining, block);
        self.graph.insert_in_block(block, position, access);
        access
    }

    /// Materializes an access for `inst` immediately after `anchor` in its
    /// block's access list.
    pub fn create_access_after(
        &mut self,
        inst: InstId,
        defining: AccessId,
        anchor: AccessId,
    ) -> AccessId {
        let (block, position) = self.anchor_position(anchor);
        let access = self.new_use_or_def(inst, defining, block);
        self.graph.insert_in_block(block, position + 1, access);
        access
    }

    /// Creates an empty phi for a block that has none, sized to its
    /// predecessor count with sentinel incomings.
    pub fn create_phi(&mut self, block: BlockId) -> AccessId {
        assert!(
            self.graph.phi_of(block).is_none(),
            "block {:?} already has a memory phi",
            block
        );
        let incoming: Vec<(BlockId, AccessId)> = self
            .cfg
            .preds(block)
            .iter()
            .map(|pred| (*pred, LIVE_ON_ENTRY))
            .collect();
        let version = self.fresh_version();
        let phi = self.graph.add_phi(block, version, incoming);
        self.graph.push_to_block(block, phi);
        phi
    }

    /// Sets a phi's incoming access for a predecessor block.
    pub fn set_phi_incoming(&mut self, phi: AccessId, pred: BlockId, access: AccessId) {
        self.graph.set_phi_incoming_for_block(phi, pred, access);
        self.walker.invalidate(phi);
    }

    /// Clears a use's optimized marker so the next clobber query rewalks
    /// it. Exists for tests.
    pub fn reset_optimized(&mut self, access: AccessId) {
        self.graph.reset_optimized(access);
        self.walker.invalidate(access);
    }

    /// Removes an access, rewiring its users to its own defining access so
    /// removal of a pass-through preserves SSA semantics. Removing a phi is
    /// only legal when all its incomings agree (the caller must have merged
    /// predecessor edges first).
    pub fn remove_access(&mut self, access: AccessId) {
        let node = self.graph.node(access);
        let target = match &node.kind {
            AccessKind::Use { defining, .. } | AccessKind::Def { defining, .. } => *defining,
            AccessKind::Phi { incoming, .. } => {
                let first = incoming
                    .first()
                    .map(|(_, access)| *access)
                    .unwrap_or(LIVE_ON_ENTRY);
                assert!(
                    incoming.iter().all(|(_, access)| *access == first),
                    "removing phi {:?} whose incomings disagree",
                    access
                );
                first
            }
            AccessKind::LiveOnEntry => panic!("cannot remove the live-on-entry access"),
        };

        // Rewire every user edge to the removal target; each user-list
        // entry stands for one edge.
        let users: Vec<AccessId> = self.graph.node(access).users().to_vec();
        for user in users {
            let phi_slot = match &self.graph.node(user).kind {
                AccessKind::Use { .. } | AccessKind::Def { .. } => None,
                AccessKind::Phi { incoming, .. } => {
                    let index = incoming
                        .iter()
                        .position(|(_, a)| *a == access)
                        .unwrap_or_else(|| {
                            panic!("phi {:?} listed as user of {:?} without an edge", user, access)
                        });
                    Some(index)
                }
                AccessKind::LiveOnEntry => panic!("live-on-entry cannot be a user"),
            };
            match phi_slot {
                Some(index) => self.graph.set_phi_incoming(user, index, target),
                None => self.graph.set_defining(user, target),
            }
        }

        // Unlink this access's own defining edges, then drop the node.
        let defs: Vec<AccessId> = self.graph.defs(access).map(|(def, _)| def).collect();
        for def in defs {
            self.graph.remove_user_once(def, access);
        }
        self.walker.invalidate(access);
        self.graph.remove_node(access);
    }

    /// The memory state reaching one end of a block: the last def or phi at
    /// or above it on the dominator tree. `Beginning` looks strictly above
    /// the block's own accesses.
    pub fn find_dominating_def(&self, block: BlockId, place: InsertionPlace) -> AccessId {
        let mut current = match place {
            InsertionPlace::End => Some(block),
            InsertionPlace::Beginning => self.dt.idom(block),
        };
        while let Some(block) = current {
            for access in self.graph.block_accesses(block).iter().rev() {
                let node = self.graph.node(*access);
                if node.is_def() || node.is_phi() {
                    return *access;
                }
            }
            current = self.dt.idom(block);
        }
        LIVE_ON_ENTRY
    }

    /// Whether `a` dominates `b` within one block, using the lazy local
    /// numbering. Reflexive. The first query after a mutation renumbers.
    pub fn locally_dominates(&mut self, a: AccessId, b: AccessId) -> bool {
        if a == b {
            return true;
        }
        let block_a = self.graph.node(a).block;
        let block_b = self.graph.node(b).block;
        assert!(
            block_a.is_some() && block_a == block_b,
            "locally_dominates needs two accesses of one block, got {:?} and {:?}",
            a,
            b
        );
        self.graph.local_number(a) < self.graph.local_number(b)
    }

    /// Whether `a` dominates `b`, in any pair of blocks. Live-on-entry
    /// dominates everything.
    pub fn dominates(&mut self, a: AccessId, b: AccessId) -> bool {
        if a == b || self.is_live_on_entry(a) {
            return true;
        }
        if self.is_live_on_entry(b) {
            return false;
        }
        let block_a = self.graph.node(a).block.expect("access without a block");
        let block_b = self.graph.node(b).block.expect("access without a block");
        if block_a == block_b {
            self.locally_dominates(a, b)
        } else {
            self.dt.dominates(block_a, block_b)
        }
    }

    /// Whether `a` dominates the use position of `phi`'s incoming slot
    /// `index`: the end of the incoming predecessor block.
    pub fn dominates_incoming(&self, a: AccessId, phi: AccessId, index: usize) -> bool {
        let incoming = self.graph.node(phi).phi_incoming();
        let (pred, _) = incoming
            .get(index)
            .unwrap_or_else(|| panic!("phi {:?} has no incoming {}", phi, index));
        if self.is_live_on_entry(a) {
            return true;
        }
        let block_a = self.graph.node(a).block.expect("access without a block");
        block_a == *pred || self.dt.dominates(block_a, *pred)
    }

    fn new_use_or_def(&mut self, inst: InstId, defining: AccessId, block: BlockId) -> AccessId {
        match classify(self.oracle.mod_ref(inst)) {
            AccessClass::Skip => {
                panic!("instruction {:?} does not touch memory", inst)
            }
            AccessClass::Use => self.graph.add_use(inst, defining, block),
            AccessClass::Def => {
                let version = self.fresh_version();
                self.graph.add_def(inst, defining, version, block)
            }
        }
    }

    fn anchor_position(&self, anchor: AccessId) -> (BlockId, usize) {
        let block = self
            .graph
            .node(anchor)
            .block
            .unwrap_or_else(|| panic!("anchor {:?} has no block", anchor));
        let position = self
            .graph
            .position_in_block(block, anchor)
            .unwrap_or_else(|| panic!("anchor {:?} missing from its block list", anchor));
        (block, position)
    }
}

#[cfg(test)]
#[path = "../tests/memssa/t_update.rs"]
mod tests;
