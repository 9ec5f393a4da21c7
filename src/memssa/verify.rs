//! Memory SSA self-checks.
//!
//! Never fails during normal operation; exists so tests and debugging
//! transformations can confirm the graph is still well-formed after
//! mutation. First failure wins and names the offending access.

use thiserror::Error;

use crate::alias::{classify, AccessClass};
use crate::ir::BlockId;

use super::access::{AccessId, AccessKind};
use super::build::MemorySsa;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("def-use symmetry broken: {user:?} is on the user list of {access:?} but has no defining edge to it")]
    MissingDefEdge { access: AccessId, user: AccessId },

    #[error("def-use symmetry broken: {access:?} has a defining edge to {defining:?} but is not on its user list")]
    MissingUserEntry {
        access: AccessId,
        defining: AccessId,
    },

    #[error("domination broken: defining access {defining:?} does not dominate {access:?}")]
    Domination {
        access: AccessId,
        defining: AccessId,
    },

    #[error("domination broken: incoming {incoming:?} of {phi:?} does not dominate the end of {pred:?}")]
    PhiIncomingDomination {
        phi: AccessId,
        pred: BlockId,
        incoming: AccessId,
    },

    #[error("phi arity broken: {phi:?} in {block:?} has {incoming} incomings for {preds} predecessors")]
    PhiArity {
        phi: AccessId,
        block: BlockId,
        incoming: usize,
        preds: usize,
    },

    #[error("coverage broken: memory instruction {position} of {block:?} has no access")]
    MissingAccess { block: BlockId, position: usize },

    #[error("ordering broken in {block:?} at position {position}: expected {expected:?}, found {found:?}")]
    Ordering {
        block: BlockId,
        position: usize,
        expected: Option<AccessId>,
        found: Option<AccessId>,
    },
}

impl MemorySsa<'_> {
    /// Checks that the analysis is self-consistent: def-use edges are
    /// symmetric, definitions dominate their uses, and per-block access
    /// lists match instruction order.
    pub fn verify(&self) -> Result<(), VerifyError> {
        self.verify_def_uses()?;
        self.verify_domination()?;
        self.verify_ordering()?;
        Ok(())
    }

    /// Every defining edge has a matching user-list entry and vice versa.
    fn verify_def_uses(&self) -> Result<(), VerifyError> {
        for node in self.graph.iter() {
            for (defining, _) in self.graph.defs(node.id) {
                if !self.graph.node(defining).users().contains(&node.id) {
                    return Err(VerifyError::MissingUserEntry {
                        access: node.id,
                        defining,
                    });
                }
            }
        }
        let sentinel = self.live_on_entry();
        for node in self
            .graph
            .iter()
            .chain(std::iter::once(self.graph.node(sentinel)))
        {
            for user in node.users() {
                let points_back = self
                    .graph
                    .defs(*user)
                    .any(|(defining, _)| defining == node.id);
                if !points_back {
                    return Err(VerifyError::MissingDefEdge {
                        access: node.id,
                        user: *user,
                    });
                }
            }
        }
        Ok(())
    }

    /// Every defining access dominates its user's position; phi incomings
    /// dominate the end of their predecessor block.
    fn verify_domination(&self) -> Result<(), VerifyError> {
        for node in self.graph.iter() {
            match &node.kind {
                AccessKind::Use { defining, .. } | AccessKind::Def { defining, .. } => {
                    if !self.dominates_position(*defining, node.id) {
                        return Err(VerifyError::Domination {
                            access: node.id,
                            defining: *defining,
                        });
                    }
                }
                AccessKind::Phi { incoming, .. } => {
                    for (pred, access) in incoming {
                        if self.is_live_on_entry(*access) {
                            continue;
                        }
                        let block = self
                            .graph
                            .node(*access)
                            .block
                            .expect("access without a block");
                        if block != *pred && !self.dt.dominates(block, *pred) {
                            return Err(VerifyError::PhiIncomingDomination {
                                phi: node.id,
                                pred: *pred,
                                incoming: *access,
                            });
                        }
                    }
                }
                AccessKind::LiveOnEntry => {}
            }
        }
        Ok(())
    }

    /// Access lists hold the phi first, then exactly the block's memory
    /// instructions in instruction order.
    fn verify_ordering(&self) -> Result<(), VerifyError> {
        for block in &self.func.blocks {
            let mut expected = Vec::new();
            if let Some(phi) = self.graph.phi_of(block.id) {
                let preds = self.cfg().preds(block.id).len();
                let incoming = self.graph.node(phi).phi_incoming().len();
                if incoming != preds {
                    return Err(VerifyError::PhiArity {
                        phi,
                        block: block.id,
                        incoming,
                        preds,
                    });
                }
                expected.push(phi);
            }
            for (position, inst) in block.insts.iter().enumerate() {
                if classify(self.oracle.mod_ref(inst.id)) == AccessClass::Skip {
                    continue;
                }
                match self.graph.access_of(inst.id) {
                    Some(access) => expected.push(access),
                    None => {
                        return Err(VerifyError::MissingAccess {
                            block: block.id,
                            position,
                        })
                    }
                }
            }

            let actual = self.graph.block_accesses(block.id);
            let len = expected.len().max(actual.len());
            for position in 0..len {
                let want = expected.get(position).copied();
                let have = actual.get(position).copied();
                if want != have {
                    return Err(VerifyError::Ordering {
                        block: block.id,
                        position,
                        expected: want,
                        found: have,
                    });
                }
            }
        }
        Ok(())
    }

    /// Dominance of `defining` over `access`'s in-block position, without
    /// touching the lazy numbering (the verifier must not trust caches).
    fn dominates_position(&self, defining: AccessId, access: AccessId) -> bool {
        if self.is_live_on_entry(defining) {
            return true;
        }
        let def_block = self
            .graph
            .node(defining)
            .block
            .expect("access without a block");
        let use_block = self
            .graph
            .node(access)
            .block
            .expect("access without a block");
        if def_block != use_block {
            return self.dt.dominates(def_block, use_block);
        }
        let list = self.graph.block_accesses(def_block);
        let def_position = list.iter().position(|a| *a == defining);
        let use_position = list.iter().position(|a| *a == access);
        match (def_position, use_position) {
            (Some(def_position), Some(use_position)) => def_position < use_position,
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "../tests/memssa/t_verify.rs"]
mod tests;
