//! The use optimizer.
//!
//! One forward sweep after renaming that retargets every use's defining
//! edge from the syntactically nearest state to the nearest access that can
//! actually clobber it. The walk ascends the defining-edge chain, skipping
//! defs the oracle proves disjoint; phis and live-on-entry terminate it.
//! Queries are never pushed through phis here; that refinement belongs to
//! the on-demand walker.

use crate::alias::{AliasOracle, MemoryLocation};
use crate::ir::InstId;

use super::access::{AccessId, AccessKind};
use super::build::MemorySsa;

pub(super) fn optimize_uses(mssa: &mut MemorySsa<'_>) {
    let uses: Vec<AccessId> = mssa
        .graph
        .iter()
        .filter(|node| node.is_use())
        .map(|node| node.id)
        .collect();
    for access in uses {
        optimize_use(mssa, access);
    }
}

fn optimize_use(mssa: &mut MemorySsa<'_>, access: AccessId) {
    let node = mssa.graph.node(access);
    let inst = node
        .inst()
        .unwrap_or_else(|| panic!("use {:?} has no instruction", access));
    let loc = mssa.location_of(inst);

    let mut current = node
        .defining()
        .unwrap_or_else(|| panic!("use {:?} has no defining edge", access));
    loop {
        match &mssa.graph.node(current).kind {
            // Both count as clobbers: live-on-entry may be defined outside
            // the function, and the bulk pass does not look through phis.
            AccessKind::LiveOnEntry | AccessKind::Phi { .. } => break,
            AccessKind::Def {
                inst: def_inst,
                defining,
                ..
            } => {
                if def_clobbers(mssa.oracle, *def_inst, inst, loc) {
                    break;
                }
                current = *defining;
            }
            AccessKind::Use { .. } => {
                panic!("defining edge of {:?} reaches a use", access)
            }
        }
    }

    mssa.graph.set_defining(access, current);
    mssa.graph.mark_optimized(access);
}

/// Whether the memory written by `def_inst` may overlap what `other_inst`
/// accesses. Prefers the probed location when one exists (it may have been
/// phi-translated); instruction-level queries cover calls.
pub(super) fn def_clobbers(
    oracle: &dyn AliasOracle,
    def_inst: InstId,
    other_inst: InstId,
    loc: Option<MemoryLocation>,
) -> bool {
    match loc {
        Some(loc) => oracle.may_alias_loc(def_inst, loc),
        None => oracle.may_alias_inst(def_inst, other_inst),
    }
}

impl MemorySsa<'_> {
    /// Whether `def` may clobber `other`, both given as accesses. The def
    /// must be a [`AccessKind::Def`]; the other may be a use or a def.
    pub fn def_clobbers_use_or_def(&self, def: AccessId, other: AccessId) -> bool {
        let def_inst = match self.graph.node(def).kind {
            AccessKind::Def { inst, .. } => inst,
            _ => panic!("{:?} is not a memory def", def),
        };
        let other_inst = self
            .graph
            .node(other)
            .inst()
            .unwrap_or_else(|| panic!("{:?} has no instruction", other));
        def_clobbers(self.oracle, def_inst, other_inst, self.location_of(other_inst))
    }
}

#[cfg(test)]
#[path = "../tests/memssa/t_optimize.rs"]
mod tests;
