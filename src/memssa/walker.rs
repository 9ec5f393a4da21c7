//! The clobber walker.
//!
//! Answers on-demand clobber queries: given an access (optionally with a
//! location distinct from its own), find the nearest dominating access that
//! may modify that memory. The caching walker memoizes results and must be
//! told when an access is mutated; the trivial walker answers with defining
//! edges verbatim and exists for tests.

use std::collections::{HashMap, HashSet};

use crate::alias::{AliasOracle, MemoryLocation};
use crate::analysis::DomTree;
use crate::ir::{Function, InstId};

use super::access::{AccessGraph, AccessId, AccessKind, LIVE_ON_ENTRY};
use super::build::MemorySsa;
use super::optimize::def_clobbers;

/// What a walker sees of the analysis: the graph plus the collaborators
/// needed to test aliasing and dominance during the walk.
pub struct WalkCtx<'c> {
    pub(super) func: &'c Function,
    pub(super) dt: &'c DomTree,
    pub(super) oracle: &'c dyn AliasOracle,
    pub(super) graph: &'c mut AccessGraph,
}

/// The walker capability: clobber queries plus cache invalidation.
pub trait Walker {
    /// Nearest dominating clobber of the memory `start` accesses, from the
    /// use-side perspective: for a def this is the def's own reaching
    /// clobber, never the def itself. Phis are returned as-is.
    fn clobber(&mut self, cx: &mut WalkCtx<'_>, start: AccessId) -> AccessId;

    /// Like [`Walker::clobber`] but probing an explicit location, e.g. a
    /// phi-translated pointer. A def that itself clobbers `loc` is
    /// returned directly. With a location in hand the walk may push
    /// through phis, translating as it goes.
    fn clobber_at(&mut self, cx: &mut WalkCtx<'_>, start: AccessId, loc: MemoryLocation)
        -> AccessId;

    /// Forget anything cached about `access`.
    fn invalidate(&mut self, _access: AccessId) {}
}

/// Handle for running walker queries against the analysis.
pub struct WalkerHandle<'m, 'a> {
    mssa: &'m mut MemorySsa<'a>,
}

impl<'a> MemorySsa<'a> {
    /// The walker handle for on-demand clobber queries.
    pub fn walker(&mut self) -> WalkerHandle<'_, 'a> {
        WalkerHandle { mssa: self }
    }
}

impl WalkerHandle<'_, '_> {
    /// Clobber query for a memory-touching instruction.
    pub fn clobber(&mut self, inst: InstId) -> AccessId {
        let access = self
            .mssa
            .access_of(inst)
            .unwrap_or_else(|| panic!("instruction {:?} has no memory access", inst));
        self.clobber_access(access)
    }

    /// Clobber query for an access.
    pub fn clobber_access(&mut self, access: AccessId) -> AccessId {
        let (walker, mut cx) = self.mssa.walk_parts();
        walker.clobber(&mut cx, access)
    }

    /// Clobber query for an access probing an explicit location.
    pub fn clobber_access_at(&mut self, access: AccessId, loc: MemoryLocation) -> AccessId {
        let (walker, mut cx) = self.mssa.walk_parts();
        walker.clobber_at(&mut cx, access, loc)
    }

    /// Invalidates cached walker state about an access. The mutation API
    /// calls this; clients only need it for out-of-band changes.
    pub fn invalidate(&mut self, access: AccessId) {
        let (walker, _) = self.mssa.walk_parts();
        walker.invalidate(access);
    }
}

/// The default walker: walks upward skipping defs the oracle proves
/// disjoint, memoizing every answer by `(start, location)`.
pub struct CachingWalker {
    cache: HashMap<(AccessId, Option<MemoryLocation>), AccessId>,
}

impl CachingWalker {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }
}

impl Default for CachingWalker {
    fn default() -> Self {
        Self::new()
    }
}

impl Walker for CachingWalker {
    fn clobber(&mut self, cx: &mut WalkCtx<'_>, start: AccessId) -> AccessId {
        if let Some(hit) = self.cache.get(&(start, None)) {
            return *hit;
        }

        let node = cx.graph.node(start);
        let result = match node.kind {
            AccessKind::LiveOnEntry | AccessKind::Phi { .. } => start,
            AccessKind::Use { defining, .. } => {
                if cx.graph.is_optimized(start) {
                    defining
                } else {
                    let inst = node.inst().expect("use without instruction");
                    let loc = location_of(cx.func, inst);
                    let result = walk_chain(cx, defining, inst, loc);
                    // Record the walk the same way the bulk optimizer does,
                    // so a stale use heals on first query.
                    cx.graph.set_defining(start, result);
                    cx.graph.mark_optimized(start);
                    result
                }
            }
            AccessKind::Def { defining, inst, .. } => {
                let loc = location_of(cx.func, inst);
                walk_chain(cx, defining, inst, loc)
            }
        };

        self.cache.insert((start, None), result);
        result
    }

    fn clobber_at(
        &mut self,
        cx: &mut WalkCtx<'_>,
        start: AccessId,
        loc: MemoryLocation,
    ) -> AccessId {
        let key = (start, Some(loc));
        if let Some(hit) = self.cache.get(&key) {
            return *hit;
        }

        let mut visited = HashSet::new();
        let result = match cx.graph.node(start).kind {
            AccessKind::LiveOnEntry => start,
            AccessKind::Def { inst, defining, .. } => {
                if cx.oracle.may_alias_loc(inst, loc) {
                    start
                } else {
                    walk_at(cx, defining, loc, &mut visited)
                }
            }
            AccessKind::Use { defining, .. } => walk_at(cx, defining, loc, &mut visited),
            AccessKind::Phi { .. } => walk_at(cx, start, loc, &mut visited),
        };

        self.cache.insert(key, result);
        result
    }

    fn invalidate(&mut self, access: AccessId) {
        self.cache
            .retain(|(start, _), result| *start != access && *result != access);
    }
}

/// A walker that does no alias queries at all: clobbers are defining edges
/// exactly as the builder (and bulk optimizer) left them.
pub struct DoNothingWalker;

impl Walker for DoNothingWalker {
    fn clobber(&mut self, cx: &mut WalkCtx<'_>, start: AccessId) -> AccessId {
        match cx.graph.node(start).kind {
            AccessKind::Use { defining, .. } | AccessKind::Def { defining, .. } => defining,
            AccessKind::Phi { .. } | AccessKind::LiveOnEntry => start,
        }
    }

    fn clobber_at(
        &mut self,
        cx: &mut WalkCtx<'_>,
        start: AccessId,
        _loc: MemoryLocation,
    ) -> AccessId {
        self.clobber(cx, start)
    }
}

fn location_of(func: &Function, inst: InstId) -> Option<MemoryLocation> {
    let (inst, _) = func
        .inst(inst)
        .unwrap_or_else(|| panic!("instruction {:?} is not in the function", inst));
    MemoryLocation::of_inst(&inst.kind)
}

/// Upward walk for a query anchored at an instruction. Stops at phis.
fn walk_chain(
    cx: &WalkCtx<'_>,
    mut current: AccessId,
    query_inst: InstId,
    loc: Option<MemoryLocation>,
) -> AccessId {
    loop {
        match cx.graph.node(current).kind {
            AccessKind::LiveOnEntry | AccessKind::Phi { .. } => return current,
            AccessKind::Def { inst, defining, .. } => {
                if def_clobbers(cx.oracle, inst, query_inst, loc) {
                    return current;
                }
                current = defining;
            }
            // Uses are never clobbers; step over them.
            AccessKind::Use { defining, .. } => current = defining,
        }
    }
}

/// Upward walk probing an explicit location. At a phi the walk recurses
/// into each incoming edge with the translated location: if every path
/// resolves to live-on-entry the phi is bypassed, if all paths agree on a
/// single clobber dominating the phi that clobber is returned, otherwise
/// the phi stands in for the clobber. Back-edges revisit and stand.
fn walk_at(
    cx: &WalkCtx<'_>,
    mut current: AccessId,
    loc: MemoryLocation,
    visited: &mut HashSet<AccessId>,
) -> AccessId {
    loop {
        match &cx.graph.node(current).kind {
            AccessKind::LiveOnEntry => return current,
            AccessKind::Use { defining, .. } => current = *defining,
            AccessKind::Def { inst, defining, .. } => {
                if cx.oracle.may_alias_loc(*inst, loc) {
                    return current;
                }
                current = *defining;
            }
            AccessKind::Phi { .. } => {
                if !visited.insert(current) {
                    return current;
                }
                let phi_block = cx
                    .graph
                    .node(current)
                    .block
                    .expect("phi without a block");
                let edges: Vec<(AccessId, MemoryLocation)> =
                    cx.graph.upward_defs(cx.func, current, loc).collect();
                let mut resolved = Vec::with_capacity(edges.len());
                for (incoming, incoming_loc) in edges {
                    resolved.push(walk_at(cx, incoming, incoming_loc, visited));
                }

                if resolved.iter().all(|r| *r == LIVE_ON_ENTRY) {
                    return LIVE_ON_ENTRY;
                }
                let first = resolved[0];
                if resolved.iter().all(|r| *r == first) {
                    if let Some(block) = cx.graph.node(first).block {
                        if block != phi_block && cx.dt.dominates(block, phi_block) {
                            return first;
                        }
                    }
                }
                return current;
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/memssa/t_walker.rs"]
mod tests;
