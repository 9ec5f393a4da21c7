//! Access graph node model.
//!
//! Memory accesses are arena-allocated and owned by the analysis. A node is
//! one of three variants (use, def, phi) plus the live-on-entry sentinel in
//! slot 0. Def-use back edges (user lists) and per-block ordering are side
//! tables maintained here, never by clients.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::alias::MemoryLocation;
use crate::ir::{BlockId, Function, InstId};

/// Arena slot of a memory access. Slot 0 is the live-on-entry sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccessId(pub u32);

impl AccessId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The live-on-entry sentinel: memory state on function entry.
pub const LIVE_ON_ENTRY: AccessId = AccessId(0);

/// Version id reserved for "not optimized" markers.
pub const INVALID_VERSION: u32 = 0;

/// Version id reserved for the live-on-entry sentinel. Fresh defs and phis
/// number from 1 upward and can never reach it.
pub const LIVE_ON_ENTRY_VERSION: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessKind {
    /// Memory state defined outside the function.
    LiveOnEntry,
    /// A read-only instruction. `optimized` holds the version id of the
    /// defining access at the time the use was last optimized;
    /// [`INVALID_VERSION`] means never optimized.
    Use {
        inst: InstId,
        defining: AccessId,
        optimized: u32,
    },
    /// An instruction that may modify memory.
    Def {
        inst: InstId,
        defining: AccessId,
        version: u32,
    },
    /// Merge of memory states at a CFG confluence. Incomings are parallel
    /// to the block's predecessor list.
    Phi {
        version: u32,
        incoming: Vec<(BlockId, AccessId)>,
    },
}

#[derive(Debug, Clone)]
pub struct Access {
    pub id: AccessId,
    /// `None` only for the live-on-entry sentinel.
    pub block: Option<BlockId>,
    pub kind: AccessKind,
    users: Vec<AccessId>,
}

impl Access {
    pub fn is_live_on_entry(&self) -> bool {
        matches!(self.kind, AccessKind::LiveOnEntry)
    }

    pub fn is_use(&self) -> bool {
        matches!(self.kind, AccessKind::Use { .. })
    }

    pub fn is_def(&self) -> bool {
        matches!(self.kind, AccessKind::Def { .. })
    }

    pub fn is_phi(&self) -> bool {
        matches!(self.kind, AccessKind::Phi { .. })
    }

    /// The originating instruction; `None` for phis and the sentinel.
    pub fn inst(&self) -> Option<InstId> {
        match self.kind {
            AccessKind::Use { inst, .. } | AccessKind::Def { inst, .. } => Some(inst),
            AccessKind::Phi { .. } | AccessKind::LiveOnEntry => None,
        }
    }

    /// The single defining access of a use or def.
    pub fn defining(&self) -> Option<AccessId> {
        match self.kind {
            AccessKind::Use { defining, .. } | AccessKind::Def { defining, .. } => Some(defining),
            AccessKind::Phi { .. } | AccessKind::LiveOnEntry => None,
        }
    }

    /// Version id of a def, phi, or the sentinel. Uses have none.
    pub fn version(&self) -> u32 {
        match self.kind {
            AccessKind::Def { version, .. } | AccessKind::Phi { version, .. } => version,
            AccessKind::LiveOnEntry => LIVE_ON_ENTRY_VERSION,
            AccessKind::Use { .. } => panic!("memory uses have no version id"),
        }
    }

    /// The optimized marker of a use.
    pub fn optimized_marker(&self) -> u32 {
        match self.kind {
            AccessKind::Use { optimized, .. } => optimized,
            _ => panic!("only memory uses carry an optimized marker"),
        }
    }

    pub fn phi_incoming(&self) -> &[(BlockId, AccessId)] {
        match &self.kind {
            AccessKind::Phi { incoming, .. } => incoming,
            _ => panic!("access {:?} is not a phi", self.id),
        }
    }

    /// Incoming access for a given predecessor block.
    pub fn incoming_for_block(&self, pred: BlockId) -> Option<AccessId> {
        self.phi_incoming()
            .iter()
            .find(|(block, _)| *block == pred)
            .map(|(_, access)| *access)
    }

    /// Index of a predecessor block in the incoming list.
    pub fn block_index(&self, pred: BlockId) -> Option<usize> {
        self.phi_incoming()
            .iter()
            .position(|(block, _)| *block == pred)
    }

    /// Accesses whose defining edges point here, one entry per edge.
    pub fn users(&self) -> &[AccessId] {
        &self.users
    }
}

/// Uniform iterator over an access's defining edges: the single defining
/// access for uses and defs, each incoming for phis (paired with its
/// predecessor block), nothing for the sentinel.
pub struct DefsIter<'g> {
    inner: DefsInner<'g>,
}

enum DefsInner<'g> {
    Empty,
    Single(Option<AccessId>),
    Phi(std::slice::Iter<'g, (BlockId, AccessId)>),
}

impl Iterator for DefsIter<'_> {
    type Item = (AccessId, Option<BlockId>);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            DefsInner::Empty => None,
            DefsInner::Single(slot) => slot.take().map(|access| (access, None)),
            DefsInner::Phi(iter) => iter.next().map(|(block, access)| (*access, Some(*block))),
        }
    }
}

/// Iterator over `(access, location)` pairs walking an access's defining
/// edges, translating the location's pointer across phi incomings. This is
/// the currency of the upward clobber walk.
pub struct UpwardDefsIter<'g, 'f> {
    func: &'f Function,
    defs: DefsIter<'g>,
    /// Block of the phi being stepped through, if any.
    phi_block: Option<BlockId>,
    loc: MemoryLocation,
}

impl Iterator for UpwardDefsIter<'_, '_> {
    type Item = (AccessId, MemoryLocation);

    fn next(&mut self) -> Option<Self::Item> {
        let (access, pred) = self.defs.next()?;
        let loc = match (self.phi_block, pred) {
            (Some(from), Some(to)) => match self.func.translate_value(self.loc.ptr, from, to) {
                Some(ptr) if ptr != self.loc.ptr => self.loc.with_ptr(ptr),
                _ => self.loc,
            },
            _ => self.loc,
        };
        Some((access, loc))
    }
}

/// The arena of access nodes plus every side table the analysis keeps:
/// instruction and phi lookups, per-block ordered access lists, user lists,
/// and the lazy per-block numbering used by local dominance.
pub struct AccessGraph {
    nodes: Vec<Option<Access>>,
    inst_access: IndexMap<InstId, AccessId>,
    block_accesses: IndexMap<BlockId, Vec<AccessId>>,
    phis: HashMap<BlockId, AccessId>,
    numbering: HashMap<AccessId, u64>,
    numbering_valid: HashSet<BlockId>,
}

impl AccessGraph {
    pub fn new() -> Self {
        let live_on_entry = Access {
            id: LIVE_ON_ENTRY,
            block: None,
            kind: AccessKind::LiveOnEntry,
            users: Vec::new(),
        };
        Self {
            nodes: vec![Some(live_on_entry)],
            inst_access: IndexMap::new(),
            block_accesses: IndexMap::new(),
            phis: HashMap::new(),
            numbering: HashMap::new(),
            numbering_valid: HashSet::new(),
        }
    }

    pub fn node(&self, id: AccessId) -> &Access {
        self.nodes
            .get(id.index())
            .and_then(|slot| slot.as_ref())
            .unwrap_or_else(|| panic!("access {:?} does not exist or was removed", id))
    }

    pub fn get(&self, id: AccessId) -> Option<&Access> {
        self.nodes.get(id.index()).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: AccessId) -> &mut Access {
        self.nodes
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
            .unwrap_or_else(|| panic!("access {:?} does not exist or was removed", id))
    }

    /// All live accesses in arena order, sentinel excluded.
    pub fn iter(&self) -> impl Iterator<Item = &Access> {
        self.nodes
            .iter()
            .skip(1)
            .filter_map(|slot| slot.as_ref())
    }

    /// The access for an instruction, if the instruction touches memory.
    pub fn access_of(&self, inst: InstId) -> Option<AccessId> {
        self.inst_access.get(&inst).copied()
    }

    /// The block's phi, if it has one.
    pub fn phi_of(&self, block: BlockId) -> Option<AccessId> {
        self.phis.get(&block).copied()
    }

    /// The ordered access list of a block; phi first if present.
    pub fn block_accesses(&self, block: BlockId) -> &[AccessId] {
        self.block_accesses
            .get(&block)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Blocks that have at least one access, in creation order.
    pub fn blocks_with_accesses(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.block_accesses.keys().copied()
    }

    pub fn defs(&self, id: AccessId) -> DefsIter<'_> {
        let inner = match &self.node(id).kind {
            AccessKind::LiveOnEntry => DefsInner::Empty,
            AccessKind::Use { defining, .. } | AccessKind::Def { defining, .. } => {
                DefsInner::Single(Some(*defining))
            }
            AccessKind::Phi { incoming, .. } => DefsInner::Phi(incoming.iter()),
        };
        DefsIter { inner }
    }

    /// Defining edges of `id` paired with `loc` translated across each phi
    /// edge where the IR can rewrite the pointer.
    pub fn upward_defs<'g, 'f>(
        &'g self,
        func: &'f Function,
        id: AccessId,
        loc: MemoryLocation,
    ) -> UpwardDefsIter<'g, 'f> {
        let node = self.node(id);
        let phi_block = if node.is_phi() { node.block } else { None };
        UpwardDefsIter {
            func,
            defs: self.defs(id),
            phi_block,
            loc,
        }
    }

    /// Whether a use's recorded optimization is still current: its marker
    /// matches the present defining access's version id.
    pub fn is_optimized(&self, id: AccessId) -> bool {
        match self.node(id).kind {
            AccessKind::Use {
                defining,
                optimized,
                ..
            } => optimized != INVALID_VERSION && optimized == self.node(defining).version(),
            _ => false,
        }
    }

    fn alloc(&mut self, block: Option<BlockId>, kind: AccessKind) -> AccessId {
        let id = AccessId(self.nodes.len() as u32);
        self.nodes.push(Some(Access {
            id,
            block,
            kind,
            users: Vec::new(),
        }));
        id
    }

    pub(super) fn add_use(&mut self, inst: InstId, defining: AccessId, block: BlockId) -> AccessId {
        let id = self.alloc(
            Some(block),
            AccessKind::Use {
                inst,
                defining,
                optimized: INVALID_VERSION,
            },
        );
        self.add_user(defining, id);
        self.inst_access.insert(inst, id);
        id
    }

    pub(super) fn add_def(
        &mut self,
        inst: InstId,
        defining: AccessId,
        version: u32,
        block: BlockId,
    ) -> AccessId {
        let id = self.alloc(
            Some(block),
            AccessKind::Def {
                inst,
                defining,
                version,
            },
        );
        self.add_user(defining, id);
        self.inst_access.insert(inst, id);
        id
    }

    pub(super) fn add_phi(
        &mut self,
        block: BlockId,
        version: u32,
        incoming: Vec<(BlockId, AccessId)>,
    ) -> AccessId {
        assert!(
            !self.phis.contains_key(&block),
            "block {:?} already has a memory phi",
            block
        );
        let sources: Vec<AccessId> = incoming.iter().map(|(_, access)| *access).collect();
        let id = self.alloc(Some(block), AccessKind::Phi { version, incoming });
        for source in sources {
            self.add_user(source, id);
        }
        self.phis.insert(block, id);
        id
    }

    /// Rewrites the defining edge of a use or def, keeping user lists
    /// symmetric.
    pub(super) fn set_defining(&mut self, id: AccessId, new_defining: AccessId) {
        let old = match &mut self.node_mut(id).kind {
            AccessKind::Use { defining, .. } | AccessKind::Def { defining, .. } => {
                std::mem::replace(defining, new_defining)
            }
            _ => panic!("access {:?} has no defining edge", id),
        };
        self.remove_user_once(old, id);
        self.add_user(new_defining, id);
    }

    /// Records that a use was optimized to its current defining access.
    pub(super) fn mark_optimized(&mut self, id: AccessId) {
        let defining = self
            .node(id)
            .defining()
            .unwrap_or_else(|| panic!("access {:?} is not a use", id));
        let marker = self.node(defining).version();
        match &mut self.node_mut(id).kind {
            AccessKind::Use { optimized, .. } => *optimized = marker,
            _ => panic!("access {:?} is not a use", id),
        }
    }

    /// Clears a use's optimized marker so the walker rewalks it.
    pub(super) fn reset_optimized(&mut self, id: AccessId) {
        match &mut self.node_mut(id).kind {
            AccessKind::Use { optimized, .. } => *optimized = INVALID_VERSION,
            _ => panic!("access {:?} is not a use", id),
        }
    }

    /// Rewrites one phi incoming slot, keeping user lists symmetric.
    pub(super) fn set_phi_incoming(&mut self, phi: AccessId, index: usize, new: AccessId) {
        let old = match &mut self.node_mut(phi).kind {
            AccessKind::Phi { incoming, .. } => {
                std::mem::replace(&mut incoming[index].1, new)
            }
            _ => panic!("access {:?} is not a phi", phi),
        };
        self.remove_user_once(old, phi);
        self.add_user(new, phi);
    }

    /// Rewrites the phi incoming slot for a predecessor block.
    pub(super) fn set_phi_incoming_for_block(
        &mut self,
        phi: AccessId,
        pred: BlockId,
        new: AccessId,
    ) {
        let index = self
            .node(phi)
            .block_index(pred)
            .unwrap_or_else(|| panic!("phi {:?} has no incoming from {:?}", phi, pred));
        self.set_phi_incoming(phi, index, new);
    }

    /// Appends an access to its block's list; phis go to the front.
    pub(super) fn push_to_block(&mut self, block: BlockId, id: AccessId) {
        let is_phi = self.node(id).is_phi();
        let list = self.block_accesses.entry(block).or_default();
        if is_phi {
            list.insert(0, id);
        } else {
            list.push(id);
        }
        self.invalidate_numbering(block);
    }

    /// Splices an access into its block's list at `position`.
    pub(super) fn insert_in_block(&mut self, block: BlockId, position: usize, id: AccessId) {
        let list = self.block_accesses.entry(block).or_default();
        list.insert(position, id);
        self.invalidate_numbering(block);
    }

    /// Position of an access within its block's list.
    pub(super) fn position_in_block(&self, block: BlockId, id: AccessId) -> Option<usize> {
        self.block_accesses(block).iter().position(|a| *a == id)
    }

    /// Unlinks an access node: drops it from its block list, the lookup
    /// tables, and the arena. The caller must already have rewired its
    /// users and unlinked its own defining edges.
    pub(super) fn remove_node(&mut self, id: AccessId) -> Access {
        assert!(id != LIVE_ON_ENTRY, "cannot remove the live-on-entry access");
        let node = self.nodes[id.index()]
            .take()
            .unwrap_or_else(|| panic!("access {:?} does not exist or was removed", id));
        assert!(
            node.users.is_empty(),
            "removing access {:?} which still has users",
            id
        );

        if let Some(block) = node.block {
            if let Some(list) = self.block_accesses.get_mut(&block) {
                list.retain(|a| *a != id);
            }
            self.invalidate_numbering(block);
        }
        if let Some(inst) = node.inst() {
            if self.inst_access.get(&inst) == Some(&id) {
                self.inst_access.shift_remove(&inst);
            }
        }
        if node.is_phi() {
            if let Some(block) = node.block {
                self.phis.remove(&block);
            }
        }
        node
    }

    pub(super) fn add_user(&mut self, target: AccessId, user: AccessId) {
        self.node_mut(target).users.push(user);
    }

    pub(super) fn remove_user_once(&mut self, target: AccessId, user: AccessId) {
        let users = &mut self.node_mut(target).users;
        let position = users
            .iter()
            .position(|u| *u == user)
            .unwrap_or_else(|| panic!("access {:?} is not a user of {:?}", user, target));
        users.remove(position);
    }

    /// Local order number of an access, renumbering its block on demand.
    pub(super) fn local_number(&mut self, id: AccessId) -> u64 {
        let block = self
            .node(id)
            .block
            .unwrap_or_else(|| panic!("access {:?} has no block", id));
        if !self.numbering_valid.contains(&block) {
            let list: Vec<AccessId> = self.block_accesses(block).to_vec();
            for (position, access) in list.into_iter().enumerate() {
                self.numbering.insert(access, position as u64 + 1);
            }
            self.numbering_valid.insert(block);
        }
        *self
            .numbering
            .get(&id)
            .unwrap_or_else(|| panic!("access {:?} missing from its block numbering", id))
    }

    pub(super) fn invalidate_numbering(&mut self, block: BlockId) {
        self.numbering_valid.remove(&block);
    }
}

impl Default for AccessGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/memssa/t_access.rs"]
mod tests;
