//! Mod-ref classification and the may-alias oracle.
//!
//! The analysis only ever asks two things about the IR's memory behavior:
//! how an instruction touches memory (mod-ref) and whether two accesses can
//! touch the same memory (may-alias). Both are answered behind the
//! [`AliasOracle`] trait; [`StackAliasOracle`] is the provided
//! implementation, partitioning memory by allocation root.

use std::collections::HashMap;

use crate::ir::{ConstValue, Function, InstId, InstKind, ValueId};

/// How an instruction interacts with memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModRef {
    NoModRef,
    Ref,
    Mod,
    ModRef,
}

/// What kind of access node an instruction gets, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClass {
    Skip,
    Use,
    Def,
}

/// Maps mod-ref info to the access node kind: reads become uses, anything
/// that may write becomes a def.
pub fn classify(mod_ref: ModRef) -> AccessClass {
    match mod_ref {
        ModRef::NoModRef => AccessClass::Skip,
        ModRef::Ref => AccessClass::Use,
        ModRef::Mod | ModRef::ModRef => AccessClass::Def,
    }
}

/// The memory a single access touches, identified by its pointer. The
/// oracle is field-insensitive, so a location is just its pointer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryLocation {
    pub ptr: ValueId,
}

impl MemoryLocation {
    pub fn new(ptr: ValueId) -> Self {
        Self { ptr }
    }

    /// The location an instruction accesses; `None` for calls and
    /// non-memory instructions.
    pub fn of_inst(kind: &InstKind) -> Option<Self> {
        match kind {
            InstKind::Load { ptr } | InstKind::Store { ptr, .. } => Some(Self { ptr: *ptr }),
            _ => None,
        }
    }

    pub fn with_ptr(self, ptr: ValueId) -> Self {
        Self { ptr }
    }
}

/// Alias queries the analysis needs. Implementations must answer
/// conservatively: when in doubt, accesses may alias.
pub trait AliasOracle {
    /// Mod-ref classification of an instruction.
    fn mod_ref(&self, inst: InstId) -> ModRef;

    /// Whether the memory `a` writes may overlap the memory `b` touches.
    fn may_alias_inst(&self, a: InstId, b: InstId) -> bool;

    /// Whether the memory `a` writes may overlap `loc`.
    fn may_alias_loc(&self, a: InstId, loc: MemoryLocation) -> bool;
}

/// Memory behavior of a called function, keyed by callee name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEffect {
    /// Touches no memory visible to the caller.
    Pure,
    /// May read any memory, writes none.
    ReadOnly,
    /// May read and write any memory.
    ReadWrite,
    /// Returns fresh memory disjoint from every other allocation and
    /// writes only that memory (an allocator).
    Alloc,
}

/// Allocation root of a pointer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    Local(u32),
    Global(u32),
    /// Result of an allocator call, keyed by the call instruction.
    Alloc(u32),
    Unknown,
}

fn roots_alias(a: Root, b: Root) -> bool {
    match (a, b) {
        (Root::Unknown, _) | (_, Root::Unknown) => true,
        _ => a == b,
    }
}

#[derive(Debug, Clone, Copy)]
struct InstSummary {
    mod_ref: ModRef,
    /// Root of the accessed location; `None` when the instruction has no
    /// single location (calls).
    root: Option<Root>,
}

/// A field-insensitive oracle that partitions memory by allocation root:
/// distinct stack slots never overlap, distinct globals never overlap, and
/// pointers of unknown provenance may alias anything. Call behavior is
/// looked up in a per-callee effect table, defaulting to read-write.
pub struct StackAliasOracle {
    value_roots: HashMap<ValueId, Root>,
    summaries: HashMap<InstId, InstSummary>,
}

impl StackAliasOracle {
    pub fn new(func: &Function) -> Self {
        Self::with_call_effects(func, &HashMap::new())
    }

    /// Builds the oracle with explicit call effects, e.g. to mark a callee
    /// read-only so its call sites become uses.
    pub fn with_call_effects(func: &Function, call_effects: &HashMap<String, CallEffect>) -> Self {
        let mut value_roots = HashMap::new();

        // Block params and call results are unknown; address computations
        // inherit their base's root. Bases dominate their uses, so a few
        // passes over the blocks reach the fixed point.
        for block in &func.blocks {
            for param in &block.params {
                value_roots.insert(*param, Root::Unknown);
            }
        }
        let mut changed = true;
        while changed {
            changed = false;
            for block in &func.blocks {
                for inst in &block.insts {
                    let Some(result) = inst.result else {
                        continue;
                    };
                    let root = match &inst.kind {
                        InstKind::AddrOfLocal { local } => Root::Local(local.0),
                        InstKind::Const {
                            value: ConstValue::GlobalAddr { id },
                        } => Root::Global(id.0),
                        InstKind::FieldAddr { base, .. } => match value_roots.get(base) {
                            Some(root) => *root,
                            None => continue,
                        },
                        InstKind::Call { callee, .. }
                            if call_effects.get(callee) == Some(&CallEffect::Alloc) =>
                        {
                            Root::Alloc(inst.id.0)
                        }
                        _ => Root::Unknown,
                    };
                    if value_roots.get(&result) != Some(&root) {
                        value_roots.insert(result, root);
                        changed = true;
                    }
                }
            }
        }

        let mut summaries = HashMap::new();
        for block in &func.blocks {
            for inst in &block.insts {
                let summary = match &inst.kind {
                    InstKind::Load { ptr } => InstSummary {
                        mod_ref: ModRef::Ref,
                        root: Some(root_of(&value_roots, *ptr)),
                    },
                    InstKind::Store { ptr, .. } => InstSummary {
                        mod_ref: ModRef::Mod,
                        root: Some(root_of(&value_roots, *ptr)),
                    },
                    InstKind::Call { callee, .. } => {
                        let effect = call_effects
                            .get(callee)
                            .copied()
                            .unwrap_or(CallEffect::ReadWrite);
                        match effect {
                            CallEffect::Pure => InstSummary {
                                mod_ref: ModRef::NoModRef,
                                root: None,
                            },
                            CallEffect::ReadOnly => InstSummary {
                                mod_ref: ModRef::Ref,
                                root: None,
                            },
                            CallEffect::ReadWrite => InstSummary {
                                mod_ref: ModRef::ModRef,
                                root: None,
                            },
                            // An allocator only writes the memory it hands
                            // back, so its location is its own fresh root.
                            CallEffect::Alloc => InstSummary {
                                mod_ref: ModRef::Mod,
                                root: Some(Root::Alloc(inst.id.0)),
                            },
                        }
                    }
                    _ => InstSummary {
                        mod_ref: ModRef::NoModRef,
                        root: None,
                    },
                };
                summaries.insert(inst.id, summary);
            }
        }

        Self {
            value_roots,
            summaries,
        }
    }

    fn summary(&self, inst: InstId) -> InstSummary {
        self.summaries
            .get(&inst)
            .copied()
            .unwrap_or_else(|| panic!("alias oracle does not know instruction {:?}", inst))
    }
}

fn root_of(value_roots: &HashMap<ValueId, Root>, value: ValueId) -> Root {
    value_roots.get(&value).copied().unwrap_or(Root::Unknown)
}

impl AliasOracle for StackAliasOracle {
    fn mod_ref(&self, inst: InstId) -> ModRef {
        self.summary(inst).mod_ref
    }

    fn may_alias_inst(&self, a: InstId, b: InstId) -> bool {
        let sa = self.summary(a);
        let sb = self.summary(b);
        if sa.mod_ref == ModRef::NoModRef || sb.mod_ref == ModRef::NoModRef {
            return false;
        }
        match (sa.root, sb.root) {
            (Some(ra), Some(rb)) => roots_alias(ra, rb),
            // A call may touch anything it can reach.
            _ => true,
        }
    }

    fn may_alias_loc(&self, a: InstId, loc: MemoryLocation) -> bool {
        let sa = self.summary(a);
        if sa.mod_ref == ModRef::NoModRef {
            return false;
        }
        match sa.root {
            Some(ra) => roots_alias(ra, root_of(&self.value_roots, loc.ptr)),
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "../tests/t_alias.rs"]
mod tests;
