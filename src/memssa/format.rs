//! Annotated text form of the analysis.
//!
//! Renders the function with each memory instruction annotated with its
//! access: `; N = MemoryDef(M)` above defs, `; MemoryUse(M)` above uses,
//! and `; N = MemoryPhi({bbK, M}, ...)` at the top of blocks that merge
//! memory states. The sentinel prints as `liveOnEntry` wherever an id
//! would go.

use std::fmt::Write as _;

use crate::ir::format::{inst_text, term_text};
use crate::ir::Function;

use super::access::{AccessGraph, AccessId, AccessKind};
use super::build::MemorySsa;

/// Renders the function annotated with its memory accesses.
pub fn format_memssa(func: &Function, mssa: &MemorySsa<'_>) -> String {
    let graph = mssa.graph();
    let mut out = String::new();
    let _ = writeln!(&mut out, "fn {} {{", func.name);

    for (index, block) in func.blocks.iter().enumerate() {
        if index > 0 {
            let _ = writeln!(&mut out);
        }
        let _ = write!(&mut out, "  bb{}(", block.id.0);
        for (i, param) in block.params.iter().enumerate() {
            if i > 0 {
                let _ = write!(&mut out, ", ");
            }
            let _ = write!(&mut out, "%v{}", param.0);
        }
        let _ = writeln!(&mut out, "):");

        if let Some(phi) = graph.phi_of(block.id) {
            let _ = writeln!(&mut out, "    ; {}", phi_text(graph, phi));
        }
        for inst in &block.insts {
            if let Some(access) = graph.access_of(inst.id) {
                let _ = writeln!(&mut out, "    ; {}", access_text(graph, access));
            }
            let _ = writeln!(&mut out, "    {}", inst_text(inst));
        }
        if !block.insts.is_empty() {
            let _ = writeln!(&mut out);
        }
        let _ = writeln!(&mut out, "    {}", term_text(&block.term));
    }

    let _ = writeln!(&mut out, "}}");
    out
}

impl MemorySsa<'_> {
    /// The annotated text form; used by tests and debugging.
    pub fn print(&self) -> String {
        format_memssa(self.func(), self)
    }
}

fn access_text(graph: &AccessGraph, access: AccessId) -> String {
    let node = graph.node(access);
    match &node.kind {
        AccessKind::Use { defining, .. } => {
            format!("MemoryUse({})", version_text(graph, *defining))
        }
        AccessKind::Def {
            defining, version, ..
        } => {
            format!("{} = MemoryDef({})", version, version_text(graph, *defining))
        }
        AccessKind::Phi { .. } => phi_text(graph, access),
        AccessKind::LiveOnEntry => "liveOnEntry".to_string(),
    }
}

fn phi_text(graph: &AccessGraph, phi: AccessId) -> String {
    let node = graph.node(phi);
    let mut out = format!("{} = MemoryPhi(", node.version());
    for (i, (pred, incoming)) in node.phi_incoming().iter().enumerate() {
        if i > 0 {
            let _ = write!(&mut out, ", ");
        }
        let _ = write!(&mut out, "{{bb{}, {}}}", pred.0, version_text(graph, *incoming));
    }
    let _ = write!(&mut out, ")");
    out
}

fn version_text(graph: &AccessGraph, access: AccessId) -> String {
    let node = graph.node(access);
    match node.kind {
        AccessKind::LiveOnEntry => "liveOnEntry".to_string(),
        _ => node.version().to_string(),
    }
}

#[cfg(test)]
#[path = "../tests/memssa/t_format.rs"]
mod tests;
