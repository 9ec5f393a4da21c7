//! Memory SSA: a side table over an SSA IR that reifies the flow of memory
//! state through a function.
//!
//! Every memory-touching instruction gets a virtual access node (use, def,
//! or phi) linked into a use/def graph, so "which earlier instruction last
//! wrote the memory this one depends on" is a constant-time hop, refined by
//! alias analysis.

pub mod alias;
pub mod analysis;
pub mod ir;
pub mod memssa;
