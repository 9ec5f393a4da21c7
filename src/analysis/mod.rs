pub mod cfg;
pub mod domtree;

pub use cfg::*;
pub use domtree::*;
