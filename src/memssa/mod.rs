pub mod access;
pub mod build;
pub mod format;
pub mod optimize;
pub mod update;
pub mod verify;
pub mod walker;

pub use access::*;
pub use build::*;
pub use format::*;
pub use update::*;
pub use verify::*;
pub use walker::*;
