//! Thread, module and symbol resolution.

pub mod thread_table;

// Re-export main types
pub use thread_table::{ModuleHit, ModuleId, ThreadInfo, ThreadTable};
