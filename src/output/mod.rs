//! Report rendering: aligned text tables, CSV, and call-graph trees.

pub mod callgraph;
pub mod table;

// Re-export main types
pub use callgraph::CallgraphRenderer;
pub use table::{percentage, ReportFormatter};
