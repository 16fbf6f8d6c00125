//! Report generation: run options and the pipeline state machine.

pub mod options;
pub mod pipeline;

// Re-export main types
pub use options::{parse_cpu_list, parse_id_list, parse_name_list, CallgraphRoot, ReportOptions};
pub use pipeline::{run_report, run_report_to};
