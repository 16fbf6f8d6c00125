//! Trace container schema and loader.
//!
//! This module handles:
//! - Deserializing the JSON trace container
//! - Exposing metadata, event attributes and the feature section
//! - Streaming records in stored order

pub mod file;
pub mod schema;

// Re-export main types
pub use file::{name_for_tracepoint_id, RecordFile};
pub use schema::{
    BranchItem, CommRecord, EventAttr, Features, ForkRecord, MetaInfo, MmapRecord, ModuleInfo,
    Record, SampleRecord, SymbolInfo, TracepointFormat, TracingDataRecord,
};
