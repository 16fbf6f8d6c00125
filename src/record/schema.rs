//! Trace container schema.
//!
//! A trace file is a single JSON document: run-level metadata, the list of
//! monitored event attributes, a feature section (arch, capture cmdline,
//! module symbol tables, tracepoint formats), and the record stream in
//! capture order. How such a file is produced from raw kernel buffers is
//! out of scope here; this schema is the contract the reporter consumes.

use serde::Deserialize;

/// Run-level metadata flags
///
/// **Public** - read during the LoadMetadata phase
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaInfo {
    /// Whether the capture was system wide
    #[serde(default)]
    pub system_wide_collection: bool,

    /// Whether samples are scheduler switches measuring off-cpu time
    #[serde(default)]
    pub trace_offcpu: bool,
}

/// One monitored event type
#[derive(Debug, Clone, Deserialize)]
pub struct EventAttr {
    /// Event name as recorded (tracepoint attrs may be renamed later
    /// from tracing format data)
    pub name: String,

    /// Event class: "hardware", "software" or "tracepoint"
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event config value; for tracepoints this is the tracepoint id
    #[serde(default)]
    pub config: u64,

    /// Whether samples of this attr carry branch stacks
    #[serde(default)]
    pub sample_branch_stack: bool,
}

/// Feature section: everything needed before streaming samples
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Features {
    /// Architecture string of the capture machine
    #[serde(default)]
    pub arch: Option<String>,

    /// Original capture command line
    #[serde(default)]
    pub cmdline: Vec<String>,

    /// Per-module symbol tables
    #[serde(default)]
    pub modules: Vec<ModuleInfo>,

    /// Tracepoint id -> name mappings, when tracepoints were captured
    #[serde(default)]
    pub tracepoint_formats: Vec<TracepointFormat>,
}

/// Symbol table for one module (shared library, executable or kernel)
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleInfo {
    pub path: String,
    #[serde(default)]
    pub symbols: Vec<SymbolInfo>,
}

/// One symbol covering [addr, addr + len) of the module file
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub addr: u64,
    pub len: u64,
}

/// Tracepoint id to event name mapping
#[derive(Debug, Clone, Deserialize)]
pub struct TracepointFormat {
    pub id: u64,
    pub name: String,
}

/// One record of the stream, in capture order
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Sample(SampleRecord),
    Comm(CommRecord),
    Fork(ForkRecord),
    Mmap(MmapRecord),
    TracingData(TracingDataRecord),
}

/// A raw performance sample
#[derive(Debug, Clone, Deserialize)]
pub struct SampleRecord {
    /// Index into the attr list this sample belongs to
    pub attr_id: usize,

    /// Timestamp in nanoseconds
    pub time: u64,

    /// Event count attributed to this sample by the kernel
    #[serde(default)]
    pub period: u64,

    pub cpu: u32,
    pub pid: u32,
    pub tid: u32,

    /// Sampled instruction pointer
    pub ip: u64,

    /// Whether the sample hit kernel space
    #[serde(default)]
    pub in_kernel: bool,

    /// Unwound caller addresses, innermost caller first. Does not
    /// include `ip` itself.
    #[serde(default)]
    pub callchain: Vec<u64>,

    /// Sampled taken branches, present when recorded with branch stacks
    #[serde(default)]
    pub branch_stack: Vec<BranchItem>,
}

/// One taken branch
#[derive(Debug, Clone, Deserialize)]
pub struct BranchItem {
    pub from: u64,
    pub to: u64,
    #[serde(default)]
    pub flags: u64,
}

/// Thread name change
#[derive(Debug, Clone, Deserialize)]
pub struct CommRecord {
    pub pid: u32,
    pub tid: u32,
    pub comm: String,
}

/// Thread or process creation
#[derive(Debug, Clone, Deserialize)]
pub struct ForkRecord {
    pub pid: u32,
    pub tid: u32,
    pub ppid: u32,
    pub ptid: u32,
}

/// New executable mapping in a process (or the kernel) address space
#[derive(Debug, Clone, Deserialize)]
pub struct MmapRecord {
    pub pid: u32,
    pub tid: u32,
    pub start: u64,
    pub len: u64,
    /// File offset the mapping starts at
    #[serde(default)]
    pub pgoff: u64,
    /// Module path backing the mapping
    pub path: String,
    #[serde(default)]
    pub in_kernel: bool,
}

/// Tracepoint format data arriving inside the record stream
#[derive(Debug, Clone, Deserialize)]
pub struct TracingDataRecord {
    pub formats: Vec<TracepointFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_record_defaults() {
        let json = r#"{"type":"sample","attr_id":0,"time":100,"cpu":1,"pid":2,"tid":3,"ip":4096}"#;
        let rec: Record = serde_json::from_str(json).unwrap();
        match rec {
            Record::Sample(s) => {
                assert_eq!(s.period, 0);
                assert!(!s.in_kernel);
                assert!(s.callchain.is_empty());
                assert!(s.branch_stack.is_empty());
            }
            other => panic!("expected sample, got {:?}", other),
        }
    }

    #[test]
    fn test_record_tag_dispatch() {
        let json = r#"{"type":"comm","pid":1,"tid":1,"comm":"init"}"#;
        let rec: Record = serde_json::from_str(json).unwrap();
        assert!(matches!(rec, Record::Comm(_)));
    }
}
