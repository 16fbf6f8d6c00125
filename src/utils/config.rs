//! Configuration and constants for the CLI.

/// Default trace file name
pub const DEFAULT_TRACE_FILE: &str = "perf.data.json";

/// Default sort keys when --sort is not given
pub const DEFAULT_SORT_KEYS: &[&str] = &["comm", "pid", "tid", "dso", "symbol"];

/// Event name carrying scheduler switches, required in off-cpu mode
pub const SCHED_SWITCH_EVENT: &str = "sched:sched_switch";

/// Architectures the resolver understands
pub const SUPPORTED_ARCHS: &[&str] = &["x86", "x86_64", "arm", "aarch64", "riscv64"];

/// Name shown for modules and symbols that could not be resolved
pub const UNKNOWN_NAME: &str = "unknown";
