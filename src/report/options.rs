//! Report run configuration.
//!
//! One immutable options struct threaded through the pipeline stages,
//! plus the parsers turning CLI list arguments into filter sets.

use crate::utils::config::{DEFAULT_SORT_KEYS, DEFAULT_TRACE_FILE};
use crate::utils::error::ConfigError;
use std::collections::HashSet;
use std::path::PathBuf;

/// Direction the call-graph tree grows in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallgraphRoot {
    /// Outermost caller at the top (how functions call others)
    #[default]
    Caller,
    /// Sampled function at the top (how functions are called)
    Callee,
}

/// Everything a report run needs, captured before any file I/O
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Trace file to read
    pub input: PathBuf,

    /// Report destination; stdout when unset
    pub output: Option<PathBuf>,

    /// Grouping and display keys, in request order
    pub sort_keys: Vec<String>,

    /// Aggregate branch endpoints instead of instruction pointers (-b)
    pub use_branch_address: bool,

    /// Add accumulated call-chain weight columns (--children)
    pub accumulate_callchain: bool,

    /// Print the call-graph tree (-g); implies accumulate_callchain
    pub print_callgraph: bool,

    /// Tree direction for -g
    pub callgraph_root: CallgraphRoot,

    /// One node per call site instead of per symbol (--full-callgraph)
    pub full_callgraph: bool,

    /// Maximum printed stack depth
    pub max_stack: u32,

    /// Minimum percentage shown in the call graph
    pub percent_limit: f64,

    /// Report raw weights instead of percentages (--raw-period)
    pub raw_period: bool,

    /// Add the sample count column (-n)
    pub print_sample_count: bool,

    /// Machine-readable CSV output (--csv)
    pub csv: bool,

    /// Demangle symbol names
    pub demangle: bool,

    pub cpu_filter: HashSet<u32>,
    pub pid_filter: HashSet<u32>,
    pub tid_filter: HashSet<u32>,
    pub comm_filter: HashSet<String>,
    pub dso_filter: HashSet<String>,
    pub symbol_filter: HashSet<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_TRACE_FILE),
            output: None,
            sort_keys: DEFAULT_SORT_KEYS.iter().map(|s| s.to_string()).collect(),
            use_branch_address: false,
            accumulate_callchain: false,
            print_callgraph: false,
            callgraph_root: CallgraphRoot::default(),
            full_callgraph: false,
            max_stack: u32::MAX,
            percent_limit: 0.0,
            raw_period: false,
            print_sample_count: false,
            csv: false,
            demangle: true,
            cpu_filter: HashSet::new(),
            pid_filter: HashSet::new(),
            tid_filter: HashSet::new(),
            comm_filter: HashSet::new(),
            dso_filter: HashSet::new(),
            symbol_filter: HashSet::new(),
        }
    }
}

/// Parse a cpu list like "0,2,4-6"
pub fn parse_cpu_list(s: &str) -> Result<HashSet<u32>, ConfigError> {
    let mut cpus = HashSet::new();
    for item in s.split(',').filter(|i| !i.is_empty()) {
        if let Some((lo, hi)) = item.split_once('-') {
            let lo: u32 = lo
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidCpuList(s.to_string()))?;
            let hi: u32 = hi
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidCpuList(s.to_string()))?;
            if lo > hi {
                return Err(ConfigError::InvalidCpuList(s.to_string()));
            }
            cpus.extend(lo..=hi);
        } else {
            cpus.insert(
                item.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidCpuList(s.to_string()))?,
            );
        }
    }
    Ok(cpus)
}

/// Parse a pid or tid list like "1,23,456"
pub fn parse_id_list(s: &str) -> Result<HashSet<u32>, ConfigError> {
    s.split(',')
        .filter(|i| !i.is_empty())
        .map(|item| {
            item.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidIdList(s.to_string()))
        })
        .collect()
}

/// Split a comma-separated name list
pub fn parse_name_list(s: &str, separator: char) -> HashSet<String> {
    s.split(separator)
        .filter(|i| !i.is_empty())
        .map(|i| i.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_list_singles_and_ranges() {
        let cpus = parse_cpu_list("0,2,4-6").unwrap();
        assert_eq!(cpus, HashSet::from([0, 2, 4, 5, 6]));
    }

    #[test]
    fn test_parse_cpu_list_rejects_garbage() {
        assert!(parse_cpu_list("a").is_err());
        assert!(parse_cpu_list("3-1").is_err());
        assert!(parse_cpu_list("1-x").is_err());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,23").unwrap(), HashSet::from([1, 23]));
        assert!(parse_id_list("1,foo").is_err());
    }

    #[test]
    fn test_parse_name_list_semicolons() {
        // Symbol names can contain commas, so they split on ';'
        let set = parse_name_list("foo<a, b>;bar", ';');
        assert_eq!(set.len(), 2);
        assert!(set.contains("foo<a, b>"));
    }

    #[test]
    fn test_default_sort_keys() {
        let options = ReportOptions::default();
        assert_eq!(options.sort_keys, vec!["comm", "pid", "tid", "dso", "symbol"]);
        assert!(options.demangle);
    }
}
