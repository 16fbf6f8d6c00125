//! Sort-key registry and comparator assembly.
//!
//! A fixed table maps each recognized sort-key name to its comparator,
//! column label and display extractor. The user's key list, in order,
//! becomes both the grouping comparator (merge equality) and the
//! lowest-priority tie break of the final sort order.

use crate::aggregator::entry::SampleEntry;
use crate::utils::error::ConfigError;
use std::cmp::Ordering;

pub type CompareFn = fn(&SampleEntry, &SampleEntry) -> Ordering;
pub type DisplayFn = fn(&SampleEntry) -> String;

/// One recognized sort key
#[derive(Debug)]
pub struct KeySpec {
    pub name: &'static str,
    /// Column header in the report
    pub label: &'static str,
    pub compare: CompareFn,
    pub display: DisplayFn,
    /// Key reads branch endpoints and needs branch-sampling mode
    pub branch_only: bool,
}

fn compare_pid(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    a.pid.cmp(&b.pid)
}

fn compare_tid(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    a.tid.cmp(&b.tid)
}

fn compare_comm(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    a.comm.cmp(&b.comm)
}

fn compare_dso(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    a.location.dso_path.cmp(&b.location.dso_path)
}

fn compare_symbol(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    a.location.symbol.cmp(&b.location.symbol)
}

fn compare_vaddr_in_file(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    a.location.vaddr_in_file.cmp(&b.location.vaddr_in_file)
}

fn branch_from_dso(e: &SampleEntry) -> &str {
    e.branch_from.as_ref().map_or("", |b| &b.location.dso_path)
}

fn branch_from_symbol(e: &SampleEntry) -> &str {
    e.branch_from.as_ref().map_or("", |b| &b.location.symbol)
}

fn compare_dso_from(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    branch_from_dso(a).cmp(branch_from_dso(b))
}

fn compare_symbol_from(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    branch_from_symbol(a).cmp(branch_from_symbol(b))
}

fn display_pid(e: &SampleEntry) -> String {
    e.pid.to_string()
}

fn display_tid(e: &SampleEntry) -> String {
    e.tid.to_string()
}

fn display_comm(e: &SampleEntry) -> String {
    e.comm.to_string()
}

fn display_dso(e: &SampleEntry) -> String {
    e.location.dso_path.to_string()
}

fn display_symbol(e: &SampleEntry) -> String {
    e.location.symbol.to_string()
}

fn display_vaddr_in_file(e: &SampleEntry) -> String {
    format!("0x{:x}", e.location.vaddr_in_file)
}

fn display_dso_from(e: &SampleEntry) -> String {
    branch_from_dso(e).to_string()
}

fn display_symbol_from(e: &SampleEntry) -> String {
    branch_from_symbol(e).to_string()
}

/// The registry. `dso_to`/`symbol_to` alias the target comparators under
/// branch-mode labels.
pub static SORT_KEYS: &[KeySpec] = &[
    KeySpec {
        name: "pid",
        label: "Pid",
        compare: compare_pid,
        display: display_pid,
        branch_only: false,
    },
    KeySpec {
        name: "tid",
        label: "Tid",
        compare: compare_tid,
        display: display_tid,
        branch_only: false,
    },
    KeySpec {
        name: "comm",
        label: "Command",
        compare: compare_comm,
        display: display_comm,
        branch_only: false,
    },
    KeySpec {
        name: "dso",
        label: "Shared Object",
        compare: compare_dso,
        display: display_dso,
        branch_only: false,
    },
    KeySpec {
        name: "symbol",
        label: "Symbol",
        compare: compare_symbol,
        display: display_symbol,
        branch_only: false,
    },
    KeySpec {
        name: "vaddr_in_file",
        label: "VaddrInFile",
        compare: compare_vaddr_in_file,
        display: display_vaddr_in_file,
        branch_only: false,
    },
    KeySpec {
        name: "dso_from",
        label: "Source Shared Object",
        compare: compare_dso_from,
        display: display_dso_from,
        branch_only: true,
    },
    KeySpec {
        name: "dso_to",
        label: "Target Shared Object",
        compare: compare_dso,
        display: display_dso,
        branch_only: true,
    },
    KeySpec {
        name: "symbol_from",
        label: "Source Symbol",
        compare: compare_symbol_from,
        display: display_symbol_from,
        branch_only: true,
    },
    KeySpec {
        name: "symbol_to",
        label: "Target Symbol",
        compare: compare_symbol,
        display: display_symbol,
        branch_only: true,
    },
];

/// Look up a key by name, enforcing the branch-mode restriction
pub fn lookup_key(name: &str, branch_mode: bool) -> Result<&'static KeySpec, ConfigError> {
    let spec = SORT_KEYS
        .iter()
        .find(|k| k.name == name)
        .ok_or_else(|| ConfigError::UnknownSortKey(name.to_string()))?;
    if spec.branch_only && !branch_mode {
        return Err(ConfigError::BranchOnlyKey(name.to_string()));
    }
    Ok(spec)
}

/// Ordered concatenation of compare functions
#[derive(Clone, Default)]
pub struct SampleComparator {
    fns: Vec<CompareFn>,
}

impl SampleComparator {
    pub fn add_compare(&mut self, f: CompareFn) {
        self.fns.push(f);
    }

    /// Append every function of another comparator
    pub fn add_comparator(&mut self, other: &SampleComparator) {
        self.fns.extend_from_slice(&other.fns);
    }

    pub fn cmp(&self, a: &SampleEntry, b: &SampleEntry) -> Ordering {
        for f in &self.fns {
            let ord = f(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    pub fn eq(&self, a: &SampleEntry, b: &SampleEntry) -> bool {
        self.cmp(a, b) == Ordering::Equal
    }
}

impl std::fmt::Debug for SampleComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SampleComparator({} keys)", self.fns.len())
    }
}

/// Total weight, heaviest first; the primary key of the final sort
pub fn compare_total_period(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    b.total_period().cmp(&a.total_period())
}

/// Direct weight, heaviest first
pub fn compare_period(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    b.period.cmp(&a.period)
}

/// Entries that exist only through call-chain accumulation sort after
/// directly sampled ones
pub fn compare_callchain_duplicated(a: &SampleEntry, b: &SampleEntry) -> Ordering {
    a.callchain_duplicated.cmp(&b.callchain_duplicated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::entry::Location;
    use std::rc::Rc;

    fn entry(pid: u32, tid: u32, symbol: &str, period: u64) -> SampleEntry {
        let mut table = crate::symbols::ThreadTable::new(false);
        let module = table.module_id("m");
        SampleEntry::new_direct(
            0,
            period,
            0,
            pid,
            tid,
            Rc::from("comm"),
            Location {
                module,
                dso_path: Rc::from("m"),
                symbol: Rc::from(symbol),
                vaddr_in_file: 0,
            },
        )
    }

    #[test]
    fn test_lookup_known_key() {
        let spec = lookup_key("symbol", false).unwrap();
        assert_eq!(spec.label, "Symbol");
    }

    #[test]
    fn test_lookup_unknown_key() {
        let err = lookup_key("bogus", false).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSortKey(_)));
    }

    #[test]
    fn test_branch_key_requires_branch_mode() {
        let err = lookup_key("dso_from", false).unwrap_err();
        assert!(matches!(err, ConfigError::BranchOnlyKey(_)));
        assert!(lookup_key("dso_from", true).is_ok());
    }

    #[test]
    fn test_comparator_key_order() {
        let mut cmp = SampleComparator::default();
        cmp.add_compare(lookup_key("pid", false).unwrap().compare);
        cmp.add_compare(lookup_key("tid", false).unwrap().compare);

        let a = entry(1, 5, "f", 0);
        let b = entry(2, 1, "f", 0);
        // pid decides before tid
        assert_eq!(cmp.cmp(&a, &b), Ordering::Less);
        assert!(cmp.eq(&entry(1, 5, "g", 0), &a));
    }

    #[test]
    fn test_total_period_sorts_descending() {
        let light = entry(1, 1, "f", 10);
        let heavy = entry(2, 2, "f", 30);
        assert_eq!(compare_total_period(&heavy, &light), Ordering::Less);
    }
}
