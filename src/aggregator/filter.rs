//! Set-membership filters applied to resolved samples.
//!
//! Six independent predicates: cpu, pid, tid, thread name, module report
//! path and demangled symbol name. An empty set is a wildcard. All six
//! must pass; a rejected entry is dropped before it reaches the
//! aggregation store and contributes nothing to the section totals.

use crate::aggregator::entry::SampleEntry;
use std::collections::HashSet;

/// Read-only filter snapshot, captured before streaming begins
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    pub cpus: HashSet<u32>,
    pub pids: HashSet<u32>,
    pub tids: HashSet<u32>,
    pub comms: HashSet<String>,
    pub dsos: HashSet<String>,
    pub symbols: HashSet<String>,
}

impl SampleFilter {
    /// Whether an entry passes every configured filter
    pub fn accept(&self, entry: &SampleEntry) -> bool {
        if !self.cpus.is_empty() && !self.cpus.contains(&entry.cpu) {
            return false;
        }
        if !self.pids.is_empty() && !self.pids.contains(&entry.pid) {
            return false;
        }
        if !self.tids.is_empty() && !self.tids.contains(&entry.tid) {
            return false;
        }
        if !self.comms.is_empty() && !self.comms.contains(&*entry.comm) {
            return false;
        }
        if !self.dsos.is_empty() && !self.dsos.contains(&*entry.location.dso_path) {
            return false;
        }
        if !self.symbols.is_empty() && !self.symbols.contains(&*entry.location.symbol) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::entry::Location;
    use std::rc::Rc;

    fn entry(cpu: u32, pid: u32, comm: &str, dso: &str, symbol: &str) -> SampleEntry {
        let mut table = crate::symbols::ThreadTable::new(false);
        let module = table.module_id(dso);
        SampleEntry::new_direct(
            0,
            1,
            cpu,
            pid,
            pid,
            Rc::from(comm),
            Location {
                module,
                dso_path: Rc::from(dso),
                symbol: Rc::from(symbol),
                vaddr_in_file: 0,
            },
        )
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = SampleFilter::default();
        assert!(filter.accept(&entry(3, 7, "a", "b", "c")));
    }

    #[test]
    fn test_cpu_filter() {
        let filter = SampleFilter {
            cpus: HashSet::from([2]),
            ..Default::default()
        };
        assert!(!filter.accept(&entry(1, 0, "a", "b", "c")));
        assert!(filter.accept(&entry(2, 0, "a", "b", "c")));
        assert!(!filter.accept(&entry(3, 0, "a", "b", "c")));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let filter = SampleFilter {
            cpus: HashSet::from([2]),
            comms: HashSet::from(["worker".to_string()]),
            ..Default::default()
        };
        assert!(filter.accept(&entry(2, 0, "worker", "b", "c")));
        assert!(!filter.accept(&entry(2, 0, "main", "b", "c")));
        assert!(!filter.accept(&entry(1, 0, "worker", "b", "c")));
    }

    #[test]
    fn test_symbol_and_dso_filters() {
        let filter = SampleFilter {
            dsos: HashSet::from(["/lib/libc.so".to_string()]),
            symbols: HashSet::from(["malloc".to_string()]),
            ..Default::default()
        };
        assert!(filter.accept(&entry(0, 0, "a", "/lib/libc.so", "malloc")));
        assert!(!filter.accept(&entry(0, 0, "a", "/lib/libc.so", "free")));
        assert!(!filter.accept(&entry(0, 0, "a", "/bin/app", "malloc")));
    }
}
