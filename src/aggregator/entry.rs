//! Sample entry types: the unit of aggregation and the per-event tree.

use crate::aggregator::callchain::CallChainTree;
use crate::symbols::ModuleId;
use std::rc::Rc;

/// A resolved code location: module, symbol and file-relative address
///
/// Module path and symbol name are `Rc<str>` snapshots into the thread
/// table's arena; the core never mutates them.
#[derive(Debug, Clone)]
pub struct Location {
    pub module: ModuleId,
    pub dso_path: Rc<str>,
    pub symbol: Rc<str>,
    pub vaddr_in_file: u64,
}

/// Source endpoint of a taken branch, present in branch-sampling mode
#[derive(Debug, Clone)]
pub struct BranchFrom {
    pub location: Location,
    pub flags: u64,
}

/// The unit of aggregation: one row of the final report
///
/// Direct samples start with `sample_count = 1` and no accumulated period;
/// entries created from call-chain frames start with `sample_count = 0`,
/// `period = 0` and carry only accumulated period. Equal-key entries are
/// merged in place and never deleted until the report is emitted.
#[derive(Debug)]
pub struct SampleEntry {
    pub time: u64,
    /// Weight contributed directly by samples at this location
    pub period: u64,
    /// Weight contributed by appearing in other samples' call chains
    pub accumulated_period: u64,
    pub sample_count: u64,
    pub cpu: u32,
    pub pid: u32,
    pub tid: u32,
    /// Thread name snapshot taken at creation
    pub comm: Rc<str>,
    pub location: Location,
    pub branch_from: Option<BranchFrom>,
    /// Merged call chains observed beneath this entry
    pub callchain: CallChainTree,
    /// Set after streaming for entries that exist only through call-chain
    /// accumulation; such rows sort after directly sampled ones
    pub callchain_duplicated: bool,
}

impl SampleEntry {
    /// Create a directly sampled entry
    pub fn new_direct(
        time: u64,
        period: u64,
        cpu: u32,
        pid: u32,
        tid: u32,
        comm: Rc<str>,
        location: Location,
    ) -> Self {
        Self {
            time,
            period,
            accumulated_period: 0,
            sample_count: 1,
            cpu,
            pid,
            tid,
            comm,
            location,
            branch_from: None,
            callchain: CallChainTree::default(),
            callchain_duplicated: false,
        }
    }

    /// Create an entry for a call-chain frame, carrying only accumulated
    /// weight inherited from its root sample
    pub fn new_callchain(
        time: u64,
        accumulated_period: u64,
        cpu: u32,
        pid: u32,
        tid: u32,
        comm: Rc<str>,
        location: Location,
    ) -> Self {
        Self {
            time,
            period: 0,
            accumulated_period,
            sample_count: 0,
            cpu,
            pid,
            tid,
            comm,
            location,
            branch_from: None,
            callchain: CallChainTree::default(),
            callchain_duplicated: false,
        }
    }

    /// Direct plus accumulated weight; the primary sort key of the report
    pub fn total_period(&self) -> u64 {
        self.period + self.accumulated_period
    }
}

/// Aggregated samples of one event type, plus section totals
#[derive(Debug, Default)]
pub struct SampleTree {
    pub entries: Vec<SampleEntry>,
    pub total_samples: u64,
    pub total_period: u64,
    pub total_error_callchains: u64,
    pub event_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::ThreadTable;

    fn loc(table: &mut ThreadTable, path: &str, symbol: &str) -> Location {
        let module = table.module_id(path);
        Location {
            module,
            dso_path: Rc::from(path),
            symbol: Rc::from(symbol),
            vaddr_in_file: 0,
        }
    }

    #[test]
    fn test_direct_entry_invariants() {
        let mut table = ThreadTable::new(false);
        let e = SampleEntry::new_direct(1, 100, 0, 1, 1, Rc::from("main"), loc(&mut table, "a", "f"));
        assert_eq!(e.sample_count, 1);
        assert_eq!(e.accumulated_period, 0);
        assert_eq!(e.total_period(), 100);
    }

    #[test]
    fn test_callchain_entry_invariants() {
        let mut table = ThreadTable::new(false);
        let e =
            SampleEntry::new_callchain(1, 100, 0, 1, 1, Rc::from("main"), loc(&mut table, "a", "f"));
        assert_eq!(e.sample_count, 0);
        assert_eq!(e.period, 0);
        assert_eq!(e.total_period(), 100);
    }
}
