//! Per-event sample aggregation.
//!
//! One `SampleTreeBuilder` per monitored event type. It resolves raw
//! records into sample entries (consulting the thread table), applies the
//! configured filters and weight strategy, and merges equal-key entries in
//! place. Totals are updated exactly once per accepted entry at insertion
//! time, whether it merged or not.

use crate::aggregator::callchain::CallChainTree;
use crate::aggregator::entry::{BranchFrom, Location, SampleEntry, SampleTree};
use crate::aggregator::filter::SampleFilter;
use crate::aggregator::keys::SampleComparator;
use crate::aggregator::weight::WeightStrategy;
use crate::record::schema::SampleRecord;
use crate::symbols::ThreadTable;
use log::debug;
use std::rc::Rc;

/// Configuration shared by every builder of a report run
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    /// Grouping comparator: defines merge equality
    pub comparator: SampleComparator,
    pub filter: SampleFilter,
    /// Aggregate branch endpoints instead of instruction pointers
    pub use_branch_address: bool,
    /// Insert call-chain frames as accumulated entries (--children)
    pub accumulate_callchain: bool,
    /// Build the owned call-chain tree under each entry (-g)
    pub build_callchain: bool,
    /// Root call-chain display at the outermost caller
    pub caller_as_root: bool,
    /// Merge call-chain frames per call site instead of per symbol
    pub full_callchain_detail: bool,
    /// Weight samples by time gap instead of event count
    pub trace_offcpu: bool,
}

impl BuilderOptions {
    /// Create one builder for an event type
    pub fn create_builder(&self, event_name: String) -> SampleTreeBuilder {
        SampleTreeBuilder {
            comparator: self.comparator.clone(),
            filter: self.filter.clone(),
            strategy: WeightStrategy::new(self.trace_offcpu),
            use_branch_address: self.use_branch_address,
            accumulate_callchain: self.accumulate_callchain,
            build_callchain: self.build_callchain,
            caller_as_root: self.caller_as_root,
            full_callchain_detail: self.full_callchain_detail,
            entries: Vec::new(),
            total_samples: 0,
            total_period: 0,
            total_error_callchains: 0,
            event_name,
        }
    }
}

/// Aggregation store for one event type
#[derive(Debug)]
pub struct SampleTreeBuilder {
    comparator: SampleComparator,
    filter: SampleFilter,
    strategy: WeightStrategy,
    use_branch_address: bool,
    accumulate_callchain: bool,
    build_callchain: bool,
    caller_as_root: bool,
    full_callchain_detail: bool,
    /// Kept sorted by the grouping comparator
    entries: Vec<SampleEntry>,
    total_samples: u64,
    total_period: u64,
    total_error_callchains: u64,
    event_name: String,
}

impl SampleTreeBuilder {
    /// Feed one raw sample record. In off-cpu mode the record may only be
    /// cached as pending; aggregation then happens when its successor
    /// arrives.
    pub fn process_sample_record(&mut self, record: &Rc<SampleRecord>, table: &mut ThreadTable) {
        if let Some((record, weight)) = self.strategy.admit(record) {
            self.aggregate_record(&record, weight, table);
        }
    }

    /// Rename the event section (tracepoint formats can arrive late)
    pub fn set_event_name(&mut self, name: String) {
        self.event_name = name;
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Finish aggregation: mark duplicate-only entries and hand out the
    /// tree with its totals
    pub fn into_sample_tree(mut self) -> SampleTree {
        for entry in &mut self.entries {
            entry.callchain_duplicated = entry.sample_count == 0;
        }
        debug!(
            "Event {}: {} entries, {} samples, period {}",
            self.event_name,
            self.entries.len(),
            self.total_samples,
            self.total_period
        );
        SampleTree {
            entries: self.entries,
            total_samples: self.total_samples,
            total_period: self.total_period,
            total_error_callchains: self.total_error_callchains,
            event_name: self.event_name,
        }
    }

    fn aggregate_record(&mut self, r: &SampleRecord, weight: u64, table: &mut ThreadTable) {
        let thread = table.resolve_thread(r.pid, r.tid);
        if self.use_branch_address {
            // Branch samples use the record's own period, not the weight
            // strategy.
            for item in &r.branch_stack {
                let from = self.resolve_location(table, r.pid, item.from, r.in_kernel);
                let to = self.resolve_location(table, r.pid, item.to, r.in_kernel);
                let mut entry = SampleEntry::new_direct(
                    r.time,
                    r.period,
                    r.cpu,
                    r.pid,
                    r.tid,
                    thread.comm.clone(),
                    to,
                );
                entry.branch_from = Some(BranchFrom {
                    location: from,
                    flags: item.flags,
                });
                self.insert_sample(entry);
            }
            return;
        }

        let location = self.resolve_location(table, r.pid, r.ip, r.in_kernel);
        let entry = SampleEntry::new_direct(
            r.time,
            weight,
            r.cpu,
            r.pid,
            r.tid,
            thread.comm.clone(),
            location,
        );
        let Some(root_idx) = self.insert_sample(entry) else {
            return;
        };
        if (self.accumulate_callchain || self.build_callchain) && !r.callchain.is_empty() {
            self.process_callchain(r, weight, root_idx, table);
        }
    }

    /// Resolve an address, degrading to the unknown sentinels on a miss
    fn resolve_location(
        &self,
        table: &ThreadTable,
        pid: u32,
        addr: u64,
        in_kernel: bool,
    ) -> Location {
        let hit = table.resolve_module(pid, addr, in_kernel);
        Location {
            module: hit.module,
            dso_path: table.module_path(hit.module),
            symbol: table.resolve_symbol(hit.module, hit.vaddr_in_file),
            vaddr_in_file: hit.vaddr_in_file,
        }
    }

    /// Filter, account and insert-or-merge one directly sampled entry.
    /// Returns the canonical index, or `None` when filtered out.
    fn insert_sample(&mut self, entry: SampleEntry) -> Option<usize> {
        if !self.filter.accept(&entry) {
            return None;
        }
        self.total_samples += entry.sample_count;
        self.total_period += entry.period;
        Some(self.insert_or_merge(entry))
    }

    /// Merge into the existing equal-key entry, or insert at the sorted
    /// position
    fn insert_or_merge(&mut self, entry: SampleEntry) -> usize {
        match self
            .entries
            .binary_search_by(|e| self.comparator.cmp(e, &entry))
        {
            Ok(i) => {
                let existing = &mut self.entries[i];
                existing.period += entry.period;
                existing.accumulated_period += entry.accumulated_period;
                existing.sample_count += entry.sample_count;
                i
            }
            Err(i) => {
                self.entries.insert(i, entry);
                i
            }
        }
    }

    /// Resolve the unwound frames of a record, build the owned call-chain
    /// tree under the root entry, and accumulate frame weights into the
    /// store when --children is active.
    fn process_callchain(
        &mut self,
        r: &SampleRecord,
        weight: u64,
        root_idx: usize,
        table: &ThreadTable,
    ) {
        let mut frames = Vec::new();
        for &ip in &r.callchain {
            let hit = table.resolve_module(r.pid, ip, r.in_kernel);
            if table.is_unknown_module(hit.module) {
                // Unwinders can produce garbage addresses that map to no
                // module. Count the chain and truncate at this frame.
                self.total_error_callchains += 1;
                break;
            }
            frames.push(Location {
                module: hit.module,
                dso_path: table.module_path(hit.module),
                symbol: table.resolve_symbol(hit.module, hit.vaddr_in_file),
                vaddr_in_file: hit.vaddr_in_file,
            });
        }

        // The owned tree must grow before accumulation inserts below, which
        // can shift root_idx.
        if self.build_callchain {
            let root = &self.entries[root_idx];
            let mut path = Vec::with_capacity(frames.len() + 1);
            path.push(root.location.clone());
            path.extend(frames.iter().cloned());
            if self.caller_as_root {
                path.reverse();
            }
            let match_vaddr = self.full_callchain_detail;
            self.entries[root_idx]
                .callchain
                .add_path(&path, weight, match_vaddr);
        }

        if self.accumulate_callchain {
            let root = &self.entries[root_idx];
            let (time, cpu, pid, tid, comm) =
                (root.time, root.cpu, root.pid, root.tid, root.comm.clone());
            // Cheap key copies of entries already accumulated from this
            // chain, so recursive functions are counted once per chain.
            let mut seen: Vec<SampleEntry> = Vec::new();
            for frame in frames {
                let candidate = SampleEntry::new_callchain(
                    time,
                    weight,
                    cpu,
                    pid,
                    tid,
                    comm.clone(),
                    frame,
                );
                if seen.iter().any(|s| self.comparator.eq(s, &candidate)) {
                    continue;
                }
                if !self.filter.accept(&candidate) {
                    continue;
                }
                seen.push(SampleEntry::new_callchain(
                    time,
                    weight,
                    cpu,
                    pid,
                    tid,
                    comm.clone(),
                    candidate.location.clone(),
                ));
                self.insert_or_merge(candidate);
            }
        }
    }
}

/// Apply the final sort order to a finished tree
pub fn sort_sample_tree(tree: &mut SampleTree, sort_comparator: &SampleComparator, sort_callchains: bool) {
    tree.entries.sort_by(|a, b| sort_comparator.cmp(a, b));
    if sort_callchains {
        for entry in &mut tree.entries {
            entry.callchain.sort_by_weight();
        }
    }
}
