//! Thread, process, module and symbol database.
//!
//! Owns every module and symbol for the lifetime of a report run. The
//! aggregation core only holds cheap `Rc<str>` snapshots and `ModuleId`
//! handles into this table, never mutable access.
//!
//! Resolution never fails: an address that hits no mapping resolves to the
//! reserved unknown module, and an address inside a module without a
//! covering symbol resolves to the unknown symbol.

use crate::record::schema::{ModuleInfo, Record};
use crate::utils::config::UNKNOWN_NAME;
use log::debug;
use std::collections::HashMap;
use std::rc::Rc;

/// Handle to a module owned by the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(usize);

/// Index of the reserved unknown module
const UNKNOWN_MODULE: ModuleId = ModuleId(0);

/// One symbol covering [addr, addr + len) of its module file
#[derive(Debug, Clone)]
struct Symbol {
    name: Rc<str>,
    addr: u64,
    len: u64,
}

#[derive(Debug)]
struct Module {
    path: Rc<str>,
    /// Sorted by addr
    symbols: Vec<Symbol>,
}

/// One executable mapping in an address space
#[derive(Debug, Clone)]
struct MapEntry {
    start: u64,
    len: u64,
    pgoff: u64,
    module: ModuleId,
}

/// Snapshot of a thread's identity at resolution time
///
/// **Public** - returned by `resolve_thread`; the comm is a snapshot and
/// later comm records do not rewrite entries already holding it
#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub pid: u32,
    pub tid: u32,
    pub comm: Rc<str>,
}

/// Result of mapping an address to a module
#[derive(Debug, Clone, Copy)]
pub struct ModuleHit {
    pub module: ModuleId,
    /// Address relative to the module file; the raw address when the
    /// module is unknown
    pub vaddr_in_file: u64,
}

/// The resolution database
#[derive(Debug)]
pub struct ThreadTable {
    modules: Vec<Module>,
    module_ids: HashMap<String, ModuleId>,
    /// Maps are per process; threads of one process share them
    process_maps: HashMap<u32, Vec<MapEntry>>,
    kernel_maps: Vec<MapEntry>,
    threads: HashMap<(u32, u32), Rc<str>>,
    unknown_symbol: Rc<str>,
    demangle: bool,
}

impl ThreadTable {
    pub fn new(demangle: bool) -> Self {
        let unknown: Rc<str> = Rc::from(UNKNOWN_NAME);
        Self {
            modules: vec![Module {
                path: unknown.clone(),
                symbols: Vec::new(),
            }],
            module_ids: HashMap::new(),
            process_maps: HashMap::new(),
            kernel_maps: Vec::new(),
            threads: HashMap::new(),
            unknown_symbol: unknown,
            demangle,
        }
    }

    /// Load one module symbol table from the trace's feature section
    pub fn load_module(&mut self, info: &ModuleInfo) {
        let id = self.module_id(&info.path);
        let demangle = self.demangle;
        let module = &mut self.modules[id.0];
        module.symbols = info
            .symbols
            .iter()
            .map(|s| Symbol {
                name: Rc::from(if demangle {
                    format!("{:#}", rustc_demangle::demangle(&s.name))
                } else {
                    s.name.clone()
                }),
                addr: s.addr,
                len: s.len,
            })
            .collect();
        module.symbols.sort_by_key(|s| s.addr);
        debug!("Loaded {} symbols for {}", module.symbols.len(), info.path);
    }

    /// Look up or create the module for a path
    pub fn module_id(&mut self, path: &str) -> ModuleId {
        if let Some(id) = self.module_ids.get(path) {
            return *id;
        }
        let id = ModuleId(self.modules.len());
        self.modules.push(Module {
            path: Rc::from(path),
            symbols: Vec::new(),
        });
        self.module_ids.insert(path.to_string(), id);
        id
    }

    /// Apply a non-sample record to the table
    pub fn update(&mut self, record: &Record) {
        match record {
            Record::Comm(r) => {
                self.threads.insert((r.pid, r.tid), Rc::from(r.comm.as_str()));
            }
            Record::Fork(r) => {
                let parent_comm = self
                    .threads
                    .get(&(r.ppid, r.ptid))
                    .cloned()
                    .unwrap_or_else(|| self.unknown_symbol.clone());
                self.threads.insert((r.pid, r.tid), parent_comm);
                if r.pid != r.ppid {
                    let maps = self.process_maps.get(&r.ppid).cloned().unwrap_or_default();
                    self.process_maps.insert(r.pid, maps);
                }
            }
            Record::Mmap(r) => {
                let module = self.module_id(&r.path);
                let entry = MapEntry {
                    start: r.start,
                    len: r.len,
                    pgoff: r.pgoff,
                    module,
                };
                if r.in_kernel {
                    self.kernel_maps.push(entry);
                } else {
                    self.process_maps.entry(r.pid).or_default().push(entry);
                }
            }
            Record::Sample(_) | Record::TracingData(_) => {}
        }
    }

    /// Find a thread, creating it with an unknown comm if absent
    pub fn resolve_thread(&mut self, pid: u32, tid: u32) -> ThreadInfo {
        let comm = self
            .threads
            .entry((pid, tid))
            .or_insert_with(|| self.unknown_symbol.clone())
            .clone();
        ThreadInfo { pid, tid, comm }
    }

    /// Map an address to a module and a file-relative virtual address
    pub fn resolve_module(&self, pid: u32, addr: u64, in_kernel: bool) -> ModuleHit {
        let maps = if in_kernel {
            Some(&self.kernel_maps)
        } else {
            self.process_maps.get(&pid)
        };
        if let Some(maps) = maps {
            for map in maps {
                if addr >= map.start && addr < map.start.saturating_add(map.len) {
                    return ModuleHit {
                        module: map.module,
                        vaddr_in_file: addr - map.start + map.pgoff,
                    };
                }
            }
        }
        ModuleHit {
            module: UNKNOWN_MODULE,
            vaddr_in_file: addr,
        }
    }

    /// Find the symbol covering a file-relative address in a module
    pub fn resolve_symbol(&self, module: ModuleId, vaddr_in_file: u64) -> Rc<str> {
        let symbols = &self.modules[module.0].symbols;
        let idx = match symbols.binary_search_by_key(&vaddr_in_file, |s| s.addr) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        };
        match idx {
            Some(i) if vaddr_in_file < symbols[i].addr.saturating_add(symbols[i].len) => {
                symbols[i].name.clone()
            }
            _ => self.unknown_symbol.clone(),
        }
    }

    /// Report path of a module
    pub fn module_path(&self, module: ModuleId) -> Rc<str> {
        self.modules[module.0].path.clone()
    }

    /// Whether a module is the reserved unknown sentinel
    pub fn is_unknown_module(&self, module: ModuleId) -> bool {
        module == UNKNOWN_MODULE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::schema::{CommRecord, ForkRecord, MmapRecord, SymbolInfo};

    fn table_with_module() -> ThreadTable {
        let mut table = ThreadTable::new(false);
        table.load_module(&ModuleInfo {
            path: "/lib/libc.so".to_string(),
            symbols: vec![
                SymbolInfo {
                    name: "malloc".to_string(),
                    addr: 0x1000,
                    len: 0x100,
                },
                SymbolInfo {
                    name: "free".to_string(),
                    addr: 0x1100,
                    len: 0x80,
                },
            ],
        });
        table.update(&Record::Mmap(MmapRecord {
            pid: 10,
            tid: 10,
            start: 0x40000,
            len: 0x2000,
            pgoff: 0x1000,
            path: "/lib/libc.so".to_string(),
            in_kernel: false,
        }));
        table
    }

    #[test]
    fn test_resolve_known_address() {
        let table = table_with_module();
        let hit = table.resolve_module(10, 0x40050, false);
        assert!(!table.is_unknown_module(hit.module));
        assert_eq!(hit.vaddr_in_file, 0x1050);
        assert_eq!(&*table.resolve_symbol(hit.module, hit.vaddr_in_file), "malloc");
    }

    #[test]
    fn test_resolve_unmapped_address_degrades() {
        let table = table_with_module();
        let hit = table.resolve_module(10, 0xdead0000, false);
        assert!(table.is_unknown_module(hit.module));
        assert_eq!(hit.vaddr_in_file, 0xdead0000);
        assert_eq!(&*table.resolve_symbol(hit.module, 0xdead0000), "unknown");
    }

    #[test]
    fn test_symbol_gap_is_unknown() {
        let table = table_with_module();
        let hit = table.resolve_module(10, 0x40000, false);
        // vaddr 0x1000..0x1180 covered; 0x1180+ is a gap
        assert_eq!(&*table.resolve_symbol(hit.module, 0x1190), "unknown");
    }

    #[test]
    fn test_comm_and_fork_inheritance() {
        let mut table = ThreadTable::new(false);
        table.update(&Record::Comm(CommRecord {
            pid: 1,
            tid: 1,
            comm: "init".to_string(),
        }));
        table.update(&Record::Fork(ForkRecord {
            pid: 2,
            tid: 2,
            ppid: 1,
            ptid: 1,
        }));
        assert_eq!(&*table.resolve_thread(2, 2).comm, "init");
        // Unseen threads are created with the unknown comm
        assert_eq!(&*table.resolve_thread(9, 9).comm, "unknown");
    }

    #[test]
    fn test_fork_copies_process_maps() {
        let mut table = table_with_module();
        table.update(&Record::Fork(ForkRecord {
            pid: 11,
            tid: 11,
            ppid: 10,
            ptid: 10,
        }));
        let hit = table.resolve_module(11, 0x40010, false);
        assert!(!table.is_unknown_module(hit.module));
    }

    #[test]
    fn test_resolution_survives_huge_lengths() {
        // Map and symbol lengths come straight from the trace file; a
        // length of u64::MAX must not overflow the range checks.
        let mut table = ThreadTable::new(false);
        table.load_module(&ModuleInfo {
            path: "/bin/huge".to_string(),
            symbols: vec![SymbolInfo {
                name: "all".to_string(),
                addr: 0x10,
                len: u64::MAX,
            }],
        });
        table.update(&Record::Mmap(MmapRecord {
            pid: 1,
            tid: 1,
            start: 0x1000,
            len: u64::MAX,
            pgoff: 0,
            path: "/bin/huge".to_string(),
            in_kernel: false,
        }));

        let hit = table.resolve_module(1, u64::MAX - 1, false);
        assert!(!table.is_unknown_module(hit.module));
        assert_eq!(&*table.resolve_symbol(hit.module, u64::MAX - 1), "all");
    }

    #[test]
    fn test_demangle_rust_symbol() {
        let mut table = ThreadTable::new(true);
        table.load_module(&ModuleInfo {
            path: "/bin/app".to_string(),
            symbols: vec![SymbolInfo {
                name: "_ZN3foo3barE".to_string(),
                addr: 0,
                len: 16,
            }],
        });
        let id = table.module_id("/bin/app");
        assert_eq!(&*table.resolve_symbol(id, 0), "foo::bar");
    }
}
