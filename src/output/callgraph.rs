//! Call-graph tree renderer.
//!
//! Prints the merged call-chain tree beneath a report row, pruned by a
//! maximum depth and a minimum percentage of the entry's total chain
//! weight. Brief detail shows symbols only; full detail appends the file
//! address, separating call sites.

use crate::aggregator::callchain::CallChainTree;
use crate::aggregator::entry::SampleEntry;
use std::io::{self, Write};

/// Configured once per report run
#[derive(Debug, Clone)]
pub struct CallgraphRenderer {
    pub max_depth: u32,
    /// Nodes below this percentage of the entry's chain weight are pruned
    pub percent_limit: f64,
    /// Symbol-only frames instead of one node per call site
    pub brief: bool,
}

impl CallgraphRenderer {
    /// Print one entry's call-chain tree
    pub fn write(&self, w: &mut dyn Write, entry: &SampleEntry) -> io::Result<()> {
        let tree = &entry.callchain;
        let total = tree.total_period();
        if total == 0 {
            return Ok(());
        }
        writeln!(w, "       |")?;
        for &root in tree.roots() {
            self.write_node(w, tree, root, total, 0, "       ")?;
        }
        writeln!(w)?;
        Ok(())
    }

    fn write_node(
        &self,
        w: &mut dyn Write,
        tree: &CallChainTree,
        idx: usize,
        total: u64,
        depth: u32,
        prefix: &str,
    ) -> io::Result<()> {
        if depth >= self.max_depth {
            return Ok(());
        }
        let node = tree.node(idx);
        let percent = node.cumulative_period() as f64 * 100.0 / total as f64;
        if percent < self.percent_limit {
            return Ok(());
        }
        let name = if self.brief {
            node.location.symbol.to_string()
        } else {
            format!("{} [+0x{:x}]", node.location.symbol, node.location.vaddr_in_file)
        };
        writeln!(w, "{}|--{:.2}%-- {}", prefix, percent, name)?;
        let child_prefix = format!("{}|   ", prefix);
        for &child in &node.children {
            self.write_node(w, tree, child, total, depth + 1, &child_prefix)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::entry::Location;
    use std::rc::Rc;

    fn loc(symbol: &str, vaddr: u64) -> Location {
        let mut table = crate::symbols::ThreadTable::new(false);
        Location {
            module: table.module_id("m"),
            dso_path: Rc::from("m"),
            symbol: Rc::from(symbol),
            vaddr_in_file: vaddr,
        }
    }

    fn entry_with_chains() -> SampleEntry {
        let mut entry =
            SampleEntry::new_direct(0, 100, 0, 1, 1, Rc::from("app"), loc("leaf", 0));
        entry
            .callchain
            .add_path(&[loc("main", 0x10), loc("work", 0x20)], 80, false);
        entry
            .callchain
            .add_path(&[loc("main", 0x10), loc("idle", 0x30)], 20, false);
        entry.callchain.sort_by_weight();
        entry
    }

    fn render(renderer: &CallgraphRenderer) -> String {
        let mut out = Vec::new();
        renderer.write(&mut out, &entry_with_chains()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_brief_tree_output() {
        let text = render(&CallgraphRenderer {
            max_depth: u32::MAX,
            percent_limit: 0.0,
            brief: true,
        });
        assert!(text.contains("|--100.00%-- main"));
        assert!(text.contains("|--80.00%-- work"));
        assert!(text.contains("|--20.00%-- idle"));
        // heaviest child first
        assert!(text.find("work").unwrap() < text.find("idle").unwrap());
    }

    #[test]
    fn test_full_detail_shows_call_site() {
        let text = render(&CallgraphRenderer {
            max_depth: u32::MAX,
            percent_limit: 0.0,
            brief: false,
        });
        assert!(text.contains("main [+0x10]"));
    }

    #[test]
    fn test_percent_limit_prunes() {
        let text = render(&CallgraphRenderer {
            max_depth: u32::MAX,
            percent_limit: 50.0,
            brief: true,
        });
        assert!(text.contains("work"));
        assert!(!text.contains("idle"));
    }

    #[test]
    fn test_max_depth_prunes() {
        let text = render(&CallgraphRenderer {
            max_depth: 1,
            percent_limit: 0.0,
            brief: true,
        });
        assert!(text.contains("main"));
        assert!(!text.contains("work"));
    }
}
