//! Merged call-chain tree owned by a sample entry.
//!
//! Nodes live in one arena `Vec` with index-based child lists, so path
//! insertion and merging never allocate owning links and cycles are
//! impossible by construction. Equal frames across different chains of the
//! same entry are merged in place.

use crate::aggregator::entry::Location;

/// One frame of the merged tree
#[derive(Debug)]
pub struct CallChainNode {
    pub location: Location,
    /// Weight of chains terminating at this frame
    pub period: u64,
    /// Weight of chains passing through this frame
    pub children_period: u64,
    pub children: Vec<usize>,
}

impl CallChainNode {
    /// Total weight flowing through this frame
    pub fn cumulative_period(&self) -> u64 {
        self.period + self.children_period
    }
}

/// Arena-backed call-chain tree
#[derive(Debug, Default)]
pub struct CallChainTree {
    nodes: Vec<CallChainNode>,
    roots: Vec<usize>,
}

/// Frame equality used when merging chains: symbol identity in brief mode,
/// exact call site (symbol plus file address) in full mode
fn frames_match(a: &Location, b: &Location, match_vaddr: bool) -> bool {
    a.dso_path == b.dso_path && a.symbol == b.symbol && (!match_vaddr || a.vaddr_in_file == b.vaddr_in_file)
}

impl CallChainTree {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn node(&self, idx: usize) -> &CallChainNode {
        &self.nodes[idx]
    }

    /// Total weight of all chains in the tree
    pub fn total_period(&self) -> u64 {
        self.roots
            .iter()
            .map(|&r| self.nodes[r].cumulative_period())
            .sum()
    }

    /// Insert one chain of frames with the given weight, merging with
    /// already present frames along the way
    pub fn add_path(&mut self, frames: &[Location], period: u64, match_vaddr: bool) {
        let mut parent: Option<usize> = None;
        let last = frames.len().saturating_sub(1);
        for (depth, frame) in frames.iter().enumerate() {
            let siblings = match parent {
                Some(p) => &self.nodes[p].children,
                None => &self.roots,
            };
            let found = siblings
                .iter()
                .copied()
                .find(|&i| frames_match(&self.nodes[i].location, frame, match_vaddr));
            let idx = match found {
                Some(i) => i,
                None => {
                    let i = self.nodes.len();
                    self.nodes.push(CallChainNode {
                        location: frame.clone(),
                        period: 0,
                        children_period: 0,
                        children: Vec::new(),
                    });
                    match parent {
                        Some(p) => self.nodes[p].children.push(i),
                        None => self.roots.push(i),
                    }
                    i
                }
            };
            if depth == last {
                self.nodes[idx].period += period;
            } else {
                self.nodes[idx].children_period += period;
            }
            parent = Some(idx);
        }
    }

    /// Order every child list by cumulative weight, heaviest first
    pub fn sort_by_weight(&mut self) {
        let mut roots = std::mem::take(&mut self.roots);
        self.sort_list(&mut roots);
        self.roots = roots;
        for i in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[i].children);
            self.sort_list(&mut children);
            self.nodes[i].children = children;
        }
    }

    fn sort_list(&self, list: &mut [usize]) {
        list.sort_by(|&a, &b| {
            self.nodes[b]
                .cumulative_period()
                .cmp(&self.nodes[a].cumulative_period())
                .then(a.cmp(&b))
        });
    }
}
