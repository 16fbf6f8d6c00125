//! The aggregation core: resolving raw records into sample entries,
//! weighting, filtering, merging and sorting them per event type.

pub mod builder;
pub mod callchain;
pub mod entry;
pub mod filter;
pub mod keys;
pub mod weight;

// Re-export main types
pub use builder::{sort_sample_tree, BuilderOptions, SampleTreeBuilder};
pub use callchain::{CallChainNode, CallChainTree};
pub use entry::{BranchFrom, Location, SampleEntry, SampleTree};
pub use filter::SampleFilter;
pub use keys::{lookup_key, KeySpec, SampleComparator, SORT_KEYS};
pub use weight::WeightStrategy;
