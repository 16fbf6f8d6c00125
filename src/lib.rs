//! Trace Report
//!
//! Sample aggregation and report generation for performance traces:
//! turns a stream of raw performance-monitoring events (instruction
//! pointer samples, branch records and unwound call stacks) into a
//! sorted, optionally hierarchical report per monitored event type.
//!
//! This crate provides the core implementation for the `trace-report`
//! CLI tool.

pub mod aggregator;
pub mod output;
pub mod record;
pub mod report;
pub mod symbols;
pub mod utils;
