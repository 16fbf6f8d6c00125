//! Report table writer.
//!
//! Holds the assembled column set and renders one aggregated sample tree
//! either as an aligned text table or as CSV. When a call-graph renderer
//! is attached, each entry's merged call-chain tree is printed beneath its
//! row.

use crate::aggregator::entry::{SampleEntry, SampleTree};
use crate::output::callgraph::CallgraphRenderer;
use std::io::{self, Write};

/// Extracts one cell from an entry; the tree gives access to section
/// totals for percentage columns
pub type ColumnFn = Box<dyn Fn(&SampleEntry, &SampleTree) -> String>;

struct Column {
    label: String,
    value: ColumnFn,
}

/// Assembled report renderer for one run
pub struct ReportFormatter {
    columns: Vec<Column>,
    csv: bool,
    callgraph: Option<CallgraphRenderer>,
}

impl ReportFormatter {
    pub fn new(csv: bool) -> Self {
        Self {
            columns: Vec::new(),
            csv,
            callgraph: None,
        }
    }

    /// Append one column; request order is display order
    pub fn add_column<F>(&mut self, label: impl Into<String>, value: F)
    where
        F: Fn(&SampleEntry, &SampleTree) -> String + 'static,
    {
        self.columns.push(Column {
            label: label.into(),
            value: Box::new(value),
        });
    }

    /// Attach the call-graph tree renderer
    pub fn set_callgraph(&mut self, renderer: CallgraphRenderer) {
        self.callgraph = Some(renderer);
    }

    /// Render one event section's entries
    pub fn write_samples(&self, w: &mut dyn Write, tree: &SampleTree) -> io::Result<()> {
        if self.columns.is_empty() {
            return Ok(());
        }
        if self.csv {
            self.write_csv(w, tree)
        } else {
            self.write_table(w, tree)
        }
    }

    fn write_csv(&self, w: &mut dyn Write, tree: &SampleTree) -> io::Result<()> {
        let header: Vec<String> = self.columns.iter().map(|c| csv_escape(&c.label)).collect();
        writeln!(w, "{}", header.join(","))?;
        for entry in &tree.entries {
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|c| csv_escape(&(c.value)(entry, tree)))
                .collect();
            writeln!(w, "{}", row.join(","))?;
        }
        Ok(())
    }

    fn write_table(&self, w: &mut dyn Write, tree: &SampleTree) -> io::Result<()> {
        // Pre-render every cell to compute column widths.
        let rows: Vec<Vec<String>> = tree
            .entries
            .iter()
            .map(|e| self.columns.iter().map(|c| (c.value)(e, tree)).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                rows.iter()
                    .map(|r| r[i].len())
                    .chain(std::iter::once(c.label.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let labels: Vec<&str> = self.columns.iter().map(|c| c.label.as_str()).collect();
        writeln!(w, "{}", format_row(&labels, &widths))?;
        for (entry, row) in tree.entries.iter().zip(&rows) {
            let cells: Vec<&str> = row.iter().map(|s| s.as_str()).collect();
            writeln!(w, "{}", format_row(&cells, &widths))?;
            if let Some(renderer) = &self.callgraph {
                if !entry.callchain.is_empty() {
                    renderer.write(w, entry)?;
                }
            }
        }
        Ok(())
    }
}

/// Pad all cells but the last to their column width
fn format_row(cells: &[&str], widths: &[usize]) -> String {
    let mut out = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i + 1 == cells.len() {
            out.push_str(cell);
        } else {
            out.push_str(&format!("{:width$}  ", cell, width = widths[i]));
        }
    }
    out
}

/// Quote a CSV field when it contains a delimiter or quote
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Format a weight as a percentage of the section total
pub fn percentage(value: u64, total: u64) -> String {
    if total == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", value as f64 * 100.0 / total as f64)
}
