//! The report pipeline state machine.
//!
//! Stages run strictly in order, each a precondition of the next:
//! configure, open, load metadata, load attributes, load features, stream,
//! sort, print. Configuration errors surface before any file I/O; format
//! errors abort the run; resolution misses degrade to sentinels and are
//! never errors.

use crate::aggregator::builder::{sort_sample_tree, BuilderOptions, SampleTreeBuilder};
use crate::aggregator::entry::SampleTree;
use crate::aggregator::filter::SampleFilter;
use crate::aggregator::keys::{
    compare_callchain_duplicated, compare_period, compare_total_period, lookup_key,
    SampleComparator,
};
use crate::output::callgraph::CallgraphRenderer;
use crate::output::table::{percentage, ReportFormatter};
use crate::record::file::{name_for_tracepoint_id, RecordFile};
use crate::record::schema::{Record, TracepointFormat};
use crate::report::options::{CallgraphRoot, ReportOptions};
use crate::symbols::ThreadTable;
use crate::utils::config::{SCHED_SWITCH_EVENT, SUPPORTED_ARCHS};
use crate::utils::error::{ConfigError, FormatError, OutputError, ReportError};
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::rc::Rc;

/// One monitored event type as the report sees it
#[derive(Debug, Clone)]
struct EventAttrInfo {
    name: String,
    event_type: String,
    config: u64,
}

/// Everything assembled during the configure stage
struct Assembled {
    builder_options: BuilderOptions,
    sort_comparator: SampleComparator,
    formatter: ReportFormatter,
}

/// Run a report to the destination named in the options (stdout when none)
pub fn run_report(options: &ReportOptions) -> Result<(), ReportError> {
    match &options.output {
        Some(path) => {
            let file = File::create(path).map_err(OutputError::WriteFailed)?;
            let mut writer = BufWriter::new(file);
            run_report_to(options, &mut writer)?;
            writer.flush().map_err(OutputError::WriteFailed)?;
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            run_report_to(options, &mut stdout.lock())
        }
    }
}

/// Run a report into any writer
pub fn run_report_to(options: &ReportOptions, w: &mut dyn Write) -> Result<(), ReportError> {
    let assembled = configure(options)?;
    let file = RecordFile::open(&options.input)?;

    let mut pipeline = ReportPipeline {
        options,
        builder_options: assembled.builder_options,
        sort_comparator: assembled.sort_comparator,
        formatter: assembled.formatter,
        file,
        attrs: Vec::new(),
        table: ThreadTable::new(options.demangle),
        builders: Vec::new(),
        trees: Vec::new(),
        trace_offcpu: false,
        system_wide: false,
        sched_switch_id: None,
        arch: String::new(),
        cmdline: String::new(),
        tracepoint_formats: Vec::new(),
    };

    pipeline.load_metadata();
    pipeline.load_attributes()?;
    pipeline.load_features()?;
    pipeline.stream()?;
    pipeline.sort();
    pipeline.print(w).map_err(OutputError::WriteFailed)?;
    Ok(())
}

/// Validate options and assemble comparators and columns. Fails fast on
/// unknown or incompatible sort keys, before any file is touched.
fn configure(options: &ReportOptions) -> Result<Assembled, ReportError> {
    if !(0.0..=100.0).contains(&options.percent_limit) {
        return Err(ConfigError::InvalidPercentLimit(options.percent_limit).into());
    }

    let accumulate = options.accumulate_callchain || options.print_callgraph;
    let raw = options.raw_period;

    let mut grouping = SampleComparator::default();
    let mut formatter = ReportFormatter::new(options.csv);

    if accumulate {
        if raw {
            formatter.add_column("Children", |e, _| e.total_period().to_string());
            formatter.add_column("Self", |e, _| e.period.to_string());
        } else {
            formatter.add_column("Children", |e, t| {
                percentage(e.total_period(), t.total_period)
            });
            formatter.add_column("Self", |e, t| percentage(e.period, t.total_period));
        }
    } else if raw {
        formatter.add_column("Overhead", |e, _| e.period.to_string());
    } else {
        formatter.add_column("Overhead", |e, t| percentage(e.period, t.total_period));
    }
    if options.print_sample_count {
        formatter.add_column("Sample", |e, _| e.sample_count.to_string());
    }

    let mut has_symbol_key = false;
    for key in &options.sort_keys {
        let spec = lookup_key(key, options.use_branch_address)?;
        has_symbol_key |= spec.name == "symbol";
        grouping.add_compare(spec.compare);
        let display = spec.display;
        formatter.add_column(spec.label, move |e, _| display(e));
    }

    if options.csv {
        if accumulate {
            formatter.add_column("AccEventCount", |e, _| e.total_period().to_string());
            formatter.add_column("SelfEventCount", |e, _| e.period.to_string());
        } else {
            formatter.add_column("EventCount", |e, _| e.period.to_string());
        }
        formatter.add_column("EventName", |_, t| t.event_name.clone());
    }

    if options.print_callgraph && has_symbol_key {
        formatter.set_callgraph(CallgraphRenderer {
            max_depth: options.max_stack,
            percent_limit: options.percent_limit,
            brief: !options.full_callgraph,
        });
    }

    // Heaviest first, then duplicate suppression, then direct weight, then
    // the user's key order so equal weights stay deterministic.
    let mut sort_comparator = SampleComparator::default();
    sort_comparator.add_compare(compare_total_period);
    if options.print_callgraph {
        sort_comparator.add_compare(compare_callchain_duplicated);
    }
    sort_comparator.add_compare(compare_period);
    sort_comparator.add_comparator(&grouping);

    let builder_options = BuilderOptions {
        comparator: grouping,
        filter: SampleFilter {
            cpus: options.cpu_filter.clone(),
            pids: options.pid_filter.clone(),
            tids: options.tid_filter.clone(),
            comms: options.comm_filter.clone(),
            dsos: options.dso_filter.clone(),
            symbols: options.symbol_filter.clone(),
        },
        use_branch_address: options.use_branch_address,
        accumulate_callchain: accumulate,
        build_callchain: options.print_callgraph,
        caller_as_root: options.callgraph_root == CallgraphRoot::Caller,
        full_callchain_detail: options.full_callgraph,
        // Overwritten from metadata once the file is open
        trace_offcpu: false,
    };

    Ok(Assembled {
        builder_options,
        sort_comparator,
        formatter,
    })
}

struct ReportPipeline<'a> {
    options: &'a ReportOptions,
    builder_options: BuilderOptions,
    sort_comparator: SampleComparator,
    formatter: ReportFormatter,
    file: RecordFile,
    attrs: Vec<EventAttrInfo>,
    table: ThreadTable,
    builders: Vec<SampleTreeBuilder>,
    trees: Vec<SampleTree>,
    trace_offcpu: bool,
    system_wide: bool,
    sched_switch_id: Option<usize>,
    arch: String,
    cmdline: String,
    tracepoint_formats: Vec<TracepointFormat>,
}

impl ReportPipeline<'_> {
    fn load_metadata(&mut self) {
        let meta = self.file.meta();
        self.system_wide = meta.system_wide_collection;
        self.trace_offcpu = meta.trace_offcpu;
        self.builder_options.trace_offcpu = self.trace_offcpu;
        debug!(
            "Metadata: system_wide={}, trace_offcpu={}",
            self.system_wide, self.trace_offcpu
        );
    }

    fn load_attributes(&mut self) -> Result<(), FormatError> {
        for attr in self.file.attrs() {
            if self.options.use_branch_address && !attr.sample_branch_stack {
                return Err(FormatError::MissingBranchStack(attr.name.clone()));
            }
            self.attrs.push(EventAttrInfo {
                name: attr.name.clone(),
                event_type: attr.event_type.clone(),
                config: attr.config,
            });
        }
        if self.trace_offcpu {
            let id = self
                .attrs
                .iter()
                .position(|a| a.name == SCHED_SWITCH_EVENT)
                .ok_or_else(|| {
                    FormatError::MissingSchedSwitchEvent(SCHED_SWITCH_EVENT.to_string())
                })?;
            self.sched_switch_id = Some(id);
        }
        info!("Loaded {} event attributes", self.attrs.len());
        Ok(())
    }

    /// Features must load before streaming: symbol resolution and
    /// tracepoint naming depend on them.
    fn load_features(&mut self) -> Result<(), FormatError> {
        let features = self.file.features();
        if let Some(arch) = &features.arch {
            if !SUPPORTED_ARCHS.contains(&arch.as_str()) {
                return Err(FormatError::UnsupportedArch(arch.clone()));
            }
            self.arch = arch.clone();
        }
        self.cmdline = features.cmdline.join(" ");
        for module in &features.modules {
            self.table.load_module(module);
        }
        self.tracepoint_formats = features.tracepoint_formats.clone();
        rename_tracepoint_attrs(&mut self.attrs, &self.tracepoint_formats, &mut self.builders);
        Ok(())
    }

    fn stream(&mut self) -> Result<(), FormatError> {
        self.builders = self
            .attrs
            .iter()
            .map(|a| self.builder_options.create_builder(a.name.clone()))
            .collect();

        let trace_offcpu = self.trace_offcpu;
        let sched_switch_id = self.sched_switch_id;
        let file = &self.file;
        let table = &mut self.table;
        let builders = &mut self.builders;
        let attrs = &mut self.attrs;
        let formats = &mut self.tracepoint_formats;

        file.for_each_record(|record| {
            table.update(record);
            match record {
                Record::Sample(s) => {
                    if s.attr_id >= builders.len() {
                        return Err(FormatError::BadAttrId(s.attr_id));
                    }
                    let r = Rc::new(s.clone());
                    match sched_switch_id {
                        // Scheduler switches measure off-cpu time for every
                        // other event type.
                        Some(switch) if trace_offcpu && s.attr_id == switch => {
                            for (i, builder) in builders.iter_mut().enumerate() {
                                if i != switch {
                                    builder.process_sample_record(&r, table);
                                }
                            }
                        }
                        _ => builders[s.attr_id].process_sample_record(&r, table),
                    }
                }
                Record::TracingData(t) => {
                    formats.extend(t.formats.iter().cloned());
                    rename_tracepoint_attrs(attrs, formats, builders);
                }
                _ => {}
            }
            Ok(())
        })
    }

    fn sort(&mut self) {
        for builder in self.builders.drain(..) {
            let mut tree = builder.into_sample_tree();
            sort_sample_tree(&mut tree, &self.sort_comparator, self.options.print_callgraph);
            self.trees.push(tree);
        }
    }

    fn print(&self, w: &mut dyn Write) -> io::Result<()> {
        if !self.cmdline.is_empty() {
            writeln!(w, "Cmdline: {}", self.cmdline)?;
        }
        if !self.arch.is_empty() {
            writeln!(w, "Arch: {}", self.arch)?;
        }
        let period_prefix = if self.trace_offcpu {
            "Time in ns"
        } else {
            "Event count"
        };
        for (i, (attr, tree)) in self.attrs.iter().zip(&self.trees).enumerate() {
            if self.trace_offcpu && self.sched_switch_id == Some(i) {
                continue;
            }
            writeln!(w)?;
            writeln!(
                w,
                "Event: {} (type {}, config {})",
                attr.name, attr.event_type, attr.config
            )?;
            writeln!(w, "Samples: {}", tree.total_samples)?;
            if tree.total_error_callchains != 0 {
                let percent = if tree.total_samples != 0 {
                    tree.total_error_callchains as f64 * 100.0 / tree.total_samples as f64
                } else {
                    0.0
                };
                writeln!(
                    w,
                    "Error Callchains: {}, {:.2}%",
                    tree.total_error_callchains, percent
                )?;
            }
            writeln!(w, "{}: {}", period_prefix, tree.total_period)?;
            writeln!(w)?;
            self.formatter.write_samples(w, tree)?;
        }
        Ok(())
    }
}

/// Rename tracepoint attrs once format data is available; the data can
/// arrive in the feature section or late in the record stream.
fn rename_tracepoint_attrs(
    attrs: &mut [EventAttrInfo],
    formats: &[TracepointFormat],
    builders: &mut [SampleTreeBuilder],
) {
    for (i, attr) in attrs.iter_mut().enumerate() {
        if attr.event_type == "tracepoint" {
            if let Some(name) = name_for_tracepoint_id(formats, attr.config) {
                if attr.name != name {
                    debug!("Renaming tracepoint attr {} to {}", attr.name, name);
                    attr.name = name.to_string();
                    if let Some(builder) = builders.get_mut(i) {
                        builder.set_event_name(attr.name.clone());
                    }
                }
            }
        }
    }
}
