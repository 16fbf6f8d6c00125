//! Trace file loader.
//!
//! Opens and deserializes one trace container, then hands records out in
//! stored order. Aggregation is order dependent (off-cpu weights pair
//! consecutive same-thread records), so there is exactly one streaming
//! entry point and it never reorders.

use crate::record::schema::{EventAttr, Features, MetaInfo, Record};
use crate::utils::error::FormatError;
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// An opened trace file
///
/// **Public** - created once per report run during the Open phase
#[derive(Debug)]
pub struct RecordFile {
    meta: MetaInfo,
    attrs: Vec<EventAttr>,
    features: Features,
    records: Vec<Record>,
}

impl RecordFile {
    /// Open and deserialize a trace file
    ///
    /// # Errors
    /// * `FormatError::OpenFailed` - file cannot be read
    /// * `FormatError::JsonError` - document is not a valid trace container
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        debug!("Opening trace file: {}", path.display());

        #[derive(serde::Deserialize)]
        struct TraceFile {
            #[serde(default)]
            meta: MetaInfo,
            attrs: Vec<EventAttr>,
            #[serde(default)]
            features: Features,
            #[serde(default)]
            records: Vec<Record>,
        }

        let file = File::open(path)?;
        let parsed: TraceFile = serde_json::from_reader(BufReader::new(file))?;

        debug!(
            "Loaded trace: {} attrs, {} records",
            parsed.attrs.len(),
            parsed.records.len()
        );

        Ok(Self {
            meta: parsed.meta,
            attrs: parsed.attrs,
            features: parsed.features,
            records: parsed.records,
        })
    }

    /// Run-level metadata flags
    pub fn meta(&self) -> &MetaInfo {
        &self.meta
    }

    /// Monitored event attributes, in declaration order
    pub fn attrs(&self) -> &[EventAttr] {
        &self.attrs
    }

    /// Feature section
    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Visit every record in stored order
    ///
    /// The callback may fail; streaming stops at the first error.
    pub fn for_each_record<F>(&self, mut f: F) -> Result<(), FormatError>
    where
        F: FnMut(&Record) -> Result<(), FormatError>,
    {
        for record in &self.records {
            f(record)?;
        }
        Ok(())
    }
}

/// Resolve a tracepoint id to its event name
///
/// **Public** - usable only after format data has been supplied, either
/// from the feature section or from an in-stream tracing data record
pub fn name_for_tracepoint_id(
    formats: &[crate::record::schema::TracepointFormat],
    id: u64,
) -> Option<&str> {
    formats.iter().find(|f| f.id == id).map(|f| f.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::schema::TracepointFormat;
    use std::io::Write;

    #[test]
    fn test_open_minimal_trace() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"attrs":[{{"name":"cpu-cycles","type":"hardware"}}]}}"#
        )
        .unwrap();

        let rf = RecordFile::open(file.path()).unwrap();
        assert_eq!(rf.attrs().len(), 1);
        assert_eq!(rf.attrs()[0].name, "cpu-cycles");
        assert!(!rf.meta().trace_offcpu);
    }

    #[test]
    fn test_open_missing_file() {
        let err = RecordFile::open("/nonexistent/trace.json").unwrap_err();
        assert!(matches!(err, FormatError::OpenFailed(_)));
    }

    #[test]
    fn test_open_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = RecordFile::open(file.path()).unwrap_err();
        assert!(matches!(err, FormatError::JsonError(_)));
    }

    #[test]
    fn test_name_for_tracepoint_id() {
        let formats = vec![TracepointFormat {
            id: 317,
            name: "sched:sched_switch".to_string(),
        }];
        assert_eq!(
            name_for_tracepoint_id(&formats, 317),
            Some("sched:sched_switch")
        );
        assert_eq!(name_for_tracepoint_id(&formats, 1), None);
    }
}
