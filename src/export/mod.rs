// src/export/mod.rs

//! Persistence of instance records.
//!
//! Writers implement [`RecordSink`]. [`JsonLinesSink`] writes one JSON object
//! per line; [`read_records`] reads such a file back into identical records.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::errors::Result;
use crate::report::InstanceRecord;

/// Destination for a stream of records.
pub trait RecordSink {
    fn write_record(&mut self, record: &InstanceRecord) -> Result<()>;

    /// Flush anything buffered. Called once after the last record.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Write every record, then finish the sink. Returns the count written.
pub fn write_all(sink: &mut impl RecordSink, records: &[InstanceRecord]) -> Result<usize> {
    for record in records {
        sink.write_record(record)?;
    }
    sink.finish()?;
    Ok(records.len())
}

pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }
}

impl JsonLinesSink<File> {
    /// Create (or truncate) `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening record export");
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn write_record(&mut self, record: &InstanceRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read a JSON-lines export. Blank lines are skipped.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<InstanceRecord>> {
    read_records_from(File::open(path)?)
}

pub fn read_records_from(reader: impl Read) -> Result<Vec<InstanceRecord>> {
    let mut records = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
