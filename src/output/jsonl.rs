//! JSON-lines record sink

use crate::normalize::ProductRecord;
use crate::output::traits::{RecordSink, SinkResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    written: u64,
}

impl JsonLinesSink<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`
    pub fn create(path: &Path) -> SinkResult<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn accept(&mut self, record: &ProductRecord) -> SinkResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        self.writer.flush()?;
        tracing::debug!("Flushed {} records", self.written);
        Ok(())
    }
}
