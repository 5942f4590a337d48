//! Output sink trait

use crate::error::Result;
use crate::state::Item;
use crate::types::JsonValue;

/// Destination for emitted records
pub trait OutputSink: Send {
    /// Render a single record
    fn write_record(&mut self, record: &JsonValue) -> Result<()>;

    /// Render a polled item
    fn emit(&mut self, item: &Item) -> Result<()> {
        self.write_record(&item.payload)
    }

    /// Flush buffered output
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps every item in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Items in emission order
    pub items: Vec<Item>,
    /// Records written directly, in order
    pub records: Vec<JsonValue>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of emitted items, in emission order
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().filter_map(|item| item.id.clone()).collect()
    }
}

impl OutputSink for MemorySink {
    fn write_record(&mut self, record: &JsonValue) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn emit(&mut self, item: &Item) -> Result<()> {
        self.items.push(item.clone());
        self.write_record(&item.payload)
    }
}
