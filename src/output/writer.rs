//! Text writers for JSON lines and delimited output

use super::sink::OutputSink;
use crate::decode::lookup_path;
use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::io::Write;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one object per line)
    #[default]
    Json,
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
}

/// Build a writer for `format` on top of `out`
pub fn build_writer<W: Write + Send + 'static>(
    format: OutputFormat,
    fields: Vec<String>,
    header: bool,
    out: W,
) -> Box<dyn OutputSink> {
    match format {
        OutputFormat::Json => Box::new(JsonLinesWriter::new(out).with_fields(fields)),
        OutputFormat::Csv => Box::new(DelimitedWriter::new(out, ',', fields, header)),
        OutputFormat::Tsv => Box::new(DelimitedWriter::new(out, '\t', fields, header)),
    }
}

// ============================================================================
// JSON Lines
// ============================================================================

/// Writes one compact JSON document per line
#[derive(Debug)]
pub struct JsonLinesWriter<W: Write> {
    out: W,
    fields: Vec<String>,
}

impl<W: Write> JsonLinesWriter<W> {
    /// Create a writer on top of `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            fields: Vec::new(),
        }
    }

    /// Only keep these fields (dot paths) in each record
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Consume the writer and return the underlying output
    pub fn into_inner(self) -> W {
        self.out
    }

    fn project(&self, record: &JsonValue) -> JsonValue {
        if self.fields.is_empty() {
            return record.clone();
        }
        let projected = self
            .fields
            .iter()
            .map(|field| {
                let value = lookup_path(record, field).unwrap_or(JsonValue::Null);
                (field.clone(), value)
            })
            .collect();
        JsonValue::Object(projected)
    }
}

impl<W: Write + Send> OutputSink for JsonLinesWriter<W> {
    fn write_record(&mut self, record: &JsonValue) -> Result<()> {
        let line = serde_json::to_string(&self.project(record))?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

// ============================================================================
// Delimited
// ============================================================================

/// Writes records as delimited rows.
///
/// When no fields are given, the columns are the top-level keys of the
/// first record and stay fixed for the rest of the output.
#[derive(Debug)]
pub struct DelimitedWriter<W: Write> {
    out: W,
    delimiter: char,
    fields: Vec<String>,
    header: bool,
    header_written: bool,
}

impl<W: Write> DelimitedWriter<W> {
    /// Create a writer on top of `out`
    pub fn new(out: W, delimiter: char, fields: Vec<String>, header: bool) -> Self {
        Self {
            out,
            delimiter,
            fields,
            header,
            header_written: false,
        }
    }

    /// Consume the writer and return the underlying output
    pub fn into_inner(self) -> W {
        self.out
    }

    fn row(&self, cells: impl Iterator<Item = String>) -> String {
        let delimiter = self.delimiter.to_string();
        cells
            .map(|cell| self.quote(&cell))
            .collect::<Vec<_>>()
            .join(&delimiter)
    }

    fn quote(&self, cell: &str) -> String {
        let needs_quotes = cell.contains(self.delimiter)
            || cell.contains('"')
            || cell.contains('\n')
            || cell.contains('\r');
        if needs_quotes {
            format!("\"{}\"", cell.replace('"', "\"\""))
        } else {
            cell.to_string()
        }
    }
}

impl<W: Write + Send> OutputSink for DelimitedWriter<W> {
    fn write_record(&mut self, record: &JsonValue) -> Result<()> {
        if self.fields.is_empty() {
            let object = record
                .as_object()
                .ok_or_else(|| Error::output("delimited output needs object records"))?;
            self.fields = object.keys().cloned().collect();
        }

        if self.header && !self.header_written {
            let header = self.row(self.fields.iter().cloned());
            writeln!(self.out, "{header}")?;
            self.header_written = true;
        }

        let cells = self
            .fields
            .iter()
            .map(|field| render_cell(lookup_path(record, field).as_ref()));
        let line = self.row(cells);
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

fn render_cell(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Bool(b)) => b.to_string(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}
