use std::{
    collections::VecDeque,
    io::{BufRead, BufReader, Read},
};

use log::debug;

use crate::{
    core::{
        config::BatchReadConfig,
        format::Formatters,
        reader::{BatchFileReader, ReaderState, ResolvedField, open_sources, resolve_fields},
        sink::RecordSink,
        source::InputSource,
    },
    error::BatchError,
};

/// Splits `rest` after its first `n` characters, or returns `None` when it is
/// shorter than that.
fn split_chars(rest: &str, n: usize) -> Option<(&str, &str)> {
    if n == 0 {
        return Some(("", rest));
    }

    rest.char_indices()
        .nth(n - 1)
        .map(|(index, c)| rest.split_at(index + c.len_utf8()))
}

/// Reader of fixed-width files: one record per line, each configured field
/// taking exactly `length` characters in configuration order.
///
/// Zero-length lines are not records and are passed over. Sources are read one
/// after the other as a single stream of lines.
///
/// # Examples
///
/// ```
/// use batch_file_ingest::core::{
///     config::BatchReadConfigBuilder,
///     format::Formatters,
///     reader::BatchFileReader,
///     sink::RecordBuffer,
///     source::InputSource,
/// };
/// use batch_file_ingest::item::fixed::fixed_width_reader::FixedWidthReader;
///
/// let config = BatchReadConfigBuilder::new()
///     .reader("fixed-width")
///     .add_simple_field("accountNo", 10, true)
///     .add_simple_field("beneficiary", 20, true)
///     .build()
///     .unwrap();
///
/// let mut reader = FixedWidthReader::new();
/// reader
///     .open(
///         &config,
///         &Formatters::new(),
///         vec![InputSource::lines(["0123456789Abel Turner         "])],
///     )
///     .unwrap();
///
/// let mut record = RecordBuffer::new();
/// assert!(reader.read_next_record(&mut record).unwrap());
/// assert_eq!(record.get("beneficiary"), Some("Abel Turner"));
/// assert!(!reader.read_next_record(&mut record).unwrap());
/// reader.close();
/// ```
#[derive(Default)]
pub struct FixedWidthReader {
    state: ReaderState,
    fields: Vec<ResolvedField>,
    sources: VecDeque<Box<dyn Read + Send>>,
    current: Option<BufReader<Box<dyn Read + Send>>>,
    line: String,
    line_number: usize,
}

impl FixedWidthReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the next non-empty line into `self.line`, moving on to the next
    /// source when the current one is exhausted.
    fn next_line(&mut self) -> Result<bool, BatchError> {
        loop {
            if self.current.is_none() {
                let Some(source) = self.sources.pop_front() else {
                    debug!("End of fixed-width input after {} lines", self.line_number);
                    return Ok(false);
                };
                self.current = Some(BufReader::new(source));
            }

            self.line.clear();
            let read = match self.current.as_mut() {
                Some(current) => current.read_line(&mut self.line),
                None => Ok(0),
            }
            .map_err(|e| {
                BatchError::RecordFormat(format!(
                    "Failed to read line {}: {}",
                    self.line_number + 1,
                    e
                ))
            })?;

            if read == 0 {
                self.current = None;
                continue;
            }

            self.line_number += 1;
            let content_length = self.line.trim_end_matches(['\r', '\n']).len();
            self.line.truncate(content_length);
            if !self.line.is_empty() {
                return Ok(true);
            }
        }
    }

    fn decode_line(&self, sink: &mut dyn RecordSink) -> Result<(), BatchError> {
        let mut rest = self.line.as_str();
        let mut offset = 0;

        for (field, formatter) in &self.fields {
            let (raw, remaining) = split_chars(rest, field.length()).ok_or_else(|| {
                BatchError::RecordFormat(format!(
                    "Line {} is too short for field {} at offset {} with length {}",
                    self.line_number,
                    field.field_name(),
                    offset,
                    field.length()
                ))
            })?;

            sink.store(field.field_name(), Some(field.clean(raw)), formatter.as_deref())?;

            offset += field.length();
            rest = remaining;
        }

        Ok(())
    }
}

impl BatchFileReader for FixedWidthReader {
    fn open(
        &mut self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
    ) -> Result<(), BatchError> {
        self.state.ensure_unopened()?;

        if let Some(field) = config.fields().iter().find(|field| field.length() == 0) {
            return Err(BatchError::Configuration(format!(
                "Fixed-width field {} has no length",
                field.field_name()
            )));
        }

        self.fields = resolve_fields(config, formatters)?;
        self.sources = open_sources(sources)?;
        self.state = ReaderState::Open;
        debug!(
            "Fixed-width reader opened with {} fields, record length {}",
            self.fields.len(),
            config.record_length()
        );

        if config.is_skip_first_record() {
            self.skip_next_record()?;
        }
        Ok(())
    }

    fn read_next_record(&mut self, sink: &mut dyn RecordSink) -> Result<bool, BatchError> {
        self.state.ensure_open()?;

        if !self.next_line()? {
            return Ok(false);
        }

        self.decode_line(sink)?;
        Ok(true)
    }

    fn skip_next_record(&mut self) -> Result<bool, BatchError> {
        self.state.ensure_open()?;
        self.next_line()
    }

    fn close(&mut self) {
        if self.state != ReaderState::Closed {
            self.current = None;
            self.sources.clear();
            self.state = ReaderState::Closed;
            debug!("Fixed-width reader closed");
        }
    }
}
