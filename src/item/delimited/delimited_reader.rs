use std::{
    collections::VecDeque,
    io::{BufRead, BufReader, Read},
};

use csv::StringRecord;
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
    item::delimited::{FIELD_DELIMITER_PARAM, FieldDelimiterType},
};

/// Reads a quoted value up to its closing quote. Returns the unescaped content
/// and the text following the closing quote.
fn unquote(quoted: &str) -> Result<(String, &str), String> {
    let mut value = String::with_capacity(quoted.len());
    let mut chars = quoted.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &quoted[index + 1..])),
            '\\' if quoted[index + 1..].starts_with('"') => {
                value.push('"');
                chars.next();
            }
            _ => value.push(c),
        }
    }

    Err("quoted value is not closed before the end of the line".to_string())
}

/// Splits one line into `record`.
///
/// A value opening with `"` runs to the next quote not preceded by `\`, and
/// only `\"` is unescaped inside it. Its closing quote must be followed by the
/// delimiter or the end of the line. Any other value runs to the next
/// delimiter.
fn split_line(line: &str, delimiter: char, record: &mut StringRecord) -> Result<(), String> {
    record.clear();
    let mut rest = line;

    loop {
        if let Some(quoted) = rest.strip_prefix('"') {
            let (value, after) = unquote(quoted)?;
            record.push_field(&value);
            match after.chars().next() {
                None => return Ok(()),
                Some(c) if c == delimiter => rest = &after[c.len_utf8()..],
                Some(_) => {
                    return Err(format!(
                        "unexpected text {:?} after closing quote of value {}",
                        after,
                        record.len()
                    ));
                }
            }
        } else {
            match rest.find(delimiter) {
                Some(index) => {
                    record.push_field(&rest[..index]);
                    rest = &rest[index + delimiter.len_utf8()..];
                }
                None => {
                    record.push_field(rest);
                    return Ok(());
                }
            }
        }
    }
}

/// Reader of delimited files: one record per line, values split on the
/// configured delimiter and matched to the configured fields by position.
///
/// A value starting with `"` runs to the next unescaped `"`, so it may hold
/// delimiters; `\"` inside it stands for a literal quote. A quoted value never
/// spans lines. Values with more entries than fields are accepted and the
/// extra entries ignored. Zero-length lines are not records.
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
/// use batch_file_ingest::item::delimited::{
///     FieldDelimiterType, delimited_reader::DelimitedReader,
/// };
///
/// let config = BatchReadConfigBuilder::new()
///     .reader("delimited")
///     .add_param("fieldDelimiterType", FieldDelimiterType::Comma)
///     .add_simple_field("accountNo", 0, true)
///     .add_simple_field("beneficiary", 0, true)
///     .build()
///     .unwrap();
///
/// let mut reader = DelimitedReader::new();
/// reader
///     .open(
///         &config,
///         &Formatters::new(),
///         vec![InputSource::lines([r#"6758495839,"Bamanga Tukur, Kano""#])],
///     )
///     .unwrap();
///
/// let mut record = RecordBuffer::new();
/// assert!(reader.read_next_record(&mut record).unwrap());
/// assert_eq!(record.get("beneficiary"), Some("Bamanga Tukur, Kano"));
/// reader.close();
/// ```
pub struct DelimitedReader {
    state: ReaderState,
    fields: Vec<ResolvedField>,
    delimiter: char,
    sources: VecDeque<Box<dyn Read + Send>>,
    current: Option<BufReader<Box<dyn Read + Send>>>,
    line: String,
    line_number: usize,
}

impl Default for DelimitedReader {
    fn default() -> Self {
        Self {
            state: ReaderState::default(),
            fields: Vec::new(),
            delimiter: FieldDelimiterType::Comma.delimiter(),
            sources: VecDeque::new(),
            current: None,
            line: String::new(),
            line_number: 0,
        }
    }
}

impl DelimitedReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the next non-empty line into `self.line`, moving on to the next
    /// source when the current one is exhausted.
    fn next_line(&mut self) -> Result<bool, BatchError> {
        loop {
            if self.current.is_none() {
                let Some(source) = self.sources.pop_front() else {
                    debug!("End of delimited input after {} lines", self.line_number);
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
        let mut record = StringRecord::with_capacity(self.line.len(), self.fields.len());
        split_line(&self.line, self.delimiter, &mut record).map_err(|e| {
            BatchError::RecordFormat(format!("Line {}: {}", self.line_number, e))
        })?;

        if record.len() < self.fields.len() {
            return Err(BatchError::RecordFormat(format!(
                "Line {} has {} values, {} fields are configured",
                self.line_number,
                record.len(),
                self.fields.len()
            )));
        }

        for ((field, formatter), raw) in self.fields.iter().zip(record.iter()) {
            sink.store(field.field_name(), Some(field.clean(raw)), formatter.as_deref())?;
        }

        Ok(())
    }
}

impl BatchFileReader for DelimitedReader {
    fn open(
        &mut self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
    ) -> Result<(), BatchError> {
        self.state.ensure_unopened()?;

        let delimiter_type: FieldDelimiterType = config.required_parameter(FIELD_DELIMITER_PARAM)?;
        self.delimiter = delimiter_type.delimiter();
        self.fields = resolve_fields(config, formatters)?;
        self.sources = open_sources(sources)?;
        self.state = ReaderState::Open;
        debug!(
            "Delimited reader opened with {} fields, delimiter {:?}",
            self.fields.len(),
            delimiter_type
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
            debug!("Delimited reader closed");
        }
    }
}
