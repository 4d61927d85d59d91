use std::{collections::VecDeque, io::Read, sync::Arc};

use crate::{
    core::{
        config::{BatchReadConfig, ReaderKind},
        field::FieldConfig,
        format::{Formatter, Formatters},
        sink::RecordSink,
        source::InputSource,
    },
    error::BatchError,
    item::{delimited::delimited_reader::DelimitedReader, fixed::fixed_width_reader::FixedWidthReader},
};

#[cfg(feature = "xml")]
use crate::item::xml::xml_reader::XmlReader;

/// Record-by-record reader of a batch file.
///
/// A reader goes through `UNOPENED -> OPEN -> CLOSED` exactly once. Reading or
/// skipping outside the `OPEN` state fails with [`BatchError::IllegalState`].
pub trait BatchFileReader {
    /// Prepares the reader for the given configuration and sources.
    ///
    /// Fails with [`BatchError::Configuration`] when `sources` is empty or a
    /// source cannot be read. When the configuration skips its first record,
    /// that record is consumed before returning.
    fn open(
        &mut self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
    ) -> Result<(), BatchError>;

    /// Decodes the next record into `sink`. Returns `false` at end of input.
    fn read_next_record(&mut self, sink: &mut dyn RecordSink) -> Result<bool, BatchError>;

    /// Advances past the next record without decoding its values. Returns
    /// `false` at end of input.
    fn skip_next_record(&mut self) -> Result<bool, BatchError>;

    /// Releases every held resource. Never fails, may be called repeatedly.
    fn close(&mut self);
}

/// Lifecycle of a [`BatchFileReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderState {
    #[default]
    Unopened,
    Open,
    Closed,
}

impl ReaderState {
    pub fn ensure_unopened(&self) -> Result<(), BatchError> {
        match self {
            ReaderState::Unopened => Ok(()),
            state => Err(BatchError::IllegalState(format!(
                "Reader can only be opened once, current state: {:?}",
                state
            ))),
        }
    }

    pub fn ensure_open(&self) -> Result<(), BatchError> {
        match self {
            ReaderState::Open => Ok(()),
            state => Err(BatchError::IllegalState(format!(
                "Reader is not open, current state: {:?}",
                state
            ))),
        }
    }
}

/// Opens every source up front so that an unreadable source fails `open`.
pub(crate) fn open_sources(
    sources: Vec<InputSource>,
) -> Result<VecDeque<Box<dyn Read + Send>>, BatchError> {
    if sources.is_empty() {
        return Err(BatchError::Configuration(
            "No batch file source supplied".to_string(),
        ));
    }

    sources.into_iter().map(InputSource::open).collect()
}

/// A field together with its resolved formatter, as used by the line readers.
pub(crate) type ResolvedField = (FieldConfig, Option<Arc<dyn Formatter>>);

pub(crate) fn resolve_fields(
    config: &BatchReadConfig,
    formatters: &Formatters,
) -> Result<Vec<ResolvedField>, BatchError> {
    let resolved = formatters.resolve(config.fields())?;
    Ok(config.fields().iter().cloned().zip(resolved).collect())
}

/// The readers a configuration can select from.
pub enum FileReader {
    FixedWidth(FixedWidthReader),
    Delimited(DelimitedReader),
    #[cfg(feature = "xml")]
    Xml(XmlReader),
}

impl FileReader {
    pub fn new(kind: ReaderKind) -> Result<Self, BatchError> {
        match kind {
            ReaderKind::FixedWidth => Ok(FileReader::FixedWidth(FixedWidthReader::new())),
            ReaderKind::Delimited => Ok(FileReader::Delimited(DelimitedReader::new())),
            #[cfg(feature = "xml")]
            ReaderKind::Xml => Ok(FileReader::Xml(XmlReader::new())),
            #[cfg(not(feature = "xml"))]
            ReaderKind::Xml => Err(BatchError::Configuration(
                "XML batch file reader requires the `xml` feature".to_string(),
            )),
        }
    }

    /// Creates the reader targeted by the configuration's reader identifier.
    pub fn for_config(config: &BatchReadConfig) -> Result<Self, BatchError> {
        Self::new(config.reader_kind()?)
    }

    pub fn kind(&self) -> ReaderKind {
        match self {
            FileReader::FixedWidth(_) => ReaderKind::FixedWidth,
            FileReader::Delimited(_) => ReaderKind::Delimited,
            #[cfg(feature = "xml")]
            FileReader::Xml(_) => ReaderKind::Xml,
        }
    }

    fn inner(&mut self) -> &mut dyn BatchFileReader {
        match self {
            FileReader::FixedWidth(reader) => reader,
            FileReader::Delimited(reader) => reader,
            #[cfg(feature = "xml")]
            FileReader::Xml(reader) => reader,
        }
    }
}

impl BatchFileReader for FileReader {
    fn open(
        &mut self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
    ) -> Result<(), BatchError> {
        self.inner().open(config, formatters, sources)
    }

    fn read_next_record(&mut self, sink: &mut dyn RecordSink) -> Result<bool, BatchError> {
        self.inner().read_next_record(sink)
    }

    fn skip_next_record(&mut self) -> Result<bool, BatchError> {
        self.inner().skip_next_record()
    }

    fn close(&mut self) {
        self.inner().close()
    }
}
