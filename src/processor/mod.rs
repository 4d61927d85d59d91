//! Processors drive a batch file reader end to end and persist what it reads.
//!
//! Every processor opens the reader selected by the read configuration, turns
//! each record into a typed value through a [`RecordBuffer`], applies its own
//! business logic, and closes the reader whatever the outcome. A run is one
//! transaction of its repositories: committed when every record went through,
//! rolled back on the first error.
//!
//! # Module Architecture
//!
//! 1. **ItemBatchProcessor**: creates one record per input record, resolving
//!    unique-constraint conflicts with the configured [`ConflictPolicy`].
//!
//! 2. **BatchItemProcessor**: groups items into per-category aggregates, and
//!    persists each item linked to its aggregate.
//!
//! [`ConflictPolicy`]: crate::core::config::ConflictPolicy

use log::debug;
use serde::de::DeserializeOwned;

use crate::{
    core::{
        config::BatchReadConfig,
        format::Formatters,
        reader::{BatchFileReader, FileReader},
        sink::RecordBuffer,
        source::InputSource,
    },
    error::BatchError,
};

/// A processor consuming whole batch files.
pub trait BatchFileReadProcessor {
    type Output;

    /// Reads every record of `sources` with the reader selected by `config`
    /// and processes it.
    fn process(
        &self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
    ) -> Result<Self::Output, BatchError>;
}

/// Feeds every record of `sources` to `handle` as a `T`, returning the number
/// of records read. The reader is closed even when a record fails.
pub(crate) fn read_records<T, F>(
    config: &BatchReadConfig,
    formatters: &Formatters,
    sources: Vec<InputSource>,
    mut handle: F,
) -> Result<usize, BatchError>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<(), BatchError>,
{
    let mut reader = FileReader::for_config(config)?;
    reader.open(config, formatters, sources)?;

    let mut record = RecordBuffer::new();
    let mut count = 0;
    let result = loop {
        record.clear();
        match reader.read_next_record(&mut record) {
            Ok(true) => {
                count += 1;
                if let Err(e) = record.to_record().and_then(&mut handle) {
                    break Err(e);
                }
            }
            Ok(false) => break Ok(count),
            Err(e) => break Err(e),
        }
    };

    reader.close();
    debug!("{} records read with {} reader", count, reader.kind());
    result
}

/// A module providing the item processor with its conflict policy.
pub mod item_processor;

/// A module providing the categorized batch+item processor.
pub mod batch_processor;
