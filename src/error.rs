use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    /// Bad or missing setup, surfaced before any record is read.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A line or field is malformed for the format being read.
    #[error("Record format error: {0}")]
    RecordFormat(String),

    #[error("XML batch tag missing before tag: {0}")]
    MissingStartTag(String),

    #[error("XML batch item tag nested or unclosed: {0}")]
    NestedItemTag(String),

    #[error("XML field tag not configured: {0}")]
    UnknownFieldTag(String),

    #[error("XML field tag repeated within one item: {0}")]
    DuplicateFieldTag(String),

    /// Raised under the `FAIL` conflict policy only.
    #[error("Record already exists: existing {existing}, incoming {incoming}")]
    DuplicateRecord { existing: String, incoming: String },

    #[error("Record sink write failed: {0}")]
    SinkWrite(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}
