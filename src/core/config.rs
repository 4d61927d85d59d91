use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    core::field::{FieldConfig, PadDirection},
    error::BatchError,
};

/// Action taken when an incoming record matches an existing record on its
/// unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConflictPolicy {
    /// Abort the whole run.
    Fail,
    /// Copy the `update_on_conflict` fields onto the existing record.
    Update,
    /// Discard the incoming record.
    #[default]
    Skip,
}

/// The closed set of record readers a configuration can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    FixedWidth,
    Delimited,
    Xml,
}

impl ReaderKind {
    pub fn id(&self) -> &'static str {
        match self {
            ReaderKind::FixedWidth => "fixed-width",
            ReaderKind::Delimited => "delimited",
            ReaderKind::Xml => "xml",
        }
    }
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ReaderKind {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fixed-width" | "fixedlength-batchfilereader" => Ok(ReaderKind::FixedWidth),
            "delimited" | "delimited-batchfilereader" => Ok(ReaderKind::Delimited),
            "xml" | "xml-batchfilereader" => Ok(ReaderKind::Xml),
            other => Err(BatchError::Configuration(format!(
                "Unknown batch file reader: {}",
                other
            ))),
        }
    }
}

/// Immutable configuration of one batch file read.
///
/// A configuration is built once per invocation with [`BatchReadConfigBuilder`]
/// (or loaded from JSON with [`BatchReadConfig::from_json`]) and is only read
/// afterwards, so it can be shared freely between threads.
///
/// # Examples
///
/// ```
/// use batch_file_ingest::core::config::{BatchReadConfigBuilder, ConflictPolicy};
///
/// let config = BatchReadConfigBuilder::new()
///     .reader("fixed-width")
///     .processor("payment-item-processor")
///     .add_simple_field("accountNo", 10, true)
///     .add_simple_field("beneficiary", 20, true)
///     .add_simple_field("currency", 3, true)
///     .add_simple_field("amount", 13, true)
///     .on_conflict(ConflictPolicy::Update)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.fields().len(), 4);
/// assert_eq!(config.record_length(), 46);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BatchReadConfigBuilder")]
pub struct BatchReadConfig {
    reader_id: String,
    processor_id: Option<String>,
    parameters: HashMap<String, Value>,
    fields: Vec<FieldConfig>,
    on_conflict: ConflictPolicy,
    skip_first_record: bool,
}

impl BatchReadConfig {
    /// Loads a configuration from its JSON form, applying the same validation
    /// as [`BatchReadConfigBuilder::build`].
    pub fn from_json(json: &str) -> Result<Self, BatchError> {
        serde_json::from_str(json).map_err(|e| BatchError::Configuration(e.to_string()))
    }

    pub fn reader_id(&self) -> &str {
        &self.reader_id
    }

    /// Resolves the reader identifier to one of the supported readers.
    pub fn reader_kind(&self) -> Result<ReaderKind, BatchError> {
        self.reader_id.parse()
    }

    pub fn processor_id(&self) -> Option<&str> {
        self.processor_id.as_deref()
    }

    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    pub fn on_conflict(&self) -> ConflictPolicy {
        self.on_conflict
    }

    pub fn is_skip_first_record(&self) -> bool {
        self.skip_first_record
    }

    /// Sum of the configured field widths.
    pub fn record_length(&self) -> usize {
        self.fields.iter().map(FieldConfig::length).sum()
    }

    /// Target names of the fields copied onto an existing record on an update.
    pub fn update_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.is_update_on_conflict())
            .map(FieldConfig::field_name)
            .collect()
    }

    /// Returns the named parameter converted to `T`, or `None` when absent.
    pub fn parameter<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, BatchError> {
        self.parameters
            .get(name)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    BatchError::Configuration(format!("Invalid parameter {}: {}", name, e))
                })
            })
            .transpose()
    }

    /// Returns the named parameter converted to `T`, failing when absent.
    pub fn required_parameter<T: DeserializeOwned>(&self, name: &str) -> Result<T, BatchError> {
        self.parameter(name)?.ok_or_else(|| {
            BatchError::Configuration(format!("Missing mandatory parameter: {}", name))
        })
    }
}

impl TryFrom<BatchReadConfigBuilder> for BatchReadConfig {
    type Error = BatchError;

    fn try_from(builder: BatchReadConfigBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

/// Builder for [`BatchReadConfig`].
///
/// Defaults: conflict policy `SKIP`, first record not skipped, no parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BatchReadConfigBuilder {
    reader_id: Option<String>,
    processor_id: Option<String>,
    parameters: HashMap<String, Value>,
    fields: Vec<FieldConfig>,
    on_conflict: ConflictPolicy,
    skip_first_record: bool,
}

impl BatchReadConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader<S: Into<String>>(mut self, reader_id: S) -> Self {
        self.reader_id = Some(reader_id.into());
        self
    }

    pub fn processor<S: Into<String>>(mut self, processor_id: S) -> Self {
        self.processor_id = Some(processor_id.into());
        self
    }

    pub fn skip_first_record(mut self, skip_first_record: bool) -> Self {
        self.skip_first_record = skip_first_record;
        self
    }

    /// Adds a fully described field.
    #[allow(clippy::too_many_arguments)]
    pub fn add_field(
        self,
        field_name: &str,
        source_field_name: Option<&str>,
        formatter_id: Option<&str>,
        pad_direction: PadDirection,
        length: usize,
        trim: bool,
        pad: bool,
        update_on_conflict: bool,
        pad_char: char,
    ) -> Self {
        let mut field = FieldConfig::new(field_name, length)
            .with_trim(trim)
            .with_update_on_conflict(update_on_conflict);
        if let Some(source_field_name) = source_field_name {
            field = field.with_source_name(source_field_name);
        }
        if let Some(formatter_id) = formatter_id {
            field = field.with_formatter(formatter_id);
        }
        self.add_field_config(field.with_padding(pad, pad_direction, pad_char))
    }

    /// Adds a positional field with only a width and a trim flag.
    pub fn add_simple_field(self, field_name: &str, length: usize, trim: bool) -> Self {
        self.add_field_config(FieldConfig::new(field_name, length).with_trim(trim))
    }

    pub fn add_field_config(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn add_param<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn add_params(mut self, params: HashMap<String, Value>) -> Self {
        self.parameters.extend(params);
        self
    }

    pub fn on_conflict(mut self, on_conflict: ConflictPolicy) -> Self {
        self.on_conflict = on_conflict;
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// Fails when the reader identifier is unset or blank, and when a fixed-width
    /// configuration holds a field without a width.
    pub fn build(self) -> Result<BatchReadConfig, BatchError> {
        let reader_id = match self.reader_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(BatchError::Configuration(
                    "Batch file reader is not set".to_string(),
                ));
            }
        };

        if let Ok(ReaderKind::FixedWidth) = reader_id.parse::<ReaderKind>() {
            if let Some(field) = self.fields.iter().find(|field| field.length() == 0) {
                return Err(BatchError::Configuration(format!(
                    "Fixed-width field {} has no length",
                    field.field_name()
                )));
            }
        }

        Ok(BatchReadConfig {
            reader_id,
            processor_id: self.processor_id,
            parameters: self.parameters,
            fields: self.fields,
            on_conflict: self.on_conflict,
            skip_first_record: self.skip_first_record,
        })
    }
}
