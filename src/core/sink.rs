use csv::StringRecord;
use serde::de::DeserializeOwned;

use crate::{core::format::Formatter, error::BatchError};

/// Write-only destination of the decoded fields of one record.
///
/// Implementations own type coercion: a reader hands over the cleaned raw value
/// of each configured field together with the field's formatter, if any.
/// Errors are propagated verbatim by the readers, and are expected to be
/// [`BatchError::SinkWrite`].
pub trait RecordSink {
    fn store(
        &mut self,
        field_name: &str,
        value: Option<&str>,
        formatter: Option<&dyn Formatter>,
    ) -> Result<(), BatchError>;
}

/// Stock [`RecordSink`] keeping the formatted values of one record in field
/// order, and deserializing them into any serde record type.
///
/// Values are coerced the way CSV rows are: `"20000"` into an `f64` field,
/// an empty or missing value into `None` for `Option` fields.
///
/// # Examples
///
/// ```
/// use batch_file_ingest::core::{format::CentFormatter, sink::{RecordBuffer, RecordSink}};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// #[serde(rename_all = "camelCase")]
/// struct Payment {
///     account_no: String,
///     amount: f64,
/// }
///
/// let mut buffer = RecordBuffer::new();
/// buffer.store("accountNo", Some("0123456789"), None).unwrap();
/// buffer.store("amount", Some("52043"), Some(&CentFormatter)).unwrap();
///
/// let payment: Payment = buffer.to_record().unwrap();
/// assert_eq!(payment.amount, 520.43);
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordBuffer {
    values: Vec<(String, Option<String>)>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field_name)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Field names and values, in the order they were first stored.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Deserializes the buffered values into `T`, matching fields by name.
    pub fn to_record<T: DeserializeOwned>(&self) -> Result<T, BatchError> {
        let headers: StringRecord = self.values.iter().map(|(name, _)| name.as_str()).collect();
        let record: StringRecord = self
            .values
            .iter()
            .map(|(_, value)| value.as_deref().unwrap_or_default())
            .collect();

        record
            .deserialize(Some(&headers))
            .map_err(|e| BatchError::SinkWrite(e.to_string()))
    }
}

impl RecordSink for RecordBuffer {
    fn store(
        &mut self,
        field_name: &str,
        value: Option<&str>,
        formatter: Option<&dyn Formatter>,
    ) -> Result<(), BatchError> {
        let value = match (value, formatter) {
            (Some(raw), Some(formatter)) => Some(formatter.format(raw)?),
            (value, _) => value.map(str::to_string),
        };

        match self.values.iter_mut().find(|(name, _)| name == field_name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((field_name.to_string(), value)),
        }
        Ok(())
    }
}
