use std::{collections::HashMap, fmt, sync::Arc};

use chrono::NaiveDate;

use crate::{core::field::FieldConfig, error::BatchError};

/// Normalises a raw field value into its canonical textual form before the
/// record sink coerces it into the destination type.
pub trait Formatter: Send + Sync {
    fn format(&self, raw: &str) -> Result<String, BatchError>;
}

impl<F> Formatter for F
where
    F: Fn(&str) -> Result<String, BatchError> + Send + Sync,
{
    fn format(&self, raw: &str) -> Result<String, BatchError> {
        self(raw)
    }
}

/// Reads an integer amount of minor units and renders it as a decimal with two
/// fractional digits: `"0000000052043"` becomes `"520.43"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CentFormatter;

impl Formatter for CentFormatter {
    fn format(&self, raw: &str) -> Result<String, BatchError> {
        let cents: i64 = raw
            .trim()
            .parse()
            .map_err(|e| BatchError::SinkWrite(format!("Invalid cent amount {:?}: {}", raw, e)))?;
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.unsigned_abs();
        Ok(format!("{}{}.{:02}", sign, cents / 100, cents % 100))
    }
}

/// Parses a date written with a `chrono` pattern and renders it as ISO
/// `YYYY-MM-DD`.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
}

impl DateFormatter {
    pub fn new<S: Into<String>>(pattern: S) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl Formatter for DateFormatter {
    fn format(&self, raw: &str) -> Result<String, BatchError> {
        let date = NaiveDate::parse_from_str(raw.trim(), &self.pattern).map_err(|e| {
            BatchError::SinkWrite(format!(
                "Invalid date {:?} for pattern {}: {}",
                raw, self.pattern, e
            ))
        })?;
        Ok(date.format("%Y-%m-%d").to_string())
    }
}

/// Explicit set of formatters, keyed by the identifiers field configurations
/// refer to. Built by the caller and handed to a reader when it is opened.
#[derive(Clone, Default)]
pub struct Formatters {
    by_id: HashMap<String, Arc<dyn Formatter>>,
}

impl Formatters {
    pub fn new() -> Self {
        Self::default()
    }

    /// `cent` and ISO `date` (`%Y%m%d` source pattern) formatters.
    pub fn standard() -> Self {
        Self::new()
            .with("cent", CentFormatter)
            .with("date", DateFormatter::new("%Y%m%d"))
    }

    pub fn with<S: Into<String>, F: Formatter + 'static>(mut self, id: S, formatter: F) -> Self {
        self.by_id.insert(id.into(), Arc::new(formatter));
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Formatter>> {
        self.by_id.get(id).cloned()
    }

    /// Resolves the formatter of every field, in field order.
    pub fn resolve(&self, fields: &[FieldConfig]) -> Result<Vec<Option<Arc<dyn Formatter>>>, BatchError> {
        fields
            .iter()
            .map(|field| match field.formatter_id() {
                None => Ok(None),
                Some(id) => self.get(id).map(Some).ok_or_else(|| {
                    BatchError::Configuration(format!(
                        "Unknown formatter {} for field {}",
                        id,
                        field.field_name()
                    ))
                }),
            })
            .collect()
    }
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatters")
            .field("ids", &self.by_id.keys().collect::<Vec<_>>())
            .finish()
    }
}
