use std::io::Write;

use crate::{core::field::FieldConfig, error::BatchError};

/// Renders one fixed-width line: each value padded (or truncated) to its
/// field's width on the field's pad side.
///
/// # Examples
///
/// ```
/// use batch_file_ingest::core::field::{FieldConfig, PadDirection};
/// use batch_file_ingest::item::fixed::fixed_width_writer::format_line;
///
/// let fields = vec![
///     FieldConfig::new("currency", 3),
///     FieldConfig::new("amount", 8).with_pad(PadDirection::Left, '0'),
/// ];
///
/// assert_eq!(format_line(&fields, &["NGN", "20000"]).unwrap(), "NGN00020000");
/// ```
pub fn format_line<S: AsRef<str>>(fields: &[FieldConfig], values: &[S]) -> Result<String, BatchError> {
    if fields.len() != values.len() {
        return Err(BatchError::RecordFormat(format!(
            "Expected {} values, got {}",
            fields.len(),
            values.len()
        )));
    }

    Ok(fields
        .iter()
        .zip(values)
        .map(|(field, value)| field.pad_value(value.as_ref()))
        .collect())
}

/// Writes fixed-width records, one line per record.
pub struct FixedWidthWriter<W: Write> {
    fields: Vec<FieldConfig>,
    writer: W,
}

impl<W: Write> FixedWidthWriter<W> {
    pub fn new(fields: &[FieldConfig], writer: W) -> Self {
        Self {
            fields: fields.to_vec(),
            writer,
        }
    }

    pub fn write_record<S: AsRef<str>>(&mut self, values: &[S]) -> Result<(), BatchError> {
        let line = format_line(&self.fields, values)?;
        writeln!(self.writer, "{}", line)
            .map_err(|e| BatchError::SinkWrite(format!("Failed to write record: {}", e)))
    }

    /// Flushes and hands back the underlying writer.
    pub fn into_inner(mut self) -> Result<W, BatchError> {
        self.writer
            .flush()
            .map_err(|e| BatchError::SinkWrite(format!("Failed to flush records: {}", e)))?;
        Ok(self.writer)
    }
}
