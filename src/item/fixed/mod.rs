/// Fixed-width (positional) batch files.
///
/// Each line of a fixed-width file is one record. Field values sit at fixed
/// character offsets computed from the configured field widths, in
/// configuration order; no delimiter is scanned.
///
/// # Module Architecture
///
/// 1. **FixedWidthReader**: decodes lines into a record sink, applying the trim,
///    padding and formatter settings of each field.
///
/// 2. **FixedWidthWriter**: renders records back into padded lines, handy to
///    produce files for the reader.
///
/// # Examples
///
/// ```
/// use batch_file_ingest::core::{
///     config::BatchReadConfigBuilder,
///     field::{FieldConfig, PadDirection},
///     format::Formatters,
///     reader::BatchFileReader,
///     sink::RecordBuffer,
///     source::InputSource,
/// };
/// use batch_file_ingest::item::fixed::{
///     fixed_width_reader::FixedWidthReader,
///     fixed_width_writer::FixedWidthWriter,
/// };
///
/// let config = BatchReadConfigBuilder::new()
///     .reader("fixed-width")
///     .add_field_config(FieldConfig::new("currency", 3))
///     .add_field_config(
///         FieldConfig::new("amount", 13)
///             .with_pad(PadDirection::Left, '0')
///             .with_formatter("cent"),
///     )
///     .build()
///     .unwrap();
///
/// let mut writer = FixedWidthWriter::new(config.fields(), Vec::new());
/// writer.write_record(&["NGN", "52043"]).unwrap();
/// let file = writer.into_inner().unwrap();
///
/// let mut reader = FixedWidthReader::new();
/// reader
///     .open(&config, &Formatters::standard(), vec![InputSource::Bytes(file)])
///     .unwrap();
///
/// let mut record = RecordBuffer::new();
/// assert!(reader.read_next_record(&mut record).unwrap());
/// assert_eq!(record.get("amount"), Some("520.43"));
/// reader.close();
/// ```

/// A module providing facilities for reading fixed-width records.
pub mod fixed_width_reader;

/// A module providing facilities for writing fixed-width records.
pub mod fixed_width_writer;
