pub mod common;

use batch_file_ingest::{
    core::{
        config::{BatchReadConfigBuilder, ConflictPolicy},
        field::{FieldConfig, PadDirection},
        format::{DateFormatter, Formatters},
        reader::{BatchFileReader, FileReader},
        sink::RecordBuffer,
        source::InputSource,
    },
    error::BatchError,
    item::fixed::fixed_width_writer::FixedWidthWriter,
};
use common::{
    ABEL_TURNER, BAMANGA_TUKUR, BIG_BIRD, Payment, fixed_width_payment_config, init_logger,
    payment_lines, write_temp_file,
};
use serde::Deserialize;

fn read_all(reader: &mut FileReader) -> anyhow::Result<Vec<Payment>> {
    let mut payments = Vec::new();
    let mut record = RecordBuffer::new();
    while reader.read_next_record(&mut record)? {
        payments.push(record.to_record()?);
    }
    Ok(payments)
}

#[test]
fn read_payments_from_files() -> anyhow::Result<()> {
    init_logger();
    let dir = tempfile::tempdir()?;
    let first = write_temp_file(&dir, "txt", &format!("{}\r\n{}\r\n", ABEL_TURNER, BAMANGA_TUKUR));
    let second = write_temp_file(&dir, "txt", &format!("\n{}\n", BIG_BIRD));

    let config = fixed_width_payment_config(true, ConflictPolicy::Skip);
    let mut reader = FileReader::for_config(&config)?;
    reader.open(
        &config,
        &Formatters::standard(),
        vec![InputSource::Path(first), InputSource::Path(second)],
    )?;

    let payments = read_all(&mut reader)?;
    reader.close();

    assert_eq!(payments.len(), 3);
    assert_eq!(payments[0].beneficiary, "Abel Turner");
    assert_eq!(payments[1].amount, 52000.0);
    assert_eq!(payments[2].currency, "USD");
    assert_eq!(payments[2].amount, 400.0);
    Ok(())
}

#[test]
fn skip_first_record_applies_once_across_sources() -> anyhow::Result<()> {
    let config = BatchReadConfigBuilder::new()
        .reader("fixed-width")
        .skip_first_record(true)
        .add_simple_field("accountNo", 10, true)
        .add_simple_field("beneficiary", 20, true)
        .add_simple_field("currency", 3, true)
        .add_simple_field("amount", 13, true)
        .build()?;

    let mut reader = FileReader::for_config(&config)?;
    reader.open(
        &config,
        &Formatters::new(),
        vec![
            payment_lines(&["ACCOUNT NOBENEFICIARY         CURAMOUNT       ", ABEL_TURNER]),
            payment_lines(&[BAMANGA_TUKUR]),
        ],
    )?;

    let payments = read_all(&mut reader)?;
    reader.close();

    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0].account_no, "0123456789");
    assert_eq!(payments[1].account_no, "6758495839");
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Settlement {
    reference: String,
    value_date: String,
    amount: f64,
}

#[test]
fn formatters_normalise_values() -> anyhow::Result<()> {
    let fields = vec![
        FieldConfig::new("reference", 8).with_pad(PadDirection::Right, '*'),
        FieldConfig::new("valueDate", 8).with_formatter("ddmmyyyy"),
        FieldConfig::new("amount", 10)
            .with_pad(PadDirection::Left, '0')
            .with_formatter("cent"),
    ];
    let mut writer = FixedWidthWriter::new(&fields, Vec::new());
    writer.write_record(&["REF1", "31012024", "52043"])?;
    writer.write_record(&["REF2", "01022024", "0"])?;
    let file = writer.into_inner()?;

    let mut config = BatchReadConfigBuilder::new().reader("fixed-width");
    for field in fields {
        config = config.add_field_config(field);
    }
    let config = config.build()?;
    let formatters = Formatters::standard().with("ddmmyyyy", DateFormatter::new("%d%m%Y"));

    let mut reader = FileReader::for_config(&config)?;
    reader.open(&config, &formatters, vec![InputSource::Bytes(file)])?;

    let mut record = RecordBuffer::new();
    assert!(reader.read_next_record(&mut record)?);
    let settlement: Settlement = record.to_record()?;
    assert_eq!(settlement.reference, "REF1");
    assert_eq!(settlement.value_date, "2024-01-31");
    assert_eq!(settlement.amount, 520.43);

    assert!(reader.read_next_record(&mut record)?);
    assert_eq!(record.get("amount"), Some("0.00"));
    assert!(!reader.read_next_record(&mut record)?);
    reader.close();
    Ok(())
}

#[test]
fn short_line_is_a_record_format_error() -> anyhow::Result<()> {
    let config = fixed_width_payment_config(true, ConflictPolicy::Skip);
    let mut reader = FileReader::for_config(&config)?;
    reader.open(
        &config,
        &Formatters::new(),
        vec![payment_lines(&[ABEL_TURNER, "6758495839Bamanga Tukur"])],
    )?;

    let mut record = RecordBuffer::new();
    assert!(reader.read_next_record(&mut record)?);
    assert!(matches!(
        reader.read_next_record(&mut record),
        Err(BatchError::RecordFormat(_))
    ));
    reader.close();
    Ok(())
}

#[test]
fn unknown_formatter_fails_open() -> anyhow::Result<()> {
    let config = BatchReadConfigBuilder::new()
        .reader("fixed-width")
        .add_field_config(FieldConfig::new("amount", 13).with_formatter("euro"))
        .build()?;

    let mut reader = FileReader::for_config(&config)?;
    let result = reader.open(&config, &Formatters::standard(), vec![payment_lines(&[ABEL_TURNER])]);

    assert!(matches!(result, Err(BatchError::Configuration(_))));
    Ok(())
}
