mod common;

use std::path::PathBuf;

use batch_file_ingest::{
    core::{
        config::{BatchReadConfig, BatchReadConfigBuilder, ConflictPolicy, ReaderKind},
        format::{Formatter, Formatters},
        reader::{BatchFileReader, FileReader},
        sink::{RecordBuffer, RecordSink},
        source::InputSource,
    },
    error::BatchError,
};
use common::{ABEL_TURNER, fixed_width_payment_config, payment_lines};

#[test]
fn unknown_reader_id_is_rejected() {
    let config = BatchReadConfigBuilder::new().reader("json").build().unwrap();

    assert!(matches!(
        FileReader::for_config(&config),
        Err(BatchError::Configuration(_))
    ));
    assert!(matches!(
        "yaml-batchfilereader".parse::<ReaderKind>(),
        Err(BatchError::Configuration(_))
    ));
}

#[test]
fn invalid_json_configuration_is_rejected() {
    assert!(matches!(
        BatchReadConfig::from_json("{ \"reader_id\": "),
        Err(BatchError::Configuration(_))
    ));
    assert!(matches!(
        BatchReadConfig::from_json("{ \"reader_id\": \"xml\", \"on_conflict\": \"MERGE\" }"),
        Err(BatchError::Configuration(_))
    ));
}

#[test]
fn reader_requires_at_least_one_source() {
    let config = fixed_width_payment_config(true, ConflictPolicy::Skip);

    for kind in [ReaderKind::FixedWidth, ReaderKind::Delimited, ReaderKind::Xml] {
        let mut reader = FileReader::new(kind).unwrap();
        let result = reader.open(&config, &Formatters::new(), Vec::new());
        assert!(
            matches!(result, Err(BatchError::Configuration(_))),
            "{} reader accepted no source",
            kind
        );
        reader.close();
    }
}

#[test]
fn missing_file_fails_open() {
    let config = fixed_width_payment_config(true, ConflictPolicy::Skip);
    let mut reader = FileReader::for_config(&config).unwrap();

    let result = reader.open(
        &config,
        &Formatters::new(),
        vec![InputSource::Path(PathBuf::from("/nonexistent/payments.txt"))],
    );

    assert!(matches!(result, Err(BatchError::Configuration(_))));
}

#[test]
fn reader_cannot_be_reopened() {
    let config = fixed_width_payment_config(true, ConflictPolicy::Skip);
    let mut reader = FileReader::for_config(&config).unwrap();
    reader
        .open(&config, &Formatters::new(), vec![payment_lines(&[ABEL_TURNER])])
        .unwrap();

    let result = reader.open(&config, &Formatters::new(), vec![payment_lines(&[ABEL_TURNER])]);
    assert!(matches!(result, Err(BatchError::IllegalState(_))));

    reader.close();
    let mut record = RecordBuffer::new();
    assert!(matches!(
        reader.read_next_record(&mut record),
        Err(BatchError::IllegalState(_))
    ));
}

/// Sink refusing every value.
struct RejectingSink;

impl RecordSink for RejectingSink {
    fn store(
        &mut self,
        field_name: &str,
        _value: Option<&str>,
        _formatter: Option<&dyn Formatter>,
    ) -> Result<(), BatchError> {
        Err(BatchError::SinkWrite(format!("{} is read-only", field_name)))
    }
}

#[test]
fn sink_errors_are_propagated_verbatim() {
    let config = fixed_width_payment_config(true, ConflictPolicy::Skip);
    let mut reader = FileReader::for_config(&config).unwrap();
    reader
        .open(&config, &Formatters::new(), vec![payment_lines(&[ABEL_TURNER])])
        .unwrap();

    match reader.read_next_record(&mut RejectingSink) {
        Err(BatchError::SinkWrite(message)) => assert_eq!(message, "accountNo is read-only"),
        other => panic!("Expected a sink error, got {:?}", other),
    }
    reader.close();
}
