//! XML batch files.
//!
//! An XML batch file holds one outer batch element wrapping any number of
//! batch item elements. Each child element of an item carries the value of the
//! configured field whose source name matches the child's tag name:
//!
//! ```text
//! <payments>
//!   <payment>
//!     <accountNo>0123456789</accountNo>
//!     <name>Abel Turner</name>
//!     <currency>NGN</currency>
//!     <amount>2000000</amount>
//!   </payment>
//! </payments>
//! ```
//!
//! The tag names of the batch and of its items are taken from the
//! `batchTagName` and `batchItemTagName` parameters of the read configuration.
//!
//! # Module Architecture
//!
//! Parsing is event driven (`quick-xml`) and runs on a worker thread started
//! when the reader is opened. The worker hands decoded items to the calling
//! thread over a bounded channel of capacity one, so at most one item is ever
//! decoded ahead of the caller. Structural violations found by the worker
//! surface as errors of the next read call.
//!
//! # Examples
//!
//! ```
//! use batch_file_ingest::core::{
//!     config::BatchReadConfigBuilder,
//!     field::FieldConfig,
//!     format::Formatters,
//!     reader::BatchFileReader,
//!     sink::RecordBuffer,
//!     source::InputSource,
//! };
//! use batch_file_ingest::item::xml::{
//!     BATCH_ITEM_TAG_NAME_PARAM, BATCH_TAG_NAME_PARAM, xml_reader::XmlReader,
//! };
//!
//! let config = BatchReadConfigBuilder::new()
//!     .reader("xml")
//!     .add_param(BATCH_TAG_NAME_PARAM, "payments")
//!     .add_param(BATCH_ITEM_TAG_NAME_PARAM, "payment")
//!     .add_field_config(FieldConfig::new("beneficiary", 0).with_source_name("name"))
//!     .add_field_config(FieldConfig::new("amount", 0).with_formatter("cent"))
//!     .build()
//!     .unwrap();
//!
//! let xml = "<payments><payment><name>Abel Turner</name><amount>2000000</amount></payment></payments>";
//!
//! let mut reader = XmlReader::new();
//! reader
//!     .open(&config, &Formatters::standard(), vec![InputSource::from(xml)])
//!     .unwrap();
//!
//! let mut record = RecordBuffer::new();
//! assert!(reader.read_next_record(&mut record).unwrap());
//! assert_eq!(record.get("beneficiary"), Some("Abel Turner"));
//! assert_eq!(record.get("amount"), Some("20000.00"));
//! assert!(!reader.read_next_record(&mut record).unwrap());
//! reader.close();
//! ```

/// Name of the read configuration parameter holding the batch tag name.
pub const BATCH_TAG_NAME_PARAM: &str = "batchTagName";

/// Name of the read configuration parameter holding the batch item tag name.
pub const BATCH_ITEM_TAG_NAME_PARAM: &str = "batchItemTagName";

/// A module providing facilities for reading XML batch items.
pub mod xml_reader;
