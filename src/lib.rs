#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 # Batch file ingestion

 Reads structured flat files record by record, maps each record's fields into typed
 values and feeds them to a persistence process that either creates one record per
 input line, resolving duplicates with a conflict policy, or groups records into
 categorized aggregates.

 ## Core Concepts

- **BatchReadConfig:** Selects the reader and describes the record layout: an ordered list of
  `FieldConfig`s (width, trim, padding, formatter, update-on-conflict flag), the conflict policy
  and reader-specific named parameters. It can be built in code or loaded from JSON.
- **BatchFileReader:** Decodes one record per call into a `RecordSink`. Three readers exist:
  fixed-width, delimited (comma or tab) and XML. The XML reader parses on a worker thread.
- **RecordSink:** Receives the cleaned value of each field together with its formatter.
  `RecordBuffer` is the stock sink, able to deserialize into any serde type.
- **BatchFileReadProcessor:** Runs a whole file through a reader and a `Repository`, as one
  transaction. `ItemBatchProcessor` applies the `FAIL`/`UPDATE`/`SKIP` conflict policy,
  `BatchItemProcessor` aggregates items per category.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| xml           | Enables the XML `BatchFileReader`                             |
| full          | Enables all available features                                |

 The fixed-width and delimited readers are always available.

 ## Getting Started

```rust
# use batch_file_ingest::{
#     core::{
#         config::{BatchReadConfigBuilder, ConflictPolicy},
#         field::{FieldConfig, PadDirection},
#         format::Formatters,
#         persistence::InMemoryRepository,
#         source::InputSource,
#     },
#     error::BatchError,
#     processor::{BatchFileReadProcessor, item_processor::ItemBatchProcessorBuilder},
# };
# use serde::{Deserialize, Serialize};
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payment {
    account_no: String,
    beneficiary: String,
    currency: String,
    amount: f64,
}

fn main() -> Result<(), BatchError> {
    let config = BatchReadConfigBuilder::new()
        .reader("fixed-width")
        .on_conflict(ConflictPolicy::Skip)
        .add_simple_field("accountNo", 10, true)
        .add_simple_field("beneficiary", 20, true)
        .add_simple_field("currency", 3, false)
        .add_field_config(
            FieldConfig::new("amount", 13)
                .with_pad(PadDirection::Left, '0')
                .with_formatter("cent"),
        )
        .build()?;

    let file = InputSource::lines([
        "0123456789Abel Turner         NGN0000002000000",
        "6758495839Bamanga Tukur       NGN0000005200000",
        "6758495839Bamanga Tukur       NGN0000005200000",
    ]);

    let processor = ItemBatchProcessorBuilder::new()
        .repository(InMemoryRepository::new(|payment: &Payment| {
            payment.account_no.clone()
        }))
        .build()?;

    let ids = processor.process(&config, &Formatters::standard(), vec![file])?;

    assert_eq!(ids, vec![1, 2]);
    assert_eq!(processor.repository().get(2).unwrap().amount, 52000.0);

    Ok(())
}
```
 */

/// Core module: configuration, readers interface, sinks, formatters and persistence
pub mod core;

/// Error types for batch file ingestion
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of batch file readers (fixed-width, delimited, XML)
pub mod item;

/// Processors driving a reader into repositories
pub mod processor;
