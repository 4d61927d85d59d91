#![allow(dead_code)]

use std::{fs, path::PathBuf};

use batch_file_ingest::{
    core::{
        config::{BatchReadConfig, BatchReadConfigBuilder, ConflictPolicy},
        field::{FieldConfig, PadDirection},
        source::InputSource,
    },
    error::BatchError,
    processor::batch_processor::BatchItemAggregator,
};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

pub mod mocks;

pub const ABEL_TURNER: &str = "0123456789Abel Turner         NGN0000000020000";
pub const BAMANGA_TUKUR: &str = "6758495839Bamanga Tukur       NGN0000000052000";
pub const WILLIAM_TUTTE: &str = "6758495839William Thomas TutteGBP0000000040000";
pub const BIG_BIRD: &str = "2300000001Big Bird            USD0000000000400";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub batch_id: Option<u64>,
    pub account_no: String,
    pub beneficiary: String,
    pub currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentBatch {
    pub category: String,
    pub item_count: u32,
    pub total_amount: f64,
    pub finalized: bool,
}

/// Groups payments by currency.
pub struct ByCurrency;

impl BatchItemAggregator<Payment, PaymentBatch, u64> for ByCurrency {
    fn category(&self, item: &Payment) -> String {
        item.currency.clone()
    }

    fn new_batch(&self, category: &str, item: &Payment) -> PaymentBatch {
        PaymentBatch {
            category: category.to_string(),
            item_count: 1,
            total_amount: item.amount,
            finalized: false,
        }
    }

    fn add_item(&self, batch: &mut PaymentBatch, item: &Payment) {
        batch.item_count += 1;
        batch.total_amount += item.amount;
    }

    fn attach(&self, item: &mut Payment, batch_id: &u64) {
        item.batch_id = Some(*batch_id);
    }

    fn finalize(&self, batch: &mut PaymentBatch) -> Result<(), BatchError> {
        batch.finalized = true;
        Ok(())
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fixed-width payment layout: account number (10), beneficiary (20),
/// currency (3), amount (13).
pub fn fixed_width_payment_config(trim: bool, on_conflict: ConflictPolicy) -> BatchReadConfig {
    BatchReadConfigBuilder::new()
        .reader("fixedlength-batchfilereader")
        .on_conflict(on_conflict)
        .add_simple_field("accountNo", 10, trim)
        .add_simple_field("beneficiary", 20, trim)
        .add_simple_field("currency", 3, trim)
        .add_field_config(FieldConfig::new("amount", 13).with_pad(PadDirection::Left, '0'))
        .build()
        .unwrap()
}

pub fn payment_lines(lines: &[&str]) -> InputSource {
    InputSource::lines(lines)
}

/// Writes `content` to a randomly named file of `dir`.
pub fn write_temp_file(dir: &TempDir, extension: &str, content: &str) -> PathBuf {
    let name = format!(
        "{}.{}",
        Alphanumeric.sample_string(&mut rand::rng(), 8),
        extension
    );
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}
