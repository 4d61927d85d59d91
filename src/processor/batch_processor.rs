use std::{collections::HashMap, fmt, marker::PhantomData};

use log::{debug, error, info};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    core::{
        config::BatchReadConfig, format::Formatters, persistence::Repository, source::InputSource,
    },
    error::BatchError,
    processor::{BatchFileReadProcessor, read_records},
};

/// Caller-supplied rules grouping items of type `I` into aggregates of type
/// `B` identified by `K`.
///
/// # Examples
///
/// ```
/// use batch_file_ingest::processor::batch_processor::BatchItemAggregator;
///
/// struct Payment { currency: String, amount: f64, batch_id: Option<u64> }
/// struct PaymentBatch { currency: String, item_count: u32, total_amount: f64 }
///
/// struct ByCurrency;
///
/// impl BatchItemAggregator<Payment, PaymentBatch, u64> for ByCurrency {
///     fn category(&self, item: &Payment) -> String {
///         item.currency.clone()
///     }
///
///     fn new_batch(&self, category: &str, item: &Payment) -> PaymentBatch {
///         PaymentBatch { currency: category.to_string(), item_count: 1, total_amount: item.amount }
///     }
///
///     fn add_item(&self, batch: &mut PaymentBatch, item: &Payment) {
///         batch.item_count += 1;
///         batch.total_amount += item.amount;
///     }
///
///     fn attach(&self, item: &mut Payment, batch_id: &u64) {
///         item.batch_id = Some(*batch_id);
///     }
/// }
/// ```
pub trait BatchItemAggregator<I, B, K> {
    /// Category of `item`; items of one category share an aggregate.
    fn category(&self, item: &I) -> String;

    /// Builds the aggregate of a category from its first item, counting it.
    fn new_batch(&self, category: &str, item: &I) -> B;

    /// Counts a further item of the aggregate's category.
    fn add_item(&self, batch: &mut B, item: &I);

    /// Links `item` to its persisted aggregate.
    fn attach(&self, item: &mut I, batch_id: &K);

    /// Last touch on each aggregate once the input is exhausted.
    fn finalize(&self, _batch: &mut B) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Groups the items of a batch file into per-category aggregates.
///
/// The first item of a category creates its aggregate, persisted right away so
/// that items can reference it; later items of the category update the
/// aggregate's running figures. Every item is persisted linked to its
/// aggregate. Once the input is exhausted each aggregate is finalized and
/// updated, and [`process`](BatchFileReadProcessor::process) returns the
/// aggregates keyed by category.
pub struct BatchItemProcessor<I, B, RI, RB, A> {
    items: RI,
    batches: RB,
    aggregator: A,
    _marker: PhantomData<(I, B)>,
}

impl<I, B, RI, RB, A> BatchItemProcessor<I, B, RI, RB, A>
where
    I: DeserializeOwned,
    RI: Repository<I>,
    RB: Repository<B>,
    A: BatchItemAggregator<I, B, RB::Id>,
{
    pub fn new(items: RI, batches: RB, aggregator: A) -> Self {
        Self {
            items,
            batches,
            aggregator,
            _marker: PhantomData,
        }
    }

    pub fn items(&self) -> &RI {
        &self.items
    }

    pub fn batches(&self) -> &RB {
        &self.batches
    }

    fn ingest(
        &self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
    ) -> Result<HashMap<String, B>, BatchError> {
        let mut aggregates: HashMap<String, (RB::Id, B)> = HashMap::new();

        let read_count = read_records(config, formatters, sources, |mut item: I| {
            let category = self.aggregator.category(&item);

            let batch_id = match aggregates.get_mut(&category) {
                Some((batch_id, batch)) => {
                    self.aggregator.add_item(batch, &item);
                    batch_id.clone()
                }
                None => {
                    let batch = self.aggregator.new_batch(&category, &item);
                    let batch_id = self.batches.create(&batch)?;
                    debug!("Created batch {:?} for category {}", batch_id, category);
                    aggregates.insert(category, (batch_id.clone(), batch));
                    batch_id
                }
            };

            self.aggregator.attach(&mut item, &batch_id);
            self.items.create(&item)?;
            Ok(())
        })?;

        let mut result = HashMap::with_capacity(aggregates.len());
        for (category, (batch_id, mut batch)) in aggregates {
            self.aggregator.finalize(&mut batch)?;
            self.batches.update(&batch_id, &batch)?;
            result.insert(category, batch);
        }

        info!(
            "{} items read into {} categories",
            read_count,
            result.len()
        );
        Ok(result)
    }

    fn rollback(&self, run_id: &Uuid) {
        if let Err(e) = self.items.rollback() {
            error!("Rollback of items in run {} failed: {}", run_id, e);
        }
        if let Err(e) = self.batches.rollback() {
            error!("Rollback of batches in run {} failed: {}", run_id, e);
        }
    }
}

impl<I, B, RI, RB, A> BatchFileReadProcessor for BatchItemProcessor<I, B, RI, RB, A>
where
    I: DeserializeOwned,
    B: fmt::Debug,
    RI: Repository<I>,
    RB: Repository<B>,
    A: BatchItemAggregator<I, B, RB::Id>,
{
    type Output = HashMap<String, B>;

    fn process(
        &self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
    ) -> Result<Self::Output, BatchError> {
        let run_id = Uuid::new_v4();
        info!(
            "Batch item run {} started, reader {}",
            run_id,
            config.reader_id()
        );

        self.batches.begin()?;
        if let Err(e) = self.items.begin() {
            self.rollback(&run_id);
            return Err(e);
        }

        let result = self
            .ingest(config, formatters, sources)
            .and_then(|aggregates| {
                self.batches.commit()?;
                self.items.commit()?;
                Ok(aggregates)
            });

        match result {
            Ok(aggregates) => {
                for (category, batch) in &aggregates {
                    info!("Run {} category {}: {:?}", run_id, category, batch);
                }
                Ok(aggregates)
            }
            Err(e) => {
                self.rollback(&run_id);
                error!("Batch item run {} failed: {}", run_id, e);
                Err(e)
            }
        }
    }
}
