use std::{fmt, marker::PhantomData};

use log::{debug, error, info};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    core::{
        config::{BatchReadConfig, ConflictPolicy},
        format::Formatters,
        persistence::Repository,
        source::InputSource,
    },
    error::BatchError,
    processor::{BatchFileReadProcessor, read_records},
};

/// Hooks run around the creation of each new record.
pub trait ItemCreateListener<T> {
    fn before_create(&self, _item: &mut T) -> Result<(), BatchError> {
        Ok(())
    }

    fn after_create(&self, _item: &T) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Listener doing nothing.
#[derive(Default)]
pub struct NoOpCreateListener;

impl<T> ItemCreateListener<T> for NoOpCreateListener {}

/// Returns `target` with the `fields` of `source` copied onto it.
///
/// Both records go through their serde representation, which must be a map
/// keyed by field name.
///
/// # Examples
///
/// ```
/// use batch_file_ingest::processor::item_processor::copy_fields;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Payment {
///     beneficiary: String,
///     amount: f64,
/// }
///
/// let existing = Payment { beneficiary: "Bamanga Tukur".to_string(), amount: 52000.0 };
/// let incoming = Payment { beneficiary: "William Thomas Tutte".to_string(), amount: 40000.0 };
///
/// let merged = copy_fields(&existing, &incoming, &["amount"]).unwrap();
/// assert_eq!(merged, Payment { beneficiary: "Bamanga Tukur".to_string(), amount: 40000.0 });
/// ```
pub fn copy_fields<T>(target: &T, source: &T, fields: &[&str]) -> Result<T, BatchError>
where
    T: Serialize + DeserializeOwned,
{
    let to_value = |record: &T| {
        serde_json::to_value(record)
            .map_err(|e| BatchError::Persistence(format!("Cannot copy record fields: {}", e)))
    };

    let mut merged = to_value(target)?;
    let source = to_value(source)?;

    match (merged.as_object_mut(), source.as_object()) {
        (Some(merged_fields), Some(source_fields)) => {
            for field in fields {
                if let Some(value) = source_fields.get(*field) {
                    merged_fields.insert(field.to_string(), value.clone());
                }
            }
        }
        _ => {
            return Err(BatchError::Persistence(
                "Records must serialize as maps to copy fields".to_string(),
            ));
        }
    }

    serde_json::from_value::<T>(merged)
        .map_err(|e| BatchError::Persistence(format!("Cannot rebuild updated record: {}", e)))
}

/// Counters of one item processor run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub read_count: usize,
    pub create_count: usize,
    pub update_count: usize,
    pub skip_count: usize,
}

/// Creates one record per input record.
///
/// For each record read, the repository is asked for a stored record with the
/// same unique-constraint values. Without one the record is created, between
/// the listener's hooks. Otherwise the configuration's [`ConflictPolicy`]
/// decides:
///
/// - `FAIL` aborts the run with [`BatchError::DuplicateRecord`], leaving the
///   repository as it was;
/// - `UPDATE` copies the fields marked `update_on_conflict` onto the stored
///   record and updates it;
/// - `SKIP` drops the incoming record.
///
/// [`process`](BatchFileReadProcessor::process) returns the identifiers of the
/// created records, in input order.
pub struct ItemBatchProcessor<T, R> {
    repository: R,
    listener: Box<dyn ItemCreateListener<T>>,
    _marker: PhantomData<T>,
}

impl<T, R> ItemBatchProcessor<T, R>
where
    T: Serialize + DeserializeOwned + fmt::Debug,
    R: Repository<T>,
{
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Runs one file through the conflict policy, tallying into `summary`.
    pub fn process_with_summary(
        &self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
        summary: &mut RunSummary,
    ) -> Result<Vec<R::Id>, BatchError> {
        let run_id = Uuid::new_v4();
        info!(
            "Item batch run {} started, reader {}, on conflict {:?}",
            run_id,
            config.reader_id(),
            config.on_conflict()
        );

        self.repository.begin()?;
        match self.ingest(config, formatters, sources, summary) {
            Ok(ids) => {
                self.repository.commit()?;
                info!(
                    "Item batch run {} completed: createCount = {}, updateCount = {}, skipCount = {}",
                    run_id, summary.create_count, summary.update_count, summary.skip_count
                );
                Ok(ids)
            }
            Err(e) => {
                if let Err(rollback_error) = self.repository.rollback() {
                    error!("Rollback of run {} failed: {}", run_id, rollback_error);
                }
                error!("Item batch run {} failed: {}", run_id, e);
                Err(e)
            }
        }
    }

    fn ingest(
        &self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
        summary: &mut RunSummary,
    ) -> Result<Vec<R::Id>, BatchError> {
        let policy = config.on_conflict();
        let update_fields = config.update_fields();
        let mut ids = Vec::new();

        let read_count = read_records(config, formatters, sources, |mut item: T| {
            match self.repository.find_by_unique_constraint(&item)? {
                None => {
                    self.listener.before_create(&mut item)?;
                    let id = self.repository.create(&item)?;
                    self.listener.after_create(&item)?;
                    debug!("Created record {:?}", id);
                    ids.push(id);
                    summary.create_count += 1;
                }
                Some((id, existing)) => match policy {
                    ConflictPolicy::Fail => {
                        return Err(BatchError::DuplicateRecord {
                            existing: format!("{:?}", existing),
                            incoming: format!("{:?}", item),
                        });
                    }
                    ConflictPolicy::Update => {
                        let updated = copy_fields(&existing, &item, &update_fields)?;
                        self.repository.update(&id, &updated)?;
                        debug!("Updated record {:?}", id);
                        summary.update_count += 1;
                    }
                    ConflictPolicy::Skip => {
                        debug!("Skipped record conflicting with {:?}", id);
                        summary.skip_count += 1;
                    }
                },
            }
            Ok(())
        })?;

        summary.read_count = read_count;
        Ok(ids)
    }
}

impl<T, R> BatchFileReadProcessor for ItemBatchProcessor<T, R>
where
    T: Serialize + DeserializeOwned + fmt::Debug,
    R: Repository<T>,
{
    type Output = Vec<R::Id>;

    fn process(
        &self,
        config: &BatchReadConfig,
        formatters: &Formatters,
        sources: Vec<InputSource>,
    ) -> Result<Self::Output, BatchError> {
        self.process_with_summary(config, formatters, sources, &mut RunSummary::default())
    }
}

/// Builder for [`ItemBatchProcessor`].
pub struct ItemBatchProcessorBuilder<T, R> {
    repository: Option<R>,
    listener: Option<Box<dyn ItemCreateListener<T>>>,
}

impl<T, R> Default for ItemBatchProcessorBuilder<T, R> {
    fn default() -> Self {
        Self {
            repository: None,
            listener: None,
        }
    }
}

impl<T, R> ItemBatchProcessorBuilder<T, R>
where
    T: Serialize + DeserializeOwned + fmt::Debug,
    R: Repository<T>,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(mut self, repository: R) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn listener<L: ItemCreateListener<T> + 'static>(mut self, listener: L) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn build(self) -> Result<ItemBatchProcessor<T, R>, BatchError> {
        let repository = self.repository.ok_or_else(|| {
            BatchError::Configuration("Item batch processor needs a repository".to_string())
        })?;

        Ok(ItemBatchProcessor {
            repository,
            listener: self
                .listener
                .unwrap_or_else(|| Box::new(NoOpCreateListener)),
            _marker: PhantomData,
        })
    }
}
