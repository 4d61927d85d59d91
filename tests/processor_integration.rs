pub mod common;

use batch_file_ingest::{
    core::{
        config::ConflictPolicy,
        format::Formatters,
        persistence::{InMemoryRepository, Repository},
    },
    error::BatchError,
    processor::{
        BatchFileReadProcessor, batch_processor::BatchItemProcessor,
        item_processor::ItemBatchProcessorBuilder,
    },
};
use common::{
    ABEL_TURNER, BAMANGA_TUKUR, BIG_BIRD, ByCurrency, Payment, PaymentBatch, WILLIAM_TUTTE,
    fixed_width_payment_config, init_logger, mocks::MockPaymentRepository, payment_lines,
};
use mockall::predicate::eq;

type PaymentRepository = InMemoryRepository<Payment, String>;

fn payment_repository() -> PaymentRepository {
    InMemoryRepository::new(|payment: &Payment| payment.account_no.clone())
}

fn batch_processor() -> BatchItemProcessor<
    Payment,
    PaymentBatch,
    PaymentRepository,
    InMemoryRepository<PaymentBatch, String>,
    ByCurrency,
> {
    BatchItemProcessor::new(
        payment_repository(),
        InMemoryRepository::new(|batch: &PaymentBatch| batch.category.clone()),
        ByCurrency,
    )
}

#[test]
fn single_category_aggregates_counts_and_totals() -> anyhow::Result<()> {
    init_logger();
    let processor = batch_processor();

    let result = processor.process(
        &fixed_width_payment_config(true, ConflictPolicy::Skip),
        &Formatters::new(),
        vec![payment_lines(&[ABEL_TURNER, BAMANGA_TUKUR])],
    )?;

    assert_eq!(result.len(), 1);
    let batch = &result["NGN"];
    assert_eq!(batch.category, "NGN");
    assert_eq!(batch.item_count, 2);
    assert_eq!(batch.total_amount, 72000.0);

    let stored = processor.batches().records();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].1.item_count, 2);
    assert!(stored[0].1.finalized);

    let items = processor.items().records();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].1.beneficiary, "Abel Turner");
    assert_eq!(items[1].1.beneficiary, "Bamanga Tukur");
    assert!(items.iter().all(|(_, item)| item.batch_id == Some(stored[0].0)));
    Ok(())
}

#[test]
fn two_categories_are_aggregated_separately() -> anyhow::Result<()> {
    let processor = batch_processor();

    let result = processor.process(
        &fixed_width_payment_config(true, ConflictPolicy::Skip),
        &Formatters::new(),
        vec![payment_lines(&[ABEL_TURNER, BIG_BIRD, BAMANGA_TUKUR])],
    )?;

    assert_eq!(result.len(), 2);
    assert_eq!(result["NGN"].item_count, 2);
    assert_eq!(result["NGN"].total_amount, 72000.0);
    assert_eq!(result["USD"].item_count, 1);
    assert_eq!(result["USD"].total_amount, 400.0);

    let usd_batch_id = processor
        .batches()
        .find_by_unique_constraint(&result["USD"])?
        .map(|(id, _)| id);
    let usd_items: Vec<Payment> = processor
        .items()
        .records()
        .into_iter()
        .map(|(_, item)| item)
        .filter(|item| item.batch_id == usd_batch_id)
        .collect();
    assert_eq!(usd_items.len(), 1);
    assert_eq!(usd_items[0].beneficiary, "Big Bird");
    Ok(())
}

#[test]
fn skip_policy_returns_created_ids_only() -> anyhow::Result<()> {
    let processor = ItemBatchProcessorBuilder::new()
        .repository(payment_repository())
        .build()?;

    let ids = processor.process(
        &fixed_width_payment_config(true, ConflictPolicy::Skip),
        &Formatters::new(),
        vec![payment_lines(&[ABEL_TURNER, BAMANGA_TUKUR, WILLIAM_TUTTE])],
    )?;

    assert_eq!(ids, vec![1, 2]);
    let second = processor.repository().get(2).unwrap();
    assert_eq!(second.beneficiary, "Bamanga Tukur");
    assert_eq!(second.currency, "NGN");
    Ok(())
}

#[test]
fn update_policy_overwrites_existing_record() -> anyhow::Result<()> {
    let processor = ItemBatchProcessorBuilder::new()
        .repository(payment_repository())
        .build()?;

    let ids = processor.process(
        &fixed_width_payment_config(true, ConflictPolicy::Update),
        &Formatters::new(),
        vec![payment_lines(&[ABEL_TURNER, BAMANGA_TUKUR, WILLIAM_TUTTE])],
    )?;

    assert_eq!(ids, vec![1, 2]);
    assert_eq!(processor.repository().len(), 2);
    let second = processor.repository().get(2).unwrap();
    assert_eq!(second.beneficiary, "William Thomas Tutte");
    assert_eq!(second.currency, "GBP");
    assert_eq!(second.amount, 40000.0);
    Ok(())
}

fn abel_turner() -> Payment {
    Payment {
        batch_id: None,
        account_no: "0123456789".to_string(),
        beneficiary: "Abel Turner".to_string(),
        currency: "NGN".to_string(),
        amount: 20000.0,
    }
}

#[test]
fn fail_policy_rolls_back_and_never_commits() {
    let mut repository = MockPaymentRepository::new();
    let mut lookups = 0;

    repository.expect_begin().times(1).returning(|| Ok(()));
    repository
        .expect_find_by_unique_constraint()
        .times(2)
        .returning(move |_| {
            lookups += 1;
            if lookups == 1 {
                Ok(None)
            } else {
                Ok(Some((1, abel_turner())))
            }
        });
    repository
        .expect_create()
        .with(eq(abel_turner()))
        .times(1)
        .returning(|_| Ok(1));
    repository.expect_rollback().times(1).returning(|| Ok(()));
    repository.expect_commit().never();
    repository.expect_update().never();

    let processor = ItemBatchProcessorBuilder::new()
        .repository(repository)
        .build()
        .unwrap();

    let result = processor.process(
        &fixed_width_payment_config(true, ConflictPolicy::Fail),
        &Formatters::new(),
        vec![payment_lines(&[ABEL_TURNER, ABEL_TURNER])],
    );

    match result {
        Err(BatchError::DuplicateRecord { existing, incoming }) => {
            assert!(existing.contains("Abel Turner"));
            assert!(incoming.contains("0123456789"));
        }
        other => panic!("Expected a duplicate record error, got {:?}", other),
    }
}

#[test]
fn persistence_errors_abort_the_run() {
    let mut repository = MockPaymentRepository::new();
    repository.expect_begin().returning(|| Ok(()));
    repository
        .expect_find_by_unique_constraint()
        .returning(|_| Ok(None));
    repository
        .expect_create()
        .returning(|_| Err(BatchError::Persistence("disk full".to_string())));
    repository.expect_rollback().times(1).returning(|| Ok(()));
    repository.expect_commit().never();

    let processor = ItemBatchProcessorBuilder::new()
        .repository(repository)
        .build()
        .unwrap();

    let result = processor.process(
        &fixed_width_payment_config(true, ConflictPolicy::Skip),
        &Formatters::new(),
        vec![payment_lines(&[ABEL_TURNER])],
    );

    assert!(matches!(result, Err(BatchError::Persistence(_))));
}
