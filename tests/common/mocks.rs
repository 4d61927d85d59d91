//! Mock version of a payment repository;
use batch_file_ingest::{core::persistence::Repository, error::BatchError};
use mockall::mock;

use super::Payment;

mock! {
    pub PaymentRepository {}
    impl Repository<Payment> for PaymentRepository {
        type Id = u64;
        fn begin(&self) -> Result<(), BatchError>;
        fn commit(&self) -> Result<(), BatchError>;
        fn rollback(&self) -> Result<(), BatchError>;
        fn find_by_unique_constraint(&self, record: &Payment) -> Result<Option<(u64, Payment)>, BatchError>;
        fn create(&self, record: &Payment) -> Result<u64, BatchError>;
        fn update(&self, id: &u64, record: &Payment) -> Result<(), BatchError>;
    }
}
