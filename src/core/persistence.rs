use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
};

use log::debug;

use crate::error::BatchError;

/// Storage for the records a processor creates or updates.
///
/// A processor run is bracketed by [`Repository::begin`] and either
/// [`Repository::commit`] or [`Repository::rollback`]; the transaction hooks do
/// nothing by default.
pub trait Repository<T> {
    /// Identifier assigned to a created record.
    type Id: Clone + fmt::Debug;

    fn begin(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn commit(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), BatchError> {
        Ok(())
    }

    /// Looks up the stored record sharing `record`'s unique-constraint values.
    fn find_by_unique_constraint(&self, record: &T) -> Result<Option<(Self::Id, T)>, BatchError>;

    fn create(&self, record: &T) -> Result<Self::Id, BatchError>;

    fn update(&self, id: &Self::Id, record: &T) -> Result<(), BatchError>;
}

type KeyFn<T, K> = Box<dyn Fn(&T) -> K>;

/// A [`Repository`] kept in memory, with numeric identifiers handed out in
/// creation order and a unique constraint given by a key function.
///
/// Between `begin` and `commit`, changes are staged and invisible to
/// [`InMemoryRepository::records`]; `rollback` discards them. Outside a
/// transaction every change is applied immediately.
///
/// # Examples
///
/// ```
/// use batch_file_ingest::core::persistence::{InMemoryRepository, Repository};
///
/// let repository = InMemoryRepository::new(|name: &String| name.to_lowercase());
///
/// repository.begin().unwrap();
/// let id = repository.create(&"Abel".to_string()).unwrap();
/// assert!(repository.records().is_empty());
/// repository.commit().unwrap();
///
/// let found = repository.find_by_unique_constraint(&"ABEL".to_string()).unwrap();
/// assert_eq!(found, Some((id, "Abel".to_string())));
/// ```
pub struct InMemoryRepository<T, K> {
    key: KeyFn<T, K>,
    committed: RefCell<BTreeMap<u64, T>>,
    staged: RefCell<Option<BTreeMap<u64, T>>>,
    next_id: Cell<u64>,
}

impl<T: Clone, K: PartialEq> InMemoryRepository<T, K> {
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&T) -> K + 'static,
    {
        Self {
            key: Box::new(key),
            committed: RefCell::new(BTreeMap::new()),
            staged: RefCell::new(None),
            next_id: Cell::new(1),
        }
    }

    /// Committed records, in identifier order.
    pub fn records(&self) -> Vec<(u64, T)> {
        self.committed
            .borrow()
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    pub fn get(&self, id: u64) -> Option<T> {
        self.committed.borrow().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.committed.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.borrow().is_empty()
    }

    /// Runs `f` against the staged records when a transaction is open, the
    /// committed ones otherwise.
    fn with_records<R>(&self, f: impl FnOnce(&mut BTreeMap<u64, T>) -> R) -> R {
        let mut staged = self.staged.borrow_mut();
        match staged.as_mut() {
            Some(records) => f(records),
            None => f(&mut self.committed.borrow_mut()),
        }
    }
}

impl<T: Clone, K: PartialEq> Repository<T> for InMemoryRepository<T, K> {
    type Id = u64;

    fn begin(&self) -> Result<(), BatchError> {
        let mut staged = self.staged.borrow_mut();
        if staged.is_some() {
            return Err(BatchError::Persistence(
                "Transaction already in progress".to_string(),
            ));
        }
        *staged = Some(self.committed.borrow().clone());
        Ok(())
    }

    fn commit(&self) -> Result<(), BatchError> {
        let records = self
            .staged
            .borrow_mut()
            .take()
            .ok_or_else(|| BatchError::Persistence("No transaction to commit".to_string()))?;
        debug!("Committing {} records", records.len());
        *self.committed.borrow_mut() = records;
        Ok(())
    }

    fn rollback(&self) -> Result<(), BatchError> {
        if self.staged.borrow_mut().take().is_some() {
            debug!("Transaction rolled back");
        }
        Ok(())
    }

    fn find_by_unique_constraint(&self, record: &T) -> Result<Option<(u64, T)>, BatchError> {
        let key = (self.key)(record);
        Ok(self.with_records(|records| {
            records
                .iter()
                .find(|(_, stored)| (self.key)(stored) == key)
                .map(|(id, stored)| (*id, stored.clone()))
        }))
    }

    fn create(&self, record: &T) -> Result<u64, BatchError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.with_records(|records| records.insert(id, record.clone()));
        Ok(id)
    }

    fn update(&self, id: &u64, record: &T) -> Result<(), BatchError> {
        self.with_records(|records| match records.get_mut(id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(BatchError::Persistence(format!("No record with id {}", id))),
        })
    }
}
