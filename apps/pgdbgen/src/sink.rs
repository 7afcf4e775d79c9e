use async_trait::async_trait;
use log::error;

use crate::derive::{Account, DerivedCycle, Payment, Product, PurchaseStat};
use crate::error::Result;

/// Number of writes attempted per cycle.
pub const WRITES_PER_CYCLE: u64 = 4;

/// A backing store that hands each worker its own writer.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    type Writer: RecordWriter + 'static;

    /// Open a writer with its prepared statements. Failure is fatal for the run.
    async fn open_writer(&self, worker_id: usize) -> Result<Self::Writer>;
}

/// Per-worker write operations, one per table.
///
/// Resources held by a writer are released when it is dropped.
#[async_trait]
pub trait RecordWriter: Send {
    async fn insert_payment(&mut self, payment: &Payment) -> Result<()>;
    async fn insert_purchase_stat(&mut self, purchase_stat: &PurchaseStat) -> Result<()>;
    async fn insert_product(&mut self, product: &Product) -> Result<()>;
    async fn insert_account(&mut self, account: &Account) -> Result<()>;
}

/// Outcome of the four writes of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub succeeded: u64,
    pub failed: u64,
}

impl CycleOutcome {
    fn record<T>(&mut self, table: &str, result: Result<T>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(e) => {
                error!("Error inserting {} record: {}", table, e);
                self.failed += 1;
            }
        }
    }
}

/// Applies derived cycles through one worker's writer.
///
/// The four writes are independent: a failed insert is logged and the
/// remaining ones still run. Nothing is rolled back.
pub struct InsertionSink<W: RecordWriter> {
    writer: W,
}

impl<W: RecordWriter> InsertionSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn apply(&mut self, cycle: &DerivedCycle) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();
        outcome.record("payment", self.writer.insert_payment(&cycle.payment).await);
        outcome.record(
            "buying stats",
            self.writer.insert_purchase_stat(&cycle.purchase_stat).await,
        );
        outcome.record("product", self.writer.insert_product(&cycle.product).await);
        outcome.record("account", self.writer.insert_account(&cycle.account).await);
        outcome
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory store used by the worker pool tests.

    use super::*;
    use crate::error::GeneratorError;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    pub struct Tables {
        pub payments: Vec<Payment>,
        pub purchase_stats: Vec<PurchaseStat>,
        pub products: Vec<Product>,
        pub accounts: Vec<Account>,
        pub opened_writers: usize,
        pub closed_writers: usize,
    }

    /// Store keeping rows in shared vectors; optionally fails chosen tables.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryStore {
        pub tables: Arc<Mutex<Tables>>,
        pub failing_tables: HashSet<&'static str>,
        pub fail_open: bool,
    }

    impl MemoryStore {
        pub fn failing(tables: &[&'static str]) -> Self {
            Self {
                failing_tables: tables.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    pub struct MemoryWriter {
        store: MemoryStore,
    }

    impl MemoryWriter {
        fn check(&self, table: &'static str) -> Result<()> {
            if self.store.failing_tables.contains(table) {
                Err(GeneratorError::Store(format!("{} table rejected the row", table)))
            } else {
                Ok(())
            }
        }
    }

    impl Drop for MemoryWriter {
        fn drop(&mut self) {
            self.store.tables.lock().unwrap().closed_writers += 1;
        }
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        type Writer = MemoryWriter;

        async fn open_writer(&self, worker_id: usize) -> Result<MemoryWriter> {
            if self.fail_open {
                return Err(GeneratorError::Store(format!(
                    "worker {} could not prepare statements",
                    worker_id
                )));
            }
            self.tables.lock().unwrap().opened_writers += 1;
            Ok(MemoryWriter {
                store: self.clone(),
            })
        }
    }

    #[async_trait]
    impl RecordWriter for MemoryWriter {
        async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
            self.check("payments")?;
            self.store.tables.lock().unwrap().payments.push(payment.clone());
            Ok(())
        }

        async fn insert_purchase_stat(&mut self, purchase_stat: &PurchaseStat) -> Result<()> {
            self.check("buying_stats")?;
            self.store.tables.lock().unwrap().purchase_stats.push(purchase_stat.clone());
            Ok(())
        }

        async fn insert_product(&mut self, product: &Product) -> Result<()> {
            self.check("products")?;
            self.store.tables.lock().unwrap().products.push(product.clone());
            Ok(())
        }

        async fn insert_account(&mut self, account: &Account) -> Result<()> {
            self.check("accounts")?;
            self.store.tables.lock().unwrap().accounts.push(account.clone());
            Ok(())
        }
    }
}
