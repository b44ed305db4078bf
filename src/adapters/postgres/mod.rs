pub mod category_store;
pub mod inventory_store;
pub mod lending_ledger;

use crate::ports::StoreError;

pub use category_store::CategoryStore as PostgresCategoryStore;
pub use inventory_store::InventoryStore as PostgresInventoryStore;
pub use lending_ledger::LendingLedger as PostgresLendingLedger;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Storage(Box::new(err))
    }
}
