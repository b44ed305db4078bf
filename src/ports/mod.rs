pub mod author_service;
pub mod category_service;
pub mod category_store;
pub mod inventory_store;
pub mod lending_ledger;
pub mod token_verifier;

pub use author_service::{Author, AuthorService};
pub use category_service::CategoryService;
pub use category_store::{CategoryAssociationStore, CategoryPage, CategoryStore};
pub use inventory_store::{
    BookPage, CopyUpdate, InventoryStore, InventoryTransaction, StoreError,
};
pub use lending_ledger::LendingLedger;
pub use token_verifier::{TokenVerification, TokenVerifier};
