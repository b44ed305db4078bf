pub mod category_store;
pub mod inventory_store;

pub use category_store::CategoryStore as InMemoryCategoryStore;
pub use inventory_store::InventoryStore as InMemoryInventoryStore;
