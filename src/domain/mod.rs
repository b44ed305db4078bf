pub mod book;
pub mod category;
pub mod commands;
pub mod errors;
pub mod lending;
pub mod query;
pub mod recommendation;
pub mod value_objects;

pub use book::{Availability, Book, BookDetails};
pub use category::{Category, CategoryAssociation, Reconciliation};
pub use errors::*;
pub use lending::*;
pub use value_objects::*;
