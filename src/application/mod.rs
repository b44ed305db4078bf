pub mod book;
pub mod category;
