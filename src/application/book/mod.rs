mod aggregation;
mod book_service;
mod errors;
mod lending_service;
mod recommendation;
mod saga;

pub use aggregation::{BookView, assemble_view, assemble_views};
pub use book_service::{
    BookViewPage, ListBooks, ServiceDependencies, create_book, delete_book, get_book,
    lending_history, list_books, update_book,
};
pub use errors::{AUTHOR_SERVICE, BookApplicationError, CATEGORY_SERVICE, Result};
pub use lending_service::{borrow_book, return_book};
pub use recommendation::{RecommendedBook, get_recommendations};
