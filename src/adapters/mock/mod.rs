pub mod author_service;
pub mod category_service;
pub mod token_verifier;

pub use author_service::AuthorService;
pub use category_service::{CategoryService, WriteFailure};
pub use token_verifier::TokenVerifier;
