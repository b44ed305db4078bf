pub mod category_handlers;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod types;

pub use category_handlers::CategoryAppState;
pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::{AuthenticatedUser, ServerKey};
pub use router::{create_book_router, create_category_router};
pub use types::*;
