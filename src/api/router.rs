use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::category_handlers::{
    self, CategoryAppState, associations_of, bulk_associate, items_tagged_by, list_categories,
    reconcile,
};
use super::handlers::{
    AppState, borrow_book, create_book, delete_book, get_book, history, list_books,
    recommendations, return_book, update_book,
};
use super::middleware::{ServerKey, log_requests, require_bearer_token, require_server_key};

/// 書籍サービスのルーター
///
/// インターセプタの順序（外側から）：
/// 1. TraceLayer
/// 2. リクエストのログ
/// 3. Bearerトークンの検証（/health は対象外）
///
/// - POST   /books
/// - GET    /books
/// - GET    /books/:id
/// - PUT    /books/:id
/// - DELETE /books/:id
/// - POST   /books/:id/borrow
/// - POST   /books/:id/return
/// - GET    /books/:id/recommendations
/// - GET    /books/:id/history
pub fn create_book_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/books", post(create_book).get(list_books))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/books/:id/borrow", post(borrow_book))
        .route("/books/:id/return", post(return_book))
        .route("/books/:id/recommendations", get(recommendations))
        .route("/books/:id/history", get(history))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer_token,
        ))
        // Health check endpoint
        .route("/health", get(health_check))
        .layer(middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// カテゴリサービスのルーター
///
/// インターセプタの順序（外側から）：
/// 1. TraceLayer
/// 2. リクエストのログ
/// 3. サーバーキーの確認（/health は対象外）
///
/// - POST   /categories
/// - GET    /categories
/// - GET    /categories/:id
/// - PUT    /categories/:id
/// - DELETE /categories/:id
/// - POST   /items/:item_type/:item_id/categories
/// - PUT    /items/:item_type/:item_id/categories
/// - GET    /items/:item_type/:item_id/categories
/// - POST   /items/:item_type/lookup
pub fn create_category_router(state: Arc<CategoryAppState>, server_key: ServerKey) -> Router {
    Router::new()
        .route(
            "/categories",
            post(category_handlers::create_category).get(list_categories),
        )
        .route(
            "/categories/:id",
            get(category_handlers::get_category)
                .put(category_handlers::update_category)
                .delete(category_handlers::delete_category),
        )
        .route(
            "/items/:item_type/:item_id/categories",
            post(bulk_associate).put(reconcile).get(associations_of),
        )
        .route("/items/:item_type/lookup", post(items_tagged_by))
        .route_layer(middleware::from_fn_with_state(server_key, require_server_key))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
