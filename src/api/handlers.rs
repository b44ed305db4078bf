use crate::application::book::{
    ServiceDependencies, borrow_book as execute_borrow_book, create_book as execute_create_book,
    delete_book as execute_delete_book, get_book as execute_get_book, get_recommendations,
    lending_history, list_books as execute_list_books, return_book as execute_return_book,
    update_book as execute_update_book,
};
use crate::domain::{
    BookId, TransactionId, UserId,
    commands::{BorrowBook, DeleteBook, ReturnBook},
    query::MAX_PAGE_SIZE,
};
use crate::ports::TokenVerifier;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    middleware::AuthenticatedUser,
    types::{
        BookListResponse, BookRequest, BookResponse, BorrowBookRequest, BorrowBookResponse,
        LendingEventResponse, LendingHistoryResponse, ListBooksQuery, RecommendationResponse,
        RecommendationsQuery, RecommendationsResponse, ReturnBookRequest, SuccessResponse,
    },
};

/// おすすめの既定件数
const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
    pub token_verifier: Arc<dyn TokenVerifier>,
}

// ============================================================================
// Book handlers
// ============================================================================

/// POST /books - 書籍を登録
///
/// カテゴリの一括付与が失敗した場合、書籍は登録されない。
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let view = execute_create_book(&state.service_deps, req.to_create_command()).await?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(view))))
}

/// GET /books/:id - 書籍を取得
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let view = execute_get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(BookResponse::from(view)))
}

/// PUT /books/:id - 書籍を更新
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<BookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let view = execute_update_book(&state.service_deps, req.to_update_command(book_id)).await?;
    Ok(Json(BookResponse::from(view)))
}

/// DELETE /books/:id - 書籍を削除
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let cmd = DeleteBook {
        book_id: BookId::from_uuid(book_id),
    };
    execute_delete_book(&state.service_deps, cmd).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /books - 書籍を検索
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<BookListResponse>, ApiError> {
    let page = execute_list_books(&state.service_deps, query.into()).await?;
    Ok(Json(BookListResponse::from(page)))
}

/// POST /books/:id/borrow - 1冊貸し出す
///
/// 在庫切れの場合は412を返す。user_idの指定がなければ認証済みユーザーが借りる。
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(book_id): Path<Uuid>,
    body: Option<Json<BorrowBookRequest>>,
) -> Result<Json<BorrowBookResponse>, ApiError> {
    let user_id = body
        .and_then(|Json(req)| req.user_id)
        .map(UserId::from_uuid)
        .unwrap_or(user.0);

    let cmd = BorrowBook {
        book_id: BookId::from_uuid(book_id),
        user_id,
    };
    let transaction_id = execute_borrow_book(&state.service_deps, cmd).await?;

    Ok(Json(BorrowBookResponse {
        success: true,
        transaction_id: transaction_id.value(),
    }))
}

/// POST /books/:id/return - 1冊返却する
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<ReturnBookRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let cmd = ReturnBook {
        book_id: BookId::from_uuid(book_id),
        user_id: req.user_id.map(UserId::from_uuid).unwrap_or(user.0),
        transaction_id: TransactionId::from_uuid(req.transaction_id),
    };
    execute_return_book(&state.service_deps, cmd).await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /books/:id/recommendations - おすすめを取得
pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECOMMENDATION_LIMIT)
        .min(MAX_PAGE_SIZE as usize);

    let ranked = get_recommendations(&state.service_deps, BookId::from_uuid(book_id), limit).await?;

    Ok(Json(RecommendationsResponse {
        items: ranked.into_iter().map(RecommendationResponse::from).collect(),
    }))
}

/// GET /books/:id/history - 貸出履歴を取得
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<LendingHistoryResponse>, ApiError> {
    let events = lending_history(&state.service_deps, BookId::from_uuid(book_id)).await?;

    Ok(Json(LendingHistoryResponse {
        items: events.into_iter().map(LendingEventResponse::from).collect(),
    }))
}
