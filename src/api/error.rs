use crate::application::book::BookApplicationError;
use crate::application::category::CategoryApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Book(BookApplicationError),
    Category(CategoryApplicationError),
    /// 認証の失敗（トークンなし・無効・サーバーキー不一致）
    Unauthorized(&'static str),
    /// パスやクエリの形式が不正
    BadRequest(String),
    /// 認証サービスの呼び出し失敗
    AuthServiceFailure(Box<dyn std::error::Error + Send + Sync>),
}

impl From<BookApplicationError> for ApiError {
    fn from(err: BookApplicationError) -> Self {
        ApiError::Book(err)
    }
}

impl From<CategoryApplicationError> for ApiError {
    fn from(err: CategoryApplicationError) -> Self {
        ApiError::Category(err)
    }
}

type Mapped = (StatusCode, &'static str, String);

fn internal() -> Mapped {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "Internal server error".to_string(),
    )
}

fn map_book_error(err: BookApplicationError) -> Mapped {
    match err {
        // 404 Not Found
        BookApplicationError::BookNotFound => (
            StatusCode::NOT_FOUND,
            "BOOK_NOT_FOUND",
            "Book not found".to_string(),
        ),

        // 412 Precondition Failed - 在庫の前提条件違反
        BookApplicationError::NoAvailableCopies => (
            StatusCode::PRECONDITION_FAILED,
            "NO_AVAILABLE_COPIES",
            "No available copies".to_string(),
        ),
        BookApplicationError::NoOutstandingLoans => (
            StatusCode::PRECONDITION_FAILED,
            "NO_OUTSTANDING_LOANS",
            "All copies of this book are already on the shelf".to_string(),
        ),

        // 422 / 400 - 入力不正
        BookApplicationError::InvalidBook(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_BOOK",
            e.to_string(),
        ),
        BookApplicationError::InvalidQuery(e) => {
            (StatusCode::BAD_REQUEST, "INVALID_QUERY", e.to_string())
        }

        // 500 Internal Server Error
        // ストレージ障害とリモート障害はログでのみ区別し、クライアントには同じ応答を返す
        BookApplicationError::TransactionRequired => {
            tracing::error!("Mutation attempted outside a transaction");
            internal()
        }
        BookApplicationError::RemoteDependencyFailure { dependency, source } => {
            tracing::error!(dependency, error = %source, "Remote dependency failure");
            internal()
        }
        BookApplicationError::StorageFailure(source) => {
            tracing::error!(error = %source, "Storage failure");
            internal()
        }
    }
}

fn map_category_error(err: CategoryApplicationError) -> Mapped {
    match err {
        CategoryApplicationError::CategoryNotFound => (
            StatusCode::NOT_FOUND,
            "CATEGORY_NOT_FOUND",
            "Category not found".to_string(),
        ),
        CategoryApplicationError::InvalidCategory(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_CATEGORY",
            e.to_string(),
        ),
        CategoryApplicationError::InvalidQuery(e) => {
            (StatusCode::BAD_REQUEST, "INVALID_QUERY", e.to_string())
        }
        CategoryApplicationError::TransactionRequired => {
            tracing::error!("Mutation attempted outside a transaction");
            internal()
        }
        CategoryApplicationError::StorageFailure(source) => {
            tracing::error!(error = %source, "Storage failure");
            internal()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Book(err) => map_book_error(err),
            ApiError::Category(err) => map_category_error(err),
            ApiError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", reason.to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            ApiError::AuthServiceFailure(source) => {
                tracing::error!(error = %source, "Token verification failed");
                internal()
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
