use crate::domain::{CategoryValidationError, QueryValidationError};
use crate::ports::StoreError;
use thiserror::Error;

/// カテゴリサービスアプリケーション層のエラー
#[derive(Debug, Error)]
pub enum CategoryApplicationError {
    /// カテゴリが存在しない
    #[error("Category not found")]
    CategoryNotFound,

    /// カテゴリの入力が不正
    #[error("Invalid category: {0}")]
    InvalidCategory(CategoryValidationError),

    /// ページ指定が不正
    #[error("Invalid query: {0}")]
    InvalidQuery(QueryValidationError),

    /// アトミックスコープ外での更新（組み立てミス）
    #[error("Transaction required")]
    TransactionRequired,

    /// ストアの障害
    #[error("Storage failure")]
    StorageFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<StoreError> for CategoryApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TransactionRequired => CategoryApplicationError::TransactionRequired,
            StoreError::Storage(source) => CategoryApplicationError::StorageFailure(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, CategoryApplicationError>;
