use crate::domain::{BookValidationError, QueryValidationError};
use crate::ports::StoreError;
use thiserror::Error;

/// 依存サービス名（ログ用）
pub const AUTHOR_SERVICE: &str = "author-service";
pub const CATEGORY_SERVICE: &str = "category-service";

/// 書籍サービスアプリケーション層のエラー
#[derive(Debug, Error)]
pub enum BookApplicationError {
    /// 書籍が存在しない
    #[error("Book not found")]
    BookNotFound,

    /// 貸出可能な冊数が0
    #[error("No available copies")]
    NoAvailableCopies,

    /// 全冊が棚にあり返却を受け付けられない
    #[error("No outstanding loans for this book")]
    NoOutstandingLoans,

    /// 書籍の入力が不正
    #[error("Invalid book: {0}")]
    InvalidBook(BookValidationError),

    /// 一覧クエリが不正
    #[error("Invalid query: {0}")]
    InvalidQuery(QueryValidationError),

    /// アトミックスコープ外での更新（組み立てミス）
    #[error("Transaction required")]
    TransactionRequired,

    /// 著者サービス・カテゴリサービスの呼び出し失敗
    #[error("Remote dependency failure: {dependency}")]
    RemoteDependencyFailure {
        dependency: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// ローカルストアの障害
    #[error("Storage failure")]
    StorageFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BookApplicationError {
    /// `map_err`用：依存サービス名を付けてRemoteDependencyFailureに変換する
    pub fn remote(
        dependency: &'static str,
    ) -> impl FnOnce(Box<dyn std::error::Error + Send + Sync>) -> Self {
        move |source| BookApplicationError::RemoteDependencyFailure { dependency, source }
    }
}

impl From<StoreError> for BookApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TransactionRequired => BookApplicationError::TransactionRequired,
            StoreError::Storage(source) => BookApplicationError::StorageFailure(source),
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, BookApplicationError>;
