/// 在庫操作のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// 貸出可能な冊数が0
    NoAvailableCopies,
    /// 全冊が棚にある（返却上限ポリシー時のみ）
    NoOutstandingLoans,
}

/// 書籍のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookValidationError {
    /// タイトルが空
    EmptyTitle,
    /// 所蔵冊数が負
    NegativeTotalCopies(i32),
    /// 貸出中の冊数を下回る所蔵冊数への変更
    TotalBelowLentCopies { lent: i32, requested: i32 },
}

impl std::fmt::Display for BookValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookValidationError::EmptyTitle => write!(f, "title must not be empty"),
            BookValidationError::NegativeTotalCopies(n) => {
                write!(f, "total_copies must not be negative (got {})", n)
            }
            BookValidationError::TotalBelowLentCopies { lent, requested } => write!(
                f,
                "total_copies {} is below the {} copies currently lent",
                requested, lent
            ),
        }
    }
}

/// カテゴリのバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryValidationError {
    /// 名前が空
    EmptyName,
}

impl std::fmt::Display for CategoryValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryValidationError::EmptyName => write!(f, "name must not be empty"),
        }
    }
}

/// 一覧クエリのバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValidationError {
    /// ページ番号は1始まりで、offset が i64 に収まる範囲
    PageOutOfRange(i64),
    /// ページサイズは1以上
    PageSizeOutOfRange(i64),
    /// 出版年の範囲が逆転している
    InvertedYearRange { from: i32, to: i32 },
    /// 不明なソートキー
    UnknownSortField(String),
}

impl std::fmt::Display for QueryValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryValidationError::PageOutOfRange(p) => write!(f, "page is out of range (got {})", p),
            QueryValidationError::PageSizeOutOfRange(s) => {
                write!(f, "page_size must be >= 1 (got {})", s)
            }
            QueryValidationError::InvertedYearRange { from, to } => {
                write!(f, "year_from {} is after year_to {}", from, to)
            }
            QueryValidationError::UnknownSortField(s) => write!(f, "unknown sort field: {}", s),
        }
    }
}
