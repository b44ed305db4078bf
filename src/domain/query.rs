use super::{AuthorId, QueryValidationError};

/// ページサイズの既定値
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// ページサイズの上限
pub const MAX_PAGE_SIZE: i64 = 100;

/// 書籍一覧のフィルタ
///
/// 各条件は独立して省略可能で、指定された条件はANDで結合される。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// タイトルの部分一致（大文字小文字を区別しない）
    pub title: Option<String>,
    /// 著者名から解決した著者ID群（Noneなら著者で絞り込まない）
    pub author_ids: Option<Vec<AuthorId>>,
    /// ISBNの部分一致
    pub isbn: Option<String>,
    /// 出版年の下限（含む）
    pub year_from: Option<i32>,
    /// 出版年の上限（含む）
    pub year_to: Option<i32>,
    /// 出版社の部分一致
    pub publisher: Option<String>,
    /// 貸出可能な書籍のみ
    pub available_only: bool,
}

/// ソートキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Title,
    /// 著者IDの順（著者名は別サービスにあるため）
    Author,
    PublicationYear,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::PublicationYear => "publication_year",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = QueryValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" | "created" => Ok(SortField::CreatedAt),
            "title" => Ok(SortField::Title),
            "author" => Ok(SortField::Author),
            "publication_year" | "year" => Ok(SortField::PublicationYear),
            other => Err(QueryValidationError::UnknownSortField(other.to_string())),
        }
    }
}

/// ソート順
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// ページ指定（1始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: i64,
    size: i64,
}

impl Page {
    /// ページ番号とサイズを検証して作成する
    ///
    /// サイズは上限（100）で切り詰める。
    pub fn new(number: Option<i64>, size: Option<i64>) -> Result<Self, QueryValidationError> {
        let number = number.unwrap_or(1);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);

        if number < 1 {
            return Err(QueryValidationError::PageOutOfRange(number));
        }
        if size < 1 {
            return Err(QueryValidationError::PageSizeOutOfRange(size));
        }
        let size = size.min(MAX_PAGE_SIZE);

        // offset が i64 に収まらないページは扱えない
        if (number - 1).checked_mul(size).is_none() {
            return Err(QueryValidationError::PageOutOfRange(number));
        }

        Ok(Self { number, size })
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    /// offset = (page - 1) * page_size
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// 書籍一覧クエリ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookListQuery {
    pub filter: BookFilter,
    pub sort_by: SortField,
    pub direction: SortDirection,
    pub page: Page,
}

impl BookListQuery {
    pub fn validate(&self) -> Result<(), QueryValidationError> {
        if let (Some(from), Some(to)) = (self.filter.year_from, self.filter.year_to) {
            if from > to {
                return Err(QueryValidationError::InvertedYearRange { from, to });
            }
        }
        Ok(())
    }
}
