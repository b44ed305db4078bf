use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::application::book::{BookView, BookViewPage, ListBooks, RecommendedBook};
use crate::domain::{
    AuthorId, BookDetails, BookId, Category, CategoryId, LendingEvent, Reconciliation,
    commands::{CreateBook, UpdateBook},
};

// ============================================================================
// Book service
// ============================================================================

fn category_set(ids: &[Uuid]) -> BTreeSet<CategoryId> {
    ids.iter().copied().map(CategoryId::from_uuid).collect()
}

/// 書籍作成・更新リクエスト（POST /books, PUT /books/:id）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRequest {
    pub title: String,
    pub author_id: Uuid,
    pub isbn: String,
    pub publication_year: i32,
    pub publisher: String,
    #[serde(default)]
    pub description: String,
    pub total_copies: i32,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

impl BookRequest {
    fn details(&self) -> BookDetails {
        BookDetails {
            title: self.title.clone(),
            author_id: AuthorId::from_uuid(self.author_id),
            isbn: self.isbn.clone(),
            publication_year: self.publication_year,
            publisher: self.publisher.clone(),
            description: self.description.clone(),
            total_copies: self.total_copies,
        }
    }

    pub fn to_create_command(&self) -> CreateBook {
        CreateBook {
            details: self.details(),
            category_ids: category_set(&self.category_ids),
        }
    }

    pub fn to_update_command(&self, book_id: Uuid) -> UpdateBook {
        UpdateBook {
            book_id: BookId::from_uuid(book_id),
            details: self.details(),
            category_ids: category_set(&self.category_ids),
        }
    }
}

/// 著者の要約
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub name: String,
}

/// カテゴリの要約
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
}

/// 書籍レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: AuthorSummary,
    pub isbn: String,
    pub publication_year: i32,
    pub publisher: String,
    pub description: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub categories: Vec<CategorySummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookView> for BookResponse {
    fn from(view: BookView) -> Self {
        let BookView {
            book,
            author,
            categories,
        } = view;

        Self {
            id: book.id.value(),
            title: book.title,
            author: AuthorSummary {
                id: author.id.value(),
                name: author.name,
            },
            isbn: book.isbn,
            publication_year: book.publication_year,
            publisher: book.publisher,
            description: book.description,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            categories: categories
                .into_iter()
                .map(|c| CategorySummary {
                    id: c.id.value(),
                    name: c.name,
                })
                .collect(),
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// 書籍一覧のクエリパラメータ（GET /books）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBooksQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub publisher: Option<String>,
    pub available_only: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_desc: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl From<ListBooksQuery> for ListBooks {
    fn from(query: ListBooksQuery) -> Self {
        ListBooks {
            title: query.title,
            author: query.author,
            isbn: query.isbn,
            year_from: query.year_from,
            year_to: query.year_to,
            publisher: query.publisher,
            available_only: query.available_only.unwrap_or(false),
            sort_by: query.sort_by,
            sort_desc: query.sort_desc.unwrap_or(false),
            page: query.page,
            page_size: query.page_size,
        }
    }
}

/// 書籍一覧レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookListResponse {
    pub items: Vec<BookResponse>,
    pub total: i64,
}

impl From<BookViewPage> for BookListResponse {
    fn from(page: BookViewPage) -> Self {
        Self {
            items: page.items.into_iter().map(BookResponse::from).collect(),
            total: page.total,
        }
    }
}

/// 成功のみを返すレスポンス（DELETE /books/:id, POST /books/:id/return）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// 貸出リクエスト
///
/// user_idを省略した場合は認証済みユーザーとして扱う。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BorrowBookRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

/// 貸出レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowBookResponse {
    pub success: bool,
    pub transaction_id: Uuid,
}

/// 返却リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnBookRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub transaction_id: Uuid,
}

/// おすすめのクエリパラメータ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationsQuery {
    pub limit: Option<usize>,
}

/// おすすめ1件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub book: BookResponse,
    /// 1: 同じ著者, 2: カテゴリ共有, 3: 人気
    pub tier: u8,
    pub borrow_count: i64,
}

impl From<RecommendedBook> for RecommendationResponse {
    fn from(r: RecommendedBook) -> Self {
        Self {
            book: BookResponse::from(r.view),
            tier: r.tier as u8,
            borrow_count: r.borrow_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub items: Vec<RecommendationResponse>,
}

/// 貸出履歴の1件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingEventResponse {
    pub transaction_id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<LendingEvent> for LendingEventResponse {
    fn from(event: LendingEvent) -> Self {
        Self {
            transaction_id: event.transaction_id.value(),
            book_id: event.book_id.value(),
            user_id: event.user_id.value(),
            kind: event.kind.as_str().to_string(),
            occurred_at: event.occurred_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingHistoryResponse {
    pub items: Vec<LendingEventResponse>,
}

// ============================================================================
// Category service
// ============================================================================

/// カテゴリ作成・更新リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// カテゴリレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id.value(),
            name: category.name,
            description: category.description,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

impl From<CategoryResponse> for Category {
    fn from(response: CategoryResponse) -> Self {
        Self {
            id: CategoryId::from_uuid(response.id),
            name: response.name,
            description: response.description,
            created_at: response.created_at,
            updated_at: response.updated_at,
        }
    }
}

/// カテゴリ一覧のクエリパラメータ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCategoriesQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub items: Vec<CategoryResponse>,
    pub total: i64,
}

/// カテゴリID集合を運ぶリクエスト（一括付与・照合・逆引き）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryIdsRequest {
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

impl CategoryIdsRequest {
    pub fn category_set(&self) -> BTreeSet<CategoryId> {
        category_set(&self.category_ids)
    }
}

/// 照合結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResponse {
    pub added: Vec<Uuid>,
    pub removed: Vec<Uuid>,
}

impl From<Reconciliation> for ReconciliationResponse {
    fn from(diff: Reconciliation) -> Self {
        Self {
            added: diff.added.iter().map(|id| id.value()).collect(),
            removed: diff.removed.iter().map(|id| id.value()).collect(),
        }
    }
}

impl From<ReconciliationResponse> for Reconciliation {
    fn from(response: ReconciliationResponse) -> Self {
        Self {
            added: category_set(&response.added),
            removed: category_set(&response.removed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCategoriesResponse {
    pub categories: Vec<CategoryResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemIdsResponse {
    pub item_ids: Vec<Uuid>,
}

// ============================================================================
// Common
// ============================================================================

/// エラーレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
