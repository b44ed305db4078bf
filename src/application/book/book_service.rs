use crate::domain::{
    self, BookId, ItemId, ItemType, LendingEvent, ReturnPolicy,
    commands::{AssociateItem, CreateBook, DeleteBook, UpdateBook},
    query::{BookFilter, BookListQuery, Page, SortDirection, SortField},
};
use crate::ports::*;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::aggregation::{BookView, assemble_view, assemble_views};
use super::errors::{AUTHOR_SERVICE, BookApplicationError, Result};
use super::saga::{AssociationStep, associate_then_commit, discard};

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub inventory_store: Arc<dyn InventoryStore>,
    pub lending_ledger: Arc<dyn LendingLedger>,
    pub author_service: Arc<dyn AuthorService>,
    pub category_service: Arc<dyn CategoryService>,
    pub return_policy: ReturnPolicy,
}

/// 書籍一覧の要求（受付層から渡される未検証の値）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBooks {
    pub title: Option<String>,
    /// 著者名の部分一致
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub publisher: Option<String>,
    pub available_only: bool,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// 書籍一覧の1ページ分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookViewPage {
    pub items: Vec<BookView>,
    pub total: i64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn book_associations(book_id: BookId, category_ids: BTreeSet<domain::CategoryId>) -> AssociateItem {
    AssociateItem {
        item_id: ItemId::from(book_id),
        item_type: ItemType::book(),
        category_ids,
    }
}

/// 書籍を登録する
///
/// サガの手順：
/// 1. ローカルのアトミックスコープで書籍を挿入
/// 2. カテゴリサービスへ一括付与を依頼
/// 3. ローカルcommit
///
/// 2が失敗した場合、書籍はcommitされない。
pub async fn create_book(deps: &ServiceDependencies, cmd: CreateBook) -> Result<BookView> {
    // 1. 入力の検証と書籍の生成（available_copies = total_copies）
    let book = domain::book::register_book(cmd.details, Utc::now())
        .map_err(BookApplicationError::InvalidBook)?;

    // 2. ローカル書き込み
    let mut tx = deps.inventory_store.begin().await?;
    tx.insert_book(&book).await?;

    // 3. リモート関連付け → commit
    let step = AssociationStep::Initial(book_associations(book.id, cmd.category_ids));
    associate_then_commit(deps, tx, step).await?;

    tracing::info!(book_id = %book.id.value(), title = %book.title, "Book created");

    // 4. レスポンスの組み立て
    assemble_view(deps, book).await
}

/// 書籍を取得する
pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<BookView> {
    let book = deps
        .inventory_store
        .get_book(book_id)
        .await?
        .ok_or(BookApplicationError::BookNotFound)?;

    assemble_view(deps, book).await
}

/// 書籍を更新する
///
/// 貸出中の冊数は維持する（available_copies' = total_copies' - 貸出中の冊数）。
/// カテゴリは望ましい集合への照合として依頼する。
pub async fn update_book(deps: &ServiceDependencies, cmd: UpdateBook) -> Result<BookView> {
    // 1. スコープ内で現在の書籍を読む
    let mut tx = deps.inventory_store.begin().await?;
    let Some(current) = tx.get_book(cmd.book_id).await? else {
        discard(tx).await;
        return Err(BookApplicationError::BookNotFound);
    };

    // 2. 純粋関数で更新後の状態を計算
    let book = match domain::book::revise_book(&current, cmd.details, Utc::now()) {
        Ok(book) => book,
        Err(e) => {
            discard(tx).await;
            return Err(BookApplicationError::InvalidBook(e));
        }
    };

    // 3. ローカル書き込み
    tx.update_book(&book).await?;

    // 4. リモート照合 → commit
    let step = AssociationStep::Replace(book_associations(book.id, cmd.category_ids));
    associate_then_commit(deps, tx, step).await?;

    tracing::info!(book_id = %book.id.value(), "Book updated");

    assemble_view(deps, book).await
}

/// 書籍を削除する
///
/// カテゴリは空集合への照合として依頼する。台帳は削除しない。
pub async fn delete_book(deps: &ServiceDependencies, cmd: DeleteBook) -> Result<()> {
    // 1. ローカル書き込み
    let mut tx = deps.inventory_store.begin().await?;
    if !tx.delete_book(cmd.book_id).await? {
        discard(tx).await;
        return Err(BookApplicationError::BookNotFound);
    }

    // 2. リモート照合（空集合）→ commit
    let step = AssociationStep::Replace(book_associations(cmd.book_id, BTreeSet::new()));
    associate_then_commit(deps, tx, step).await?;

    tracing::info!(book_id = %cmd.book_id.value(), "Book deleted");
    Ok(())
}

/// 書籍を検索する
///
/// 各フィルタは省略可能で、指定されたものはANDで結合される。
/// 著者名は著者サービスで著者IDに解決してから絞り込む。
/// 該当する著者がいなければストアに問い合わせずに空のページを返す。
pub async fn list_books(deps: &ServiceDependencies, request: ListBooks) -> Result<BookViewPage> {
    // 1. ページ・ソートの検証
    let page = Page::new(request.page, request.page_size).map_err(BookApplicationError::InvalidQuery)?;
    let sort_by = match non_empty(request.sort_by) {
        Some(s) => s.parse::<SortField>().map_err(BookApplicationError::InvalidQuery)?,
        None => SortField::default(),
    };
    let direction = if request.sort_desc {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    };

    // 2. 著者名 → 著者ID
    let author_ids = match non_empty(request.author) {
        Some(name) => {
            let ids = deps
                .author_service
                .find_author_ids(&name)
                .await
                .map_err(BookApplicationError::remote(AUTHOR_SERVICE))?;
            if ids.is_empty() {
                return Ok(BookViewPage {
                    items: Vec::new(),
                    total: 0,
                });
            }
            Some(ids)
        }
        None => None,
    };

    let query = BookListQuery {
        filter: BookFilter {
            title: non_empty(request.title),
            author_ids,
            isbn: non_empty(request.isbn),
            year_from: request.year_from,
            year_to: request.year_to,
            publisher: non_empty(request.publisher),
            available_only: request.available_only,
        },
        sort_by,
        direction,
        page,
    };
    query.validate().map_err(BookApplicationError::InvalidQuery)?;

    // 3. 検索
    let found = deps.inventory_store.list_books(&query).await?;

    // 4. 行ごとのファンアウト
    let items = assemble_views(deps, found.items).await?;

    Ok(BookViewPage {
        items,
        total: found.total,
    })
}

/// 書籍の貸出履歴（発生順）
pub async fn lending_history(
    deps: &ServiceDependencies,
    book_id: BookId,
) -> Result<Vec<LendingEvent>> {
    if deps.inventory_store.get_book(book_id).await?.is_none() {
        return Err(BookApplicationError::BookNotFound);
    }

    Ok(deps.lending_ledger.history(book_id).await?)
}
