use crate::domain::{Book, Category, ItemId, ItemType};
use crate::ports::Author;
use futures::future::try_join_all;

use super::ServiceDependencies;
use super::errors::{AUTHOR_SERVICE, BookApplicationError, CATEGORY_SERVICE, Result};

/// 外部に見せる書籍の表現
///
/// 在庫の書籍レコードに、著者サービスの著者とカテゴリサービスのカテゴリを合成したもの。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookView {
    pub book: Book,
    pub author: Author,
    pub categories: Vec<Category>,
}

/// 1冊分のレスポンスを組み立てる
///
/// 著者とカテゴリの2本の呼び出しを並行に発行し、両方の完了を待つ。
/// どちらかが失敗すれば全体が失敗する（部分的なレスポンスは返さない）。
pub async fn assemble_view(deps: &ServiceDependencies, book: Book) -> Result<BookView> {
    let book_id = book.id;
    let author_id = book.author_id;
    let item_id = ItemId::from(book_id);
    let item_type = ItemType::book();

    let author = async {
        deps.author_service
            .get_author(author_id)
            .await
            .map_err(BookApplicationError::remote(AUTHOR_SERVICE))
    };
    let categories = async {
        deps.category_service
            .associations_of(item_id, &item_type)
            .await
            .map_err(BookApplicationError::remote(CATEGORY_SERVICE))
    };

    let (author, categories) = futures::try_join!(author, categories).inspect_err(|e| {
        tracing::error!(book_id = %book_id.value(), error = %e, "Failed to assemble book view");
    })?;

    Ok(BookView {
        book,
        author,
        categories,
    })
}

/// 複数冊のレスポンスを組み立てる
///
/// 行ごとに著者1回・カテゴリ1回の呼び出しを行う（まとめて取得はしない）。
/// 結果の順序は入力の順序を保つ。1冊でも失敗すれば全体が失敗する。
pub async fn assemble_views(deps: &ServiceDependencies, books: Vec<Book>) -> Result<Vec<BookView>> {
    try_join_all(books.into_iter().map(|book| assemble_view(deps, book))).await
}
