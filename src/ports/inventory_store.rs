use crate::domain::{
    Book, BookId, LendingEvent, ReturnPolicy,
    query::BookListQuery,
};
use async_trait::async_trait;
use thiserror::Error;

/// ストアポートのエラー
#[derive(Debug, Error)]
pub enum StoreError {
    /// アトミックスコープの外で更新系操作が呼ばれた（呼び出し側の実装ミス）
    #[error("transaction is required")]
    TransactionRequired,

    /// ストレージ層の障害
    #[error("storage failure")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn storage(message: impl Into<String>) -> Self {
        let message: String = message.into();
        StoreError::Storage(message.into())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// 条件付き在庫更新の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyUpdate {
    /// 更新された。値は更新後のavailable_copies
    Applied(i32),
    /// 条件を満たさず更新されなかった（貸出時は在庫切れ、返却時は上限到達）
    Rejected,
    /// 書籍が存在しない
    BookMissing,
}

/// 書籍一覧の1ページ分
#[derive(Debug, Clone)]
pub struct BookPage {
    pub items: Vec<Book>,
    pub total: i64,
}

/// 在庫ストアポート
///
/// 書籍レコードと貸出可能冊数／所蔵冊数のカウンタを所有する。
/// 更新系の操作はすべて`InventoryTransaction`（アトミックスコープ）経由でのみ行う。
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// アトミックスコープを開始する
    async fn begin(&self) -> Result<Box<dyn InventoryTransaction>>;

    /// IDで書籍を取得する
    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>>;

    /// フィルタ・ソート・ページ指定で書籍を検索する
    ///
    /// totalはページングする前の該当件数。
    async fn list_books(&self, query: &BookListQuery) -> Result<BookPage>;

    /// おすすめ候補を取得する
    ///
    /// target以外で、著者が同じ書籍、またはrelatedに含まれる書籍を返す。
    /// 並び順は問わない（ランク付けはドメイン層で行う）。
    async fn find_recommendation_candidates(
        &self,
        target: &Book,
        related: &[BookId],
    ) -> Result<Vec<Book>>;
}

/// 在庫のアトミックスコープ
///
/// commitされるまで変更は他から見えない。commitもrollbackもされずに
/// 破棄された場合はrollbackと同じ扱い。
/// commit/rollback後の操作は`StoreError::TransactionRequired`になる。
#[async_trait]
pub trait InventoryTransaction: Send {
    async fn insert_book(&mut self, book: &Book) -> Result<()>;

    /// スコープ内で書籍を読む（更新前の読み取り用）
    async fn get_book(&mut self, book_id: BookId) -> Result<Option<Book>>;

    async fn update_book(&mut self, book: &Book) -> Result<()>;

    /// 削除した場合true、存在しなかった場合false
    async fn delete_book(&mut self, book_id: BookId) -> Result<bool>;

    /// available_copies > 0 を条件に1減らす
    ///
    /// 読み取りと書き込みを分けず、単一の条件付き更新として実行すること。
    /// 同じ書籍への同時貸出が過剰貸出にならないのはこの保証による。
    async fn take_copy(&mut self, book_id: BookId) -> Result<CopyUpdate>;

    /// 返却ポリシーに従って1増やす
    async fn put_back_copy(&mut self, book_id: BookId, policy: ReturnPolicy)
    -> Result<CopyUpdate>;

    /// 台帳にイベントを追記する（在庫更新と同じスコープ内）
    async fn append_lending_event(&mut self, event: &LendingEvent) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}
