use crate::domain::{
    self, Book, BookId, LendingEvent, LendingKind, ReturnPolicy,
    query::{BookListQuery, SortDirection, SortField},
};
use crate::ports::inventory_store::{
    BookPage, CopyUpdate, InventoryStore as InventoryStoreTrait, InventoryTransaction, Result,
    StoreError,
};
use crate::ports::lending_ledger::LendingLedger;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 書籍と台帳の確定済み状態
#[derive(Debug, Default)]
struct Shelf {
    books: HashMap<BookId, Book>,
    ledger: Vec<LendingEvent>,
}

type BookLocks = Arc<Mutex<HashMap<BookId, Arc<Mutex<()>>>>>;

/// InventoryStoreのインメモリ実装（テスト用）
///
/// トランザクションは触れた書籍ごとのロックをcommit/rollbackまで保持し、
/// 変更と台帳への追記は手元に溜めてcommit時にまとめて反映する。
/// 同じ書籍への更新だけが直列化されるので、同時貸出でも過剰貸出は起きない。
///
/// 同じ状態を台帳（LendingLedger）としても公開する。
#[derive(Default)]
pub struct InventoryStore {
    shelf: Arc<Mutex<Shelf>>,
    book_locks: BookLocks,
    fail_next_commit: AtomicBool,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用に次に開始するトランザクションのcommitを失敗させる
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// テスト用に書籍を直接登録する
    pub async fn seed_book(&self, book: Book) {
        self.shelf.lock().await.books.insert(book.id, book);
    }

    /// テスト用に台帳へ直接追記する
    pub async fn seed_event(&self, event: LendingEvent) {
        self.shelf.lock().await.ledger.push(event);
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches(book: &Book, query: &BookListQuery) -> bool {
    let f = &query.filter;
    f.title.as_deref().is_none_or(|t| contains_ignore_case(&book.title, t))
        && f.author_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&book.author_id))
        && f.isbn.as_deref().is_none_or(|i| contains_ignore_case(&book.isbn, i))
        && f.year_from.is_none_or(|y| book.publication_year >= y)
        && f.year_to.is_none_or(|y| book.publication_year <= y)
        && f.publisher
            .as_deref()
            .is_none_or(|p| contains_ignore_case(&book.publisher, p))
        && (!f.available_only || book.available_copies > 0)
}

fn sort_books(books: &mut [Book], sort_by: SortField, direction: SortDirection) {
    books.sort_by(|a, b| {
        let ordering = match sort_by {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Author => a.author_id.cmp(&b.author_id),
            SortField::PublicationYear => a.publication_year.cmp(&b.publication_year),
        };
        let ordering = match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
impl InventoryStoreTrait for InventoryStore {
    async fn begin(&self) -> Result<Box<dyn InventoryTransaction>> {
        let fail_commit = self.fail_next_commit.swap(false, Ordering::SeqCst);

        Ok(Box::new(Transaction {
            shelf: self.shelf.clone(),
            book_locks: self.book_locks.clone(),
            held: HashMap::new(),
            staged: HashMap::new(),
            events: Vec::new(),
            open: true,
            fail_commit,
        }))
    }

    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.shelf.lock().await.books.get(&book_id).cloned())
    }

    async fn list_books(&self, query: &BookListQuery) -> Result<BookPage> {
        let shelf = self.shelf.lock().await;
        let mut books: Vec<Book> = shelf
            .books
            .values()
            .filter(|b| matches(b, query))
            .cloned()
            .collect();
        drop(shelf);

        let total = books.len() as i64;
        sort_books(&mut books, query.sort_by, query.direction);

        let items = books
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.size() as usize)
            .collect();

        Ok(BookPage { items, total })
    }

    async fn find_recommendation_candidates(
        &self,
        target: &Book,
        related: &[BookId],
    ) -> Result<Vec<Book>> {
        let related: HashSet<_> = related.iter().copied().collect();
        let shelf = self.shelf.lock().await;

        Ok(shelf
            .books
            .values()
            .filter(|b| b.id != target.id)
            .filter(|b| b.author_id == target.author_id || related.contains(&b.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LendingLedger for InventoryStore {
    async fn history(&self, book_id: BookId) -> Result<Vec<LendingEvent>> {
        let shelf = self.shelf.lock().await;
        let mut events: Vec<_> = shelf
            .ledger
            .iter()
            .filter(|e| e.book_id == book_id)
            .cloned()
            .collect();
        // 追記順を保ったまま発生日時で並べる
        events.sort_by_key(|e| e.occurred_at);
        Ok(events)
    }

    async fn borrow_counts(&self, book_ids: &[BookId]) -> Result<HashMap<BookId, i64>> {
        let wanted: HashSet<_> = book_ids.iter().copied().collect();
        let shelf = self.shelf.lock().await;

        let mut counts = HashMap::new();
        for event in shelf.ledger.iter() {
            if event.kind == LendingKind::Borrow && wanted.contains(&event.book_id) {
                *counts.entry(event.book_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn most_borrowed(&self, limit: usize) -> Result<Vec<(BookId, i64)>> {
        let shelf = self.shelf.lock().await;

        let mut counts: HashMap<BookId, i64> = HashMap::new();
        for event in shelf.ledger.iter().filter(|e| e.kind == LendingKind::Borrow) {
            *counts.entry(event.book_id).or_insert(0) += 1;
        }

        let mut ranked: Vec<_> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        Ok(ranked)
    }
}

/// インメモリのアトミックスコープ
struct Transaction {
    shelf: Arc<Mutex<Shelf>>,
    book_locks: BookLocks,
    held: HashMap<BookId, OwnedMutexGuard<()>>,
    /// None は削除
    staged: HashMap<BookId, Option<Book>>,
    events: Vec<LendingEvent>,
    open: bool,
    fail_commit: bool,
}

impl Transaction {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::TransactionRequired)
        }
    }

    /// 書籍のロックを取得し、このスコープから見た現在の状態を返す
    async fn current(&mut self, book_id: BookId) -> Result<Option<Book>> {
        self.ensure_open()?;

        if !self.held.contains_key(&book_id) {
            let lock = self
                .book_locks
                .lock()
                .await
                .entry(book_id)
                .or_default()
                .clone();
            let guard = lock.lock_owned().await;
            self.held.insert(book_id, guard);
        }

        if let Some(staged) = self.staged.get(&book_id) {
            return Ok(staged.clone());
        }
        Ok(self.shelf.lock().await.books.get(&book_id).cloned())
    }

    fn close(&mut self) {
        self.open = false;
        self.staged.clear();
        self.events.clear();
        self.held.clear();
    }
}

#[async_trait]
impl InventoryTransaction for Transaction {
    async fn insert_book(&mut self, book: &Book) -> Result<()> {
        if self.current(book.id).await?.is_some() {
            return Err(StoreError::storage(format!(
                "duplicate book id {}",
                book.id.value()
            )));
        }
        self.staged.insert(book.id, Some(book.clone()));
        Ok(())
    }

    async fn get_book(&mut self, book_id: BookId) -> Result<Option<Book>> {
        self.current(book_id).await
    }

    async fn update_book(&mut self, book: &Book) -> Result<()> {
        if self.current(book.id).await?.is_some() {
            self.staged.insert(book.id, Some(book.clone()));
        }
        Ok(())
    }

    async fn delete_book(&mut self, book_id: BookId) -> Result<bool> {
        let existed = self.current(book_id).await?.is_some();
        if existed {
            self.staged.insert(book_id, None);
        }
        Ok(existed)
    }

    async fn take_copy(&mut self, book_id: BookId) -> Result<CopyUpdate> {
        let Some(book) = self.current(book_id).await? else {
            return Ok(CopyUpdate::BookMissing);
        };

        match domain::book::take_copy(&book, Utc::now()) {
            Ok(updated) => {
                let available = updated.available_copies;
                self.staged.insert(book_id, Some(updated));
                Ok(CopyUpdate::Applied(available))
            }
            Err(_) => Ok(CopyUpdate::Rejected),
        }
    }

    async fn put_back_copy(
        &mut self,
        book_id: BookId,
        policy: ReturnPolicy,
    ) -> Result<CopyUpdate> {
        let Some(book) = self.current(book_id).await? else {
            return Ok(CopyUpdate::BookMissing);
        };

        match domain::book::put_back_copy(&book, policy, Utc::now()) {
            Ok(updated) => {
                let available = updated.available_copies;
                self.staged.insert(book_id, Some(updated));
                Ok(CopyUpdate::Applied(available))
            }
            Err(_) => Ok(CopyUpdate::Rejected),
        }
    }

    async fn append_lending_event(&mut self, event: &LendingEvent) -> Result<()> {
        self.ensure_open()?;
        self.events.push(event.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.fail_commit {
            self.close();
            return Err(StoreError::storage("injected commit failure"));
        }

        {
            let mut shelf = self.shelf.lock().await;
            for (book_id, book) in self.staged.drain() {
                match book {
                    Some(book) => {
                        shelf.books.insert(book_id, book);
                    }
                    None => {
                        shelf.books.remove(&book_id);
                    }
                }
            }
            shelf.ledger.append(&mut self.events);
        }

        // 反映後に書籍ロックを解放する
        self.close();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.close();
        Ok(())
    }
}
