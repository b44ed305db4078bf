use crate::domain::{
    AuthorId, Book, BookId, LendingEvent, ReturnPolicy,
    query::{BookFilter, BookListQuery, SortDirection, SortField},
};
use crate::ports::inventory_store::{
    BookPage, CopyUpdate, InventoryStore as InventoryStoreTrait, InventoryTransaction, Result,
    StoreError,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction, postgres::PgRow};

const BOOK_COLUMNS: &str = r#"
    id,
    title,
    author_id,
    isbn,
    publication_year,
    publisher,
    description,
    total_copies,
    available_copies,
    created_at,
    updated_at
"#;

/// `books` の行をBook集約に変換する
fn map_row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        id: BookId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        author_id: AuthorId::from_uuid(row.try_get("author_id")?),
        isbn: row.try_get("isbn")?,
        publication_year: row.try_get("publication_year")?,
        publisher: row.try_get("publisher")?,
        description: row.try_get("description")?,
        total_copies: row.try_get("total_copies")?,
        available_copies: row.try_get("available_copies")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// フィルタのWHERE句を適用した `books` へのクエリを組み立てる
///
/// 文字列フィルタは大文字小文字を区別しない部分一致（ILIKE）。
fn filtered_query(select: &str, filter: &BookFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(select);
    builder.push(" FROM books WHERE 1 = 1");

    if let Some(title) = &filter.title {
        builder.push(" AND title ILIKE ").push_bind(format!("%{}%", title));
    }
    if let Some(author_ids) = &filter.author_ids {
        let ids: Vec<uuid::Uuid> = author_ids.iter().map(|id| id.value()).collect();
        builder.push(" AND author_id = ANY(").push_bind(ids).push(")");
    }
    if let Some(isbn) = &filter.isbn {
        builder.push(" AND isbn ILIKE ").push_bind(format!("%{}%", isbn));
    }
    if let Some(year_from) = filter.year_from {
        builder.push(" AND publication_year >= ").push_bind(year_from);
    }
    if let Some(year_to) = filter.year_to {
        builder.push(" AND publication_year <= ").push_bind(year_to);
    }
    if let Some(publisher) = &filter.publisher {
        builder
            .push(" AND publisher ILIKE ")
            .push_bind(format!("%{}%", publisher));
    }
    if filter.available_only {
        builder.push(" AND available_copies > 0");
    }

    builder
}

fn sort_column(sort_by: SortField) -> &'static str {
    match sort_by {
        SortField::CreatedAt => "created_at",
        SortField::Title => "title",
        SortField::Author => "author_id",
        SortField::PublicationYear => "publication_year",
    }
}

/// InventoryStoreのPostgreSQL実装
///
/// 書籍と貸出台帳は同じデータベースにあり、在庫カウンタの更新と
/// 台帳の行は同じトランザクションでcommitされる。
pub struct InventoryStore {
    pool: PgPool,
}

impl InventoryStore {
    /// PostgreSQLコネクションプールから新しいInventoryStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStoreTrait for InventoryStore {
    async fn begin(&self) -> Result<Box<dyn InventoryTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgInventoryTransaction { tx: Some(tx) }))
    }

    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(book_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    /// フィルタ・ソート・ページ指定での一覧
    ///
    /// 総件数はLIMIT/OFFSETの前に同じWHERE句で数える。
    async fn list_books(&self, query: &BookListQuery) -> Result<BookPage> {
        let total: i64 = filtered_query("SELECT COUNT(*)", &query.filter)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder = filtered_query(&format!("SELECT {}", BOOK_COLUMNS), &query.filter);
        let direction = match query.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        builder
            .push(" ORDER BY ")
            .push(sort_column(query.sort_by))
            .push(" ")
            .push(direction)
            .push(", id ASC LIMIT ")
            .push_bind(query.page.size())
            .push(" OFFSET ")
            .push_bind(query.page.offset());

        let rows = builder.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(map_row_to_book).collect::<Result<Vec<_>>>()?;

        Ok(BookPage { items, total })
    }

    async fn find_recommendation_candidates(
        &self,
        target: &Book,
        related: &[BookId],
    ) -> Result<Vec<Book>> {
        let related: Vec<uuid::Uuid> = related.iter().map(|id| id.value()).collect();

        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM books
            WHERE id <> $1
              AND (author_id = $2 OR id = ANY($3))
            "#,
            BOOK_COLUMNS
        ))
        .bind(target.id.value())
        .bind(target.author_id.value())
        .bind(&related)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }
}

/// 1回の貸出・蔵書更新に対応するデータベーストランザクション
///
/// commitせずにdropするとロールバックされる（sqlxのTransactionの挙動）。
pub struct PgInventoryTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgInventoryTransaction {
    fn active(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx.as_mut().ok_or(StoreError::TransactionRequired)
    }

    async fn book_exists(&mut self, book_id: BookId) -> Result<bool> {
        let tx = self.active()?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id.value())
            .fetch_one(&mut **tx)
            .await?;
        Ok(exists)
    }

    /// 条件付きカウンタUPDATEの結果をCopyUpdateに変換する
    async fn copy_update(&mut self, book_id: BookId, returned: Option<i32>) -> Result<CopyUpdate> {
        match returned {
            Some(available) => Ok(CopyUpdate::Applied(available)),
            None if self.book_exists(book_id).await? => Ok(CopyUpdate::Rejected),
            None => Ok(CopyUpdate::BookMissing),
        }
    }
}

#[async_trait]
impl InventoryTransaction for PgInventoryTransaction {
    async fn insert_book(&mut self, book: &Book) -> Result<()> {
        let tx = self.active()?;
        sqlx::query(
            r#"
            INSERT INTO books (
                id,
                title,
                author_id,
                isbn,
                publication_year,
                publisher,
                description,
                total_copies,
                available_copies,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(book.id.value())
        .bind(&book.title)
        .bind(book.author_id.value())
        .bind(&book.isbn)
        .bind(book.publication_year)
        .bind(&book.publisher)
        .bind(&book.description)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// 続く更新が安定したカウンタを見られるよう行ロック付きで読む
    async fn get_book(&mut self, book_id: BookId) -> Result<Option<Book>> {
        let tx = self.active()?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(book_id.value())
        .fetch_optional(&mut **tx)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn update_book(&mut self, book: &Book) -> Result<()> {
        let tx = self.active()?;
        sqlx::query(
            r#"
            UPDATE books
            SET title = $2,
                author_id = $3,
                isbn = $4,
                publication_year = $5,
                publisher = $6,
                description = $7,
                total_copies = $8,
                available_copies = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(book.id.value())
        .bind(&book.title)
        .bind(book.author_id.value())
        .bind(&book.isbn)
        .bind(book.publication_year)
        .bind(&book.publisher)
        .bind(&book.description)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(book.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn delete_book(&mut self, book_id: BookId) -> Result<bool> {
        let tx = self.active()?;
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id.value())
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 条件付きUPDATE 1回で減算する
    ///
    /// UPDATEが取る行ロックで、同じ書籍への同時貸出は直列化される。
    async fn take_copy(&mut self, book_id: BookId) -> Result<CopyUpdate> {
        let tx = self.active()?;
        let returned: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1,
                updated_at = NOW()
            WHERE id = $1 AND available_copies > 0
            RETURNING available_copies
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&mut **tx)
        .await?;

        self.copy_update(book_id, returned).await
    }

    async fn put_back_copy(
        &mut self,
        book_id: BookId,
        policy: ReturnPolicy,
    ) -> Result<CopyUpdate> {
        let sql = match policy {
            ReturnPolicy::CappedAtTotal => {
                r#"
                UPDATE books
                SET available_copies = available_copies + 1,
                    updated_at = NOW()
                WHERE id = $1 AND available_copies < total_copies
                RETURNING available_copies
                "#
            }
            ReturnPolicy::Unchecked => {
                r#"
                UPDATE books
                SET available_copies = available_copies + 1,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING available_copies
                "#
            }
        };

        let tx = self.active()?;
        let returned: Option<i32> = sqlx::query_scalar(sql)
            .bind(book_id.value())
            .fetch_optional(&mut **tx)
            .await?;

        self.copy_update(book_id, returned).await
    }

    async fn append_lending_event(&mut self, event: &LendingEvent) -> Result<()> {
        let tx = self.active()?;
        sqlx::query(
            r#"
            INSERT INTO book_transactions (
                id,
                book_id,
                user_id,
                transaction_type,
                transaction_date
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.transaction_id.value())
        .bind(event.book_id.value())
        .bind(event.user_id.value())
        .bind(event.kind.as_str())
        .bind(event.occurred_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionRequired)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionRequired)?;
        tx.rollback().await?;
        Ok(())
    }
}
