use crate::domain::{BookId, LendingEvent, LendingKind, TransactionId, UserId};
use crate::ports::inventory_store::{Result, StoreError};
use crate::ports::lending_ledger::LendingLedger as LendingLedgerTrait;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use std::str::FromStr;

fn map_row_to_event(row: &PgRow) -> Result<LendingEvent> {
    let kind: String = row.try_get("transaction_type")?;
    let kind = LendingKind::from_str(&kind).map_err(StoreError::storage)?;

    Ok(LendingEvent {
        transaction_id: TransactionId::from_uuid(row.try_get("id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        kind,
        occurred_at: row.try_get("transaction_date")?,
    })
}

/// 貸出台帳（`book_transactions`）のPostgreSQL読み取り側
///
/// 行の書き込みは在庫トランザクション経由のみで、このアダプターは
/// 追加・更新・削除を行わない。
pub struct LendingLedger {
    pool: PgPool,
}

impl LendingLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LendingLedgerTrait for LendingLedger {
    async fn history(&self, book_id: BookId) -> Result<Vec<LendingEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, book_id, user_id, transaction_type, transaction_date
            FROM book_transactions
            WHERE book_id = $1
            ORDER BY transaction_date ASC, id ASC
            "#,
        )
        .bind(book_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_event).collect()
    }

    async fn borrow_counts(&self, book_ids: &[BookId]) -> Result<HashMap<BookId, i64>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<uuid::Uuid> = book_ids.iter().map(|id| id.value()).collect();

        let rows = sqlx::query(
            r#"
            SELECT book_id, COUNT(*) AS borrow_count
            FROM book_transactions
            WHERE transaction_type = 'borrow' AND book_id = ANY($1)
            GROUP BY book_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok((
                    BookId::from_uuid(row.try_get("book_id")?),
                    row.try_get::<i64, _>("borrow_count")?,
                ))
            })
            .collect()
    }

    async fn most_borrowed(&self, limit: usize) -> Result<Vec<(BookId, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT book_id, COUNT(*) AS borrow_count
            FROM book_transactions
            WHERE transaction_type = 'borrow'
            GROUP BY book_id
            ORDER BY borrow_count DESC, book_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok((
                    BookId::from_uuid(row.try_get("book_id")?),
                    row.try_get::<i64, _>("borrow_count")?,
                ))
            })
            .collect()
    }
}
