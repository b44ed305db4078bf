use crate::domain::{BookId, LendingEvent};
use async_trait::async_trait;
use std::collections::HashMap;

use super::inventory_store::Result;

/// 貸出台帳ポート（読み取り側）
///
/// 書き込みは`InventoryTransaction::append_lending_event`で在庫更新と同時に行う。
/// ここでの集計は履歴表示とおすすめのランク付けにのみ使い、貸出可否の判断には使わない。
#[async_trait]
pub trait LendingLedger: Send + Sync {
    /// 書籍の貸出・返却履歴（発生順）
    async fn history(&self, book_id: BookId) -> Result<Vec<LendingEvent>>;

    /// 指定した書籍ごとの貸出回数。貸出がない書籍はマップに含まれない。
    async fn borrow_counts(&self, book_ids: &[BookId]) -> Result<HashMap<BookId, i64>>;

    /// 貸出回数の多い順に上位limit件
    async fn most_borrowed(&self, limit: usize) -> Result<Vec<(BookId, i64)>>;
}
