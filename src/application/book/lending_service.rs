use crate::domain::{
    LendingEvent, TransactionId,
    commands::{BorrowBook, ReturnBook},
};
use crate::ports::CopyUpdate;
use chrono::Utc;

use super::ServiceDependencies;
use super::errors::{BookApplicationError, Result};
use super::saga::discard;

/// 書籍を1冊貸し出す
///
/// ビジネスルール：
/// - available_copies > 0 の場合のみ成功する
/// - 成功時は在庫を1減らし、同じアトミックスコープで台帳にBorrowイベントを追記する
/// - 在庫切れの場合は台帳に何も書かない
///
/// 在庫の判定と減算はストアの条件付き更新1回で行う。読み取ってから書き込むことはしない。
/// 同じ書籍への同時貸出はストア側で直列化され、過剰貸出は起きない。
///
/// # 戻り値
/// 台帳イベントのID（transaction_id）
pub async fn borrow_book(deps: &ServiceDependencies, cmd: BorrowBook) -> Result<TransactionId> {
    // 1. アトミックスコープを開始
    let mut tx = deps.inventory_store.begin().await?;

    // 2. 条件付き減算
    let remaining = match tx.take_copy(cmd.book_id).await? {
        CopyUpdate::Applied(remaining) => remaining,
        CopyUpdate::Rejected => {
            discard(tx).await;
            tracing::warn!(book_id = %cmd.book_id.value(), "Borrow rejected: no available copies");
            return Err(BookApplicationError::NoAvailableCopies);
        }
        CopyUpdate::BookMissing => {
            discard(tx).await;
            return Err(BookApplicationError::BookNotFound);
        }
    };

    // 3. 台帳に追記
    let event = LendingEvent::borrow(cmd.book_id, cmd.user_id, Utc::now());
    tx.append_lending_event(&event).await?;

    // 4. commit
    tx.commit().await?;

    tracing::info!(
        book_id = %cmd.book_id.value(),
        user_id = %cmd.user_id.value(),
        transaction_id = %event.transaction_id.value(),
        available_copies = remaining,
        "Book borrowed"
    );

    Ok(event.transaction_id)
}

/// 書籍を1冊返却する
///
/// ビジネスルール：
/// - 返却ポリシーがCappedAtTotalの場合、全冊が棚にあれば拒否する（台帳には書かない）
/// - Uncheckedの場合は無条件に1増やす
/// - 成功時は同じアトミックスコープで台帳にReturnイベントを追記する
///
/// transaction_idは貸出イベントとの照合を行わず、ログに記録するのみ。
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<()> {
    // 1. アトミックスコープを開始
    let mut tx = deps.inventory_store.begin().await?;

    // 2. ポリシーに従って加算
    let available = match tx.put_back_copy(cmd.book_id, deps.return_policy).await? {
        CopyUpdate::Applied(available) => available,
        CopyUpdate::Rejected => {
            discard(tx).await;
            tracing::warn!(
                book_id = %cmd.book_id.value(),
                transaction_id = %cmd.transaction_id.value(),
                "Return rejected: all copies are on the shelf"
            );
            return Err(BookApplicationError::NoOutstandingLoans);
        }
        CopyUpdate::BookMissing => {
            discard(tx).await;
            return Err(BookApplicationError::BookNotFound);
        }
    };

    // 3. 台帳に追記
    let event = LendingEvent::returned(cmd.book_id, cmd.user_id, Utc::now());
    tx.append_lending_event(&event).await?;

    // 4. commit
    tx.commit().await?;

    tracing::info!(
        book_id = %cmd.book_id.value(),
        user_id = %cmd.user_id.value(),
        borrow_transaction_id = %cmd.transaction_id.value(),
        available_copies = available,
        "Book returned"
    );

    Ok(())
}
