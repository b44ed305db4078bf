use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, TransactionId, UserId};

/// 台帳イベントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LendingKind {
    Borrow,
    Return,
}

impl LendingKind {
    /// 文字列表現を取得する（book_transactions.transaction_type）
    pub fn as_str(&self) -> &'static str {
        match self {
            LendingKind::Borrow => "borrow",
            LendingKind::Return => "return",
        }
    }
}

impl std::str::FromStr for LendingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrow" => Ok(LendingKind::Borrow),
            "return" => Ok(LendingKind::Return),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

/// 台帳イベント：書籍1冊の貸出または返却
///
/// 一度書き込まれたら変更されない。台帳は追記専用で、更新・削除は行わない。
/// 貸出可否の判断には使わず（真実の情報源はBookのカウンタ）、監査履歴として扱う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingEvent {
    pub transaction_id: TransactionId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub kind: LendingKind,
    pub occurred_at: DateTime<Utc>,
}

impl LendingEvent {
    pub fn borrow(book_id: BookId, user_id: UserId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            transaction_id: TransactionId::new(),
            book_id,
            user_id,
            kind: LendingKind::Borrow,
            occurred_at,
        }
    }

    pub fn returned(book_id: BookId, user_id: UserId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            transaction_id: TransactionId::new(),
            book_id,
            user_id,
            kind: LendingKind::Return,
            occurred_at,
        }
    }
}

/// 返却時のカウンタ更新ポリシー
///
/// - `CappedAtTotal`: available_copies < total_copies の場合のみ加算する
/// - `Unchecked`: 無条件に加算する（対応する貸出の有無を問わない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnPolicy {
    #[default]
    #[serde(alias = "capped")]
    CappedAtTotal,
    Unchecked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lending_kind_round_trip() {
        for kind in [LendingKind::Borrow, LendingKind::Return] {
            assert_eq!(kind.as_str().parse::<LendingKind>(), Ok(kind));
        }
        assert!("lost".parse::<LendingKind>().is_err());
    }

    #[test]
    fn test_borrow_event_gets_fresh_transaction_id() {
        let book_id = BookId::new();
        let user_id = UserId::new();
        let now = Utc::now();

        let first = LendingEvent::borrow(book_id, user_id, now);
        let second = LendingEvent::borrow(book_id, user_id, now);

        assert_eq!(first.kind, LendingKind::Borrow);
        assert_ne!(first.transaction_id, second.transaction_id);
    }

    #[test]
    fn test_return_policy_deserialize() {
        let capped: ReturnPolicy = serde_json::from_str("\"capped\"").unwrap();
        assert_eq!(capped, ReturnPolicy::CappedAtTotal);

        let unchecked: ReturnPolicy = serde_json::from_str("\"unchecked\"").unwrap();
        assert_eq!(unchecked, ReturnPolicy::Unchecked);

        assert_eq!(ReturnPolicy::default(), ReturnPolicy::CappedAtTotal);
    }
}
