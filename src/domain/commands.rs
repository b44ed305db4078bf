use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{BookDetails, BookId, CategoryId, ItemId, ItemType, TransactionId, UserId};

/// コマンド：書籍を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBook {
    pub details: BookDetails,
    pub category_ids: BTreeSet<CategoryId>,
}

/// コマンド：書籍を更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBook {
    pub book_id: BookId,
    pub details: BookDetails,
    pub category_ids: BTreeSet<CategoryId>,
}

/// コマンド：書籍を削除する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBook {
    pub book_id: BookId,
}

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowBook {
    pub book_id: BookId,
    pub user_id: UserId,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub book_id: BookId,
    pub user_id: UserId,
    pub transaction_id: TransactionId,
}

/// コマンド：アイテムのカテゴリ関連を変更する
///
/// 照合（Reconcile）と一括付与（BulkAssociate）で共通の入力。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociateItem {
    pub item_id: ItemId,
    pub item_type: ItemType,
    pub category_ids: BTreeSet<CategoryId>,
}

/// カテゴリ関連付けの呼び出し種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationOperation {
    BulkAssociate,
    Reconcile,
}

impl AssociationOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationOperation::BulkAssociate => "bulk_associate",
            AssociationOperation::Reconcile => "reconcile",
        }
    }
}

impl AssociateItem {
    /// 冪等キー（決定的なUUID v5）
    ///
    /// 呼び出し種別・呼び出し元の処理単位ID（サガ1回につき1つ）・アイテム種別・
    /// アイテムID・ソート済みのカテゴリID集合から導出する。
    /// 同じ処理単位での再送は同じキーになり、別の処理単位の要求とは衝突しない。
    pub fn idempotency_key(
        &self,
        operation: AssociationOperation,
        origin_id: uuid::Uuid,
    ) -> uuid::Uuid {
        let mut canonical = format!(
            "{}:{}:{}:{}",
            operation.as_str(),
            origin_id,
            self.item_type,
            self.item_id.value()
        );
        for category_id in &self.category_ids {
            canonical.push(':');
            canonical.push_str(&category_id.value().to_string());
        }
        uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, canonical.as_bytes())
    }
}

/// コマンド：カテゴリを作成する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub description: String,
}

/// コマンド：カテゴリを更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategory {
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
}
