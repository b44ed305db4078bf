use crate::domain::{
    Category, CategoryId, ItemId, ItemType, Reconciliation, commands::AssociateItem,
};
use async_trait::async_trait;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// カテゴリサービスポート（リモート呼び出し）
///
/// エッジ集合はカテゴリサービスが所有する。書籍サービスは直接書き込まず、
/// このポートを通じて照合（Reconcile）を依頼する。
/// 呼び出しは書籍サービス側のトランザクションには含まれない。
///
/// 書き込み系の `idempotency_key` は呼び出し側が決める。同じ要求の再送では同じ値を渡す。
#[async_trait]
pub trait CategoryService: Send + Sync {
    /// 初回作成時のエッジ一括追加
    async fn bulk_associate(&self, request: &AssociateItem, idempotency_key: Uuid) -> Result<()>;

    /// 望ましい集合への照合
    async fn reconcile(
        &self,
        request: &AssociateItem,
        idempotency_key: Uuid,
    ) -> Result<Reconciliation>;

    /// アイテムに付いているカテゴリ
    async fn associations_of(&self, item_id: ItemId, item_type: &ItemType)
    -> Result<Vec<Category>>;

    /// いずれかのカテゴリが付いているアイテム
    async fn items_tagged_by(
        &self,
        category_ids: &[CategoryId],
        item_type: &ItemType,
    ) -> Result<Vec<ItemId>>;
}
