use crate::domain::{Category, CategoryId, ItemId, ItemType, Reconciliation};
use async_trait::async_trait;
use std::collections::BTreeSet;

use super::inventory_store::Result;

/// カテゴリ一覧の1ページ分
#[derive(Debug, Clone)]
pub struct CategoryPage {
    pub items: Vec<Category>,
    pub total: i64,
}

/// カテゴリストアポート（カテゴリサービス内）
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert(&self, category: &Category) -> Result<()>;

    async fn get(&self, category_id: CategoryId) -> Result<Option<Category>>;

    async fn update(&self, category: &Category) -> Result<()>;

    /// 削除した場合true。カテゴリに付いていたエッジも同時に消える。
    async fn delete(&self, category_id: CategoryId) -> Result<bool>;

    /// 作成日時の新しい順
    async fn list(&self, offset: i64, limit: i64) -> Result<CategoryPage>;
}

/// カテゴリ関連ストアポート（カテゴリサービス内）
///
/// アイテム（種類を問わない）とカテゴリの多対多のエッジ集合を所有する。
#[async_trait]
pub trait CategoryAssociationStore: Send + Sync {
    /// 望ましい集合との差分を計算して適用する
    ///
    /// 現在のエッジ集合の読み取り、削除、追加を1つのアトミックスコープで行う。
    /// 同じ集合で2回呼ぶと、2回目は added = ∅, removed = ∅ になる。
    async fn reconcile(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
        desired: &BTreeSet<CategoryId>,
    ) -> Result<Reconciliation>;

    /// 無条件にエッジを追加する（既存のエッジは重複させない）
    async fn bulk_associate(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
        category_ids: &BTreeSet<CategoryId>,
    ) -> Result<()>;

    /// アイテムに付いているカテゴリ
    async fn associations_of(&self, item_id: ItemId, item_type: &ItemType)
    -> Result<Vec<Category>>;

    /// いずれかのカテゴリが付いているアイテム
    async fn items_tagged_by(
        &self,
        category_ids: &BTreeSet<CategoryId>,
        item_type: &ItemType,
    ) -> Result<BTreeSet<ItemId>>;
}
