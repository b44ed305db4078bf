use crate::domain::{
    self, Category, CategoryId, ItemId, ItemType, Reconciliation,
    commands::{AssociateItem, CreateCategory, UpdateCategory},
    query::Page,
};
use crate::ports::{CategoryAssociationStore, CategoryPage, CategoryStore};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::errors::{CategoryApplicationError, Result};

/// カテゴリサービスの依存関係
#[derive(Clone)]
pub struct ServiceDependencies {
    pub category_store: Arc<dyn CategoryStore>,
    pub association_store: Arc<dyn CategoryAssociationStore>,
}

/// カテゴリを作成する
pub async fn create_category(deps: &ServiceDependencies, cmd: CreateCategory) -> Result<Category> {
    let category = domain::category::create_category(cmd.name, cmd.description, Utc::now())
        .map_err(CategoryApplicationError::InvalidCategory)?;

    deps.category_store.insert(&category).await?;

    tracing::info!(category_id = %category.id.value(), name = %category.name, "Category created");
    Ok(category)
}

pub async fn get_category(deps: &ServiceDependencies, category_id: CategoryId) -> Result<Category> {
    deps.category_store
        .get(category_id)
        .await?
        .ok_or(CategoryApplicationError::CategoryNotFound)
}

/// カテゴリの名前と説明を更新する
pub async fn update_category(deps: &ServiceDependencies, cmd: UpdateCategory) -> Result<Category> {
    let current = get_category(deps, cmd.category_id).await?;
    let category = domain::category::rename_category(&current, cmd.name, cmd.description, Utc::now())
        .map_err(CategoryApplicationError::InvalidCategory)?;

    deps.category_store.update(&category).await?;

    tracing::info!(category_id = %category.id.value(), "Category updated");
    Ok(category)
}

/// カテゴリを削除する（付いていたエッジも消える）
pub async fn delete_category(deps: &ServiceDependencies, category_id: CategoryId) -> Result<()> {
    if !deps.category_store.delete(category_id).await? {
        return Err(CategoryApplicationError::CategoryNotFound);
    }

    tracing::info!(category_id = %category_id.value(), "Category deleted");
    Ok(())
}

/// カテゴリ一覧（作成日時の新しい順）
pub async fn list_categories(
    deps: &ServiceDependencies,
    page: Option<i64>,
    page_size: Option<i64>,
) -> Result<CategoryPage> {
    let page = Page::new(page, page_size).map_err(CategoryApplicationError::InvalidQuery)?;

    Ok(deps
        .category_store
        .list(page.offset(), page.size())
        .await?)
}

/// アイテムにカテゴリを一括付与する
///
/// 既に存在するエッジは重複させない。同じ要求を再送しても結果は変わらない。
pub async fn bulk_associate(deps: &ServiceDependencies, cmd: AssociateItem) -> Result<()> {
    deps.association_store
        .bulk_associate(cmd.item_id, &cmd.item_type, &cmd.category_ids)
        .await?;

    tracing::info!(
        item_id = %cmd.item_id.value(),
        item_type = %cmd.item_type,
        count = cmd.category_ids.len(),
        "Item associated with categories"
    );
    Ok(())
}

/// アイテムのカテゴリを望ましい集合に照合する
///
/// 同じ集合で2回呼ぶと、2回目は added = ∅, removed = ∅ になる。
pub async fn reconcile_associations(
    deps: &ServiceDependencies,
    cmd: AssociateItem,
) -> Result<Reconciliation> {
    let diff = deps
        .association_store
        .reconcile(cmd.item_id, &cmd.item_type, &cmd.category_ids)
        .await?;

    if !diff.is_noop() {
        tracing::info!(
            item_id = %cmd.item_id.value(),
            item_type = %cmd.item_type,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Item categories reconciled"
        );
    }
    Ok(diff)
}

pub async fn associations_of(
    deps: &ServiceDependencies,
    item_id: ItemId,
    item_type: &ItemType,
) -> Result<Vec<Category>> {
    Ok(deps.association_store.associations_of(item_id, item_type).await?)
}

pub async fn items_tagged_by(
    deps: &ServiceDependencies,
    category_ids: &BTreeSet<CategoryId>,
    item_type: &ItemType,
) -> Result<BTreeSet<ItemId>> {
    Ok(deps
        .association_store
        .items_tagged_by(category_ids, item_type)
        .await?)
}
