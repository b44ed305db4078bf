use crate::domain::{
    Category, CategoryAssociation, CategoryId, ItemId, ItemType, Reconciliation, category,
};
use crate::ports::category_store::{
    CategoryAssociationStore, CategoryPage, CategoryStore as CategoryStoreTrait,
};
use crate::ports::inventory_store::{Result, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Catalog {
    categories: HashMap<CategoryId, Category>,
    edges: Vec<CategoryAssociation>,
}

impl Catalog {
    fn current_set(&self, item_id: ItemId, item_type: &ItemType) -> BTreeSet<CategoryId> {
        self.edges
            .iter()
            .filter(|e| e.item_id == item_id && &e.item_type == item_type)
            .map(|e| e.category_id)
            .collect()
    }

    /// 外部キー制約の代わり：存在しないカテゴリへのエッジは作らない
    fn ensure_known(&self, category_ids: &BTreeSet<CategoryId>) -> Result<()> {
        match category_ids
            .iter()
            .find(|id| !self.categories.contains_key(id))
        {
            Some(missing) => Err(StoreError::storage(format!(
                "unknown category {}",
                missing.value()
            ))),
            None => Ok(()),
        }
    }

    fn insert_edges(
        &mut self,
        item_id: ItemId,
        item_type: &ItemType,
        category_ids: impl IntoIterator<Item = CategoryId>,
    ) {
        let existing = self.current_set(item_id, item_type);
        let now = Utc::now();
        for category_id in category_ids {
            if existing.contains(&category_id) {
                continue;
            }
            self.edges.push(CategoryAssociation {
                category_id,
                item_id,
                item_type: item_type.clone(),
                created_at: now,
            });
        }
    }
}

/// CategoryStore / CategoryAssociationStore のインメモリ実装
///
/// 1つのロックの中で読み取り・差分計算・書き込みを行うため、照合はアトミックになる。
#[derive(Default)]
pub struct CategoryStore {
    catalog: Mutex<Catalog>,
}

impl CategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn catalog(&self) -> Result<MutexGuard<'_, Catalog>> {
        self.catalog
            .lock()
            .map_err(|_| StoreError::storage("category store lock poisoned"))
    }

    /// テスト用にエッジの総数を返す
    pub fn edge_count(&self) -> usize {
        self.catalog.lock().map(|c| c.edges.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CategoryStoreTrait for CategoryStore {
    async fn insert(&self, category: &Category) -> Result<()> {
        self.catalog()?
            .categories
            .insert(category.id, category.clone());
        Ok(())
    }

    async fn get(&self, category_id: CategoryId) -> Result<Option<Category>> {
        Ok(self.catalog()?.categories.get(&category_id).cloned())
    }

    async fn update(&self, category: &Category) -> Result<()> {
        let mut catalog = self.catalog()?;
        if let Some(existing) = catalog.categories.get_mut(&category.id) {
            *existing = category.clone();
        }
        Ok(())
    }

    async fn delete(&self, category_id: CategoryId) -> Result<bool> {
        let mut catalog = self.catalog()?;
        let removed = catalog.categories.remove(&category_id).is_some();
        catalog.edges.retain(|e| e.category_id != category_id);
        Ok(removed)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<CategoryPage> {
        let catalog = self.catalog()?;
        let mut categories: Vec<_> = catalog.categories.values().cloned().collect();
        categories.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = categories.len() as i64;
        let items = categories
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();

        Ok(CategoryPage { items, total })
    }
}

#[async_trait]
impl CategoryAssociationStore for CategoryStore {
    async fn reconcile(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
        desired: &BTreeSet<CategoryId>,
    ) -> Result<Reconciliation> {
        let mut catalog = self.catalog()?;

        let current = catalog.current_set(item_id, item_type);
        let diff = category::reconcile(&current, desired);
        catalog.ensure_known(&diff.added)?;

        catalog.edges.retain(|e| {
            !(e.item_id == item_id
                && &e.item_type == item_type
                && diff.removed.contains(&e.category_id))
        });
        catalog.insert_edges(item_id, item_type, diff.added.iter().copied());

        Ok(diff)
    }

    async fn bulk_associate(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
        category_ids: &BTreeSet<CategoryId>,
    ) -> Result<()> {
        let mut catalog = self.catalog()?;
        catalog.ensure_known(category_ids)?;
        catalog.insert_edges(item_id, item_type, category_ids.iter().copied());
        Ok(())
    }

    async fn associations_of(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
    ) -> Result<Vec<Category>> {
        let catalog = self.catalog()?;
        Ok(catalog
            .current_set(item_id, item_type)
            .iter()
            .filter_map(|id| catalog.categories.get(id).cloned())
            .collect())
    }

    async fn items_tagged_by(
        &self,
        category_ids: &BTreeSet<CategoryId>,
        item_type: &ItemType,
    ) -> Result<BTreeSet<ItemId>> {
        let catalog = self.catalog()?;
        Ok(catalog
            .edges
            .iter()
            .filter(|e| &e.item_type == item_type && category_ids.contains(&e.category_id))
            .map(|e| e.item_id)
            .collect())
    }
}
