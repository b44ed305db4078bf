use crate::domain::{Category, CategoryId, ItemId, ItemType, Reconciliation, category};
use crate::ports::category_store::{
    CategoryAssociationStore, CategoryPage, CategoryStore as CategoryStoreTrait,
};
use crate::ports::inventory_store::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use std::collections::BTreeSet;

fn map_row_to_category(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn uuids(category_ids: &BTreeSet<CategoryId>) -> Vec<uuid::Uuid> {
    category_ids.iter().map(|id| id.value()).collect()
}

/// UNNESTで関連付けを一括INSERTする（既存の関連付けはそのまま）
async fn insert_edges(
    conn: &mut PgConnection,
    item_id: ItemId,
    item_type: &ItemType,
    category_ids: &BTreeSet<CategoryId>,
) -> Result<()> {
    if category_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO category_items (category_id, item_id, item_type, created_at)
        SELECT category_id, $2, $3, $4 FROM UNNEST($1::uuid[]) AS t(category_id)
        ON CONFLICT (category_id, item_id, item_type) DO NOTHING
        "#,
    )
    .bind(uuids(category_ids))
    .bind(item_id.value())
    .bind(item_type.as_str())
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// CategoryStore / CategoryAssociationStore のPostgreSQL実装
///
/// `category_items.category_id` は `categories(id)` を ON DELETE CASCADE で
/// 参照するため、カテゴリを削除するとその関連付けも消える。
pub struct CategoryStore {
    pool: PgPool,
}

impl CategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStoreTrait for CategoryStore {
    async fn insert(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(category.id.value())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, category_id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(category_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_category).transpose()
    }

    async fn update(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, description = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(category.id.value())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, category_id: CategoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<CategoryPage> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM categories
            ORDER BY created_at DESC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(map_row_to_category)
            .collect::<Result<Vec<_>>>()?;

        Ok(CategoryPage { items, total })
    }
}

#[async_trait]
impl CategoryAssociationStore for CategoryStore {
    /// 現在の関連付けを読み、差分だけを削除・追加する（1トランザクション内）
    ///
    /// アイテムをキーにしたトランザクション単位のアドバイザリロックで、
    /// 同じアイテムへの同時照合を直列化する。関連付けがまだ無く
    /// ロックできる行が存在しない場合もこれで防げる。
    async fn reconcile(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
        desired: &BTreeSet<CategoryId>,
    ) -> Result<Reconciliation> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{}:{}", item_type, item_id.value()))
            .execute(&mut *tx)
            .await?;

        let current: Vec<uuid::Uuid> = sqlx::query_scalar(
            r#"
            SELECT category_id
            FROM category_items
            WHERE item_id = $1 AND item_type = $2
            "#,
        )
        .bind(item_id.value())
        .bind(item_type.as_str())
        .fetch_all(&mut *tx)
        .await?;
        let current: BTreeSet<CategoryId> =
            current.into_iter().map(CategoryId::from_uuid).collect();

        let diff = category::reconcile(&current, desired);

        if !diff.removed.is_empty() {
            sqlx::query(
                r#"
                DELETE FROM category_items
                WHERE item_id = $1 AND item_type = $2 AND category_id = ANY($3)
                "#,
            )
            .bind(item_id.value())
            .bind(item_type.as_str())
            .bind(uuids(&diff.removed))
            .execute(&mut *tx)
            .await?;
        }

        insert_edges(&mut tx, item_id, item_type, &diff.added).await?;

        tx.commit().await?;
        Ok(diff)
    }

    async fn bulk_associate(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
        category_ids: &BTreeSet<CategoryId>,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert_edges(&mut conn, item_id, item_type, category_ids).await
    }

    async fn associations_of(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
    ) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.description, c.created_at, c.updated_at
            FROM categories c
            JOIN category_items ci ON ci.category_id = c.id
            WHERE ci.item_id = $1 AND ci.item_type = $2
            ORDER BY c.id ASC
            "#,
        )
        .bind(item_id.value())
        .bind(item_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_category).collect()
    }

    async fn items_tagged_by(
        &self,
        category_ids: &BTreeSet<CategoryId>,
        item_type: &ItemType,
    ) -> Result<BTreeSet<ItemId>> {
        if category_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let items: Vec<uuid::Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT item_id
            FROM category_items
            WHERE item_type = $1 AND category_id = ANY($2)
            "#,
        )
        .bind(item_type.as_str())
        .bind(uuids(category_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(items.into_iter().map(ItemId::from_uuid).collect())
    }
}
