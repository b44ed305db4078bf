use crate::api::types::{
    CategoryIdsRequest, ItemCategoriesResponse, ItemIdsResponse, ReconciliationResponse,
};
use crate::domain::{
    Category, CategoryId, ItemId, ItemType, Reconciliation, commands::AssociateItem,
};
use crate::ports::category_service::{CategoryService, Result};
use async_trait::async_trait;
use reqwest::Method;
use uuid::Uuid;

use super::ServiceEndpoint;

/// 関連付け呼び出しの決定的なリクエストキーを運ぶヘッダー
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

fn body_of(request: &AssociateItem) -> CategoryIdsRequest {
    CategoryIdsRequest {
        category_ids: request.category_ids.iter().map(|id| id.value()).collect(),
    }
}

fn item_path(item_id: ItemId, item_type: &ItemType) -> String {
    format!("/items/{}/{}/categories", item_type, item_id.value())
}

/// カテゴリサービスのHTTPクライアント
///
/// 書き込み呼び出しには呼び出し側が決めた `Idempotency-Key` ヘッダーを付け、
/// 受信側で再送を見分けられるようにする。
pub struct CategoryClient {
    endpoint: ServiceEndpoint,
}

impl CategoryClient {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl CategoryService for CategoryClient {
    async fn bulk_associate(&self, request: &AssociateItem, idempotency_key: Uuid) -> Result<()> {
        let builder = self
            .endpoint
            .request(Method::POST, &item_path(request.item_id, &request.item_type))
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(&body_of(request));
        Ok(self.endpoint.send_empty(builder).await?)
    }

    async fn reconcile(
        &self,
        request: &AssociateItem,
        idempotency_key: Uuid,
    ) -> Result<Reconciliation> {
        let builder = self
            .endpoint
            .request(Method::PUT, &item_path(request.item_id, &request.item_type))
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(&body_of(request));
        let diff: ReconciliationResponse = self.endpoint.send_json(builder).await?;
        Ok(diff.into())
    }

    async fn associations_of(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
    ) -> Result<Vec<Category>> {
        let builder = self
            .endpoint
            .request(Method::GET, &item_path(item_id, item_type));
        let found: ItemCategoriesResponse = self.endpoint.send_json(builder).await?;
        Ok(found.categories.into_iter().map(Category::from).collect())
    }

    async fn items_tagged_by(
        &self,
        category_ids: &[CategoryId],
        item_type: &ItemType,
    ) -> Result<Vec<ItemId>> {
        let body = CategoryIdsRequest {
            category_ids: category_ids.iter().map(|id| id.value()).collect(),
        };
        let builder = self
            .endpoint
            .request(Method::POST, &format!("/items/{}/lookup", item_type))
            .json(&body);
        let found: ItemIdsResponse = self.endpoint.send_json(builder).await?;
        Ok(found.item_ids.into_iter().map(ItemId::from_uuid).collect())
    }
}
