use crate::application::category::{
    ServiceDependencies, associations_of as execute_associations_of,
    bulk_associate as execute_bulk_associate, create_category as execute_create_category,
    delete_category as execute_delete_category, get_category as execute_get_category,
    items_tagged_by as execute_items_tagged_by, list_categories as execute_list_categories,
    reconcile_associations, update_category as execute_update_category,
};
use crate::domain::{
    CategoryId, ItemId, ItemType,
    commands::{AssociateItem, CreateCategory, UpdateCategory},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        CategoryIdsRequest, CategoryListResponse, CategoryRequest, CategoryResponse,
        ItemCategoriesResponse, ItemIdsResponse, ListCategoriesQuery, ReconciliationResponse,
        SuccessResponse,
    },
};
use crate::adapters::http::category_client::IDEMPOTENCY_KEY_HEADER;

/// カテゴリサービスの共有状態
#[derive(Clone)]
pub struct CategoryAppState {
    pub service_deps: ServiceDependencies,
}

fn parse_item_type(raw: &str) -> Result<ItemType, ApiError> {
    ItemType::parse(raw).map_err(|e| ApiError::BadRequest(format!("invalid item type {:?}: {:?}", raw, e)))
}

fn idempotency_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(IDEMPOTENCY_KEY_HEADER).and_then(|v| v.to_str().ok())
}

// ============================================================================
// Category CRUD
// ============================================================================

/// POST /categories
pub async fn create_category(
    State(state): State<Arc<CategoryAppState>>,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let cmd = CreateCategory {
        name: req.name,
        description: req.description,
    };
    let category = execute_create_category(&state.service_deps, cmd).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// GET /categories - 作成日時の新しい順
pub async fn list_categories(
    State(state): State<Arc<CategoryAppState>>,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let page = execute_list_categories(&state.service_deps, query.page, query.page_size).await?;
    Ok(Json(CategoryListResponse {
        items: page.items.into_iter().map(CategoryResponse::from).collect(),
        total: page.total,
    }))
}

/// GET /categories/:id
pub async fn get_category(
    State(state): State<Arc<CategoryAppState>>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category =
        execute_get_category(&state.service_deps, CategoryId::from_uuid(category_id)).await?;
    Ok(Json(category.into()))
}

/// PUT /categories/:id
pub async fn update_category(
    State(state): State<Arc<CategoryAppState>>,
    Path(category_id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let cmd = UpdateCategory {
        category_id: CategoryId::from_uuid(category_id),
        name: req.name,
        description: req.description,
    };
    let category = execute_update_category(&state.service_deps, cmd).await?;
    Ok(Json(category.into()))
}

/// DELETE /categories/:id - 付いていたエッジも削除される
pub async fn delete_category(
    State(state): State<Arc<CategoryAppState>>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    execute_delete_category(&state.service_deps, CategoryId::from_uuid(category_id)).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================================
// Item associations
// ============================================================================

/// POST /items/:item_type/:item_id/categories - 一括付与
pub async fn bulk_associate(
    State(state): State<Arc<CategoryAppState>>,
    Path((item_type, item_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(req): Json<CategoryIdsRequest>,
) -> Result<StatusCode, ApiError> {
    let cmd = AssociateItem {
        item_id: ItemId::from_uuid(item_id),
        item_type: parse_item_type(&item_type)?,
        category_ids: req.category_set(),
    };
    tracing::debug!(idempotency_key = ?idempotency_key(&headers), "Bulk associate requested");

    execute_bulk_associate(&state.service_deps, cmd).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /items/:item_type/:item_id/categories - 望ましい集合への照合
pub async fn reconcile(
    State(state): State<Arc<CategoryAppState>>,
    Path((item_type, item_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(req): Json<CategoryIdsRequest>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let cmd = AssociateItem {
        item_id: ItemId::from_uuid(item_id),
        item_type: parse_item_type(&item_type)?,
        category_ids: req.category_set(),
    };
    tracing::debug!(idempotency_key = ?idempotency_key(&headers), "Reconcile requested");

    let diff = reconcile_associations(&state.service_deps, cmd).await?;
    Ok(Json(diff.into()))
}

/// GET /items/:item_type/:item_id/categories
pub async fn associations_of(
    State(state): State<Arc<CategoryAppState>>,
    Path((item_type, item_id)): Path<(String, Uuid)>,
) -> Result<Json<ItemCategoriesResponse>, ApiError> {
    let item_type = parse_item_type(&item_type)?;
    let categories =
        execute_associations_of(&state.service_deps, ItemId::from_uuid(item_id), &item_type)
            .await?;

    Ok(Json(ItemCategoriesResponse {
        categories: categories.into_iter().map(CategoryResponse::from).collect(),
    }))
}

/// POST /items/:item_type/lookup - いずれかのカテゴリが付いているアイテム
pub async fn items_tagged_by(
    State(state): State<Arc<CategoryAppState>>,
    Path(item_type): Path<String>,
    Json(req): Json<CategoryIdsRequest>,
) -> Result<Json<ItemIdsResponse>, ApiError> {
    let item_type = parse_item_type(&item_type)?;
    let items =
        execute_items_tagged_by(&state.service_deps, &req.category_set(), &item_type).await?;

    Ok(Json(ItemIdsResponse {
        item_ids: items.into_iter().map(|id| id.value()).collect(),
    }))
}
