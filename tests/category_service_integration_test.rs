use chrono::{Duration, Utc};
use lending_library::application::category::{
    CategoryApplicationError, ServiceDependencies, associations_of, bulk_associate,
    create_category, delete_category, get_category, items_tagged_by, list_categories,
    reconcile_associations, update_category,
};
use lending_library::domain::{
    BookId, Category, CategoryId, CategoryValidationError, ItemId, ItemType,
    commands::{AssociateItem, CreateCategory, UpdateCategory},
};
use lending_library::ports::CategoryStore;
use std::collections::BTreeSet;

mod common;

use common::Library;

// ============================================================================
// ヘルパー
// ============================================================================

fn associate(item_id: ItemId, category_ids: &[CategoryId]) -> AssociateItem {
    AssociateItem {
        item_id,
        item_type: ItemType::book(),
        category_ids: category_ids.iter().copied().collect(),
    }
}

async fn current_set(deps: &ServiceDependencies, item_id: ItemId) -> BTreeSet<CategoryId> {
    associations_of(deps, item_id, &ItemType::book())
        .await
        .expect("Failed to read associations")
        .into_iter()
        .map(|c| c.id)
        .collect()
}

fn new_item() -> ItemId {
    ItemId::from(BookId::new())
}

// ============================================================================
// カテゴリ
// ============================================================================

#[tokio::test]
async fn test_create_and_update_category() {
    // Arrange
    let library = Library::new();
    let deps = library.category_deps();

    // Act
    let created = create_category(
        &deps,
        CreateCategory {
            name: "Science Fiction".to_string(),
            description: "Speculative futures".to_string(),
        },
    )
    .await
    .expect("Failed to create category");

    let updated = update_category(
        &deps,
        UpdateCategory {
            category_id: created.id,
            name: "SF".to_string(),
            description: String::new(),
        },
    )
    .await
    .expect("Failed to update category");

    // Assert
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);

    let fetched = get_category(&deps, created.id).await.unwrap();
    assert_eq!(fetched.name, "SF");
}

#[tokio::test]
async fn test_create_category_rejects_empty_name() {
    let library = Library::new();

    let result = create_category(
        &library.category_deps(),
        CreateCategory {
            name: " ".to_string(),
            description: String::new(),
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(CategoryApplicationError::InvalidCategory(CategoryValidationError::EmptyName))
    ));
}

#[tokio::test]
async fn test_unknown_category_is_not_found() {
    let library = Library::new();
    let deps = library.category_deps();

    assert!(matches!(
        get_category(&deps, CategoryId::new()).await,
        Err(CategoryApplicationError::CategoryNotFound)
    ));
    assert!(matches!(
        delete_category(&deps, CategoryId::new()).await,
        Err(CategoryApplicationError::CategoryNotFound)
    ));
}

#[tokio::test]
async fn test_list_categories_newest_first() {
    // Arrange: 作成日時をずらして直接登録
    let library = Library::new();
    let now = Utc::now();
    for (name, age) in [("Oldest", 3), ("Newest", 0), ("Middle", 1)] {
        let created_at = now - Duration::days(age);
        library
            .categories
            .insert(&Category {
                id: CategoryId::new(),
                name: name.to_string(),
                description: String::new(),
                created_at,
                updated_at: created_at,
            })
            .await
            .unwrap();
    }

    // Act
    let page = list_categories(&library.category_deps(), Some(1), Some(2))
        .await
        .unwrap();

    // Assert
    assert_eq!(page.total, 3);
    let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Newest", "Middle"]);
}

#[tokio::test]
async fn test_delete_category_removes_its_edges() {
    // Arrange
    let library = Library::new();
    let deps = library.category_deps();
    let a = library.add_category("A").await;
    let b = library.add_category("B").await;
    let item = new_item();
    reconcile_associations(&deps, associate(item, &[a.id, b.id]))
        .await
        .unwrap();

    // Act
    delete_category(&deps, a.id).await.unwrap();

    // Assert
    assert_eq!(current_set(&deps, item).await, BTreeSet::from([b.id]));
    assert_eq!(library.categories.edge_count(), 1);
}

// ============================================================================
// 照合
// ============================================================================

#[tokio::test]
async fn test_reconcile_replaces_difference_only() {
    // Arrange: {A, C}
    let library = Library::new();
    let deps = library.category_deps();
    let a = library.add_category("A").await;
    let b = library.add_category("B").await;
    let c = library.add_category("C").await;
    let item = new_item();
    reconcile_associations(&deps, associate(item, &[a.id, c.id]))
        .await
        .unwrap();

    // Act: {A, B}
    let diff = reconcile_associations(&deps, associate(item, &[a.id, b.id]))
        .await
        .unwrap();

    // Assert
    assert_eq!(diff.added, BTreeSet::from([b.id]));
    assert_eq!(diff.removed, BTreeSet::from([c.id]));
    assert_eq!(current_set(&deps, item).await, BTreeSet::from([a.id, b.id]));
}

#[tokio::test]
async fn test_reconcile_twice_is_a_noop() {
    let library = Library::new();
    let deps = library.category_deps();
    let a = library.add_category("A").await;
    let item = new_item();

    let first = reconcile_associations(&deps, associate(item, &[a.id])).await.unwrap();
    let second = reconcile_associations(&deps, associate(item, &[a.id])).await.unwrap();

    assert_eq!(first.added, BTreeSet::from([a.id]));
    assert!(second.is_noop());
    assert_eq!(library.categories.edge_count(), 1);
}

#[tokio::test]
async fn test_reconcile_to_empty_set_clears_item() {
    let library = Library::new();
    let deps = library.category_deps();
    let a = library.add_category("A").await;
    let b = library.add_category("B").await;
    let item = new_item();
    reconcile_associations(&deps, associate(item, &[a.id, b.id]))
        .await
        .unwrap();

    let diff = reconcile_associations(&deps, associate(item, &[])).await.unwrap();

    assert_eq!(diff.removed, BTreeSet::from([a.id, b.id]));
    assert!(current_set(&deps, item).await.is_empty());
}

#[tokio::test]
async fn test_reconcile_does_not_touch_other_items() {
    let library = Library::new();
    let deps = library.category_deps();
    let a = library.add_category("A").await;
    let first = new_item();
    let second = new_item();
    reconcile_associations(&deps, associate(first, &[a.id])).await.unwrap();
    reconcile_associations(&deps, associate(second, &[a.id])).await.unwrap();

    reconcile_associations(&deps, associate(first, &[])).await.unwrap();

    assert_eq!(current_set(&deps, second).await, BTreeSet::from([a.id]));
}

#[tokio::test]
async fn test_reconcile_with_unknown_category_is_storage_failure() {
    let library = Library::new();
    let deps = library.category_deps();

    let result = reconcile_associations(&deps, associate(new_item(), &[CategoryId::new()])).await;

    assert!(matches!(result, Err(CategoryApplicationError::StorageFailure(_))));
    assert_eq!(library.categories.edge_count(), 0);
}

// ============================================================================
// 一括付与・逆引き
// ============================================================================

#[tokio::test]
async fn test_bulk_associate_skips_existing_edges() {
    // Arrange
    let library = Library::new();
    let deps = library.category_deps();
    let a = library.add_category("A").await;
    let b = library.add_category("B").await;
    let item = new_item();
    bulk_associate(&deps, associate(item, &[a.id])).await.unwrap();

    // Act: 再送を含む一括付与
    bulk_associate(&deps, associate(item, &[a.id, b.id])).await.unwrap();
    bulk_associate(&deps, associate(item, &[a.id, b.id])).await.unwrap();

    // Assert
    assert_eq!(current_set(&deps, item).await, BTreeSet::from([a.id, b.id]));
    assert_eq!(library.categories.edge_count(), 2);
}

#[tokio::test]
async fn test_items_tagged_by_any_category() {
    // Arrange
    let library = Library::new();
    let deps = library.category_deps();
    let a = library.add_category("A").await;
    let b = library.add_category("B").await;
    let c = library.add_category("C").await;
    let tagged_a = new_item();
    let tagged_b = new_item();
    let tagged_c = new_item();
    reconcile_associations(&deps, associate(tagged_a, &[a.id])).await.unwrap();
    reconcile_associations(&deps, associate(tagged_b, &[a.id, b.id])).await.unwrap();
    reconcile_associations(&deps, associate(tagged_c, &[c.id])).await.unwrap();

    // Act
    let items = items_tagged_by(&deps, &BTreeSet::from([a.id, b.id]), &ItemType::book())
        .await
        .unwrap();

    // Assert
    assert_eq!(items, BTreeSet::from([tagged_a, tagged_b]));
}

#[tokio::test]
async fn test_items_tagged_by_respects_item_type() {
    let library = Library::new();
    let deps = library.category_deps();
    let a = library.add_category("A").await;
    let item = new_item();
    let magazine = ItemType::parse("magazine").unwrap();
    reconcile_associations(
        &deps,
        AssociateItem {
            item_id: item,
            item_type: magazine.clone(),
            category_ids: BTreeSet::from([a.id]),
        },
    )
    .await
    .unwrap();

    let books = items_tagged_by(&deps, &BTreeSet::from([a.id]), &ItemType::book())
        .await
        .unwrap();
    let magazines = items_tagged_by(&deps, &BTreeSet::from([a.id]), &magazine)
        .await
        .unwrap();

    assert!(books.is_empty());
    assert_eq!(magazines, BTreeSet::from([item]));
}
