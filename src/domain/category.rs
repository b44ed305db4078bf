use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{CategoryId, CategoryValidationError, ItemId, ItemType};

/// Category集約 - アイテムとは独立して管理される分類
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// カテゴリとアイテムの関連（エッジ）
///
/// (category_id, item_id, item_type) の組は一意。
/// エッジ集合はカテゴリサービス内にのみ存在し、他サービスは直接書き込まない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAssociation {
    pub category_id: CategoryId,
    pub item_id: ItemId,
    pub item_type: ItemType,
    pub created_at: DateTime<Utc>,
}

/// 差分照合の結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// desired \ current
    pub added: BTreeSet<CategoryId>,
    /// current \ desired
    pub removed: BTreeSet<CategoryId>,
}

impl Reconciliation {
    /// 変更なし（既に望ましい状態）
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// 純粋関数：現在のエッジ集合を望ましい集合に変換する差分を計算する
///
/// ストレージに依存しない。同じ入力に対して常に同じ結果を返す。
pub fn reconcile(current: &BTreeSet<CategoryId>, desired: &BTreeSet<CategoryId>) -> Reconciliation {
    Reconciliation {
        added: desired.difference(current).copied().collect(),
        removed: current.difference(desired).copied().collect(),
    }
}

/// 純粋関数：カテゴリを作成する
pub fn create_category(
    name: String,
    description: String,
    now: DateTime<Utc>,
) -> Result<Category, CategoryValidationError> {
    if name.trim().is_empty() {
        return Err(CategoryValidationError::EmptyName);
    }

    Ok(Category {
        id: CategoryId::new(),
        name,
        description,
        created_at: now,
        updated_at: now,
    })
}

/// 純粋関数：カテゴリの名前と説明を更新する
pub fn rename_category(
    category: &Category,
    name: String,
    description: String,
    now: DateTime<Utc>,
) -> Result<Category, CategoryValidationError> {
    if name.trim().is_empty() {
        return Err(CategoryValidationError::EmptyName);
    }

    Ok(Category {
        name,
        description,
        updated_at: now,
        ..category.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<CategoryId> {
        (0..n).map(|_| CategoryId::new()).collect()
    }

    // TDD: reconcile() のテスト
    #[test]
    fn test_reconcile_adds_and_removes() {
        // 現在 {A, C}、望ましい {A, B} → added = {B}, removed = {C}
        let v = ids(3);
        let (a, b, c) = (v[0], v[1], v[2]);

        let current = BTreeSet::from([a, c]);
        let desired = BTreeSet::from([a, b]);

        let diff = reconcile(&current, &desired);
        assert_eq!(diff.added, BTreeSet::from([b]));
        assert_eq!(diff.removed, BTreeSet::from([c]));
        assert!(!diff.is_noop());
    }

    #[test]
    fn test_reconcile_same_set_is_noop() {
        let set: BTreeSet<_> = ids(4).into_iter().collect();
        let diff = reconcile(&set, &set);
        assert!(diff.is_noop());
    }

    #[test]
    fn test_reconcile_is_idempotent_when_applied() {
        let v = ids(3);
        let current = BTreeSet::from([v[0]]);
        let desired = BTreeSet::from([v[1], v[2]]);

        let first = reconcile(&current, &desired);
        // 差分を適用した後の集合
        let applied: BTreeSet<_> = current
            .difference(&first.removed)
            .copied()
            .chain(first.added.iter().copied())
            .collect();
        assert_eq!(applied, desired);

        let second = reconcile(&applied, &desired);
        assert!(second.is_noop());
    }

    #[test]
    fn test_reconcile_to_empty_removes_everything() {
        let current: BTreeSet<_> = ids(2).into_iter().collect();
        let diff = reconcile(&current, &BTreeSet::new());
        assert!(diff.added.is_empty());
        assert_eq!(diff.removed, current);
    }

    #[test]
    fn test_reconcile_from_empty_adds_everything() {
        let desired: BTreeSet<_> = ids(2).into_iter().collect();
        let diff = reconcile(&BTreeSet::new(), &desired);
        assert_eq!(diff.added, desired);
        assert!(diff.removed.is_empty());
    }

    // TDD: create_category() / rename_category() のテスト
    #[test]
    fn test_create_category_rejects_empty_name() {
        let result = create_category(" ".to_string(), "".to_string(), Utc::now());
        assert_eq!(result, Err(CategoryValidationError::EmptyName));
    }

    #[test]
    fn test_rename_category_keeps_identity() {
        let created = create_category("Fiction".to_string(), "".to_string(), Utc::now()).unwrap();
        let renamed = rename_category(
            &created,
            "Science Fiction".to_string(),
            "Space and beyond".to_string(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(renamed.id, created.id);
        assert_eq!(renamed.created_at, created.created_at);
        assert_eq!(renamed.name, "Science Fiction");
    }
}
