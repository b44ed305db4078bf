use crate::domain::{
    CategoryId, Reconciliation,
    commands::{AssociateItem, AssociationOperation},
};
use crate::ports::InventoryTransaction;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::ServiceDependencies;
use super::errors::{BookApplicationError, CATEGORY_SERVICE, Result};

/// カテゴリサービスへ依頼するサガの手順
#[derive(Debug, Clone)]
pub(super) enum AssociationStep {
    /// 作成時：一括付与（元の集合は空）
    Initial(AssociateItem),
    /// 更新・削除時：望ましい集合への照合
    Replace(AssociateItem),
}

impl AssociationStep {
    fn request(&self) -> &AssociateItem {
        match self {
            AssociationStep::Initial(request) | AssociationStep::Replace(request) => request,
        }
    }

    fn operation(&self) -> AssociationOperation {
        match self {
            AssociationStep::Initial(_) => AssociationOperation::BulkAssociate,
            AssociationStep::Replace(_) => AssociationOperation::Reconcile,
        }
    }
}

/// 照合結果から照合前の集合を復元する
///
/// previous = (desired \ added) ∪ removed
fn previous_set(
    desired: &BTreeSet<CategoryId>,
    diff: &Reconciliation,
) -> BTreeSet<CategoryId> {
    desired
        .difference(&diff.added)
        .chain(diff.removed.iter())
        .copied()
        .collect()
}

/// トランザクションを破棄する
///
/// rollback自体の失敗はログに残すだけで、元のエラーを優先する。
pub(super) async fn discard(mut tx: Box<dyn InventoryTransaction>) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(error = %e, "Failed to roll back inventory transaction");
    }
}

/// サガ：ローカル書き込み済みのトランザクションに対して
/// リモート関連付け → ローカルcommit の順に進める
///
/// サガごとに処理単位IDを1つ採番し、往路と補償の冪等キーはそこから導出する。
///
/// # 失敗時の扱い
/// - リモート呼び出しの失敗：ローカルをrollbackする。
///   リモート側の副作用が残っている可能性はあるが、取り消しは行わない。
/// - リモート成功後のcommit失敗：照合前の集合へ戻す照合を1回だけ発行する（補償）。
///   補償の失敗はログに残すのみで再試行しない。
pub(super) async fn associate_then_commit(
    deps: &ServiceDependencies,
    mut tx: Box<dyn InventoryTransaction>,
    step: AssociationStep,
) -> Result<()> {
    let saga_id = Uuid::new_v4();
    let request = step.request();
    let idempotency_key = request.idempotency_key(step.operation(), saga_id);
    tracing::debug!(
        item_id = %request.item_id.value(),
        %saga_id,
        %idempotency_key,
        "Requesting category association"
    );

    // 1. リモート呼び出し
    let outcome = match &step {
        AssociationStep::Initial(request) => deps
            .category_service
            .bulk_associate(request, idempotency_key)
            .await
            .map(|()| BTreeSet::new()),
        AssociationStep::Replace(request) => deps
            .category_service
            .reconcile(request, idempotency_key)
            .await
            .map(|diff| previous_set(&request.category_ids, &diff)),
    };

    let previous = match outcome {
        Ok(previous) => previous,
        Err(e) => {
            tracing::warn!(
                item_id = %request.item_id.value(),
                error = %e,
                "Category association failed, rolling back local changes"
            );
            discard(tx).await;
            return Err(BookApplicationError::remote(CATEGORY_SERVICE)(e));
        }
    };

    // 2. ローカルcommit
    if let Err(e) = tx.commit().await {
        tracing::error!(
            item_id = %request.item_id.value(),
            error = %e,
            "Local commit failed after category association, compensating"
        );
        compensate(deps, request, previous, saga_id).await;
        return Err(e.into());
    }

    Ok(())
}

/// 補償：照合前の集合に戻す（1回だけ、ベストエフォート）
async fn compensate(
    deps: &ServiceDependencies,
    request: &AssociateItem,
    previous: BTreeSet<CategoryId>,
    saga_id: Uuid,
) {
    let restore = AssociateItem {
        item_id: request.item_id,
        item_type: request.item_type.clone(),
        category_ids: previous,
    };

    let idempotency_key = restore.idempotency_key(AssociationOperation::Reconcile, saga_id);
    match deps.category_service.reconcile(&restore, idempotency_key).await {
        Ok(diff) => tracing::warn!(
            item_id = %restore.item_id.value(),
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Compensated category association"
        ),
        Err(e) => tracing::error!(
            item_id = %restore.item_id.value(),
            error = %e,
            "Compensation failed; category associations diverge from inventory"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_set_is_restored_from_diff() {
        let a = CategoryId::new();
        let b = CategoryId::new();
        let c = CategoryId::new();

        // {A, C} -> {A, B}
        let desired = BTreeSet::from([a, b]);
        let diff = Reconciliation {
            added: BTreeSet::from([b]),
            removed: BTreeSet::from([c]),
        };

        assert_eq!(previous_set(&desired, &diff), BTreeSet::from([a, c]));
    }

    #[test]
    fn test_previous_set_of_noop_is_desired() {
        let a = CategoryId::new();
        let desired = BTreeSet::from([a]);

        assert_eq!(previous_set(&desired, &Reconciliation::default()), desired);
    }
}
