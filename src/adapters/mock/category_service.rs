use crate::domain::{
    Category, CategoryId, ItemId, ItemType, Reconciliation, commands::AssociateItem,
};
use crate::ports::category_service::{CategoryService as CategoryServiceTrait, Result};
use crate::ports::category_store::CategoryAssociationStore;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// 書き込み系呼び出しの故障注入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailure {
    /// 故障なし
    #[default]
    None,
    /// 何も適用せずに失敗する
    BeforeApply,
    /// 適用してから失敗を返す（リモート側の副作用だけが残る）
    AfterApply,
}

/// CategoryServiceのモック実装
///
/// リモート呼び出しの代わりに、同一プロセス内のCategoryAssociationStoreへ委譲する。
/// 書き込み系の故障注入と、受け取った冪等キーの記録をサポート。
pub struct CategoryService {
    store: Arc<dyn CategoryAssociationStore>,
    write_failure: Mutex<WriteFailure>,
    read_failing: Mutex<bool>,
    idempotency_keys: Mutex<Vec<uuid::Uuid>>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn CategoryAssociationStore>) -> Self {
        Self {
            store,
            write_failure: Mutex::new(WriteFailure::None),
            read_failing: Mutex::new(false),
            idempotency_keys: Mutex::new(Vec::new()),
        }
    }

    /// テスト用に書き込み系（bulk_associate / reconcile）の故障を設定
    pub fn fail_writes(&self, failure: WriteFailure) {
        if let Ok(mut f) = self.write_failure.lock() {
            *f = failure;
        }
    }

    /// テスト用に読み取り系の故障を設定
    pub fn fail_reads(&self, failing: bool) {
        if let Ok(mut f) = self.read_failing.lock() {
            *f = failing;
        }
    }

    /// これまでに受け取った冪等キー（受信順）
    pub fn received_idempotency_keys(&self) -> Vec<uuid::Uuid> {
        self.idempotency_keys
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }

    fn write_failure(&self) -> Result<WriteFailure> {
        Ok(*self
            .write_failure
            .lock()
            .map_err(|_| "category client lock poisoned")?)
    }

    fn check_reads(&self) -> Result<()> {
        let failing = *self
            .read_failing
            .lock()
            .map_err(|_| "category client lock poisoned")?;
        if failing {
            return Err("category service unavailable".into());
        }
        Ok(())
    }

    fn record_key(&self, idempotency_key: uuid::Uuid) -> Result<()> {
        self.idempotency_keys
            .lock()
            .map_err(|_| "category client lock poisoned")?
            .push(idempotency_key);
        Ok(())
    }
}

#[async_trait]
impl CategoryServiceTrait for CategoryService {
    async fn bulk_associate(
        &self,
        request: &AssociateItem,
        idempotency_key: uuid::Uuid,
    ) -> Result<()> {
        self.record_key(idempotency_key)?;
        let failure = self.write_failure()?;
        if failure == WriteFailure::BeforeApply {
            return Err("category service unavailable".into());
        }

        self.store
            .bulk_associate(request.item_id, &request.item_type, &request.category_ids)
            .await?;

        if failure == WriteFailure::AfterApply {
            return Err("category service connection reset".into());
        }
        Ok(())
    }

    async fn reconcile(
        &self,
        request: &AssociateItem,
        idempotency_key: uuid::Uuid,
    ) -> Result<Reconciliation> {
        self.record_key(idempotency_key)?;
        let failure = self.write_failure()?;
        if failure == WriteFailure::BeforeApply {
            return Err("category service unavailable".into());
        }

        let diff = self
            .store
            .reconcile(request.item_id, &request.item_type, &request.category_ids)
            .await?;

        if failure == WriteFailure::AfterApply {
            return Err("category service connection reset".into());
        }
        Ok(diff)
    }

    async fn associations_of(
        &self,
        item_id: ItemId,
        item_type: &ItemType,
    ) -> Result<Vec<Category>> {
        self.check_reads()?;
        Ok(self.store.associations_of(item_id, item_type).await?)
    }

    async fn items_tagged_by(
        &self,
        category_ids: &[CategoryId],
        item_type: &ItemType,
    ) -> Result<Vec<ItemId>> {
        self.check_reads()?;
        let category_ids: BTreeSet<_> = category_ids.iter().copied().collect();
        let items = self.store.items_tagged_by(&category_ids, item_type).await?;
        Ok(items.into_iter().collect())
    }
}
