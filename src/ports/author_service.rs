use crate::domain::value_objects::AuthorId;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 著者（著者サービスが所有）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 著者サービスポート
///
/// 在庫コンテキストと著者コンテキストの境界を維持する。
/// 在庫コンテキストはAuthorIDのみを保持し、著者の詳細は都度問い合わせる。
#[async_trait]
pub trait AuthorService: Send + Sync {
    /// 著者を取得する
    ///
    /// 書籍レスポンスの組み立て（ファンアウト）で書籍ごとに1回呼ばれる。
    async fn get_author(&self, author_id: AuthorId) -> Result<Author>;

    /// 名前の部分一致で著者IDを検索する
    ///
    /// 書籍一覧の著者名フィルタに使用される。
    async fn find_author_ids(&self, name_query: &str) -> Result<Vec<AuthorId>>;
}
