use crate::domain::value_objects::UserId;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// トークン検証結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenVerification {
    Valid(UserId),
    Invalid,
}

/// 認証サービスポート
///
/// 受付層（インターセプタ）でのみ使用する。貸出のコア処理は認証を知らない。
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<TokenVerification>;
}
