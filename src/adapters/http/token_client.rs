use crate::domain::UserId;
use crate::ports::token_verifier::{Result, TokenVerification, TokenVerifier};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServiceEndpoint;

#[derive(Debug, Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyTokenResponse {
    valid: bool,
    #[serde(default)]
    user_id: Option<Uuid>,
}

/// 認証サービスのHTTPクライアント（`POST /auth/verify`）
pub struct TokenClient {
    endpoint: ServiceEndpoint,
}

impl TokenClient {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl TokenVerifier for TokenClient {
    async fn verify_token(&self, token: &str) -> Result<TokenVerification> {
        let request = self
            .endpoint
            .request(Method::POST, "/auth/verify")
            .json(&VerifyTokenRequest { token });
        let verified: VerifyTokenResponse = self.endpoint.send_json(request).await?;

        Ok(match (verified.valid, verified.user_id) {
            (true, Some(user_id)) => TokenVerification::Valid(UserId::from_uuid(user_id)),
            _ => TokenVerification::Invalid,
        })
    }
}
