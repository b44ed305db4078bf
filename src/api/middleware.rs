use crate::domain::UserId;
use crate::ports::TokenVerification;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use super::error::ApiError;
use super::handlers::AppState;
use crate::adapters::http::SERVER_KEY_HEADER;

/// 検証済みのユーザー（トークン検証のインターセプタがリクエストに付与する）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

/// サーバー間の共有キー
#[derive(Debug, Clone)]
pub struct ServerKey(pub Arc<str>);

/// インターセプタ：リクエストのログ
///
/// メソッド・パス・ステータス・処理時間を記録する。
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Request handled"
    );
    response
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// インターセプタ：Bearerトークンの検証
///
/// 認証サービスで検証し、成功すれば`AuthenticatedUser`をリクエストに付与する。
pub async fn require_bearer_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::Unauthorized("Missing bearer token"))?;

    match state
        .token_verifier
        .verify_token(&token)
        .await
        .map_err(ApiError::AuthServiceFailure)?
    {
        TokenVerification::Valid(user_id) => {
            request.extensions_mut().insert(AuthenticatedUser(user_id));
            Ok(next.run(request).await)
        }
        TokenVerification::Invalid => Err(ApiError::Unauthorized("Invalid token")),
    }
}

/// インターセプタ：サーバー間の共有キーの確認
pub async fn require_server_key(
    State(expected): State<ServerKey>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(SERVER_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if presented != Some(&*expected.0) {
        return Err(ApiError::Unauthorized("Invalid server key"));
    }
    Ok(next.run(request).await)
}
