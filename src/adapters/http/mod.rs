pub mod author_client;
pub mod category_client;
pub mod token_client;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use author_client::AuthorClient as HttpAuthorService;
pub use category_client::CategoryClient as HttpCategoryService;
pub use token_client::TokenClient as HttpTokenVerifier;

/// サービス間の共有シークレットを運ぶヘッダー
pub const SERVER_KEY_HEADER: &str = "x-server-key";

/// 外部サービス呼び出しのエラー
#[derive(Debug, Error)]
pub enum RemoteCallError {
    /// 応答前の接続・TLS・タイムアウトの失敗
    #[error("{service} request failed")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// 成功以外のステータスが返った
    #[error("{service} responded with {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    /// 応答ボディが期待した形と一致しない
    #[error("{service} returned an unreadable body")]
    Decode {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// 1つの外部サービスのベースURLと認証情報
///
/// reqwestの `Client` はコネクションプールを持つため、起動時に依存先ごとに
/// 1つ作成し、すべてのリクエストで共有する。
#[derive(Clone, Debug)]
pub struct ServiceEndpoint {
    service: &'static str,
    client: Client,
    base_url: String,
    server_key: Option<String>,
}

impl ServiceEndpoint {
    pub fn new(
        service: &'static str,
        client: Client,
        base_url: impl Into<String>,
        server_key: Option<String>,
    ) -> Self {
        Self {
            service,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            server_key,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// サーバーキーを付けて `path` へのリクエストを組み立てる
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.server_key {
            Some(key) => builder.header(SERVER_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteCallError> {
        let response = builder
            .send()
            .await
            .map_err(|source| RemoteCallError::Transport {
                service: self.service,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteCallError::Status {
                service: self.service,
                status,
                body,
            });
        }
        Ok(response)
    }

    /// 送信してJSONボディをデコードする
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, RemoteCallError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|source| RemoteCallError::Decode {
                service: self.service,
                source,
            })
    }

    /// 送信してボディは捨てる
    pub async fn send_empty(&self, builder: RequestBuilder) -> Result<(), RemoteCallError> {
        self.send(builder).await.map(|_| ())
    }
}
