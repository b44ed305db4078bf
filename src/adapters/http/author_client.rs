use crate::domain::AuthorId;
use crate::ports::author_service::{Author, AuthorService, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use super::ServiceEndpoint;

#[derive(Debug, Deserialize)]
struct AuthorSearchResponse {
    authors: Vec<Author>,
}

/// 著者サービスのHTTPクライアント
///
/// - `GET /authors/:id` -> Author
/// - `GET /authors?name=` -> `{authors}`
pub struct AuthorClient {
    endpoint: ServiceEndpoint,
}

impl AuthorClient {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl AuthorService for AuthorClient {
    async fn get_author(&self, author_id: AuthorId) -> Result<Author> {
        let request = self
            .endpoint
            .request(Method::GET, &format!("/authors/{}", author_id.value()));
        Ok(self.endpoint.send_json(request).await?)
    }

    async fn find_author_ids(&self, name_query: &str) -> Result<Vec<AuthorId>> {
        let request = self
            .endpoint
            .request(Method::GET, "/authors")
            .query(&[("name", name_query)]);
        let found: AuthorSearchResponse = self.endpoint.send_json(request).await?;
        Ok(found.authors.into_iter().map(|a| a.id).collect())
    }
}
