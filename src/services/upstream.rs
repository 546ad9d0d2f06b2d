use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::UpstreamConfig;
use crate::error::AppError;
use crate::services::token::TokenProvider;

#[derive(Deserialize)]
struct PageEnvelope<T> {
    code: Option<i64>,
    message: Option<String>,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Thin client over the upstream payments REST API.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

pub fn build_http_client(config: &UpstreamConfig) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))
}

impl UpstreamClient {
    pub fn new(http: reqwest::Client, base_url: &str, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
        &self.tokens
    }

    /// `GET {base}/{resource}?page=&limit=[&updated_since=]` with the cached bearer token.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        page: u32,
        page_size: u32,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<Vec<T>, AppError> {
        if self.base_url.is_empty() {
            return Err(AppError::internal("UPSTREAM_API_URL is not configured"));
        }

        let token = self.tokens.token().await?;
        let url = format!("{}/{}", self.base_url, resource);

        let mut query: Vec<(&str, String)> =
            vec![("page", page.to_string()), ("limit", page_size.to_string())];
        if let Some(since) = updated_since {
            query.push(("updated_since", since.to_rfc3339()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Stale credential: drop it so the next run re-authenticates.
            self.tokens.invalidate().await;
            return Err(AppError::upstream(format!("{resource} page {page}: unauthorized")));
        }
        if !status.is_success() {
            return Err(AppError::upstream(format!(
                "{resource} page {page}: HTTP {status}"
            )));
        }

        let envelope: PageEnvelope<T> = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("{resource} page {page}: bad body: {e}")))?;

        match envelope.code {
            Some(code) if code != 200 => Err(AppError::upstream(format!(
                "{resource} page {page}: code {code} {}",
                envelope.message.unwrap_or_default()
            ))),
            _ => Ok(envelope.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StaticToken {
        invalidations: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for StaticToken {
        async fn token(&self) -> Result<String, AppError> {
            Ok("tok".into())
        }

        async fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Deserialize)]
    struct Item {
        id: i64,
    }

    #[tokio::test]
    async fn fetches_a_page_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/customers")
            .match_header("authorization", "Bearer tok")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("page".into(), "2".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "100".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":200,"data":[{"id":1},{"id":2}]}"#)
            .create_async()
            .await;

        let client = UpstreamClient::new(reqwest::Client::new(), &server.url(), Arc::new(StaticToken::default()));
        let items: Vec<Item> = client.fetch_page("customers", 2, 100, None).await.unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_invalidates_the_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/transactions")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let tokens = Arc::new(StaticToken::default());
        let client = UpstreamClient::new(reqwest::Client::new(), &server.url(), tokens.clone());
        let result: Result<Vec<Item>, _> = client.fetch_page("transactions", 1, 100, None).await;
        assert!(matches!(result, Err(AppError::UpstreamError(_))));
        assert_eq!(tokens.invalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn body_error_code_fails() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/transactions")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":500,"message":"maintenance"}"#)
            .create_async()
            .await;

        let client = UpstreamClient::new(reqwest::Client::new(), &server.url(), Arc::new(StaticToken::default()));
        let result: Result<Vec<Item>, _> = client.fetch_page("transactions", 1, 100, None).await;
        assert!(matches!(result, Err(AppError::UpstreamError(_))));
    }
}
