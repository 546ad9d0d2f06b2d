//! Cached credential for the upstream payments API.
//!
//! The token is fetched once and reused until [`TokenProvider::invalidate`]
//! is called or the process restarts. There is no expiry tracking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::UpstreamConfig;
use crate::error::AppError;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the cached token, requesting one first when the cache is empty.
    async fn token(&self) -> Result<String, AppError>;

    /// Drops the cached token so the next call re-authenticates.
    async fn invalidate(&self);
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    api_key: &'a str,
    api_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    code: Option<i64>,
    message: Option<String>,
    data: Option<TokenData>,
}

#[derive(Deserialize)]
struct TokenData {
    token: String,
}

pub struct CachedTokenProvider {
    http: reqwest::Client,
    auth_url: String,
    api_key: String,
    api_secret: String,
    cached: RwLock<Option<String>>,
}

impl CachedTokenProvider {
    pub fn new(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            http,
            auth_url: config.auth_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            cached: RwLock::new(None),
        }
    }

    async fn request_token(&self) -> Result<String, AppError> {
        let response = self
            .http
            .post(&self.auth_url)
            .json(&TokenRequest {
                api_key: &self.api_key,
                api_secret: &self.api_secret,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(format!(
                "Token request failed with HTTP {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Failed to parse token response: {e}")))?;

        // The auth API reports failures in the body as well as the status line.
        if let Some(code) = body.code {
            if code != 200 {
                return Err(AppError::upstream(format!(
                    "Token request rejected with code {code}: {}",
                    body.message.unwrap_or_default()
                )));
            }
        }

        body.data
            .map(|d| d.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::upstream("No token in auth response"))
    }
}

#[async_trait]
impl TokenProvider for CachedTokenProvider {
    async fn token(&self) -> Result<String, AppError> {
        {
            let cached = self.cached.read().await;
            if let Some(t) = cached.as_ref() {
                return Ok(t.clone());
            }
        }

        // Two callers racing here both fetch; the second write just replaces an equal token.
        let token = self.request_token().await?;
        tracing::info!("Obtained upstream API token");

        {
            let mut cached = self.cached.write().await;
            *cached = Some(token.clone());
        }

        Ok(token)
    }

    async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        if cached.take().is_some() {
            tracing::info!("Upstream API token invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(server: &mockito::Server) -> CachedTokenProvider {
        let config = UpstreamConfig {
            api_url: server.url(),
            auth_url: format!("{}/auth/token", server.url()),
            api_key: "key".into(),
            api_secret: "secret".into(),
            timeout_secs: 5,
        };
        CachedTokenProvider::new(reqwest::Client::new(), &config)
    }

    #[tokio::test]
    async fn token_is_fetched_once_and_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/token")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "api_key": "key",
                "api_secret": "secret"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":200,"message":"ok","data":{"token":"tok-1"}}"#)
            .expect(1)
            .create_async()
            .await;

        let tokens = provider(&server);
        assert_eq!(tokens.token().await.unwrap(), "tok-1");
        assert_eq!(tokens.token().await.unwrap(), "tok-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failure_code_is_not_cached() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/auth/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":401,"message":"bad credentials"}"#)
            .expect(2)
            .create_async()
            .await;

        let tokens = provider(&server);
        assert!(matches!(tokens.token().await, Err(AppError::UpstreamError(_))));
        assert!(matches!(tokens.token().await, Err(AppError::UpstreamError(_))));
        assert!(tokens.cached.read().await.is_none());
        rejected.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_fails_the_request() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/auth/token")
            .with_status(503)
            .create_async()
            .await;

        let tokens = provider(&server);
        assert!(matches!(tokens.token().await, Err(AppError::UpstreamError(_))));
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":200,"data":{"token":"tok-2"}}"#)
            .expect(2)
            .create_async()
            .await;

        let tokens = provider(&server);
        tokens.token().await.unwrap();
        tokens.invalidate().await;
        tokens.token().await.unwrap();
        mock.assert_async().await;
    }
}
