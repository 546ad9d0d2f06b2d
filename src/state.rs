use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::services::token::{CachedTokenProvider, TokenProvider};
use crate::services::upstream::{build_http_client, UpstreamClient};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: &Config) -> Result<Self, AppError> {
        let http = build_http_client(&config.upstream)?;
        let tokens: Arc<dyn TokenProvider> =
            Arc::new(CachedTokenProvider::new(http.clone(), &config.upstream));
        Ok(Self::with_tokens(db_pool, http, &config.upstream.api_url, tokens))
    }

    /// Assembles state around any token provider.
    pub fn with_tokens(
        db_pool: PgPool,
        http: reqwest::Client,
        upstream_url: &str,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            db_pool,
            upstream: UpstreamClient::new(http, upstream_url, tokens),
        }
    }
}
