use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::sync::SyncRequest;
use crate::error::AppError;
use crate::services::sync::{sync_source, SyncReport, SyncSource};
use crate::state::AppState;

async fn run(
    state: AppState,
    source: SyncSource,
    body: Option<Json<SyncRequest>>,
) -> Result<Json<SyncReport>, AppError> {
    let since = body.and_then(|Json(req)| req.since);
    let report = sync_source(&state.db_pool, &state.upstream, source, since).await?;
    Ok(Json(report))
}

/// Body is optional; `{"since": "..."}` replays from that point.
pub async fn sync_transactions(
    State(state): State<AppState>,
    body: Option<Json<SyncRequest>>,
) -> Result<Json<SyncReport>, AppError> {
    run(state, SyncSource::Transactions, body).await
}

pub async fn sync_customers(
    State(state): State<AppState>,
    body: Option<Json<SyncRequest>>,
) -> Result<Json<SyncReport>, AppError> {
    run(state, SyncSource::Customers, body).await
}

pub async fn invalidate_token(State(state): State<AppState>) -> StatusCode {
    state.upstream.tokens().invalidate().await;
    tracing::info!("Upstream token invalidated");
    StatusCode::NO_CONTENT
}
