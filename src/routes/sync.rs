use axum::{
    routing::{delete, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::sync::{invalidate_token, sync_customers, sync_transactions};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync/transactions", post(sync_transactions))
        .route("/sync/customers", post(sync_customers))
        .route("/sync/token", delete(invalidate_token))
}
