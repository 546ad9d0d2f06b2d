use axum::{routing::get, Router};
use crate::state::AppState;
use crate::handlers::transaction::{
    daily_summary, export_transactions, get_transaction, list_transactions,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/daily", get(daily_summary))
        .route("/transactions/export", get(export_transactions))
        .route("/transactions/{guid}", get(get_transaction))
}
