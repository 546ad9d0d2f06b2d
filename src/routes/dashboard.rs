use axum::{routing::get, Router};
use crate::state::AppState;
use crate::handlers::{credit, dashboard};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(dashboard::dashboard_stats))
        .route("/dashboard/funnel", get(dashboard::funnel))
        .route("/dashboard/weekly", get(dashboard::weekly_stats))
        .route("/dashboard/breakdown", get(dashboard::breakdown))
        .route("/credits/summary", get(credit::credit_summary))
}
