use axum::{routing::get, Router};
use crate::state::AppState;
use crate::handlers::customer::{
    export_customers, get_customer, list_customer_transactions, list_customers,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers))
        .route("/customers/export", get(export_customers))
        .route("/customers/{id}", get(get_customer))
        .route("/customers/{id}/transactions", get(list_customer_transactions))
}
