use axum::{
    routing::{delete, get},
    Router,
};
use crate::state::AppState;
use crate::handlers::excluded_email::{
    create_excluded_email, delete_excluded_email, list_excluded_emails,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/excluded-emails", get(list_excluded_emails).post(create_excluded_email))
        .route("/excluded-emails/{id}", delete(delete_excluded_email))
}
