use axum::{routing::get, Router};
use crate::state::AppState;
use crate::handlers::event::{
    create_event, delete_event, export_registrations, get_event, list_events,
    list_registrations, update_event,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event).put(update_event).delete(delete_event))
        .route("/events/{id}/registrations", get(list_registrations))
        .route("/events/{id}/registrations/export", get(export_registrations))
}
