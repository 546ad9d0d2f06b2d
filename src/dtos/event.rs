use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::event::{Event, Registration};
use crate::query::PageMeta;

#[derive(Debug, Default, Deserialize)]
pub struct EventListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
}

#[derive(Serialize)]
pub struct EventListResponse {
    pub events: Vec<Event>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Serialize)]
pub struct RegistrationListResponse {
    pub event_id: i64,
    pub registrations: Vec<Registration>,
    #[serde(flatten)]
    pub meta: PageMeta,
}
