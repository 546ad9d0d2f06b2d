use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub registration_count: i64,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct Registration {
    pub id: i64,
    pub event_id: i64,
    pub customer_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub status: String,
    pub registered_at: DateTime<Utc>,
}
