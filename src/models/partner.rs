use serde::Serialize;
use chrono::{DateTime, Utc};

pub const STATUSES: &[&str] = &["lead", "active", "inactive"];

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct Partner {
    pub id: i64,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
