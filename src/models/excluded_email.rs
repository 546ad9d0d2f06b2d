use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct ExcludedEmail {
    pub id: i64,
    pub email: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
