use serde::Serialize;
use chrono::{DateTime, Utc};

pub const STATUSES: &[&str] = &["finished", "pending", "failed", "expired", "refunded"];
pub const FINISHED: &str = "finished";
pub const REVENUE_CURRENCY: &str = "IDR";

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct TransactionRow {
    pub guid: String,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub status: String,
    pub amount: f64,
    pub currency: String,
    pub payment_channel: Option<String>,
    pub referral_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct TransactionDetailRow {
    pub id: i64,
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}
