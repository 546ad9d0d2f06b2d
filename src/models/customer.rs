use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct CustomerRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub referral_code: Option<String>,
    pub subscription_status: String,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub transaction_count: i64,
    pub total_spent: f64,
}

/// Customer header plus transaction and credit totals.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct CustomerDetail {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub referral_code: Option<String>,
    pub referral_partner_name: Option<String>,
    pub subscription_status: String,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transaction_count: i64,
    pub finished_transaction_count: i64,
    pub total_spent: f64,
    pub credit_balance: f64,
    pub last_transaction_at: Option<DateTime<Utc>>,
}
