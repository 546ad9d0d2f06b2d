use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct ReferralPartner {
    pub id: i64,
    pub name: String,
    pub referral_code: String,
    pub email: Option<String>,
    pub commission_rate: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One referral code's rollup over its referred customers.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct ReferralStat {
    pub referral_code: String,
    pub partner_id: Option<i64>,
    pub partner_name: Option<String>,
    pub user_count: i64,
    pub paying_user_count: i64,
    pub finished_transactions: i64,
    pub revenue: f64,
    pub commission: f64,
}
