use serde::Serialize;
use chrono::NaiveDate;

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct DailySummaryRow {
    pub day: NaiveDate,
    pub transaction_count: i64,
    pub finished_count: i64,
    pub revenue: f64,
    pub paying_customers: i64,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct WeeklyStatRow {
    pub week_start: NaiveDate,
    pub new_customers: i64,
    pub transaction_count: i64,
    pub revenue: f64,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct StatusBreakdownRow {
    pub status: String,
    pub transaction_count: i64,
    pub total_amount: f64,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct ChannelBreakdownRow {
    pub payment_channel: String,
    pub transaction_count: i64,
    pub revenue: f64,
}
